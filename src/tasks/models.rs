//! Task model types for the board.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Tasks to work on now (default).
    #[default]
    Priority,
    /// Tasks queued up next.
    Next,
    /// Finished or parked tasks.
    Archived,
}

impl Status {
    /// All statuses in board display order.
    pub const ALL: [Self; 3] = [Self::Priority, Self::Next, Self::Archived];

    /// Parse a canonical status string.
    ///
    /// Unlike [`normalize_status`](crate::tasks::normalize::normalize_status),
    /// this is strict and intended for user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a canonical status.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, InvalidStatus> {
        match s.trim().to_lowercase().as_str() {
            "priority" => Ok(Self::Priority),
            "next" => Ok(Self::Next),
            "archived" => Ok(Self::Archived),
            _ => Err(InvalidStatus(s.to_string())),
        }
    }

    /// Get the canonical string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Next => "next",
            Self::Archived => "archived",
        }
    }

    /// Human-readable column label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Priority => "Priority",
            Self::Next => "Next",
            Self::Archived => "Archived",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid status string is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStatus(pub String);

impl std::fmt::Display for InvalidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid status: '{}' (must be one of: priority, next, archived)", self.0)
    }
}

impl std::error::Error for InvalidStatus {}

/// A tag that can be attached to many tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional color hint for the UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Position in the tag list. New tags go last.
    #[serde(default)]
    pub sort_order: i64,
}

/// Partial tag used for renames, recolors and reordering.
///
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New color hint.
    pub color: Option<String>,
    /// New position in the tag list.
    pub sort_order: Option<i64>,
}

impl TagUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.sort_order.is_none()
    }
}

/// Metadata of a file attached to a task.
///
/// The file bytes live in object storage; only the record is handled here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAsset {
    /// Unique identifier.
    pub id: String,
    /// ID of the task this asset belongs to.
    pub todo_id: String,
    /// Original file name.
    pub file_name: String,
    /// Path of the object in the storage bucket.
    pub storage_path: String,
    /// MIME type, if known.
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Size in bytes.
    #[serde(default)]
    pub size_bytes: u64,
    /// ISO 8601 timestamp when the asset was recorded.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A task in canonical form.
///
/// Produced by [`normalize_task`](crate::tasks::normalize::normalize_task);
/// never contains legacy representations.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, immutable once created.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Column the task is in.
    pub status: Status,
    /// Position key within the status column (lower sorts first).
    pub sort_order: i64,
    /// Accumulated tracked time.
    pub total_elapsed_seconds: u64,
    /// Whether the task is hidden from the public view.
    pub is_private: bool,
    /// Whether a timer is currently running for this task.
    pub is_timing: bool,
    /// Attached tags.
    pub tags: Vec<Tag>,
    /// Attached files.
    pub assets: Vec<TaskAsset>,
    /// Free-form notes.
    pub memo: Option<String>,
    /// Owner of the task.
    pub user_id: Option<String>,
    /// ISO 8601 timestamp of the last modification.
    pub updated_at: Option<String>,
}

impl Task {
    /// Create a task with the given id and title and defaults elsewhere.
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self { id: id.into(), title: title.into(), ..Self::default() }
    }

    /// Check whether the task carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag_id: &str) -> bool {
        self.tags.iter().any(|tag| tag.id == tag_id)
    }
}

/// Partial task used for creates and updates.
///
/// `None` means "leave unchanged" (or "use the default" on create).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// Task to update. Required for updates, ignored on create.
    pub id: Option<String>,
    /// New title.
    pub title: Option<String>,
    /// New status.
    pub status: Option<Status>,
    /// New sort key.
    pub sort_order: Option<i64>,
    /// New accumulated time.
    pub total_elapsed_seconds: Option<u64>,
    /// New visibility flag.
    pub is_private: Option<bool>,
    /// New timer flag.
    pub is_timing: Option<bool>,
    /// Replacement tag set, written through the tag link table.
    pub tags: Option<Vec<Tag>>,
    /// Attachments are never written inline; kept so a full task converts losslessly.
    pub assets: Option<Vec<TaskAsset>>,
    /// New memo.
    pub memo: Option<String>,
    /// Owner.
    pub user_id: Option<String>,
}

impl TaskPatch {
    /// A patch targeting the task with the given id.
    #[must_use]
    pub fn for_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Self::default() }
    }
}

impl From<&Task> for TaskPatch {
    fn from(task: &Task) -> Self {
        Self {
            id: Some(task.id.clone()),
            title: Some(task.title.clone()),
            status: Some(task.status),
            sort_order: Some(task.sort_order),
            total_elapsed_seconds: Some(task.total_elapsed_seconds),
            is_private: Some(task.is_private),
            is_timing: Some(task.is_timing),
            tags: Some(task.tags.clone()),
            assets: Some(task.assets.clone()),
            memo: task.memo.clone(),
            user_id: task.user_id.clone(),
        }
    }
}

/// A task record as stored by the backend: a flat field/value map.
///
/// Field shapes are not trusted. Nested join rows may be present under
/// `todo_tags` and `todo_assets`, and `total_time` may be a scalar or an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawTaskRecord(pub Map<String, Value>);

impl RawTaskRecord {
    /// An empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a field as a string, if it is one.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Get a field as a boolean, if it is one.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Get a field as an integer, if it is one.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    /// Set a field.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Remove a field, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Check whether a field is present (even if null).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Iterate over fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for RawTaskRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// New sort key for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    /// Task to update.
    pub id: String,
    /// Key to persist.
    pub sort_order: i64,
}

impl OrderUpdate {
    /// Create an update.
    #[must_use]
    pub fn new(id: impl Into<String>, sort_order: i64) -> Self {
        Self { id: id.into(), sort_order }
    }
}

/// Keys computed for a move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlan {
    /// Key for the moved task. Must be persisted.
    pub main_task_update: OrderUpdate,
    /// Keys for the other members of the column when the column was
    /// renumbered. Persisting them is best-effort.
    pub other_task_updates: Vec<OrderUpdate>,
}

impl OrderPlan {
    /// Whether the whole column was renumbered.
    #[must_use]
    pub fn is_renumbered(&self) -> bool {
        !self.other_task_updates.is_empty()
    }

    /// All updates, the moved task first.
    pub fn all_updates(&self) -> impl Iterator<Item = &OrderUpdate> {
        std::iter::once(&self.main_task_update).chain(self.other_task_updates.iter())
    }
}
