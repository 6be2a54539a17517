//! Task store trait and `SQLite` implementation.
//!
//! The store is the persistence collaborator: it reads raw records, hands
//! them to the normalizer, and writes records produced by
//! [`convert_task_for_persistence`]. Status values are stored as free-form
//! text, so rows written by older clients keep their legacy labels until
//! they are next saved.

use crate::error::{Error, Result};
use crate::tasks::assets::{AssetPolicy, TASK_ASSET_BUCKET};
use crate::tasks::id::{generate_asset_id, generate_tag_id, generate_task_id};
use crate::tasks::models::{
    OrderUpdate, RawTaskRecord, Tag, TagUpdate, Task, TaskAsset, TaskPatch,
};
use crate::tasks::normalize::{
    convert_task_for_persistence, normalize_task, ASSETS_FIELD, ELAPSED_FIELD, TAG_LINKS_FIELD,
};
use crate::tasks::ordering::append_key_after;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Name of the attachment relation. Older deployments do not have it.
pub const ASSET_RELATION: &str = ASSETS_FIELD;

/// Columns of the `todos` table, in select order.
const TODO_COLUMNS: [&str; 10] = [
    "id",
    "user_id",
    "title",
    "memo",
    "status",
    "sort_order",
    ELAPSED_FIELD,
    "is_private",
    "is_timing",
    "updated_at",
];

/// Tag columns, in the order [`SqliteTaskStore::map_tag`] reads them.
const TAG_SELECT: &str = "SELECT id, name, color, sort_order FROM tags";

/// Columns stored as 0/1 integers but exposed as booleans.
const BOOL_COLUMNS: [&str; 2] = ["is_private", "is_timing"];

/// Trait for task storage operations.
///
/// All methods return a `Result` and may fail with backend errors, which are
/// passed through unchanged.
#[allow(clippy::missing_errors_doc)]
pub trait TaskStore {
    // Tasks
    /// Fetch every task, ordered by sort key then most recently updated.
    fn fetch_all_tasks(&self) -> Result<Vec<Task>>;

    /// Fetch one task by ID.
    fn fetch_task(&self, id: &str) -> Result<Option<Task>>;

    /// Create a task. Unset fields get defaults (status priority, public,
    /// sort key 0).
    fn create_task(&self, patch: TaskPatch) -> Result<Task>;

    /// Update the fields set in `patch`. `patch.id` is required.
    /// Returns `None` if no such task exists.
    fn update_task(&self, patch: TaskPatch) -> Result<Option<Task>>;

    /// Delete a task with its attachments and tag links.
    fn delete_task(&self, id: &str) -> Result<bool>;

    /// Persist a new sort key.
    fn update_task_order(&self, update: &OrderUpdate) -> Result<bool>;

    // Tags
    /// Create a tag after the last one. If a tag with this name already
    /// exists it is returned unchanged.
    fn create_tag(&self, name: &str, color: Option<&str>) -> Result<Tag>;

    /// Change the fields set in `update`. Returns `None` if no such tag exists.
    fn update_tag(&self, id: &str, update: TagUpdate) -> Result<Option<Tag>>;

    /// List all tags by position, then name.
    fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Delete a tag and its links.
    fn delete_tag(&self, id: &str) -> Result<bool>;

    // Attachments
    /// Record an attachment for a task.
    fn add_asset(&self, asset: NewAsset) -> Result<TaskAsset>;

    /// Delete an attachment record.
    fn delete_asset(&self, asset: &TaskAsset) -> Result<bool>;
}

/// An attachment to record. The bytes are assumed to be uploaded already.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    /// Task the file belongs to.
    pub todo_id: String,
    /// Original file name.
    pub file_name: String,
    /// MIME type reported by the uploader.
    pub mime_type: String,
    /// File size.
    pub size_bytes: u64,
}

impl NewAsset {
    /// Object path in the bucket: `<bucket>/<todo_id>/<asset_id>-<file_name>`.
    #[must_use]
    pub fn storage_path(&self, asset_id: &str) -> String {
        format!("{TASK_ASSET_BUCKET}/{}/{asset_id}-{}", self.todo_id, self.file_name)
    }
}

/// Error when a referenced task is not found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskNotFound(pub String);

impl std::fmt::Display for TaskNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task not found: {}", self.0)
    }
}

impl std::error::Error for TaskNotFound {}

/// Error when an update does not say which task to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingTaskId;

impl std::fmt::Display for MissingTaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task id is required for updates")
    }
}

impl std::error::Error for MissingTaskId {}

/// Run a read that selects the attachment relation, retrying without it
/// when the backend reports the relation does not exist.
///
/// `query` receives whether to include attachments. Any other error is
/// returned as is.
///
/// # Errors
///
/// Returns the error of the first attempt, unless it names
/// [`ASSET_RELATION`], in which case the error of the retry.
pub fn fetch_with_asset_fallback<T, F>(mut query: F) -> Result<T>
where
    F: FnMut(bool) -> Result<T>,
{
    match query(true) {
        Err(err) if err.mentions_relation(ASSET_RELATION) => {
            tracing::warn!(error = %err, "attachment relation unavailable, reading without it");
            query(false)
        }
        other => other,
    }
}

/// SQLite-based task store.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    db_path: PathBuf,
    asset_policy: AssetPolicy,
}

impl SqliteTaskStore {
    /// Create a store at the given path, creating tables as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::open_existing(db_path);
        store.init_schema()?;
        Ok(store)
    }

    /// Use a database as is, without creating or altering tables.
    ///
    /// Serves deployments whose schema predates attachments.
    #[must_use]
    pub fn open_existing(db_path: impl AsRef<Path>) -> Self {
        Self { db_path: db_path.as_ref().to_path_buf(), asset_policy: AssetPolicy::default() }
    }

    /// Replace the attachment acceptance rules.
    #[must_use]
    pub fn with_asset_policy(mut self, policy: AssetPolicy) -> Self {
        self.asset_policy = policy;
        self
    }

    /// Get the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection to the database.
    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;")?;
        Ok(conn)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;

        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                title TEXT NOT NULL DEFAULT '',
                memo TEXT,
                -- free-form: legacy labels are normalized on read
                status TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                -- INTEGER, or a JSON array written by older clients
                total_time,
                is_private INTEGER NOT NULL DEFAULT 0,
                is_timing INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                color TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS todo_tags (
                todo_id TEXT NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
                tag_id TEXT NOT NULL,
                PRIMARY KEY (todo_id, tag_id)
            );

            CREATE TABLE IF NOT EXISTS todo_assets (
                id TEXT PRIMARY KEY,
                todo_id TEXT NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
                file_name TEXT NOT NULL,
                storage_path TEXT NOT NULL,
                mime_type TEXT,
                size_bytes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_todos_status_order ON todos(status, sort_order);
            CREATE INDEX IF NOT EXISTS idx_todo_tags_tag_id ON todo_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_todo_assets_todo_id ON todo_assets(todo_id);
            ",
        )?;

        Ok(())
    }

    /// Convert a stored value into its JSON form for the raw record.
    fn column_to_json(column: &str, value: ValueRef<'_>) -> Value {
        match value {
            ValueRef::Null | ValueRef::Blob(_) => Value::Null,
            ValueRef::Integer(i) if BOOL_COLUMNS.contains(&column) => Value::Bool(i != 0),
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Value::from(f),
            ValueRef::Text(bytes) => {
                let text = String::from_utf8_lossy(bytes);
                if column == ELAPSED_FIELD {
                    serde_json::from_str(&text).unwrap_or(Value::Null)
                } else {
                    Value::String(text.into_owned())
                }
            }
        }
    }

    /// Convert a record value into a bindable parameter.
    fn json_to_sql(value: &Value) -> SqlValue {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(SqlValue::Integer)
                .or_else(|| n.as_f64().map(SqlValue::Real))
                .unwrap_or(SqlValue::Null),
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }

    /// Read todo rows plus their nested join rows as raw records.
    fn load_records(
        conn: &Connection,
        id: Option<&str>,
        include_assets: bool,
    ) -> Result<Vec<RawTaskRecord>> {
        let filter = if id.is_some() { "WHERE id = ?1" } else { "" };
        let sql = format!(
            "SELECT {} FROM todos {filter} ORDER BY sort_order ASC, updated_at DESC",
            TODO_COLUMNS.join(", ")
        );
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<RawTaskRecord> {
            let mut record = Map::new();
            for (index, column) in TODO_COLUMNS.iter().enumerate() {
                record.insert((*column).to_string(), Self::column_to_json(column, row.get_ref(index)?));
            }
            Ok(RawTaskRecord(record))
        };
        let mut records: Vec<RawTaskRecord> = match id {
            Some(id) => stmt.query_map(params![id], map_row)?.collect::<rusqlite::Result<_>>()?,
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<_>>()?,
        };

        let mut tag_links = Self::load_tag_links(conn, id)?;
        let mut assets = if include_assets { Some(Self::load_assets(conn, id)?) } else { None };

        for record in &mut records {
            let todo_id = record.get_str("id").unwrap_or_default().to_string();
            record.insert(TAG_LINKS_FIELD, tag_links.remove(&todo_id).unwrap_or_default());
            if let Some(ref mut assets) = assets {
                record.insert(ASSETS_FIELD, assets.remove(&todo_id).unwrap_or_default());
            }
        }

        Ok(records)
    }

    /// Tag join rows grouped by task. A link to a deleted tag yields a null `tag`.
    fn load_tag_links(conn: &Connection, id: Option<&str>) -> Result<HashMap<String, Vec<Value>>> {
        let filter = if id.is_some() { "WHERE tt.todo_id = ?1" } else { "" };
        let sql = format!(
            "SELECT tt.todo_id, tt.tag_id, t.id, t.name, t.color, t.sort_order
             FROM todo_tags tt LEFT JOIN tags t ON t.id = tt.tag_id {filter}
             ORDER BY t.sort_order, t.name"
        );
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, Value)> {
            let todo_id: String = row.get(0)?;
            let tag_id: String = row.get(1)?;
            let tag = match row.get::<_, Option<String>>(2)? {
                Some(id) => json!({
                    "id": id,
                    "name": row.get::<_, String>(3)?,
                    "color": row.get::<_, Option<String>>(4)?,
                    "sort_order": row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                }),
                None => Value::Null,
            };
            Ok((todo_id.clone(), json!({ "todo_id": todo_id, "tag_id": tag_id, "tag": tag })))
        };
        let rows: Vec<(String, Value)> = match id {
            Some(id) => stmt.query_map(params![id], map_row)?.collect::<rusqlite::Result<_>>()?,
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<_>>()?,
        };
        Ok(group_by_task(rows))
    }

    /// Attachment rows grouped by task.
    fn load_assets(conn: &Connection, id: Option<&str>) -> Result<HashMap<String, Vec<Value>>> {
        let filter = if id.is_some() { "WHERE todo_id = ?1" } else { "" };
        let sql = format!(
            "SELECT id, todo_id, file_name, storage_path, mime_type, size_bytes, created_at
             FROM todo_assets {filter} ORDER BY created_at ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &rusqlite::Row| -> rusqlite::Result<(String, Value)> {
            let todo_id: String = row.get(1)?;
            let asset = json!({
                "id": row.get::<_, String>(0)?,
                "todo_id": todo_id,
                "file_name": row.get::<_, String>(2)?,
                "storage_path": row.get::<_, String>(3)?,
                "mime_type": row.get::<_, Option<String>>(4)?,
                "size_bytes": row.get::<_, i64>(5)?.max(0),
                "created_at": row.get::<_, Option<String>>(6)?,
            });
            Ok((todo_id, asset))
        };
        let rows: Vec<(String, Value)> = match id {
            Some(id) => stmt.query_map(params![id], map_row)?.collect::<rusqlite::Result<_>>()?,
            None => stmt.query_map([], map_row)?.collect::<rusqlite::Result<_>>()?,
        };
        Ok(group_by_task(rows))
    }

    /// Read tasks, degrading to no attachments on older schemas.
    fn read_tasks(&self, id: Option<&str>) -> Result<Vec<Task>> {
        let conn = self.open()?;
        let records =
            fetch_with_asset_fallback(|include_assets| Self::load_records(&conn, id, include_assets))?;
        Ok(records.iter().map(normalize_task).collect())
    }

    fn map_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: row.get(0)?,
            name: row.get(1)?,
            color: row.get(2)?,
            sort_order: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        })
    }

    fn fetch_tag_where(conn: &Connection, column: &str, value: &str) -> Result<Option<Tag>> {
        let sql = format!("{TAG_SELECT} WHERE {column} = ?1 ORDER BY sort_order LIMIT 1");
        Ok(conn.query_row(&sql, params![value], Self::map_tag).optional()?)
    }

    /// Replace the tag links of a task.
    fn write_tag_links(conn: &Connection, todo_id: &str, tags: &[Tag]) -> Result<()> {
        conn.execute("DELETE FROM todo_tags WHERE todo_id = ?1", params![todo_id])?;
        let mut stmt =
            conn.prepare("INSERT OR IGNORE INTO todo_tags (todo_id, tag_id) VALUES (?1, ?2)")?;
        for tag in tags {
            stmt.execute(params![todo_id, tag.id])?;
        }
        Ok(())
    }

    /// Delete dependent rows of a task; failures are logged, not returned.
    fn delete_dependents(conn: &Connection, todo_id: &str) {
        for (table, label) in [(ASSET_RELATION, "attachments"), ("todo_tags", "tag links")] {
            let sql = format!("DELETE FROM {table} WHERE todo_id = ?1");
            if let Err(err) = conn.execute(&sql, params![todo_id]) {
                tracing::warn!(task_id = todo_id, error = %err, "failed to delete {label}, continuing");
            }
        }
    }
}

fn group_by_task(rows: Vec<(String, Value)>) -> HashMap<String, Vec<Value>> {
    let mut grouped: HashMap<String, Vec<Value>> = HashMap::new();
    for (todo_id, value) in rows {
        grouped.entry(todo_id).or_default().push(value);
    }
    grouped
}

impl TaskStore for SqliteTaskStore {
    fn fetch_all_tasks(&self) -> Result<Vec<Task>> {
        self.read_tasks(None)
    }

    fn fetch_task(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.read_tasks(Some(id))?.into_iter().next())
    }

    fn create_task(&self, patch: TaskPatch) -> Result<Task> {
        let title = patch.title.clone().unwrap_or_default();
        let id = generate_task_id(&title);
        let tags = patch.tags.clone().unwrap_or_default();

        let patch = TaskPatch {
            id: Some(id.clone()),
            title: Some(title),
            status: Some(patch.status.unwrap_or_default()),
            is_private: Some(patch.is_private.unwrap_or(false)),
            sort_order: Some(patch.sort_order.unwrap_or(0)),
            ..patch
        };
        let record = convert_task_for_persistence(&patch);

        let columns: Vec<&str> =
            TODO_COLUMNS.iter().copied().filter(|c| record.contains_key(c)).collect();
        let values: Vec<SqlValue> =
            columns.iter().filter_map(|c| record.get(c)).map(Self::json_to_sql).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO todos ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let conn = self.open()?;
        conn.execute(&sql, rusqlite::params_from_iter(values))?;
        if !tags.is_empty() {
            Self::write_tag_links(&conn, &id, &tags)?;
        }
        tracing::debug!(task_id = %id, "created task");

        self.fetch_task(&id)?.ok_or_else(|| Error::Task(Box::new(TaskNotFound(id))))
    }

    fn update_task(&self, patch: TaskPatch) -> Result<Option<Task>> {
        let Some(id) = patch.id.clone() else {
            return Err(Error::Task(Box::new(MissingTaskId)));
        };

        let mut record = convert_task_for_persistence(&patch);
        record.remove("id");

        let mut updates = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        for column in TODO_COLUMNS {
            if let Some(value) = record.get(column) {
                updates.push(format!("{column} = ?"));
                values.push(Self::json_to_sql(value));
            }
        }
        values.push(SqlValue::Text(id.clone()));

        let sql = format!("UPDATE todos SET {} WHERE id = ?", updates.join(", "));
        let conn = self.open()?;
        let rows = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        if rows == 0 {
            return Ok(None);
        }

        if let Some(ref tags) = patch.tags {
            Self::write_tag_links(&conn, &id, tags)?;
        }

        self.fetch_task(&id)
    }

    fn delete_task(&self, id: &str) -> Result<bool> {
        let conn = self.open()?;
        Self::delete_dependents(&conn, id);
        let rows = conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        if rows > 0 {
            tracing::debug!(task_id = id, "deleted task");
        }
        Ok(rows > 0)
    }

    fn update_task_order(&self, update: &OrderUpdate) -> Result<bool> {
        let conn = self.open()?;
        let rows = conn.execute(
            "UPDATE todos SET sort_order = ?1 WHERE id = ?2",
            params![update.sort_order, update.id],
        )?;
        Ok(rows > 0)
    }

    fn create_tag(&self, name: &str, color: Option<&str>) -> Result<Tag> {
        let conn = self.open()?;
        if let Some(existing) = Self::fetch_tag_where(&conn, "name", name)? {
            tracing::debug!(tag_id = %existing.id, "tag name already exists, reusing");
            return Ok(existing);
        }

        let max: Option<i64> =
            conn.query_row("SELECT MAX(sort_order) FROM tags", [], |row| row.get(0))?;
        let tag = Tag {
            id: generate_tag_id(name),
            name: name.to_string(),
            color: color.map(str::to_string),
            sort_order: append_key_after(max),
        };
        conn.execute(
            "INSERT INTO tags (id, name, color, sort_order) VALUES (?1, ?2, ?3, ?4)",
            params![tag.id, tag.name, tag.color, tag.sort_order],
        )?;
        Ok(tag)
    }

    fn update_tag(&self, id: &str, update: TagUpdate) -> Result<Option<Tag>> {
        let conn = self.open()?;

        let mut updates = Vec::new();
        let mut values: Vec<SqlValue> = Vec::new();
        if let Some(name) = update.name {
            updates.push("name = ?");
            values.push(SqlValue::Text(name));
        }
        if let Some(color) = update.color {
            updates.push("color = ?");
            values.push(SqlValue::Text(color));
        }
        if let Some(sort_order) = update.sort_order {
            updates.push("sort_order = ?");
            values.push(SqlValue::Integer(sort_order));
        }

        if !updates.is_empty() {
            values.push(SqlValue::Text(id.to_string()));
            let sql = format!("UPDATE tags SET {} WHERE id = ?", updates.join(", "));
            conn.execute(&sql, rusqlite::params_from_iter(values))?;
        }

        Self::fetch_tag_where(&conn, "id", id)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(&format!("{TAG_SELECT} ORDER BY sort_order ASC, name ASC"))?;
        let tags = stmt.query_map([], Self::map_tag)?.collect::<rusqlite::Result<_>>()?;
        Ok(tags)
    }

    fn delete_tag(&self, id: &str) -> Result<bool> {
        let conn = self.open()?;
        if let Err(err) = conn.execute("DELETE FROM todo_tags WHERE tag_id = ?1", params![id]) {
            tracing::warn!(tag_id = id, error = %err, "failed to delete tag links, continuing");
        }
        let rows = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn add_asset(&self, asset: NewAsset) -> Result<TaskAsset> {
        self.asset_policy
            .check(&asset.mime_type, asset.size_bytes)
            .map_err(|rejected| Error::Task(Box::new(rejected)))?;

        let conn = self.open()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM todos WHERE id = ?1)",
            params![asset.todo_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(Error::Task(Box::new(TaskNotFound(asset.todo_id))));
        }

        let id = generate_asset_id(&asset.file_name);
        let record = TaskAsset {
            storage_path: asset.storage_path(&id),
            id,
            todo_id: asset.todo_id,
            file_name: asset.file_name,
            mime_type: Some(asset.mime_type),
            size_bytes: asset.size_bytes,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        conn.execute(
            "INSERT INTO todo_assets (id, todo_id, file_name, storage_path, mime_type, size_bytes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.todo_id,
                record.file_name,
                record.storage_path,
                record.mime_type,
                i64::try_from(record.size_bytes).unwrap_or(i64::MAX),
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    fn delete_asset(&self, asset: &TaskAsset) -> Result<bool> {
        let conn = self.open()?;
        let rows = conn.execute("DELETE FROM todo_assets WHERE id = ?1", params![asset.id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::models::Status;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteTaskStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteTaskStore::new(dir.path().join("board.sqlite3")).unwrap();
        (dir, store)
    }

    fn raw_conn(store: &SqliteTaskStore) -> Connection {
        Connection::open(store.db_path()).unwrap()
    }

    fn titled(title: &str) -> TaskPatch {
        TaskPatch { title: Some(title.to_string()), ..TaskPatch::default() }
    }

    #[test]
    fn test_create_task_defaults() {
        let (_dir, store) = store();
        let task = store.create_task(titled("Write report")).unwrap();

        assert!(task.id.starts_with("write-report-"));
        assert_eq!(task.title, "Write report");
        assert_eq!(task.status, Status::Priority);
        assert_eq!(task.sort_order, 0);
        assert!(!task.is_private);
        assert!(task.tags.is_empty());
        assert!(task.assets.is_empty());
        assert!(task.updated_at.is_some());
    }

    #[test]
    fn test_create_task_with_tags() {
        let (_dir, store) = store();
        let work = store.create_tag("work", Some("#00f")).unwrap();
        let home = store.create_tag("home", None).unwrap();

        let patch = TaskPatch {
            status: Some(Status::Next),
            sort_order: Some(300),
            tags: Some(vec![work.clone(), home.clone()]),
            ..titled("Tagged")
        };
        let task = store.create_task(patch).unwrap();

        assert_eq!(task.status, Status::Next);
        assert_eq!(task.sort_order, 300);
        assert_eq!(task.tags, vec![work, home]);
    }

    #[test]
    fn test_create_tag_appends_and_reuses_name() {
        let (_dir, store) = store();
        let work = store.create_tag("work", Some("#00f")).unwrap();
        let admin = store.create_tag("admin", None).unwrap();
        assert_eq!((work.sort_order, admin.sort_order), (100, 200));

        let again = store.create_tag("work", Some("#f00")).unwrap();
        assert_eq!(again, work);

        let names: Vec<String> = store.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["work", "admin"]);
    }

    #[test]
    fn test_create_tag_after_max_key() {
        let (_dir, store) = store();
        let work = store.create_tag("work", None).unwrap();
        store
            .update_tag(&work.id, TagUpdate { sort_order: Some(i64::MAX), ..TagUpdate::default() })
            .unwrap();
        assert_eq!(store.create_tag("home", None).unwrap().sort_order, i64::MAX);
    }

    #[test]
    fn test_update_tag() {
        let (_dir, store) = store();
        let work = store.create_tag("work", None).unwrap();
        let home = store.create_tag("home", None).unwrap();
        let patch = TaskPatch { tags: Some(vec![work.clone(), home.clone()]), ..titled("T") };
        let task = store.create_task(patch).unwrap();

        let update = TagUpdate {
            name: Some("office".to_string()),
            color: Some("#0f0".to_string()),
            sort_order: Some(300),
        };
        let updated = store.update_tag(&work.id, update).unwrap().unwrap();
        assert_eq!(updated.name, "office");
        assert_eq!(updated.color.as_deref(), Some("#0f0"));
        assert_eq!(updated.sort_order, 300);

        let ids: Vec<String> = store.list_tags().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![home.id.clone(), work.id.clone()]);

        let linked: Vec<String> =
            store.fetch_task(&task.id).unwrap().unwrap().tags.into_iter().map(|t| t.name).collect();
        assert_eq!(linked, vec!["home", "office"]);

        let unchanged = store.update_tag(&home.id, TagUpdate::default()).unwrap();
        assert_eq!(unchanged, Some(home));
        assert!(store.update_tag("nope", TagUpdate::default()).unwrap().is_none());
        let missing = TagUpdate { name: Some("x".to_string()), ..TagUpdate::default() };
        assert!(store.update_tag("nope", missing).unwrap().is_none());
    }

    #[test]
    fn test_fetch_all_orders_by_sort_key() {
        let (_dir, store) = store();
        for (title, key) in [("c", 300), ("a", 100), ("b", 200)] {
            store.create_task(TaskPatch { sort_order: Some(key), ..titled(title) }).unwrap();
        }
        let titles: Vec<String> =
            store.fetch_all_tasks().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_fetch_task_missing() {
        let (_dir, store) = store();
        assert!(store.fetch_task("nope").unwrap().is_none());
    }

    #[test]
    fn test_legacy_rows_are_normalized_on_read() {
        let (_dir, store) = store();
        let conn = raw_conn(&store);
        conn.execute_batch(
            r"
            INSERT INTO todos (id, title, status, total_time) VALUES ('a', 'A', '完了', '[45, 99]');
            INSERT INTO todos (id, title, status, total_time) VALUES ('b', 'B', 'in_progress', 30);
            INSERT INTO todos (id, title, status, total_time) VALUES ('c', 'C', NULL, '[]');
            INSERT INTO todos (id, title, status) VALUES ('d', 'D', 'whatever');
            ",
        )
        .unwrap();

        let a = store.fetch_task("a").unwrap().unwrap();
        assert_eq!(a.status, Status::Archived);
        assert_eq!(a.total_elapsed_seconds, 45);

        let b = store.fetch_task("b").unwrap().unwrap();
        assert_eq!(b.status, Status::Next);
        assert_eq!(b.total_elapsed_seconds, 30);

        let c = store.fetch_task("c").unwrap().unwrap();
        assert_eq!(c.status, Status::Priority);
        assert_eq!(c.total_elapsed_seconds, 0);

        assert_eq!(store.fetch_task("d").unwrap().unwrap().status, Status::Priority);
    }

    #[test]
    fn test_dangling_tag_link_is_dropped() {
        let (_dir, store) = store();
        let tag = store.create_tag("work", None).unwrap();
        let task = store.create_task(TaskPatch { tags: Some(vec![tag]), ..titled("T") }).unwrap();
        raw_conn(&store)
            .execute("INSERT INTO todo_tags (todo_id, tag_id) VALUES (?1, 'gone')", params![task.id])
            .unwrap();

        let task = store.fetch_task(&task.id).unwrap().unwrap();
        assert_eq!(task.tags.len(), 1);
        assert_eq!(task.tags[0].name, "work");
    }

    #[test]
    fn test_update_task_fields_and_tags() {
        let (_dir, store) = store();
        let work = store.create_tag("work", None).unwrap();
        let task = store.create_task(TaskPatch { tags: Some(vec![work]), ..titled("Old") }).unwrap();

        let patch = TaskPatch {
            title: Some("New".to_string()),
            status: Some(Status::Archived),
            memo: Some("done".to_string()),
            total_elapsed_seconds: Some(3600),
            tags: Some(vec![]),
            ..TaskPatch::for_id(task.id.clone())
        };
        let updated = store.update_task(patch).unwrap().unwrap();

        assert_eq!(updated.title, "New");
        assert_eq!(updated.status, Status::Archived);
        assert_eq!(updated.memo.as_deref(), Some("done"));
        assert_eq!(updated.total_elapsed_seconds, 3600);
        assert!(updated.tags.is_empty());
    }

    #[test]
    fn test_update_without_tags_keeps_links() {
        let (_dir, store) = store();
        let work = store.create_tag("work", None).unwrap();
        let task = store.create_task(TaskPatch { tags: Some(vec![work]), ..titled("T") }).unwrap();

        let patch = TaskPatch { is_private: Some(true), ..TaskPatch::for_id(task.id.clone()) };
        let updated = store.update_task(patch).unwrap().unwrap();
        assert!(updated.is_private);
        assert_eq!(updated.tags.len(), 1);
    }

    #[test]
    fn test_update_requires_id() {
        let (_dir, store) = store();
        let err = store.update_task(titled("x")).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_update_missing_task() {
        let (_dir, store) = store();
        assert!(store.update_task(TaskPatch::for_id("nope")).unwrap().is_none());
    }

    #[test]
    fn test_update_task_order() {
        let (_dir, store) = store();
        let task = store.create_task(titled("T")).unwrap();
        assert!(store.update_task_order(&OrderUpdate::new(task.id.clone(), 450)).unwrap());
        assert_eq!(store.fetch_task(&task.id).unwrap().unwrap().sort_order, 450);
        assert!(!store.update_task_order(&OrderUpdate::new("nope", 1)).unwrap());
    }

    #[test]
    fn test_delete_task_removes_dependents() {
        let (_dir, store) = store();
        let tag = store.create_tag("work", None).unwrap();
        let task = store.create_task(TaskPatch { tags: Some(vec![tag.clone()]), ..titled("T") }).unwrap();
        store
            .add_asset(NewAsset {
                todo_id: task.id.clone(),
                file_name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                size_bytes: 12,
            })
            .unwrap();

        assert!(store.delete_task(&task.id).unwrap());
        assert!(!store.delete_task(&task.id).unwrap());

        let conn = raw_conn(&store);
        let links: i64 =
            conn.query_row("SELECT COUNT(*) FROM todo_tags", [], |row| row.get(0)).unwrap();
        let assets: i64 =
            conn.query_row("SELECT COUNT(*) FROM todo_assets", [], |row| row.get(0)).unwrap();
        assert_eq!((links, assets), (0, 0));
        assert_eq!(store.list_tags().unwrap(), vec![tag]);
    }

    #[test]
    fn test_assets_round_trip() {
        let (_dir, store) = store();
        let task = store.create_task(titled("T")).unwrap();
        let asset = store
            .add_asset(NewAsset {
                todo_id: task.id.clone(),
                file_name: "plan.pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                size_bytes: 2048,
            })
            .unwrap();
        assert!(asset.storage_path.starts_with(&format!("task-assets/{}/", task.id)));

        let fetched = store.fetch_task(&task.id).unwrap().unwrap();
        assert_eq!(fetched.assets, vec![asset.clone()]);

        assert!(store.delete_asset(&asset).unwrap());
        assert!(store.fetch_task(&task.id).unwrap().unwrap().assets.is_empty());
    }

    #[test]
    fn test_add_asset_checks_policy_and_task() {
        let (_dir, store) = store();
        let store = store.with_asset_policy(AssetPolicy { max_size_bytes: 10, ..AssetPolicy::default() });
        let task = store.create_task(titled("T")).unwrap();

        let too_big = NewAsset {
            todo_id: task.id,
            file_name: "big.png".to_string(),
            mime_type: "image/png".to_string(),
            size_bytes: 11,
        };
        assert!(store.add_asset(too_big.clone()).unwrap_err().to_string().contains("limit"));

        let orphan = NewAsset { todo_id: "nope".to_string(), size_bytes: 1, ..too_big };
        assert!(store.add_asset(orphan).unwrap_err().to_string().contains("task not found"));
    }

    #[test]
    fn test_delete_tag_removes_links() {
        let (_dir, store) = store();
        let tag = store.create_tag("work", None).unwrap();
        let task = store.create_task(TaskPatch { tags: Some(vec![tag.clone()]), ..titled("T") }).unwrap();

        assert!(store.delete_tag(&tag.id).unwrap());
        assert!(store.list_tags().unwrap().is_empty());
        assert!(store.fetch_task(&task.id).unwrap().unwrap().tags.is_empty());
    }

    #[test]
    fn test_fallback_retries_without_assets() {
        let mut calls = Vec::new();
        let result = fetch_with_asset_fallback(|include_assets| {
            calls.push(include_assets);
            if include_assets {
                Err(Error::Backend(
                    "Could not find a relationship between 'todos' and 'todo_assets'".to_string(),
                ))
            } else {
                Ok(vec![normalize_task(&RawTaskRecord::new())])
            }
        })
        .unwrap();

        assert_eq!(calls, vec![true, false]);
        assert!(result[0].assets.is_empty());
    }

    #[test]
    fn test_fallback_propagates_other_errors() {
        let mut calls = 0;
        let result: Result<()> = fetch_with_asset_fallback(|_| {
            calls += 1;
            Err(Error::Backend("permission denied for table todos".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_schema_without_assets_table() {
        let (_dir, store) = store();
        let task = store.create_task(titled("Old schema")).unwrap();
        raw_conn(&store).execute_batch("DROP TABLE todo_assets;").unwrap();

        let legacy = SqliteTaskStore::open_existing(store.db_path());
        let tasks = legacy.fetch_all_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].assets.is_empty());
        assert!(legacy.fetch_task(&task.id).unwrap().is_some());

        assert!(legacy.delete_task(&task.id).unwrap());
        assert!(legacy.fetch_all_tasks().unwrap().is_empty());
    }
}
