//! Conversion between backend records and canonical tasks.
//!
//! Reads are lenient: historical rows may carry old status labels, elapsed
//! time wrapped in an array, dangling tag links, or no attachment relation at
//! all. Every anomaly degrades to a documented default instead of failing.

use crate::tasks::models::{RawTaskRecord, Status, Tag, Task, TaskAsset, TaskPatch};
use serde_json::Value;

/// Field holding accumulated time (scalar, or single-element array in old rows).
pub const ELAPSED_FIELD: &str = "total_time";

/// Nested join rows linking a task to its tags.
pub const TAG_LINKS_FIELD: &str = "todo_tags";

/// Nested attachment rows.
pub const ASSETS_FIELD: &str = "todo_assets";

/// Fields that only exist on the in-memory task and are written separately.
const COMPOSITE_FIELDS: [&str; 4] = ["tags", "assets", TAG_LINKS_FIELD, ASSETS_FIELD];

/// Known status spellings, old and new.
pub const LEGACY_STATUS_MAPPING: [(&str, Status); 10] = [
    ("未対応", Status::Priority),
    ("対応中", Status::Next),
    ("完了", Status::Archived),
    ("todo", Status::Priority),
    ("in_progress", Status::Next),
    ("done", Status::Archived),
    ("priority", Status::Priority),
    ("next", Status::Next),
    ("archived", Status::Archived),
    ("'未対応'", Status::Priority),
];

/// Map a stored status string to a column. Unknown values land in
/// [`Status::Priority`].
#[must_use]
pub fn normalize_status(raw: &str) -> Status {
    LEGACY_STATUS_MAPPING
        .iter()
        .find(|(label, _)| *label == raw)
        .map_or(Status::Priority, |(_, status)| *status)
}

/// Map a column to the string written to storage.
#[must_use]
pub const fn to_storage_status(status: Status) -> &'static str {
    match status {
        Status::Priority => "priority",
        Status::Next => "next",
        Status::Archived => "archived",
    }
}

/// Decode accumulated seconds from a scalar or array value.
///
/// Arrays contribute their first element. Whole-valued floats such as
/// `45.0` count as integers and fractions are truncated. Anything else that
/// is not a non-negative number counts as zero.
#[must_use]
pub fn extract_elapsed_seconds(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Array(items)) => items.first().and_then(whole_u64).unwrap_or(0),
        Some(other) => whole_u64(other).unwrap_or(0),
        None => 0,
    }
}

// Float-to-int `as` casts saturate, so out-of-range floats clamp to the bounds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.trunc() as u64)
    })
}

#[allow(clippy::cast_possible_truncation)]
fn whole_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
}

/// Build a canonical task from a backend record.
#[must_use]
pub fn normalize_task(raw: &RawTaskRecord) -> Task {
    let status = match raw.get_str("status") {
        Some(s) if !s.is_empty() => normalize_status(s),
        _ => Status::default(),
    };

    Task {
        id: raw.get_str("id").unwrap_or_default().to_string(),
        title: raw.get_str("title").unwrap_or_default().to_string(),
        status,
        sort_order: raw.get("sort_order").and_then(whole_i64).unwrap_or(0),
        total_elapsed_seconds: extract_elapsed_seconds(raw.get(ELAPSED_FIELD)),
        is_private: raw.get_bool("is_private").unwrap_or(false),
        is_timing: raw.get_bool("is_timing").unwrap_or(false),
        tags: project_tags(raw.get(TAG_LINKS_FIELD)),
        assets: decode_assets(raw.get(ASSETS_FIELD)),
        memo: raw.get_str("memo").map(str::to_string),
        user_id: raw.get_str("user_id").map(str::to_string),
        updated_at: raw.get_str("updated_at").map(str::to_string),
    }
}

/// Pull the `tag` object out of each join row, skipping rows without one.
fn project_tags(links: Option<&Value>) -> Vec<Tag> {
    let Some(Value::Array(rows)) = links else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| row.get("tag"))
        .filter(|tag| !tag.is_null())
        .filter_map(|tag| serde_json::from_value(tag.clone()).ok())
        .collect()
}

/// Attachment rows, or nothing when the relation was not selected.
fn decode_assets(rows: Option<&Value>) -> Vec<TaskAsset> {
    let Some(Value::Array(rows)) = rows else {
        return Vec::new();
    };
    rows.iter().filter_map(|row| serde_json::from_value(row.clone()).ok()).collect()
}

/// Build the record to write for a (partial) task.
///
/// Tags and attachments are excluded; they go through their own tables.
/// `updated_at` is always stamped with the current time.
#[must_use]
pub fn convert_task_for_persistence(patch: &TaskPatch) -> RawTaskRecord {
    let mut record = RawTaskRecord::new();

    if let Some(ref id) = patch.id {
        record.insert("id", id.clone());
    }
    if let Some(ref title) = patch.title {
        record.insert("title", title.clone());
    }
    if let Some(status) = patch.status {
        record.insert("status", to_storage_status(status));
    }
    if let Some(sort_order) = patch.sort_order {
        record.insert("sort_order", sort_order);
    }
    if let Some(total) = patch.total_elapsed_seconds {
        record.insert(ELAPSED_FIELD, total);
    }
    if let Some(is_private) = patch.is_private {
        record.insert("is_private", is_private);
    }
    if let Some(is_timing) = patch.is_timing {
        record.insert("is_timing", is_timing);
    }
    if let Some(ref memo) = patch.memo {
        record.insert("memo", memo.clone());
    }
    if let Some(ref user_id) = patch.user_id {
        record.insert("user_id", user_id.clone());
    }

    for field in COMPOSITE_FIELDS {
        record.remove(field);
    }

    record.insert("updated_at", chrono::Utc::now().to_rfc3339());
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawTaskRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_status_legacy_labels() {
        assert_eq!(normalize_status("未対応"), Status::Priority);
        assert_eq!(normalize_status("対応中"), Status::Next);
        assert_eq!(normalize_status("完了"), Status::Archived);
        assert_eq!(normalize_status("todo"), Status::Priority);
        assert_eq!(normalize_status("in_progress"), Status::Next);
        assert_eq!(normalize_status("done"), Status::Archived);
        assert_eq!(normalize_status("'未対応'"), Status::Priority);
    }

    #[test]
    fn test_normalize_status_canonical_is_fixed_point() {
        for status in Status::ALL {
            assert_eq!(normalize_status(status.as_str()), status);
            assert_eq!(normalize_status(normalize_status(status.as_str()).as_str()), status);
        }
    }

    #[test]
    fn test_normalize_status_unknown_defaults_to_priority() {
        assert_eq!(normalize_status("bogus"), Status::Priority);
        assert_eq!(normalize_status(""), Status::Priority);
        assert_eq!(normalize_status("NEXT"), Status::Priority);
    }

    #[test]
    fn test_normalize_task_elapsed_array_takes_first() {
        let task = normalize_task(&raw(json!({"id": "a", "total_time": [45, 99]})));
        assert_eq!(task.total_elapsed_seconds, 45);
    }

    #[test]
    fn test_normalize_task_elapsed_scalar() {
        let task = normalize_task(&raw(json!({"id": "a", "total_time": 45})));
        assert_eq!(task.total_elapsed_seconds, 45);
    }

    #[test]
    fn test_normalize_task_elapsed_float() {
        assert_eq!(normalize_task(&raw(json!({"total_time": 45.0}))).total_elapsed_seconds, 45);
        assert_eq!(normalize_task(&raw(json!({"total_time": [45.9]}))).total_elapsed_seconds, 45);
        assert_eq!(normalize_task(&raw(json!({"total_time": -3.0}))).total_elapsed_seconds, 0);
        assert_eq!(normalize_task(&raw(json!({"total_time": -3}))).total_elapsed_seconds, 0);
        let huge = normalize_task(&raw(json!({"total_time": 1e30})));
        assert_eq!(huge.total_elapsed_seconds, u64::MAX);
    }

    #[test]
    fn test_normalize_task_sort_order_float() {
        assert_eq!(normalize_task(&raw(json!({"sort_order": 150.0}))).sort_order, 150);
        assert_eq!(normalize_task(&raw(json!({"sort_order": -250.5}))).sort_order, -250);
        assert_eq!(normalize_task(&raw(json!({"sort_order": 300}))).sort_order, 300);
        assert_eq!(normalize_task(&raw(json!({"sort_order": "300"}))).sort_order, 0);
    }

    #[test]
    fn test_normalize_task_elapsed_empty_or_missing() {
        assert_eq!(normalize_task(&raw(json!({"total_time": []}))).total_elapsed_seconds, 0);
        assert_eq!(normalize_task(&raw(json!({"total_time": [null]}))).total_elapsed_seconds, 0);
        assert_eq!(normalize_task(&raw(json!({"total_time": "x"}))).total_elapsed_seconds, 0);
        assert_eq!(normalize_task(&raw(json!({}))).total_elapsed_seconds, 0);
    }

    #[test]
    fn test_normalize_task_status_defaults() {
        assert_eq!(normalize_task(&raw(json!({}))).status, Status::Priority);
        assert_eq!(normalize_task(&raw(json!({"status": ""}))).status, Status::Priority);
        assert_eq!(normalize_task(&raw(json!({"status": null}))).status, Status::Priority);
        assert_eq!(normalize_task(&raw(json!({"status": 3}))).status, Status::Priority);
        assert_eq!(normalize_task(&raw(json!({"status": "完了"}))).status, Status::Archived);
    }

    #[test]
    fn test_normalize_task_projects_tags_and_drops_dangling_links() {
        let task = normalize_task(&raw(json!({
            "id": "a",
            "todo_tags": [
                {"todo_id": "a", "tag_id": "t1", "tag": {"id": "t1", "name": "work", "color": "#f00"}},
                {"todo_id": "a", "tag_id": "t2", "tag": null},
                {"todo_id": "a", "tag_id": "t3"},
                {"todo_id": "a", "tag_id": "t4", "tag": {"id": "t4", "name": "home"}}
            ]
        })));
        let names: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["work", "home"]);
        assert_eq!(task.tags[0].color.as_deref(), Some("#f00"));
    }

    #[test]
    fn test_normalize_task_missing_asset_relation_is_empty() {
        let task = normalize_task(&raw(json!({"id": "a"})));
        assert!(task.assets.is_empty());
        assert!(task.tags.is_empty());
    }

    #[test]
    fn test_normalize_task_reads_assets() {
        let task = normalize_task(&raw(json!({
            "id": "a",
            "todo_assets": [{
                "id": "as1",
                "todo_id": "a",
                "file_name": "plan.pdf",
                "storage_path": "u1/a/plan.pdf",
                "mime_type": "application/pdf",
                "size_bytes": 2048
            }]
        })));
        assert_eq!(task.assets.len(), 1);
        assert_eq!(task.assets[0].file_name, "plan.pdf");
        assert_eq!(task.assets[0].size_bytes, 2048);
    }

    #[test]
    fn test_normalize_task_full_record() {
        let task = normalize_task(&raw(json!({
            "id": "a",
            "title": "Write report",
            "status": "対応中",
            "sort_order": 300,
            "is_private": true,
            "is_timing": false,
            "memo": "draft first",
            "user_id": "u1",
            "updated_at": "2024-01-01T00:00:00Z"
        })));
        assert_eq!(task.title, "Write report");
        assert_eq!(task.status, Status::Next);
        assert_eq!(task.sort_order, 300);
        assert!(task.is_private);
        assert_eq!(task.memo.as_deref(), Some("draft first"));
        assert_eq!(task.user_id.as_deref(), Some("u1"));
    }

    #[test]
    fn test_convert_for_persistence_strips_composites_and_stamps() {
        let mut task = Task::new("a", "A");
        task.status = Status::Next;
        task.tags.push(Tag {
            id: "t1".to_string(),
            name: "work".to_string(),
            color: None,
            sort_order: 0,
        });

        let record = convert_task_for_persistence(&TaskPatch::from(&task));
        assert!(!record.contains_key("tags"));
        assert!(!record.contains_key("assets"));
        assert!(!record.contains_key(TAG_LINKS_FIELD));
        assert!(!record.contains_key(ASSETS_FIELD));
        assert_eq!(record.get_str("status"), Some("next"));

        let stamped = record.get_str("updated_at").unwrap();
        let parsed = chrono::DateTime::parse_from_rfc3339(stamped).unwrap();
        let age = chrono::Utc::now().signed_duration_since(parsed);
        assert!(age.num_seconds() < 5);
    }

    #[test]
    fn test_convert_for_persistence_partial_patch() {
        let patch = TaskPatch { title: Some("Only title".to_string()), ..TaskPatch::for_id("a") };
        let record = convert_task_for_persistence(&patch);
        assert_eq!(record.get_str("title"), Some("Only title"));
        assert!(!record.contains_key("status"));
        assert!(!record.contains_key("sort_order"));
        assert!(record.contains_key("updated_at"));
    }

    #[test]
    fn test_persisted_record_normalizes_back() {
        let mut task = Task::new("a", "A");
        task.status = Status::Archived;
        task.sort_order = 700;
        task.total_elapsed_seconds = 90;

        let back = normalize_task(&convert_task_for_persistence(&TaskPatch::from(&task)));
        assert_eq!(back.status, Status::Archived);
        assert_eq!(back.sort_order, 700);
        assert_eq!(back.total_elapsed_seconds, 90);
    }
}
