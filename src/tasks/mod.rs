//! Kanban task core.
//!
//! This module provides:
//! - Canonical task, tag, and attachment types
//! - Normalization of legacy stored records (old status labels, array-wrapped
//!   elapsed time, dangling tag links, missing attachment relation)
//! - Integer sort keys for drag-and-drop moves, with column renumbering
//! - A `SQLite` store and a move service tying both together
//!
//! # Example
//!
//! ```no_run
//! use taskboard::tasks::{move_task, SqliteTaskStore, Status, TaskBoard, TaskPatch, TaskStore};
//!
//! let store = SqliteTaskStore::new("/tmp/board.sqlite3").unwrap();
//!
//! let task = store
//!     .create_task(TaskPatch { title: Some("Write report".into()), ..TaskPatch::default() })
//!     .unwrap();
//!
//! // Drop it at the top of the "next" column
//! let mut board = TaskBoard::new(store.fetch_all_tasks().unwrap());
//! let plan = move_task(&store, &mut board, &task.id, Status::Next, 0).unwrap();
//! assert_eq!(plan.main_task_update.id, task.id);
//! ```

pub mod assets;
pub mod board;
pub mod id;
pub mod models;
pub mod normalize;
pub mod ordering;
pub mod reorder;
pub mod store;

pub use assets::{AssetPolicy, AssetRejected, TASK_ASSET_BUCKET};
pub use board::{TaskBoard, Visibility};
pub use models::{
    InvalidStatus, OrderPlan, OrderUpdate, RawTaskRecord, Status, Tag, TagUpdate, Task, TaskAsset,
    TaskPatch,
};
pub use normalize::{convert_task_for_persistence, normalize_status, normalize_task};
pub use ordering::{
    append_key, append_key_after, calculate_new_orders, calculate_simple_order,
    has_duplicate_sort_orders, recalculate_all_orders,
};
pub use reorder::{move_task, reset_column};
pub use store::{
    fetch_with_asset_fallback, MissingTaskId, NewAsset, SqliteTaskStore, TaskNotFound, TaskStore,
    ASSET_RELATION,
};
