//! In-memory board state owned by the caller.
//!
//! The board holds the normalized task list between reads. It never talks to
//! storage: callers persist first, then apply the same change here.

use crate::tasks::models::{OrderUpdate, Status, Task, TaskAsset};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Which tasks the board shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Every task.
    All,
    /// Only private tasks.
    Private,
    /// Only tasks not marked private.
    #[default]
    Public,
}

impl Visibility {
    /// Whether `task` passes this filter.
    #[must_use]
    pub const fn admits(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Private => task.is_private,
            Self::Public => !task.is_private,
        }
    }
}

/// The task list plus view settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoard {
    tasks: Vec<Task>,
    visibility: Visibility,
}

impl TaskBoard {
    /// Create a board over already-normalized tasks.
    #[must_use]
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks, visibility: Visibility::default() }
    }

    /// All tasks, in the order they were loaded or inserted.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the board has no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Replace the whole list (after a refetch).
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Look up a task.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Current visibility filter.
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Change the visibility filter.
    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    /// Tasks that pass the visibility filter.
    pub fn visible_tasks(&self) -> impl Iterator<Item = &Task> {
        let visibility = self.visibility;
        self.tasks.iter().filter(move |t| visibility.admits(t))
    }

    /// Tasks in `status`, ordered by sort key then most recently updated.
    ///
    /// This is the list to hand to the order calculator. It ignores the
    /// visibility filter, since hidden tasks still hold keys.
    #[must_use]
    pub fn column(&self, status: Status) -> Vec<Task> {
        let mut column: Vec<Task> =
            self.tasks.iter().filter(|t| t.status == status).cloned().collect();
        column.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| Reverse(&a.updated_at).cmp(&Reverse(&b.updated_at)))
        });
        column
    }

    /// Apply a persisted key. Returns `false` if the task is not on the
    /// board, in which case the caller should refetch.
    pub fn apply_order_update(&mut self, update: &OrderUpdate) -> bool {
        match self.get_mut(&update.id) {
            Some(task) => {
                task.sort_order = update.sort_order;
                true
            }
            None => false,
        }
    }

    /// Apply a persisted status change. Returns `false` for unknown tasks.
    pub fn set_status(&mut self, id: &str, status: Status) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    /// Replace a task with the same id, or put a new one at the front.
    pub fn upsert(&mut self, task: Task) {
        match self.tasks.iter().position(|t| t.id == task.id) {
            Some(index) => self.tasks[index] = task,
            None => self.tasks.insert(0, task),
        }
    }

    /// Remove a task, returning it.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Record a new attachment on its task. Returns `false` for unknown tasks.
    pub fn append_asset(&mut self, asset: TaskAsset) -> bool {
        match self.get_mut(&asset.todo_id) {
            Some(task) => {
                task.assets.push(asset);
                true
            }
            None => false,
        }
    }

    /// Drop an attachment from its task. Returns `false` if nothing was removed.
    pub fn remove_asset(&mut self, asset: &TaskAsset) -> bool {
        let Some(task) = self.get_mut(&asset.todo_id) else {
            return false;
        };
        let before = task.assets.len();
        task.assets.retain(|a| a.id != asset.id);
        task.assets.len() != before
    }

    /// Visible tasks matching `query` (case-insensitive, title or memo) and,
    /// when given, carrying `tag_id`. An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str, tag_id: Option<&str>) -> Vec<&Task> {
        let query = query.trim().to_lowercase();
        self.visible_tasks()
            .filter(|task| tag_id.map_or(true, |tag| task.has_tag(tag)))
            .filter(|task| {
                query.is_empty()
                    || task.title.to_lowercase().contains(&query)
                    || task.memo.as_deref().is_some_and(|m| m.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// The task whose timer is running, if any.
    #[must_use]
    pub fn timing_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.is_timing)
    }

    /// Mark `id` as the only task with a running timer.
    ///
    /// Returns the ids whose timer was switched off, or `None` if `id` is
    /// not on the board.
    pub fn start_timing(&mut self, id: &str) -> Option<Vec<String>> {
        self.get(id)?;
        let mut stopped = Vec::new();
        for task in &mut self.tasks {
            if task.id == id {
                task.is_timing = true;
            } else if task.is_timing {
                task.is_timing = false;
                stopped.push(task.id.clone());
            }
        }
        Some(stopped)
    }

    /// Stop the timer on `id` and record its new total.
    pub fn stop_timing(&mut self, id: &str, total_elapsed_seconds: u64) -> bool {
        match self.get_mut(id) {
            Some(task) => {
                task.is_timing = false;
                task.total_elapsed_seconds = total_elapsed_seconds;
                true
            }
            None => false,
        }
    }
}
