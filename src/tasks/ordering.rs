//! Sort key computation for drag-and-drop moves.
//!
//! Keys are integers spaced [`ORDER_STEP`] apart, which leaves room for
//! roughly a hundred insertions between two neighbours. A move normally
//! produces a single key between the neighbours at the drop position. When a
//! column has duplicate keys, has grown past [`RENUMBER_THRESHOLD`], or has no
//! integer left between the neighbours, the whole column is renumbered
//! instead.
//!
//! Everything here is pure: the caller supplies the current column and
//! persists the returned updates.

use crate::tasks::models::{OrderPlan, OrderUpdate, Status, Task};
use std::collections::HashMap;

/// Distance between consecutive keys.
pub const ORDER_STEP: i64 = 100;

/// Columns with more members than this are always renumbered on a move.
pub const RENUMBER_THRESHOLD: usize = 10;

/// Step used by [`calculate_simple_order`].
pub const SIMPLE_ORDER_STEP: i64 = 1000;

/// Compute the keys to persist when `task` is dropped at `new_index` of
/// `target_list`.
///
/// `target_list` is the destination column and may or may not already
/// contain `task`. Missing keys count as 0.
#[must_use]
pub fn calculate_new_orders(task: &Task, new_index: usize, target_list: &[Task]) -> OrderPlan {
    let mut sorted: Vec<&Task> = target_list.iter().collect();
    sorted.sort_by_key(|t| t.sort_order);

    if has_duplicate_sort_orders(&sorted) || target_list.len() > RENUMBER_THRESHOLD {
        tracing::debug!(
            task_id = %task.id,
            new_index,
            len = target_list.len(),
            "renumbering column (duplicate keys or large column)"
        );
        return renumber(task, new_index, sorted);
    }

    let others: Vec<&Task> = sorted.iter().copied().filter(|t| t.id != task.id).collect();

    let Some(sort_order) = local_key(new_index, &others) else {
        tracing::debug!(task_id = %task.id, new_index, "no room between neighbours, renumbering");
        return renumber(task, new_index, sorted);
    };

    tracing::debug!(task_id = %task.id, new_index, sort_order, "placed between neighbours");
    OrderPlan {
        main_task_update: OrderUpdate::new(task.id.clone(), sort_order),
        other_task_updates: Vec::new(),
    }
}

/// Key for a drop at `new_index` among `others` (the column without the
/// moved task), or `None` when no integer key fits there. Keys that would
/// overflow `i64` count as not fitting.
fn local_key(new_index: usize, others: &[&Task]) -> Option<i64> {
    let (Some(first), Some(last)) = (others.first(), others.last()) else {
        return Some(ORDER_STEP);
    };

    if new_index == 0 {
        let key = first.sort_order.checked_sub(ORDER_STEP)?.max(0);
        return (key < first.sort_order).then_some(key);
    }

    if new_index >= others.len() {
        return last.sort_order.checked_add(ORDER_STEP);
    }

    let prev = others[new_index - 1].sort_order;
    let next = others[new_index].sort_order;
    let gap = next.checked_sub(prev)?;
    if gap <= 1 {
        return None;
    }
    Some(prev + gap / 2)
}

/// Reinsert `task` at `new_index` and give every member a fresh key
/// `(position + 1) * ORDER_STEP`.
fn renumber(task: &Task, new_index: usize, sorted: Vec<&Task>) -> OrderPlan {
    let mut reordered: Vec<&Task> = sorted.into_iter().filter(|t| t.id != task.id).collect();
    let index = new_index.min(reordered.len());
    reordered.insert(index, task);

    let mut main_task_update = OrderUpdate::new(task.id.clone(), key_for_position(index));
    let mut other_task_updates = Vec::with_capacity(reordered.len().saturating_sub(1));
    for (position, item) in reordered.iter().enumerate() {
        let update = OrderUpdate::new(item.id.clone(), key_for_position(position));
        if item.id == task.id {
            main_task_update = update;
        } else {
            other_task_updates.push(update);
        }
    }

    OrderPlan { main_task_update, other_task_updates }
}

#[allow(clippy::cast_possible_wrap)]
const fn key_for_position(position: usize) -> i64 {
    (position as i64 + 1) * ORDER_STEP
}

/// Check whether any sort key is held by more than one task.
#[must_use]
pub fn has_duplicate_sort_orders<T: std::borrow::Borrow<Task>>(list: &[T]) -> bool {
    let mut counts: HashMap<i64, usize> = HashMap::with_capacity(list.len());
    for item in list {
        let count = counts.entry(item.borrow().sort_order).or_insert(0);
        *count += 1;
        if *count > 1 {
            return true;
        }
    }
    false
}

/// Coarse key from the index alone: `(new_index + 1) * 1000`.
///
/// Ignores neighbours entirely; meant for recovery, not for normal moves.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn calculate_simple_order(task: &Task, new_index: usize) -> OrderUpdate {
    OrderUpdate::new(task.id.clone(), (new_index as i64 + 1) * SIMPLE_ORDER_STEP)
}

/// Key that places a new task after every member of `column`.
#[must_use]
pub fn append_key(column: &[Task]) -> i64 {
    append_key_after(column.iter().map(|t| t.sort_order).max())
}

/// Key one step after `max`, or the first key when there is none.
/// Saturates at `i64::MAX`.
#[must_use]
pub fn append_key_after(max: Option<i64>) -> i64 {
    max.map_or(ORDER_STEP, |max| max.saturating_add(ORDER_STEP))
}

/// Reassign `index * 100` to every task in `status`, keeping current order.
///
/// Used to repair a column wholesale.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn recalculate_all_orders(tasks: &[Task], status: Status) -> Vec<OrderUpdate> {
    let mut column: Vec<&Task> = tasks.iter().filter(|t| t.status == status).collect();
    column.sort_by_key(|t| t.sort_order);
    column
        .iter()
        .enumerate()
        .map(|(index, t)| OrderUpdate::new(t.id.clone(), index as i64 * ORDER_STEP))
        .collect()
}
