//! Moving tasks between and within columns.
//!
//! Ties the order calculator to a store and a board: compute the plan from
//! the board, persist it, then update the board with what was persisted.

use crate::error::{Error, Result};
use crate::tasks::board::TaskBoard;
use crate::tasks::models::{OrderPlan, OrderUpdate, Status, TaskPatch};
use crate::tasks::ordering::{calculate_new_orders, recalculate_all_orders};
use crate::tasks::store::{TaskNotFound, TaskStore};

fn not_found(task_id: &str) -> Error {
    Error::Task(Box::new(TaskNotFound(task_id.to_string())))
}

/// Move `task_id` to position `new_index` of the `target_status` column.
///
/// The status change and the moved task's key are written first and any
/// failure there is returned. Keys for the rest of a renumbered column are
/// written best-effort: a failed write is logged and that task keeps its
/// old key on the board.
///
/// # Errors
///
/// Returns an error if the task is not on the board, or if the status or
/// main key cannot be persisted.
pub fn move_task<S: TaskStore + ?Sized>(
    store: &S,
    board: &mut TaskBoard,
    task_id: &str,
    target_status: Status,
    new_index: usize,
) -> Result<OrderPlan> {
    let task = board.get(task_id).cloned().ok_or_else(|| not_found(task_id))?;
    let target_list = board.column(target_status);
    let plan = calculate_new_orders(&task, new_index, &target_list);
    let main = &plan.main_task_update;

    if task.status == target_status {
        if !store.update_task_order(main)? {
            return Err(not_found(task_id));
        }
    } else {
        let patch = TaskPatch {
            status: Some(target_status),
            sort_order: Some(main.sort_order),
            ..TaskPatch::for_id(task_id)
        };
        store.update_task(patch)?.ok_or_else(|| not_found(task_id))?;
        board.set_status(task_id, target_status);
    }
    board.apply_order_update(main);

    for update in &plan.other_task_updates {
        match store.update_task_order(update) {
            Ok(true) => {
                board.apply_order_update(update);
            }
            Ok(false) => {
                tracing::warn!(task_id = %update.id, "task vanished while renumbering, skipping");
            }
            Err(err) => {
                tracing::warn!(task_id = %update.id, error = %err, "failed to persist sort key, continuing");
            }
        }
    }

    tracing::info!(
        task_id,
        from = %task.status,
        to = %target_status,
        sort_order = main.sort_order,
        renumbered = plan.is_renumbered(),
        "moved task"
    );
    Ok(plan)
}

/// Renumber a whole column from 0 in steps of 100, keeping its current order.
///
/// # Errors
///
/// Returns the first persistence error. Updates written before it stay
/// applied to the board.
pub fn reset_column<S: TaskStore + ?Sized>(
    store: &S,
    board: &mut TaskBoard,
    status: Status,
) -> Result<Vec<OrderUpdate>> {
    let updates = recalculate_all_orders(&board.column(status), status);
    for update in &updates {
        store.update_task_order(update)?;
        board.apply_order_update(update);
    }
    tracing::info!(%status, count = updates.len(), "renumbered column");
    Ok(updates)
}
