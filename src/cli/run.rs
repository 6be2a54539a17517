//! Command execution for the CLI.
//!
//! This module handles running CLI commands and producing output.

use crate::cli::{Cli, Command, TagCommand};
use crate::config::BoardConfig;
use crate::error::Error;
use crate::tasks::{
    append_key, move_task, reset_column, SqliteTaskStore, Status, TagUpdate, Task, TaskBoard,
    TaskPatch, TaskStore, Visibility,
};
use crate::time::{format_time, parse_time_to_seconds, validate_time_input};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

/// Output from running the CLI, with separate stdout and stderr messages.
#[derive(Debug)]
pub struct CliOutput {
    /// Exit code for the process.
    pub exit_code: ExitCode,
    /// Messages to print to stdout.
    pub stdout: Vec<String>,
    /// Messages to print to stderr.
    pub stderr: Vec<String>,
}

/// Run a parsed command line against the board rooted at `base_dir`.
///
/// `base_dir` is where `.taskboard/config.yaml` is looked up and what
/// relative database paths are resolved against.
#[must_use]
pub fn run(cli: Cli, base_dir: &Path) -> CliOutput {
    let config = match BoardConfig::load_or_default(base_dir) {
        Ok(c) => c,
        Err(e) => return error_output(e.to_string()),
    };
    let store = match open_store(cli.db.as_deref(), &config, base_dir) {
        Ok(s) => s,
        Err(e) => return error_output(e),
    };
    if cli.command.is_mutation() {
        tracing::info!(db = %store.db_path().display(), command = ?cli.command, "writing to board");
    } else {
        tracing::debug!(db = %store.db_path().display(), "reading board");
    }

    match cli.command {
        Command::List { status, all, private, query, tag } => {
            let visibility = if all {
                Visibility::All
            } else if private {
                Visibility::Private
            } else {
                config.task_filter
            };
            task_list(&store, status.as_deref(), visibility, query.as_deref(), tag.as_deref())
        }
        Command::Add { title, status, private, memo, tags } => {
            task_add(&store, &title, &status, private, memo, &tags)
        }
        Command::Show { id } => task_show(&store, &id),
        Command::Move { id, status, index } => task_move(&store, &id, &status, index),
        Command::Delete { id } => task_delete(&store, &id),
        Command::Renumber { status } => task_renumber(&store, &status),
        Command::Time { id, value } => task_time(&store, &id, &value),
        Command::Tag(cmd) => run_tag_cmd(&store, cmd),
    }
}

// === Task Commands ===

fn task_list(
    store: &SqliteTaskStore,
    status: Option<&str>,
    visibility: Visibility,
    query: Option<&str>,
    tag: Option<&str>,
) -> CliOutput {
    let status = match status.map(parse_status).transpose() {
        Ok(s) => s,
        Err(e) => return error_output(e),
    };
    let mut board = match load_board(store) {
        Ok(b) => b,
        Err(e) => return error_output(e),
    };
    board.set_visibility(visibility);

    let mut found: Vec<&Task> = board
        .search(query.unwrap_or_default(), tag)
        .into_iter()
        .filter(|task| status.map_or(true, |s| task.status == s))
        .collect();
    // Board order is already by key; group by column on top of it.
    found.sort_by_key(|task| Status::ALL.iter().position(|s| *s == task.status));

    let output: Vec<TaskOutput> = found.into_iter().map(TaskOutput::from).collect();
    json_output(&output)
}

fn task_add(
    store: &SqliteTaskStore,
    title: &str,
    status: &str,
    private: bool,
    memo: Option<String>,
    tag_ids: &[String],
) -> CliOutput {
    let status = match parse_status(status) {
        Ok(s) => s,
        Err(e) => return error_output(e),
    };
    let tags = if tag_ids.is_empty() {
        Vec::new()
    } else {
        let known = match store.list_tags() {
            Ok(t) => t,
            Err(e) => return error_output(e.to_string()),
        };
        let mut tags = Vec::with_capacity(tag_ids.len());
        for id in tag_ids {
            match known.iter().find(|t| &t.id == id) {
                Some(tag) => tags.push(tag.clone()),
                None => return error_output(format!("tag not found: {id}")),
            }
        }
        tags
    };
    let board = match load_board(store) {
        Ok(b) => b,
        Err(e) => return error_output(e),
    };

    let patch = TaskPatch {
        title: Some(title.to_string()),
        status: Some(status),
        sort_order: Some(append_key(&board.column(status))),
        is_private: Some(private),
        memo,
        tags: Some(tags),
        ..TaskPatch::default()
    };
    match store.create_task(patch) {
        Ok(task) => {
            tracing::info!(task_id = %task.id, %status, "added task");
            json_output(&TaskOutput::from(&task))
        }
        Err(e) => error_output(e.to_string()),
    }
}

fn task_show(store: &SqliteTaskStore, id: &str) -> CliOutput {
    match store.fetch_task(id) {
        Ok(Some(task)) => json_output(&TaskOutput::from(&task)),
        Ok(None) => error_output(format!("task not found: {id}")),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_move(store: &SqliteTaskStore, id: &str, status: &str, index: usize) -> CliOutput {
    let status = match parse_status(status) {
        Ok(s) => s,
        Err(e) => return error_output(e),
    };
    let mut board = match load_board(store) {
        Ok(b) => b,
        Err(e) => return error_output(e),
    };
    match move_task(store, &mut board, id, status, index) {
        Ok(plan) => json_output(&plan),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_delete(store: &SqliteTaskStore, id: &str) -> CliOutput {
    match store.delete_task(id) {
        Ok(true) => {
            tracing::info!(task_id = id, "deleted task");
            json_output(&DeletedOutput { id: id.to_string(), deleted: true })
        }
        Ok(false) => error_output(format!("task not found: {id}")),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_renumber(store: &SqliteTaskStore, status: &str) -> CliOutput {
    let status = match parse_status(status) {
        Ok(s) => s,
        Err(e) => return error_output(e),
    };
    let mut board = match load_board(store) {
        Ok(b) => b,
        Err(e) => return error_output(e),
    };
    match reset_column(store, &mut board, status) {
        Ok(updates) => json_output(&updates),
        Err(e) => error_output(e.to_string()),
    }
}

fn task_time(store: &SqliteTaskStore, id: &str, value: &str) -> CliOutput {
    if !validate_time_input(value) {
        return error_output(Error::InvalidTime(value.to_string()).to_string());
    }
    let patch = TaskPatch {
        total_elapsed_seconds: Some(parse_time_to_seconds(value)),
        ..TaskPatch::for_id(id)
    };
    match store.update_task(patch) {
        Ok(Some(task)) => {
            tracing::info!(task_id = id, total = task.total_elapsed_seconds, "set tracked time");
            json_output(&TaskOutput::from(&task))
        }
        Ok(None) => error_output(format!("task not found: {id}")),
        Err(e) => error_output(e.to_string()),
    }
}

// === Tag Commands ===

fn run_tag_cmd(store: &SqliteTaskStore, cmd: TagCommand) -> CliOutput {
    match cmd {
        TagCommand::Create { name, color } => match store.create_tag(&name, color.as_deref()) {
            Ok(tag) => {
                tracing::info!(tag_id = %tag.id, "created tag");
                json_output(&tag)
            }
            Err(e) => error_output(e.to_string()),
        },
        TagCommand::Update { id, name, color, sort_order } => {
            let update = TagUpdate { name, color, sort_order };
            if update.is_empty() {
                return error_output(
                    "nothing to update: pass --name, --color or --sort-order".to_string(),
                );
            }
            match store.update_tag(&id, update) {
                Ok(Some(tag)) => {
                    tracing::info!(tag_id = %tag.id, "updated tag");
                    json_output(&tag)
                }
                Ok(None) => error_output(format!("tag not found: {id}")),
                Err(e) => error_output(e.to_string()),
            }
        }
        TagCommand::List => match store.list_tags() {
            Ok(tags) => json_output(&tags),
            Err(e) => error_output(e.to_string()),
        },
        TagCommand::Delete { id } => match store.delete_tag(&id) {
            Ok(true) => json_output(&DeletedOutput { id, deleted: true }),
            Ok(false) => error_output(format!("tag not found: {id}")),
            Err(e) => error_output(e.to_string()),
        },
    }
}

// === Helpers ===

fn open_store(
    db: Option<&Path>,
    config: &BoardConfig,
    base_dir: &Path,
) -> Result<SqliteTaskStore, String> {
    let db_path = db.map_or_else(|| config.resolve_db_path(base_dir), |p| base_dir.join(p));
    SqliteTaskStore::new(&db_path)
        .map(|store| store.with_asset_policy(config.assets.clone()))
        .map_err(|e| e.to_string())
}

fn load_board(store: &SqliteTaskStore) -> Result<TaskBoard, String> {
    store.fetch_all_tasks().map(TaskBoard::new).map_err(|e| e.to_string())
}

fn parse_status(s: &str) -> Result<Status, String> {
    Status::from_str(s).map_err(|e| e.to_string())
}

fn json_output<T: Serialize + ?Sized>(value: &T) -> CliOutput {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CliOutput { exit_code: ExitCode::SUCCESS, stdout: vec![json], stderr: vec![] },
        Err(e) => error_output(e.to_string()),
    }
}

fn error_output(message: String) -> CliOutput {
    CliOutput { exit_code: ExitCode::from(1), stdout: vec![], stderr: vec![message] }
}

// === Output Types ===

/// Task as printed by the CLI.
#[derive(Debug, Serialize)]
struct TaskOutput {
    id: String,
    title: String,
    status: &'static str,
    status_label: &'static str,
    sort_order: i64,
    total_time: String,
    total_elapsed_seconds: u64,
    is_private: bool,
    is_timing: bool,
    tags: Vec<String>,
    assets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
}

impl From<&Task> for TaskOutput {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.as_str(),
            status_label: task.status.label(),
            sort_order: task.sort_order,
            total_time: format_time(task.total_elapsed_seconds),
            total_elapsed_seconds: task.total_elapsed_seconds,
            is_private: task.is_private,
            is_timing: task.is_timing,
            tags: task.tags.iter().map(|t| t.name.clone()).collect(),
            assets: task.assets.iter().map(|a| a.file_name.clone()).collect(),
            memo: task.memo.clone(),
            updated_at: task.updated_at.clone(),
        }
    }
}

/// Result of a delete.
#[derive(Debug, Serialize)]
struct DeletedOutput {
    id: String,
    deleted: bool,
}
