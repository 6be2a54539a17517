//! Command-line interface for the task board.
//!
//! Every command prints JSON on stdout. Errors go to stderr with exit code 1.

mod run;
mod tag;


pub use run::{run, CliOutput};
pub use tag::TagCommand;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Kanban task board.
///
/// Tasks live in three columns (priority, next, archived) and keep their
/// position through integer sort keys.
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file (overrides `database_path` in the config)
    #[arg(long, global = true, env = "TASKBOARD_DB")]
    pub db: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List tasks, optionally limited to one column.
    ///
    /// Without `--all` or `--private`, the config's `task_filter` decides
    /// which tasks are shown.
    List {
        /// Column: priority, next, or archived
        #[arg(long)]
        status: Option<String>,

        /// Show private and public tasks
        #[arg(long, conflicts_with = "private")]
        all: bool,

        /// Show only private tasks
        #[arg(long)]
        private: bool,

        /// Case-insensitive text to find in title or memo
        #[arg(short, long)]
        query: Option<String>,

        /// Only tasks carrying this tag ID
        #[arg(long)]
        tag: Option<String>,
    },

    /// Create a task at the end of its column.
    Add {
        /// Title for the task (required)
        #[arg(short, long)]
        title: String,

        /// Column: priority, next, or archived
        #[arg(short, long, default_value = "priority")]
        status: String,

        /// Hide the task from the public view
        #[arg(long)]
        private: bool,

        /// Free-form notes
        #[arg(short, long)]
        memo: Option<String>,

        /// Tag IDs to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Show one task.
    Show {
        /// Task ID
        id: String,
    },

    /// Move a task to a position in a column.
    ///
    /// The index counts from 0 among the other tasks of the column; an index
    /// past the end places the task last.
    Move {
        /// Task ID
        id: String,

        /// Destination column
        status: String,

        /// Position in the destination column
        index: usize,
    },

    /// Delete a task with its attachments and tag links.
    Delete {
        /// Task ID
        id: String,
    },

    /// Reassign evenly spaced keys to a whole column.
    Renumber {
        /// Column to renumber
        status: String,
    },

    /// Set the tracked time of a task.
    Time {
        /// Task ID
        id: String,

        /// New total as hh:mm:ss
        value: String,
    },

    /// Tag management.
    #[command(subcommand)]
    Tag(TagCommand),
}

impl Command {
    /// Whether the command changes stored data.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        match self {
            Self::List { .. } | Self::Show { .. } => false,
            Self::Tag(cmd) => cmd.is_mutation(),
            Self::Add { .. }
            | Self::Move { .. }
            | Self::Delete { .. }
            | Self::Renumber { .. }
            | Self::Time { .. } => true,
        }
    }
}
