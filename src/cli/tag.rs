//! Tag CLI subcommands.

use clap::Subcommand;

/// Tag management commands.
#[derive(Subcommand, Debug, Clone)]
pub enum TagCommand {
    /// Create a tag.
    Create {
        /// Tag name
        name: String,

        /// Color hint, e.g. "#3b82f6"
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Rename, recolor or reposition a tag.
    Update {
        /// Tag ID
        id: String,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New color hint
        #[arg(short, long)]
        color: Option<String>,

        /// New position in the tag list
        #[arg(long, allow_hyphen_values = true)]
        sort_order: Option<i64>,
    },

    /// List all tags in list order.
    List,

    /// Delete a tag and detach it from every task.
    Delete {
        /// Tag ID
        id: String,
    },
}

impl TagCommand {
    /// Whether the command changes stored data.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::List)
    }
}
