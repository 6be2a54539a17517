//! Error types for `taskboard`.

/// Errors that can occur while loading, storing, or moving tasks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON parsing error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A `SQLite` database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The persistence backend rejected a request.
    ///
    /// The message is kept verbatim so callers can inspect it (for example to
    /// detect a relation that does not exist on an older schema).
    #[error("Backend error: {0}")]
    Backend(String),

    /// A time string could not be understood.
    #[error("Invalid time '{0}' (expected hh:mm:ss)")]
    InvalidTime(String),

    /// A task-related error occurred.
    #[error("{0}")]
    Task(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Whether this error reports that `relation` is unknown to the backend.
    ///
    /// Detection is by message inspection: the backend names the missing
    /// relation in its error text (`no such table: todo_assets`,
    /// `relation "todo_assets" does not exist`, ...).
    #[must_use]
    pub fn mentions_relation(&self, relation: &str) -> bool {
        self.to_string().contains(relation)
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
