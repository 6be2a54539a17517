//! # `taskboard`
//!
//! Kanban task board core: legacy record normalization, drag-and-drop sort
//! keys, and a `SQLite` store.

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod paths;
pub mod tasks;
pub mod time;

pub use error::{Error, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
