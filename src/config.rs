//! Board configuration.
//!
//! Settings live in `.taskboard/config.yaml` under a base directory. Every
//! field has a default, so a partial or empty file is valid.

use crate::error::Result;
use crate::paths;
use crate::tasks::assets::AssetPolicy;
use crate::tasks::board::Visibility;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file path relative to the base directory.
pub const CONFIG_FILE_PATH: &str = ".taskboard/config.yaml";

/// How often a client should refetch the board (30 minutes).
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30 * 60 * 1000;

/// Board settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoardConfig {
    /// Database file. `None` means the per-project default under `~/.taskboard`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Which tasks are shown by default.
    pub task_filter: Visibility,

    /// Refetch interval for long-running clients that keep a
    /// [`TaskBoard`](crate::tasks::TaskBoard) in memory. The CLI reads the
    /// store on every command and does not use it.
    pub refresh_interval_ms: u64,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,

    /// Attachment acceptance rules.
    pub assets: AssetPolicy,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            task_filter: Visibility::default(),
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            log_filter: None,
            assets: AssetPolicy::default(),
        }
    }
}

impl BoardConfig {
    /// Load config from a base directory, returning `None` if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = Self::config_path(base_dir);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Load config, falling back to defaults when there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(base_dir: &Path) -> Result<Self> {
        Ok(Self::load_from(base_dir)?.unwrap_or_default())
    }

    /// Save config to a base directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, base_dir: &Path) -> Result<()> {
        let config_path = Self::config_path(base_dir);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// [`Self::refresh_interval_ms`] as a `Duration`.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Whether a board fetched at `fetched_at` should be refetched at `now`.
    /// A fetch time in the future is never due.
    #[must_use]
    pub fn refresh_due(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(fetched_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.refresh_interval())
    }

    /// Get the config file path for a base directory.
    #[must_use]
    pub fn config_path(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE_PATH)
    }

    /// Database file to use for a base directory.
    ///
    /// Relative `database_path` values are resolved against `base_dir`.
    /// Without one, the per-project default is used, or
    /// `.taskboard/taskboard.sqlite3` under `base_dir` if there is no home
    /// directory.
    #[must_use]
    pub fn resolve_db_path(&self, base_dir: &Path) -> PathBuf {
        match self.database_path {
            Some(ref path) => base_dir.join(path),
            None => paths::default_db_path(base_dir).unwrap_or_else(|| {
                base_dir.join(".taskboard").join(paths::DATABASE_FILENAME)
            }),
        }
    }
}
