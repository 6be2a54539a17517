//! Path utilities for determining data storage locations.
//!
//! Boards are stored in `~/.taskboard/boards/` with one subdirectory per
//! project, named from a hash of the project path.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// The base directory name for taskboard data.
const DATA_DIR_NAME: &str = ".taskboard";

/// The database filename.
pub const DATABASE_FILENAME: &str = "taskboard.sqlite3";

/// Get the base data directory.
///
/// Returns `~/.taskboard/` or `None` if the home directory cannot be
/// determined.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Get the board directory for a project.
///
/// Returns `~/.taskboard/boards/<name>-<hash>/`.
#[must_use]
pub fn board_data_dir(project_dir: &Path) -> Option<PathBuf> {
    let base = data_dir()?;
    Some(base.join("boards").join(board_dir_name(project_dir)))
}

/// Get the default database path for a project.
///
/// Returns `None` if the home directory cannot be determined.
#[must_use]
pub fn default_db_path(project_dir: &Path) -> Option<PathBuf> {
    board_data_dir(project_dir).map(|dir| dir.join(DATABASE_FILENAME))
}

/// Directory name for a project: readable last component plus a hash of
/// the full path, e.g. `my-project-00a1b2c3d4e5f607`.
fn board_dir_name(project_dir: &Path) -> String {
    let path_to_hash = project_dir.canonicalize().unwrap_or_else(|_| project_dir.to_path_buf());

    let prefix = path_to_hash.file_name().and_then(|n| n.to_str()).unwrap_or("board");
    let prefix: String =
        prefix.chars().map(|c| if c.is_alphanumeric() { c } else { '-' }).collect();
    let prefix = prefix.trim_matches('-');

    let mut hasher = DefaultHasher::new();
    path_to_hash.hash(&mut hasher);

    format!("{prefix}-{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_returns_home_based_path() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(data_dir().unwrap(), home.join(".taskboard"));
        }
    }

    #[test]
    fn test_default_db_path_layout() {
        let project = PathBuf::from("/some/project/kanban");
        if let Some(path) = default_db_path(&project) {
            assert!(path.to_string_lossy().ends_with(DATABASE_FILENAME));
            let dir_name = path.parent().unwrap().file_name().unwrap().to_string_lossy();
            assert!(dir_name.starts_with("kanban-"));
            assert!(path.to_string_lossy().contains("boards"));
        }
    }

    #[test]
    fn test_board_dir_name_is_stable_and_distinct() {
        let a = board_dir_name(Path::new("/home/user/project"));
        assert_eq!(a, board_dir_name(Path::new("/home/user/project")));
        assert_ne!(a, board_dir_name(Path::new("/home/user-project")));
        assert!(!a.contains('/'));
    }
}
