//! Attachment acceptance rules.

use serde::{Deserialize, Serialize};

/// Object storage bucket holding attachment bytes.
pub const TASK_ASSET_BUCKET: &str = "task-assets";

/// Default size limit (100 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// MIME patterns accepted by default.
pub const DEFAULT_ACCEPTED_TYPES: [&str; 8] = [
    "image/*",
    "video/*",
    "audio/*",
    "application/pdf",
    "text/plain",
    "text/markdown",
    "text/csv",
    "application/json",
];

/// Which attachments may be recorded against a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPolicy {
    /// Largest accepted file.
    pub max_size_bytes: u64,
    /// Accepted MIME types; `type/*` matches a whole family.
    pub accepted_types: Vec<String>,
}

impl Default for AssetPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            accepted_types: DEFAULT_ACCEPTED_TYPES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl AssetPolicy {
    /// Check an attachment against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`AssetRejected`] if the file is too large or of an unaccepted type.
    pub fn check(&self, mime_type: &str, size_bytes: u64) -> Result<(), AssetRejected> {
        if size_bytes > self.max_size_bytes {
            return Err(AssetRejected::TooLarge { size_bytes, max_size_bytes: self.max_size_bytes });
        }
        if !self.accepts(mime_type) {
            return Err(AssetRejected::UnsupportedType(mime_type.to_string()));
        }
        Ok(())
    }

    fn accepts(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        self.accepted_types.iter().any(|pattern| match pattern.strip_suffix("/*") {
            Some(family) => {
                mime_type.split_once('/').is_some_and(|(prefix, _)| prefix == family)
            }
            None => *pattern == mime_type,
        })
    }
}

/// Why an attachment was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRejected {
    /// File exceeds the size limit.
    TooLarge {
        /// Size of the rejected file.
        size_bytes: u64,
        /// Configured limit.
        max_size_bytes: u64,
    },
    /// MIME type not in the accepted list.
    UnsupportedType(String),
}

impl std::fmt::Display for AssetRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooLarge { size_bytes, max_size_bytes } => {
                write!(f, "attachment is {size_bytes} bytes (limit {max_size_bytes})")
            }
            Self::UnsupportedType(mime) => write!(f, "unsupported attachment type: {mime}"),
        }
    }
}

impl std::error::Error for AssetRejected {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_families_and_exact_types() {
        let policy = AssetPolicy::default();
        assert!(policy.check("image/png", 10).is_ok());
        assert!(policy.check("VIDEO/mp4", 10).is_ok());
        assert!(policy.check("application/pdf", 10).is_ok());
        assert!(policy.check("text/csv", 10).is_ok());
    }

    #[test]
    fn test_rejects_unknown_type() {
        let policy = AssetPolicy::default();
        assert_eq!(
            policy.check("application/zip", 10),
            Err(AssetRejected::UnsupportedType("application/zip".to_string()))
        );
        assert!(policy.check("text/html", 10).is_err());
        assert!(policy.check("image", 10).is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let policy = AssetPolicy::default();
        assert!(policy.check("image/png", DEFAULT_MAX_SIZE_BYTES).is_ok());
        let err = policy.check("image/png", DEFAULT_MAX_SIZE_BYTES + 1).unwrap_err();
        assert!(matches!(err, AssetRejected::TooLarge { .. }));
        assert!(err.to_string().contains("limit"));
    }
}
