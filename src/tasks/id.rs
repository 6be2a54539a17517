//! Identifier generation for tasks, tags, and attachments.
//!
//! IDs are a readable slug of the source text plus 8 hex characters:
//! `write-report-3fa91c0e`. When the text has no ASCII alphanumerics (for
//! example a Japanese title) the slug falls back to the record kind.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process counter mixed into every suffix so IDs generated in the same
/// nanosecond still differ.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Maximum slug length.
const MAX_SLUG_LEN: usize = 40;

/// Convert text to a slug.
///
/// Lowercases ASCII alphanumerics, turns every other run of characters into a
/// single hyphen, trims hyphens at both ends, and truncates to
/// `max_len` without leaving a trailing hyphen.
#[must_use]
pub fn slugify_with_max_len(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len().min(max_len + 1));
    let mut last_was_hyphen = true;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    if slug.len() > max_len {
        slug.truncate(max_len);
    }
    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

/// Convert text to a slug of at most 40 characters.
#[must_use]
pub fn slugify(text: &str) -> String {
    slugify_with_max_len(text, MAX_SLUG_LEN)
}

#[allow(clippy::cast_possible_truncation)]
fn random_suffix() -> String {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos() as u64),
    );
    hasher.write_u64(SEQUENCE.fetch_add(1, Ordering::Relaxed));
    format!("{:08x}", hasher.finish() & 0xFFFF_FFFF)
}

fn generate_id(text: &str, fallback: &str) -> String {
    let slug = slugify(text);
    let suffix = random_suffix();
    if slug.is_empty() {
        format!("{fallback}-{suffix}")
    } else {
        format!("{slug}-{suffix}")
    }
}

/// Generate a task ID from its title.
#[must_use]
pub fn generate_task_id(title: &str) -> String {
    generate_id(title, "task")
}

/// Generate a tag ID from its name.
#[must_use]
pub fn generate_tag_id(name: &str) -> String {
    generate_id(name, "tag")
}

/// Generate an attachment ID from its file name.
#[must_use]
pub fn generate_asset_id(file_name: &str) -> String {
    generate_id(file_name, "asset")
}
