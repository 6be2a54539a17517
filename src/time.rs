//! Tracked-time helpers: `hh:mm:ss` conversion and a running timer.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,2}):([0-5][0-9]):([0-5][0-9])$").expect("time pattern is valid")
});

/// Format seconds as `hh:mm:ss`. Hours are not wrapped at 24.
#[must_use]
pub fn format_time(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Check that a string is a well-formed `h:mm:ss` / `hh:mm:ss` value.
#[must_use]
pub fn validate_time_input(value: &str) -> bool {
    TIME_PATTERN.is_match(value)
}

/// Parse `hh:mm:ss` into seconds.
///
/// Strings that fail strict validation are still accepted when they split
/// into three integers (`"100:90:00"`). Anything else yields 0, including
/// totals that do not fit in `u64`.
#[must_use]
pub fn parse_time_to_seconds(value: &str) -> u64 {
    let parts: Vec<u64> = if let Some(caps) = TIME_PATTERN.captures(value) {
        caps.iter().skip(1).flatten().filter_map(|m| m.as_str().parse().ok()).collect()
    } else {
        let parts: Vec<Option<u64>> = value.split(':').map(|p| p.trim().parse().ok()).collect();
        parts.into_iter().collect::<Option<Vec<_>>>().unwrap_or_default()
    };

    match parts.as_slice() {
        [h, m, s] => h
            .checked_mul(3600)
            .zip(m.checked_mul(60))
            .and_then(|(h, m)| h.checked_add(m))
            .and_then(|hm| hm.checked_add(*s))
            .unwrap_or(0),
        _ => 0,
    }
}

/// Measures time spent on one task.
///
/// The timer adds whole elapsed seconds since [`TaskTimer::start`] to the
/// total the task already had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTimer {
    task_id: String,
    base_total: u64,
    started_at: DateTime<Utc>,
}

impl TaskTimer {
    /// Start timing `task_id`, which already has `base_total` seconds.
    #[must_use]
    pub fn start(task_id: impl Into<String>, base_total: u64, now: DateTime<Utc>) -> Self {
        Self { task_id: task_id.into(), base_total, started_at: now }
    }

    /// Task being timed.
    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Whole seconds since the timer started. Clock skew backwards counts as 0.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(now.signed_duration_since(self.started_at).num_seconds()).unwrap_or(0)
    }

    /// Total including the running session.
    #[must_use]
    pub fn current_total(&self, now: DateTime<Utc>) -> u64 {
        self.base_total.saturating_add(self.elapsed(now))
    }

    /// Stop the timer and return the new total.
    #[must_use]
    pub fn stop(self, now: DateTime<Utc>) -> u64 {
        self.current_total(now)
    }
}
