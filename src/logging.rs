//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest filter directive accepted from the environment or config.
const MAX_FILTER_LEN: usize = 4096;

/// Build the filter: `RUST_LOG` first, then `config_filter`, else `off`.
///
/// Empty, oversized, or invalid directives are skipped rather than failing
/// startup.
#[must_use]
pub fn build_filter(env_filter: Option<&str>, config_filter: Option<&str>) -> EnvFilter {
    [env_filter, config_filter]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|raw| !raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
        .find_map(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new("off"))
}

/// Install the global subscriber, writing to stderr.
///
/// Does nothing if a subscriber is already installed.
pub fn init(config_filter: Option<&str>) {
    let env = std::env::var("RUST_LOG").ok();
    let filter = build_filter(env.as_deref(), config_filter);

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
