//! CLI binary for `taskboard`.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the library.

use clap::Parser;
use std::process::ExitCode;
use taskboard::cli::{run, Cli};
use taskboard::config::BoardConfig;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let base_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error reading current directory: {e}");
            return ExitCode::from(1);
        }
    };

    // A broken config is reported by `run`; logging just falls back.
    let log_filter = BoardConfig::load_from(&base_dir).ok().flatten().and_then(|c| c.log_filter);
    taskboard::logging::init(log_filter.as_deref());

    let output = run(cli, &base_dir);

    for msg in output.stdout {
        println!("{msg}");
    }
    for msg in output.stderr {
        eprintln!("{msg}");
    }

    output.exit_code
}
