//! Application entry point.
//!
//! Parses command-line arguments, merges configuration layers, and delegates
//! execution to [`runner::run`].

use candlepin_steps::{cli, runner};
use std::io;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let (parsed, matches) = match cli::parse_from(std::env::args_os()) {
        Ok(parsed) => parsed,
        Err(err) => err.exit(),
    };
    let merged = cli::merge_with_config(&parsed, &matches);
    let verbose = merged.as_ref().map_or(parsed.verbose, |config| config.verbose);
    let max_level = if verbose { Level::DEBUG } else { Level::ERROR };
    fmt()
        .with_max_level(max_level)
        .with_writer(io::stderr)
        .init();

    let config = match merged {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = io::stdout().lock();
    match runner::run(&config, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "runner failed");
            ExitCode::FAILURE
        }
    }
}
