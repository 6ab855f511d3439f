//! Error types for the runner module.
//!
//! This submodule isolates derive-macro-affected code to scope lint suppressions
//! narrowly. The `unused_assignments` lint fires in some Rust versions due to
//! thiserror/miette derive macro expansion.

// Scoped suppression for version-dependent lint false positives from
// miette/thiserror derive macros. `#[expect]` fails when the lint doesn't
// fire, so this has to be an `allow`.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// None of the supplied paths contained a feature file.
    #[error("no .feature files found in {}", display_paths(.paths))]
    #[diagnostic(
        code(candlepin_steps::runner::no_features),
        help("pass feature files or directories containing *.feature files")
    )]
    NoFeatures {
        /// Paths that were searched.
        paths: Vec<PathBuf>,
    },

    /// At least one scenario failed.
    #[error("{failed} of {total} scenarios failed")]
    #[diagnostic(code(candlepin_steps::runner::scenarios_failed))]
    ScenariosFailed {
        /// Number of failed scenarios.
        failed: usize,
        /// Number of scenarios run.
        total: usize,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
