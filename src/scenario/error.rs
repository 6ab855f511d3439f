//! Error types for reading and parsing feature files.

// See `client::error` for why this is an `allow`.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Failures raised while loading or parsing a feature.
#[derive(Debug, Error, Diagnostic)]
pub enum ScenarioError {
    /// The feature file could not be read.
    #[error("failed to read feature file {path}")]
    #[diagnostic(code(candlepin_steps::scenario::read))]
    Read {
        /// File that was being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The source is not valid Gherkin.
    #[error("failed to parse feature {origin}: {source}")]
    #[diagnostic(
        code(candlepin_steps::scenario::parse),
        help("check the Gherkin syntax at the reported line and column")
    )]
    Parse {
        /// File path, or `<input>` for in-memory source.
        origin: String,
        /// Position and expected tokens reported by the parser.
        #[source]
        source: gherkin::ParseError,
    },

    /// The feature uses Gherkin the runner does not implement.
    #[error("line {line_number}: '{keyword}' is not supported")]
    #[diagnostic(code(candlepin_steps::scenario::unsupported))]
    Unsupported {
        /// One-based line number.
        line_number: usize,
        /// Keyword that was found.
        keyword: String,
    },
}
