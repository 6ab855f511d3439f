//! Error types for step registration and dispatch.

// See `client::error` for why this is an `allow`.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::client::ClientError;
use miette::Diagnostic;
use thiserror::Error;

/// A scenario line could not be bound to exactly one step definition.
#[derive(Debug, Error, Diagnostic)]
pub enum MatchError {
    /// No registered pattern matches the line.
    #[error("no step definition matches '{line}'")]
    #[diagnostic(
        code(candlepin_steps::steps::no_match),
        help("run `candlepin-steps steps` to list the available patterns")
    )]
    NoMatch {
        /// Step text after keyword stripping.
        line: String,
    },

    /// Several registered patterns match the line.
    #[error("step '{line}' is ambiguous: it matches {} definitions", .patterns.len())]
    #[diagnostic(code(candlepin_steps::steps::ambiguous))]
    Ambiguous {
        /// Step text after keyword stripping.
        line: String,
        /// Every matching pattern, in registration order.
        patterns: Vec<String>,
    },
}

/// Failures raised while registering or running a step.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// The line did not resolve to a single definition.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Match(#[from] MatchError),

    /// The step pattern is not a valid regular expression.
    #[error("invalid step pattern '{pattern}'")]
    #[diagnostic(code(candlepin_steps::steps::invalid_pattern))]
    InvalidPattern {
        /// Pattern as registered.
        pattern: String,
        /// Compilation failure reported by the regex engine.
        #[source]
        source: Box<regex::Error>,
    },

    /// A handler asked for a capture group the match did not produce.
    #[error("step '{line}' has no capture {capture}")]
    #[diagnostic(code(candlepin_steps::steps::missing_capture))]
    MissingCapture {
        /// Step text after keyword stripping.
        line: String,
        /// Index or name of the requested capture.
        capture: String,
    },

    /// The Candlepin collaborator rejected the call.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Collaborator(#[from] ClientError),
}
