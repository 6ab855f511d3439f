//! Error types for the Candlepin client.
//!
//! Kept in a submodule so the derive-macro lint suppression stays narrow.

// The `unused_assignments` lint fires in some Rust versions due to
// thiserror/miette derive macro expansion. `#[expect]` would fail where the
// lint does not fire, so this has to be an `allow`.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Errors raised while talking to a Candlepin server.
#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    /// The configured base URL could not be parsed or cannot carry a path.
    #[error("invalid Candlepin URL '{url}': {reason}")]
    #[diagnostic(
        code(candlepin_steps::client::invalid_url),
        help("use an absolute http(s) URL such as http://localhost:8080/candlepin")
    )]
    InvalidUrl {
        /// URL as supplied.
        url: String,
        /// Why the URL was rejected.
        reason: String,
    },

    /// The server answered with a status other than 200 or 204.
    #[error("{method} {path} failed: {status} - {reason}")]
    #[diagnostic(code(candlepin_steps::client::status))]
    Status {
        /// HTTP method of the failed request.
        method: &'static str,
        /// Request path below the base URL.
        path: String,
        /// Status code returned by the server.
        status: u16,
        /// Reason phrase returned by the server.
        reason: String,
        /// Response body, if any.
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("{method} {path} could not reach the Candlepin server")]
    #[diagnostic(code(candlepin_steps::client::transport))]
    Transport {
        /// HTTP method of the failed request.
        method: &'static str,
        /// Request path below the base URL.
        path: String,
        /// Underlying transport failure.
        #[source]
        source: Box<ureq::Transport>,
    },

    /// Reading the response body failed.
    #[error("failed to read response for {path}")]
    #[diagnostic(code(candlepin_steps::client::io))]
    Io {
        /// Request path below the base URL.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A request or response body was not valid JSON.
    #[error("invalid JSON payload")]
    #[diagnostic(code(candlepin_steps::client::json))]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Status code carried by a [`ClientError::Status`] error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
