//! Test utilities shared by the integration and behavioural suites.
//!
//! Provides an in-memory Candlepin double, a scripted HTTP fixture, scoped
//! environment guards, and a helper for writing feature files to disk.

pub mod candlepin;
pub mod env;
pub mod http;

pub use candlepin::{ApiCall, RecordingApi};
pub use env::{EnvLock, EnvVarGuard};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;

/// Write `source` to `<dir>/<name>` and return the file's path.
///
/// # Errors
///
/// Returns an error when the path is not UTF-8 or the file cannot be written.
pub fn write_feature(dir: &TempDir, name: &str, source: &str) -> Result<Utf8PathBuf> {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name))
        .map_err(|raw| anyhow::anyhow!("temporary path {} is not UTF-8", raw.display()))?;
    fs::write(&path, source).with_context(|| format!("write feature {path}"))?;
    Ok(path)
}
