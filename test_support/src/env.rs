//! Scoped changes to process environment variables.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024 because
//! they touch process-global state. Tests hold an [`EnvLock`] while an
//! [`EnvVarGuard`] is alive; the guard restores the previous value on drop.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Holds the global lock serialising environment mutations.
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

impl EnvLock {
    /// Block until the lock is free. A poisoned lock is reclaimed.
    pub fn acquire() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self { _guard: guard }
    }
}

/// Restores one environment variable when dropped.
#[derive(Debug)]
pub struct EnvVarGuard {
    name: &'static str,
    previous: Option<OsString>,
}

impl EnvVarGuard {
    /// Set `name` to `value` until the guard drops.
    ///
    /// Callers must hold an [`EnvLock`].
    #[must_use]
    pub fn set(name: &'static str, value: impl AsRef<OsStr>) -> Self {
        let previous = std::env::var_os(name);
        // SAFETY: `EnvLock` serialises mutations of the process environment.
        unsafe { std::env::set_var(name, value) };
        Self { name, previous }
    }

    /// Unset `name` until the guard drops.
    ///
    /// Callers must hold an [`EnvLock`].
    #[must_use]
    pub fn remove(name: &'static str) -> Self {
        let previous = std::env::var_os(name);
        // SAFETY: `EnvLock` serialises mutations of the process environment.
        unsafe { std::env::remove_var(name) };
        Self { name, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: the lock taken for `set`/`remove` is still held.
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var(self.name, value),
                None => std::env::remove_var(self.name),
            }
        }
    }
}
