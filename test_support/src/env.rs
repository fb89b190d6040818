//! Serialised, self-restoring environment mutations.
//!
//! `std::env::set_var` and `remove_var` are `unsafe` in Rust 2024 because
//! they mutate process-global state. Hold an [`EnvLock`] while an
//! [`EnvVarGuard`] is alive so concurrently running tests cannot observe
//! each other's overrides.
//!
//! ```rust,ignore
//! use test_support::{EnvLock, EnvVarGuard};
//!
//! let _lock = EnvLock::acquire();
//! let _guard = EnvVarGuard::set("FORKSYNC_BRANCH", "main");
//! // `_guard` restores the previous value when dropped.
//! ```

use mockable::MockEnv;
use std::borrow::Cow;
use std::collections::HashMap;
use std::env::VarError;
use std::ffi::OsString;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// RAII guard that holds the global environment lock.
pub struct EnvLock {
    _guard: MutexGuard<'static, ()>,
}

impl fmt::Debug for EnvLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvLock").finish_non_exhaustive()
    }
}

impl EnvLock {
    /// Acquire the lock, recovering it if a previous holder panicked.
    pub fn acquire() -> Self {
        let guard = ENV_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Self { _guard: guard }
    }
}

/// Restores an environment variable to its previous value on drop.
#[derive(Debug)]
pub struct EnvVarGuard {
    name: Cow<'static, str>,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    /// Set `name` to `val`. Callers must hold an [`EnvLock`].
    #[must_use]
    pub fn set(name: impl Into<Cow<'static, str>>, val: &str) -> Self {
        let name = name.into();
        let prev = std::env::var_os(&*name);
        // SAFETY: `EnvLock` serialises mutations of the process environment.
        unsafe { std::env::set_var(&*name, val) };
        Self { name, prev }
    }

    /// Unset `name`. Callers must hold an [`EnvLock`].
    #[must_use]
    pub fn remove(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        let prev = std::env::var_os(&*name);
        // SAFETY: `EnvLock` serialises mutations of the process environment.
        unsafe { std::env::remove_var(&*name) };
        Self { name, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        // SAFETY: `EnvLock` is still held by the owner of this guard.
        unsafe {
            match self.prev.take() {
                Some(value) => std::env::set_var(&*self.name, value),
                None => std::env::remove_var(&*self.name),
            }
        }
    }
}

/// Mock environment answering only for `pairs`.
///
/// Every other key reads as unset, which keeps tests independent of the
/// developer's real `GITHUB_*` variables.
#[must_use]
pub fn mocked_env(pairs: &[(&str, &str)]) -> MockEnv {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    let mut env = MockEnv::new();
    env.expect_raw()
        .returning(move |key| values.get(key).cloned().ok_or(VarError::NotPresent));
    env
}
