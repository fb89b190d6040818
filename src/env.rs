//! Environment variable lookups.
//!
//! Reads go through [`mockable::Env`] so callers and tests can substitute
//! a mocked environment instead of mutating process-global state.

use mockable::Env;
use thiserror::Error;

/// Account the fork is created for.
pub const GITHUB_USER_ENV: &str = "GITHUB_USER";
/// Token used to authenticate API calls and git pushes.
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Optional API root override, e.g. for GitHub Enterprise.
pub const GITHUB_API_URL_ENV: &str = "GITHUB_API_URL";

/// Errors raised when a required variable is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// The variable is unset or only contains whitespace.
    #[error("missing environment variable ${name}")]
    Missing {
        /// Name of the variable.
        name: String,
    },
}

/// Return the value of `key`, failing when it is unset or blank.
///
/// # Errors
///
/// Returns [`EnvError::Missing`] when the variable is absent, not valid
/// Unicode, or empty after trimming.
pub fn mandatory_env_var(env: &impl Env, key: &str) -> Result<String, EnvError> {
    optional_env_var(env, key).ok_or_else(|| EnvError::Missing {
        name: key.to_owned(),
    })
}

/// Return the value of `key` when it is set to something non-blank.
#[must_use]
pub fn optional_env_var(env: &impl Env, key: &str) -> Option<String> {
    env.raw(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
