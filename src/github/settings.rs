//! Connection settings for the GitHub API.

use super::GitHubError;
use crate::env::{
    GITHUB_API_URL_ENV, GITHUB_TOKEN_ENV, GITHUB_USER_ENV, mandatory_env_var, optional_env_var,
};
use mockable::Env;
use std::fmt;
use url::Url;

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Personal access token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token string.
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// Borrow the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***REDACTED***)")
    }
}

/// Values taking precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides<'a> {
    /// Current user, normally from `--github-user`.
    pub user: Option<&'a str>,
    /// API root, normally from `--api-url`.
    pub api_url: Option<&'a str>,
}

/// Everything needed to authenticate against GitHub.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    api_url: Url,
    user: String,
    token: Token,
}

impl GitHubSettings {
    /// Build settings from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::InvalidApiUrl`] when `api_url` cannot be parsed.
    pub fn new(api_url: &str, user: impl Into<String>, token: Token) -> Result<Self, GitHubError> {
        Ok(Self {
            api_url: parse_api_url(api_url)?,
            user: user.into(),
            token,
        })
    }

    /// Resolve settings from `overrides`, falling back to the environment.
    ///
    /// `GITHUB_TOKEN` is always read from the environment. The user falls
    /// back to `GITHUB_USER` and the API root to `GITHUB_API_URL`, then to
    /// [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error when the token or user is missing, or the API root
    /// is not a valid URL.
    pub fn resolve(env: &impl Env, overrides: &SettingsOverrides<'_>) -> Result<Self, GitHubError> {
        let token = Token::new(mandatory_env_var(env, GITHUB_TOKEN_ENV)?);
        let user = match overrides.user.map(str::trim).filter(|u| !u.is_empty()) {
            Some(user) => user.to_owned(),
            None => mandatory_env_var(env, GITHUB_USER_ENV)?,
        };
        let api_url = overrides
            .api_url
            .map(str::to_owned)
            .or_else(|| optional_env_var(env, GITHUB_API_URL_ENV))
            .unwrap_or_else(|| String::from(DEFAULT_API_URL));
        Self::new(&api_url, user, token)
    }

    /// API root, always ending in `/`.
    #[must_use]
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Account forks are created for.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Token used for API calls and git pushes.
    #[must_use]
    pub const fn token(&self) -> &Token {
        &self.token
    }
}

/// Parse the API root so that relative joins append to its path.
fn parse_api_url(raw: &str) -> Result<Url, GitHubError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_owned()
    } else {
        format!("{trimmed}/")
    };
    Url::parse(&with_slash).map_err(|source| GitHubError::InvalidApiUrl {
        url: trimmed.to_owned(),
        source,
    })
}
