//! Minimal GitHub REST client.
//!
//! Only the calls needed to fork a repository are implemented: fetching a
//! repository and creating a fork. Requests are blocking and go through a
//! single [`ureq::Agent`] with conservative timeouts.

mod error;
mod settings;

pub use error::GitHubError;
pub use settings::{DEFAULT_API_URL, GitHubSettings, SettingsOverrides, Token};

use crate::repository::RepositoryName;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("forksync/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
/// Characters of an error response kept for diagnostics.
const ERROR_BODY_LIMIT: usize = 512;

/// Account owning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    /// Login name of the user or organisation.
    pub login: String,
}

/// Reference to the repository a fork was created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentRepository {
    /// `owner/name` of the parent.
    pub full_name: String,
}

/// Subset of the GitHub repository document used by forksync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name without owner.
    pub name: String,
    /// `owner/name`.
    pub full_name: String,
    /// Owning account.
    pub owner: Owner,
    /// HTTPS clone URL.
    #[serde(default)]
    pub clone_url: Option<String>,
    /// SSH clone URL.
    #[serde(default)]
    pub ssh_url: Option<String>,
    /// Browser URL.
    #[serde(default)]
    pub html_url: Option<String>,
    /// Default branch, usually `master` or `main`.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Whether this repository is a fork.
    #[serde(default)]
    pub fork: bool,
    /// Parent repository; only present on single-repository lookups.
    #[serde(default)]
    pub parent: Option<ParentRepository>,
}

impl Repository {
    /// Owner and name as a parsed identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when GitHub returned an unparsable owner or name.
    pub fn repository_name(&self) -> Result<RepositoryName, GitHubError> {
        Ok(RepositoryName::from_parts(&self.owner.login, &self.name)?)
    }

    fn is_fork_of(&self, upstream: &RepositoryName) -> Option<bool> {
        if !self.fork {
            return Some(false);
        }
        self.parent
            .as_ref()
            .map(|parent| parent.full_name.eq_ignore_ascii_case(&upstream.full_name()))
    }
}

/// Return the clone URL for `repo`.
///
/// `https` selects the HTTPS URL, otherwise the SSH URL is returned.
///
/// # Errors
///
/// Returns [`GitHubError::MissingCloneUrl`] when the selected URL is absent
/// or empty.
pub fn clone_url(repo: &Repository, https: bool) -> Result<&str, GitHubError> {
    let (url, protocol) = if https {
        (repo.clone_url.as_deref(), "https")
    } else {
        (repo.ssh_url.as_deref(), "ssh")
    };
    url.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| GitHubError::MissingCloneUrl {
            full_name: repo.full_name.clone(),
            protocol,
        })
}

/// Blocking client for the GitHub REST API.
#[derive(Debug)]
pub struct GitHubClient {
    agent: ureq::Agent,
    settings: GitHubSettings,
}

impl GitHubClient {
    /// Create a client for `settings`.
    #[must_use]
    pub fn new(settings: GitHubSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .timeout_write(Duration::from_secs(30))
            .timeout(Duration::from_secs(60))
            .build();
        Self { agent, settings }
    }

    /// Settings the client was created with.
    #[must_use]
    pub const fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    /// Fetch `owner/name`.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails, GitHub answers with a
    /// non-success status, or the body cannot be decoded.
    pub fn get_repository(&self, repo: &RepositoryName) -> Result<Repository, GitHubError> {
        let url = self.endpoint(&format!("repos/{}/{}", repo.owner(), repo.name()))?;
        self.send("GET", &url, None)
    }

    /// Fetch `owner/name`, mapping a 404 to `None`.
    ///
    /// # Errors
    ///
    /// Returns any failure other than "not found".
    pub fn find_repository(
        &self,
        repo: &RepositoryName,
    ) -> Result<Option<Repository>, GitHubError> {
        match self.get_repository(repo) {
            Ok(found) => Ok(Some(found)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Ask GitHub to fork `upstream` into the authenticated account.
    ///
    /// GitHub creates forks asynchronously and answers `202 Accepted` with
    /// the repository document of the fork.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or is rejected.
    pub fn create_fork(&self, upstream: &RepositoryName) -> Result<Repository, GitHubError> {
        let url = self.endpoint(&format!(
            "repos/{}/{}/forks",
            upstream.owner(),
            upstream.name()
        ))?;
        self.send("POST", &url, Some("{}"))
    }

    /// Fork `upstream` to `user`, or reuse the fork `user` already has.
    ///
    /// An existing fork is returned unchanged; its `master` is expected to
    /// be reset against upstream afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`GitHubError::OwnRepository`] when `user` owns `upstream`,
    /// [`GitHubError::NameTaken`] when `user/<name>` exists but is not a fork
    /// of `upstream`, or any request failure.
    pub fn fork_repository_or_revert_master_in_fork(
        &self,
        upstream: &RepositoryName,
        user: &str,
    ) -> Result<Repository, GitHubError> {
        if upstream.owner().eq_ignore_ascii_case(user) {
            return Err(GitHubError::OwnRepository {
                full_name: upstream.full_name(),
                user: user.to_owned(),
            });
        }
        let fork_name = upstream.with_owner(user)?;
        let Some(existing) = self.find_repository(&fork_name)? else {
            info!("forking {upstream} to {user}");
            return self.create_fork(upstream);
        };
        match existing.is_fork_of(upstream) {
            Some(true) => {
                info!("reusing existing fork {}", existing.full_name);
                Ok(existing)
            }
            None => {
                warn!(
                    "{} is a fork but GitHub did not report its parent; assuming {upstream}",
                    existing.full_name
                );
                Ok(existing)
            }
            Some(false) => Err(GitHubError::NameTaken {
                existing: existing.full_name,
                upstream: upstream.full_name(),
            }),
        }
    }

    fn endpoint(&self, path: &str) -> Result<String, GitHubError> {
        self.settings
            .api_url()
            .join(path)
            .map(String::from)
            .map_err(|source| GitHubError::InvalidApiUrl {
                url: format!("{}{path}", self.settings.api_url()),
                source,
            })
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("User-Agent", USER_AGENT)
            .set("Accept", ACCEPT)
            .set("X-GitHub-Api-Version", API_VERSION)
            .set(
                "Authorization",
                &format!("Bearer {}", self.settings.token().expose()),
            )
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        url: &str,
        body: Option<&str>,
    ) -> Result<T, GitHubError> {
        debug!("{method} {url}");
        let request = self.request(method, url);
        let outcome = match body {
            Some(payload) => request
                .set("Content-Type", "application/json")
                .send_string(payload),
            None => request.call(),
        };
        let response = match outcome {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(GitHubError::Status {
                    url: url.to_owned(),
                    status,
                    body: body.chars().take(ERROR_BODY_LIMIT).collect(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(GitHubError::Request {
                    url: url.to_owned(),
                    source: Box::new(transport),
                });
            }
        };
        debug!("{url} answered {}", response.status());
        let text = response.into_string().map_err(|source| GitHubError::Read {
            url: url.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| GitHubError::Decode {
            url: url.to_owned(),
            source,
        })
    }
}
