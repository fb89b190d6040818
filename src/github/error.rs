//! Error types for the GitHub client.
//!
//! Kept in a separate file to scope the lint suppression required by the
//! `thiserror`/`miette` derive expansion.

// The unused_assignments lint fires on derive output in some Rust versions
// but not others, so `#[expect]` cannot be used here.
// FIXME(rust-lang/rust#130021): remove once upstream is fixed.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use crate::env::EnvError;
use crate::repository::RepositoryNameError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while talking to the GitHub API.
#[derive(Debug, Error, Diagnostic)]
pub enum GitHubError {
    /// A required environment variable was not set.
    #[error(transparent)]
    #[diagnostic(
        code(forksync::github::env),
        help("export GITHUB_USER and GITHUB_TOKEN before running")
    )]
    Env(#[from] EnvError),

    /// The configured API root is not a valid absolute URL.
    #[error("invalid GitHub API URL '{url}': {source}")]
    #[diagnostic(code(forksync::github::api_url))]
    InvalidApiUrl {
        /// URL as configured.
        url: String,
        /// Parser failure.
        #[source]
        source: url::ParseError,
    },

    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {source}")]
    #[diagnostic(code(forksync::github::request))]
    Request {
        /// Requested URL.
        url: String,
        /// Transport failure reported by the HTTP client.
        #[source]
        source: Box<ureq::Transport>,
    },

    /// GitHub answered with an unexpected status code.
    #[error("GitHub returned {status} for {url}: {body}")]
    #[diagnostic(code(forksync::github::status))]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// The response body could not be read.
    #[error("failed to read response from {url}: {source}")]
    #[diagnostic(code(forksync::github::read))]
    Read {
        /// Requested URL.
        url: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}: {source}")]
    #[diagnostic(code(forksync::github::decode))]
    Decode {
        /// Requested URL.
        url: String,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },

    /// The API returned a repository whose owner or name cannot be parsed.
    #[error("GitHub returned an invalid repository name: {0}")]
    #[diagnostic(code(forksync::github::repository_name))]
    RepositoryName(#[from] RepositoryNameError),

    /// The current user already owns the upstream repository.
    #[error("cannot fork {full_name}: it is already owned by {user}")]
    #[diagnostic(code(forksync::github::own_repository))]
    OwnRepository {
        /// Upstream repository.
        full_name: String,
        /// Current user.
        user: String,
    },

    /// The user owns a repository with the fork's name that is not a fork
    /// of upstream.
    #[error("{existing} exists but is not a fork of {upstream}")]
    #[diagnostic(
        code(forksync::github::name_taken),
        help("rename or delete the existing repository before forking")
    )]
    NameTaken {
        /// Repository blocking the fork.
        existing: String,
        /// Upstream repository.
        upstream: String,
    },

    /// The repository document had no clone URL for the protocol.
    #[error("repository {full_name} has no {protocol} clone URL")]
    #[diagnostic(code(forksync::github::clone_url))]
    MissingCloneUrl {
        /// Repository lacking the URL.
        full_name: String,
        /// `https` or `ssh`.
        protocol: &'static str,
    },
}

impl GitHubError {
    /// Whether GitHub reported that the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
