//! Test utilities for forksync.
//!
//! Provides a local stand-in for the GitHub REST API, bare-repository git
//! fixtures that play the role of GitHub-hosted remotes, and helpers for
//! serialising environment mutations.

pub mod env;
pub mod git;
pub mod github;

pub use env::{EnvLock, EnvVarGuard, mocked_env};
pub use git::{UpstreamFixture, git_available};
pub use github::{FakeGitHub, RecordedRequest};
