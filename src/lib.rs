//! Forksync core library.
//!
//! Forks a GitHub repository to the current user, resets the fork's
//! `master` branch against upstream and verifies that both share the same
//! last commit. [`github`] talks to the REST API, [`git`] wraps the `git`
//! command line and [`verify`] collects assertion failures; [`workflow`]
//! strings them together.

pub mod cli;
pub mod env;
pub mod git;
pub mod github;
pub mod repository;
pub mod runner;
pub mod verify;
pub mod workflow;
