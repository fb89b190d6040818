//! Fixture modules for BDD scenarios.
//!
//! The `TestWorld` struct holds all state for a scenario. Non-Clone types
//! use `RefCell<Option<T>>` directly, while Clone types use `Slot<T>`.
//! Dropping the world stops the fake GitHub server and removes the
//! scenario's temporary directory.

// The `#[fixture]` macro generates types that cannot have doc comments attached
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use forksync::workflow::{ForkCheckout, ForkWorkflow};
use rstest::fixture;
use rstest_bdd::Slot;
use std::cell::RefCell;
use test_support::{FakeGitHub, UpstreamFixture};

/// Token the fake GitHub server accepts in every scenario.
pub const TOKEN: &str = "ghp_scenario_token";

/// Combined test world for all BDD scenarios.
#[derive(Default)]
pub struct TestWorld {
    // Environment (non-Clone)
    /// Temporary directory holding remotes and the work directory.
    pub temp_dir: RefCell<Option<tempfile::TempDir>>,
    /// Fake GitHub API serving the scenario's repositories.
    pub server: RefCell<Option<FakeGitHub>>,
    /// Upstream repository and the scratch checkout feeding it commits.
    pub upstream: RefCell<Option<UpstreamFixture>>,

    // Identity (Clone)
    /// Login of the current user.
    pub user: Slot<String>,

    // Workflow state (non-Clone)
    /// Workflow wired to the fake server and the scenario work directory.
    pub workflow: RefCell<Option<ForkWorkflow>>,
    /// Checkouts produced by the last fork step.
    pub checkout: RefCell<Option<ForkCheckout>>,

    // Outcomes (Clone)
    /// Bare repository acting as the user's fork on GitHub.
    pub fork_remote: Slot<Utf8PathBuf>,
    /// Error text from the last failed fork attempt.
    pub fork_error: Slot<String>,
}

impl TestWorld {
    /// Root of the scenario's temporary directory, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or its path is
    /// not UTF-8.
    pub fn root(&self) -> Result<Utf8PathBuf> {
        if !self.temp_dir.is_some() {
            let dir = tempfile::tempdir().context("create scenario temp dir")?;
            self.temp_dir.set_value(dir);
        }
        self.temp_dir
            .with_ref(|dir| Utf8PathBuf::from_path_buf(dir.path().to_path_buf()))
            .context("scenario temp dir missing")?
            .map_err(|path| anyhow::anyhow!("non-UTF-8 temp dir {}", path.display()))
    }

    /// Login of the current user.
    ///
    /// # Errors
    ///
    /// Returns an error when no step set the user.
    pub fn current_user(&self) -> Result<String> {
        self.user.get().context("current user has not been set")
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        self.workflow.clear_value();
        self.server.clear_value();
        self.temp_dir.clear_value();
    }
}

/// Fixture providing a fresh `TestWorld` for each scenario.
#[fixture]
pub fn world() -> TestWorld {
    TestWorld::default()
}

/// Helper trait extensions for `RefCell<Option<T>>`.
///
/// Provides ergonomic methods for working with `RefCell<Option<T>>` values
/// in BDD step definitions, enabling interior mutability without requiring `Clone`.
pub trait RefCellOptionExt<T> {
    /// Set the value inside the `RefCell`.
    fn set_value(&self, value: T);
    /// Clear the value inside the `RefCell`, setting it to `None`.
    fn clear_value(&self);
    /// Returns `true` if the `RefCell` contains `Some`.
    fn is_some(&self) -> bool;
    /// Borrow the inner value immutably and apply a function.
    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R>;
}

impl<T> RefCellOptionExt<T> for RefCell<Option<T>> {
    fn set_value(&self, value: T) {
        *self.borrow_mut() = Some(value);
    }

    fn clear_value(&self) {
        *self.borrow_mut() = None;
    }

    fn is_some(&self) -> bool {
        self.borrow().is_some()
    }

    fn with_ref<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.borrow().as_ref().map(f)
    }
}
