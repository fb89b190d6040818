//! Fork orchestration.
//!
//! Strings the GitHub client, the git wrapper and the verifier together
//! into the three steps of a fork check: start from a clean work
//! directory, fork and reset, then compare last commits.

use crate::git::GitCommander;
use crate::github::{self, GitHubClient};
use crate::repository::{RepositoryName, RepositoryNameError};
use crate::verify::Verifier;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tracing::info;

/// Checkouts produced by [`ForkWorkflow::fork_and_reset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkCheckout {
    /// Clone of the user's fork.
    pub fork_dir: Utf8PathBuf,
    /// Clone of the upstream repository.
    pub upstream_dir: Utf8PathBuf,
}

impl ForkCheckout {
    /// Where `git` places `upstream` and `user`'s fork of it.
    ///
    /// # Errors
    ///
    /// Returns an error when `user` is not a valid repository owner.
    pub fn locate(
        git: &GitCommander,
        upstream: &RepositoryName,
        user: &str,
    ) -> Result<Self, RepositoryNameError> {
        Ok(Self {
            fork_dir: git.checkout_dir(&upstream.with_owner(user)?),
            upstream_dir: git.checkout_dir(upstream),
        })
    }
}

/// Last commits found by [`ForkWorkflow::verify_same_last_commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitComparison {
    /// `HEAD` of the upstream clone.
    pub upstream_sha: String,
    /// `HEAD` of the fork clone.
    pub fork_sha: String,
}

/// Forks repositories to one user and keeps them in line with upstream.
#[derive(Debug)]
pub struct ForkWorkflow {
    client: GitHubClient,
    git: GitCommander,
    branch: String,
}

impl ForkWorkflow {
    /// Create a workflow resetting `master`.
    #[must_use]
    pub fn new(client: GitHubClient, git: GitCommander) -> Self {
        Self {
            client,
            git,
            branch: String::from(crate::git::MASTER_BRANCH),
        }
    }

    /// Reset `branch` instead of `master`.
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// The git wrapper in use.
    #[must_use]
    pub const fn git(&self) -> &GitCommander {
        &self.git
    }

    /// User forks are created for.
    #[must_use]
    pub fn user(&self) -> &str {
        self.client.settings().user()
    }

    /// Checkout locations for `upstream` and the user's fork of it.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured user is not a valid owner.
    pub fn checkout_for(&self, upstream: &RepositoryName) -> Result<ForkCheckout> {
        Ok(ForkCheckout::locate(&self.git, upstream, self.user())?)
    }

    /// Delete the work directory and check that no checkout of `upstream`
    /// remains.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be removed or the
    /// checkout still exists afterwards.
    pub fn prepare_clean(&self, upstream: &RepositoryName) -> Result<()> {
        self.git.delete_work_dir()?;
        let path = self.git.checkout_dir(upstream);
        let mut verifier = Verifier::new();
        verifier.is_true(!path.exists(), format!("{path} should not exist"));
        verifier.finish()?;
        Ok(())
    }

    /// Fork `upstream` to the current user, or reuse the existing fork, then
    /// clone both and force the fork's branch to match upstream.
    ///
    /// # Errors
    ///
    /// Returns an error when any GitHub call or git step fails.
    pub fn fork_and_reset(&self, upstream: &RepositoryName) -> Result<ForkCheckout> {
        let upstream_repo = self
            .client
            .get_repository(upstream)
            .with_context(|| format!("look up {upstream}"))?;
        let fork = self
            .client
            .fork_repository_or_revert_master_in_fork(upstream, self.user())
            .with_context(|| format!("fork {upstream} to {}", self.user()))?;

        let fork_dir = self
            .git
            .clone_repository(&fork)
            .with_context(|| format!("clone fork {}", fork.full_name))?;
        info!("Cloned to directory: {fork_dir}");

        let upstream_url = github::clone_url(&upstream_repo, true)?;
        let upstream_dir = self
            .git
            .clone_from_url(&upstream_repo, upstream_url)
            .with_context(|| format!("clone upstream {upstream}"))?;

        self.git
            .reset_branch_from_upstream(&fork_dir, upstream_url, &self.branch)
            .with_context(|| format!("reset {} of {} from upstream", self.branch, fork.full_name))?;

        Ok(ForkCheckout {
            fork_dir,
            upstream_dir,
        })
    }

    /// Check that both checkouts point at the same commit.
    ///
    /// # Errors
    ///
    /// See [`verify_same_last_commit`].
    pub fn verify_same_last_commit(&self, checkout: &ForkCheckout) -> Result<CommitComparison> {
        verify_same_last_commit(&self.git, checkout)
    }
}

/// Check that the fork and upstream checkouts point at the same commit.
///
/// # Errors
///
/// Returns an error when a SHA cannot be read, or a
/// [`crate::verify::VerificationError`] when the SHAs differ.
pub fn verify_same_last_commit(
    git: &GitCommander,
    checkout: &ForkCheckout,
) -> Result<CommitComparison> {
    let upstream_sha = git.last_commit_sha(&checkout.upstream_dir)?;
    let fork_sha = git.last_commit_sha(&checkout.fork_dir)?;
    info!("upstream last commit is {upstream_sha}");
    info!("fork last commit is {fork_sha}");

    let mut verifier = Verifier::new();
    verifier.equal(
        upstream_sha.as_str(),
        fork_sha.as_str(),
        format!(
            "The git sha on the fork should be the same as the upstream repository in dir {} and {}",
            checkout.fork_dir, checkout.upstream_dir
        ),
    );
    verifier.finish()?;
    Ok(CommitComparison {
        upstream_sha,
        fork_sha,
    })
}
