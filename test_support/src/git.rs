//! Local git repositories standing in for GitHub-hosted remotes.
//!
//! An [`UpstreamFixture`] owns a bare repository (the "remote") and a
//! scratch checkout used to push new commits into it. Forks are plain bare
//! copies taken with [`UpstreamFixture::fork_to`], so they start out at the
//! upstream commit current at that moment and fall behind as more commits
//! are added.

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::OpenOptions;
use std::io::Write;
use std::process::Command;

const BRANCH: &str = "master";

/// Whether a usable `git` executable is on `PATH`.
#[must_use]
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

/// Run git with a fixed identity and return trimmed stdout.
///
/// # Errors
///
/// Returns an error when git cannot be spawned or exits unsuccessfully.
pub fn git(dir: &Utf8Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Forksync Tests",
            "-c",
            "user.email=forksync@example.invalid",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir.as_std_path())
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        bail!(
            "git {} failed in {dir}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// `HEAD` of `master` in the bare repository at `bare`.
///
/// # Errors
///
/// Returns an error when the branch does not exist.
pub fn bare_head(bare: &Utf8Path) -> Result<String> {
    git(bare, &["rev-parse", "refs/heads/master"])
}

/// Bare upstream repository plus the checkout used to feed it commits.
#[derive(Debug)]
pub struct UpstreamFixture {
    bare: Utf8PathBuf,
    work: Utf8PathBuf,
}

impl UpstreamFixture {
    /// Create `<root>/<name>.git` and a scratch checkout next to it.
    ///
    /// # Errors
    ///
    /// Returns an error when either repository cannot be initialised.
    pub fn create(root: &Utf8Path, name: &str) -> Result<Self> {
        let bare = root.join(format!("{name}.git"));
        let work = root.join(format!("{name}-scratch"));
        for dir in [&bare, &work] {
            std::fs::create_dir_all(dir).with_context(|| format!("create {dir}"))?;
        }
        git(&bare, &["init", "--bare", "--quiet"])?;
        git(&bare, &["symbolic-ref", "HEAD", "refs/heads/master"])?;
        git(&work, &["init", "--quiet"])?;
        git(&work, &["symbolic-ref", "HEAD", "refs/heads/master"])?;
        Ok(Self { bare, work })
    }

    /// Path of the bare repository, usable as a clone URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.bare.as_str()
    }

    /// Commit a change to `master` and push it to the bare repository.
    ///
    /// Returns the new commit's SHA.
    ///
    /// # Errors
    ///
    /// Returns an error when writing, committing or pushing fails.
    pub fn commit(&self, message: &str) -> Result<String> {
        let history = self.work.join("HISTORY.md");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&history)
            .with_context(|| format!("open {history}"))?;
        writeln!(file, "- {message}").with_context(|| format!("write {history}"))?;
        git(&self.work, &["add", "HISTORY.md"])?;
        git(&self.work, &["commit", "--quiet", "-m", message])?;
        let refspec = format!("{BRANCH}:refs/heads/{BRANCH}");
        git(
            &self.work,
            &["push", "--quiet", self.bare.as_str(), refspec.as_str()],
        )?;
        git(&self.work, &["rev-parse", "HEAD"])
    }

    /// Current upstream `master`.
    ///
    /// # Errors
    ///
    /// Returns an error when the branch does not exist yet.
    pub fn head(&self) -> Result<String> {
        bare_head(&self.bare)
    }

    /// Copy the bare repository to `dest`, as GitHub does when forking.
    ///
    /// # Errors
    ///
    /// Returns an error when the clone fails.
    pub fn fork_to(&self, dest: &Utf8Path) -> Result<Utf8PathBuf> {
        let parent = dest
            .parent()
            .with_context(|| format!("{dest} has no parent directory"))?;
        std::fs::create_dir_all(parent).with_context(|| format!("create {parent}"))?;
        git(
            parent,
            &["clone", "--bare", "--quiet", self.bare.as_str(), dest.as_str()],
        )?;
        Ok(dest.to_owned())
    }
}
