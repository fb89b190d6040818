//! Wrapper around the `git` command line.
//!
//! [`GitCommander`] owns a work directory and checks repositories out at
//! `<work dir>/<owner>/<name>`. Every invocation is logged with credentials
//! masked.
//!
//! Tokens never reach `.git/config`. Remotes are stored with their plain
//! URLs, and the authenticated form is passed on the command line only for
//! the clone, fetch and push that need it.

mod error;
mod process;
mod redaction;

pub use error::GitError;
pub use redaction::{CommandArg, redact_argument, redact_sensitive_args, redact_text};

use crate::github::{self, Repository, Token};
use crate::repository::RepositoryName;
use camino::{Utf8Path, Utf8PathBuf};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use tracing::debug;
use url::Url;

/// Default git executable.
pub const GIT_PROGRAM: &str = "git";
/// Branch reset by [`GitCommander::reset_master_from_upstream`].
pub const MASTER_BRANCH: &str = "master";
/// Remote name used for the upstream repository.
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Username and token injected into HTTP(S) remotes.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    token: Token,
}

impl Credentials {
    /// Pair a username with a token.
    #[must_use]
    pub fn new(username: impl Into<String>, token: Token) -> Self {
        Self {
            username: username.into(),
            token,
        }
    }

    /// Return `url` with these credentials as userinfo.
    ///
    /// URLs that are not `http` or `https` (SSH remotes, local paths) are
    /// returned unchanged.
    #[must_use]
    pub fn apply(&self, url: &str) -> String {
        let Ok(mut parsed) = Url::parse(url) else {
            return url.to_owned();
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return url.to_owned();
        }
        if parsed.set_username(&self.username).is_err()
            || parsed.set_password(Some(self.token.expose())).is_err()
        {
            return url.to_owned();
        }
        parsed.into()
    }
}

/// Runs git commands against checkouts under a work directory.
#[derive(Debug, Clone)]
pub struct GitCommander {
    dir: Utf8PathBuf,
    program: OsString,
    credentials: Option<Credentials>,
}

impl GitCommander {
    /// Create a commander rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            program: OsString::from(GIT_PROGRAM),
            credentials: None,
        }
    }

    /// Use `program` instead of `git` from `PATH`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Authenticate HTTP(S) clones, fetches and pushes with `credentials`.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Work directory holding all checkouts.
    #[must_use]
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Checkout path for `repo`: `<dir>/<owner>/<name>`, lower-cased.
    ///
    /// GitHub treats owners and names case-insensitively, so every spelling
    /// of a repository maps to the same checkout.
    #[must_use]
    pub fn checkout_dir(&self, repo: &RepositoryName) -> Utf8PathBuf {
        self.dir
            .join(repo.owner().to_lowercase())
            .join(repo.name().to_lowercase())
    }

    /// Remove the work directory and everything in it.
    ///
    /// A work directory that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::Io`] when the directory cannot be removed.
    pub fn delete_work_dir(&self) -> Result<(), GitError> {
        debug!("deleting work directory {}", self.dir);
        remove_dir_if_present(&self.dir)
    }

    /// Clone `repo` over HTTPS into its checkout directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the repository has no HTTPS clone URL or the
    /// clone fails.
    pub fn clone_repository(&self, repo: &Repository) -> Result<Utf8PathBuf, GitError> {
        let url = github::clone_url(repo, true).map_err(|err| GitError::Repository {
            full_name: repo.full_name.clone(),
            reason: err.to_string(),
        })?;
        self.clone_from_url(repo, url)
    }

    /// Clone `url` into the checkout directory of `repo`.
    ///
    /// Any previous checkout at that path is removed first.
    ///
    /// # Errors
    ///
    /// Returns an error when the owner or name reported for `repo` is not a
    /// valid repository name, the checkout directory cannot be prepared, or
    /// `git clone` fails.
    pub fn clone_from_url(&self, repo: &Repository, url: &str) -> Result<Utf8PathBuf, GitError> {
        let name = repo
            .repository_name()
            .map_err(|err| GitError::Repository {
                full_name: repo.full_name.clone(),
                reason: err.to_string(),
            })?;
        let dest = self.checkout_dir(&name);
        remove_dir_if_present(&dest)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|source| GitError::Io {
                action: "create",
                path: parent.to_owned(),
                source,
            })?;
        }
        let remote = self.authenticated(url);
        self.git(
            None,
            [
                OsStr::new("clone"),
                OsStr::new(remote.as_str()),
                dest.as_os_str(),
            ],
        )?;
        if remote != url {
            self.git(Some(&dest), ["remote", "set-url", "origin", url])?;
        }
        Ok(dest)
    }

    /// Force `master` in the checkout at `dir`, and in its `origin`, to
    /// match upstream's `master`.
    ///
    /// # Errors
    ///
    /// Returns an error when any git step fails.
    pub fn reset_master_from_upstream(
        &self,
        dir: &Utf8Path,
        upstream_url: &str,
    ) -> Result<(), GitError> {
        self.reset_branch_from_upstream(dir, upstream_url, MASTER_BRANCH)
    }

    /// Force `branch` in the checkout at `dir`, and in its `origin`, to
    /// match `branch` in `upstream_url`.
    ///
    /// # Errors
    ///
    /// Returns an error when any git step fails.
    pub fn reset_branch_from_upstream(
        &self,
        dir: &Utf8Path,
        upstream_url: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        self.set_remote(dir, UPSTREAM_REMOTE, upstream_url)?;
        let tracking = format!("refs/remotes/{UPSTREAM_REMOTE}/{branch}");
        let refspec = format!("+refs/heads/{branch}:{tracking}");
        let upstream = self.authenticated(upstream_url);
        self.git(Some(dir), ["fetch", upstream.as_str(), refspec.as_str()])?;
        self.git(Some(dir), ["checkout", "-B", branch, tracking.as_str()])?;

        let origin_url = self.git(Some(dir), ["remote", "get-url", "origin"])?;
        let origin = self.authenticated(&origin_url);
        let push_spec = format!("{branch}:refs/heads/{branch}");
        self.git(
            Some(dir),
            ["push", "--force", origin.as_str(), push_spec.as_str()],
        )?;
        Ok(())
    }

    /// Object name of `HEAD` in the checkout at `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error when `rev-parse` fails or prints something that is
    /// not a SHA-1 or SHA-256 object name.
    pub fn last_commit_sha(&self, dir: &Utf8Path) -> Result<String, GitError> {
        let sha = self.git(Some(dir), ["rev-parse", "HEAD"])?;
        if is_object_name(&sha) {
            Ok(sha)
        } else {
            Err(GitError::InvalidSha {
                dir: dir.to_owned(),
                output: sha,
            })
        }
    }

    fn set_remote(&self, dir: &Utf8Path, name: &str, url: &str) -> Result<(), GitError> {
        let remotes = self.git(Some(dir), ["remote"])?;
        if remotes.lines().any(|remote| remote.trim() == name) {
            self.git(Some(dir), ["remote", "set-url", name, url])?;
        } else {
            self.git(Some(dir), ["remote", "add", name, url])?;
        }
        Ok(())
    }

    fn authenticated(&self, url: &str) -> String {
        self.credentials
            .as_ref()
            .map_or_else(|| url.to_owned(), |creds| creds.apply(url))
    }

    fn git<I, S>(&self, dir: Option<&Utf8Path>, args: I) -> Result<String, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        process::run_git(&self.program, dir, args)
    }
}

fn remove_dir_if_present(path: &Utf8Path) -> Result<(), GitError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(GitError::Io {
            action: "remove",
            path: path.to_owned(),
            source,
        }),
    }
}

fn is_object_name(text: &str) -> bool {
    matches!(text.len(), 40 | 64) && text.chars().all(|c| c.is_ascii_hexdigit())
}
