//! Error types for the git command wrapper.

// See `github/error.rs`: derive expansion trips unused_assignments on some
// toolchains only.
#![allow(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    unused_assignments
)]

use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while running git or preparing its working directories.
#[derive(Debug, Error, Diagnostic)]
pub enum GitError {
    /// The git executable could not be started.
    #[error("failed to run {program}: {source}")]
    #[diagnostic(
        code(forksync::git::spawn),
        help("install git or point the wrapper at a working executable")
    )]
    Spawn {
        /// Executable that failed to start.
        program: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// git exited unsuccessfully.
    #[error("`{command}` failed with {status}: {stderr}")]
    #[diagnostic(code(forksync::git::failed))]
    Failed {
        /// Redacted command line.
        command: String,
        /// Exit status description.
        status: String,
        /// Redacted, trimmed standard error.
        stderr: String,
    },

    /// A filesystem operation on the work directory failed.
    #[error("failed to {action} {path}: {source}")]
    #[diagnostic(code(forksync::git::io))]
    Io {
        /// What was attempted.
        action: &'static str,
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// `rev-parse` returned something other than an object name.
    #[error("unexpected commit id '{output}' in {dir}")]
    #[diagnostic(code(forksync::git::invalid_sha))]
    InvalidSha {
        /// Checkout that was inspected.
        dir: Utf8PathBuf,
        /// Raw output.
        output: String,
    },

    /// The repository document cannot be mapped to a checkout.
    #[error("cannot clone {full_name}: {reason}")]
    #[diagnostic(code(forksync::git::repository))]
    Repository {
        /// Repository being cloned.
        full_name: String,
        /// Why it cannot be cloned.
        reason: String,
    },
}
