//! Subprocess plumbing for the git wrapper.
//! Internal to `git`; the public API lives on `GitCommander`.

use super::GitError;
use super::redaction::{CommandArg, redact_sensitive_args, redact_text};
use camino::Utf8Path;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::process::{Command, Output, Stdio};
use tracing::{debug, info};

/// Render `program args...` with credentials masked.
fn display_command(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let args: Vec<CommandArg> = cmd
        .get_args()
        .map(|a| CommandArg::new(a.to_string_lossy().into_owned()))
        .collect();
    let redacted = redact_sensitive_args(&args);
    let mut rendered = program;
    for arg in &redacted {
        rendered.push(' ');
        rendered.push_str(arg.as_str());
    }
    rendered
}

fn describe_status(output: &Output) -> String {
    output
        .status
        .code()
        .map_or_else(|| String::from("a signal"), |code| format!("exit code {code}"))
}

/// Fail with [`GitError::Io`] unless `path` is an existing directory.
fn ensure_directory(path: &Utf8Path) -> Result<(), GitError> {
    let metadata = fs::metadata(path).map_err(|source| GitError::Io {
        action: "enter",
        path: path.to_owned(),
        source,
    })?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(GitError::Io {
            action: "enter",
            path: path.to_owned(),
            source: io::Error::from(io::ErrorKind::NotADirectory),
        })
    }
}

/// Run `program args...` inside `dir` and return trimmed stdout.
///
/// Standard input is closed and interactive credential prompts are
/// disabled, so a missing credential fails instead of hanging.
pub(super) fn run_git<I, S>(
    program: &OsStr,
    dir: Option<&Utf8Path>,
    args: I,
) -> Result<String, GitError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(path) = dir {
        ensure_directory(path)?;
        cmd.current_dir(path.as_std_path());
    }
    let rendered = display_command(&cmd);
    info!("Running command: {rendered}");
    let output = cmd.output().map_err(|source| GitError::Spawn {
        program: program.to_string_lossy().into_owned(),
        source,
    })?;
    if !output.status.success() {
        let stderr = redact_text(String::from_utf8_lossy(&output.stderr).trim());
        return Err(GitError::Failed {
            command: rendered,
            status: describe_status(&output),
            stderr,
        });
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    debug!("{rendered} succeeded");
    Ok(stdout)
}
