//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! resolves GitHub settings, builds the workflow and reports results.

use crate::cli::{Cli, Commands};
use crate::env::{GITHUB_USER_ENV, mandatory_env_var};
use crate::git::{Credentials, GitCommander};
use crate::github::{GitHubClient, GitHubSettings, SettingsOverrides};
use crate::repository::RepositoryName;
use crate::workflow::{self, ForkCheckout, ForkWorkflow};
use anyhow::{Context, Result, bail};
use mockable::{DefaultEnv, Env};
use std::io::{self, Write};
use tracing::debug;

/// Execute the parsed [`Cli`] command against the process environment,
/// reporting to standard output.
///
/// # Errors
///
/// Returns an error if no command was given or the command fails.
pub fn run(cli: &Cli) -> Result<()> {
    let env = DefaultEnv::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_with(cli, &env, &mut out)
}

/// Execute the parsed [`Cli`] command with an explicit environment and
/// output sink.
///
/// # Errors
///
/// Returns an error if no command was given or the command fails.
pub fn run_with(cli: &Cli, env: &impl Env, out: &mut impl Write) -> Result<()> {
    let Some(command) = cli.command.as_ref() else {
        bail!("no command given; run with --help for usage");
    };
    match command {
        Commands::Fork { repository } => handle_fork(cli, env, repository, out),
        Commands::Verify { repository } => handle_verify(cli, env, repository, out),
        Commands::Clean => handle_clean(cli, out),
    }
}

fn settings_overrides(cli: &Cli) -> SettingsOverrides<'_> {
    SettingsOverrides {
        user: cli.github_user.as_deref(),
        api_url: cli.api_url.as_deref(),
    }
}

fn handle_fork(
    cli: &Cli,
    env: &impl Env,
    repository: &RepositoryName,
    out: &mut impl Write,
) -> Result<()> {
    let settings = GitHubSettings::resolve(env, &settings_overrides(cli))
        .context("resolve GitHub settings")?;
    debug!(?settings, "resolved GitHub settings");
    let credentials = Credentials::new(settings.user(), settings.token().clone());
    let git = GitCommander::new(cli.work_dir.clone()).with_credentials(credentials);
    let workflow =
        ForkWorkflow::new(GitHubClient::new(settings), git).with_branch(cli.branch.clone());

    let checkout = workflow.fork_and_reset(repository)?;
    writeln!(out, "fork checkout: {}", checkout.fork_dir)?;
    writeln!(out, "upstream checkout: {}", checkout.upstream_dir)?;
    let comparison = workflow.verify_same_last_commit(&checkout)?;
    writeln!(out, "last commit: {}", comparison.fork_sha)?;
    Ok(())
}

fn handle_verify(
    cli: &Cli,
    env: &impl Env,
    repository: &RepositoryName,
    out: &mut impl Write,
) -> Result<()> {
    let user = match cli.github_user.as_deref() {
        Some(user) => user.to_owned(),
        None => mandatory_env_var(env, GITHUB_USER_ENV)?,
    };
    let git = GitCommander::new(cli.work_dir.clone());
    let checkout = ForkCheckout::locate(&git, repository, &user)?;
    let comparison = workflow::verify_same_last_commit(&git, &checkout)?;
    writeln!(
        out,
        "{} and {user}/{} share last commit {}",
        repository,
        repository.name(),
        comparison.upstream_sha
    )?;
    Ok(())
}

fn handle_clean(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let git = GitCommander::new(cli.work_dir.clone());
    git.delete_work_dir()?;
    writeln!(out, "removed {}", git.dir())?;
    Ok(())
}
