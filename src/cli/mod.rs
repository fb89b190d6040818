//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands, and merges
//! configuration files, `FORKSYNC_*` environment variables and command-line
//! flags through `ortho_config`.

use camino::Utf8PathBuf;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use ortho_config::declarative::LayerComposition;
use ortho_config::figment::{Figment, providers::Env};
use ortho_config::uncased::Uncased;
use ortho_config::{
    ConfigDiscovery, MergeComposer, OrthoConfig, OrthoMergeExt, OrthoResult, sanitize_value,
};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::sync::Arc;

use crate::repository::RepositoryName;

mod parsing;

use parsing::{parse_api_url, parse_branch, parse_repository};

const CONFIG_ENV_VAR: &str = "FORKSYNC_CONFIG_PATH";
const ENV_PREFIX: &str = "FORKSYNC_";

/// Fork GitHub repositories to the current user and keep them in line with
/// upstream.
#[derive(Debug, Parser, Serialize, Deserialize, OrthoConfig)]
#[command(author, version, about, long_about = None)]
#[ortho_config(prefix = "FORKSYNC")]
pub struct Cli {
    /// Directory holding the fork and upstream checkouts.
    #[arg(short, long, value_name = "DIR", default_value = "forksync-work")]
    #[ortho_config(default = default_work_dir())]
    pub work_dir: Utf8PathBuf,

    /// Account to fork into; defaults to `$GITHUB_USER`.
    #[arg(long, value_name = "USER")]
    pub github_user: Option<String>,

    /// GitHub API root; defaults to `$GITHUB_API_URL` or the public API.
    #[arg(long, value_name = "URL", value_parser = parse_api_url)]
    pub api_url: Option<String>,

    /// Branch to reset from upstream.
    #[arg(long, value_name = "BRANCH", default_value = "master", value_parser = parse_branch)]
    #[ortho_config(default = default_branch())]
    pub branch: String,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    #[ortho_config(default = false)]
    pub verbose: bool,

    /// Subcommand to execute.
    ///
    /// `OrthoConfig` merging ignores this field; CLI parsing supplies it.
    #[serde(skip)]
    #[command(subcommand)]
    #[ortho_config(skip_cli)]
    pub command: Option<Commands>,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            work_dir: default_work_dir(),
            github_user: None,
            api_url: None,
            branch: default_branch(),
            verbose: false,
            command: None,
        }
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commands {
    /// Fork a repository to the current user and reset it to upstream.
    Fork {
        /// Upstream repository as `owner/name`.
        #[arg(value_name = "OWNER/NAME", value_parser = parse_repository)]
        repository: RepositoryName,
    },

    /// Check that existing fork and upstream checkouts share a last commit.
    Verify {
        /// Upstream repository as `owner/name`.
        #[arg(value_name = "OWNER/NAME", value_parser = parse_repository)]
        repository: RepositoryName,
    },

    /// Delete the work directory.
    Clean,
}

fn default_work_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("forksync-work")
}

fn default_branch() -> String {
    String::from(crate::git::MASTER_BRANCH)
}

/// Parse CLI arguments.
///
/// Returns both the parsed CLI struct and the `ArgMatches` required for
/// configuration merging.
///
/// # Errors
///
/// Returns a `clap::Error` when parsing fails.
pub fn parse_from<I, T>(iter: I) -> Result<(Cli, ArgMatches), clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = command.try_get_matches_from_mut(iter)?;
    // Clone matches before from_arg_matches_mut consumes the values.
    let matches_for_merge = matches.clone();
    let mut matches_for_parse = matches;
    let cli = Cli::from_arg_matches_mut(&mut matches_for_parse)
        .map_err(|clap_err| clap_err.with_cmd(&command))?;
    Ok((cli, matches_for_merge))
}

/// Return the prefixed environment provider for CLI configuration.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX)
}

/// Build configuration discovery for `forksync.toml` and friends.
fn config_discovery() -> ConfigDiscovery {
    ConfigDiscovery::builder("forksync")
        .env_var(CONFIG_ENV_VAR)
        .build()
}

/// Return `true` when no CLI overrides were supplied.
///
/// The merge pipeline treats an empty JSON object as "no overrides".
fn is_empty_value(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::Object(map) if map.is_empty())
}

fn cli_overrides_from_matches(cli: &Cli, matches: &ArgMatches) -> OrthoResult<serde_json::Value> {
    let value = sanitize_value(cli)?;
    let mut map = match value {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(Arc::new(ortho_config::OrthoError::Validation {
                key: String::from("cli"),
                message: format!(
                    "expected parsed CLI values to serialize to an object, got {other:?}"
                ),
            }));
        }
    };

    map.remove("command");
    for field in ["work_dir", "branch", "verbose"] {
        if matches.value_source(field) != Some(ValueSource::CommandLine) {
            map.remove(field);
        }
    }

    Ok(serde_json::Value::Object(map))
}

/// Merge configuration layers over the parsed CLI values.
///
/// Precedence, lowest first: defaults, configuration file, `FORKSYNC_*`
/// environment, command line.
///
/// # Errors
///
/// Returns an [`ortho_config::OrthoError`] if layer composition or merging
/// fails.
pub fn merge_with_config(cli: &Cli, matches: &ArgMatches) -> OrthoResult<Cli> {
    let command = cli.command.clone();
    let mut errors = Vec::new();
    let mut composer = MergeComposer::with_capacity(4);

    match sanitize_value(&Cli::default()) {
        Ok(value) => composer.push_defaults(value),
        Err(err) => errors.push(err),
    }

    let mut file_layers = config_discovery().compose_layers();
    errors.append(&mut file_layers.required_errors);
    if file_layers.value.is_empty() {
        errors.append(&mut file_layers.optional_errors);
    }
    for layer in file_layers.value {
        composer.push_layer(layer);
    }

    let env_provider = env_provider()
        .map(|key| Uncased::new(key.as_str().to_ascii_uppercase()))
        .split("__");
    match Figment::from(env_provider)
        .extract::<serde_json::Value>()
        .into_ortho_merge()
    {
        Ok(value) => composer.push_environment(value),
        Err(err) => errors.push(err),
    }

    match cli_overrides_from_matches(cli, matches) {
        Ok(value) if !is_empty_value(&value) => composer.push_cli(value),
        Ok(_) => {}
        Err(err) => errors.push(err),
    }

    let composition = LayerComposition::new(composer.layers(), errors);
    let mut merged = composition.into_merge_result(Cli::merge_from_layers)?;
    merged.command = command;
    Ok(merged)
}
