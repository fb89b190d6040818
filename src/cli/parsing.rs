//! CLI parsing helpers for clap value parsers.

use crate::repository::RepositoryName;
use url::Url;

pub(super) fn parse_repository(s: &str) -> Result<RepositoryName, String> {
    RepositoryName::parse(s).map_err(|err| err.to_string())
}

/// Accept absolute `http`/`https` URLs only.
pub(super) fn parse_api_url(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    let parsed = Url::parse(trimmed).map_err(|err| format!("invalid URL '{trimmed}': {err}"))?;
    if matches!(parsed.scheme(), "http" | "https") {
        Ok(trimmed.to_owned())
    } else {
        Err(format!(
            "API URL '{trimmed}' must use http or https, not {}",
            parsed.scheme()
        ))
    }
}

/// Reject names git would refuse as a branch.
pub(super) fn parse_branch(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(String::from("branch must not be empty"));
    }
    let invalid = trimmed.starts_with('-')
        || trimmed.starts_with('/')
        || trimmed.ends_with('/')
        || trimmed.ends_with(".lock")
        || trimmed.contains("..")
        || trimmed.contains("@{")
        || trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c));
    if invalid {
        Err(format!("'{trimmed}' is not a valid branch name"))
    } else {
        Ok(trimmed.to_owned())
    }
}
