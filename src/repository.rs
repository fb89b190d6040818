//! Parsing for `owner/name` repository identifiers.
//!
//! Scenario text, CLI arguments and GitHub API paths all refer to
//! repositories as `owner/name`. Parsing happens once here so the rest of
//! the crate can rely on both segments being present and well formed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors emitted when parsing an `owner/name` repository identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryNameError {
    /// Input was empty or whitespace.
    #[error("repository name must not be empty")]
    Empty,
    /// The identifier did not contain an `owner/name` separator.
    #[error("repository name '{input}' must have the form owner/name")]
    MissingSeparator {
        /// Original identifier.
        input: String,
    },
    /// The identifier contained more than one `/`.
    #[error("repository name '{input}' has too many path segments")]
    TooManySegments {
        /// Original identifier.
        input: String,
    },
    /// Either the owner or the repository segment was empty.
    #[error("repository name '{input}' has an empty owner or repository segment")]
    EmptySegment {
        /// Original identifier.
        input: String,
    },
    /// A segment contained whitespace.
    #[error("repository name '{input}' must not contain whitespace")]
    Whitespace {
        /// Original identifier.
        input: String,
    },
    /// A segment was `.` or `..`, or contained a backslash.
    #[error("repository name '{input}' must not use '.' or '..' segments or backslashes")]
    PathSegment {
        /// Original identifier.
        input: String,
    },
}

fn is_path_segment(segment: &str) -> bool {
    matches!(segment, "." | "..") || segment.contains('\\')
}

/// Repository identifier split into owner (user or organisation) and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    /// Parse `owner/name` into its components.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when the identifier is empty, lacks a separator,
    /// has more than two segments, contains whitespace, or has a segment
    /// that would escape a directory when joined onto a path.
    pub fn parse(input: &str) -> Result<Self, RepositoryNameError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RepositoryNameError::Empty);
        }
        let Some((owner, name)) = trimmed.split_once('/') else {
            return Err(RepositoryNameError::MissingSeparator {
                input: trimmed.to_owned(),
            });
        };
        if name.contains('/') {
            return Err(RepositoryNameError::TooManySegments {
                input: trimmed.to_owned(),
            });
        }
        if owner.is_empty() || name.is_empty() {
            return Err(RepositoryNameError::EmptySegment {
                input: trimmed.to_owned(),
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(RepositoryNameError::Whitespace {
                input: trimmed.to_owned(),
            });
        }
        if is_path_segment(owner) || is_path_segment(name) {
            return Err(RepositoryNameError::PathSegment {
                input: trimmed.to_owned(),
            });
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Build an identifier from already validated parts.
    ///
    /// # Errors
    ///
    /// Returns an error when either part would not survive [`Self::parse`].
    pub fn from_parts(owner: &str, name: &str) -> Result<Self, RepositoryNameError> {
        Self::parse(&format!("{owner}/{name}"))
    }

    /// User or organisation owning the repository.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name without the owner.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `owner/name` form used by the GitHub API.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Same repository name under a different owner.
    ///
    /// Forks keep the upstream name, so this yields the identifier a fork
    /// owned by `owner` would have.
    ///
    /// # Errors
    ///
    /// Returns an error when `owner` is not a valid owner segment.
    pub fn with_owner(&self, owner: &str) -> Result<Self, RepositoryNameError> {
        Self::from_parts(owner, &self.name)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryName {
    type Err = RepositoryNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for RepositoryName {
    type Error = RepositoryNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl Serialize for RepositoryName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.full_name())
    }
}

impl<'de> Deserialize<'de> for RepositoryName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
