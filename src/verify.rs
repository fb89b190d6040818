//! Assertion collection for verification steps.
//!
//! A [`Verifier`] records every failed check instead of stopping at the
//! first one, then reports them together through [`Verifier::finish`].

use std::fmt;
use thiserror::Error;

/// One or more checks failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_failures(.failures))]
pub struct VerificationError {
    /// Failure descriptions in the order they were recorded.
    pub failures: Vec<String>,
}

fn render_failures(failures: &[String]) -> String {
    match failures {
        [single] => single.clone(),
        many => {
            let mut text = format!("{} checks failed:", many.len());
            for failure in many {
                text.push_str("\n  - ");
                text.push_str(failure);
            }
            text
        }
    }
}

/// Collects assertion failures.
#[derive(Debug, Default)]
pub struct Verifier {
    failures: Vec<String>,
}

impl Verifier {
    /// Create an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failures: Vec::new(),
        }
    }

    /// Record a failure unless `expected` equals `actual`.
    pub fn equal<T>(&mut self, expected: &T, actual: &T, message: impl fmt::Display) -> &mut Self
    where
        T: PartialEq + fmt::Debug + ?Sized,
    {
        if expected != actual {
            self.failures.push(format!("{message}: expected {expected:?}, got {actual:?}"));
        }
        self
    }

    /// Record a failure unless `condition` holds.
    pub fn is_true(&mut self, condition: bool, message: impl fmt::Display) -> &mut Self {
        if !condition {
            self.failures.push(message.to_string());
        }
        self
    }

    /// Number of failures recorded so far.
    #[must_use]
    pub const fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Consume the collector.
    ///
    /// # Errors
    ///
    /// Returns a [`VerificationError`] listing every recorded failure.
    pub fn finish(self) -> Result<(), VerificationError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(VerificationError {
                failures: self.failures,
            })
        }
    }
}
