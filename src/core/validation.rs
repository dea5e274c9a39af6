//! Case input limits and validation.
//!
//! Validation runs before any network call. Lengths are counted in
//! characters of the trimmed case text, not bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::CaseInput;

/// Length limits for submitted cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseLimits {
    /// Minimum case length in characters (default: 20)
    #[serde(default = "default_min_case_chars")]
    pub min_case_chars: usize,

    /// Maximum case length in characters (default: 2000)
    #[serde(default = "default_max_case_chars")]
    pub max_case_chars: usize,
}

fn default_min_case_chars() -> usize {
    20
}
fn default_max_case_chars() -> usize {
    2000
}

impl Default for CaseLimits {
    fn default() -> Self {
        Self {
            min_case_chars: default_min_case_chars(),
            max_case_chars: default_max_case_chars(),
        }
    }
}

impl CaseLimits {
    /// Validate raw case text
    pub fn validate_text(&self, text: &str) -> Result<(), CaseViolation> {
        let actual = text.trim().chars().count();
        if actual < self.min_case_chars {
            return Err(CaseViolation::TooShort {
                actual,
                limit: self.min_case_chars,
            });
        }
        if actual > self.max_case_chars {
            return Err(CaseViolation::TooLong {
                actual,
                limit: self.max_case_chars,
            });
        }
        Ok(())
    }

    /// Validate a built case
    pub fn validate(&self, case: &CaseInput) -> Result<(), CaseViolation> {
        self.validate_text(&case.content)
    }
}

/// Case input validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaseViolation {
    #[error("Case text is too short: {actual} characters, at least {limit} required")]
    TooShort { actual: usize, limit: usize },

    #[error("Case text is too long: {actual} characters, at most {limit} allowed")]
    TooLong { actual: usize, limit: usize },
}
