//! Validated recurrence rule values.
//!
//! A [`RecurrenceRule`] is checked once, when it is constructed, and keeps the
//! accepted text byte-for-byte. Nothing downstream re-validates it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OccurrenceError, Result};
use crate::evaluator::{RRuleEvaluator, RecurrenceEvaluator};

/// RFC 5545 RRULE text that the evaluator accepted (e.g. `"FREQ=WEEKLY;BYDAY=TU,TH"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecurrenceRule {
    text: String,
}

impl RecurrenceRule {
    /// Validate `text` with the `rrule`-backed evaluator.
    ///
    /// # Errors
    /// Returns `OccurrenceError::InvalidRule` carrying the offending text if it has
    /// no recognizable frequency, fails to parse, or cannot be expanded from any
    /// anchor (e.g. `INTERVAL=0`).
    pub fn validate(text: impl Into<String>) -> Result<Self> {
        Self::validate_with(&RRuleEvaluator, text)
    }

    /// Validate `text` with a specific evaluator.
    ///
    /// # Errors
    /// Returns `OccurrenceError::InvalidRule` if the evaluator rejects the text.
    pub fn validate_with<E: RecurrenceEvaluator>(evaluator: &E, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        match evaluator.check_rule(&text) {
            Ok(()) => Ok(Self { text }),
            Err(reason) => {
                tracing::debug!(rule = %text, %reason, "rejected RRULE");
                Err(OccurrenceError::InvalidRule(text))
            }
        }
    }

    /// Same check as [`RecurrenceRule::validate`], without the error.
    pub fn is_valid(text: &str) -> bool {
        RRuleEvaluator.check_rule(text).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for RecurrenceRule {
    type Err = OccurrenceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::validate(s)
    }
}

impl TryFrom<String> for RecurrenceRule {
    type Error = OccurrenceError;

    fn try_from(text: String) -> Result<Self> {
        Self::validate(text)
    }
}

impl From<RecurrenceRule> for String {
    fn from(rule: RecurrenceRule) -> Self {
        rule.text
    }
}

impl AsRef<str> for RecurrenceRule {
    fn as_ref(&self) -> &str {
        &self.text
    }
}
