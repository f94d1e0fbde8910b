//! Error types for occurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OccurrenceError {
    /// The text is not a recurrence rule with a recognizable frequency.
    #[error("invalid RRULE string: \"{0}\"")]
    InvalidRule(String),

    /// A timestamp cannot be represented on one side of the conversion.
    #[error("timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    /// A caller-supplied query parameter is outside its allowed bounds.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, OccurrenceError>;
