//! # occurrence-engine
//!
//! Bounded, lazily-produced occurrence queries over RFC 5545 recurrence rules.
//!
//! Given a validated RRULE, an anchor (`dtstart`), and a query shape, the engine
//! yields the ordered occurrences that satisfy it. Calendar arithmetic is
//! delegated to the `rrule` crate; this crate owns sequencing, boundaries and
//! safety caps.
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use occurrence_engine::{occurrences_in_range, validate_rule};
//!
//! let rule = validate_rule("FREQ=DAILY").unwrap();
//! let dtstart = Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
//! let start = Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2025, 11, 3, 0, 0, 0).unwrap();
//!
//! let hits = occurrences_in_range(&rule, &start, &end, &dtstart).unwrap();
//! assert_eq!(hits.len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`rule`] — validated `RecurrenceRule` values
//! - [`instant`] — `CalendarInstant` and its tuple ordering
//! - [`convert`] — external timestamp ↔ calendar instant conversion
//! - [`evaluator`] — recurrence evaluator traits and the `rrule` backend
//! - [`cursor`] — release-once occurrence cursor
//! - [`query`] — range, bounded-count and next-single queries
//! - [`error`] — Error types

pub mod convert;
pub mod cursor;
pub mod error;
pub mod evaluator;
pub mod instant;
pub mod query;
pub mod rule;

use chrono::{DateTime, TimeZone, Utc};

pub use convert::HostTimestamp;
pub use cursor::OccurrenceCursor;
pub use error::{OccurrenceError, Result};
pub use evaluator::{CursorHandle, RRuleEvaluator, RecurrenceEvaluator, Schedule};
pub use instant::CalendarInstant;
pub use query::{
    Occurrences, PreparedQuery, QueryEngine, QueryLimits, QuerySpec, QueryState, Termination,
    MAX_COUNT_LIMIT, MAX_RANGE_RESULTS,
};
pub use rule::RecurrenceRule;

/// Validate RRULE text, keeping it verbatim.
///
/// # Errors
/// Returns `OccurrenceError::InvalidRule` if the text has no recognizable frequency.
pub fn validate_rule(text: &str) -> Result<RecurrenceRule> {
    RecurrenceRule::validate(text)
}

/// `true` if [`validate_rule`] would succeed.
pub fn is_valid_rule(text: &str) -> bool {
    RecurrenceRule::is_valid(text)
}

/// Occurrences in `[start, end]` (both inclusive), at most [`MAX_RANGE_RESULTS`].
///
/// # Errors
/// Returns `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
pub fn occurrences_in_range<Z: TimeZone>(
    rule: &RecurrenceRule,
    start: &DateTime<Z>,
    end: &DateTime<Z>,
    dtstart: &DateTime<Z>,
) -> Result<Vec<DateTime<Utc>>> {
    QueryEngine::new().occurrences_in_range(rule, start, end, dtstart)
}

/// Up to `limit` occurrences strictly after `after`; `limit` must be in `1..=10000`.
///
/// # Errors
/// Returns `OccurrenceError::InvalidParameter` for an out-of-bounds `limit`, or
/// `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
pub fn next_occurrences<Z: TimeZone>(
    rule: &RecurrenceRule,
    after: &DateTime<Z>,
    limit: i32,
    dtstart: &DateTime<Z>,
) -> Result<Vec<DateTime<Utc>>> {
    QueryEngine::new().next_occurrences(rule, after, limit, dtstart)
}

/// The first occurrence strictly after `after`, or `None` if there is none.
///
/// # Errors
/// Returns `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
pub fn next_occurrence<Z: TimeZone>(
    rule: &RecurrenceRule,
    after: &DateTime<Z>,
    dtstart: &DateTime<Z>,
) -> Result<Option<DateTime<Utc>>> {
    QueryEngine::new().next_occurrence(rule, after, dtstart)
}
