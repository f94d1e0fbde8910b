//! Occurrence queries: range, bounded-count, and next-single.
//!
//! Every query binds its rule to `dtstart`, opens one cursor, and pulls from
//! it lazily. Boundaries use the tuple ordering of [`CalendarInstant`]:
//!
//! | mode | lower bound | upper bound | cap |
//! |---|---|---|---|
//! | [`QuerySpec::Range`] | `start`, inclusive | `end`, inclusive | [`MAX_RANGE_RESULTS`] |
//! | [`QuerySpec::BoundedCount`] | `after`, exclusive | none | `limit` (1..=[`MAX_COUNT_LIMIT`]) |
//! | [`QuerySpec::NextSingle`] | `after`, exclusive | none | 1 |
//!
//! Hitting a cap is a silent truncation, not an error.

use std::iter::FusedIterator;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::convert::{to_calendar, to_external};
use crate::cursor::OccurrenceCursor;
use crate::error::{OccurrenceError, Result};
use crate::evaluator::{RRuleEvaluator, RecurrenceEvaluator, Schedule};
use crate::instant::CalendarInstant;
use crate::rule::RecurrenceRule;

/// Hard ceiling on the number of results a range query emits.
pub const MAX_RANGE_RESULTS: usize = 1000;

/// Hard ceiling on the `limit` of a bounded-count query.
pub const MAX_COUNT_LIMIT: u32 = 10_000;

/// The shape of an occurrence query. The anchor (`dtstart`) is passed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySpec {
    /// Occurrences in `[start, end]`.
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Up to `limit` occurrences strictly after `after`.
    BoundedCount { after: DateTime<Utc>, limit: i32 },
    /// The first occurrence strictly after `after`.
    NextSingle { after: DateTime<Utc> },
}

impl QuerySpec {
    fn name(&self) -> &'static str {
        match self {
            QuerySpec::Range { .. } => "range",
            QuerySpec::BoundedCount { .. } => "bounded_count",
            QuerySpec::NextSingle { .. } => "next_single",
        }
    }
}

/// Per-engine result caps. Can be tightened below the hard ceilings, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryLimits {
    /// Maximum results a range query emits.
    pub max_range_results: usize,
    /// Largest `limit` a bounded-count query accepts.
    pub max_count_limit: u32,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            max_range_results: MAX_RANGE_RESULTS,
            max_count_limit: MAX_COUNT_LIMIT,
        }
    }
}

impl QueryLimits {
    pub fn new(max_range_results: usize, max_count_limit: u32) -> Self {
        Self {
            max_range_results,
            max_count_limit,
        }
        .clamped()
    }

    /// Clamp both limits into `1..=` their hard ceilings.
    pub fn clamped(self) -> Self {
        Self {
            max_range_results: self.max_range_results.clamp(1, MAX_RANGE_RESULTS),
            max_count_limit: self.max_count_limit.clamp(1, MAX_COUNT_LIMIT),
        }
    }
}

/// Lifecycle of a single query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// Prepared, no cursor opened yet.
    Created,
    /// Cursor open; pulling, filtering and emitting.
    CursorOpen,
    /// Cursor released. Terminal.
    Closed(Termination),
}

/// Why a query reached [`QueryState::Closed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The rule ran out of occurrences, or the window's upper bound was passed.
    Exhausted,
    /// The result cap was reached.
    Capped,
    /// The caller stopped pulling before either of the above.
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
enum Bounds {
    Window {
        start: CalendarInstant,
        end: CalendarInstant,
    },
    After(CalendarInstant),
}

enum Verdict {
    Skip,
    Emit,
    Stop,
}

impl Bounds {
    fn classify(&self, occurrence: CalendarInstant) -> Verdict {
        match *self {
            Bounds::Window { start, end } => {
                if occurrence > end {
                    Verdict::Stop
                } else if occurrence < start {
                    Verdict::Skip
                } else {
                    Verdict::Emit
                }
            }
            Bounds::After(after) => {
                if occurrence > after {
                    Verdict::Emit
                } else {
                    Verdict::Skip
                }
            }
        }
    }
}

/// A query bound to its schedule, ready to be pulled.
#[derive(Debug)]
pub struct PreparedQuery<S> {
    schedule: S,
    bounds: Bounds,
    cap: usize,
}

impl<S: Schedule> PreparedQuery<S> {
    /// Start pulling. Each call opens a fresh cursor at the anchor.
    pub fn iter(&self) -> Occurrences<'_, S> {
        Occurrences {
            schedule: &self.schedule,
            cursor: None,
            bounds: self.bounds,
            cap: self.cap,
            emitted: 0,
            state: QueryState::Created,
        }
    }

    /// Maximum number of results this query can emit.
    pub fn cap(&self) -> usize {
        self.cap
    }
}

/// Lazily produced query results.
///
/// The cursor is released as soon as the query terminates, or when this
/// iterator is dropped.
pub struct Occurrences<'s, S: Schedule> {
    schedule: &'s S,
    cursor: Option<OccurrenceCursor<'s>>,
    bounds: Bounds,
    cap: usize,
    emitted: usize,
    state: QueryState,
}

impl<S: Schedule> Occurrences<'_, S> {
    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Results emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Stop early and release the cursor.
    pub fn close(&mut self) {
        if !matches!(self.state, QueryState::Closed(_)) {
            self.finish(Termination::Cancelled);
        }
    }

    fn finish(&mut self, termination: Termination) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
        tracing::trace!(?termination, emitted = self.emitted, "query closed");
        self.state = QueryState::Closed(termination);
    }
}

impl<S: Schedule> Iterator for Occurrences<'_, S> {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<DateTime<Utc>> {
        match self.state {
            QueryState::Closed(_) => return None,
            QueryState::Created => {
                self.cursor = Some(OccurrenceCursor::open(self.schedule));
                self.state = QueryState::CursorOpen;
            }
            QueryState::CursorOpen => {}
        }

        loop {
            let Some(occurrence) = self.cursor.as_mut().and_then(|cursor| cursor.advance()) else {
                self.finish(Termination::Exhausted);
                return None;
            };
            match self.bounds.classify(occurrence) {
                Verdict::Skip => continue,
                Verdict::Stop => {
                    self.finish(Termination::Exhausted);
                    return None;
                }
                Verdict::Emit => {
                    self.emitted += 1;
                    if self.emitted == self.cap {
                        tracing::trace!(cap = self.cap, "result cap reached");
                        self.finish(Termination::Capped);
                    }
                    return Some(to_external(occurrence));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            QueryState::Closed(_) => (0, Some(0)),
            _ => (0, Some(self.cap - self.emitted)),
        }
    }
}

impl<S: Schedule> FusedIterator for Occurrences<'_, S> {}

impl<S: Schedule> Drop for Occurrences<'_, S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs occurrence queries against a [`RecurrenceEvaluator`].
#[derive(Debug, Clone, Default)]
pub struct QueryEngine<E = RRuleEvaluator> {
    evaluator: E,
    limits: QueryLimits,
}

impl QueryEngine<RRuleEvaluator> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<E: RecurrenceEvaluator> QueryEngine<E> {
    pub fn with_evaluator(evaluator: E) -> Self {
        Self {
            evaluator,
            limits: QueryLimits::default(),
        }
    }

    /// Replace the limits. Values above the hard ceilings are clamped.
    pub fn with_limits(mut self, limits: QueryLimits) -> Self {
        self.limits = limits.clamped();
        self
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// # Errors
    /// Returns `OccurrenceError::InvalidRule` if the evaluator rejects `text`.
    pub fn validate_rule(&self, text: &str) -> Result<RecurrenceRule> {
        RecurrenceRule::validate_with(&self.evaluator, text)
    }

    pub fn is_valid_rule(&self, text: &str) -> bool {
        self.evaluator.check_rule(text).is_ok()
    }

    /// Check parameters, convert all timestamps, and bind the rule to `dtstart`.
    ///
    /// Nothing is pulled until the returned query is iterated.
    ///
    /// # Errors
    /// Returns `OccurrenceError::InvalidParameter` for a bounded-count `limit`
    /// outside `1..=max_count_limit`, and `OccurrenceError::TimestampOutOfRange`
    /// if any timestamp is outside the supported calendar range.
    pub fn prepare<Z: TimeZone>(
        &self,
        rule: &RecurrenceRule,
        spec: &QuerySpec,
        dtstart: &DateTime<Z>,
    ) -> Result<PreparedQuery<E::Schedule>> {
        let (bounds, cap) = match *spec {
            QuerySpec::Range { start, end } => (
                Bounds::Window {
                    start: to_calendar(&start)?,
                    end: to_calendar(&end)?,
                },
                self.limits.max_range_results,
            ),
            QuerySpec::BoundedCount { after, limit } => {
                let cap = self.check_limit(limit)?;
                (Bounds::After(to_calendar(&after)?), cap)
            }
            QuerySpec::NextSingle { after } => (Bounds::After(to_calendar(&after)?), 1),
        };
        let anchor = to_calendar(dtstart)?;

        tracing::debug!(
            rule = %rule,
            mode = spec.name(),
            dtstart = %anchor,
            cap,
            "prepared occurrence query"
        );

        Ok(PreparedQuery {
            schedule: self.evaluator.schedule(rule, anchor),
            bounds,
            cap,
        })
    }

    fn check_limit(&self, limit: i32) -> Result<usize> {
        let max = self.limits.max_count_limit;
        match u32::try_from(limit) {
            Ok(n) if (1..=max).contains(&n) => Ok(n as usize),
            _ => Err(OccurrenceError::InvalidParameter(format!(
                "count must be between 1 and {max}, got {limit}"
            ))),
        }
    }

    /// All occurrences in `[start, end]`, at most `max_range_results` of them.
    ///
    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
    pub fn occurrences_in_range<Z: TimeZone>(
        &self,
        rule: &RecurrenceRule,
        start: &DateTime<Z>,
        end: &DateTime<Z>,
        dtstart: &DateTime<Z>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let spec = QuerySpec::Range {
            start: start.with_timezone(&Utc),
            end: end.with_timezone(&Utc),
        };
        Ok(self.prepare(rule, &spec, dtstart)?.iter().collect())
    }

    /// Up to `limit` occurrences strictly after `after`.
    ///
    /// # Errors
    /// Returns `OccurrenceError::InvalidParameter` if `limit` is out of bounds, or
    /// `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
    pub fn next_occurrences<Z: TimeZone>(
        &self,
        rule: &RecurrenceRule,
        after: &DateTime<Z>,
        limit: i32,
        dtstart: &DateTime<Z>,
    ) -> Result<Vec<DateTime<Utc>>> {
        let spec = QuerySpec::BoundedCount {
            after: after.with_timezone(&Utc),
            limit,
        };
        Ok(self.prepare(rule, &spec, dtstart)?.iter().collect())
    }

    /// The first occurrence strictly after `after`, if the rule has one.
    ///
    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if a timestamp cannot be converted.
    pub fn next_occurrence<Z: TimeZone>(
        &self,
        rule: &RecurrenceRule,
        after: &DateTime<Z>,
        dtstart: &DateTime<Z>,
    ) -> Result<Option<DateTime<Utc>>> {
        let spec = QuerySpec::NextSingle {
            after: after.with_timezone(&Utc),
        };
        let query = self.prepare(rule, &spec, dtstart)?;
        let next = query.iter().next();
        Ok(next)
    }
}
