//! Recurrence evaluator boundary.
//!
//! The engine never does calendar arithmetic itself. It asks a
//! [`RecurrenceEvaluator`] whether rule text is acceptable, binds a validated
//! rule to an anchor as a [`Schedule`], and pulls occurrences from the
//! [`CursorHandle`]s the schedule opens. Dropping a handle releases it.
//!
//! [`RRuleEvaluator`] is the production implementation, backed by the `rrule`
//! crate with every anchor pinned to UTC.

use std::borrow::Cow;

use chrono::{DateTime, TimeZone};
use rrule::{RRule, RRuleSet, Tz, Unvalidated};

use crate::convert::{to_calendar, to_external};
use crate::instant::{CalendarInstant, MIN_YEAR};
use crate::rule::RecurrenceRule;

/// Parses rule text and binds rules to anchors.
pub trait RecurrenceEvaluator {
    type Schedule: Schedule;

    /// Check that `text` is a rule with a real frequency that the evaluator
    /// can expand. Anchor-dependent failures (such as an `UNTIL` before a
    /// particular `dtstart`) are not rejected here.
    ///
    /// Returns the evaluator's reason on rejection.
    fn check_rule(&self, text: &str) -> Result<(), String>;

    /// Bind a validated rule to `anchor`.
    ///
    /// Binding is infallible: a rule the evaluator cannot expand from this
    /// anchor produces a schedule with no occurrences.
    fn schedule(&self, rule: &RecurrenceRule, anchor: CalendarInstant) -> Self::Schedule;
}

/// A rule bound to an anchor. Owns whatever evaluator state cursors borrow.
pub trait Schedule {
    /// Open a fresh cursor positioned at the anchor.
    fn open_cursor(&self) -> Box<dyn CursorHandle + '_>;
}

/// An evaluator-owned iteration handle.
pub trait CursorHandle {
    /// The next raw occurrence, or `None` once the rule has no more.
    ///
    /// The first `None` ends the cursor; the handle is released without
    /// being asked again.
    fn advance(&mut self) -> Option<CalendarInstant>;
}

/// Evaluator backed by the `rrule` crate.
///
/// Every anchor is UTC, so an `UNTIL` without the `Z` designator is read as
/// UTC wall-clock time, and a date-only `UNTIL` covers that whole UTC day.
#[derive(Debug, Clone, Copy, Default)]
pub struct RRuleEvaluator;

impl RecurrenceEvaluator for RRuleEvaluator {
    type Schedule = RRuleSchedule;

    fn check_rule(&self, text: &str) -> Result<(), String> {
        // Rules are checked against the earliest supported anchor so that
        // only anchor-independent problems are reported.
        let anchor = Tz::UTC
            .with_ymd_and_hms(MIN_YEAR, 1, 1, 0, 0, 0)
            .single()
            .ok_or_else(|| "no validation anchor".to_string())?;
        build(text, anchor).map(|_| ())
    }

    fn schedule(&self, rule: &RecurrenceRule, anchor: CalendarInstant) -> RRuleSchedule {
        let dt_start = to_external(anchor).with_timezone(&Tz::UTC);
        match build(rule.as_str(), dt_start) {
            Ok(set) => RRuleSchedule { set: Some(set) },
            Err(reason) => {
                tracing::debug!(
                    rule = %rule,
                    anchor = %anchor,
                    %reason,
                    "rule cannot be expanded from anchor; no occurrences"
                );
                RRuleSchedule { set: None }
            }
        }
    }
}

fn build(text: &str, dt_start: DateTime<Tz>) -> Result<RRuleSet, String> {
    utc_until(text)
        .parse::<RRule<Unvalidated>>()
        .map_err(|e| e.to_string())?
        .build(dt_start)
        .map_err(|e| e.to_string())
}

/// Rewrite a floating or date-only `UNTIL` as a UTC date-time.
fn utc_until(text: &str) -> Cow<'_, str> {
    if !text.split(';').any(|part| floating_until(part).is_some()) {
        return Cow::Borrowed(text);
    }
    let parts: Vec<String> = text
        .split(';')
        .map(|part| match floating_until(part) {
            Some(value) if value.len() == 8 => format!("UNTIL={value}T235959Z"),
            Some(value) => format!("UNTIL={value}Z"),
            None => part.to_string(),
        })
        .collect();
    Cow::Owned(parts.join(";"))
}

/// The value of an `UNTIL` part that has no UTC designator.
fn floating_until(part: &str) -> Option<&str> {
    let (key, value) = part.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("UNTIL") {
        return None;
    }
    let value = value.trim();
    if value.is_empty() || value.ends_with(['Z', 'z']) {
        None
    } else {
        Some(value)
    }
}

/// An `RRuleSet` built from a rule and a UTC anchor.
#[derive(Debug, Clone)]
pub struct RRuleSchedule {
    set: Option<RRuleSet>,
}

impl Schedule for RRuleSchedule {
    fn open_cursor(&self) -> Box<dyn CursorHandle + '_> {
        Box::new(RRuleHandle {
            occurrences: self.set.iter().flatten(),
        })
    }
}

struct RRuleHandle<I> {
    occurrences: I,
}

impl<I> CursorHandle for RRuleHandle<I>
where
    I: Iterator<Item = DateTime<Tz>>,
{
    fn advance(&mut self) -> Option<CalendarInstant> {
        let dt = self.occurrences.next()?;
        match to_calendar(&dt) {
            Ok(instant) => Some(instant),
            Err(e) => {
                tracing::trace!(error = %e, "occurrence outside calendar range; ending cursor");
                None
            }
        }
    }
}
