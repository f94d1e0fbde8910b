//! Zone-agnostic, second-granular calendar instants.
//!
//! A [`CalendarInstant`] is the only time value the query engine works with.
//! Ordering is the lexicographic compare of
//! `(year, month, day, hour, minute, second)`, so boundary tests never depend
//! on zone handling.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{OccurrenceError, Result};

/// Earliest supported calendar year (four-digit iCalendar DATE-TIME form).
pub const MIN_YEAR: i32 = 1;
/// Latest supported calendar year.
pub const MAX_YEAR: i32 = 9999;

/// A fully specified, legal Gregorian date and time of day, without a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarInstant {
    naive: NaiveDateTime,
}

impl CalendarInstant {
    /// Build an instant from calendar fields.
    ///
    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the fields do not name a
    /// legal date/time or the year is outside [`MIN_YEAR`]..=[`MAX_YEAR`].
    pub fn new(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Result<Self> {
        let out_of_range = || {
            OccurrenceError::TimestampOutOfRange(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ))
        };
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(out_of_range)?;
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(out_of_range)?;
        Self::from_naive(date.and_time(time))
    }

    /// Build an instant from a naive datetime, truncating any sub-second fraction.
    ///
    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the year is unsupported.
    pub fn from_naive(naive: NaiveDateTime) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&naive.year()) {
            return Err(OccurrenceError::TimestampOutOfRange(naive.to_string()));
        }
        // Leap-second representations (nanosecond >= 1e9) collapse to :59 as well.
        let truncated = naive.with_nanosecond(0).unwrap_or(naive);
        Ok(Self { naive: truncated })
    }

    pub fn year(&self) -> i32 {
        self.naive.year()
    }

    pub fn month(&self) -> u32 {
        self.naive.month()
    }

    pub fn day(&self) -> u32 {
        self.naive.day()
    }

    pub fn hour(&self) -> u32 {
        self.naive.hour()
    }

    pub fn minute(&self) -> u32 {
        self.naive.minute()
    }

    pub fn second(&self) -> u32 {
        self.naive.second()
    }

    /// The `(year, month, day, hour, minute, second)` tuple used for ordering.
    pub fn fields(&self) -> (i32, u32, u32, u32, u32, u32) {
        (
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second(),
        )
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.naive
    }
}

impl Ord for CalendarInstant {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields().cmp(&other.fields())
    }
}

impl PartialOrd for CalendarInstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CalendarInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.naive.format("%Y-%m-%dT%H:%M:%S"))
    }
}
