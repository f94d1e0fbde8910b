//! Time conversion between external timestamps and [`CalendarInstant`].
//!
//! External timestamps are resolved to UTC before they enter the engine and
//! results leave it as UTC. Sub-second fractions are dropped on the way in.

use chrono::{DateTime, TimeZone, Utc};

use crate::error::{OccurrenceError, Result};
use crate::instant::CalendarInstant;

/// Unix microseconds of the host epoch, 2000-01-01T00:00:00Z.
const HOST_EPOCH_UNIX_MICROS: i64 = 946_684_800_000_000;

/// Convert any zoned timestamp into a UTC calendar instant.
///
/// # Errors
/// Returns `OccurrenceError::TimestampOutOfRange` if the UTC year is outside the
/// supported calendar range.
pub fn to_calendar<Tz: TimeZone>(ts: &DateTime<Tz>) -> Result<CalendarInstant> {
    CalendarInstant::from_naive(ts.naive_utc())
}

/// Convert a calendar instant back into a UTC timestamp.
pub fn to_external(instant: CalendarInstant) -> DateTime<Utc> {
    instant.as_naive().and_utc()
}

/// The host database's timestamp value: signed microseconds since
/// 2000-01-01T00:00:00Z.
///
/// Adapter for embedding callers that hold raw host values. Queries take
/// `DateTime`s, so convert with [`HostTimestamp::to_datetime`] on the way in
/// and [`HostTimestamp::from_datetime`] on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostTimestamp(pub i64);

impl HostTimestamp {
    pub fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    pub fn micros(self) -> i64 {
        self.0
    }

    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the value overflows the
    /// host representation.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Result<Self> {
        dt.timestamp_micros()
            .checked_sub(HOST_EPOCH_UNIX_MICROS)
            .map(Self)
            .ok_or_else(|| OccurrenceError::TimestampOutOfRange(dt.naive_utc().to_string()))
    }

    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the value cannot be
    /// represented as a `DateTime<Utc>`.
    pub fn to_datetime(self) -> Result<DateTime<Utc>> {
        self.0
            .checked_add(HOST_EPOCH_UNIX_MICROS)
            .and_then(|micros| Utc.timestamp_micros(micros).single())
            .ok_or_else(|| {
                OccurrenceError::TimestampOutOfRange(format!("{} microseconds since 2000-01-01", self.0))
            })
    }

    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the value is outside the
    /// supported calendar range.
    pub fn to_calendar(self) -> Result<CalendarInstant> {
        to_calendar(&self.to_datetime()?)
    }

    /// # Errors
    /// Returns `OccurrenceError::TimestampOutOfRange` if the instant overflows the
    /// host representation.
    pub fn from_calendar(instant: CalendarInstant) -> Result<Self> {
        Self::from_datetime(&to_external(instant))
    }
}
