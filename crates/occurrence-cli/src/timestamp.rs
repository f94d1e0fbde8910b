//! Reading and rendering command-line timestamps.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Parse a timestamp into UTC.
///
/// Accepts RFC 3339 (with offset, e.g. "2025-11-01T09:00:00Z") or a naive
/// local time (e.g. "2025-11-01T09:00:00"), which is interpreted in `zone`.
/// A naive time that falls in a DST gap is rejected; an ambiguous one takes
/// the earlier instant.
pub fn parse_timestamp(s: &str, zone: Tz) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| anyhow!("Invalid timestamp '{}': expected RFC 3339 or YYYY-MM-DDTHH:MM:SS", s))?;
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| anyhow!("Timestamp '{}' does not exist in {}", s, zone))
}

/// Render a result in `zone` as RFC 3339.
pub fn render(ts: &DateTime<Utc>, zone: Tz) -> String {
    ts.with_timezone(&zone).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_offset_is_honored() {
        let ts = parse_timestamp("2025-11-01T11:00:00+02:00", chrono_tz::UTC).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn naive_time_uses_zone() {
        let ts = parse_timestamp("2025-11-01T10:00:00", chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap());

        let ts = parse_timestamp("2025-11-01 09:00:00", chrono_tz::UTC).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap());
    }

    #[test]
    fn dst_gap_is_rejected() {
        // Clocks jump from 02:00 to 03:00 in Berlin on 2026-03-29.
        assert!(parse_timestamp("2026-03-29T02:30:00", chrono_tz::Europe::Berlin).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_timestamp("next tuesday", chrono_tz::UTC).is_err());
    }

    #[test]
    fn render_in_zone() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();
        assert_eq!(render(&ts, chrono_tz::UTC), "2025-11-01T09:00:00+00:00");
        assert_eq!(
            render(&ts, chrono_tz::Europe::Berlin),
            "2025-11-01T10:00:00+01:00"
        );
    }
}
