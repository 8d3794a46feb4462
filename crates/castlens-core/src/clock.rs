//! Timestamp parsing and civil-time conversion.
//!
//! Item timestamps are raw ISO-8601 strings. Time-of-day logic (search time
//! buckets, the `hour`/`minute`/`weekday` predicate builtins) is evaluated in
//! one fixed civil timezone with daylight-saving rules, never in UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Civil timezone used when configuration does not name one.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Los_Angeles;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Wall-clock fields of an instant in a civil timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    /// Hour of day, `0..=23`.
    pub hour: u32,
    /// Minute of hour, `0..=59`.
    pub minute: u32,
    /// Day of week, `0` = Sunday through `6` = Saturday.
    pub weekday: u32,
}

/// Parse an item or filter timestamp.
///
/// Accepts RFC 3339 (with offset or `Z`), offset-less date-times, and bare
/// dates. Offset-less values are read as UTC. Returns `None` for anything
/// else, including the empty string.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Milliseconds since the Unix epoch, with missing or unparsable timestamps
/// mapped to `0`.
#[must_use]
pub fn epoch_millis_or_zero(raw: Option<&str>) -> i64 {
    raw.and_then(parse_timestamp)
        .map_or(0, |dt| dt.timestamp_millis())
}

/// Convert an instant to wall-clock fields in `tz`.
#[must_use]
pub fn civil_time(instant: DateTime<Utc>, tz: Tz) -> CivilTime {
    let local = instant.with_timezone(&tz);
    CivilTime {
        hour: local.hour(),
        minute: local.minute(),
        weekday: local.weekday().num_days_from_sunday(),
    }
}

/// Parse `raw` and convert it to wall-clock fields in `tz`.
#[must_use]
pub fn civil_time_of(raw: &str, tz: Tz) -> Option<CivilTime> {
    parse_timestamp(raw).map(|instant| civil_time(instant, tz))
}

/// Resolve an IANA timezone name such as `America/Los_Angeles`.
#[must_use]
pub fn parse_timezone(name: &str) -> Option<Tz> {
    name.trim().parse::<Tz>().ok()
}
