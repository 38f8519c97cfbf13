//! Timestamp parsing for posting and expiration columns

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Duration, Utc};

/// Offset-aware formats, tried after RFC 3339
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f %z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive formats, interpreted as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a listing timestamp into UTC. Returns `None` when no format matches.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Calendar year of a timestamp
pub fn year(ts: &DateTime<Utc>) -> i32 {
    ts.year()
}

/// Whole days from `start` to `end`, rounded down; negative when `end` precedes `start`.
///
/// Partial days count toward the earlier day, so an expiration one hour
/// before posting is -1 rather than 0.
pub fn whole_days_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> i64 {
    let gap = *end - *start;
    let days = gap.num_days();
    if gap < Duration::days(days) {
        days - 1
    } else {
        days
    }
}
