//! UTC normalization for every timestamp entering the engine.
//!
//! Stored timestamps and query parameters arrive with arbitrary offsets or with
//! none at all. Everything downstream compares `DateTime<Utc>`, so conversion
//! happens here, once, at the boundary. A missing offset means "already UTC".

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::{AvailabilityError, Result};

/// Naive layouts accepted when the string carries no offset.
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Offset-carrying layouts beyond strict RFC 3339 (database style `+00`, `+0000`).
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.fZ",
];

/// Convert a zoned datetime to UTC.
pub fn normalize<Tz: TimeZone>(dt: DateTime<Tz>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

/// Attach UTC to a datetime that has no zone.
pub fn normalize_naive(dt: NaiveDateTime) -> DateTime<Utc> {
    dt.and_utc()
}

/// Parse a stored or user-supplied timestamp string into UTC.
///
/// Accepts RFC 3339 (`2025-03-01T10:00:00+02:00`, `...Z`), the space-separated
/// database form with or without an offset, naive ISO-8601 and a bare date
/// (midnight UTC).
///
/// # Errors
/// Returns `AvailabilityError::InvalidTimestamp` when no layout matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(normalize(dt));
    }
    for fmt in OFFSET_FORMATS {
        if fmt.ends_with('Z') {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(normalize_naive(ndt));
            }
        } else if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(normalize(dt));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(normalize_naive(ndt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(normalize_naive(date.and_time(NaiveTime::default())));
    }

    Err(AvailabilityError::InvalidTimestamp(raw.to_string()))
}

/// Number of days in the given month, leap years included.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// The last representable instant (23:59:59.999999) of `dt`'s UTC date.
pub fn end_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    end_of_date(dt.date_naive())
}

pub(crate) fn end_of_date(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or_default();
    normalize_naive(date.and_time(last))
}

/// 23:59:59 UTC on `date`. Used for the inclusive `UNTIL` bound.
pub fn until_instant(date: NaiveDate) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
    normalize_naive(date.and_time(last))
}

/// 23:59:59 UTC on the last day of `dt`'s month. Default end of a query window.
pub fn end_of_month(dt: DateTime<Utc>) -> DateTime<Utc> {
    let last_day = days_in_month(dt.year(), dt.month());
    let date = NaiveDate::from_ymd_opt(dt.year(), dt.month(), last_day).unwrap_or(dt.date_naive());
    until_instant(date)
}
