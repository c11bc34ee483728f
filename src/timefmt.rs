//! ISO-8601 timestamp parsing and rendering
//!
//! All timestamps leaving the service are UTC. Inputs without an offset are
//! taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{ApiError, ApiResult};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Current time as an ISO-8601 string
pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Render a UTC timestamp, e.g. `2024-05-01T10:00:00.250+00:00`
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Render a naive timestamp, assuming it is already UTC
pub fn naive_to_iso(ts: NaiveDateTime) -> String {
    to_iso(ts.and_utc())
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts a trailing `Z`, a numeric offset, no offset at all (UTC), a space
/// instead of `T`, or a bare date (midnight UTC).
pub fn parse_iso(input: &str) -> ApiResult<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(ApiError::invalid("Invalid datetime. Use ISO-8601"))
}

/// Parse an optional timestamp; blank counts as absent
pub fn parse_optional(input: Option<&str>) -> ApiResult<Option<DateTime<Utc>>> {
    match input.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_iso(s).map(Some),
    }
}
