//! Timestamp parsing and calendar feature extraction.

use chrono::{DateTime, Datelike as _, NaiveDate, NaiveDateTime, Timelike as _};

/// Accepted `Start_Time` layouts, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses a `Start_Time` value.
///
/// Accepts space- or `T`-separated date-times with optional fractional
/// seconds, RFC 3339 timestamps (the offset is dropped, keeping local wall
/// time), and bare dates (midnight).
#[must_use]
pub fn parse_start_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Calendar fields the model uses from a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
    /// Month of year, 1-12.
    pub month: u32,
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day of week, 0 = Monday .. 6 = Sunday.
    pub day_of_week: u32,
}

impl From<NaiveDateTime> for TimeParts {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            month: dt.month(),
            hour: dt.hour(),
            day_of_week: dt.weekday().num_days_from_monday(),
        }
    }
}
