//! Timestamp formatting for persisted rows.
//!
//! Rows store timestamps as fixed-width UTC strings so that SQLite's text
//! comparison orders them chronologically.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Fixed-width storage format (microsecond precision, `Z` suffix).
pub const STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Formats `ts` in [`STORAGE_FORMAT`].
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use crawlflow::utils::format_storage;
///
/// let ts = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(format_storage(&ts), "2026-01-02T03:04:05.000000Z");
/// ```
#[must_use]
pub fn format_storage(ts: &Timestamp) -> String {
    ts.format(STORAGE_FORMAT).to_string()
}

/// Parses a stored timestamp. RFC 3339 input is accepted as well.
pub fn parse_storage(value: &str) -> Result<Timestamp, TimestampError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TimestampError::EmptyString);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, STORAGE_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimestampError::InvalidFormat(format!("{value}: {e}")))
}
