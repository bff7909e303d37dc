//! Timestamp helpers for filedrop.
//!
//! The metadata store keeps timestamps as TEXT in `%Y-%m-%d %H:%M:%S` (UTC),
//! matching SQLite's `datetime('now')`. The fixed-width format compares
//! correctly both lexicographically in SQL and after parsing in Rust.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC timestamp for storage.
pub fn fmt_utc(dt: DateTime<Utc>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp back into a UTC datetime.
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Convert a stored timestamp to RFC 3339 for API responses.
///
/// Falls back to the raw string if it does not parse.
pub fn to_rfc3339(s: &str) -> String {
    match parse_utc(s) {
        Some(dt) => dt.to_rfc3339(),
        None => s.to_string(),
    }
}
