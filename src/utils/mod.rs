//! Utility functions and helpers.

pub mod ids;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Current time as an RFC 3339 string with millisecond precision.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Format a timestamp the way the web client writes them (`2024-01-01T00:00:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read a stored timestamp: strings are kept verbatim, epoch milliseconds are converted.
pub fn timestamp_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(format_timestamp),
        _ => None,
    }
}

/// Split a `/`-separated store path into non-empty segments.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join store path segments, ignoring empty pieces and stray slashes.
pub fn join_path(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|p| path_segments(p))
        .collect::<Vec<_>>()
        .join("/")
}
