//! Format-specific normalizers.
//!
//! Each normalizer turns one detected payload into canonical
//! [`Conversation`](crate::models::Conversation)s. Normalizers are pure:
//! the caller supplies the current time, so results are reproducible in
//! tests and every record from one run shares a clock reading.

pub mod bibtex;
pub mod chatgpt;
pub mod claude;
pub mod text;

pub use bibtex::{normalize_bibtex, parse_bibtex, BibEntry};
pub use chatgpt::normalize_chatgpt;
pub use claude::normalize_claude;
pub use text::normalize_transcript;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// First non-empty string among `keys` on `value`.
pub(crate) fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Flattens the content representations seen in chat exports into text.
///
/// Accepts a plain string, an array of strings or `{ "text": .. }` blocks,
/// or an object with `parts` or `text`. Non-text parts (image pointers,
/// tool payloads) are ignored.
pub(crate) fn flatten_content(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(_) => item.get("text").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => {
            if let Some(parts) = value.get("parts") {
                flatten_content(parts)
            } else {
                value
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            }
        }
        _ => String::new(),
    }
}

/// Parses a seconds-since-epoch value (possibly fractional).
pub(crate) fn epoch_seconds(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let secs = value?.as_f64()?;
    if !secs.is_finite() {
        return None;
    }
    let millis = (secs * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// Parses an RFC 3339 / naive ISO string, or a number of epoch
/// milliseconds.
pub(crate) fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                        .map(|naive| naive.and_utc())
                        .ok()
                })
        }
        Value::Number(n) => {
            let millis = n.as_f64()?;
            if !millis.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(millis.round() as i64).single()
        }
        _ => None,
    }
}
