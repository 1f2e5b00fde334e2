//! SQLite helper utilities for type conversion
//!
//! SQLite has no native UUID, array, or date types. Ids, list columns and
//! timestamps are stored as TEXT; the helpers here convert them at the
//! repository boundary.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

// ============================================================================
// UUID Helpers
// ============================================================================

/// Convert a UUID to a SQLite-compatible string
#[inline]
pub fn uuid_to_str(id: Uuid) -> String {
    id.to_string()
}

/// Parse a SQLite string back to a UUID
#[inline]
pub fn str_to_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| anyhow!("Invalid UUID '{}': {}", s, e))
}

// ============================================================================
// Array/Vec Helpers (stored as JSON strings in SQLite)
// ============================================================================

/// Serialize a Vec to a JSON string for SQLite storage
#[inline]
pub fn vec_to_json<T: Serialize>(v: &[T]) -> String {
    serde_json::to_string(v).unwrap_or_else(|_| "[]".to_string())
}

/// Deserialize a JSON string from SQLite to a Vec (empty on invalid input)
#[inline]
pub fn json_to_vec<T: DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

// ============================================================================
// Timestamp Helpers (stored as ISO8601 TEXT in SQLite)
// ============================================================================

/// Get current UTC timestamp as ISO8601 string for SQLite
#[inline]
pub fn now_iso8601() -> String {
    datetime_to_str(Utc::now())
}

/// Convert a chrono DateTime to ISO8601 string
#[inline]
pub fn datetime_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Parse an ISO8601 string to DateTime
pub fn str_to_datetime(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's datetime() format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
                .map_err(|e| anyhow!("Invalid datetime '{}': {}", s, e))
        })
}

/// Parse an optional datetime string
pub fn str_to_datetime_opt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(str_to_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Convert a calendar date to `YYYY-MM-DD`
#[inline]
pub fn date_to_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse an optional `YYYY-MM-DD` column
pub fn str_to_date_opt(s: Option<&str>) -> Result<Option<NaiveDate>> {
    match s {
        Some(s) if !s.is_empty() => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| anyhow!("Invalid date '{}': {}", s, e)),
        _ => Ok(None),
    }
}

// ============================================================================
// Boolean Helpers (SQLite uses 0/1 integers)
// ============================================================================

/// Convert bool to SQLite integer (0 or 1)
#[inline]
pub fn bool_to_int(b: bool) -> i32 {
    if b { 1 } else { 0 }
}

/// Convert SQLite integer to bool
#[inline]
pub fn int_to_bool(i: i32) -> bool {
    i != 0
}

/// Wrap a conversion error so it can be returned from `FromRow`
pub fn decode_err(e: anyhow::Error) -> sqlx::Error {
    sqlx::Error::Decode(e.into())
}

// ============================================================================
// Query Building Helpers
// ============================================================================

/// SQL fragment matching rows whose JSON array column contains a value,
/// compared case-insensitively. Binds one parameter.
pub fn json_array_contains_sql(column: &str) -> String {
    format!(
        "EXISTS (SELECT 1 FROM json_each({}) WHERE LOWER(value) = LOWER(?))",
        column
    )
}

/// Build a `LIKE` pattern matching `needle` anywhere, escaping wildcards.
/// Use with `ESCAPE '\'`.
pub fn contains_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(&needle.to_lowercase()))
}

/// Build a `LIKE` pattern matching values starting with `needle`.
pub fn prefix_pattern(needle: &str) -> String {
    format!("{}%", escape_like(&needle.to_lowercase()))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_empty_vec() {
        let v: Vec<String> = vec![];
        assert_eq!(vec_to_json(&v), "[]");
        let parsed: Vec<String> = json_to_vec("not json");
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_sqlite_datetime_format() {
        let parsed = str_to_datetime("2024-01-15 10:30:45").unwrap();
        assert_eq!(parsed.year(), 2024);
        assert_eq!(parsed.month(), 1);
        assert_eq!(parsed.day(), 15);
    }

    #[test]
    fn test_stored_timestamps_sort_lexically() {
        let earlier = datetime_to_str(Utc::now());
        let later = datetime_to_str(Utc::now() + chrono::Duration::milliseconds(5));
        assert!(earlier < later);
    }

    #[test]
    fn test_date_parsing() {
        let date = str_to_date_opt(Some("2008-01-20")).unwrap().unwrap();
        assert_eq!(date_to_str(date), "2008-01-20");
        assert_eq!(str_to_date_opt(Some("")).unwrap(), None);
        assert!(str_to_date_opt(Some("20/01/2008")).is_err());
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(bool_to_int(true), 1);
        assert_eq!(bool_to_int(false), 0);
        assert!(int_to_bool(42));
        assert!(!int_to_bool(0));
    }

    #[test]
    fn test_like_patterns_escape_wildcards() {
        assert_eq!(contains_pattern("Breaking"), "%breaking%");
        assert_eq!(contains_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(prefix_pattern("The"), "the%");
    }

    #[test]
    fn test_json_array_contains_sql() {
        assert_eq!(
            json_array_contains_sql("genres"),
            "EXISTS (SELECT 1 FROM json_each(genres) WHERE LOWER(value) = LOWER(?))"
        );
    }
}
