//! Lenient coercion of raw tabular fields into typed values.
//!
//! Ledger and campaign files are hand-edited spreadsheets exported to CSV, so
//! every cell arrives as text. Dates and numbers are parsed here; callers
//! decide whether a failure excludes the record or falls back to a default.
//!
//! # Accepted dates
//!
//! - ISO date: `2024-01-05`
//! - ISO date-time, space or `T` separated, optional fraction: `2024-01-05 10:30:00`
//! - RFC 3339 with offset: `2024-01-05T10:30:00-03:00`
//! - Day-first regional form: `05/01/2024`
//!
//! Time of day is discarded.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A raw field that could not be coerced into the type its column requires.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` is not a date: {value:?}")]
    Date { field: &'static str, value: String },

    #[error("field `{field}` is not a number: {value:?}")]
    Number { field: &'static str, value: String },

    #[error("field `{field}` is not a non-negative count: {value:?}")]
    Count { field: &'static str, value: String },
}

/// Parse a calendar date, ignoring any time-of-day component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y").ok()
}

/// Parse a finite decimal number.
///
/// A decimal comma is accepted when the value has no dot (`"12,5"` → 12.5).
/// `NaN` and infinities are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = match s.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) if s.contains(',') && !s.contains('.') => s.replace(',', ".").parse::<f64>().ok(),
        Err(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a non-negative count. Integral floats such as `"20.0"` are accepted,
/// fractional values truncate toward zero.
pub fn parse_count(raw: &str) -> Option<usize> {
    parse_number(raw)
        .filter(|v| *v >= 0.0)
        .map(|v| v.trunc() as usize)
}

/// Require a date field.
pub fn date_field(field: &'static str, raw: Option<&str>) -> Result<NaiveDate, FieldError> {
    let raw = present(field, raw)?;
    parse_date(raw).ok_or_else(|| FieldError::Date {
        field,
        value: raw.to_string(),
    })
}

/// Require a numeric field.
pub fn number_field(field: &'static str, raw: Option<&str>) -> Result<f64, FieldError> {
    let raw = present(field, raw)?;
    parse_number(raw).ok_or_else(|| FieldError::Number {
        field,
        value: raw.to_string(),
    })
}

/// Require a count field.
pub fn count_field(field: &'static str, raw: Option<&str>) -> Result<usize, FieldError> {
    let raw = present(field, raw)?;
    parse_count(raw).ok_or_else(|| FieldError::Count {
        field,
        value: raw.to_string(),
    })
}

fn present<'a>(field: &'static str, raw: Option<&'a str>) -> Result<&'a str, FieldError> {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(FieldError::Missing(field)),
    }
}
