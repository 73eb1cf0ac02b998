//! Constraint primitives.
//!
//! Each function implements exactly one constraint and is independent of
//! any schema. The policies are fixed per base type:
//!
//! | Constraint | Policy |
//! |------------|--------|
//! | numeric `min` / `max` | clamp to the nearest bound |
//! | string `minLength` | reject |
//! | string `maxLength` | truncate |
//! | email / url / uuid / enum | reject |
//! | lowercase / uppercase | transform (before any check) |
//! | date `min` / `max` / future / past | reject |
//! | item count below `minCount` | reject the collection |
//! | item count above `maxCount` | truncate the collection |
//!
//! Set deduplication ([`dedup`]) runs before the count bounds.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Rejection;

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));
static RE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid regex")
});
static RE_NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").expect("number regex")
});

/// Case transform applied to strings before any length or format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    Lower,
    Upper,
}

/// String format checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    /// `local@domain.tld` with no whitespace.
    Email,
    /// Absolute URL as accepted by the WHATWG URL parser.
    Url,
    /// Hyphenated UUID of any version, case-insensitive.
    Uuid,
}

impl StringFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Uuid => "uuid",
        }
    }

    /// Returns true if `value` matches this format.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Email => RE_EMAIL.is_match(value),
            Self::Url => url::Url::parse(value).is_ok(),
            Self::Uuid => RE_UUID.is_match(value),
        }
    }
}

/// Relative date constraint, evaluated against the current instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relative {
    /// Strictly after now.
    Future,
    /// Strictly before now.
    Past,
}

// =============================================================================
// Numbers
// =============================================================================

/// Clamp `value` into `[min, max]`. Never rejects.
pub fn clamp(value: f64, min: Option<f64>, max: Option<f64>) -> f64 {
    let mut clamped = value;
    if let Some(min) = min {
        if clamped < min {
            clamped = min;
        }
    }
    if let Some(max) = max {
        if clamped > max {
            clamped = max;
        }
    }
    if clamped != value {
        trace!(value = %value, clamped = %clamped, "Clamped number to bound");
    }
    clamped
}

/// Parse the longest decimal prefix of `raw`, ignoring leading whitespace.
///
/// `"12.5px"` parses as `12.5`. Returns `None` when no digits lead the
/// text or the result is not finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let prefix = RE_NUMBER_PREFIX.find(text)?.as_str();
    prefix.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number the way it is written to the query string.
pub fn format_number(value: f64) -> String {
    // -0 and 0 share one wire form
    if value == 0.0 {
        return "0".to_string();
    }
    value.to_string()
}

// =============================================================================
// Booleans
// =============================================================================

/// `"true"`, `"1"` and `"yes"` (case-insensitive) are true; everything else is false.
pub fn parse_bool(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    matches!(lower.as_str(), "true" | "1" | "yes")
}

// =============================================================================
// Strings
// =============================================================================

/// Apply the case transform, if any.
pub fn apply_case(value: String, case: Option<Case>) -> String {
    match case {
        Some(Case::Lower) => value.to_lowercase(),
        Some(Case::Upper) => value.to_uppercase(),
        None => value,
    }
}

/// Reject strings with fewer than `min` characters.
pub fn check_min_length(value: String, min: Option<usize>) -> Result<String, Rejection> {
    match min {
        Some(min) => {
            let length = value.chars().count();
            if length < min {
                Err(Rejection::TooShort { length, min })
            } else {
                Ok(value)
            }
        }
        None => Ok(value),
    }
}

/// Truncate strings longer than `max` characters. Never rejects.
pub fn truncate(value: String, max: Option<usize>) -> String {
    match max {
        Some(max) => match value.char_indices().nth(max) {
            Some((cut, _)) => {
                trace!(max = max, "Truncated string to maximum length");
                value[..cut].to_string()
            }
            None => value,
        },
        None => value,
    }
}

/// Reject strings that fail `format`.
pub fn check_format(value: String, format: StringFormat) -> Result<String, Rejection> {
    if format.matches(&value) {
        Ok(value)
    } else {
        Err(Rejection::Format {
            format: format.as_str(),
        })
    }
}

/// Reject strings that are not members of `allowed`.
pub fn check_enum(value: String, allowed: &[String]) -> Result<String, Rejection> {
    if allowed.iter().any(|candidate| candidate == &value) {
        Ok(value)
    } else {
        Err(Rejection::NotInEnum)
    }
}

// =============================================================================
// Dates
// =============================================================================

/// Reject dates outside `[min, max]`.
pub fn check_date_bounds(
    value: DateTime<Utc>,
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>, Rejection> {
    if let Some(min) = min {
        if value < min {
            return Err(Rejection::BeforeMin {
                min: min.to_rfc3339(),
            });
        }
    }
    if let Some(max) = max {
        if value > max {
            return Err(Rejection::AfterMax {
                max: max.to_rfc3339(),
            });
        }
    }
    Ok(value)
}

/// Reject dates that are not strictly after (future) or before (past) `now`.
pub fn check_relative(
    value: DateTime<Utc>,
    relative: Option<Relative>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, Rejection> {
    match relative {
        Some(Relative::Future) if value <= now => Err(Rejection::NotFuture),
        Some(Relative::Past) if value >= now => Err(Rejection::NotPast),
        _ => Ok(value),
    }
}

// =============================================================================
// Collections
// =============================================================================

/// Remove duplicates, keeping the first occurrence of each item.
pub fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

/// Reject collections below `min` items; truncate collections above `max`.
pub fn apply_count<T>(
    mut items: Vec<T>,
    min: Option<usize>,
    max: Option<usize>,
) -> Result<Vec<T>, Rejection> {
    if let Some(min) = min {
        if items.len() < min {
            return Err(Rejection::TooFewItems {
                count: items.len(),
                min,
            });
        }
    }
    if let Some(max) = max {
        if items.len() > max {
            trace!(count = items.len(), max = max, "Truncated collection to maximum count");
            items.truncate(max);
        }
    }
    Ok(items)
}

/// Force `items` to exactly `size` entries, padding with `zero()` or truncating.
pub fn fit_to_size<T>(mut items: Vec<T>, size: usize, mut zero: impl FnMut() -> T) -> Vec<T> {
    items.truncate(size);
    while items.len() < size {
        items.push(zero());
    }
    items
}
