//! Date text representations.
//!
//! Dates are ISO-8601 on the wire by default. A field can swap in any
//! other `(parse, serialize)` pair by supplying a [`DateCodec`]; the
//! codec is then used for both decode and encode of that field.
//!
//! # Example
//! ```rust
//! use querystate::{date, PatternCodec};
//!
//! let day = date().codec(PatternCodec::date_only("%d/%m/%Y"));
//! let decoded = day.decode(Some("24/12/2024")).unwrap();
//! assert_eq!(day.encode(&decoded), "24/12/2024");
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use std::fmt;
use std::sync::Arc;

/// A `(parse, serialize)` pair for date text.
pub trait DateCodec: Send + Sync + fmt::Debug {
    /// Parse wire text; `None` means the text is not a date.
    fn parse(&self, raw: &str) -> Option<DateTime<Utc>>;

    /// Render a date as wire text.
    fn format(&self, value: &DateTime<Utc>) -> String;
}

/// ISO-8601 / RFC 3339 codec.
///
/// Accepts full timestamps with an offset, naive timestamps (read as UTC)
/// and bare `YYYY-MM-DD` dates (UTC midnight). Always writes
/// `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso8601;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

impl Iso8601 {
    fn parse_full(text: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
            return Some(parsed.with_timezone(&Utc));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

impl DateCodec for Iso8601 {
    // Sub-millisecond digits are dropped so that parse and format agree.
    fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        Self::parse_full(raw.trim())
            .and_then(|value| DateTime::from_timestamp_millis(value.timestamp_millis()))
    }

    fn format(&self, value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Codec driven by a `chrono` format pattern, e.g. `"%d/%m/%Y"`.
#[derive(Debug, Clone)]
pub struct PatternCodec {
    pattern: String,
    date_only: bool,
}

impl PatternCodec {
    /// A pattern containing both date and time fields.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            date_only: false,
        }
    }

    /// A pattern containing only date fields; parsed values are UTC midnight.
    pub fn date_only(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            date_only: true,
        }
    }
}

impl DateCodec for PatternCodec {
    fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        if self.date_only {
            NaiveDate::parse_from_str(raw.trim(), &self.pattern)
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        } else {
            NaiveDateTime::parse_from_str(raw.trim(), &self.pattern)
                .ok()
                .map(|naive| naive.and_utc())
        }
    }

    fn format(&self, value: &DateTime<Utc>) -> String {
        value.format(&self.pattern).to_string()
    }
}

type ParseFn = dyn Fn(&str) -> Option<DateTime<Utc>> + Send + Sync;
type FormatFn = dyn Fn(&DateTime<Utc>) -> String + Send + Sync;

/// Codec built from a pair of closures.
#[derive(Clone)]
pub struct FnDateCodec {
    parse: Arc<ParseFn>,
    format: Arc<FormatFn>,
}

impl FnDateCodec {
    pub fn new<P, F>(parse: P, format: F) -> Self
    where
        P: Fn(&str) -> Option<DateTime<Utc>> + Send + Sync + 'static,
        F: Fn(&DateTime<Utc>) -> String + Send + Sync + 'static,
    {
        Self {
            parse: Arc::new(parse),
            format: Arc::new(format),
        }
    }
}

impl fmt::Debug for FnDateCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDateCodec").finish_non_exhaustive()
    }
}

impl DateCodec for FnDateCodec {
    fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        (self.parse)(raw)
    }

    fn format(&self, value: &DateTime<Utc>) -> String {
        (self.format)(value)
    }
}
