//! Per-item rules for each base type.
//!
//! A rules value knows how to turn one wire token (or one JSON value) into
//! an item, how to constrain that item, and how to write it back. The
//! shape schemas in [`schema`](crate::schema) are generic over these
//! rules, so array, tuple and set logic is written once for every base
//! type.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

use crate::constraints::{self, Case, Relative, StringFormat};
use crate::date::{DateCodec, Iso8601};
use crate::error::{Rejection, SchemaError, SchemaResult};
use crate::value::{BaseType, Scalar};

/// Item-level behaviour of one base type.
pub trait ItemRules: Clone + fmt::Debug + Send + Sync + 'static {
    /// The decoded item type.
    type Item: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// The base type these rules implement.
    fn base_type(&self) -> BaseType;

    /// Parse one decoded wire token.
    fn parse(&self, token: &str) -> Result<Self::Item, Rejection>;

    /// Coerce one caller-supplied JSON value (never `null`).
    fn coerce(&self, input: &serde_json::Value) -> Result<Self::Item, Rejection>;

    /// Apply every item constraint in its fixed order.
    fn constrain(&self, item: Self::Item, now: DateTime<Utc>) -> Result<Self::Item, Rejection>;

    /// Render an item as a wire token.
    fn format(&self, item: &Self::Item) -> String;

    /// The zero value used to pad tuples.
    fn zero(&self, now: DateTime<Utc>) -> Self::Item;

    /// Check that the constraints are satisfiable.
    fn check(&self) -> SchemaResult<()>;

    fn to_scalar(&self, item: &Self::Item) -> Scalar;

    fn from_scalar(&self, scalar: &Scalar) -> Option<Self::Item>;
}

fn json_kind(input: &serde_json::Value) -> &'static str {
    match input {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// =============================================================================
// String
// =============================================================================

/// Rules for string items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringRules {
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) case: Option<Case>,
    pub(crate) formats: Vec<StringFormat>,
    pub(crate) allowed: Vec<String>,
}

impl StringRules {
    pub fn min_length(&self) -> Option<usize> {
        self.min_length
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    pub fn case(&self) -> Option<Case> {
        self.case
    }

    pub fn formats(&self) -> &[StringFormat] {
        &self.formats
    }

    /// The allowed values; empty when the field is not an enum.
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl ItemRules for StringRules {
    type Item = String;

    fn base_type(&self) -> BaseType {
        BaseType::String
    }

    fn parse(&self, token: &str) -> Result<String, Rejection> {
        Ok(token.to_string())
    }

    fn coerce(&self, input: &serde_json::Value) -> Result<String, Rejection> {
        match input {
            serde_json::Value::String(value) => Ok(value.clone()),
            serde_json::Value::Number(value) => Ok(value.to_string()),
            serde_json::Value::Bool(value) => Ok(value.to_string()),
            other => Err(Rejection::Incompatible {
                base: "string",
                found: json_kind(other),
            }),
        }
    }

    fn constrain(&self, item: String, _now: DateTime<Utc>) -> Result<String, Rejection> {
        let value = constraints::apply_case(item, self.case);
        let value = constraints::check_min_length(value, self.min_length)?;
        let mut value = constraints::truncate(value, self.max_length);
        for format in &self.formats {
            value = constraints::check_format(value, *format)?;
        }
        if self.allowed.is_empty() {
            return Ok(value);
        }
        constraints::check_enum(value, &self.allowed)
    }

    fn format(&self, item: &String) -> String {
        item.clone()
    }

    fn zero(&self, _now: DateTime<Utc>) -> String {
        String::new()
    }

    fn check(&self) -> SchemaResult<()> {
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) if min > max => Err(SchemaError::bounds("length", min, max)),
            _ => Ok(()),
        }
    }

    fn to_scalar(&self, item: &String) -> Scalar {
        Scalar::String(item.clone())
    }

    fn from_scalar(&self, scalar: &Scalar) -> Option<String> {
        scalar.as_str().map(str::to_string)
    }
}

// =============================================================================
// Number
// =============================================================================

/// Rules for number items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRules {
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
}

impl NumberRules {
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

impl ItemRules for NumberRules {
    type Item = f64;

    fn base_type(&self) -> BaseType {
        BaseType::Number
    }

    fn parse(&self, token: &str) -> Result<f64, Rejection> {
        constraints::parse_number(token).ok_or_else(|| Rejection::Unparseable {
            base: "number",
            raw: token.to_string(),
        })
    }

    fn coerce(&self, input: &serde_json::Value) -> Result<f64, Rejection> {
        match input {
            serde_json::Value::Number(value) => value.as_f64().ok_or(Rejection::Unparseable {
                base: "number",
                raw: value.to_string(),
            }),
            serde_json::Value::String(value) => self.parse(value),
            other => Err(Rejection::Incompatible {
                base: "number",
                found: json_kind(other),
            }),
        }
    }

    fn constrain(&self, item: f64, _now: DateTime<Utc>) -> Result<f64, Rejection> {
        if !item.is_finite() {
            return Err(Rejection::Unparseable {
                base: "number",
                raw: item.to_string(),
            });
        }
        Ok(constraints::clamp(item, self.min, self.max))
    }

    fn format(&self, item: &f64) -> String {
        constraints::format_number(*item)
    }

    fn zero(&self, _now: DateTime<Utc>) -> f64 {
        0.0
    }

    fn check(&self) -> SchemaResult<()> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(SchemaError::bounds("number", min, max)),
            _ => Ok(()),
        }
    }

    fn to_scalar(&self, item: &f64) -> Scalar {
        Scalar::Number(*item)
    }

    fn from_scalar(&self, scalar: &Scalar) -> Option<f64> {
        scalar.as_f64()
    }
}

// =============================================================================
// Boolean
// =============================================================================

/// Rules for boolean items. Booleans carry no constraints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BooleanRules;

impl ItemRules for BooleanRules {
    type Item = bool;

    fn base_type(&self) -> BaseType {
        BaseType::Boolean
    }

    fn parse(&self, token: &str) -> Result<bool, Rejection> {
        Ok(constraints::parse_bool(token))
    }

    fn coerce(&self, input: &serde_json::Value) -> Result<bool, Rejection> {
        Ok(match input {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(value) => *value,
            serde_json::Value::String(value) => constraints::parse_bool(value),
            serde_json::Value::Number(value) => value.as_f64().is_some_and(|n| n != 0.0),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
        })
    }

    fn constrain(&self, item: bool, _now: DateTime<Utc>) -> Result<bool, Rejection> {
        Ok(item)
    }

    fn format(&self, item: &bool) -> String {
        item.to_string()
    }

    fn zero(&self, _now: DateTime<Utc>) -> bool {
        false
    }

    fn check(&self) -> SchemaResult<()> {
        Ok(())
    }

    fn to_scalar(&self, item: &bool) -> Scalar {
        Scalar::Boolean(*item)
    }

    fn from_scalar(&self, scalar: &Scalar) -> Option<bool> {
        scalar.as_bool()
    }
}

// =============================================================================
// Date
// =============================================================================

/// Rules for date items.
#[derive(Debug, Clone)]
pub struct DateRules {
    pub(crate) min: Option<DateTime<Utc>>,
    pub(crate) max: Option<DateTime<Utc>>,
    pub(crate) relative: Option<Relative>,
    pub(crate) codec: Arc<dyn DateCodec>,
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            relative: None,
            codec: Arc::new(Iso8601),
        }
    }
}

impl DateRules {
    pub fn min(&self) -> Option<DateTime<Utc>> {
        self.min
    }

    pub fn max(&self) -> Option<DateTime<Utc>> {
        self.max
    }

    pub fn relative(&self) -> Option<Relative> {
        self.relative
    }

    pub fn codec(&self) -> &dyn DateCodec {
        self.codec.as_ref()
    }
}

impl ItemRules for DateRules {
    type Item = DateTime<Utc>;

    fn base_type(&self) -> BaseType {
        BaseType::Date
    }

    fn parse(&self, token: &str) -> Result<DateTime<Utc>, Rejection> {
        self.codec.parse(token).ok_or_else(|| Rejection::Unparseable {
            base: "date",
            raw: token.to_string(),
        })
    }

    fn coerce(&self, input: &serde_json::Value) -> Result<DateTime<Utc>, Rejection> {
        match input {
            // RFC 3339 is what `Value::to_json` emits, whatever the wire codec
            serde_json::Value::String(value) => self.parse(value).or_else(|rejection| {
                DateTime::parse_from_rfc3339(value.trim())
                    .map(|parsed| parsed.with_timezone(&Utc))
                    .map_err(|_| rejection)
            }),
            // epoch milliseconds
            serde_json::Value::Number(value) => value
                .as_i64()
                .or_else(|| value.as_f64().filter(|n| n.is_finite()).map(|n| n as i64))
                .and_then(DateTime::from_timestamp_millis)
                .ok_or_else(|| Rejection::Unparseable {
                    base: "date",
                    raw: value.to_string(),
                }),
            other => Err(Rejection::Incompatible {
                base: "date",
                found: json_kind(other),
            }),
        }
    }

    fn constrain(
        &self,
        item: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, Rejection> {
        let value = constraints::check_date_bounds(item, self.min, self.max)?;
        constraints::check_relative(value, self.relative, now)
    }

    fn format(&self, item: &DateTime<Utc>) -> String {
        self.codec.format(item)
    }

    fn zero(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now
    }

    fn check(&self) -> SchemaResult<()> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(SchemaError::bounds(
                "date",
                min.to_rfc3339(),
                max.to_rfc3339(),
            )),
            _ => Ok(()),
        }
    }

    fn to_scalar(&self, item: &DateTime<Utc>) -> Scalar {
        Scalar::Date(*item)
    }

    fn from_scalar(&self, scalar: &Scalar) -> Option<DateTime<Utc>> {
        scalar.as_date()
    }
}
