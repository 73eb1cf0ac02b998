//! Type-erased field values.
//!
//! Typed schemas hand out `String`, `f64`, `bool` and `DateTime<Utc>`
//! directly. When fields of different types are handled together (a
//! whole [`Form`](crate::Form), the CLI, JSON output) values travel as a
//! [`Value`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    String,
    Number,
    Boolean,
    Date,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// A single value; may be missing.
    Scalar,
    /// A variable-length list.
    Array,
    /// A list of exactly `n` items; never missing.
    Tuple(usize),
    /// A list without duplicates.
    Set,
}

impl Shape {
    /// Returns true for every shape that holds a list of items.
    pub fn is_collection(&self) -> bool {
        !matches!(self, Self::Scalar)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => f.write_str("scalar"),
            Self::Array => f.write_str("array"),
            Self::Tuple(size) => write!(f, "tuple({})", size),
            Self::Set => f.write_str("set"),
        }
    }
}

/// One item of a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
}

impl Scalar {
    pub fn base_type(&self) -> BaseType {
        match self {
            Self::String(_) => BaseType::String,
            Self::Number(_) => BaseType::Number,
            Self::Boolean(_) => BaseType::Boolean,
            Self::Date(_) => BaseType::Date,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Date(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

/// The decoded or validated value of one field.
///
/// Serializes to JSON as `null`, a scalar, or an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// A scalar field with no value and no default.
    Missing,
    /// A scalar field's value.
    Single(Scalar),
    /// The items of an array, tuple or set field.
    List(Vec<Scalar>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_single(&self) -> Option<&Scalar> {
        match self {
            Self::Single(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Scalar]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Build a list value from anything convertible into scalars.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Scalar>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// The JSON form of this value, with dates as RFC 3339 strings.
    ///
    /// Every field accepts it back through `validate`, including date fields
    /// with a custom wire codec.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Single(value.into()),
            None => Self::Missing,
        }
    }
}
