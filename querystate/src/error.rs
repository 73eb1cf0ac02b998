//! Error types for schema construction and form assembly.
//!
//! Only construction can fail. Decoding, validating and encoding never
//! return an error: a value that does not satisfy its schema degrades to
//! the field's default (or the shape's empty/zero value). The
//! [`Rejection`] type describes *why* a value was discarded and is used
//! for structured logging only.
//!
//! # Example
//! ```rust
//! use querystate::{number, string, SchemaError};
//!
//! assert!(matches!(
//!     string().tuple(0),
//!     Err(SchemaError::InvalidTupleSize { size: 0 })
//! ));
//! assert!(number().min(0.0).max(10.0).default(42.0).is_err());
//! ```

use thiserror::Error;

/// Result type alias for schema construction.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Fatal configuration error raised while a schema is being built.
///
/// These are programming errors in the field mapping: the form is unusable
/// until the offending schema is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// `tuple(n)` was called with `n == 0`.
    #[error("tuple size must be a positive integer (got: {size})")]
    InvalidTupleSize { size: usize },

    /// The default value does not satisfy the schema's own constraints.
    #[error("default value {value} violates its schema: {reason}")]
    InvalidDefault { value: String, reason: String },

    /// A tuple default does not have exactly `expected` items.
    #[error("default value must be a tuple of exactly {expected} items (got: {actual})")]
    DefaultArity { expected: usize, actual: usize },

    /// A lower bound is greater than its upper bound.
    #[error("invalid {constraint} bounds: minimum {min} is greater than maximum {max}")]
    InvalidBounds {
        constraint: &'static str,
        min: String,
        max: String,
    },
}

impl SchemaError {
    pub(crate) fn invalid_default(value: impl std::fmt::Debug, reason: impl ToString) -> Self {
        Self::InvalidDefault {
            value: format!("{:?}", value),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn bounds(
        constraint: &'static str,
        min: impl ToString,
        max: impl ToString,
    ) -> Self {
        Self::InvalidBounds {
            constraint,
            min: min.to_string(),
            max: max.to_string(),
        }
    }
}

/// Error assembling a [`Form`](crate::Form) or addressing one of its fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    /// The key is not declared in the form.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// The same key was declared twice.
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    /// A field's schema failed its construction-time checks.
    #[error("field '{field}': {source}")]
    Schema {
        field: String,
        #[source]
        source: SchemaError,
    },
}

/// Error loading a [`FormManifest`](crate::FormManifest).
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid TOML or does not match the manifest layout.
    #[error("invalid manifest: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field table is inconsistent (wrong constraint for its type, mistyped default, ...).
    #[error("field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// The builder rejected the field's schema.
    #[error("field '{field}': {source}")]
    Schema {
        field: String,
        #[source]
        source: SchemaError,
    },

    /// The assembled form is invalid.
    #[error(transparent)]
    Form(#[from] FormError),
}

impl ManifestError {
    pub(crate) fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn schema(field: impl Into<String>) -> impl FnOnce(SchemaError) -> Self {
        let field = field.into();
        move |source| Self::Schema { field, source }
    }
}

/// Why a constraint primitive discarded a value.
///
/// Never returned to callers of decode/validate; it only appears in logs
/// and in the return type of the primitives in [`constraints`](crate::constraints).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    /// The raw text could not be parsed as the field's base type.
    #[error("unparseable {base} value '{raw}'")]
    Unparseable { base: &'static str, raw: String },

    /// The caller-supplied value has a JSON type that cannot be coerced.
    #[error("cannot coerce {found} into {base}")]
    Incompatible {
        base: &'static str,
        found: &'static str,
    },

    /// String shorter than `minLength`.
    #[error("length {length} is below the minimum of {min}")]
    TooShort { length: usize, min: usize },

    /// String failed a format check.
    #[error("value does not match the {format} format")]
    Format { format: &'static str },

    /// String is not one of the allowed values.
    #[error("value is not one of the allowed values")]
    NotInEnum,

    /// Date earlier than `min`.
    #[error("date is before the minimum {min}")]
    BeforeMin { min: String },

    /// Date later than `max`.
    #[error("date is after the maximum {max}")]
    AfterMax { max: String },

    /// Date is not strictly after the evaluation instant.
    #[error("date is not in the future")]
    NotFuture,

    /// Date is not strictly before the evaluation instant.
    #[error("date is not in the past")]
    NotPast,

    /// Collection has fewer items than `minCount`.
    #[error("{count} items is below the minimum of {min}")]
    TooFewItems { count: usize, min: usize },
}
