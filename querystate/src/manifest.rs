//! Declarative form manifests.
//!
//! A manifest describes a form in TOML: an optional `[config]` table and
//! one `[fields.<key>]` table per field, in query-string order. Building
//! a manifest goes through the same builders (and the same default
//! checks) as a form written in code.
//!
//! ```toml
//! [config]
//! collection_format = "repeated"
//!
//! [fields.tags]
//! type = "string"
//! shape = "array"
//! min_length = 2
//! max_length = 10
//! min_items = 1
//! max_items = 3
//! default = ["react", "typescript"]
//!
//! [fields.range]
//! type = "date"
//! shape = "tuple"
//! size = 2
//! min = "2024-01-01"
//! default = ["2024-06-01", "2024-06-30"]
//! ```
//!
//! Dates in a manifest are quoted strings in the field's wire format.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::codec::Schema;
use crate::config::QueryStateConfig;
use crate::constraints::{Case, Relative, StringFormat};
use crate::date::PatternCodec;
use crate::error::ManifestError;
use crate::form::Form;
use crate::rules::{DateRules, ItemRules};
use crate::schema::{self, ArraySchema, ScalarSchema, SetSchema, TupleSchema};
use crate::value::BaseType;

/// Shape name as written in a manifest; tuples carry their size separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Scalar,
    Array,
    Tuple,
    Set,
}

/// A numeric or date bound.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Text(String),
}

/// One `[fields.<key>]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldManifest {
    #[serde(rename = "type")]
    pub base: Option<BaseType>,
    #[serde(default)]
    pub shape: ShapeKind,
    pub size: Option<usize>,

    // strings
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub case: Option<Case>,
    #[serde(default)]
    pub formats: Vec<StringFormat>,
    pub one_of: Option<Vec<String>>,

    // numbers and dates
    pub min: Option<Bound>,
    pub max: Option<Bound>,
    pub relative: Option<Relative>,
    /// `chrono` pattern for date-only wire text, e.g. `"%d/%m/%Y"`.
    pub date_format: Option<String>,
    /// `chrono` pattern for wire text with a time part.
    pub datetime_format: Option<String>,

    // collections
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,

    pub default: Option<serde_json::Value>,
}

/// A parsed manifest.
#[derive(Debug, Clone, Default)]
pub struct FormManifest {
    pub config: QueryStateConfig,
    pub fields: Vec<(String, FieldManifest)>,
}

impl FormManifest {
    /// Parse manifest TOML, keeping fields in document order.
    pub fn from_toml_str(source: &str) -> Result<Self, ManifestError> {
        let mut table: toml::Table = source.parse()?;
        let config = match table.remove("config") {
            Some(value) => value.try_into()?,
            None => QueryStateConfig::default(),
        };
        let mut fields = Vec::new();
        if let Some(value) = table.remove("fields") {
            let toml::Value::Table(entries) = value else {
                return Err(ManifestError::invalid_field("fields", "expected a table of fields"));
            };
            for (key, value) in entries {
                let field: FieldManifest = value.try_into()?;
                fields.push((key, field));
            }
        }
        if let Some(key) = table.keys().next() {
            return Err(ManifestError::invalid_field(
                key.as_str(),
                "unknown top-level table",
            ));
        }
        Ok(Self { config, fields })
    }

    /// Build the form, checking every schema and default.
    pub fn build(&self) -> Result<Form, ManifestError> {
        self.build_at(Utc::now())
    }

    pub fn build_at(&self, now: DateTime<Utc>) -> Result<Form, ManifestError> {
        let mut builder = Form::builder().config(self.config.clone());
        for (key, field) in &self.fields {
            builder = builder.field(key.as_str(), field.schema(key)?);
        }
        Ok(builder.build_at(now)?)
    }
}

impl FieldManifest {
    /// Drive the builder for this field.
    pub fn schema(&self, key: &str) -> Result<Schema, ManifestError> {
        let base = self
            .base
            .ok_or_else(|| ManifestError::invalid_field(key, "missing `type`"))?;
        self.check_applicable(key, base)?;
        match base {
            BaseType::String => {
                let mut scalar = schema::string();
                if let Some(min) = self.min_length {
                    scalar = scalar.min(min);
                }
                if let Some(max) = self.max_length {
                    scalar = scalar.max(max);
                }
                match self.case {
                    Some(Case::Lower) => scalar = scalar.lowercase(),
                    Some(Case::Upper) => scalar = scalar.uppercase(),
                    None => {}
                }
                for format in &self.formats {
                    scalar = scalar.format(*format);
                }
                if let Some(allowed) = &self.one_of {
                    scalar = scalar.one_of(allowed.iter().cloned());
                }
                self.shaped(key, scalar, |value| value.as_str().map(str::to_string))
            }
            BaseType::Number => {
                let mut scalar = schema::number();
                if let Some(min) = self.number_bound(key, "min", &self.min)? {
                    scalar = scalar.min(min);
                }
                if let Some(max) = self.number_bound(key, "max", &self.max)? {
                    scalar = scalar.max(max);
                }
                self.shaped(key, scalar, serde_json::Value::as_f64)
            }
            BaseType::Boolean => self.shaped(key, schema::boolean(), serde_json::Value::as_bool),
            BaseType::Date => {
                let mut scalar = schema::date();
                match (&self.date_format, &self.datetime_format) {
                    (Some(_), Some(_)) => {
                        return Err(ManifestError::invalid_field(
                            key,
                            "`date_format` and `datetime_format` are exclusive",
                        ))
                    }
                    (Some(pattern), None) => {
                        scalar = scalar.codec(PatternCodec::date_only(pattern.as_str()))
                    }
                    (None, Some(pattern)) => {
                        scalar = scalar.codec(PatternCodec::new(pattern.as_str()))
                    }
                    (None, None) => {}
                }
                let rules = scalar.rules().clone();
                if let Some(min) = self.date_bound(key, "min", &self.min, &rules)? {
                    scalar = scalar.min(min);
                }
                if let Some(max) = self.date_bound(key, "max", &self.max, &rules)? {
                    scalar = scalar.max(max);
                }
                match self.relative {
                    Some(Relative::Future) => scalar = scalar.future(),
                    Some(Relative::Past) => scalar = scalar.past(),
                    None => {}
                }
                self.shaped(key, scalar, move |value| {
                    value.as_str().and_then(|text| rules.parse(text).ok())
                })
            }
        }
    }

    fn check_applicable(&self, key: &str, base: BaseType) -> Result<(), ManifestError> {
        let string_only = self.min_length.is_some()
            || self.max_length.is_some()
            || self.case.is_some()
            || !self.formats.is_empty()
            || self.one_of.is_some();
        if string_only && base != BaseType::String {
            return Err(ManifestError::invalid_field(
                key,
                format!("string constraints do not apply to {} fields", base),
            ));
        }
        let bounded = self.min.is_some() || self.max.is_some();
        if bounded && !matches!(base, BaseType::Number | BaseType::Date) {
            return Err(ManifestError::invalid_field(
                key,
                format!(
                    "`min`/`max` do not apply to {} fields (use `min_length`/`max_length` for strings)",
                    base
                ),
            ));
        }
        let dated = self.relative.is_some()
            || self.date_format.is_some()
            || self.datetime_format.is_some();
        if dated && base != BaseType::Date {
            return Err(ManifestError::invalid_field(
                key,
                format!("date constraints do not apply to {} fields", base),
            ));
        }
        let counted = self.min_items.is_some() || self.max_items.is_some();
        if counted && !matches!(self.shape, ShapeKind::Array | ShapeKind::Set) {
            return Err(ManifestError::invalid_field(
                key,
                "`min_items`/`max_items` apply to array and set fields only",
            ));
        }
        if self.size.is_some() && self.shape != ShapeKind::Tuple {
            return Err(ManifestError::invalid_field(key, "`size` applies to tuple fields only"));
        }
        Ok(())
    }

    fn number_bound(
        &self,
        key: &str,
        name: &str,
        bound: &Option<Bound>,
    ) -> Result<Option<f64>, ManifestError> {
        match bound {
            None => Ok(None),
            Some(Bound::Number(value)) => Ok(Some(*value)),
            Some(Bound::Text(_)) => Err(ManifestError::invalid_field(
                key,
                format!("`{}` must be a number", name),
            )),
        }
    }

    fn date_bound(
        &self,
        key: &str,
        name: &str,
        bound: &Option<Bound>,
        rules: &DateRules,
    ) -> Result<Option<DateTime<Utc>>, ManifestError> {
        match bound {
            None => Ok(None),
            Some(Bound::Text(text)) => rules.parse(text).map(Some).map_err(|_| {
                let reason = format!("`{}` is not a valid date: {}", name, text);
                ManifestError::invalid_field(key, reason)
            }),
            Some(Bound::Number(_)) => Err(ManifestError::invalid_field(
                key,
                format!("`{}` must be a quoted date", name),
            )),
        }
    }

    /// Apply the shape, count bounds and default.
    fn shaped<R, F>(
        &self,
        key: &str,
        scalar: ScalarSchema<R>,
        item: F,
    ) -> Result<Schema, ManifestError>
    where
        R: ItemRules,
        F: Fn(&serde_json::Value) -> Option<R::Item>,
        Schema: From<ScalarSchema<R>>
            + From<ArraySchema<R>>
            + From<TupleSchema<R>>
            + From<SetSchema<R>>,
    {
        let base = scalar.rules().base_type();
        let convert = |value: &serde_json::Value| {
            item(value).ok_or_else(|| {
                ManifestError::invalid_field(
                    key,
                    format!("default {} is not a valid {} item", value, base),
                )
            })
        };
        let items = |value: &serde_json::Value| -> Result<Vec<R::Item>, ManifestError> {
            match value {
                serde_json::Value::Array(values) => values.iter().map(convert).collect(),
                _ => Err(ManifestError::invalid_field(
                    key,
                    "default must be an array for collection fields",
                )),
            }
        };

        match self.shape {
            ShapeKind::Scalar => match &self.default {
                Some(value) => Ok(scalar
                    .default(convert(value)?)
                    .map_err(ManifestError::schema(key))?
                    .into()),
                None => Ok(scalar.into()),
            },
            ShapeKind::Array => {
                let mut array = scalar.array();
                if let Some(min) = self.min_items {
                    array = array.min(min);
                }
                if let Some(max) = self.max_items {
                    array = array.max(max);
                }
                match &self.default {
                    Some(value) => Ok(array
                        .default(items(value)?)
                        .map_err(ManifestError::schema(key))?
                        .into()),
                    None => Ok(array.into()),
                }
            }
            ShapeKind::Set => {
                let mut set = scalar.set();
                if let Some(min) = self.min_items {
                    set = set.min(min);
                }
                if let Some(max) = self.max_items {
                    set = set.max(max);
                }
                match &self.default {
                    Some(value) => Ok(set
                        .default(items(value)?)
                        .map_err(ManifestError::schema(key))?
                        .into()),
                    None => Ok(set.into()),
                }
            }
            ShapeKind::Tuple => {
                let size = self.size.ok_or_else(|| {
                    ManifestError::invalid_field(key, "tuple fields need a `size`")
                })?;
                let tuple = scalar.tuple(size).map_err(ManifestError::schema(key))?;
                match &self.default {
                    Some(value) => Ok(tuple
                        .default(items(value)?)
                        .map_err(ManifestError::schema(key))?
                        .into()),
                    None => Ok(tuple.into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;
    use crate::value::{Shape, Value};
    use crate::QuerySnapshot;
    use chrono::TimeZone;

    const MANIFEST: &str = r#"
[config]
collection_format = "repeated"

[fields.tags]
type = "string"
shape = "array"
min_length = 2
max_length = 10
min_items = 1
max_items = 3
default = ["react", "typescript"]

[fields.range]
type = "date"
shape = "tuple"
size = 2
min = "2024-01-01"
default = ["2024-06-01", "2024-06-30"]

[fields.page]
type = "number"
min = 1
default = 1
"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_fields_keep_document_order() {
        let manifest = FormManifest::from_toml_str(MANIFEST).unwrap();
        let keys: Vec<&str> = manifest.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["tags", "range", "page"]);
    }

    #[test]
    fn test_build_form() {
        let form = FormManifest::from_toml_str(MANIFEST)
            .unwrap()
            .build_at(now())
            .unwrap();
        let range = form.field("range").unwrap();
        assert_eq!(range.schema().shape(), Shape::Tuple(2));

        let snapshot = QuerySnapshot::parse("range[]=2024-07-01");
        let day = |d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap();
        assert_eq!(range.read_at(&snapshot, now()), Value::list([day(1), day(30)]));
        assert_eq!(
            form.field("page").unwrap().read_at(&snapshot, now()),
            Value::Single(1.0.into())
        );
    }

    #[test]
    fn test_invalid_default_is_reported() {
        let source = r#"
[fields.name]
type = "string"
min_length = 2
default = "A"
"#;
        let err = FormManifest::from_toml_str(source).unwrap().build().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Schema {
                ref field,
                source: SchemaError::InvalidDefault { .. },
            } if field == "name"
        ));
    }

    #[test]
    fn test_mistyped_default() {
        let source = r#"
[fields.page]
type = "number"
default = "one"
"#;
        let err = FormManifest::from_toml_str(source).unwrap().build().unwrap_err();
        assert!(matches!(err, ManifestError::InvalidField { .. }));
    }

    #[test]
    fn test_inapplicable_constraint() {
        let source = r#"
[fields.flag]
type = "boolean"
min_length = 2
"#;
        let err = FormManifest::from_toml_str(source).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("string constraints do not apply to boolean fields"));
    }

    #[test]
    fn test_tuple_needs_size() {
        let source = r#"
[fields.point]
type = "number"
shape = "tuple"
"#;
        let err = FormManifest::from_toml_str(source).unwrap().build().unwrap_err();
        assert!(err.to_string().contains("need a `size`"));

        let zero = "[fields.point]\ntype = \"number\"\nshape = \"tuple\"\nsize = 0\n";
        let err = FormManifest::from_toml_str(zero).unwrap().build().unwrap_err();
        assert!(matches!(
            err,
            ManifestError::Schema { source: SchemaError::InvalidTupleSize { size: 0 }, .. }
        ));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let source = "[fields.a]\ntype = \"string\"\ncolour = 1\n";
        assert!(FormManifest::from_toml_str(source).is_err());
        assert!(FormManifest::from_toml_str("[other]\nx = 1\n").is_err());
    }

    #[test]
    fn test_date_pattern() {
        let source = r#"
[fields.day]
type = "date"
date_format = "%d/%m/%Y"
default = "24/12/2024"
"#;
        let form = FormManifest::from_toml_str(source).unwrap().build_at(now()).unwrap();
        let next = form.apply_defaults_at(&QuerySnapshot::new(), now()).unwrap();
        assert_eq!(next.to_string(), "day=24%2F12%2F2024");
    }
}
