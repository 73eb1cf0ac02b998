//! Field-to-schema mapping.
//!
//! A [`Form`] is the ordered set of fields synchronized with one query
//! string. It reads typed values out of a [`QuerySnapshot`] and builds new
//! snapshots when a field is set or when defaults must be written back.
//!
//! # Example
//! ```rust
//! use querystate::{number, string, Form, QuerySnapshot, Value};
//! use serde_json::json;
//!
//! let form = Form::builder()
//!     .field("name", string().min(2).max(10).default("John").unwrap())
//!     .field("tags", string().array().max(3))
//!     .field("page", number().min(1.0))
//!     .build()
//!     .unwrap();
//!
//! let snapshot = QuerySnapshot::parse("?page=0&utm=x");
//! let values = form.read(&snapshot);
//! assert_eq!(values.get("page"), Some(&Value::Single(1.0.into())));
//!
//! let next = form.field("tags").unwrap().set(&snapshot, &json!(["a", "b"]));
//! assert_eq!(next.to_string(), "name=John&tags%5B%5D=a&tags%5B%5D=b&page=1");
//! ```

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::Serialize;
use tracing::{debug, trace};

use crate::codec::Schema;
use crate::config::{CollectionFormat, QueryStateConfig};
use crate::error::FormError;
use crate::snapshot::{QuerySnapshot, SnapshotWriter};
use crate::value::Value;

/// Host-facing setter name for a field: `page` becomes `setPage`.
pub fn setter_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => format!("set{}{}", first.to_uppercase(), chars.as_str()),
        None => "set".to_string(),
    }
}

/// One declared field.
#[derive(Debug, Clone)]
pub struct Field {
    key: String,
    schema: Schema,
}

impl Field {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn is_collection(&self) -> bool {
        self.schema.shape().is_collection()
    }

    /// The wire tokens of the field's default; empty when there is none
    /// or it encodes to no entry (an empty list).
    fn default_tokens(&self, now: DateTime<Utc>) -> Vec<String> {
        if !self.schema.has_default() {
            return Vec::new();
        }
        self.schema.encode(&self.schema.decode_at(None, now))
    }
}

/// Decoded values of every field, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    entries: Vec<(String, Value)>,
}

impl FormValues {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, value)| (k.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for FormValues {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Builder for [`Form`].
#[derive(Debug, Default)]
pub struct FormBuilder {
    fields: Vec<Field>,
    config: QueryStateConfig,
}

impl FormBuilder {
    /// Declare a field. Fields are written in declaration order.
    pub fn field(mut self, key: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.fields.push(Field {
            key: key.into(),
            schema: schema.into(),
        });
        self
    }

    pub fn config(mut self, config: QueryStateConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the form, re-checking every schema and its default.
    pub fn build(self) -> Result<Form, FormError> {
        self.build_at(Utc::now())
    }

    pub fn build_at(self, now: DateTime<Utc>) -> Result<Form, FormError> {
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.key == field.key) {
                return Err(FormError::DuplicateField(field.key.clone()));
            }
            field
                .schema
                .check_at(now)
                .map_err(|source| FormError::Schema {
                    field: field.key.clone(),
                    source,
                })?;
        }
        debug!(fields = self.fields.len(), "Assembled form");
        Ok(Form {
            fields: self.fields,
            config: self.config,
        })
    }
}

/// Ordered field-to-schema mapping.
#[derive(Debug, Clone)]
pub struct Form {
    fields: Vec<Field>,
    config: QueryStateConfig,
}

impl Form {
    pub fn builder() -> FormBuilder {
        FormBuilder::default()
    }

    pub fn config(&self) -> &QueryStateConfig {
        &self.config
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.key.as_str())
    }

    /// Handle for one field.
    pub fn field(&self, key: &str) -> Result<FieldHandle<'_>, FormError> {
        self.fields
            .iter()
            .find(|field| field.key == key)
            .map(|field| FieldHandle { form: self, field })
            .ok_or_else(|| FormError::UnknownField(key.to_string()))
    }

    fn decode_field(&self, field: &Field, snapshot: &QuerySnapshot, now: DateTime<Utc>) -> Value {
        let tokens = snapshot.field_tokens(&field.key, field.is_collection(), &self.config);
        field.schema.decode_at(tokens.as_deref(), now)
    }

    /// Decode every field from `snapshot`.
    pub fn read(&self, snapshot: &QuerySnapshot) -> FormValues {
        self.read_at(snapshot, Utc::now())
    }

    pub fn read_at(&self, snapshot: &QuerySnapshot, now: DateTime<Utc>) -> FormValues {
        FormValues {
            entries: self
                .fields
                .iter()
                .map(|field| (field.key.clone(), self.decode_field(field, snapshot, now)))
                .collect(),
        }
    }

    /// Keys of fields whose default writes an entry but that have no entry
    /// in `snapshot`.
    pub fn missing_defaults(&self, snapshot: &QuerySnapshot) -> Vec<&str> {
        self.missing_defaults_at(snapshot, Utc::now())
    }

    pub fn missing_defaults_at(&self, snapshot: &QuerySnapshot, now: DateTime<Utc>) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|field| !snapshot.has_field(&field.key, field.is_collection(), &self.config))
            .filter(|field| !field.default_tokens(now).is_empty())
            .map(|field| field.key.as_str())
            .collect()
    }

    /// Append the defaults of fields still absent from `snapshot`.
    ///
    /// Every existing entry is kept as-is. Returns `None` when nothing is
    /// written.
    pub fn apply_defaults(&self, snapshot: &QuerySnapshot) -> Option<QuerySnapshot> {
        self.apply_defaults_at(snapshot, Utc::now())
    }

    pub fn apply_defaults_at(
        &self,
        snapshot: &QuerySnapshot,
        now: DateTime<Utc>,
    ) -> Option<QuerySnapshot> {
        let mut writer = SnapshotWriter::from_snapshot(snapshot);
        let mut written = Vec::new();
        for field in &self.fields {
            if snapshot.has_field(&field.key, field.is_collection(), &self.config) {
                continue;
            }
            let tokens = field.default_tokens(now);
            if tokens.is_empty() {
                continue;
            }
            writer.write_field(&field.key, field.is_collection(), tokens, &self.config);
            written.push(field.key.as_str());
        }
        if written.is_empty() {
            return None;
        }
        debug!(fields = ?written, "Wrote missing defaults");
        Some(writer.finish())
    }

    /// Build a complete snapshot with `key` set to `input`.
    ///
    /// The updated field goes through the validator; every other field is
    /// decoded from `snapshot` and re-encoded. Keys not declared in the
    /// form are dropped.
    pub fn rebuild(
        &self,
        snapshot: &QuerySnapshot,
        key: &str,
        input: &serde_json::Value,
    ) -> Result<QuerySnapshot, FormError> {
        self.rebuild_at(snapshot, key, input, Utc::now())
    }

    pub fn rebuild_at(
        &self,
        snapshot: &QuerySnapshot,
        key: &str,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<QuerySnapshot, FormError> {
        let handle = self.field(key)?;
        Ok(handle.set_at(snapshot, input, now))
    }

    /// Validate `input` for `field` so that the result survives the wire.
    ///
    /// In the joined format an item whose token contains the separator is
    /// split apart on the next read, so the value is re-decoded from the
    /// split tokens instead.
    fn validate_field(
        &self,
        field: &Field,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Value {
        let value = field.schema.validate_at(input, now);
        if !field.is_collection() || self.config.collection_format != CollectionFormat::Joined {
            return value;
        }
        let separator = self.config.separator;
        let tokens = field.schema.encode(&value);
        if !tokens.iter().any(|token| token.contains(separator)) {
            return value;
        }
        let split: Vec<String> = tokens
            .iter()
            .flat_map(|token| token.split(separator))
            .map(str::to_string)
            .collect();
        trace!(field = %field.key, "Split items containing the separator");
        field.schema.decode_at(Some(split.as_slice()), now)
    }

    fn rebuild_field(
        &self,
        target: &Field,
        snapshot: &QuerySnapshot,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> QuerySnapshot {
        let mut writer = SnapshotWriter::default();
        for field in &self.fields {
            let value = if field.key == target.key {
                self.validate_field(field, input, now)
            } else {
                self.decode_field(field, snapshot, now)
            };
            let tokens = field.schema.encode(&value);
            writer.write_field(&field.key, field.is_collection(), tokens, &self.config);
        }
        let next = writer.finish();
        trace!(field = %target.key, query = %next, "Rebuilt query string");
        next
    }
}

/// The read/set pair of one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldHandle<'a> {
    form: &'a Form,
    field: &'a Field,
}

impl<'a> FieldHandle<'a> {
    pub fn key(&self) -> &'a str {
        &self.field.key
    }

    pub fn schema(&self) -> &'a Schema {
        &self.field.schema
    }

    pub fn setter_name(&self) -> String {
        setter_name(&self.field.key)
    }

    pub fn read(&self, snapshot: &QuerySnapshot) -> Value {
        self.read_at(snapshot, Utc::now())
    }

    pub fn read_at(&self, snapshot: &QuerySnapshot, now: DateTime<Utc>) -> Value {
        self.form.decode_field(self.field, snapshot, now)
    }

    /// The value a set of `input` stores, as a later read returns it.
    pub fn validate(&self, input: &serde_json::Value) -> Value {
        self.validate_at(input, Utc::now())
    }

    pub fn validate_at(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Value {
        self.form.validate_field(self.field, input, now)
    }

    /// A new snapshot with this field set to `input` (`null` clears it).
    pub fn set(&self, snapshot: &QuerySnapshot, input: &serde_json::Value) -> QuerySnapshot {
        self.set_at(snapshot, input, Utc::now())
    }

    pub fn set_at(
        &self,
        snapshot: &QuerySnapshot,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> QuerySnapshot {
        self.form.rebuild_field(self.field, snapshot, input, now)
    }
}
