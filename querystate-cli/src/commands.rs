//! Command implementations.
//!
//! Every command takes a built [`Form`] and an evaluation instant, and
//! returns its output instead of printing it, so `main` decides on
//! formatting and the integration tests can assert on plain values.

use std::path::Path;

use chrono::{DateTime, Utc};
use querystate::{setter_name, Form, FormManifest, FormValues, QuerySnapshot, Value};
use serde::Serialize;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Load a form manifest from disk and build it.
pub fn load_form(path: &Path, now: DateTime<Utc>) -> CliResult<Form> {
    let source = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
    let manifest = FormManifest::from_toml_str(&source)?;
    let form = manifest.build_at(now)?;
    debug!(path = %path.display(), fields = form.fields().len(), "Loaded form manifest");
    Ok(form)
}

/// Decode every field of `query`.
pub fn decode(form: &Form, query: &str, now: DateTime<Utc>) -> FormValues {
    form.read_at(&QuerySnapshot::parse(query), now)
}

/// Rebuild `query` with `key` set to `input`.
///
/// `input` is parsed as JSON when possible (`42`, `true`, `["a","b"]`,
/// `null`); anything else is taken as a plain string.
pub fn set(
    form: &Form,
    query: &str,
    key: &str,
    input: &str,
    now: DateTime<Utc>,
) -> CliResult<QuerySnapshot> {
    let input = parse_input(input);
    let next = form.rebuild_at(&QuerySnapshot::parse(query), key, &input, now)?;
    Ok(next)
}

/// Fill in the defaults missing from `query`; returns `query` unchanged
/// when nothing is missing.
pub fn defaults(form: &Form, query: &str, now: DateTime<Utc>) -> QuerySnapshot {
    let snapshot = QuerySnapshot::parse(query);
    form.apply_defaults_at(&snapshot, now).unwrap_or(snapshot)
}

/// One line of `querystate check` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSummary {
    pub key: String,
    #[serde(rename = "type")]
    pub base_type: String,
    pub shape: String,
    pub setter: String,
    /// What the field reads as when absent from the query string.
    pub default: Value,
}

/// Describe every field of the form.
pub fn check(form: &Form, now: DateTime<Utc>) -> Vec<FieldSummary> {
    form.fields()
        .iter()
        .map(|field| FieldSummary {
            key: field.key().to_string(),
            base_type: field.schema().base_type().to_string(),
            shape: field.schema().shape().to_string(),
            setter: setter_name(field.key()),
            default: field.schema().decode_at(None, now),
        })
        .collect()
}

fn parse_input(input: &str) -> serde_json::Value {
    serde_json::from_str(input).unwrap_or_else(|_| serde_json::Value::String(input.to_string()))
}
