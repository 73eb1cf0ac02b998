//! Typed schemas and the fluent builder.
//!
//! Every builder method takes `&self` and returns a new schema, so a
//! partial chain can be stored and reused across several fields:
//!
//! ```rust
//! use querystate::string;
//!
//! let name = string().min(2).max(10);
//! let first = name.default("John").unwrap();
//! let tags = name.lowercase().array().min(1).max(3);
//!
//! assert_eq!(first.decode(Some("A")), Some("John".to_string()));
//! assert_eq!(first.decode(Some("ThisNameIsTooLong")), Some("ThisNameIs".to_string()));
//! assert_eq!(tags.validate(Some(vec!["A".into(), "Bb".into()])), vec!["bb".to_string()]);
//! ```
//!
//! Per-item constraints live on the scalar schema; `.array()`, `.tuple(n)`
//! and `.set()` move to a collection shape where `min`/`max` bound the
//! item count instead. Scalar defaults are dropped by a shape transition.
//!
//! `.default(v)` checks `v` against the constraints accumulated so far. A
//! [`Form`](crate::Form) checks every default again when it is assembled,
//! which covers constraints added after `.default(v)` in the chain.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::trace;

use crate::constraints::{self, Case, Relative, StringFormat};
use crate::date::DateCodec;
use crate::error::{SchemaError, SchemaResult};
use crate::rules::{BooleanRules, DateRules, ItemRules, NumberRules, StringRules};

pub type StringSchema = ScalarSchema<StringRules>;
pub type NumberSchema = ScalarSchema<NumberRules>;
pub type BooleanSchema = ScalarSchema<BooleanRules>;
pub type DateSchema = ScalarSchema<DateRules>;

/// Start a string schema.
pub fn string() -> StringSchema {
    ScalarSchema::new(StringRules::default())
}

/// Start a number schema.
pub fn number() -> NumberSchema {
    ScalarSchema::new(NumberRules::default())
}

/// Start a boolean schema.
pub fn boolean() -> BooleanSchema {
    ScalarSchema::new(BooleanRules)
}

/// Start a date schema (ISO-8601 on the wire).
pub fn date() -> DateSchema {
    ScalarSchema::new(DateRules::default())
}

/// Bounds on the number of items in an array or set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountBounds {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl CountBounds {
    fn check(&self) -> SchemaResult<()> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(SchemaError::bounds("count", min, max)),
            _ => Ok(()),
        }
    }
}

/// Check that `value` is a fixed point of `constrain`.
fn check_default<T, F>(value: &T, constrain: F) -> SchemaResult<()>
where
    T: PartialEq + std::fmt::Debug,
    F: FnOnce() -> Result<T, crate::error::Rejection>,
{
    match constrain() {
        Ok(normalized) if &normalized == value => Ok(()),
        Ok(normalized) => Err(SchemaError::invalid_default(
            value,
            format!("constraints would change it to {:?}", normalized),
        )),
        Err(rejection) => Err(SchemaError::invalid_default(value, rejection)),
    }
}

/// Constrain every item, dropping the ones that reject.
fn constrain_items<R: ItemRules>(
    rules: &R,
    items: impl IntoIterator<Item = R::Item>,
    now: DateTime<Utc>,
) -> Vec<R::Item> {
    items
        .into_iter()
        .filter_map(|item| match rules.constrain(item, now) {
            Ok(item) => Some(item),
            Err(rejection) => {
                trace!(reason = %rejection, "Dropped collection item");
                None
            }
        })
        .collect()
}

fn parse_items<R: ItemRules>(rules: &R, tokens: &[String], now: DateTime<Utc>) -> Vec<R::Item> {
    let parsed = tokens.iter().filter_map(|token| match rules.parse(token) {
        Ok(item) => Some(item),
        Err(rejection) => {
            trace!(reason = %rejection, "Dropped collection item");
            None
        }
    });
    constrain_items(rules, parsed, now)
}

fn coerce_items<R: ItemRules>(
    rules: &R,
    input: &serde_json::Value,
    now: DateTime<Utc>,
) -> Vec<R::Item> {
    let inputs: Vec<&serde_json::Value> = match input {
        serde_json::Value::Array(items) => items.iter().collect(),
        single => vec![single],
    };
    let coerced = inputs
        .into_iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match rules.coerce(item) {
            Ok(item) => Some(item),
            Err(rejection) => {
                trace!(reason = %rejection, "Dropped collection item");
                None
            }
        });
    constrain_items(rules, coerced, now)
}

// =============================================================================
// Scalar
// =============================================================================

/// A single-valued field.
#[derive(Debug, Clone)]
pub struct ScalarSchema<R: ItemRules> {
    rules: R,
    default: Option<R::Item>,
}

impl<R: ItemRules> ScalarSchema<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            default: None,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn default_value(&self) -> Option<&R::Item> {
        self.default.as_ref()
    }

    fn with_rules(&self, update: impl FnOnce(&mut R)) -> Self {
        let mut rules = self.rules.clone();
        update(&mut rules);
        Self {
            rules,
            default: self.default.clone(),
        }
    }

    /// Set the default, which must satisfy the constraints as-is.
    pub fn default(&self, value: impl Into<R::Item>) -> SchemaResult<Self> {
        let value = value.into();
        self.rules.check()?;
        check_default(&value, || self.rules.constrain(value.clone(), Utc::now()))?;
        Ok(Self {
            rules: self.rules.clone(),
            default: Some(value),
        })
    }

    /// Re-run the construction checks against `now`.
    pub fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        self.rules.check()?;
        match &self.default {
            Some(value) => check_default(value, || self.rules.constrain(value.clone(), now)),
            None => Ok(()),
        }
    }

    /// A variable-length list of these items.
    pub fn array(&self) -> ArraySchema<R> {
        ArraySchema {
            rules: self.rules.clone(),
            count: CountBounds::default(),
            default: None,
        }
    }

    /// A list of exactly `size` items.
    pub fn tuple(&self, size: usize) -> SchemaResult<TupleSchema<R>> {
        if size == 0 {
            return Err(SchemaError::InvalidTupleSize { size });
        }
        Ok(TupleSchema {
            rules: self.rules.clone(),
            size,
            default: None,
        })
    }

    /// A list of distinct items.
    pub fn set(&self) -> SetSchema<R> {
        SetSchema {
            rules: self.rules.clone(),
            count: CountBounds::default(),
            default: None,
        }
    }

    /// Decode the first wire token for the field, if any.
    pub fn decode(&self, raw: Option<&str>) -> Option<R::Item> {
        self.decode_at(raw, Utc::now())
    }

    pub fn decode_at(&self, raw: Option<&str>, now: DateTime<Utc>) -> Option<R::Item> {
        let Some(raw) = raw else {
            return self.default.clone();
        };
        match self
            .rules
            .parse(raw)
            .and_then(|item| self.rules.constrain(item, now))
        {
            Ok(item) => Some(item),
            Err(rejection) => {
                trace!(reason = %rejection, "Rejected value, using default");
                self.default.clone()
            }
        }
    }

    /// Normalize a value supplied to a setter; `None` clears the field.
    pub fn validate(&self, value: Option<R::Item>) -> Option<R::Item> {
        self.validate_at(value, Utc::now())
    }

    pub fn validate_at(&self, value: Option<R::Item>, now: DateTime<Utc>) -> Option<R::Item> {
        let Some(value) = value else {
            return self.default.clone();
        };
        match self.rules.constrain(value, now) {
            Ok(item) => Some(item),
            Err(rejection) => {
                trace!(reason = %rejection, "Rejected value, using default");
                self.default.clone()
            }
        }
    }

    /// Normalize an untyped value; `null` clears the field.
    pub fn validate_json_at(
        &self,
        input: &serde_json::Value,
        now: DateTime<Utc>,
    ) -> Option<R::Item> {
        if input.is_null() {
            return self.default.clone();
        }
        match self.rules.coerce(input) {
            Ok(item) => self.validate_at(Some(item), now),
            Err(rejection) => {
                trace!(reason = %rejection, "Rejected value, using default");
                self.default.clone()
            }
        }
    }

    /// Render a validated value as its wire token.
    pub fn encode(&self, value: &R::Item) -> String {
        self.rules.format(value)
    }
}

impl ScalarSchema<StringRules> {
    /// Minimum length in characters; shorter values are rejected.
    pub fn min(&self, length: usize) -> Self {
        self.with_rules(|rules| rules.min_length = Some(length))
    }

    /// Maximum length in characters; longer values are truncated.
    pub fn max(&self, length: usize) -> Self {
        self.with_rules(|rules| rules.max_length = Some(length))
    }

    pub fn lowercase(&self) -> Self {
        self.with_rules(|rules| rules.case = Some(Case::Lower))
    }

    pub fn uppercase(&self) -> Self {
        self.with_rules(|rules| rules.case = Some(Case::Upper))
    }

    pub fn email(&self) -> Self {
        self.format(StringFormat::Email)
    }

    pub fn url(&self) -> Self {
        self.format(StringFormat::Url)
    }

    pub fn uuid(&self) -> Self {
        self.format(StringFormat::Uuid)
    }

    pub fn format(&self, format: StringFormat) -> Self {
        self.with_rules(|rules| {
            if !rules.formats.contains(&format) {
                rules.formats.push(format);
            }
        })
    }

    /// Restrict the value to one of `values`.
    pub fn one_of<I, S>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = values.into_iter().map(Into::into).collect();
        self.with_rules(|rules| rules.allowed = allowed)
    }
}

impl ScalarSchema<NumberRules> {
    /// Lower bound; smaller values are clamped.
    pub fn min(&self, min: f64) -> Self {
        self.with_rules(|rules| rules.min = Some(min))
    }

    /// Upper bound; larger values are clamped.
    pub fn max(&self, max: f64) -> Self {
        self.with_rules(|rules| rules.max = Some(max))
    }
}

impl ScalarSchema<DateRules> {
    pub fn min(&self, min: DateTime<Utc>) -> Self {
        self.with_rules(|rules| rules.min = Some(min))
    }

    pub fn max(&self, max: DateTime<Utc>) -> Self {
        self.with_rules(|rules| rules.max = Some(max))
    }

    /// Only dates strictly after the evaluation instant.
    pub fn future(&self) -> Self {
        self.with_rules(|rules| rules.relative = Some(Relative::Future))
    }

    /// Only dates strictly before the evaluation instant.
    pub fn past(&self) -> Self {
        self.with_rules(|rules| rules.relative = Some(Relative::Past))
    }

    /// Replace the ISO-8601 wire format with `codec`.
    pub fn codec(&self, codec: impl DateCodec + 'static) -> Self {
        let codec: Arc<dyn DateCodec> = Arc::new(codec);
        self.with_rules(|rules| rules.codec = codec)
    }
}

// =============================================================================
// Array
// =============================================================================

/// A variable-length list field.
#[derive(Debug, Clone)]
pub struct ArraySchema<R: ItemRules> {
    rules: R,
    count: CountBounds,
    default: Option<Vec<R::Item>>,
}

impl<R: ItemRules> ArraySchema<R> {
    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn count(&self) -> CountBounds {
        self.count
    }

    pub fn default_value(&self) -> Option<&[R::Item]> {
        self.default.as_deref()
    }

    /// Minimum item count; shorter lists fall back to the default.
    pub fn min(&self, count: usize) -> Self {
        let mut next = self.clone();
        next.count.min = Some(count);
        next
    }

    /// Maximum item count; longer lists are truncated.
    pub fn max(&self, count: usize) -> Self {
        let mut next = self.clone();
        next.count.max = Some(count);
        next
    }

    pub fn default<I, T>(&self, items: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<R::Item>,
    {
        let items: Vec<R::Item> = items.into_iter().map(Into::into).collect();
        let mut next = self.clone();
        next.default = Some(items);
        next.check_at(Utc::now())?;
        Ok(next)
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        self.rules.check()?;
        self.count.check()?;
        match &self.default {
            Some(items) => check_default(items, || self.normalize(items.clone(), now)),
            None => Ok(()),
        }
    }

    fn normalize(
        &self,
        items: Vec<R::Item>,
        now: DateTime<Utc>,
    ) -> Result<Vec<R::Item>, crate::error::Rejection> {
        let items = constrain_items(&self.rules, items, now);
        constraints::apply_count(items, self.count.min, self.count.max)
    }

    fn finish(&self, items: Vec<R::Item>) -> Vec<R::Item> {
        if items.is_empty() {
            return self.fallback();
        }
        match constraints::apply_count(items, self.count.min, self.count.max) {
            Ok(items) => items,
            Err(rejection) => {
                trace!(reason = %rejection, "Rejected list, using default");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Vec<R::Item> {
        self.default.clone().unwrap_or_default()
    }

    /// Decode the wire tokens for the field; an empty slice means absent.
    pub fn decode(&self, tokens: &[String]) -> Vec<R::Item> {
        self.decode_at(tokens, Utc::now())
    }

    pub fn decode_at(&self, tokens: &[String], now: DateTime<Utc>) -> Vec<R::Item> {
        self.finish(parse_items(&self.rules, tokens, now))
    }

    pub fn validate(&self, value: Option<Vec<R::Item>>) -> Vec<R::Item> {
        self.validate_at(value, Utc::now())
    }

    pub fn validate_at(&self, value: Option<Vec<R::Item>>, now: DateTime<Utc>) -> Vec<R::Item> {
        match value {
            Some(items) => self.finish(constrain_items(&self.rules, items, now)),
            None => self.fallback(),
        }
    }

    pub fn validate_json_at(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Vec<R::Item> {
        if input.is_null() {
            return self.fallback();
        }
        self.finish(coerce_items(&self.rules, input, now))
    }

    pub fn encode(&self, items: &[R::Item]) -> Vec<String> {
        items.iter().map(|item| self.rules.format(item)).collect()
    }
}

// =============================================================================
// Set
// =============================================================================

/// A list field without duplicates.
#[derive(Debug, Clone)]
pub struct SetSchema<R: ItemRules> {
    rules: R,
    count: CountBounds,
    default: Option<Vec<R::Item>>,
}

impl<R: ItemRules> SetSchema<R> {
    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn count(&self) -> CountBounds {
        self.count
    }

    pub fn default_value(&self) -> Option<&[R::Item]> {
        self.default.as_deref()
    }

    /// Minimum count of distinct items.
    pub fn min(&self, count: usize) -> Self {
        let mut next = self.clone();
        next.count.min = Some(count);
        next
    }

    /// Maximum count of distinct items.
    pub fn max(&self, count: usize) -> Self {
        let mut next = self.clone();
        next.count.max = Some(count);
        next
    }

    /// Set the default; its items must already be distinct.
    pub fn default<I, T>(&self, items: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<R::Item>,
    {
        let items: Vec<R::Item> = items.into_iter().map(Into::into).collect();
        let mut next = self.clone();
        next.default = Some(items);
        next.check_at(Utc::now())?;
        Ok(next)
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        self.rules.check()?;
        self.count.check()?;
        match &self.default {
            Some(items) => check_default(items, || {
                let items = constraints::dedup(constrain_items(&self.rules, items.clone(), now));
                constraints::apply_count(items, self.count.min, self.count.max)
            }),
            None => Ok(()),
        }
    }

    fn finish(&self, items: Vec<R::Item>) -> Vec<R::Item> {
        let items = constraints::dedup(items);
        if items.is_empty() {
            return self.fallback();
        }
        match constraints::apply_count(items, self.count.min, self.count.max) {
            Ok(items) => items,
            Err(rejection) => {
                trace!(reason = %rejection, "Rejected set, using default");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Vec<R::Item> {
        self.default.clone().unwrap_or_default()
    }

    pub fn decode(&self, tokens: &[String]) -> Vec<R::Item> {
        self.decode_at(tokens, Utc::now())
    }

    pub fn decode_at(&self, tokens: &[String], now: DateTime<Utc>) -> Vec<R::Item> {
        self.finish(parse_items(&self.rules, tokens, now))
    }

    pub fn validate(&self, value: Option<Vec<R::Item>>) -> Vec<R::Item> {
        self.validate_at(value, Utc::now())
    }

    pub fn validate_at(&self, value: Option<Vec<R::Item>>, now: DateTime<Utc>) -> Vec<R::Item> {
        match value {
            Some(items) => self.finish(constrain_items(&self.rules, items, now)),
            None => self.fallback(),
        }
    }

    pub fn validate_json_at(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Vec<R::Item> {
        if input.is_null() {
            return self.fallback();
        }
        self.finish(coerce_items(&self.rules, input, now))
    }

    pub fn encode(&self, items: &[R::Item]) -> Vec<String> {
        items.iter().map(|item| self.rules.format(item)).collect()
    }
}

// =============================================================================
// Tuple
// =============================================================================

/// A list field of exactly `size` items. Never missing.
#[derive(Debug, Clone)]
pub struct TupleSchema<R: ItemRules> {
    rules: R,
    size: usize,
    default: Option<Vec<R::Item>>,
}

impl<R: ItemRules> TupleSchema<R> {
    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn default_value(&self) -> Option<&[R::Item]> {
        self.default.as_deref()
    }

    /// Set the default, which must have exactly `size` valid items.
    pub fn default<I, T>(&self, items: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<R::Item>,
    {
        let items: Vec<R::Item> = items.into_iter().map(Into::into).collect();
        let mut next = self.clone();
        next.default = Some(items);
        next.check_at(Utc::now())?;
        Ok(next)
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        self.rules.check()?;
        let Some(items) = &self.default else {
            return Ok(());
        };
        if items.len() != self.size {
            return Err(SchemaError::DefaultArity {
                expected: self.size,
                actual: items.len(),
            });
        }
        for item in items {
            check_default(item, || self.rules.constrain(item.clone(), now))?;
        }
        Ok(())
    }

    /// The zero value for one slot, constrained when the constraints allow it.
    fn filler(&self, now: DateTime<Utc>) -> R::Item {
        let zero = self.rules.zero(now);
        self.rules.constrain(zero.clone(), now).unwrap_or(zero)
    }

    fn finish(&self, items: Vec<R::Item>, now: DateTime<Utc>) -> Vec<R::Item> {
        if items.len() == self.size {
            return items;
        }
        trace!(count = items.len(), size = self.size, "Tuple arity mismatch");
        self.fallback(items, now)
    }

    fn fallback(&self, items: Vec<R::Item>, now: DateTime<Utc>) -> Vec<R::Item> {
        match &self.default {
            Some(default) => default.clone(),
            None => constraints::fit_to_size(items, self.size, || self.filler(now)),
        }
    }

    pub fn decode(&self, tokens: &[String]) -> Vec<R::Item> {
        self.decode_at(tokens, Utc::now())
    }

    pub fn decode_at(&self, tokens: &[String], now: DateTime<Utc>) -> Vec<R::Item> {
        self.finish(parse_items(&self.rules, tokens, now), now)
    }

    pub fn validate(&self, value: Option<Vec<R::Item>>) -> Vec<R::Item> {
        self.validate_at(value, Utc::now())
    }

    pub fn validate_at(&self, value: Option<Vec<R::Item>>, now: DateTime<Utc>) -> Vec<R::Item> {
        match value {
            Some(items) => self.finish(constrain_items(&self.rules, items, now), now),
            None => self.fallback(Vec::new(), now),
        }
    }

    pub fn validate_json_at(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Vec<R::Item> {
        if input.is_null() {
            return self.fallback(Vec::new(), now);
        }
        self.finish(coerce_items(&self.rules, input, now), now)
    }

    pub fn encode(&self, items: &[R::Item]) -> Vec<String> {
        items.iter().map(|item| self.rules.format(item)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_builder_does_not_mutate_receiver() {
        let base = string().min(2);
        let lower = base.lowercase();
        assert_eq!(base.rules().case(), None);
        assert_eq!(lower.rules().case(), Some(Case::Lower));
        assert_eq!(lower.rules().min_length(), Some(2));
    }

    #[test]
    fn test_string_length_policy() {
        let name = string().min(2).max(10).default("John").unwrap();
        assert_eq!(name.decode(Some("A")), Some("John".into()));
        assert_eq!(name.decode(Some("ThisNameIsTooLong")), Some("ThisNameIs".into()));
        assert_eq!(name.decode(None), Some("John".into()));
        assert_eq!(string().decode(None), None);
    }

    #[test]
    fn test_string_formats_reject() {
        let email = string().email();
        assert_eq!(email.decode(Some("a@b.co")), Some("a@b.co".into()));
        assert_eq!(email.decode(Some("nope")), None);

        let id = string().uuid();
        assert!(id.decode(Some("123e4567-e89b-12d3-a456-426614174000")).is_some());
        assert_eq!(id.decode(Some("123")), None);

        let link = string().url();
        assert!(link.decode(Some("https://example.com/x")).is_some());
        assert_eq!(link.decode(Some("example")), None);
    }

    #[test]
    fn test_case_applies_before_enum() {
        let sort = string().lowercase().one_of(["asc", "desc"]);
        assert_eq!(sort.decode(Some("DESC")), Some("desc".into()));
        assert_eq!(sort.decode(Some("up")), None);
    }

    #[test]
    fn test_number_clamps() {
        let page = number().min(0.0).max(100.0);
        assert_eq!(page.validate(Some(-5.0)), Some(0.0));
        assert_eq!(page.validate(Some(150.0)), Some(100.0));
        assert_eq!(page.decode(Some("abc")), None);
        assert_eq!(page.encode(&42.0), "42");
    }

    #[test]
    fn test_boolean_decode() {
        let flag = boolean().default(false).unwrap();
        assert_eq!(flag.decode(Some("Yes")), Some(true));
        assert_eq!(flag.decode(Some("0")), Some(false));
        assert_eq!(flag.decode(None), Some(false));
    }

    #[test]
    fn test_date_relative_at_instant() {
        let now = day(2025, 1, 1);
        let upcoming = date().future();
        assert_eq!(upcoming.decode_at(Some("2025-06-01"), now), Some(day(2025, 6, 1)));
        assert_eq!(upcoming.decode_at(Some("2024-06-01"), now), None);
        assert_eq!(upcoming.decode_at(Some("2025-01-01"), now), None);
    }

    #[test]
    fn test_invalid_defaults() {
        assert!(string().min(2).default("A").is_err());
        assert!(string().max(3).default("abcd").is_err());
        assert!(string().lowercase().default("ABC").is_err());
        assert!(number().min(0.0).max(10.0).default(42.0).is_err());
        assert!(date().min(day(2024, 1, 1)).default(day(2023, 1, 1)).is_err());
        assert!(string().array().min(1).default(Vec::<String>::new()).is_err());
        assert!(string().array().max(1).default(["a", "b"]).is_err());
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            string().min(5).max(2).default("abc"),
            Err(SchemaError::InvalidBounds { constraint: "length", .. })
        ));
        assert!(matches!(
            string().array().min(3).max(1).check_at(Utc::now()),
            Err(SchemaError::InvalidBounds { constraint: "count", .. })
        ));
    }

    #[test]
    fn test_tuple_size_must_be_positive() {
        assert_eq!(
            number().tuple(0).unwrap_err(),
            SchemaError::InvalidTupleSize { size: 0 }
        );
        assert_eq!(number().tuple(3).unwrap().size(), 3);
    }

    #[test]
    fn test_tuple_default_arity() {
        let range = date().tuple(2).unwrap();
        assert_eq!(
            range.default([day(2024, 6, 1)]).unwrap_err(),
            SchemaError::DefaultArity {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_array_count_policy() {
        let tags = string()
            .min(2)
            .max(10)
            .array()
            .min(1)
            .max(3)
            .default(["react", "typescript"])
            .unwrap();
        assert_eq!(
            tags.validate(Some(tokens(&["react", "typescript", "javascript", "node"]))),
            tokens(&["react", "typescript", "javascript"])
        );
        assert_eq!(tags.validate(Some(vec![])), tokens(&["react", "typescript"]));
        assert_eq!(tags.decode(&tokens(&["a", "vue"])), tokens(&["vue"]));
        assert_eq!(tags.decode(&[]), tokens(&["react", "typescript"]));
    }

    #[test]
    fn test_array_without_default_is_empty() {
        let ids = number().array();
        assert_eq!(ids.decode(&[]), Vec::<f64>::new());
        assert_eq!(ids.decode(&tokens(&["1", "x", "3"])), vec![1.0, 3.0]);
    }

    #[test]
    fn test_set_dedups_before_count() {
        let labels = string().set().min(1).max(10);
        assert_eq!(
            labels.validate(Some(tokens(&["a", "a", "b"]))),
            tokens(&["a", "b"])
        );
        let pair = string().set().max(2);
        assert_eq!(
            pair.decode(&tokens(&["x", "x", "y", "z"])),
            tokens(&["x", "y"])
        );
    }

    #[test]
    fn test_set_default_rejects_duplicates() {
        let err = string().set().default(["a", "b", "a"]).unwrap_err();
        assert!(err.to_string().contains("constraints would change it"));
        let labels = string().set().default(["a", "b"]).unwrap();
        assert_eq!(labels.default_value(), Some(&tokens(&["a", "b"])[..]));
    }

    #[test]
    fn test_tuple_arity() {
        let range = date()
            .min(day(2024, 1, 1))
            .tuple(2)
            .unwrap()
            .default([day(2024, 6, 1), day(2024, 6, 30)])
            .unwrap();
        assert_eq!(
            range.decode(&tokens(&["2024-07-01"])),
            vec![day(2024, 6, 1), day(2024, 6, 30)]
        );
        assert_eq!(
            range.decode(&tokens(&["2024-07-01", "2024-07-02"])),
            vec![day(2024, 7, 1), day(2024, 7, 2)]
        );
    }

    #[test]
    fn test_tuple_zero_fill() {
        let now = day(2025, 1, 1);
        let point = number().min(5.0).tuple(2).unwrap();
        assert_eq!(point.decode_at(&tokens(&["7"]), now), vec![7.0, 5.0]);
        assert_eq!(point.decode_at(&tokens(&["7", "8", "9"]), now), vec![7.0, 8.0]);
        assert_eq!(point.validate_at(None, now), vec![5.0, 5.0]);

        let when = date().tuple(1).unwrap();
        assert_eq!(when.decode_at(&[], now), vec![now]);
    }

    #[test]
    fn test_validate_json() {
        let now = day(2025, 1, 1);
        let tags = string().array();
        assert_eq!(tags.validate_json_at(&json!("solo"), now), tokens(&["solo"]));
        assert_eq!(
            tags.validate_json_at(&json!(["a", 1, null, {}]), now),
            tokens(&["a", "1"])
        );
        let page = number().default(1.0).unwrap();
        assert_eq!(page.validate_json_at(&json!(null), now), Some(1.0));
        assert_eq!(page.validate_json_at(&json!("12"), now), Some(12.0));
        assert_eq!(page.validate_json_at(&json!([1]), now), Some(1.0));
    }

    #[test]
    fn test_encode_tokens() {
        let days = date().array();
        assert_eq!(
            days.encode(&[day(2024, 6, 1)]),
            tokens(&["2024-06-01T00:00:00.000Z"])
        );
        assert_eq!(boolean().set().encode(&[true, false]), tokens(&["true", "false"]));
    }
}
