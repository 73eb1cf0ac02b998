//! Type-erased decode, validate and encode.
//!
//! [`Schema`] has one variant per `(base type, shape)` pair. Each variant
//! wraps a typed schema, and every typed schema implements [`FieldCodec`],
//! which works on [`Value`]s instead of typed items. A form stores its
//! fields as `Schema` and never needs to know their item types.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::SchemaResult;
use crate::rules::{BooleanRules, DateRules, ItemRules, NumberRules, StringRules};
use crate::schema::{ArraySchema, ScalarSchema, SetSchema, TupleSchema};
use crate::value::{BaseType, Scalar, Shape, Value};

/// Decode/validate/encode over type-erased values.
pub trait FieldCodec: Send + Sync {
    fn base_type(&self) -> BaseType;

    fn shape(&self) -> Shape;

    fn has_default(&self) -> bool;

    /// Decode the field's wire tokens; `None` means the key is absent.
    fn decode_tokens(&self, tokens: Option<&[String]>, now: DateTime<Utc>) -> Value;

    /// Normalize a caller-supplied value; `null` clears the field.
    fn validate_input(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Value;

    /// Render an already validated value as wire tokens.
    fn encode_value(&self, value: &Value) -> Vec<String>;

    /// Re-run the construction-time checks.
    fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()>;
}

fn list<R: ItemRules>(rules: &R, items: &[R::Item]) -> Value {
    Value::List(items.iter().map(|item| rules.to_scalar(item)).collect())
}

fn items_of<R: ItemRules>(rules: &R, value: &Value) -> Vec<R::Item> {
    let scalars: &[Scalar] = match value {
        Value::List(items) => items,
        Value::Single(item) => std::slice::from_ref(item),
        Value::Missing => &[],
    };
    scalars
        .iter()
        .filter_map(|scalar| {
            let item = rules.from_scalar(scalar);
            if item.is_none() {
                warn!(
                    expected = %rules.base_type(),
                    found = %scalar.base_type(),
                    "Skipped mistyped item while encoding"
                );
            }
            item
        })
        .collect()
}

impl<R: ItemRules> FieldCodec for ScalarSchema<R> {
    fn base_type(&self) -> BaseType {
        self.rules().base_type()
    }

    fn shape(&self) -> Shape {
        Shape::Scalar
    }

    fn has_default(&self) -> bool {
        self.default_value().is_some()
    }

    fn decode_tokens(&self, tokens: Option<&[String]>, now: DateTime<Utc>) -> Value {
        let raw = tokens.and_then(|tokens| tokens.first()).map(String::as_str);
        let item = self.decode_at(raw, now);
        Value::from(item.map(|item| self.rules().to_scalar(&item)))
    }

    fn validate_input(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Value {
        let item = self.validate_json_at(input, now);
        Value::from(item.map(|item| self.rules().to_scalar(&item)))
    }

    fn encode_value(&self, value: &Value) -> Vec<String> {
        items_of(self.rules(), value)
            .first()
            .map(|item| vec![self.encode(item)])
            .unwrap_or_default()
    }

    fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        ScalarSchema::check_at(self, now)
    }
}

macro_rules! impl_list_codec {
    ($schema:ident, |$this:ident| $shape:expr) => {
        impl<R: ItemRules> FieldCodec for $schema<R> {
            fn base_type(&self) -> BaseType {
                self.rules().base_type()
            }

            fn shape(&self) -> Shape {
                let $this = self;
                $shape
            }

            fn has_default(&self) -> bool {
                self.default_value().is_some()
            }

            fn decode_tokens(&self, tokens: Option<&[String]>, now: DateTime<Utc>) -> Value {
                let items = self.decode_at(tokens.unwrap_or(&[]), now);
                list(self.rules(), &items)
            }

            fn validate_input(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Value {
                let items = self.validate_json_at(input, now);
                list(self.rules(), &items)
            }

            fn encode_value(&self, value: &Value) -> Vec<String> {
                self.encode(&items_of(self.rules(), value))
            }

            fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
                $schema::check_at(self, now)
            }
        }
    };
}

impl_list_codec!(ArraySchema, |_schema| Shape::Array);
impl_list_codec!(SetSchema, |_schema| Shape::Set);
impl_list_codec!(TupleSchema, |schema| Shape::Tuple(schema.size()));

macro_rules! schema_variants {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// A field schema of any base type and shape.
        #[derive(Debug, Clone)]
        pub enum Schema {
            $($variant($ty),)*
        }

        $(
            impl From<$ty> for Schema {
                fn from(schema: $ty) -> Self {
                    Schema::$variant(schema)
                }
            }
        )*

        impl Schema {
            fn codec(&self) -> &dyn FieldCodec {
                match self {
                    $(Schema::$variant(schema) => schema,)*
                }
            }
        }
    };
}

schema_variants! {
    String(ScalarSchema<StringRules>),
    StringArray(ArraySchema<StringRules>),
    StringTuple(TupleSchema<StringRules>),
    StringSet(SetSchema<StringRules>),
    Number(ScalarSchema<NumberRules>),
    NumberArray(ArraySchema<NumberRules>),
    NumberTuple(TupleSchema<NumberRules>),
    NumberSet(SetSchema<NumberRules>),
    Boolean(ScalarSchema<BooleanRules>),
    BooleanArray(ArraySchema<BooleanRules>),
    BooleanTuple(TupleSchema<BooleanRules>),
    BooleanSet(SetSchema<BooleanRules>),
    Date(ScalarSchema<DateRules>),
    DateArray(ArraySchema<DateRules>),
    DateTuple(TupleSchema<DateRules>),
    DateSet(SetSchema<DateRules>),
}

impl Schema {
    pub fn base_type(&self) -> BaseType {
        self.codec().base_type()
    }

    pub fn shape(&self) -> Shape {
        self.codec().shape()
    }

    pub fn has_default(&self) -> bool {
        self.codec().has_default()
    }

    pub fn decode_at(&self, tokens: Option<&[String]>, now: DateTime<Utc>) -> Value {
        self.codec().decode_tokens(tokens, now)
    }

    pub fn validate_at(&self, input: &serde_json::Value, now: DateTime<Utc>) -> Value {
        self.codec().validate_input(input, now)
    }

    pub fn encode(&self, value: &Value) -> Vec<String> {
        self.codec().encode_value(value)
    }

    pub fn check_at(&self, now: DateTime<Utc>) -> SchemaResult<()> {
        self.codec().check_at(now)
    }
}
