//! Typed application state synchronized with a URL query string.
//!
//! Each field gets a schema (base type, shape, constraints, optional
//! default) built with a fluent builder. From the schema the crate derives
//! how to decode wire text into a typed value, how to normalize a value a
//! caller wants to set, and how to encode a value back into wire text.
//!
//! - [`constraints`]: one function per constraint policy
//! - [`string`], [`number`], [`boolean`], [`date`]: schema builders
//! - [`Schema`]: any field schema, dispatched per `(base type, shape)`
//! - [`Form`]: the ordered field mapping, with per-field read/set
//! - [`QueryState`]: the driver binding a form to a [`Host`]
//!
//! Decoding and validation never fail. Invalid input degrades to the
//! field's default (or the shape's empty or zero value); only schema
//! construction returns errors.
//!
//! # Example
//! ```rust
//! use querystate::{date, string, Form, QuerySnapshot, Value};
//! use chrono::{TimeZone, Utc};
//!
//! let day = |d| Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).unwrap();
//! let form = Form::builder()
//!     .field(
//!         "tags",
//!         string().min(2).max(10).array().min(1).max(3)
//!             .default(["react", "typescript"]).unwrap(),
//!     )
//!     .field(
//!         "dateRange",
//!         date().min(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
//!             .tuple(2).unwrap()
//!             .default([day(1), day(30)]).unwrap(),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let snapshot = QuerySnapshot::parse("dateRange[]=2024-07-01");
//! let values = form.read(&snapshot);
//! assert_eq!(values.get("dateRange"), Some(&Value::list([day(1), day(30)])));
//! assert_eq!(values.get("tags"), Some(&Value::list(["react", "typescript"])));
//! ```

pub mod codec;
pub mod config;
pub mod constraints;
pub mod date;
pub mod error;
pub mod form;
pub mod manifest;
pub mod rules;
pub mod schema;
pub mod snapshot;
pub mod sync;
pub mod value;

#[cfg(test)]
mod tests;

pub use codec::{FieldCodec, Schema};
pub use config::{CollectionFormat, QueryStateConfig};
pub use constraints::{Case, Relative, StringFormat};
pub use date::{DateCodec, FnDateCodec, Iso8601, PatternCodec};
pub use error::{FormError, ManifestError, Rejection, SchemaError, SchemaResult};
pub use form::{setter_name, Field, FieldHandle, Form, FormBuilder, FormValues};
pub use manifest::{FieldManifest, FormManifest};
pub use rules::{BooleanRules, DateRules, ItemRules, NumberRules, StringRules};
pub use schema::{
    boolean, date, number, string, ArraySchema, BooleanSchema, CountBounds, DateSchema,
    NumberSchema, ScalarSchema, SetSchema, StringSchema, TupleSchema,
};
pub use snapshot::QuerySnapshot;
pub use sync::{
    ChannelScheduler, CommitMode, DeferredWrite, Host, MemoryHost, QueryState, QueueScheduler,
    Scheduler,
};
pub use value::{BaseType, Scalar, Shape, Value};
