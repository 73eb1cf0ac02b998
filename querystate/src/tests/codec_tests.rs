//! Property-based tests for decode, validate and encode
//!
//! - Idempotence: re-encoding a decoded value decodes to the same value
//! - Validate is a no-op on decoded values
//! - Tuple arity is always exact
//! - Clamping is total
//! - Sets never hold duplicates

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use crate::schema::{boolean, date, number, string, StringSchema};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

/// String schemas with arbitrary, satisfiable constraints.
fn string_schema() -> impl Strategy<Value = StringSchema> {
    (
        proptest::option::of(0usize..4),
        proptest::option::of(0usize..8),
        0u8..3,
    )
        .prop_map(|(min, extra, case)| {
            let mut schema = string();
            if let Some(min) = min {
                schema = schema.min(min);
            }
            if let Some(extra) = extra {
                schema = schema.max(min.unwrap_or(0) + extra);
            }
            match case {
                1 => schema.lowercase(),
                2 => schema.uppercase(),
                _ => schema,
            }
        })
}

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,12}",
        "[0-9.eE+-]{0,8}",
        "(true|false|yes|no|1|0)",
    ]
}

// =============================================================================
// Idempotence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Re-encoding a decoded string decodes back to the same value
    #[test]
    fn prop_string_decode_encode_stable(schema in string_schema(), raw in token()) {
        let decoded = schema.decode_at(Some(raw.as_str()), now());
        if let Some(value) = decoded.clone() {
            let encoded = schema.encode(&value);
            prop_assert_eq!(schema.decode_at(Some(encoded.as_str()), now()), decoded.clone());
        }
        prop_assert_eq!(schema.validate_at(decoded.clone(), now()), decoded);
    }

    /// Numbers survive their own wire form exactly
    #[test]
    fn prop_number_decode_encode_stable(
        raw in prop_oneof![any::<f64>().prop_map(|n| n.to_string()), token()],
        min in proptest::option::of(-1000.0f64..0.0),
        max in proptest::option::of(0.0f64..1000.0),
    ) {
        let mut schema = number();
        if let Some(min) = min {
            schema = schema.min(min);
        }
        if let Some(max) = max {
            schema = schema.max(max);
        }
        let decoded = schema.decode_at(Some(raw.as_str()), now());
        if let Some(value) = decoded {
            prop_assert!(value.is_finite());
            let encoded = schema.encode(&value);
            prop_assert_eq!(schema.decode_at(Some(encoded.as_str()), now()), Some(value));
        }
        prop_assert_eq!(schema.validate_at(decoded, now()), decoded);
    }

    /// ISO-8601 dates round-trip at millisecond precision
    #[test]
    fn prop_date_decode_encode_stable(millis in 0i64..4_102_444_800_000) {
        let schema = date();
        let value = DateTime::from_timestamp_millis(millis).unwrap();
        let encoded = schema.encode(&value);
        prop_assert_eq!(schema.decode_at(Some(encoded.as_str()), now()), Some(value));
    }

    /// Booleans decode to a value that encodes to "true" or "false"
    #[test]
    fn prop_boolean_total(raw in token()) {
        let schema = boolean();
        let value = schema.decode_at(Some(raw.as_str()), now()).unwrap();
        let encoded = schema.encode(&value);
        prop_assert!(encoded == "true" || encoded == "false");
        prop_assert_eq!(schema.decode_at(Some(encoded.as_str()), now()), Some(value));
    }

    /// Arrays are stable under decode/encode, with or without count bounds
    #[test]
    fn prop_array_decode_encode_stable(
        item in string_schema(),
        raw in prop::collection::vec(token(), 0..8),
        min in proptest::option::of(0usize..3),
        extra in proptest::option::of(0usize..4),
    ) {
        let mut schema = item.array();
        if let Some(min) = min {
            schema = schema.min(min);
        }
        if let Some(extra) = extra {
            schema = schema.max(min.unwrap_or(0) + extra);
        }
        let decoded = schema.decode_at(&raw, now());
        let encoded = schema.encode(&decoded);
        prop_assert_eq!(schema.decode_at(&encoded, now()), decoded.clone());
        prop_assert_eq!(schema.validate_at(Some(decoded.clone()), now()), decoded);
    }
}

// =============================================================================
// Shape invariants
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Tuples always hold exactly `size` items
    #[test]
    fn prop_tuple_arity(
        size in 1usize..6,
        raw in prop::collection::vec(token(), 0..10),
        with_default in any::<bool>(),
        min in proptest::option::of(-5.0f64..5.0),
    ) {
        let mut item = number();
        if let Some(min) = min {
            item = item.min(min);
        }
        let mut schema = item.tuple(size).unwrap();
        if with_default {
            let fill = min.unwrap_or(0.0).max(0.0);
            schema = schema.default(vec![fill; size]).unwrap();
        }
        let decoded = schema.decode_at(&raw, now());
        prop_assert_eq!(decoded.len(), size);
        prop_assert_eq!(schema.validate_at(None, now()).len(), size);
        let encoded = schema.encode(&decoded);
        prop_assert_eq!(schema.decode_at(&encoded, now()), decoded);
    }

    /// Validation clamps every finite number into [0, 100]
    #[test]
    fn prop_clamp_is_total(value in -1.0e9f64..1.0e9) {
        let schema = number().min(0.0).max(100.0);
        let clamped = schema.validate_at(Some(value), now()).unwrap();
        prop_assert!((0.0..=100.0).contains(&clamped));
        if (0.0..=100.0).contains(&value) {
            prop_assert_eq!(clamped, value);
        }
    }

    /// Sets hold distinct items in first-occurrence order
    #[test]
    fn prop_set_dedup(raw in prop::collection::vec("[a-c]", 0..12)) {
        let schema = string().set();
        let decoded = schema.decode_at(&raw, now());
        for (index, item) in decoded.iter().enumerate() {
            prop_assert!(!decoded[..index].contains(item));
        }
        let mut expected: Vec<String> = Vec::new();
        for item in &raw {
            if !expected.contains(item) {
                expected.push(item.clone());
            }
        }
        prop_assert_eq!(decoded, expected);
    }
}
