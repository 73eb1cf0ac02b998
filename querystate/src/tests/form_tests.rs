//! Property-based tests for snapshots and form rebuilds
//!
//! - Snapshot text round-trips through parse/serialize
//! - A rebuild writes only declared keys
//! - Reading back a set value yields the validated value, separators included
//! - Reading is stable across a rebuild that sets nothing new

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;

use crate::config::{CollectionFormat, QueryStateConfig};
use crate::form::Form;
use crate::schema::{boolean, number, string};
use crate::snapshot::QuerySnapshot;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

fn form(config: QueryStateConfig) -> Form {
    Form::builder()
        .config(config)
        .field("q", string().max(20))
        .field("page", number().min(1.0).max(50.0).default(1.0).unwrap())
        .field("tags", string().min(2).lowercase().array().max(4))
        .field("ids", number().set())
        .field("active", boolean())
        .build_at(now())
        .unwrap()
}

fn configs() -> impl Strategy<Value = QueryStateConfig> {
    prop_oneof![
        Just(QueryStateConfig::default()),
        Just(QueryStateConfig::new().with_collection_format(CollectionFormat::Joined)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Serializing then parsing a snapshot yields the same pairs
    #[test]
    fn prop_snapshot_round_trip(
        pairs in prop::collection::vec(("\\PC{0,8}", "\\PC{0,8}"), 0..6)
    ) {
        let snapshot: QuerySnapshot = pairs.into_iter().collect();
        let text = snapshot.to_string();
        prop_assert_eq!(QuerySnapshot::parse(&text), snapshot);
    }

    /// A rebuilt query string contains only keys the form declares
    #[test]
    fn prop_rebuild_drops_undeclared_keys(
        extra in prop::collection::vec(("[a-z]{1,6}", "[a-z0-9]{0,6}"), 0..6),
        page in -100i64..100,
        config in configs(),
    ) {
        let form = form(config.clone());
        let snapshot: QuerySnapshot = extra.into_iter().collect();
        let next = form.rebuild_at(&snapshot, "page", &json!(page), now()).unwrap();
        let declared: Vec<String> = form
            .fields()
            .iter()
            .flat_map(|field| [field.key().to_string(), config.collection_key(field.key())])
            .collect();
        for (key, _) in next.pairs() {
            prop_assert!(declared.contains(key), "undeclared key {}", key);
        }
    }

    /// Setting a list and reading it back gives the validated list
    #[test]
    fn prop_set_then_read(
        tags in prop::collection::vec("[a-zA-Z]{0,6}", 0..8),
        config in configs(),
    ) {
        let form = form(config);
        let handle = form.field("tags").unwrap();
        let input = json!(tags);
        let next = handle.set_at(&QuerySnapshot::new(), &input, now());
        let expected = handle.validate_at(&input, now());
        let reparsed = QuerySnapshot::parse(&next.to_string());
        prop_assert_eq!(handle.read_at(&reparsed, now()), expected);
    }

    /// Items containing the separator read back as the value `validate` reports
    #[test]
    fn prop_set_then_read_with_separator(
        tags in prop::collection::vec("[a-z,]{0,6}", 0..6),
        pair in prop::collection::vec("[a-z,]{0,4}", 0..4),
        config in configs(),
    ) {
        let form = Form::builder()
            .config(config)
            .field("tags", string().array())
            .field("pair", string().tuple(2).unwrap())
            .build_at(now())
            .unwrap();
        for (key, input) in [("tags", json!(tags)), ("pair", json!(pair))] {
            let handle = form.field(key).unwrap();
            let expected = handle.validate_at(&input, now());
            let next = handle.set_at(&QuerySnapshot::new(), &input, now());
            let reparsed = QuerySnapshot::parse(&next.to_string());
            prop_assert_eq!(handle.read_at(&reparsed, now()), expected);
        }
    }

    /// Re-setting a field to its current value leaves every value unchanged
    #[test]
    fn prop_rebuild_is_stable(
        q in "[a-zA-Z0-9 ]{0,30}",
        page in "[0-9-]{0,4}",
        ids in prop::collection::vec(0u8..5, 0..6),
        config in configs(),
    ) {
        let form = form(config.clone());
        let mut pairs = vec![("q".to_string(), q), ("page".to_string(), page)];
        for id in ids {
            pairs.push((config.collection_key("ids"), id.to_string()));
        }
        let snapshot: QuerySnapshot = if config.collection_format == CollectionFormat::Joined {
            let joined: Vec<String> = pairs
                .iter()
                .filter(|(k, _)| k == "ids")
                .map(|(_, v)| v.clone())
                .collect();
            let mut others: Vec<(String, String)> =
                pairs.into_iter().filter(|(k, _)| k != "ids").collect();
            if !joined.is_empty() {
                others.push(("ids".to_string(), joined.join(",")));
            }
            others.into_iter().collect()
        } else {
            pairs.into_iter().collect()
        };

        let before = form.read_at(&snapshot, now());
        let current = before.get("q").unwrap().to_json();
        let next = form.rebuild_at(&snapshot, "q", &current, now()).unwrap();
        prop_assert_eq!(form.read_at(&next, now()), before);
    }
}
