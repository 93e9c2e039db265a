//! Property-based tests for classification and flattening

use proptest::prelude::*;
use recast::{classify, Dataset, FlattenConfig, Flattener, Record, StructuralClass};
use serde_json::Value;

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn record() -> impl Strategy<Value = Record> {
    prop::collection::btree_map("[a-e]{1,3}", value(), 0..5).prop_map(|m| m.into_iter().collect())
}

fn dataset() -> impl Strategy<Value = Dataset> {
    prop::collection::vec(record(), 0..6).prop_map(Dataset::new)
}

fn key_order(dataset: &Dataset) -> Vec<Vec<String>> {
    dataset.records().iter().map(|r| r.keys().cloned().collect()).collect()
}

proptest! {
    #[test]
    fn flatten_is_idempotent(d in dataset()) {
        let flattener = Flattener::new(FlattenConfig::default());
        let once = flattener.flatten(d);
        let twice = flattener.flatten(once.clone());

        prop_assert_eq!(key_order(&once), key_order(&twice));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn flattened_records_share_one_schema(d in dataset()) {
        let flat = Flattener::new(FlattenConfig::default()).flatten(d);
        let orders = key_order(&flat);

        if let Some(first) = orders.first() {
            for keys in &orders {
                prop_assert_eq!(keys, first);
            }
        }
        for record in flat.records() {
            for value in record.values() {
                prop_assert!(!matches!(value, Value::Array(_) | Value::Object(_)));
            }
        }
        prop_assert_eq!(classify(&flat), StructuralClass::Regular);
    }

    #[test]
    fn classification_ignores_record_order(d in dataset(), shift in 0usize..6) {
        let expected = classify(&d);

        let mut records = d.into_records();
        records.reverse();
        prop_assert_eq!(classify(&Dataset::new(records.clone())), expected);

        if !records.is_empty() {
            let by = shift % records.len();
            records.rotate_left(by);
        }
        prop_assert_eq!(classify(&Dataset::new(records)), expected);
    }

    #[test]
    fn flatten_keeps_record_count(d in dataset()) {
        let rows = d.len();
        let flat = Flattener::new(FlattenConfig { separator: ".".to_string() }).flatten(d);
        prop_assert_eq!(flat.len(), rows);
    }
}
