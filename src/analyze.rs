//! Structural classification of datasets
//!
//! A dataset is *regular* when every record has the same set of field names
//! and no field holds an array or an object. Anything else is *irregular* and
//! needs flattening before a tabular encoding can hold it.

use crate::types::{Dataset, Record};
use serde_json::Value;
use std::collections::HashSet;

/// Structural shape of a dataset, recomputed for every conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructuralClass {
    /// Uniform flat keys, no nested values
    Regular,
    /// Nested values and/or non-uniform key sets
    Irregular,
}

impl StructuralClass {
    pub fn is_regular(self) -> bool {
        self == StructuralClass::Regular
    }
}

/// Classify a dataset in a single pass, stopping at the first record that
/// disqualifies it
pub fn classify(dataset: &Dataset) -> StructuralClass {
    let records = dataset.records();
    let Some(first) = records.first() else {
        return StructuralClass::Regular;
    };

    let reference: HashSet<&str> = first.keys().map(String::as_str).collect();

    for record in records {
        if is_nested(record) || !same_key_set(record, &reference) {
            return StructuralClass::Irregular;
        }
    }

    StructuralClass::Regular
}

/// Whether any field of the record holds an array or an object
pub fn is_nested(record: &Record) -> bool {
    record
        .values()
        .any(|v| matches!(v, Value::Array(_) | Value::Object(_)))
}

fn same_key_set(record: &Record, reference: &HashSet<&str>) -> bool {
    // Keys within a record are unique, so equal length plus containment is
    // set equality.
    record.len() == reference.len() && record.keys().all(|k| reference.contains(k.as_str()))
}
