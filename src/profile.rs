//! Per-column dataset profiling
//!
//! Read-only summary of what each field holds: value kinds, nulls, missing
//! entries, distinct values, string lengths, and a recognised string format
//! when every non-empty string in the column agrees on one.

use crate::analyze::{classify, StructuralClass};
use crate::types::Dataset;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static ISO_TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").unwrap());

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap());

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

static DECIMAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?(\d+\.\d*|\.\d+)([eE][+-]?\d+)?$").unwrap());

/// Kind of a single value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// Summary of one field across the dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    /// Count per value kind, nulls included
    pub kinds: BTreeMap<ValueKind, usize>,
    pub nulls: usize,
    /// Records that do not carry the field at all
    pub missing: usize,
    pub distinct: usize,
    /// Shortest and longest string value, in characters
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub format: Option<&'static str>,
}

/// Summary of a whole dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub regular: bool,
    pub columns: Vec<ColumnProfile>,
}

/// Detect if a string matches a known format
fn detect_format(value: &str) -> Option<&'static str> {
    let len = value.len();
    if len == 0 {
        return None;
    }

    if len > 6
        && (value.starts_with("http://")
            || value.starts_with("https://")
            || value.starts_with("ftp://")
            || value.starts_with("file://"))
    {
        return Some("uri");
    }

    if len == 10 && value.as_bytes()[4] == b'-' && ISO_DATE_REGEX.is_match(value) {
        return Some("date");
    }

    if value.contains('@') && EMAIL_REGEX.is_match(value) {
        return Some("email");
    }

    if len == 36 && UUID_REGEX.is_match(value) {
        return Some("uuid");
    }

    if len >= 19 && ISO_DATETIME_REGEX.is_match(value) {
        return Some("date-time");
    }

    if value.contains(':') && ISO_TIME_REGEX.is_match(value) {
        return Some("time");
    }

    if len < 16 && IPV4_REGEX.is_match(value) {
        return Some("ipv4");
    }

    // Text encodings carry numbers as strings.
    if INTEGER_REGEX.is_match(value) {
        return Some("integer");
    }
    if DECIMAL_REGEX.is_match(value) {
        return Some("decimal");
    }

    None
}

#[derive(Default)]
struct ColumnStats {
    kinds: BTreeMap<ValueKind, usize>,
    seen: usize,
    distinct: HashSet<String>,
    min_len: Option<usize>,
    max_len: Option<usize>,
    format: Option<Option<&'static str>>,
}

impl ColumnStats {
    fn observe(&mut self, value: &Value) {
        self.seen += 1;
        *self.kinds.entry(ValueKind::of(value)).or_insert(0) += 1;
        // Canonical text keeps 1 and "1" apart.
        self.distinct.insert(value.to_string());

        if let Value::String(s) = value {
            let len = s.chars().count();
            self.min_len = Some(self.min_len.map_or(len, |m| m.min(len)));
            self.max_len = Some(self.max_len.map_or(len, |m| m.max(len)));

            if !s.is_empty() {
                let detected = detect_format(s);
                self.format = match self.format {
                    None => Some(detected),
                    Some(current) if current == detected => Some(current),
                    Some(_) => Some(None),
                };
            }
        }
    }

    fn finish(self, name: String, rows: usize) -> ColumnProfile {
        ColumnProfile {
            nulls: self.kinds.get(&ValueKind::Null).copied().unwrap_or(0),
            missing: rows - self.seen,
            distinct: self.distinct.len(),
            min_len: self.min_len,
            max_len: self.max_len,
            format: self.format.flatten(),
            kinds: self.kinds,
            name,
        }
    }
}

/// Profile every field of `dataset`, in first-seen field order
pub fn profile(dataset: &Dataset) -> DatasetProfile {
    let names = dataset.field_names();
    let mut stats: Vec<ColumnStats> = names.iter().map(|_| ColumnStats::default()).collect();

    for record in dataset.records() {
        for (name, column) in names.iter().zip(stats.iter_mut()) {
            if let Some(value) = record.get(name.as_str()) {
                column.observe(value);
            }
        }
    }

    DatasetProfile {
        rows: dataset.len(),
        regular: classify(dataset) == StructuralClass::Regular,
        columns: names
            .into_iter()
            .zip(stats)
            .map(|(name, column)| column.finish(name, dataset.len()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("2024-01-15"), Some("date"));
        assert_eq!(detect_format("2024-01-15T10:30:00Z"), Some("date-time"));
        assert_eq!(detect_format("10:30:00"), Some("time"));
        assert_eq!(detect_format("user@example.com"), Some("email"));
        assert_eq!(detect_format("550e8400-e29b-41d4-a716-446655440000"), Some("uuid"));
        assert_eq!(detect_format("https://example.com"), Some("uri"));
        assert_eq!(detect_format("192.168.1.1"), Some("ipv4"));
        assert_eq!(detect_format("-42"), Some("integer"));
        assert_eq!(detect_format("3.25"), Some("decimal"));
        assert_eq!(detect_format("hello"), None);
        assert_eq!(detect_format(""), None);
    }

    #[test]
    fn test_profile_columns() {
        let d = dataset(json!([
            {"id": "1", "email": "a@x.io", "score": 1.5},
            {"id": "2", "email": "b@x.io", "score": null},
            {"id": "2", "email": "oops"}
        ]));
        let p = profile(&d);
        assert_eq!(p.rows, 3);
        assert!(!p.regular);

        let id = &p.columns[0];
        assert_eq!(id.name, "id");
        assert_eq!(id.distinct, 2);
        assert_eq!(id.format, Some("integer"));
        assert_eq!(id.kinds.get(&ValueKind::String), Some(&3));

        let email = &p.columns[1];
        assert_eq!(email.format, None);
        assert_eq!(email.min_len, Some(4));
        assert_eq!(email.max_len, Some(6));

        let score = &p.columns[2];
        assert_eq!(score.nulls, 1);
        assert_eq!(score.missing, 1);
        assert_eq!(score.kinds.get(&ValueKind::Float), Some(&1));
        assert_eq!(score.min_len, None);
    }

    #[test]
    fn test_profile_nested_kinds() {
        let d = dataset(json!([{"tags": ["a"], "user": {"n": 1}, "ok": true}]));
        let p = profile(&d);
        assert_eq!(p.columns[0].kinds.get(&ValueKind::Array), Some(&1));
        assert_eq!(p.columns[1].kinds.get(&ValueKind::Object), Some(&1));
        assert_eq!(p.columns[2].kinds.get(&ValueKind::Boolean), Some(&1));
        assert!(!p.regular);
    }

    #[test]
    fn test_profile_empty() {
        let p = profile(&Dataset::default());
        assert_eq!(p.rows, 0);
        assert!(p.columns.is_empty());
        assert!(p.regular);
    }

    #[test]
    fn test_distinct_keeps_types_apart() {
        let d = dataset(json!([{"v": 1}, {"v": "1"}]));
        assert_eq!(profile(&d).columns[0].distinct, 2);
    }
}
