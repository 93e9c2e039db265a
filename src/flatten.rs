use crate::types::{Dataset, FlattenConfig, Record};
use serde_json::{Map, Value};

/// Rewrites nested or ragged records into flat records sharing one schema
///
/// Flattening is lossy: the path information lives only in the produced key
/// names and cannot be recovered.
pub struct Flattener {
    config: FlattenConfig,
}

impl Flattener {
    pub fn new(config: FlattenConfig) -> Self {
        Flattener { config }
    }

    /// Flatten every record, then re-emit all of them against the
    /// first-seen-order union of their keys, padding gaps with null
    pub fn flatten(&self, dataset: Dataset) -> Dataset {
        let flat: Vec<Record> = dataset
            .into_records()
            .into_iter()
            .map(|record| self.flatten_record(record))
            .collect();

        let schema = Self::unify_keys(&flat);

        flat.into_iter()
            .map(|mut record| {
                let mut row = Map::with_capacity(schema.len());
                for key in &schema {
                    let value = record.remove(key.as_str()).unwrap_or(Value::Null);
                    row.insert(key.clone(), value);
                }
                row
            })
            .collect()
    }

    /// Flatten a single record without schema unification
    pub fn flatten_record(&self, record: Record) -> Record {
        let mut out = Map::new();
        for (key, value) in record {
            self.flatten_value(key, value, &mut out);
        }
        out
    }

    fn flatten_value(&self, path: String, value: Value, out: &mut Record) {
        match value {
            Value::Object(obj) => {
                for (sub_key, sub_value) in obj {
                    if sub_value.is_null() {
                        continue;
                    }
                    let child = self.join(&path, &sub_key);
                    self.flatten_value(child, sub_value, out);
                }
            }
            Value::Array(arr) => {
                // An empty array yields no key at all.
                for (idx, elem) in arr.into_iter().enumerate() {
                    let child = self.join(&path, &idx.to_string());
                    match elem {
                        Value::Object(_) | Value::Array(_) => self.flatten_value(child, elem, out),
                        scalar => {
                            out.insert(child, scalar);
                        }
                    }
                }
            }
            scalar => {
                out.insert(path, scalar);
            }
        }
    }

    fn join(&self, parent: &str, child: &str) -> String {
        let mut key = String::with_capacity(parent.len() + self.config.separator.len() + child.len());
        key.push_str(parent);
        key.push_str(&self.config.separator);
        key.push_str(child);
        key
    }

    fn unify_keys(records: &[Record]) -> Vec<String> {
        let mut seen = Map::new();
        for record in records {
            for key in record.keys() {
                if !seen.contains_key(key) {
                    seen.insert(key.clone(), Value::Null);
                }
            }
        }
        seen.into_iter().map(|(k, _)| k).collect()
    }
}

impl Default for Flattener {
    fn default() -> Self {
        Flattener::new(FlattenConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    fn keys(record: &Record) -> Vec<&str> {
        record.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_nested_object() {
        let out = Flattener::default().flatten(dataset(json!([{"a": 1, "b": {"x": 2}}])));
        assert_eq!(out, dataset(json!([{"a": 1, "b_x": 2}])));
        assert_eq!(keys(&out.records()[0]), vec!["a", "b_x"]);
    }

    #[test]
    fn test_empty_array_drops_field() {
        let out = Flattener::default().flatten(dataset(json!([{"a": 1, "tags": []}])));
        assert_eq!(keys(&out.records()[0]), vec!["a"]);
    }

    #[test]
    fn test_scalar_array_indexed() {
        let out = Flattener::default().flatten(dataset(json!([{"a": 1, "tags": ["x", "y"]}])));
        assert_eq!(keys(&out.records()[0]), vec!["a", "tags_0", "tags_1"]);
        assert_eq!(out.records()[0]["tags_1"], "y");
    }

    #[test]
    fn test_ragged_records_padded_with_null() {
        let out = Flattener::default().flatten(dataset(json!([{"a": 1}, {"a": 1, "b": 2}])));
        assert_eq!(out.records()[0]["b"], Value::Null);
        assert_eq!(keys(&out.records()[0]), vec!["a", "b"]);
        assert_eq!(keys(&out.records()[1]), vec!["a", "b"]);
    }

    #[test]
    fn test_array_of_objects() {
        let input = dataset(json!([{
            "id": 1,
            "posts": [{"title": "P1"}, {"title": "P2", "meta": {"likes": 3}}]
        }]));
        let out = Flattener::default().flatten(input);
        assert_eq!(
            keys(&out.records()[0]),
            vec!["id", "posts_0_title", "posts_1_title", "posts_1_meta_likes"]
        );
    }

    #[test]
    fn test_null_subfield_skipped_but_empty_string_kept() {
        let out = Flattener::default().flatten(dataset(json!([
            {"user": {"name": "", "email": null}, "note": null}
        ])));
        let record = &out.records()[0];
        assert_eq!(keys(record), vec!["user_name", "note"]);
        assert_eq!(record["user_name"], "");
        assert_eq!(record["note"], Value::Null);
    }

    #[test]
    fn test_empty_object_dropped() {
        let out = Flattener::default().flatten(dataset(json!([{"a": 1, "meta": {}}])));
        assert_eq!(keys(&out.records()[0]), vec!["a"]);
    }

    #[test]
    fn test_nested_arrays() {
        let out = Flattener::default().flatten(dataset(json!([{"m": [[1, 2], [3]]}])));
        assert_eq!(keys(&out.records()[0]), vec!["m_0_0", "m_0_1", "m_1_0"]);
    }

    #[test]
    fn test_custom_separator() {
        let flattener = Flattener::new(FlattenConfig {
            separator: String::from("."),
        });
        let out = flattener.flatten(dataset(json!([{"b": {"x": [7]}}])));
        assert_eq!(keys(&out.records()[0]), vec!["b.x.0"]);
    }

    #[test]
    fn test_colliding_paths_last_wins_first_position() {
        let out = Flattener::default().flatten(dataset(json!([{"a_b": 1, "z": 0, "a": {"b": 2}}])));
        let record = &out.records()[0];
        assert_eq!(keys(record), vec!["a_b", "z"]);
        assert_eq!(record["a_b"], 2);
    }

    #[test]
    fn test_idempotent() {
        let flattener = Flattener::default();
        let once = flattener.flatten(dataset(json!([
            {"a": {"b": [1, {"c": null, "d": 2}]}},
            {"e": true}
        ])));
        let twice = flattener.flatten(once.clone());
        assert_eq!(once, twice);
        assert_eq!(keys(&once.records()[1]), keys(&twice.records()[1]));
    }

    #[test]
    fn test_empty_dataset() {
        assert!(Flattener::default().flatten(Dataset::default()).is_empty());
    }
}
