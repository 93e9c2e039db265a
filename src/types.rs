use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// One row of a dataset: an insertion-ordered field name to value mapping
pub type Record = Map<String, Value>;

/// An ordered sequence of records representing one logical relation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Dataset { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Union of top-level field names across all records, in first-seen order
    pub fn field_names(&self) -> Vec<String> {
        let mut seen = Map::new();
        for record in &self.records {
            for key in record.keys() {
                if !seen.contains_key(key) {
                    seen.insert(key.clone(), Value::Null);
                }
            }
        }
        seen.into_iter().map(|(k, _)| k).collect()
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Dataset::new(records)
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Dataset::new(iter.into_iter().collect())
    }
}

/// Several named datasets read from one source, in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationSet {
    relations: Vec<(String, Dataset)>,
}

impl RelationSet {
    pub fn new() -> Self {
        RelationSet::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, dataset: Dataset) {
        self.relations.push((name.into(), dataset));
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.relations.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Dataset> {
        self.relations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, dataset)| dataset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.relations.iter().map(|(n, d)| (n.as_str(), d))
    }
}

impl IntoIterator for RelationSet {
    type Item = (String, Dataset);
    type IntoIter = std::vec::IntoIter<(String, Dataset)>;

    fn into_iter(self) -> Self::IntoIter {
        self.relations.into_iter()
    }
}

/// What a format adapter hands back from a read
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// The single implicit relation every non-relational source has
    Single(Dataset),
    /// Every relation of a multi-relation source
    Relations(RelationSet),
}

/// Which relation of a multi-relation source to read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationSelector {
    /// Every relation, each converted independently
    All,
    /// One relation by name
    Named(String),
}

impl RelationSelector {
    pub fn named(name: impl Into<String>) -> Self {
        RelationSelector::Named(name.into())
    }
}

impl FromStr for RelationSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "*" | "all" => Ok(RelationSelector::All),
            name => Ok(RelationSelector::Named(name.to_string())),
        }
    }
}

/// Configuration for the flattening transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenConfig {
    /// Joins parent keys, child keys and array indices
    pub separator: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        FlattenConfig {
            separator: String::from("_"),
        }
    }
}

/// Configuration for the conversion orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertConfig {
    pub flatten: FlattenConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_field_names_first_seen_union() {
        let dataset = Dataset::new(vec![
            record(json!({"b": 1, "a": 2})),
            record(json!({"a": 3, "c": 4})),
        ]);
        assert_eq!(dataset.field_names(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let r = record(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let keys: Vec<&String> = r.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!("*".parse::<RelationSelector>().unwrap(), RelationSelector::All);
        assert_eq!("all".parse::<RelationSelector>().unwrap(), RelationSelector::All);
        assert_eq!(
            "users".parse::<RelationSelector>().unwrap(),
            RelationSelector::named("users")
        );
    }

    #[test]
    fn test_relation_set_keeps_order() {
        let mut set = RelationSet::new();
        set.insert("zebra", Dataset::default());
        set.insert("apple", Dataset::default());
        assert_eq!(set.names(), vec!["zebra", "apple"]);
        assert!(set.get("apple").is_some());
        assert!(set.get("pear").is_none());
    }
}
