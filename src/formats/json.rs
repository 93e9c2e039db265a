//! Object-notation codec.
//!
//! Reads a top-level array of objects or a single object. When the file is
//! not one JSON document, falls back to newline-delimited JSON.

use super::{Format, FormatAdapter};
use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Loaded, Record, RelationSelector};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

pub struct JsonAdapter;

impl JsonAdapter {
    /// Parse a JSON document (or NDJSON stream) into a dataset
    pub fn parse(content: &str) -> std::result::Result<Dataset, String> {
        match serde_json::from_str::<Value>(content) {
            Ok(value) => Self::from_document(value),
            Err(doc_err) => {
                // Fallback for NDJSON
                let mut dataset = Dataset::default();
                for (idx, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let value: Value = serde_json::from_str(line).map_err(|_| doc_err.to_string())?;
                    match value {
                        Value::Object(obj) => dataset.push(obj),
                        _ => return Err(format!("line {}: expected an object", idx + 1)),
                    }
                }
                if dataset.is_empty() {
                    return Err(doc_err.to_string());
                }
                Ok(dataset)
            }
        }
    }

    fn from_document(value: Value) -> std::result::Result<Dataset, String> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::Object(obj) => Ok(obj),
                    other => Err(format!(
                        "element {} is {}, expected an object",
                        idx,
                        kind_name(&other)
                    )),
                })
                .collect::<std::result::Result<Vec<Record>, String>>()
                .map(Dataset::new),
            Value::Object(obj) => Ok(Dataset::new(vec![obj])),
            other => Err(format!(
                "top-level {} is not an array of objects",
                kind_name(&other)
            )),
        }
    }

    /// Pretty-print a dataset as an array of objects, 4-space indented
    pub fn render(dataset: &Dataset) -> serde_json::Result<Vec<u8>> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        dataset.serialize(&mut serializer)?;
        Ok(out)
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl FormatAdapter for JsonAdapter {
    fn read(&self, source: &Path, _selector: Option<&RelationSelector>) -> Result<Loaded> {
        let content = std::fs::read_to_string(source)
            .map_err(|e| ConvertError::from_read_io(source, Format::Json, e))?;
        let dataset = Self::parse(&content).map_err(|e| ConvertError::malformed(source, Format::Json, e))?;

        tracing::debug!(path = %source.display(), rows = dataset.len(), "read json");
        Ok(Loaded::Single(dataset))
    }

    fn write(&self, dataset: &Dataset, destination: &Path) -> Result<()> {
        let bytes = Self::render(dataset).map_err(|e| ConvertError::unwritable(destination, e))?;
        std::fs::write(destination, bytes).map_err(|e| ConvertError::unwritable(destination, e))
    }
}
