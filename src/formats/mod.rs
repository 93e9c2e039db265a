//! Format adapters
//!
//! Each encoding implements [`FormatAdapter`] against the shared record model.
//! The format is resolved once into a [`Format`] tag, and [`Format::adapter`]
//! picks the codec; nothing downstream re-inspects format strings.

pub mod csv;
pub mod json;
pub mod sqlite;
pub mod xml;

use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Loaded, RelationSelector};
use std::path::Path;
use std::str::FromStr;

/// Supported encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Delimited text with a header row
    Csv,
    /// Array of objects
    Json,
    /// Root element holding one element per record
    Xml,
    /// Embedded relational store, one table per relation
    Sqlite,
}

impl Format {
    pub const fn extension(&self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Sqlite => "sqlite",
        }
    }

    /// Encodings that cannot represent nesting or ragged rows
    pub const fn is_flat_only(&self) -> bool {
        matches!(self, Format::Csv | Format::Sqlite)
    }

    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some(ext) => ext.parse(),
            None => Err(ConvertError::UnsupportedFormat(format!(
                "cannot determine format of {}: file has no extension",
                path.display()
            ))),
        }
    }

    /// Codec for this format
    pub fn adapter(&self) -> Box<dyn FormatAdapter> {
        match self {
            Format::Csv => Box::new(csv::CsvAdapter),
            Format::Json => Box::new(json::JsonAdapter),
            Format::Xml => Box::new(xml::XmlAdapter),
            Format::Sqlite => Box::new(sqlite::SqliteAdapter),
        }
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(Format::Csv),
            "json" | "jsonl" | "ndjson" => Ok(Format::Json),
            "xml" => Ok(Format::Xml),
            "sqlite" | "sqlite3" | "db" => Ok(Format::Sqlite),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Contract every codec satisfies
pub trait FormatAdapter {
    /// Read a source. Only multi-relation codecs look at the selector.
    fn read(&self, source: &Path, selector: Option<&RelationSelector>) -> Result<Loaded>;

    /// Write one dataset to a destination.
    fn write(&self, dataset: &Dataset, destination: &Path) -> Result<()>;

    /// Relation names in the source. Single-relation codecs expose one
    /// implicit relation named after the file.
    fn list_relations(&self, source: &Path) -> Result<Vec<String>> {
        if !source.exists() {
            return Err(ConvertError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }
        Ok(vec![file_stem(source)])
    }
}

/// File name without directory or extension
pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

/// Render a scalar the way untyped encodings store it; nested values become
/// compact JSON text
pub(crate) fn value_to_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        nested => Some(nested.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_str() {
        assert_eq!(Format::from_str("csv").unwrap(), Format::Csv);
        assert_eq!(Format::from_str("JSON").unwrap(), Format::Json);
        assert_eq!(Format::from_str(".xml").unwrap(), Format::Xml);
        assert_eq!(Format::from_str("sqlite").unwrap(), Format::Sqlite);
        assert!(matches!(
            Format::from_str("parquet"),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(Format::from_path(Path::new("a/b.csv")).unwrap(), Format::Csv);
        assert_eq!(Format::from_path(Path::new("data.SQLITE")).unwrap(), Format::Sqlite);
        assert!(Format::from_path(Path::new("notes.txt")).is_err());
        assert!(Format::from_path(Path::new("Makefile")).is_err());
    }

    #[test]
    fn test_flat_only() {
        assert!(Format::Csv.is_flat_only());
        assert!(Format::Sqlite.is_flat_only());
        assert!(!Format::Json.is_flat_only());
        assert!(!Format::Xml.is_flat_only());
    }

    #[test]
    fn test_value_to_text() {
        assert_eq!(value_to_text(&json!(null)), None);
        assert_eq!(value_to_text(&json!("x")).as_deref(), Some("x"));
        assert_eq!(value_to_text(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(value_to_text(&json!(false)).as_deref(), Some("false"));
        assert_eq!(value_to_text(&json!([1, 2])).as_deref(), Some("[1,2]"));
    }
}
