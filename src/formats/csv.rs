//! Delimited-text codec.
//!
//! Every cell reads back as a string; the first row is always the header.

use super::{value_to_text, Format, FormatAdapter};
use crate::error::{ConvertError, Result};
use crate::types::{Dataset, Loaded, Record, RelationSelector};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

pub struct CsvAdapter;

impl CsvAdapter {
    /// Parse delimited text from any reader
    pub fn read_from<R: Read>(reader: R) -> std::result::Result<Dataset, csv::Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let mut dataset = Dataset::default();

        for row in csv_reader.records() {
            let row = row?;
            let record: Record = headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), Value::String(v.to_string())))
                .collect();
            dataset.push(record);
        }

        Ok(dataset)
    }

    /// Write a header row plus one row per record
    pub fn write_to<W: Write>(dataset: &Dataset, writer: W) -> std::result::Result<(), csv::Error> {
        let headers = dataset.field_names();
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        csv_writer.write_record(&headers)?;
        for record in dataset.records() {
            let row = headers.iter().map(|h| {
                record
                    .get(h.as_str())
                    .and_then(value_to_text)
                    .unwrap_or_default()
            });
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl FormatAdapter for CsvAdapter {
    fn read(&self, source: &Path, _selector: Option<&RelationSelector>) -> Result<Loaded> {
        let file = File::open(source).map_err(|e| ConvertError::from_read_io(source, Format::Csv, e))?;
        let dataset = Self::read_from(BufReader::new(file))
            .map_err(|e| ConvertError::malformed(source, Format::Csv, e))?;

        tracing::debug!(path = %source.display(), rows = dataset.len(), "read csv");
        Ok(Loaded::Single(dataset))
    }

    fn write(&self, dataset: &Dataset, destination: &Path) -> Result<()> {
        // Records with no fields at all have no header to write either.
        if dataset.is_empty() || dataset.field_names().is_empty() {
            tracing::debug!(path = %destination.display(), "no fields, nothing to write");
            return Ok(());
        }

        let file = File::create(destination).map_err(|e| ConvertError::unwritable(destination, e))?;
        Self::write_to(dataset, file).map_err(|e| ConvertError::unwritable(destination, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_read_basic() {
        let input = "name,age\nAlice,30\n\"Bob, Jr\",25\n";
        let d = CsvAdapter::read_from(Cursor::new(input)).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.records()[0]["name"], "Alice");
        assert_eq!(d.records()[0]["age"], "30");
        assert_eq!(d.records()[1]["name"], "Bob, Jr");
    }

    #[test]
    fn test_read_keeps_header_order() {
        let d = CsvAdapter::read_from(Cursor::new("z,a,m\n1,2,3\n")).unwrap();
        let keys: Vec<&String> = d.records()[0].keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_read_ragged_row_is_error() {
        let result = CsvAdapter::read_from(Cursor::new("a,b\n1,2,3\n"));
        assert!(result.is_err());
    }

    #[test]
    fn test_read_empty() {
        let d = CsvAdapter::read_from(Cursor::new("")).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn test_write_nulls_and_missing_as_empty() {
        let d = dataset(json!([
            {"a": 1, "b": null},
            {"a": true, "c": "x"}
        ]));
        let mut out = Vec::new();
        CsvAdapter::write_to(&d, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "a,b,c\n1,,\ntrue,,x\n");
    }

    #[test]
    fn test_write_escapes() {
        let d = dataset(json!([{"quote": "say \"hi\"", "comma": "a,b"}]));
        let mut out = Vec::new();
        CsvAdapter::write_to(&d, &mut out).unwrap();
        let back = CsvAdapter::read_from(Cursor::new(out)).unwrap();
        assert_eq!(back.records()[0]["quote"], "say \"hi\"");
        assert_eq!(back.records()[0]["comma"], "a,b");
    }

    #[test]
    fn test_fieldless_records_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        CsvAdapter.write(&dataset(json!([{}, {}, {}])), &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file() {
        let err = CsvAdapter
            .read(Path::new("/definitely/not/here.csv"), None)
            .unwrap_err();
        assert!(matches!(err, ConvertError::SourceNotFound { .. }));
    }
}
