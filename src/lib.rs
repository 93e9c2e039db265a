//! # Recast - Structural Format Conversion
//!
//! Converts record-oriented datasets between CSV, JSON, XML and SQLite, and
//! reconciles nested or ragged data with the flat encodings that cannot hold
//! it.
//!
//! ## Modules
//!
//! - **types**: the shared record model
//! - **analyze**: regular vs. irregular classification
//! - **flatten**: nested records into one flat schema
//! - **formats**: one codec per encoding
//! - **convert**: read, classify, flatten or warn, write
//! - **generate**: pattern-driven mock data
//! - **profile**: per-column summaries
//!
//! ## Quick Start
//!
//! ```rust
//! use recast::{Converter, ConvertRequest, Format, Outcome};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let source = dir.path().join("users.json");
//! let destination = dir.path().join("users.csv");
//! std::fs::write(&source, r#"[{"id": 1, "user": {"name": "A"}}]"#)?;
//!
//! let converter = Converter::default();
//! let request = ConvertRequest::with_formats(&source, &destination, Format::Json, Format::Csv);
//!
//! // Nested data headed for CSV pauses for confirmation first
//! let first = converter.convert(&request)?;
//! assert!(matches!(first, Outcome::StructuralWarning(_)));
//!
//! let outcome = converter.convert(&request.with_force_flatten(true))?;
//! assert!(outcome.is_success());
//! assert_eq!(std::fs::read_to_string(&destination)?, "id,user_name\n1,A\n");
//! # Ok(())
//! # }
//! ```

pub mod analyze;
pub mod convert;
pub mod error;
pub mod flatten;
pub mod formats;
pub mod generate;
pub mod profile;
pub mod types;

// Re-export commonly used types for convenience
pub use analyze::{classify, StructuralClass};
pub use convert::{ConversionReport, ConvertRequest, Converter, Outcome, StructuralWarning};
pub use error::{ConvertError, Result};
pub use flatten::Flattener;
pub use formats::{Format, FormatAdapter};
pub use generate::{generate_to, FieldPattern, GenConfig, PatternGenerator, ValueGenerator};
pub use profile::{profile, DatasetProfile};
pub use types::{ConvertConfig, Dataset, FlattenConfig, Loaded, Record, RelationSelector, RelationSet};

/// Main entry point: convert `source` to `destination`, detecting both
/// formats from their extensions
pub fn convert_file(
    source: impl Into<std::path::PathBuf>,
    destination: impl Into<std::path::PathBuf>,
    force_flatten: bool,
) -> Result<Outcome> {
    let request = ConvertRequest::new(source, destination)?.with_force_flatten(force_flatten);
    Converter::default().convert(&request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_file_detects_formats() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("in.csv");
        let destination = dir.path().join("out.json");
        std::fs::write(&source, "name,age\nAlice,30\n").unwrap();

        let outcome = convert_file(&source, &destination, false).unwrap();
        let Outcome::Success(report) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(report.rows(), 1);
        assert!(!report.flattened());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&destination).unwrap()).unwrap();
        assert_eq!(written, serde_json::json!([{"name": "Alice", "age": "30"}]));
    }

    #[test]
    fn test_convert_file_unknown_extension() {
        let err = convert_file("in.parquet", "out.csv", false).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedFormat(_)));
    }
}
