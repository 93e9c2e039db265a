//! Mock data generation
//!
//! A [`GenConfig`] names the output columns and a pattern per column. Any
//! [`ValueGenerator`] turns those into a dataset, which [`generate_to`]
//! writes through the regular format adapters.

pub mod pattern;

pub use pattern::{Pattern, PatternGenerator};

use crate::convert::{ConversionReport, RelationReport};
use crate::error::{ConvertError, Result};
use crate::formats::Format;
use crate::types::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// One output column and the pattern its values follow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPattern {
    pub name: String,
    pub pattern: String,
}

impl FieldPattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        FieldPattern {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Source of synthetic records
pub trait ValueGenerator {
    /// Produce `rows` records with one field per pattern, in order
    fn generate(&self, fields: &[FieldPattern], rows: usize) -> Result<Dataset>;
}

/// Contents of `genconfig.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenConfig {
    pub headers: Vec<String>,
    #[serde(default)]
    pub patterns: HashMap<String, String>,
}

impl GenConfig {
    pub const DEFAULT_PATH: &'static str = "genconfig.json";

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => ConvertError::GenerationFailed(format!("cannot read {}: {}", path.display(), e)),
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ConvertError::GenerationFailed(format!("invalid generator config {}: {}", path.display(), e))
        })
    }

    /// Headers paired with their patterns, in header order
    pub fn fields(&self) -> Result<Vec<FieldPattern>> {
        self.headers
            .iter()
            .map(|header| {
                self.patterns
                    .get(header)
                    .map(|pattern| FieldPattern::new(header.clone(), pattern.clone()))
                    .ok_or_else(|| {
                        ConvertError::GenerationFailed(format!("no pattern for header {:?}", header))
                    })
            })
            .collect()
    }
}

/// Generate `rows` records and write them to `destination`
pub fn generate_to(
    generator: &dyn ValueGenerator,
    config: &GenConfig,
    rows: usize,
    destination: &Path,
    format: Format,
) -> Result<ConversionReport> {
    tracing::info!("Starting data generation for {} rows", rows);
    let start = Instant::now();

    let fields = config.fields()?;
    let dataset = generator.generate(&fields, rows)?;
    format.adapter().write(&dataset, destination)?;

    let report = ConversionReport {
        relations: vec![RelationReport {
            relation: None,
            destination: destination.to_path_buf(),
            rows: dataset.len(),
            flattened: false,
        }],
        elapsed: start.elapsed(),
    };
    tracing::info!(
        path = %destination.display(),
        "Data generation completed in {:.2} ms",
        report.elapsed_ms()
    );
    Ok(report)
}
