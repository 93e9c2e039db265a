//! Conversion orchestration
//!
//! Reads a source, decides per relation whether its structure survives the
//! destination encoding, flattens when the caller has agreed to it, and
//! writes. A dataset that would lose structure is never flattened silently:
//! the first attempt returns [`Outcome::StructuralWarning`] and the caller
//! retries with `force_flatten` once the user confirms.

pub mod report;

pub use report::{ConversionReport, RelationReport};

use crate::analyze::{classify, StructuralClass};
use crate::error::Result;
use crate::flatten::Flattener;
use crate::formats::{file_stem, Format};
use crate::types::{ConvertConfig, Dataset, Loaded, RelationSelector};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::instrument;

/// Parameters of one conversion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub source_format: Format,
    pub dest_format: Format,
    pub relation: Option<RelationSelector>,
    pub force_flatten: bool,
}

impl ConvertRequest {
    /// Build a request, detecting both formats from the file extensions
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let destination = destination.into();
        let source_format = Format::from_path(&source)?;
        let dest_format = Format::from_path(&destination)?;
        Ok(Self::with_formats(source, destination, source_format, dest_format))
    }

    pub fn with_formats(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        source_format: Format,
        dest_format: Format,
    ) -> Self {
        ConvertRequest {
            source: source.into(),
            destination: destination.into(),
            source_format,
            dest_format,
            relation: None,
            force_flatten: false,
        }
    }

    pub fn with_relation(mut self, relation: RelationSelector) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn with_force_flatten(mut self, force: bool) -> Self {
        self.force_flatten = force;
        self
    }
}

/// The pause point returned when flattening would be needed but was not
/// authorised. Nothing has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralWarning {
    /// Relations that need flattening; empty for single-relation sources
    pub relations: Vec<String>,
    pub dest_format: Format,
}

impl std::fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Nested data detected in {} output", self.dest_format)?;
        if !self.relations.is_empty() {
            write!(f, " (tables: {})", self.relations.join(", "))?;
        }
        Ok(())
    }
}

/// Non-error result of a conversion
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(ConversionReport),
    StructuralWarning(StructuralWarning),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// One relation staged for writing
struct Staged {
    relation: Option<String>,
    destination: PathBuf,
    dataset: Dataset,
    needs_flattening: bool,
}

/// Runs conversions; holds configuration only
pub struct Converter {
    flattener: Flattener,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Converter {
            flattener: Flattener::new(config.flatten),
        }
    }

    /// Convert `request.source` into `request.destination`
    #[instrument(skip(self, request), fields(source = %request.source.display(), destination = %request.destination.display()))]
    pub fn convert(&self, request: &ConvertRequest) -> Result<Outcome> {
        tracing::info!(
            "Starting conversion from {} to {}",
            request.source_format,
            request.dest_format
        );
        let start = Instant::now();

        let result = self.run(request, start);
        match &result {
            Ok(Outcome::Success(report)) => tracing::info!(
                rows = report.rows(),
                relations = report.relations.len(),
                flattened = report.flattened(),
                "Conversion completed successfully in {:.2} ms",
                report.elapsed_ms()
            ),
            Ok(Outcome::StructuralWarning(warning)) => tracing::warn!("{}", warning),
            Err(e) => tracing::error!("An error occurred: {}", e),
        }
        result
    }

    fn run(&self, request: &ConvertRequest, start: Instant) -> Result<Outcome> {
        let loaded = request
            .source_format
            .adapter()
            .read(&request.source, request.relation.as_ref())?;
        self.execute(loaded, request, start)
    }

    /// Decide and write every relation of an already-loaded source
    fn execute(&self, loaded: Loaded, request: &ConvertRequest, start: Instant) -> Result<Outcome> {
        let staged = self.stage(loaded, request);

        let blocked: Vec<&Staged> = staged
            .iter()
            .filter(|s| s.needs_flattening && !request.force_flatten)
            .collect();
        if !blocked.is_empty() {
            return Ok(Outcome::StructuralWarning(StructuralWarning {
                relations: blocked.iter().filter_map(|s| s.relation.clone()).collect(),
                dest_format: request.dest_format,
            }));
        }

        let writer = request.dest_format.adapter();
        let mut relations = Vec::with_capacity(staged.len());

        for item in staged {
            let dataset = if item.needs_flattening {
                tracing::debug!(relation = ?item.relation, "flattening irregular dataset");
                self.flattener.flatten(item.dataset)
            } else {
                item.dataset
            };

            // First failure aborts the remaining relations.
            writer.write(&dataset, &item.destination)?;
            tracing::debug!(
                relation = ?item.relation,
                destination = %item.destination.display(),
                rows = dataset.len(),
                "relation written"
            );

            relations.push(RelationReport {
                relation: item.relation,
                destination: item.destination,
                rows: dataset.len(),
                flattened: item.needs_flattening,
            });
        }

        Ok(Outcome::Success(ConversionReport {
            relations,
            elapsed: start.elapsed(),
        }))
    }

    fn stage(&self, loaded: Loaded, request: &ConvertRequest) -> Vec<Staged> {
        let staged = |relation: Option<String>, destination: PathBuf, dataset: Dataset| {
            let needs_flattening = needs_flattening(&dataset, request.dest_format);
            Staged {
                relation,
                destination,
                dataset,
                needs_flattening,
            }
        };

        match loaded {
            Loaded::Single(dataset) => vec![staged(None, request.destination.clone(), dataset)],
            Loaded::Relations(set) => {
                if set.is_empty() {
                    tracing::warn!(source = %request.source.display(), "source has no tables");
                }
                set.into_iter()
                    .map(|(name, dataset)| {
                        let destination = relation_destination(&request.destination, &name);
                        staged(Some(name), destination, dataset)
                    })
                    .collect()
            }
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter::new(ConvertConfig::default())
    }
}

/// Whether writing `dataset` as `dest` would lose structure
pub fn needs_flattening(dataset: &Dataset, dest: Format) -> bool {
    dest.is_flat_only() && !dataset.is_empty() && classify(dataset) == StructuralClass::Irregular
}

/// Destination for one relation of a multi-relation source:
/// `dir/base.ext` becomes `dir/base_relation.ext`
pub fn relation_destination(base: &Path, relation: &str) -> PathBuf {
    let relation: String = relation
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", file_stem(base), relation, ext),
        None => format!("{}_{}", file_stem(base), relation),
    };
    base.with_file_name(name)
}
