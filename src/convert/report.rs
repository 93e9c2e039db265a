use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one relation during a conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationReport {
    /// Relation name, `None` for single-relation sources
    pub relation: Option<String>,
    pub destination: PathBuf,
    pub rows: usize,
    pub flattened: bool,
}

/// Summary of a successful conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    pub relations: Vec<RelationReport>,
    pub elapsed: Duration,
}

impl ConversionReport {
    /// Records written across every relation
    pub fn rows(&self) -> usize {
        self.relations.iter().map(|r| r.rows).sum()
    }

    pub fn flattened(&self) -> bool {
        self.relations.iter().any(|r| r.flattened)
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }

    /// Records per second; undefined for zero rows or zero elapsed time
    pub fn throughput(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        let rows = self.rows();
        if rows == 0 || secs <= 0.0 {
            return None;
        }
        Some(rows as f64 / secs)
    }
}
