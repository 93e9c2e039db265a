//! Error taxonomy shared by the adapters, the orchestrator and the generator.
//!
//! A structural warning is not listed here. It is returned as a normal
//! [`crate::convert::Outcome`].

use crate::formats::Format;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything that can stop a conversion or a generation run.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The source path does not exist.
    #[error("Input file not found: {}", path.display())]
    SourceNotFound { path: PathBuf },

    /// The source exists but violates its encoding's syntax.
    #[error("Invalid {format} format in {}: {reason}", path.display())]
    MalformedSource {
        path: PathBuf,
        format: Format,
        reason: String,
    },

    /// The destination could not be created or written.
    #[error("Unable to write to file {}: {reason}", path.display())]
    DestinationUnwritable { path: PathBuf, reason: String },

    /// The requested format is not one of the supported encodings.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The relation selector names a relation the source does not have.
    #[error("Table '{name}' does not exist in {}", path.display())]
    RelationNotFound { name: String, path: PathBuf },

    /// The value generator could not produce data.
    #[error("Data generation failed: {0}")]
    GenerationFailed(String),
}

impl ConvertError {
    pub fn malformed(path: &Path, format: Format, reason: impl ToString) -> Self {
        ConvertError::MalformedSource {
            path: path.to_path_buf(),
            format,
            reason: reason.to_string(),
        }
    }

    pub fn unwritable(path: &Path, reason: impl ToString) -> Self {
        ConvertError::DestinationUnwritable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Classify an I/O failure raised while reading a source.
    pub fn from_read_io(path: &Path, format: Format, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            ConvertError::SourceNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConvertError::malformed(path, format, err)
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ConvertError>;
