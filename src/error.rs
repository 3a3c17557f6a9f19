//! Error taxonomy for the indexing core.
//!
//! Per-file failures ([`IndexError::UnsupportedType`], [`IndexError::Extraction`])
//! are collected by the scanner and reported as data. Everything else is
//! returned to the caller of the failing operation.

use std::path::PathBuf;

use thiserror::Error;

use crate::extract::ExtractError;

/// Result alias used by the indexing core.
pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    /// No extractor is registered for this extension. The file is skipped.
    #[error("unsupported file type: {extension}")]
    UnsupportedType { extension: String },

    /// The file was recognized but its content could not be turned into text.
    #[error("failed to extract {}: {cause}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        cause: ExtractError,
    },

    /// The scan root itself is unusable.
    #[error("cannot scan {}: {reason}", path.display())]
    Scan { path: PathBuf, reason: String },

    #[error("invalid regex pattern '{pattern}': {cause}")]
    InvalidPattern { pattern: String, cause: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("document not found: {0}")]
    NotFound(String),
}

impl IndexError {
    /// Short machine-readable code used by the tool surfaces.
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::UnsupportedType { .. } => "unsupported_type",
            IndexError::Extraction { .. } => "extraction_error",
            IndexError::Scan { .. } => "scan_error",
            IndexError::InvalidPattern { .. } => "invalid_pattern",
            IndexError::InvalidQuery(_) => "invalid_query",
            IndexError::NotFound(_) => "not_found",
        }
    }
}
