//! Import functionality
//!
//! Loads service descriptions from documents:
//! - JSON
//! - YAML

pub mod description;

use crate::models::DescriptionError;

/// Error during import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error(transparent)]
    InvalidDescription(#[from] DescriptionError),
}

/// Document format of a description
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionFormat {
    Json,
    Yaml,
}

// Re-export for convenience
pub use description::DescriptionImporter;
