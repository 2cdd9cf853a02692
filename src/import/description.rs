//! Description importer
//!
//! Imports description documents written in JSON or YAML. A document is
//! either a full description (`{name, apiVersion, baseUrl, operations}`) or a
//! bare mapping of operation name to definition.

use serde_json::Value;
use std::path::Path;
use tracing::info;

use super::{DescriptionFormat, ImportError};
use crate::models::Description;

/// Description importer
#[derive(Debug, Default)]
pub struct DescriptionImporter;

impl DescriptionImporter {
    /// Create a new importer
    ///
    /// # Example
    ///
    /// ```rust
    /// use service_description::import::DescriptionImporter;
    ///
    /// let importer = DescriptionImporter::new();
    /// let description = importer
    ///     .import(r#"{"operations": {"Ping": {"httpMethod": "GET", "uri": "/ping"}}}"#)
    ///     .unwrap();
    /// assert!(description.has_operation("Ping"));
    /// ```
    pub fn new() -> Self {
        Self
    }

    /// Detect format (JSON or YAML) from content
    pub fn detect_format(&self, content: &str) -> DescriptionFormat {
        // JSON is stricter, so try it first
        if serde_json::from_str::<Value>(content).is_ok() {
            DescriptionFormat::Json
        } else {
            DescriptionFormat::Yaml
        }
    }

    /// Parse content into a raw document
    pub fn parse(&self, content: &str, format: DescriptionFormat) -> Result<Value, ImportError> {
        match format {
            DescriptionFormat::Json => serde_json::from_str(content)
                .map_err(|e| ImportError::ParseError(format!("Invalid JSON description: {}", e))),
            DescriptionFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ImportError::ParseError(format!("Invalid YAML description: {}", e))),
        }
    }

    /// Import a description from JSON or YAML content
    pub fn import(&self, content: &str) -> Result<Description, ImportError> {
        let format = self.detect_format(content);
        let document = self.parse(content, format)?;
        self.import_value(&document)
    }

    /// Import a description from an already parsed document.
    ///
    /// Documents with an `operations` key are read as full descriptions;
    /// anything else is read as a bare operation mapping.
    pub fn import_value(&self, document: &Value) -> Result<Description, ImportError> {
        let description = if document.get("operations").is_some() {
            Description::from_document(document)?
        } else {
            Description::new(document)?
        };
        Ok(description)
    }

    /// Import a description file; the format follows the file extension,
    /// falling back to content detection.
    pub fn import_file(&self, path: &Path) -> Result<Description, ImportError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ImportError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;

        let format = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => DescriptionFormat::Json,
            Some("yaml") | Some("yml") => DescriptionFormat::Yaml,
            _ => self.detect_format(&content),
        };
        let document = self.parse(&content, format)?;
        let description = self.import_value(&document)?;

        info!(
            "Imported {} operations from {}",
            description.len(),
            path.display()
        );
        Ok(description)
    }
}
