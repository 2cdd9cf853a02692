//! Configuration file support
//!
//! Handles parsing of `.service-description.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::command::DescriptionClient;
use crate::import::{DescriptionImporter, ImportError};
use crate::models::Description;
use crate::subscriber::ResultMock;

/// Default description document filename
pub const DEFAULT_DESCRIPTION_FILENAME: &str = "service.json";

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".service-description.toml";

/// Environment variable for the description document path
pub const ENV_DESCRIPTION_PATH: &str = "SERVICE_DESCRIPTION_PATH";

/// Environment variable for the mock fixture path
pub const ENV_MOCK_FIXTURE: &str = "SERVICE_MOCK_FIXTURE";

/// Environment variable enabling the result mock
pub const ENV_MOCK_ENABLED: &str = "SERVICE_MOCK_ENABLED";

/// Error type for configuration handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Configuration error: {0}")]
    ParseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Description configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptionSection {
    /// Path to the description document (relative to workspace)
    #[serde(default = "default_description_path")]
    pub path: String,

    /// Base URL overriding the document's `baseUrl`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_description_path() -> String {
    DEFAULT_DESCRIPTION_FILENAME.to_string()
}

impl Default for DescriptionSection {
    fn default() -> Self {
        Self {
            path: default_description_path(),
            base_url: None,
        }
    }
}

/// Result mock configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MockSection {
    /// Answer commands from the mock queue instead of the transport
    #[serde(default)]
    pub enabled: bool,

    /// Fixture file the queue is loaded from (relative to workspace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
}

/// Main configuration structure
///
/// Represents the `.service-description.toml` configuration file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub description: DescriptionSection,

    #[serde(default)]
    pub mock: MockSection,
}

fn resolve(workspace_path: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        workspace_path.join(path)
    }
}

impl ServiceConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a workspace directory
    ///
    /// Looks for `.service-description.toml` in the workspace directory.
    /// Falls back to defaults if not found.
    pub fn load(workspace_path: &Path) -> ConfigResult<Self> {
        let config_path = workspace_path.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a workspace directory
    pub fn save(&self, workspace_path: &Path) -> ConfigResult<()> {
        let config_path = workspace_path.join(CONFIG_FILENAME);
        let content = self.to_toml()?;

        std::fs::write(&config_path, content)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DESCRIPTION_PATH) {
            self.description.path = path;
        }

        if let Ok(fixture) = std::env::var(ENV_MOCK_FIXTURE) {
            self.mock.fixture = Some(fixture);
        }

        if let Ok(enabled) = std::env::var(ENV_MOCK_ENABLED)
            && let Ok(enabled) = enabled.parse()
        {
            self.mock.enabled = enabled;
        }
    }

    /// Get the description document path for a workspace
    pub fn description_path(&self, workspace_path: &Path) -> PathBuf {
        if self.description.path.is_empty() {
            workspace_path.join(DEFAULT_DESCRIPTION_FILENAME)
        } else {
            resolve(workspace_path, &self.description.path)
        }
    }

    /// Load the configured description document
    pub fn load_description(&self, workspace_path: &Path) -> Result<Description, ImportError> {
        DescriptionImporter::new().import_file(&self.description_path(workspace_path))
    }

    /// Client for the configured description, with the base URL override applied
    pub fn client(&self, workspace_path: &Path) -> Result<DescriptionClient, ImportError> {
        let client = DescriptionClient::new(self.load_description(workspace_path)?);
        Ok(match &self.description.base_url {
            Some(base_url) => client.with_base_url(base_url.clone()),
            None => client,
        })
    }

    /// Build the configured result mock.
    ///
    /// Returns `None` when the mock is disabled; an enabled mock without a
    /// fixture starts with an empty queue.
    pub fn result_mock(&self, workspace_path: &Path) -> anyhow::Result<Option<ResultMock>> {
        if !self.mock.enabled {
            return Ok(None);
        }
        match &self.mock.fixture {
            Some(fixture) => {
                ResultMock::from_fixture(&resolve(workspace_path, fixture)).map(Some)
            }
            None => Ok(Some(ResultMock::new())),
        }
    }

    /// Check if configuration exists in a workspace
    pub fn exists(workspace_path: &Path) -> bool {
        workspace_path.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Service Description Configuration

[description]
# Description document (JSON or YAML), relative to workspace or absolute
path = "service.json"

# Override the document's baseUrl
# base_url = "https://api.example.com"

[mock]
# Answer commands from queued results instead of the transport
enabled = false

# Queue fixture: a list of `result:` / `error:` entries
# fixture = "fixtures/results.yaml"
"#
}
