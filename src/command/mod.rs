//! Command execution
//!
//! Provides the per-invocation pieces of the execution pipeline:
//! - [`Command`]: an operation name plus its parameters
//! - [`CommandTransaction`]: the mutable context of one invocation
//! - [`PrepareEvent`]: the "before execution" interception point
//! - [`CommandExecutor`]: runs commands through the prepare step and a [`Transport`]
//!
//! The transport and the client object are external; they are represented
//! here only by the [`Transport`] and [`ServiceClient`] traits.

pub mod event;
pub mod executor;
pub mod transaction;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::FilterError;
use crate::models::Description;

pub use event::{Emitter, EventName, PrepareEvent, PrepareOutcome, PrepareSubscriber, Priority};
pub use executor::{CommandExecutor, Transport, prepare_params};
pub use transaction::{CommandTransaction, TransactionState};

/// Error raised while executing a command
///
/// Failures injected by a mock and failures produced by a real transport use
/// the same variants, so the pipeline cannot tell them apart.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Filter(#[from] FilterError),
    /// A result was requested from an empty mock queue
    #[error("Mock queue is empty")]
    Underflow,
    /// Failure reported by the remote side
    #[error("{message}")]
    Remote { message: String, code: Option<u16> },
    #[error("Transport error: {0}")]
    Transport(String),
}

impl CommandError {
    /// Remote failure with a message only
    pub fn remote(message: impl Into<String>) -> Self {
        CommandError::Remote {
            message: message.into(),
            code: None,
        }
    }

    /// Remote failure carrying an HTTP status code
    pub fn remote_with_code(message: impl Into<String>, code: u16) -> Self {
        CommandError::Remote {
            message: message.into(),
            code: Some(code),
        }
    }
}

/// A named operation invocation with its parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    name: String,
    #[serde(default)]
    params: Map<String, Value>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Builder-style parameter setter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// Request representation handed to the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The client a command is executed against
pub trait ServiceClient: Send + Sync {
    /// Description the client resolves operations from, if it has one
    fn description(&self) -> Option<&Description> {
        None
    }

    /// Base URL overriding the description's `baseUrl`
    fn base_url(&self) -> Option<&str> {
        None
    }
}

/// Client backed by a description, with an optional base URL override
#[derive(Debug, Clone)]
pub struct DescriptionClient {
    description: Description,
    base_url: Option<String>,
}

impl DescriptionClient {
    pub fn new(description: Description) -> Self {
        Self {
            description,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

impl ServiceClient for DescriptionClient {
    fn description(&self) -> Option<&Description> {
        Some(&self.description)
    }

    fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_builder() {
        let command = Command::new("PutObject")
            .with_param("Bucket", "logs")
            .with_param("Size", 12);
        assert_eq!(command.name(), "PutObject");
        assert_eq!(command.get("Bucket"), Some(&json!("logs")));
        assert_eq!(command.params().len(), 2);
    }

    #[test]
    fn test_remote_error_displays_message_only() {
        assert_eq!(CommandError::remote("Foo").to_string(), "Foo");
        assert_eq!(CommandError::Underflow.to_string(), "Mock queue is empty");
    }
}
