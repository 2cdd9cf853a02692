//! Service Description - declarative descriptions of remote service operations
//!
//! Provides:
//! - Schema objects for operations and their typed parameters
//! - Import of descriptions from JSON/YAML documents
//! - A command pipeline with a "before execution" interception point
//! - A result mock that answers commands from a queue of canned outcomes
//! - Workspace configuration

pub mod command;
pub mod config;
pub mod filter;
pub mod import;
pub mod models;
pub mod subscriber;

// Re-export commonly used types
pub use command::{
    Command, CommandError, CommandExecutor, CommandTransaction, DescriptionClient, PrepareEvent,
    PrepareOutcome, PrepareSubscriber, Priority, Request, ServiceClient, Transport,
};
pub use config::{ConfigError, ServiceConfig};
pub use filter::{FilterError, FilterRegistry, FilterSpec, Filters};
pub use import::{DescriptionFormat, DescriptionImporter, ImportError};
pub use subscriber::{MockEntry, ResultMock};

// Re-export models
pub use models::enums::*;
pub use models::{
    AdditionalParameters, Description, DescriptionError, DescriptionMetadata, ErrorResponse,
    Operation, Parameter, ParentRef,
};
