//! Command executor
//!
//! Runs a [`Command`] through the pipeline:
//! 1. resolve the operation from the client's description
//! 2. apply defaults and filters to the parameters
//! 3. build the request
//! 4. fire the prepare event
//! 5. fall through to the transport when nothing intercepted the command

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::event::{Emitter, PrepareOutcome, PrepareSubscriber};
use super::{Command, CommandError, CommandTransaction, Request, ServiceClient};
use crate::filter::FilterRegistry;
use crate::models::{AdditionalParameters, Operation};

/// Performs the real remote call for a transaction
pub trait Transport: Send + Sync {
    fn send(&self, transaction: &CommandTransaction) -> Result<Value, CommandError>;
}

/// Resolve the parameters of a command against an operation's schema.
///
/// `null` values count as absent. Declared parameters get their default when
/// absent, are checked for presence when required and run through their
/// filter chain. Undeclared keys go through the `additionalParameters`
/// schema, pass unchecked when it is `true`, and are rejected otherwise.
pub fn prepare_params(
    operation: &Operation,
    params: &Map<String, Value>,
    filters: &FilterRegistry,
) -> Result<Map<String, Value>, CommandError> {
    let mut prepared = Map::new();

    for (name, param) in operation.params() {
        match param.process_value(params.get(name).cloned(), filters)? {
            Some(value) => {
                prepared.insert(name.clone(), value);
            }
            None if param.is_required() => {
                return Err(CommandError::MissingParameter(name.clone()));
            }
            None => {}
        }
    }

    for (key, value) in params {
        if operation.has_param(key) || value.is_null() {
            continue;
        }
        match operation.additional_parameters_declaration() {
            Some(AdditionalParameters::Schema(schema)) => {
                if let Some(value) = schema.process_value(Some(value.clone()), filters)? {
                    prepared.insert(key.clone(), value);
                }
            }
            Some(declaration) if declaration.allows_unchecked() => {
                prepared.insert(key.clone(), value.clone());
            }
            _ => {
                return Err(CommandError::Validation(format!(
                    "'{}' is not a parameter of {}",
                    key,
                    operation.name()
                )));
            }
        }
    }

    Ok(prepared)
}

/// Expand `{name}` placeholders in a URI template from `params`.
/// Placeholders without a matching scalar parameter are left as-is.
fn expand_uri(template: &str, params: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let key = &rest[start + 1..start + len];
        out.push_str(&rest[..start]);
        match params.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(value @ (Value::Number(_) | Value::Bool(_))) => out.push_str(&value.to_string()),
            _ => out.push_str(&rest[start..=start + len]),
        }
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

fn join_url(base: &str, path: &str) -> String {
    match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        ),
    }
}

/// Executes commands against one client
pub struct CommandExecutor {
    client: Arc<dyn ServiceClient>,
    transport: Arc<dyn Transport>,
    emitter: Emitter,
    filters: FilterRegistry,
}

impl CommandExecutor {
    /// Create an executor using the built-in filter registry
    pub fn new(client: Arc<dyn ServiceClient>, transport: Arc<dyn Transport>) -> Self {
        Self {
            client,
            transport,
            emitter: Emitter::new(),
            filters: FilterRegistry::new(),
        }
    }

    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = filters;
        self
    }

    /// Attach a prepare subscriber (e.g. a result mock)
    pub fn attach(&mut self, subscriber: Arc<dyn PrepareSubscriber>) -> &mut Self {
        self.emitter.attach(subscriber);
        self
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Build the transaction for a command without running it
    pub fn prepare(&self, command: Command) -> Result<CommandTransaction, CommandError> {
        let description = self.client.description();
        let operation = match description {
            Some(description) => Some(
                description
                    .operation(command.name())
                    .ok_or_else(|| CommandError::UnknownOperation(command.name().to_string()))?,
            ),
            None => None,
        };

        let (command, request) = match operation {
            Some(operation) => {
                let params = prepare_params(operation, command.params(), &self.filters)?;
                let base = self
                    .client
                    .base_url()
                    .or_else(|| description.and_then(|d| d.base_url()))
                    .unwrap_or_default();
                let method = match operation.http_method() {
                    "" => "GET",
                    method => method,
                };
                let url = join_url(base, &expand_uri(operation.uri(), &params));
                let command = Command::new(command.name()).with_params(params);
                (command, Request::new(method, url))
            }
            None => {
                let url = self.client.base_url().unwrap_or_default().to_string();
                (command, Request::new("GET", url))
            }
        };

        Ok(CommandTransaction::new(
            Arc::clone(&self.client),
            command,
            request,
        ))
    }

    /// Execute a command and return its result
    pub fn execute(&self, command: Command) -> Result<Value, CommandError> {
        let mut transaction = self.prepare(command)?;
        self.run(&mut transaction)
    }

    /// Run an already prepared transaction through the prepare event and the transport
    pub fn run(&self, transaction: &mut CommandTransaction) -> Result<Value, CommandError> {
        debug!(
            "Executing {} as transaction {}",
            transaction.command().name(),
            transaction.id()
        );

        match self.emitter.emit_prepare(transaction) {
            PrepareOutcome::Resolved => {
                return transaction
                    .result()
                    .cloned()
                    .ok_or_else(|| CommandError::Transport("resolved without a result".to_string()));
            }
            PrepareOutcome::Failed(CommandError::Underflow) => {
                warn!(
                    "No queued result for {} (transaction {})",
                    transaction.command().name(),
                    transaction.id()
                );
                return Err(CommandError::Underflow);
            }
            PrepareOutcome::Failed(error) => {
                transaction.set_failure(error.clone());
                return Err(error);
            }
            PrepareOutcome::Pending => {}
        }

        match self.transport.send(transaction) {
            Ok(result) => {
                transaction.set_result(result.clone());
                Ok(result)
            }
            Err(error) => {
                transaction.set_failure(error.clone());
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("emitter", &self.emitter)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
