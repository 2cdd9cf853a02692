//! Command transactions

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::{Command, CommandError, Request, ServiceClient};

/// Where a transaction stands
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TransactionState {
    /// No result and no failure yet
    #[default]
    Pending,
    Completed(Value),
    Failed(CommandError),
}

/// Execution context for one invocation of a command against a client
pub struct CommandTransaction {
    id: Uuid,
    client: Arc<dyn ServiceClient>,
    command: Command,
    request: Request,
    state: TransactionState,
}

impl CommandTransaction {
    pub fn new(client: Arc<dyn ServiceClient>, command: Command, request: Request) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            command,
            request,
            state: TransactionState::Pending,
        }
    }

    /// Identifier used to correlate log lines for this invocation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client(&self) -> &Arc<dyn ServiceClient> {
        &self.client
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TransactionState::Pending)
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.state {
            TransactionState::Completed(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&CommandError> {
        match &self.state {
            TransactionState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn set_result(&mut self, result: Value) {
        self.state = TransactionState::Completed(result);
    }

    pub fn set_failure(&mut self, error: CommandError) {
        self.state = TransactionState::Failed(error);
    }

    /// Consume the transaction; `None` while it is still pending
    pub fn into_outcome(self) -> Option<Result<Value, CommandError>> {
        match self.state {
            TransactionState::Pending => None,
            TransactionState::Completed(result) => Some(Ok(result)),
            TransactionState::Failed(error) => Some(Err(error)),
        }
    }
}

impl fmt::Debug for CommandTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTransaction")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("request", &self.request)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
