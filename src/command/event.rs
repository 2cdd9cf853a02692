//! The prepare event
//!
//! [`PrepareEvent`] is fired once per transaction before the transport runs.
//! A subscriber may:
//! - leave the transaction alone, so the real execution path handles it
//! - set a result, which short-circuits the transport and the remaining subscribers
//! - return an error, which fails the command just as a transport failure would

use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::{CommandError, CommandTransaction};

/// Events a subscriber can listen to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    /// Fired before a transaction is executed
    Prepare,
}

/// Listener priority; higher values run first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    pub const FIRST: Priority = Priority(100);
    pub const EARLY: Priority = Priority(50);
    pub const DEFAULT: Priority = Priority(0);
    pub const LATE: Priority = Priority(-50);
    pub const LAST: Priority = Priority(-100);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::DEFAULT
    }
}

/// Event carrying the transaction about to be executed
#[derive(Debug)]
pub struct PrepareEvent<'a> {
    transaction: &'a mut CommandTransaction,
    propagation_stopped: bool,
    resolved: bool,
}

impl<'a> PrepareEvent<'a> {
    pub fn new(transaction: &'a mut CommandTransaction) -> Self {
        Self {
            transaction,
            propagation_stopped: false,
            resolved: false,
        }
    }

    pub fn transaction(&self) -> &CommandTransaction {
        &*self.transaction
    }

    /// Assign the transaction's result and stop further processing
    pub fn set_result(&mut self, result: Value) {
        self.transaction.set_result(result);
        self.propagation_stopped = true;
        self.resolved = true;
    }

    /// Whether a subscriber set a result during this event
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn result(&self) -> Option<&Value> {
        self.transaction.result()
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Component that listens to the prepare event
pub trait PrepareSubscriber: Send + Sync {
    /// Events this subscriber listens to and at which priority
    fn events(&self) -> Vec<(EventName, Priority)>;

    /// Handle the prepare event for one transaction
    fn on_prepare(&self, event: &mut PrepareEvent<'_>) -> Result<(), CommandError>;
}

/// What the prepare step did with a transaction
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareOutcome {
    /// No subscriber handled it; the transport must run
    Pending,
    /// A subscriber set a result
    Resolved,
    /// A subscriber failed the command
    Failed(CommandError),
}

/// Dispatches the prepare event to attached subscribers by priority
#[derive(Default)]
pub struct Emitter {
    listeners: Vec<(Priority, Arc<dyn PrepareSubscriber>)>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for every event it declares.
    ///
    /// Listeners with equal priority run in attach order.
    pub fn attach(&mut self, subscriber: Arc<dyn PrepareSubscriber>) {
        for (event, priority) in subscriber.events() {
            match event {
                EventName::Prepare => self.listeners.push((priority, Arc::clone(&subscriber))),
            }
        }
        // Stable sort keeps attach order among equal priorities
        self.listeners.sort_by(|a, b| b.0.cmp(&a.0));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fire the prepare event for `transaction`.
    ///
    /// The outcome reflects this emit only; a result left on the transaction
    /// by an earlier run does not make it `Resolved`.
    pub fn emit_prepare(&self, transaction: &mut CommandTransaction) -> PrepareOutcome {
        let id = transaction.id();
        let mut event = PrepareEvent::new(transaction);
        for (priority, listener) in &self.listeners {
            if let Err(error) = listener.on_prepare(&mut event) {
                debug!("Prepare listener at {:?} failed transaction {}: {}", priority, id, error);
                return PrepareOutcome::Failed(error);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        if event.is_resolved() {
            PrepareOutcome::Resolved
        } else {
            PrepareOutcome::Pending
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let priorities: Vec<i32> = self.listeners.iter().map(|(p, _)| p.0).collect();
        f.debug_struct("Emitter")
            .field("priorities", &priorities)
            .finish()
    }
}
