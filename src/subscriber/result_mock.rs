//! Queued command results for tests
//!
//! [`ResultMock`] holds a FIFO queue of canned results and failures. Attached
//! to an executor, it answers every prepare event with the oldest queued
//! entry, so commands complete (or fail) without touching the transport.

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use crate::command::{CommandError, EventName, PrepareEvent, PrepareSubscriber, Priority};

/// One queued entry
#[derive(Debug, Clone, PartialEq)]
pub enum MockEntry {
    Result(Value),
    Failure(CommandError),
}

impl From<Value> for MockEntry {
    fn from(value: Value) -> Self {
        MockEntry::Result(value)
    }
}

impl From<CommandError> for MockEntry {
    fn from(error: CommandError) -> Self {
        MockEntry::Failure(error)
    }
}

/// Fixture file entry: `{"result": ...}` or `{"error": {"message": ..., "code": ...}}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum FixtureEntry {
    Result(Value),
    Error {
        message: String,
        #[serde(default)]
        code: Option<u16>,
    },
}

impl From<FixtureEntry> for MockEntry {
    fn from(entry: FixtureEntry) -> Self {
        match entry {
            FixtureEntry::Result(value) => MockEntry::Result(value),
            FixtureEntry::Error { message, code } => {
                MockEntry::Failure(CommandError::Remote { message, code })
            }
        }
    }
}

/// FIFO queue of canned results and failures
#[derive(Debug, Default)]
pub struct ResultMock {
    queue: Mutex<VecDeque<MockEntry>>,
}

impl ResultMock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a queue from a JSON or YAML fixture file holding a list of entries.
    ///
    /// # Example fixture
    ///
    /// ```yaml
    /// - result: {id: 1, name: alice}
    /// - error: {message: Throttled, code: 503}
    /// ```
    pub fn from_fixture(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mock fixture {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        // YAML goes through a JSON value so `result:`/`error:` keys read as enum tags
        let raw: Value = if is_json {
            serde_json::from_str(&content).context("Failed to parse JSON mock fixture")?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse YAML mock fixture")?
        };
        let entries: Vec<FixtureEntry> =
            serde_json::from_value(raw).context("Invalid mock fixture entries")?;

        let mock = Self::new();
        mock.add_multiple(entries.into_iter().map(MockEntry::from));
        debug!("Loaded {} mock entries from {}", mock.count(), path.display());
        Ok(mock)
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<MockEntry>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a result
    pub fn add_result(&self, result: impl Into<Value>) -> &Self {
        self.lock().push_back(MockEntry::Result(result.into()));
        self
    }

    /// Queue a failure
    pub fn add_exception(&self, error: CommandError) -> &Self {
        self.lock().push_back(MockEntry::Failure(error));
        self
    }

    /// Queue several entries in order; errors become failures, anything else a result
    pub fn add_multiple<I>(&self, items: I) -> &Self
    where
        I: IntoIterator,
        I::Item: Into<MockEntry>,
    {
        self.lock().extend(items.into_iter().map(Into::into));
        self
    }

    /// Drop every queued entry
    pub fn clear_queue(&self) -> &Self {
        self.lock().clear();
        self
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// The events this mock listens to: prepare, as late as possible so
    /// other prepare listeners still run, but before the transport.
    pub fn events(&self) -> Vec<(EventName, Priority)> {
        vec![(EventName::Prepare, Priority::LAST)]
    }

    /// Answer a prepare event with the oldest queued entry.
    ///
    /// # Errors
    ///
    /// * [`CommandError::Underflow`] when the queue is empty; the transaction
    ///   is left untouched.
    /// * The queued error itself when the oldest entry is a failure.
    pub fn on_before(&self, event: &mut PrepareEvent<'_>) -> Result<(), CommandError> {
        // Check and dequeue under one lock
        let entry = self.lock().pop_front();
        let transaction = event.transaction();
        match entry {
            None => {
                warn!(
                    "Mock queue empty for {} (transaction {})",
                    transaction.command().name(),
                    transaction.id()
                );
                Err(CommandError::Underflow)
            }
            Some(MockEntry::Result(result)) => {
                debug!(
                    "Mocked result for {} (transaction {})",
                    transaction.command().name(),
                    transaction.id()
                );
                event.set_result(result);
                Ok(())
            }
            Some(MockEntry::Failure(error)) => {
                debug!(
                    "Mocked failure for {} (transaction {}): {}",
                    transaction.command().name(),
                    transaction.id(),
                    error
                );
                Err(error)
            }
        }
    }
}

impl PrepareSubscriber for ResultMock {
    fn events(&self) -> Vec<(EventName, Priority)> {
        ResultMock::events(self)
    }

    fn on_prepare(&self, event: &mut PrepareEvent<'_>) -> Result<(), CommandError> {
        self.on_before(event)
    }
}
