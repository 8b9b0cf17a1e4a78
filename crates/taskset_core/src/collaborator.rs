//! Contracts for the collaborators a record talks to.
//!
//! # Responsibility
//! - Define the baseline loader, persistence sink and row reader seams.
//! - Provide the cooperative cancellation signal handed to loaders.
//!
//! # Invariants
//! - A loader is invoked at most once per load request.
//! - Collaborator failures are surfaced unchanged; this crate never retries.

use crate::model::identity::Identity;
use crate::model::value::{Value, ValueMap};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Error type returned by loader and sink implementations.
pub type CollaboratorError = Box<dyn Error + Send + Sync + 'static>;

/// Result of one baseline fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Found(ValueMap),
    NotFound,
}

/// Fetches the baseline of a single record.
///
/// Implementations used with `Record::load` run on a worker thread and must
/// therefore be `Send + Sync`.
pub trait Loader {
    fn fetch(
        &self,
        identity: &Identity,
        cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError>;
}

/// Receives computed deltas.
pub trait Sink {
    /// Inserts a new record below `target` and returns its item identity.
    fn insert(&self, target: &Identity, values: &ValueMap) -> Result<Identity, CollaboratorError>;
    fn update(&self, target: &Identity, values: &ValueMap) -> Result<(), CollaboratorError>;
    fn delete(&self, target: &Identity) -> Result<(), CollaboratorError>;
}

/// Read access to one row of a result set with a fixed schema.
pub trait RowReader {
    fn has_column(&self, name: &str) -> bool;

    /// Returns the cell for `name`, `Value::Null` when the column is missing.
    /// Callers that need to tell the two apart check `has_column` first.
    fn column_value(&self, name: &str) -> Value;
}

/// Owned row with ordered, named, typed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSnapshot {
    columns: Vec<(String, Value)>,
}

impl RowSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value.into());
        self
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn into_values(self) -> ValueMap {
        self.columns.into_iter().collect()
    }
}

impl RowReader for RowSnapshot {
    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(column, _)| column == name)
    }

    fn column_value(&self, name: &str) -> Value {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map_or(Value::Null, |(_, value)| value.clone())
    }
}

impl RowReader for ValueMap {
    fn has_column(&self, name: &str) -> bool {
        self.contains_key(name)
    }

    fn column_value(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Null)
    }
}

/// Cooperative cancellation flag shared between a record and its loader.
///
/// Default policy: loaders may ignore it and run to completion; a result
/// that arrives after cancellation is dropped by the record side.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelSignal, RowReader, RowSnapshot};
    use crate::model::value::Value;

    #[test]
    fn row_snapshot_keeps_column_order_and_reports_missing_columns() {
        let row = RowSnapshot::new().with("title", "eggs").with("status", 2_i64);

        assert_eq!(row.column_names().collect::<Vec<_>>(), ["title", "status"]);
        assert!(row.has_column("status"));
        assert!(!row.has_column("due"));
        assert_eq!(row.column_value("due"), Value::Null);
        assert_eq!(row.column_value("status"), Value::Integer(2));
    }

    #[test]
    fn cancel_signal_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let worker_side = signal.clone();
        assert!(!worker_side.is_cancelled());
        signal.cancel();
        assert!(worker_side.is_cancelled());
    }
}
