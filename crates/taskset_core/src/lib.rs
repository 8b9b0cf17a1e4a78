//! Differential record store with typed field accessors for tasks.
//! A record holds a loaded baseline plus pending edits; accessors read and
//! write typed values through it and enforce cross-field constraints.

pub mod checklist;
pub mod collaborator;
pub mod config;
pub mod constraint;
pub mod db;
pub mod field;
pub mod logging;
pub mod model;
pub mod record;
pub mod schema;
pub mod store;

pub use checklist::{parse_description, serialize_description, DescriptionItem};
pub use collaborator::{
    CancelSignal, CollaboratorError, LoadOutcome, Loader, RowReader, RowSnapshot, Sink,
};
pub use config::CoreConfig;
pub use constraint::{Constraint, ConstraintChain};
pub use field::{FieldAdapter, FieldError, FieldResult, TaskTime};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::identity::{Identity, RecordId};
pub use model::value::{CoercionError, Value, ValueKind, ValueMap};
pub use record::listener::{ListenerScope, RecordListener, Subscription};
pub use record::loading::{LoadCompletion, LoadTask};
pub use record::{Record, RecordError, RecordResult, RecordSnapshot, RecordState};
pub use schema::{ModelRegistry, TaskModel};
pub use store::{SqliteFileLoader, SqliteTaskStore, StoreError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
