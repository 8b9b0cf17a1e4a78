//! Typed field accessors over records and rows.
//!
//! # Responsibility
//! - Bind one or more record keys to a typed domain value.
//! - Read with coercion and defaults, write directly or through a
//!   constraint chain, and forward listener registration for owned keys.
//!
//! # Invariants
//! - Accessors hold configuration only and can be shared across records.
//! - Coercion failures are recoverable on both paths: `read`/`read_row`
//!   fall back to `None` and log; `try_read`/`try_read_row` report them.
//! - A column missing from a row is always a `SchemaMismatch` error.
//! - Multi-key writes happen inside one bulk update.

pub mod choices;
pub mod datetime;
pub mod defaults;
pub mod description;
pub mod formatted;
pub mod primitive;

use crate::collaborator::RowReader;
use crate::constraint::ConstraintChain;
use crate::model::value::{CoercionError, ValueMap};
use crate::record::listener::{ListenerScope, RecordListener, Subscription};
use crate::record::Record;
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

pub use choices::{ArrayChoices, Choice, ChoiceProvider};
pub use datetime::{DateTimeField, TaskTime};
pub use defaults::{DefaultAfter, DefaultBefore, DefaultValue, WithDefault};
pub use description::DescriptionField;
pub use formatted::FormattedStringField;
pub use primitive::{BooleanField, IntegerField, RealField, Scalar, ScalarField, StringField};

pub type FieldResult<T> = Result<T, FieldError>;

/// Accessor read failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// A row does not have a column the accessor owns.
    SchemaMismatch { column: String },
    /// A present value could not be converted to the accessor type.
    TypeCoercion(CoercionError),
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SchemaMismatch { column } => write!(f, "column `{column}` missing from row"),
            Self::TypeCoercion(err) => write!(f, "{err}"),
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SchemaMismatch { .. } => None,
            Self::TypeCoercion(err) => Some(err),
        }
    }
}

impl From<CoercionError> for FieldError {
    fn from(value: CoercionError) -> Self {
        Self::TypeCoercion(value)
    }
}

/// Typed view over one or more record keys.
pub trait FieldAdapter {
    type Value: Clone + PartialEq;

    /// Record keys this accessor reads or writes.
    fn field_names(&self) -> Vec<&str>;

    fn try_read(&self, record: &Record) -> FieldResult<Option<Self::Value>>;

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<Self::Value>>;

    /// Value to show when the record has none; may depend on sibling fields.
    fn default_for(&self, record: &Record) -> Option<Self::Value>;

    /// Writes without running constraints.
    fn write(&self, record: &mut Record, value: Option<Self::Value>);

    /// Writes into a detached value map, e.g. when building insert rows.
    fn write_values(&self, values: &mut ValueMap, value: Option<Self::Value>);

    fn constraints(&self) -> &ConstraintChain<Self::Value>;

    /// Choice list, for accessors that offer one.
    fn choices(&self) -> Option<&dyn ChoiceProvider> {
        None
    }

    /// Reads through the record; coercion failures yield `None`.
    fn read(&self, record: &Record) -> Option<Self::Value> {
        match self.try_read(record) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "event=field_read module=field status=error path=record fields={} error={}",
                    self.field_names().join(","),
                    err
                );
                None
            }
        }
    }

    /// Reads a row; only a missing column is an error.
    fn read_row(&self, row: &dyn RowReader) -> FieldResult<Option<Self::Value>> {
        match self.try_read_row(row) {
            Ok(value) => Ok(value),
            Err(err @ FieldError::SchemaMismatch { .. }) => Err(err),
            Err(err @ FieldError::TypeCoercion(_)) => {
                warn!(
                    "event=field_read module=field status=error path=row fields={} error={}",
                    self.field_names().join(","),
                    err
                );
                Ok(None)
            }
        }
    }

    /// Current value, or the default when the record has none.
    fn read_or_default(&self, record: &Record) -> Option<Self::Value> {
        self.read(record).or_else(|| self.default_for(record))
    }

    /// Runs `value` through the constraint chain and writes the result.
    ///
    /// The chain and the write share one bulk update.
    fn validate_and_write(&self, record: &mut Record, value: Option<Self::Value>) {
        let mut scope = record.bulk_update();
        let old = self.read(&scope);
        let value = self.constraints().apply(&mut scope, old.as_ref(), value);
        self.write(&mut scope, value);
    }

    /// Registers `listener` for every owned key as one subscription.
    fn register_listener(
        &self,
        record: &Record,
        listener: &Rc<dyn RecordListener>,
        notify_immediately: bool,
    ) -> Subscription {
        record.subscribe_fields(listener, &self.field_names(), notify_immediately)
    }

    /// Removes `listener` from every owned key.
    fn unregister_listener(&self, record: &Record, listener: &Rc<dyn RecordListener>) {
        for name in self.field_names() {
            record.remove_change_listener(listener, &ListenerScope::field(name));
        }
    }
}
