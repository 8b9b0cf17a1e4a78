//! Computed defaults that may depend on sibling fields.

use super::datetime::TaskTime;
use super::{ChoiceProvider, FieldAdapter, FieldResult};
use crate::collaborator::RowReader;
use crate::constraint::{Constraint, ConstraintChain};
use crate::model::value::ValueMap;
use crate::record::Record;
use std::sync::Arc;

/// Derives a default from the record and the wrapped accessor's default.
pub trait DefaultValue<T> {
    fn custom_default(&self, record: &Record, base: Option<T>) -> Option<T>;
}

impl<T, F> DefaultValue<T> for F
where
    F: Fn(&Record, Option<T>) -> Option<T>,
{
    fn custom_default(&self, record: &Record, base: Option<T>) -> Option<T> {
        self(record, base)
    }
}

/// Wraps an accessor and replaces its default.
///
/// Reads and writes go to the wrapped accessor. The wrapper owns its own
/// constraint chain; the inner chain is not consulted.
pub struct WithDefault<T> {
    inner: Arc<dyn FieldAdapter<Value = T>>,
    default: Arc<dyn DefaultValue<T>>,
    constraints: ConstraintChain<T>,
}

impl<T: Clone + PartialEq + 'static> WithDefault<T> {
    pub fn new(
        inner: Arc<dyn FieldAdapter<Value = T>>,
        default: impl DefaultValue<T> + 'static,
    ) -> Self {
        Self {
            inner,
            default: Arc::new(default),
            constraints: ConstraintChain::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: impl Constraint<T> + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }
}

impl<T: Clone + PartialEq + 'static> FieldAdapter for WithDefault<T> {
    type Value = T;

    fn field_names(&self) -> Vec<&str> {
        self.inner.field_names()
    }

    fn try_read(&self, record: &Record) -> FieldResult<Option<T>> {
        self.inner.try_read(record)
    }

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<T>> {
        self.inner.try_read_row(row)
    }

    fn default_for(&self, record: &Record) -> Option<T> {
        let base = self.inner.default_for(record);
        self.default.custom_default(record, base)
    }

    fn write(&self, record: &mut Record, value: Option<T>) {
        self.inner.write(record, value);
    }

    fn write_values(&self, values: &mut ValueMap, value: Option<T>) {
        self.inner.write_values(values, value);
    }

    fn constraints(&self) -> &ConstraintChain<T> {
        &self.constraints
    }

    fn choices(&self) -> Option<&dyn ChoiceProvider> {
        self.inner.choices()
    }
}

/// Default that lies at least one span after a reference time.
///
/// Without a reference accessor the base default itself is the reference.
/// The span is one day for all-day references and one hour otherwise.
pub struct DefaultAfter {
    reference: Option<Arc<dyn FieldAdapter<Value = TaskTime>>>,
}

impl DefaultAfter {
    pub fn new(reference: Option<Arc<dyn FieldAdapter<Value = TaskTime>>>) -> Self {
        Self { reference }
    }
}

impl DefaultValue<TaskTime> for DefaultAfter {
    fn custom_default(&self, record: &Record, base: Option<TaskTime>) -> Option<TaskTime> {
        let anchor = self
            .reference
            .as_ref()
            .and_then(|reference| reference.read(record))
            .or_else(|| base.clone())?;
        match base {
            Some(base) if anchor.is_before(&base) => Some(base),
            _ => Some(anchor.shifted(anchor.default_span_ms())),
        }
    }
}

/// Default that lies at least one span before a reference time.
pub struct DefaultBefore {
    reference: Option<Arc<dyn FieldAdapter<Value = TaskTime>>>,
}

impl DefaultBefore {
    pub fn new(reference: Option<Arc<dyn FieldAdapter<Value = TaskTime>>>) -> Self {
        Self { reference }
    }
}

impl DefaultValue<TaskTime> for DefaultBefore {
    fn custom_default(&self, record: &Record, base: Option<TaskTime>) -> Option<TaskTime> {
        let anchor = self
            .reference
            .as_ref()
            .and_then(|reference| reference.read(record))
            .or_else(|| base.clone())?;
        match base {
            Some(base) if base.is_before(&anchor) => Some(base),
            _ => Some(anchor.shifted(-anchor.default_span_ms())),
        }
    }
}
