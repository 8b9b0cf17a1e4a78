//! Single-key accessors for text, integer, real and boolean values.

use super::{ChoiceProvider, FieldAdapter, FieldError, FieldResult};
use crate::collaborator::RowReader;
use crate::constraint::{Constraint, ConstraintChain};
use crate::model::value::{CoercionError, Value, ValueMap};
use crate::record::Record;
use std::sync::Arc;

/// Domain type stored in exactly one cell.
pub trait Scalar: Clone + PartialEq {
    fn from_cell(value: &Value) -> Result<Option<Self>, CoercionError>;
    fn into_cell(self) -> Value;
}

impl Scalar for String {
    fn from_cell(value: &Value) -> Result<Option<Self>, CoercionError> {
        value.as_text()
    }

    fn into_cell(self) -> Value {
        Value::Text(self)
    }
}

impl Scalar for i64 {
    fn from_cell(value: &Value) -> Result<Option<Self>, CoercionError> {
        value.as_integer()
    }

    fn into_cell(self) -> Value {
        Value::Integer(self)
    }
}

impl Scalar for f64 {
    fn from_cell(value: &Value) -> Result<Option<Self>, CoercionError> {
        value.as_real()
    }

    fn into_cell(self) -> Value {
        Value::Real(self)
    }
}

/// Null and absent cells read as `false`; integers > 0 read as `true`.
impl Scalar for bool {
    fn from_cell(value: &Value) -> Result<Option<Self>, CoercionError> {
        value.as_bool().map(Some)
    }

    fn into_cell(self) -> Value {
        Value::from(self)
    }
}

/// Accessor for one key holding a [`Scalar`].
pub struct ScalarField<T: Scalar> {
    name: String,
    default: Option<T>,
    constraints: ConstraintChain<T>,
    choices: Option<Arc<dyn ChoiceProvider>>,
}

pub type StringField = ScalarField<String>;
pub type IntegerField = ScalarField<i64>;
pub type RealField = ScalarField<f64>;
pub type BooleanField = ScalarField<bool>;

impl<T: Scalar> ScalarField<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            constraints: ConstraintChain::new(),
            choices: None,
        }
    }

    pub fn with_default(mut self, default: T) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Constraint<T> + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn with_choices(mut self, choices: impl ChoiceProvider + 'static) -> Self {
        self.choices = Some(Arc::new(choices));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Scalar> FieldAdapter for ScalarField<T> {
    type Value = T;

    fn field_names(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn try_read(&self, record: &Record) -> FieldResult<Option<T>> {
        let cell = record.get(&self.name).unwrap_or(&Value::Null);
        Ok(T::from_cell(cell)?)
    }

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<T>> {
        if !row.has_column(&self.name) {
            return Err(FieldError::SchemaMismatch {
                column: self.name.clone(),
            });
        }
        Ok(T::from_cell(&row.column_value(&self.name))?)
    }

    fn default_for(&self, _record: &Record) -> Option<T> {
        self.default.clone()
    }

    fn write(&self, record: &mut Record, value: Option<T>) {
        record.put(&self.name, value.map_or(Value::Null, Scalar::into_cell));
    }

    fn write_values(&self, values: &mut ValueMap, value: Option<T>) {
        values.insert(
            self.name.clone(),
            value.map_or(Value::Null, Scalar::into_cell),
        );
    }

    fn constraints(&self) -> &ConstraintChain<T> {
        &self.constraints
    }

    fn choices(&self) -> Option<&dyn ChoiceProvider> {
        self.choices.as_deref()
    }
}
