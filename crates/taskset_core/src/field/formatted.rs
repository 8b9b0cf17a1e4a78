//! Read-only string composed from other string fields.

use super::{FieldAdapter, FieldResult, StringField};
use crate::collaborator::RowReader;
use crate::constraint::ConstraintChain;
use crate::model::value::ValueMap;
use crate::record::Record;
use log::debug;
use std::sync::Arc;

const PLACEHOLDER: &str = "{}";

/// Renders a template such as `"{} ({})"` from string fields.
///
/// Placeholders are filled in order; a missing value renders as empty
/// text and surplus placeholders stay empty. Writes are ignored.
pub struct FormattedStringField {
    template: String,
    params: Vec<Arc<StringField>>,
    constraints: ConstraintChain<String>,
}

impl FormattedStringField {
    pub fn new(template: impl Into<String>, params: Vec<Arc<StringField>>) -> Self {
        Self {
            template: template.into(),
            params,
            constraints: ConstraintChain::new(),
        }
    }

    fn render(&self, values: Vec<Option<String>>) -> String {
        let mut values = values.into_iter();
        let mut parts = self.template.split(PLACEHOLDER);
        let mut out = String::with_capacity(self.template.len());
        if let Some(first) = parts.next() {
            out.push_str(first);
        }
        for part in parts {
            if let Some(value) = values.next().flatten() {
                out.push_str(&value);
            }
            out.push_str(part);
        }
        out
    }
}

impl FieldAdapter for FormattedStringField {
    type Value = String;

    fn field_names(&self) -> Vec<&str> {
        self.params.iter().map(|param| param.name()).collect()
    }

    fn try_read(&self, record: &Record) -> FieldResult<Option<String>> {
        let values = self
            .params
            .iter()
            .map(|param| param.try_read(record))
            .collect::<FieldResult<Vec<_>>>()?;
        Ok(Some(self.render(values)))
    }

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<String>> {
        let values = self
            .params
            .iter()
            .map(|param| param.try_read_row(row))
            .collect::<FieldResult<Vec<_>>>()?;
        Ok(Some(self.render(values)))
    }

    fn default_for(&self, record: &Record) -> Option<String> {
        let values = self
            .params
            .iter()
            .map(|param| param.default_for(record))
            .collect();
        Some(self.render(values))
    }

    fn write(&self, _record: &mut Record, _value: Option<String>) {
        debug!(
            "event=field_write module=field status=skip reason=read_only fields={}",
            self.field_names().join(",")
        );
    }

    fn write_values(&self, _values: &mut ValueMap, _value: Option<String>) {}

    fn constraints(&self) -> &ConstraintChain<String> {
        &self.constraints
    }
}
