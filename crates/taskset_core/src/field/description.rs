//! Checklist view over a description text column.

use super::{FieldAdapter, FieldError, FieldResult};
use crate::checklist::{parse_description, serialize_description, DescriptionItem};
use crate::collaborator::RowReader;
use crate::constraint::{Constraint, ConstraintChain};
use crate::model::value::{Value, ValueMap};
use crate::record::Record;
use std::sync::Arc;

/// Reads a text column as [`DescriptionItem`]s.
///
/// An empty or cleared item list is stored as null. A null or empty column
/// reads as an empty list, never `None`.
pub struct DescriptionField {
    name: String,
    default: Option<Vec<DescriptionItem>>,
    constraints: ConstraintChain<Vec<DescriptionItem>>,
}

impl DescriptionField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
            constraints: ConstraintChain::new(),
        }
    }

    pub fn with_default(mut self, default: Vec<DescriptionItem>) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_constraint(
        mut self,
        constraint: impl Constraint<Vec<DescriptionItem>> + 'static,
    ) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    fn cell(items: Option<Vec<DescriptionItem>>) -> Value {
        match items {
            Some(items) if !items.is_empty() => Value::Text(serialize_description(&items)),
            _ => Value::Null,
        }
    }
}

impl FieldAdapter for DescriptionField {
    type Value = Vec<DescriptionItem>;

    fn field_names(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn try_read(&self, record: &Record) -> FieldResult<Option<Vec<DescriptionItem>>> {
        let text = record.get_as_text(&self.name)?;
        Ok(Some(parse_description(text.as_deref())))
    }

    fn try_read_row(&self, row: &dyn RowReader) -> FieldResult<Option<Vec<DescriptionItem>>> {
        if !row.has_column(&self.name) {
            return Err(FieldError::SchemaMismatch {
                column: self.name.clone(),
            });
        }
        let text = row.column_value(&self.name).as_text()?;
        Ok(Some(parse_description(text.as_deref())))
    }

    fn default_for(&self, _record: &Record) -> Option<Vec<DescriptionItem>> {
        self.default.clone()
    }

    fn write(&self, record: &mut Record, value: Option<Vec<DescriptionItem>>) {
        record.put(&self.name, Self::cell(value));
    }

    fn write_values(&self, values: &mut ValueMap, value: Option<Vec<DescriptionItem>>) {
        values.insert(self.name.clone(), Self::cell(value));
    }

    fn constraints(&self) -> &ConstraintChain<Vec<DescriptionItem>> {
        &self.constraints
    }
}

#[cfg(test)]
mod tests {
    use super::DescriptionField;
    use crate::checklist::DescriptionItem;
    use crate::field::FieldAdapter;
    use crate::model::value::Value;
    use crate::record::Record;

    #[test]
    fn items_round_trip_through_record() {
        let field = DescriptionField::new("description");
        let mut record = Record::new_insert("tasks");
        let items = vec![
            DescriptionItem::checkbox(false, "eggs"),
            DescriptionItem::checkbox(true, "milk"),
            DescriptionItem::plain("Notes here"),
        ];
        field.write(&mut record, Some(items.clone()));

        assert_eq!(
            record.get("description"),
            Some(&Value::Text("- [ ] eggs\n- [x] milk\nNotes here".to_string()))
        );
        assert_eq!(field.read(&record), Some(items));
    }

    #[test]
    fn empty_list_clears_the_column() {
        let field = DescriptionField::new("description");
        let mut record = Record::new_insert("tasks");
        record.put("description", "text");
        field.write(&mut record, Some(Vec::new()));

        assert_eq!(record.get("description"), None);
        assert_eq!(field.read(&record), Some(Vec::new()));
    }
}
