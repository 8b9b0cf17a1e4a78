//! Declared column set of a table and value conversion in both directions.

use crate::collaborator::RowSnapshot;
use crate::model::value::{CoercionError, Value};
use crate::schema::tasks;
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::Row;

/// Storage class declared for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    name: String,
    column_type: ColumnType,
}

/// Ordered, typed columns of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapper {
    columns: Vec<Column>,
}

impl ColumnMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(Column {
            name: name.into(),
            column_type,
        });
        self
    }

    /// Columns of the `tasks` table, without the primary key.
    pub fn tasks() -> Self {
        tasks::COLUMNS
            .iter()
            .fold(Self::new(), |mapper, name| mapper.column(*name, task_column_type(name)))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| column.column_type)
    }

    /// Comma-separated column list for `SELECT`.
    pub fn select_list(&self) -> String {
        self.names().collect::<Vec<_>>().join(", ")
    }

    /// Reads the declared columns from a row selected with
    /// [`Self::select_list`], starting at `offset`.
    pub fn read_row(&self, row: &Row<'_>, offset: usize) -> rusqlite::Result<RowSnapshot> {
        let mut snapshot = RowSnapshot::new();
        for (index, column) in self.columns.iter().enumerate() {
            let position = offset + index;
            let value = match row.get_ref(position)? {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(value) => Value::Integer(value),
                ValueRef::Real(value) => Value::Real(value),
                ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(_) => {
                    return Err(rusqlite::Error::InvalidColumnType(
                        position,
                        column.name.clone(),
                        Type::Blob,
                    ));
                }
            };
            snapshot.push(column.name.clone(), value);
        }
        Ok(snapshot)
    }

    /// Converts `value` to the storage class declared for `name`.
    ///
    /// Returns `None` for undeclared columns.
    pub fn to_sql(&self, name: &str, value: &Value) -> Option<Result<SqlValue, CoercionError>> {
        let column_type = self.column_type(name)?;
        let converted = match column_type {
            ColumnType::Integer => value
                .as_integer()
                .map(|value| value.map_or(SqlValue::Null, SqlValue::Integer)),
            ColumnType::Real => value
                .as_real()
                .map(|value| value.map_or(SqlValue::Null, SqlValue::Real)),
            ColumnType::Text => value
                .as_text()
                .map(|value| value.map_or(SqlValue::Null, SqlValue::Text)),
        };
        Some(converted)
    }
}

fn task_column_type(name: &str) -> ColumnType {
    match name {
        tasks::TITLE
        | tasks::LOCATION
        | tasks::DESCRIPTION
        | tasks::TZ
        | tasks::LIST_NAME
        | tasks::ACCOUNT_NAME => ColumnType::Text,
        _ => ColumnType::Integer,
    }
}
