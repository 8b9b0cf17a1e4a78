//! Loader/sink implementations over the `tasks` table.

use super::{ColumnMapper, StoreError, StoreResult};
use crate::collaborator::{CancelSignal, CollaboratorError, LoadOutcome, Loader, Sink};
use crate::db::open_db;
use crate::model::identity::{Identity, RecordId};
use crate::model::value::ValueMap;
use crate::schema::tasks;
use log::{debug, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const TABLE: &str = "tasks";

/// Task loader and sink on a borrowed connection.
pub struct SqliteTaskStore<'conn> {
    conn: &'conn Connection,
    mapper: ColumnMapper,
}

impl<'conn> SqliteTaskStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_mapper(conn, ColumnMapper::tasks())
    }

    pub fn with_mapper(conn: &'conn Connection, mapper: ColumnMapper) -> Self {
        Self { conn, mapper }
    }

    /// Returns the stored values of one task.
    pub fn find(&self, id: RecordId) -> StoreResult<Option<ValueMap>> {
        find_row(self.conn, &self.mapper, id)
    }

    pub fn count(&self) -> StoreResult<u64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {TABLE}"),
            [],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn bind(&self, values: &ValueMap) -> StoreResult<Vec<(String, SqlValue)>> {
        values
            .iter()
            .map(|(column, value)| match self.mapper.to_sql(column, value) {
                None => Err(StoreError::UnknownColumn(column.clone())),
                Some(Err(source)) => Err(StoreError::InvalidValue {
                    column: column.clone(),
                    source,
                }),
                Some(Ok(value)) => Ok((column.clone(), value)),
            })
            .collect()
    }

    fn insert_row(&self, target: &Identity, values: &ValueMap) -> StoreResult<Identity> {
        if target.is_item() || target.collection_name() != tasks::COLLECTION {
            return Err(StoreError::WrongTarget {
                operation: "insert into",
                identity: target.clone(),
            });
        }
        let bound = self.bind(values)?;
        let id = Uuid::new_v4();

        let mut columns = vec!["id".to_string()];
        columns.extend(bound.iter().map(|(column, _)| column.clone()));
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = vec![SqlValue::Text(id.to_string())];
        params.extend(bound.into_iter().map(|(_, value)| value));

        self.conn.execute(
            &format!(
                "INSERT INTO {TABLE} ({}) VALUES ({placeholders})",
                columns.join(", ")
            ),
            params_from_iter(params.iter()),
        )?;
        info!(
            "event=task_store_insert module=store status=ok columns={}",
            params.len() - 1
        );
        Ok(Identity::item(tasks::COLLECTION, id))
    }

    fn update_row(&self, target: &Identity, values: &ValueMap) -> StoreResult<()> {
        let id = item_id("update", target)?;
        let bound = self.bind(values)?;
        if bound.is_empty() {
            debug!("event=task_store_update module=store status=skip reason=no_columns");
            return Ok(());
        }

        let assignments = bound
            .iter()
            .enumerate()
            .map(|(index, (column, _))| format!("{column} = ?{}", index + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = vec![SqlValue::Text(id.to_string())];
        params.extend(bound.into_iter().map(|(_, value)| value));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {TABLE} SET {assignments}, \
                 updated_at = CAST(strftime('%s', 'now') AS INTEGER) * 1000 WHERE id = ?1"
            ),
            params_from_iter(params.iter()),
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(target.clone()));
        }
        info!(
            "event=task_store_update module=store status=ok columns={}",
            params.len() - 1
        );
        Ok(())
    }

    fn delete_row(&self, target: &Identity) -> StoreResult<()> {
        let id = item_id("delete", target)?;
        let changed = self.conn.execute(
            &format!("DELETE FROM {TABLE} WHERE id = ?1"),
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(target.clone()));
        }
        info!("event=task_store_delete module=store status=ok");
        Ok(())
    }
}

impl Loader for SqliteTaskStore<'_> {
    fn fetch(
        &self,
        identity: &Identity,
        cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        let id = item_id("load", identity)?;
        Ok(outcome(self.find(id)?))
    }
}

impl Sink for SqliteTaskStore<'_> {
    fn insert(&self, target: &Identity, values: &ValueMap) -> Result<Identity, CollaboratorError> {
        Ok(self.insert_row(target, values)?)
    }

    fn update(&self, target: &Identity, values: &ValueMap) -> Result<(), CollaboratorError> {
        Ok(self.update_row(target, values)?)
    }

    fn delete(&self, target: &Identity) -> Result<(), CollaboratorError> {
        Ok(self.delete_row(target)?)
    }
}

/// Loader that opens its own connection per fetch.
///
/// Suitable for `Record::load`, which fetches on a worker thread.
#[derive(Debug, Clone)]
pub struct SqliteFileLoader {
    path: PathBuf,
    mapper: ColumnMapper,
}

impl SqliteFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mapper: ColumnMapper::tasks(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for SqliteFileLoader {
    fn fetch(
        &self,
        identity: &Identity,
        cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        let id = item_id("load", identity)?;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        let conn = open_db(&self.path).map_err(StoreError::from)?;
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        Ok(outcome(find_row(&conn, &self.mapper, id)?))
    }
}

fn find_row(
    conn: &Connection,
    mapper: &ColumnMapper,
    id: RecordId,
) -> StoreResult<Option<ValueMap>> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM {TABLE} WHERE id = ?1", mapper.select_list()),
            [id.to_string()],
            |row| mapper.read_row(row, 0),
        )
        .optional()?;
    Ok(row.map(|snapshot| snapshot.into_values()))
}

fn item_id(operation: &'static str, identity: &Identity) -> StoreResult<RecordId> {
    match identity.item_id() {
        Some(id) if identity.collection_name() == tasks::COLLECTION => Ok(id),
        _ => Err(StoreError::WrongTarget {
            operation,
            identity: identity.clone(),
        }),
    }
}

fn outcome(values: Option<ValueMap>) -> LoadOutcome {
    match values {
        Some(values) => LoadOutcome::Found(values),
        None => LoadOutcome::NotFound,
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteTaskStore;
    use crate::collaborator::{CancelSignal, LoadOutcome, Loader, Sink};
    use crate::db::open_db_in_memory;
    use crate::model::identity::Identity;
    use crate::model::value::{Value, ValueMap};
    use crate::store::StoreError;

    fn values(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn insert_then_fetch_returns_all_columns() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteTaskStore::new(&conn);
        let identity = store
            .insert(
                &Identity::collection("tasks"),
                &values(&[("title", Value::from("eggs"))]),
            )
            .expect("insert task");

        let outcome = store
            .fetch(&identity, &CancelSignal::new())
            .expect("fetch task");
        let LoadOutcome::Found(baseline) = outcome else {
            panic!("task should exist");
        };
        assert_eq!(baseline.get("title"), Some(&Value::from("eggs")));
        assert_eq!(baseline.get("due"), Some(&Value::Null));
        assert_eq!(baseline.len(), 15);
    }

    #[test]
    fn unknown_columns_are_rejected_before_writing() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteTaskStore::new(&conn);
        let err = store
            .insert(
                &Identity::collection("tasks"),
                &values(&[("title; DROP TABLE tasks", Value::from("x"))]),
            )
            .expect_err("unknown column");
        let err = err.downcast::<StoreError>().expect("store error");
        assert!(matches!(*err, StoreError::UnknownColumn(_)));
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn update_and_delete_of_missing_rows_report_not_found() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteTaskStore::new(&conn);
        let missing = Identity::item("tasks", uuid::Uuid::new_v4());

        let err = store
            .update(&missing, &values(&[("status", Value::Integer(2))]))
            .expect_err("missing row");
        assert!(matches!(
            *err.downcast::<StoreError>().expect("store error"),
            StoreError::NotFound(_)
        ));
        assert!(store.delete(&missing).is_err());
        assert_eq!(
            store
                .fetch(&missing, &CancelSignal::new())
                .expect("fetch missing"),
            LoadOutcome::NotFound
        );
    }

    #[test]
    fn cancelled_fetch_is_reported() {
        let conn = open_db_in_memory().expect("open db");
        let store = SqliteTaskStore::new(&conn);
        let cancel = CancelSignal::new();
        cancel.cancel();
        assert!(store
            .fetch(&Identity::item("tasks", uuid::Uuid::new_v4()), &cancel)
            .is_err());
    }
}
