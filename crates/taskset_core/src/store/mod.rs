//! SQLite-backed loader and sink for task records.
//!
//! # Responsibility
//! - Map task rows to baselines and pending deltas to SQL statements.
//! - Provide a `Send + Sync` loader for background record loads.
//!
//! # Invariants
//! - Only declared columns are read or written; unknown keys are rejected
//!   before any statement runs.
//! - Update and delete of a missing row report `NotFound`.

pub mod columns;
pub mod sqlite;

use crate::db::DbError;
use crate::model::identity::Identity;
use crate::model::value::CoercionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use columns::{ColumnMapper, ColumnType};
pub use sqlite::{SqliteFileLoader, SqliteTaskStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Task store failures. Records see them as collaborator errors.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    UnknownColumn(String),
    InvalidValue {
        column: String,
        source: CoercionError,
    },
    WrongTarget {
        operation: &'static str,
        identity: Identity,
    },
    NotFound(Identity),
    Cancelled,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UnknownColumn(column) => write!(f, "unknown column `{column}`"),
            Self::InvalidValue { column, source } => {
                write!(f, "invalid value for column `{column}`: {source}")
            }
            Self::WrongTarget {
                operation,
                identity,
            } => write!(f, "cannot {operation} `{identity}`"),
            Self::NotFound(identity) => write!(f, "task not found: {identity}"),
            Self::Cancelled => write!(f, "load cancelled"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidValue { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
