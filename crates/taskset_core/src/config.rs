//! Process configuration read from the environment.
//!
//! # Responsibility
//! - Resolve log level, log directory and database location.
//!
//! # Invariants
//! - Empty variables count as unset.
//! - Without a database path the store runs in memory.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_LOG_LEVEL: &str = "TASKSET_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKSET_LOG_DIR";
pub const ENV_DB_PATH: &str = "TASKSET_DB_PATH";

/// Settings shared by every entry point.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub log_level: String,
    /// File logging is disabled when `None`.
    pub log_dir: Option<PathBuf>,
    /// In-memory database when `None`.
    pub database_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level().to_string(),
            log_dir: None,
            database_path: None,
        }
    }
}

impl CoreConfig {
    /// Reads `TASKSET_LOG_LEVEL`, `TASKSET_LOG_DIR` and `TASKSET_DB_PATH`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            database_path: read(ENV_DB_PATH).map(PathBuf::from),
        }
    }

    pub fn uses_file_logging(&self) -> bool {
        self.log_dir.is_some()
    }
}
