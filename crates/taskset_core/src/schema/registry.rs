//! Explicit registry of task models keyed by account type.

use super::model::TaskModel;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Model registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelRegistryError {
    InvalidAccountType(String),
    DuplicateAccountType(String),
}

impl Display for ModelRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAccountType(value) => write!(f, "account type is invalid: {value}"),
            Self::DuplicateAccountType(value) => {
                write!(f, "account type already registered: {value}")
            }
        }
    }
}

impl Error for ModelRegistryError {}

/// Task models per account type, with a fallback model.
///
/// Constructed and passed down explicitly; there is no process-wide
/// instance.
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<TaskModel>>,
    fallback: Arc<TaskModel>,
}

impl ModelRegistry {
    pub fn new(fallback: TaskModel) -> Self {
        Self {
            models: BTreeMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Registers one model under its account type.
    pub fn register(&mut self, model: TaskModel) -> Result<(), ModelRegistryError> {
        let account_type = model.account_type().trim().to_string();
        if !is_valid_account_type(&account_type) {
            return Err(ModelRegistryError::InvalidAccountType(account_type));
        }
        if self.models.contains_key(&account_type) {
            return Err(ModelRegistryError::DuplicateAccountType(account_type));
        }

        self.models.insert(account_type, Arc::new(model));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns sorted account types.
    pub fn account_types(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Returns the registered model only.
    pub fn try_get(&self, account_type: &str) -> Option<Arc<TaskModel>> {
        self.models.get(account_type.trim()).cloned()
    }

    /// Returns the model for `account_type`, or the fallback model.
    pub fn get(&self, account_type: &str) -> Arc<TaskModel> {
        self.try_get(account_type)
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn fallback(&self) -> Arc<TaskModel> {
        self.fallback.clone()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(TaskModel::local())
    }
}

fn is_valid_account_type(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
}
