//! Record locators.
//!
//! # Invariants
//! - A `Collection` identity addresses an insert target and can never be
//!   loaded or deleted.
//! - An `Item` identity addresses exactly one stored record.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable id of one stored record.
pub type RecordId = Uuid;

/// Opaque locator for a single record or for a collection of records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    Collection { collection: String },
    Item { collection: String, id: RecordId },
}

impl Identity {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self::Collection {
            collection: collection.into(),
        }
    }

    pub fn item(collection: impl Into<String>, id: RecordId) -> Self {
        Self::Item {
            collection: collection.into(),
            id,
        }
    }

    pub fn is_item(&self) -> bool {
        matches!(self, Self::Item { .. })
    }

    pub fn collection_name(&self) -> &str {
        match self {
            Self::Collection { collection } | Self::Item { collection, .. } => collection,
        }
    }

    /// Returns the record id for item identities.
    pub fn item_id(&self) -> Option<RecordId> {
        match self {
            Self::Collection { .. } => None,
            Self::Item { id, .. } => Some(*id),
        }
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collection { collection } => write!(f, "{collection}/*"),
            Self::Item { collection, id } => write!(f, "{collection}/{id}"),
        }
    }
}
