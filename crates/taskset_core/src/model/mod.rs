//! Storage-facing value model.
//!
//! # Responsibility
//! - Define the dynamic cell type shared by records, rows and collaborators.
//! - Define record identities (collection vs single item).
//!
//! # Invariants
//! - Value maps are ordered by key so deltas are deterministic.

pub mod identity;
pub mod value;
