//! Write constraints for field accessors.
//!
//! # Responsibility
//! - Define the `(record, old, candidate) -> final` constraint contract.
//! - Keep an ordered, shareable constraint chain per accessor.
//!
//! # Invariants
//! - Constraints run strictly in append order; each one sees the previous
//!   one's output as its candidate.
//! - Constraints may write sibling fields. They run inside the bulk update
//!   opened by `validate_and_write`, so listeners observe the triggering
//!   write and all side effects as one change.
//! - There is no rollback of side effects when a later constraint rewrites
//!   the candidate.

pub mod basic;
pub mod progress;
pub mod time;

use crate::record::Record;
use std::sync::Arc;

pub use basic::{Clamp, NotNull};
pub use progress::{AdjustPercentComplete, ChecklistProgress};
pub use time::{AfterOrShiftTime, BeforeOrShiftTime, ShiftTime, UpdateAllDay};

/// Validator/transformer applied to a candidate value before it is written.
pub trait Constraint<T> {
    fn apply(&self, record: &mut Record, old: Option<&T>, candidate: Option<T>) -> Option<T>;
}

impl<T, F> Constraint<T> for F
where
    F: Fn(&mut Record, Option<&T>, Option<T>) -> Option<T>,
{
    fn apply(&self, record: &mut Record, old: Option<&T>, candidate: Option<T>) -> Option<T> {
        self(record, old, candidate)
    }
}

/// Ordered list of constraints owned by one accessor.
pub struct ConstraintChain<T> {
    constraints: Vec<Arc<dyn Constraint<T>>>,
}

impl<T> ConstraintChain<T> {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
        }
    }

    pub fn push(&mut self, constraint: Arc<dyn Constraint<T>>) {
        self.constraints.push(constraint);
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Pipes `candidate` through every constraint in order.
    pub fn apply(&self, record: &mut Record, old: Option<&T>, candidate: Option<T>) -> Option<T> {
        self.constraints
            .iter()
            .fold(candidate, |value, constraint| {
                constraint.apply(record, old, value)
            })
    }
}

impl<T> Default for ConstraintChain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ConstraintChain<T> {
    fn clone(&self) -> Self {
        Self {
            constraints: self.constraints.clone(),
        }
    }
}
