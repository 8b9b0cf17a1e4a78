//! Value-only constraints.

use super::Constraint;
use crate::record::Record;

/// Clamps integer candidates into `[min, max]`. `None` passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamp {
    min: i64,
    max: i64,
}

impl Clamp {
    /// Bounds are swapped when given in reverse order.
    pub fn new(min: i64, max: i64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

impl Constraint<i64> for Clamp {
    fn apply(&self, _record: &mut Record, _old: Option<&i64>, candidate: Option<i64>) -> Option<i64> {
        candidate.map(|value| value.clamp(self.min, self.max))
    }
}

/// Replaces a cleared candidate with a fixed fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct NotNull<T> {
    fallback: T,
}

impl<T> NotNull<T> {
    pub fn new(fallback: T) -> Self {
        Self { fallback }
    }
}

impl<T: Clone> Constraint<T> for NotNull<T> {
    fn apply(&self, _record: &mut Record, _old: Option<&T>, candidate: Option<T>) -> Option<T> {
        candidate.or_else(|| Some(self.fallback.clone()))
    }
}
