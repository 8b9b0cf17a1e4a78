//! Constraints keeping start, due and all-day values consistent.
//!
//! # Invariants
//! - The candidate value is never changed; only the sibling time is.
//! - Sibling writes go through the sibling's plain `write`, so sibling
//!   constraints do not cascade.

use super::Constraint;
use crate::field::datetime::TaskTime;
use crate::field::defaults::{DefaultAfter, DefaultValue};
use crate::field::FieldAdapter;
use crate::record::Record;
use std::sync::Arc;

type TimeField = Arc<dyn FieldAdapter<Value = TaskTime>>;

/// Moves a sibling time by the same delta as the edited one.
pub struct ShiftTime {
    target: TimeField,
}

impl ShiftTime {
    pub fn new(target: TimeField) -> Self {
        Self { target }
    }
}

impl Constraint<TaskTime> for ShiftTime {
    fn apply(
        &self,
        record: &mut Record,
        old: Option<&TaskTime>,
        candidate: Option<TaskTime>,
    ) -> Option<TaskTime> {
        if let (Some(target), Some(old), Some(new)) =
            (self.target.read(record), old, candidate.as_ref())
        {
            let delta = new.timestamp_ms.saturating_sub(old.timestamp_ms);
            self.target.write(record, Some(target.shifted(delta)));
        }
        candidate
    }
}

/// Keeps the edited time strictly before a reference time.
///
/// When the edited time moves forward onto or past the reference, the
/// reference is shifted by the same delta. If it is still violated, the
/// reference is reset to one span after the edited time.
pub struct BeforeOrShiftTime {
    reference: TimeField,
    fallback: DefaultAfter,
}

impl BeforeOrShiftTime {
    pub fn new(reference: TimeField) -> Self {
        Self {
            reference,
            fallback: DefaultAfter::new(None),
        }
    }
}

impl Constraint<TaskTime> for BeforeOrShiftTime {
    fn apply(
        &self,
        record: &mut Record,
        old: Option<&TaskTime>,
        candidate: Option<TaskTime>,
    ) -> Option<TaskTime> {
        let (Some(mut reference), Some(new)) = (self.reference.read(record), candidate.as_ref())
        else {
            return candidate;
        };

        if let Some(old) = old {
            let delta = new.timestamp_ms.saturating_sub(old.timestamp_ms);
            if !new.is_before(&reference) && delta > 0 {
                reference = reference.shifted(delta);
                self.reference.write(record, Some(reference.clone()));
            }
        }
        if !new.is_before(&reference) {
            let reset = self.fallback.custom_default(record, Some(new.clone()));
            self.reference.write(record, reset);
        }
        candidate
    }
}

/// Keeps the edited time at or after a reference time.
///
/// When the edited time moves backward before the reference, the reference
/// is shifted back by the same delta. If it is still violated, the
/// reference is set to the edited time.
pub struct AfterOrShiftTime {
    reference: TimeField,
}

impl AfterOrShiftTime {
    pub fn new(reference: TimeField) -> Self {
        Self { reference }
    }
}

impl Constraint<TaskTime> for AfterOrShiftTime {
    fn apply(
        &self,
        record: &mut Record,
        old: Option<&TaskTime>,
        candidate: Option<TaskTime>,
    ) -> Option<TaskTime> {
        let (Some(mut reference), Some(new)) = (self.reference.read(record), candidate.as_ref())
        else {
            return candidate;
        };

        if let Some(old) = old {
            let delta = new.timestamp_ms.saturating_sub(old.timestamp_ms);
            if new.is_before(&reference) && delta < 0 {
                reference = reference.shifted(delta);
                self.reference.write(record, Some(reference.clone()));
            }
        }
        if new.is_before(&reference) {
            self.reference.write(record, Some(new.clone()));
        }
        candidate
    }
}

/// Snaps a time field to UTC midnight when all-day gets enabled.
pub struct UpdateAllDay {
    target: TimeField,
}

impl UpdateAllDay {
    pub fn new(target: TimeField) -> Self {
        Self { target }
    }
}

impl Constraint<bool> for UpdateAllDay {
    fn apply(&self, record: &mut Record, old: Option<&bool>, candidate: Option<bool>) -> Option<bool> {
        let enabling = old != Some(&true) && candidate == Some(true);
        if enabling {
            if let Some(time) = self.target.read(record) {
                if !time.is_midnight_utc() {
                    self.target.write(record, Some(time.to_all_day()));
                }
            }
        }
        candidate
    }
}
