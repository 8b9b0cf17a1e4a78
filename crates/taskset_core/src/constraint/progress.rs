//! Constraints linking status, percent-complete and checklist progress.

use super::Constraint;
use crate::checklist::DescriptionItem;
use crate::field::{FieldAdapter, IntegerField};
use crate::record::Record;
use crate::schema::tasks::{
    STATUS_CANCELLED, STATUS_COMPLETED, STATUS_IN_PROCESS, STATUS_NEEDS_ACTION,
};
use std::sync::Arc;

/// Updates percent-complete when the status is set to completed (100) or
/// needs-action (0).
pub struct AdjustPercentComplete {
    percent_complete: Arc<IntegerField>,
}

impl AdjustPercentComplete {
    pub fn new(percent_complete: Arc<IntegerField>) -> Self {
        Self { percent_complete }
    }
}

impl Constraint<i64> for AdjustPercentComplete {
    fn apply(&self, record: &mut Record, _old: Option<&i64>, candidate: Option<i64>) -> Option<i64> {
        let target = match candidate {
            Some(STATUS_COMPLETED) => Some(100),
            Some(STATUS_NEEDS_ACTION) => Some(0),
            _ => None,
        };
        if let Some(target) = target {
            if self.percent_complete.read(record) != Some(target) {
                self.percent_complete.write(record, Some(target));
            }
        }
        candidate
    }
}

/// Derives percent-complete and status from checked checklist items.
///
/// Only applies when a non-empty checklist changes into another non-empty
/// checklist that has at least one checkbox. A cancelled status is never
/// overwritten.
pub struct ChecklistProgress {
    status: Arc<IntegerField>,
    percent_complete: Arc<IntegerField>,
}

impl ChecklistProgress {
    pub fn new(status: Arc<IntegerField>, percent_complete: Arc<IntegerField>) -> Self {
        Self {
            status,
            percent_complete,
        }
    }
}

impl Constraint<Vec<DescriptionItem>> for ChecklistProgress {
    fn apply(
        &self,
        record: &mut Record,
        old: Option<&Vec<DescriptionItem>>,
        candidate: Option<Vec<DescriptionItem>>,
    ) -> Option<Vec<DescriptionItem>> {
        let (Some(old), Some(new)) = (old, candidate.as_ref()) else {
            return candidate;
        };
        if old.is_empty() || new.is_empty() || old == new {
            return candidate;
        }
        let Some(percent) = checklist_percent(new) else {
            return candidate;
        };

        let old_status = self
            .status
            .read(record)
            .or_else(|| self.status.default_for(record));
        let new_status = if percent == 100 {
            Some(STATUS_COMPLETED)
        } else if percent > 0 || old_status == Some(STATUS_COMPLETED) {
            Some(STATUS_IN_PROCESS)
        } else {
            old_status
        };
        let status_changed = match old_status {
            None => new_status.is_some(),
            Some(status) => Some(status) != new_status && status != STATUS_CANCELLED,
        };
        if status_changed {
            self.status.write(record, new_status);
        }

        if self.percent_complete.read(record) != Some(percent) {
            self.percent_complete.write(record, Some(percent));
        }
        candidate
    }
}

/// Percentage of checked checkboxes, `None` if there are no checkboxes.
pub fn checklist_percent(items: &[DescriptionItem]) -> Option<i64> {
    let (checkboxes, checked) = items
        .iter()
        .filter(|item| item.checkbox)
        .fold((0_i64, 0_i64), |(total, checked), item| {
            (total + 1, checked + i64::from(item.checked))
        });
    (checkboxes > 0).then(|| checked * 100 / checkboxes)
}
