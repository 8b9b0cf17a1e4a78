//! Wired task accessors for one account type.
//!
//! # Invariants
//! - `dtstart` stays before `due`: moving the start forward shifts the due
//!   time, moving the due time backward shifts the start.
//! - Enabling all-day snaps both times to UTC midnight.
//! - Completing a task sets percent-complete to 100; checklist edits update
//!   status and percent-complete unless the task is cancelled.

use super::tasks;
use crate::constraint::{
    AdjustPercentComplete, AfterOrShiftTime, BeforeOrShiftTime, ChecklistProgress, Clamp,
    UpdateAllDay,
};
use crate::field::{
    ArrayChoices, BooleanField, DateTimeField, DefaultAfter, DefaultBefore, DescriptionField,
    FieldAdapter, FormattedStringField, IntegerField, StringField, TaskTime, WithDefault,
};
use crate::model::identity::{Identity, RecordId};
use crate::record::Record;
use std::sync::Arc;

/// Account type used when nothing more specific is registered.
pub const LOCAL_ACCOUNT_TYPE: &str = "local";

/// Task accessors plus the account type they belong to.
pub struct TaskModel {
    account_type: String,
    label: String,
    pub title: Arc<StringField>,
    pub location: Arc<StringField>,
    pub description: Arc<DescriptionField>,
    pub priority: Arc<IntegerField>,
    pub classification: Arc<IntegerField>,
    pub status: Arc<IntegerField>,
    pub percent_complete: Arc<IntegerField>,
    pub all_day: Arc<BooleanField>,
    pub dtstart: Arc<WithDefault<TaskTime>>,
    pub due: Arc<WithDefault<TaskTime>>,
    pub completed: Arc<DateTimeField>,
    pub pinned: Arc<BooleanField>,
    pub list_name: Arc<StringField>,
    pub account_name: Arc<StringField>,
    /// `"<list> (<account>)"`, read-only.
    pub list_and_account: Arc<FormattedStringField>,
}

impl TaskModel {
    pub fn new(account_type: impl Into<String>, label: impl Into<String>) -> Self {
        let percent_complete = Arc::new(
            IntegerField::new(tasks::PERCENT_COMPLETE).with_constraint(Clamp::new(0, 100)),
        );
        let status = Arc::new(
            IntegerField::new(tasks::STATUS)
                .with_default(tasks::STATUS_NEEDS_ACTION)
                .with_constraint(AdjustPercentComplete::new(percent_complete.clone()))
                .with_choices(status_choices()),
        );
        let description = Arc::new(
            DescriptionField::new(tasks::DESCRIPTION).with_constraint(ChecklistProgress::new(
                status.clone(),
                percent_complete.clone(),
            )),
        );

        let plain_dtstart: Arc<dyn FieldAdapter<Value = TaskTime>> =
            Arc::new(time_field(tasks::DTSTART));
        let plain_due: Arc<dyn FieldAdapter<Value = TaskTime>> =
            Arc::new(time_field(tasks::DUE));
        let due = Arc::new(
            WithDefault::new(
                plain_due.clone(),
                DefaultAfter::new(Some(plain_dtstart.clone())),
            )
            .with_constraint(AfterOrShiftTime::new(plain_dtstart.clone())),
        );
        let due_dyn: Arc<dyn FieldAdapter<Value = TaskTime>> = due.clone();
        let dtstart = Arc::new(
            WithDefault::new(plain_dtstart.clone(), DefaultBefore::new(Some(due_dyn.clone())))
                .with_constraint(BeforeOrShiftTime::new(due_dyn)),
        );
        let all_day = Arc::new(
            BooleanField::new(tasks::IS_ALLDAY)
                .with_constraint(UpdateAllDay::new(plain_dtstart))
                .with_constraint(UpdateAllDay::new(plain_due)),
        );

        let list_name = Arc::new(StringField::new(tasks::LIST_NAME));
        let account_name = Arc::new(StringField::new(tasks::ACCOUNT_NAME));
        let list_and_account = Arc::new(FormattedStringField::new(
            "{} ({})",
            vec![list_name.clone(), account_name.clone()],
        ));

        Self {
            account_type: account_type.into(),
            label: label.into(),
            title: Arc::new(StringField::new(tasks::TITLE)),
            location: Arc::new(StringField::new(tasks::LOCATION)),
            description,
            priority: Arc::new(
                IntegerField::new(tasks::PRIORITY)
                    .with_constraint(Clamp::new(tasks::PRIORITY_MIN, tasks::PRIORITY_MAX))
                    .with_choices(priority_choices()),
            ),
            classification: Arc::new(
                IntegerField::new(tasks::CLASSIFICATION).with_choices(classification_choices()),
            ),
            status,
            percent_complete,
            all_day,
            dtstart,
            due,
            completed: Arc::new(DateTimeField::new(tasks::COMPLETED)),
            pinned: Arc::new(BooleanField::new(tasks::PINNED)),
            list_name,
            account_name,
            list_and_account,
        }
    }

    /// Model for tasks that live only in the local database.
    pub fn local() -> Self {
        Self::new(LOCAL_ACCOUNT_TYPE, "Local")
    }

    pub fn account_type(&self) -> &str {
        &self.account_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Fresh insert-shaped task record.
    pub fn new_task(&self) -> Record {
        Record::new_insert(tasks::COLLECTION)
    }

    /// Record bound to an existing task, ready to be loaded.
    pub fn task(&self, id: RecordId) -> Record {
        Record::new(Identity::item(tasks::COLLECTION, id))
    }
}

fn time_field(timestamp_key: &str) -> DateTimeField {
    DateTimeField::new(timestamp_key)
        .with_timezone_key(tasks::TZ)
        .with_all_day_key(tasks::IS_ALLDAY)
}

fn status_choices() -> ArrayChoices {
    ArrayChoices::new()
        .with(tasks::STATUS_NEEDS_ACTION, "Needs action")
        .with(tasks::STATUS_IN_PROCESS, "In process")
        .with(tasks::STATUS_COMPLETED, "Completed")
        .with(tasks::STATUS_CANCELLED, "Cancelled")
}

fn priority_choices() -> ArrayChoices {
    ArrayChoices::new()
        .with(0_i64, "None")
        .with(1_i64, "High")
        .with_hidden(2_i64, "High")
        .with_hidden(3_i64, "High")
        .with_hidden(4_i64, "High")
        .with(5_i64, "Medium")
        .with_hidden(6_i64, "Low")
        .with_hidden(7_i64, "Low")
        .with_hidden(8_i64, "Low")
        .with(9_i64, "Low")
}

fn classification_choices() -> ArrayChoices {
    ArrayChoices::new()
        .with(tasks::CLASSIFICATION_PUBLIC, "Public")
        .with(tasks::CLASSIFICATION_PRIVATE, "Private")
        .with(tasks::CLASSIFICATION_CONFIDENTIAL, "Confidential")
}
