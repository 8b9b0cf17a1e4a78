//! Scoped bulk-update guard.

use super::Record;
use log::error;
use std::ops::{Deref, DerefMut};

/// Keeps a bulk update open for its lifetime.
///
/// Created by [`Record::bulk_update`]. The update is finished on drop, so
/// notifications are flushed on every exit path, unwinding included.
pub struct BulkUpdate<'a> {
    record: &'a mut Record,
}

impl<'a> BulkUpdate<'a> {
    pub(crate) fn new(record: &'a mut Record) -> Self {
        record.start_bulk_update();
        Self { record }
    }
}

impl Deref for BulkUpdate<'_> {
    type Target = Record;

    fn deref(&self) -> &Self::Target {
        self.record
    }
}

impl DerefMut for BulkUpdate<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.record
    }
}

impl Drop for BulkUpdate<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.record.finish_bulk_update() {
            error!("event=bulk_update module=record status=error error={err}");
        }
    }
}
