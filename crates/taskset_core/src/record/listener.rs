//! Change listener registry and scoped subscriptions.
//!
//! # Responsibility
//! - Keep per-field and reload listener registrations for one record.
//! - Queue and deduplicate notifications raised inside bulk updates.
//!
//! # Invariants
//! - The registry only holds `Weak` references; it never keeps a listener
//!   alive. Dead entries are pruned lazily while collecting targets.
//! - One notification round calls each distinct listener at most once.
//! - Dropping a [`Subscription`] removes its registrations before the next
//!   notification round.

use super::Record;
use log::warn;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

/// Callback interface for record observers.
///
/// Callbacks run synchronously on the record's owning context and receive a
/// shared borrow, so they cannot mutate the record that notifies them.
pub trait RecordListener {
    /// One or more watched fields changed their effective value.
    fn on_field_changed(&self, record: &Record);

    /// The record baseline was (re)loaded, or the listener asked for an
    /// initial notification on registration.
    fn on_record_loaded(&self, record: &Record);
}

/// What a registration listens to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerScope {
    /// Effective-value changes of one field.
    Field(String),
    /// Baseline loads of the whole record.
    Reload,
}

impl ListenerScope {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }
}

pub(crate) type ListenerId = u64;

/// Thin address of a listener allocation, used for deduplication.
type ListenerKey = usize;

fn listener_key(listener: &Rc<dyn RecordListener>) -> ListenerKey {
    Rc::as_ptr(listener) as *const () as usize
}

struct Entry {
    id: ListenerId,
    key: ListenerKey,
    listener: Weak<dyn RecordListener>,
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: ListenerId,
    fields: BTreeMap<String, Vec<Entry>>,
    reload: Vec<Entry>,
    queued: Vec<ListenerKey>,
}

impl ListenerRegistry {
    pub(crate) fn add(
        &mut self,
        scope: &ListenerScope,
        listener: &Rc<dyn RecordListener>,
    ) -> ListenerId {
        self.next_id = self.next_id.saturating_add(1);
        let entry = Entry {
            id: self.next_id,
            key: listener_key(listener),
            listener: Rc::downgrade(listener),
        };
        match scope {
            ListenerScope::Field(name) => self.fields.entry(name.clone()).or_default().push(entry),
            ListenerScope::Reload => self.reload.push(entry),
        }
        self.next_id
    }

    pub(crate) fn remove_id(&mut self, id: ListenerId) -> bool {
        if let Some(index) = self.reload.iter().position(|entry| entry.id == id) {
            self.reload.remove(index);
            return true;
        }
        for entries in self.fields.values_mut() {
            if let Some(index) = entries.iter().position(|entry| entry.id == id) {
                entries.remove(index);
                return true;
            }
        }
        false
    }

    pub(crate) fn remove_listener(
        &mut self,
        scope: &ListenerScope,
        listener: &Rc<dyn RecordListener>,
    ) -> bool {
        let key = listener_key(listener);
        let entries = match scope {
            ListenerScope::Field(name) => match self.fields.get_mut(name) {
                Some(entries) => entries,
                None => return false,
            },
            ListenerScope::Reload => &mut self.reload,
        };
        let before = entries.len();
        entries.retain(|entry| entry.key != key);
        before != entries.len()
    }

    /// Returns live listeners for `field`, deduplicated, pruning dead ones.
    pub(crate) fn field_targets(&mut self, field: &str) -> Vec<Rc<dyn RecordListener>> {
        match self.fields.get_mut(field) {
            Some(entries) => collect_live(entries),
            None => Vec::new(),
        }
    }

    pub(crate) fn reload_targets(&mut self) -> Vec<Rc<dyn RecordListener>> {
        collect_live(&mut self.reload)
    }

    /// Queues the field's listeners for the next flush.
    pub(crate) fn enqueue_field(&mut self, field: &str) {
        let Some(entries) = self.fields.get(field) else {
            return;
        };
        for entry in entries {
            if !self.queued.contains(&entry.key) {
                self.queued.push(entry.key);
            }
        }
    }

    /// Resolves queued keys against the field registrations still present,
    /// so listeners released during the bulk update are skipped.
    pub(crate) fn drain_queued(&mut self) -> Vec<Rc<dyn RecordListener>> {
        let queued = std::mem::take(&mut self.queued);
        queued
            .into_iter()
            .filter_map(|key| {
                self.fields
                    .values()
                    .flatten()
                    .filter(|entry| entry.key == key)
                    .find_map(|entry| entry.listener.upgrade())
            })
            .collect()
    }

    pub(crate) fn live_count(&self, scope: &ListenerScope) -> usize {
        let entries = match scope {
            ListenerScope::Field(name) => match self.fields.get(name) {
                Some(entries) => entries.as_slice(),
                None => return 0,
            },
            ListenerScope::Reload => self.reload.as_slice(),
        };
        entries
            .iter()
            .filter(|entry| entry.listener.strong_count() > 0)
            .count()
    }
}

fn collect_live(entries: &mut Vec<Entry>) -> Vec<Rc<dyn RecordListener>> {
    entries.retain(|entry| entry.listener.strong_count() > 0);
    let mut seen: Vec<ListenerKey> = Vec::with_capacity(entries.len());
    let mut targets = Vec::with_capacity(entries.len());
    for entry in entries.iter() {
        if seen.contains(&entry.key) {
            continue;
        }
        if let Some(listener) = entry.listener.upgrade() {
            seen.push(entry.key);
            targets.push(listener);
        }
    }
    targets
}

/// Scoped registration handle returned by listener registration.
///
/// Dropping the handle unregisters every registration it holds. Handles for
/// several keys (or several records) can be merged with [`Subscription::join`].
#[must_use = "dropping a Subscription unregisters its listener"]
#[derive(Default)]
pub struct Subscription {
    registrations: Vec<(Weak<RefCell<ListenerRegistry>>, ListenerId)>,
}

impl Subscription {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn single(registry: &Rc<RefCell<ListenerRegistry>>, id: ListenerId) -> Self {
        Self {
            registrations: vec![(Rc::downgrade(registry), id)],
        }
    }

    /// Merges `other` into this handle; both are released together.
    pub fn join(mut self, mut other: Subscription) -> Self {
        self.registrations.append(&mut other.registrations);
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Releases all registrations now.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for (registry, id) in self.registrations.drain(..) {
            let Some(registry) = registry.upgrade() else {
                continue;
            };
            let borrowed = registry.try_borrow_mut();
            match borrowed {
                Ok(mut registry) => {
                    registry.remove_id(id);
                }
                Err(_) => {
                    warn!(
                        "event=listener_release module=record status=error error_code=registry_busy listener_id={id}"
                    );
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ListenerRegistry, ListenerScope, RecordListener};
    use crate::record::Record;
    use std::rc::Rc;

    struct Noop;

    impl RecordListener for Noop {
        fn on_field_changed(&self, _record: &Record) {}
        fn on_record_loaded(&self, _record: &Record) {}
    }

    #[test]
    fn targets_are_deduplicated_per_listener() {
        let mut registry = ListenerRegistry::default();
        let listener: Rc<dyn RecordListener> = Rc::new(Noop);
        let scope = ListenerScope::field("title");
        registry.add(&scope, &listener);
        registry.add(&scope, &listener);

        assert_eq!(registry.field_targets("title").len(), 1);
        assert_eq!(registry.live_count(&scope), 2);
    }

    #[test]
    fn dead_listeners_are_pruned() {
        let mut registry = ListenerRegistry::default();
        let listener: Rc<dyn RecordListener> = Rc::new(Noop);
        registry.add(&ListenerScope::Reload, &listener);
        drop(listener);

        assert!(registry.reload_targets().is_empty());
        assert_eq!(registry.live_count(&ListenerScope::Reload), 0);
    }

    #[test]
    fn queue_keeps_one_entry_per_listener_across_fields() {
        let mut registry = ListenerRegistry::default();
        let listener: Rc<dyn RecordListener> = Rc::new(Noop);
        registry.add(&ListenerScope::field("dtstart"), &listener);
        registry.add(&ListenerScope::field("tz"), &listener);

        registry.enqueue_field("dtstart");
        registry.enqueue_field("tz");
        registry.enqueue_field("unwatched");

        assert_eq!(registry.drain_queued().len(), 1);
        assert!(registry.drain_queued().is_empty());
    }

    #[test]
    fn queued_listener_removed_before_flush_is_skipped() {
        let mut registry = ListenerRegistry::default();
        let listener: Rc<dyn RecordListener> = Rc::new(Noop);
        let id = registry.add(&ListenerScope::field("title"), &listener);

        registry.enqueue_field("title");
        assert!(registry.remove_id(id));

        assert!(registry.drain_queued().is_empty());
    }
}
