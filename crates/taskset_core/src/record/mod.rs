//! Differential record store.
//!
//! # Responsibility
//! - Hold the loaded baseline and the pending edits of one record.
//! - Compute minimal deltas and infer insert vs update from structure.
//! - Notify change listeners, coalescing notifications in bulk updates.
//! - Hand deltas to a [`Sink`] and baselines from a [`Loader`].
//!
//! # Invariants
//! - Reads resolve pending first, then baseline, then absent.
//! - A write equal to the current effective value is a no-op.
//! - A write equal to the baseline value removes the key from pending.
//! - `is_insert()` iff no baseline and pending non-empty; `is_update()` iff
//!   baseline and pending non-empty.
//! - Persist clears pending without merging it into the baseline. Callers
//!   that need post-persist values must load again.
//! - Only the most recently requested load may replace the baseline.
//!
//! A record has no internal locking and is owned by one execution context.
//! Only the fetch of a load crosses threads (see [`loading`]).

pub mod bulk;
pub mod listener;
pub mod loading;

use crate::collaborator::{CancelSignal, CollaboratorError, LoadOutcome, Loader, Sink};
use crate::model::identity::Identity;
use crate::model::value::{CoercionError, Value, ValueMap};
use bulk::BulkUpdate;
use listener::{ListenerRegistry, ListenerScope, RecordListener, Subscription};
use loading::{spawn_load, LoadCompletion, LoadRequest, LoadTask};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;
use std::sync::Arc;

pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised by record operations.
#[derive(Debug)]
pub enum RecordError {
    /// The operation is not valid for the current identity (e.g. loading a
    /// collection).
    InvalidOperation {
        operation: &'static str,
        identity: Identity,
    },
    /// The record was deleted and has no identity anymore.
    Deleted { operation: &'static str },
    /// `finish_bulk_update` without a matching `start_bulk_update`.
    UnbalancedBulkUpdate,
    /// A loader or sink failed.
    Collaborator {
        operation: &'static str,
        source: CollaboratorError,
    },
}

impl Display for RecordError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOperation {
                operation,
                identity,
            } => write!(f, "cannot {operation} record at `{identity}`"),
            Self::Deleted { operation } => write!(f, "cannot {operation} a deleted record"),
            Self::UnbalancedBulkUpdate => {
                write!(f, "finish_bulk_update called without open bulk update")
            }
            Self::Collaborator { operation, source } => {
                write!(f, "{operation} failed: {source}")
            }
        }
    }
}

impl Error for RecordError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Collaborator { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Coarse lifecycle position of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No baseline, no load requested.
    Unbound,
    Loading,
    /// Baseline present, nothing pending, no persist since the load.
    Loaded,
    /// Pending edits exist.
    Dirty,
    /// Pending edits were handed to a sink and cleared.
    Clean,
    /// Terminal; identity and maps are cleared.
    Deleted,
}

/// Serializable record state without listeners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub identity: Option<Identity>,
    pub baseline: Option<ValueMap>,
    pub pending: ValueMap,
}

/// Diff-tracked key/value record.
pub struct Record {
    identity: Option<Identity>,
    baseline: Option<ValueMap>,
    pending: ValueMap,
    bulk_depth: usize,
    load_generation: u64,
    active_load: Option<CancelSignal>,
    persisted: bool,
    listeners: Rc<RefCell<ListenerRegistry>>,
}

impl Record {
    /// Creates a record for `identity`.
    ///
    /// A collection identity yields an insert-shaped record; an item
    /// identity yields a record that can be loaded.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            baseline: None,
            pending: ValueMap::new(),
            bulk_depth: 0,
            load_generation: 0,
            active_load: None,
            persisted: false,
            listeners: Rc::new(RefCell::new(ListenerRegistry::default())),
        }
    }

    /// Creates an insert-shaped record below `collection`.
    pub fn new_insert(collection: impl Into<String>) -> Self {
        Self::new(Identity::collection(collection))
    }

    /// Rebuilds a record from a snapshot. Listeners are not restored.
    pub fn restore(snapshot: RecordSnapshot) -> Self {
        let mut record = Self::new(Identity::collection(""));
        record.identity = snapshot.identity;
        record.baseline = snapshot.baseline;
        record.pending = snapshot.pending;
        record
    }

    pub fn snapshot(&self) -> RecordSnapshot {
        RecordSnapshot {
            identity: self.identity.clone(),
            baseline: self.baseline.clone(),
            pending: self.pending.clone(),
        }
    }

    /// Copies identity, baseline and pending edits, but no listeners and no
    /// in-flight load.
    pub fn duplicate(&self) -> Self {
        Self::restore(self.snapshot())
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn baseline(&self) -> Option<&ValueMap> {
        self.baseline.as_ref()
    }

    pub fn pending(&self) -> &ValueMap {
        &self.pending
    }

    pub fn is_loading(&self) -> bool {
        self.active_load.is_some()
    }

    pub fn is_insert(&self) -> bool {
        self.baseline.is_none() && !self.pending.is_empty()
    }

    pub fn is_update(&self) -> bool {
        self.baseline.is_some() && !self.pending.is_empty()
    }

    pub fn state(&self) -> RecordState {
        if self.identity.is_none() {
            RecordState::Deleted
        } else if self.is_loading() {
            RecordState::Loading
        } else if !self.pending.is_empty() {
            RecordState::Dirty
        } else if self.persisted {
            RecordState::Clean
        } else if self.baseline.is_some() {
            RecordState::Loaded
        } else {
            RecordState::Unbound
        }
    }

    /// Effective value of `key`: pending, then baseline, then absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.pending.get(key) {
            return Some(value);
        }
        self.baseline.as_ref().and_then(|baseline| baseline.get(key))
    }

    pub fn get_as_integer(&self, key: &str) -> Result<Option<i64>, CoercionError> {
        self.get(key).map_or(Ok(None), Value::as_integer)
    }

    pub fn get_as_real(&self, key: &str) -> Result<Option<f64>, CoercionError> {
        self.get(key).map_or(Ok(None), Value::as_real)
    }

    pub fn get_as_text(&self, key: &str) -> Result<Option<String>, CoercionError> {
        self.get(key).map_or(Ok(None), Value::as_text)
    }

    /// Whether `key` has an effective value (possibly null).
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether `key` is part of the pending delta.
    pub fn persists_key(&self, key: &str) -> bool {
        self.pending.contains_key(key)
    }

    /// Writes `value` to `key` and returns whether the effective value
    /// changed.
    ///
    /// Absent and `Null` are treated as equal.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let unchanged = match self.get(key) {
            Some(current) => *current == value,
            None => value.is_null(),
        };
        if unchanged {
            return false;
        }

        let matches_baseline = self
            .baseline
            .as_ref()
            .and_then(|baseline| baseline.get(key))
            .map_or(value.is_null(), |before| *before == value);
        if matches_baseline {
            self.pending.remove(key);
        } else {
            self.pending.insert(key.to_string(), value);
        }

        self.notify_field_changed(key);
        true
    }

    /// Clears `key`; same as writing `Value::Null`.
    pub fn remove(&mut self, key: &str) -> bool {
        self.put(key, Value::Null)
    }

    /// Copies the baseline values of `keys` into pending so that the next
    /// persist writes them again. Keys already pending are kept as they are.
    pub fn ensure_values(&mut self, keys: &[&str]) {
        let Some(baseline) = self.baseline.as_ref() else {
            return;
        };
        for key in keys {
            if self.pending.contains_key(*key) {
                continue;
            }
            if let Some(value) = baseline.get(*key) {
                self.pending.insert((*key).to_string(), value.clone());
            }
        }
    }

    pub fn start_bulk_update(&mut self) {
        self.bulk_depth += 1;
    }

    /// Closes one bulk update level. When the outermost level closes, every
    /// listener whose fields changed is notified exactly once.
    pub fn finish_bulk_update(&mut self) -> RecordResult<()> {
        if self.bulk_depth == 0 {
            warn!("event=bulk_update module=record status=error error_code=unbalanced");
            return Err(RecordError::UnbalancedBulkUpdate);
        }
        self.bulk_depth -= 1;
        if self.bulk_depth == 0 {
            let targets = self.listeners.borrow_mut().drain_queued();
            for listener in targets {
                listener.on_field_changed(self);
            }
        }
        Ok(())
    }

    /// Opens a bulk update that is finished when the guard drops.
    pub fn bulk_update(&mut self) -> BulkUpdate<'_> {
        BulkUpdate::new(self)
    }

    pub fn bulk_depth(&self) -> usize {
        self.bulk_depth
    }

    /// Registers `listener` for `scope`.
    ///
    /// With `notify_immediately`, the listener receives `on_record_loaded`
    /// right away if the record already holds data.
    pub fn add_change_listener(
        &self,
        listener: &Rc<dyn RecordListener>,
        scope: ListenerScope,
        notify_immediately: bool,
    ) -> Subscription {
        let id = self.listeners.borrow_mut().add(&scope, listener);
        let subscription = Subscription::single(&self.listeners, id);
        if notify_immediately && self.has_data() {
            listener.on_record_loaded(self);
        }
        subscription
    }

    /// Registers `listener` for every field in `keys` as one subscription.
    ///
    /// The immediate notification, if requested, is delivered once.
    pub fn subscribe_fields(
        &self,
        listener: &Rc<dyn RecordListener>,
        keys: &[&str],
        notify_immediately: bool,
    ) -> Subscription {
        let subscription = {
            let mut registry = self.listeners.borrow_mut();
            keys.iter()
                .map(|key| registry.add(&ListenerScope::field(*key), listener))
                .collect::<Vec<_>>()
        }
        .into_iter()
        .fold(Subscription::empty(), |acc, id| {
            acc.join(Subscription::single(&self.listeners, id))
        });
        if notify_immediately && self.has_data() {
            listener.on_record_loaded(self);
        }
        subscription
    }

    /// Removes every registration of `listener` for `scope`.
    pub fn remove_change_listener(
        &self,
        listener: &Rc<dyn RecordListener>,
        scope: &ListenerScope,
    ) -> bool {
        self.listeners.borrow_mut().remove_listener(scope, listener)
    }

    /// Number of live registrations for `scope`.
    pub fn listener_count(&self, scope: &ListenerScope) -> usize {
        self.listeners.borrow().live_count(scope)
    }

    /// Validates the identity and opens a new load generation.
    ///
    /// Any previous in-flight load is cancelled and its completion will be
    /// ignored.
    pub fn begin_load(&mut self) -> RecordResult<LoadRequest> {
        let identity = match &self.identity {
            None => return Err(RecordError::Deleted { operation: "load" }),
            Some(identity) if !identity.is_item() => {
                return Err(RecordError::InvalidOperation {
                    operation: "load",
                    identity: identity.clone(),
                });
            }
            Some(identity) => identity.clone(),
        };

        if let Some(previous) = self.active_load.take() {
            previous.cancel();
        }
        self.load_generation += 1;
        let cancel = CancelSignal::new();
        self.active_load = Some(cancel.clone());
        info!(
            "event=record_load module=record status=start generation={}",
            self.load_generation
        );

        Ok(LoadRequest {
            identity,
            generation: self.load_generation,
            cancel,
        })
    }

    /// Starts a background load. Apply the result on this record's owning
    /// context with [`Record::complete_load`].
    pub fn load(&mut self, loader: Arc<dyn Loader + Send + Sync>) -> RecordResult<LoadTask> {
        let request = self.begin_load()?;
        match spawn_load(loader, request) {
            Ok(task) => Ok(task),
            Err(err) => {
                self.active_load = None;
                Err(err)
            }
        }
    }

    /// Loads on the calling context.
    pub fn load_blocking(&mut self, loader: &dyn Loader) -> RecordResult<bool> {
        let request = self.begin_load()?;
        let completion = request.run(loader);
        Ok(self.complete_load(completion))
    }

    /// Applies a finished load. Returns `false` when the completion was
    /// superseded or the record is gone.
    ///
    /// A fetch error is treated like "not found".
    pub fn complete_load(&mut self, completion: LoadCompletion) -> bool {
        if self.identity.is_none() || completion.generation != self.load_generation {
            debug!(
                "event=record_load module=record status=skip reason=superseded generation={} current={}",
                completion.generation, self.load_generation
            );
            return false;
        }
        if self.active_load.take().is_none() {
            debug!(
                "event=record_load module=record status=skip reason=already_applied generation={}",
                completion.generation
            );
            return false;
        }

        self.baseline = match completion.outcome {
            Ok(LoadOutcome::Found(values)) => {
                info!(
                    "event=record_load module=record status=ok generation={} keys={}",
                    completion.generation,
                    values.len()
                );
                Some(values)
            }
            Ok(LoadOutcome::NotFound) => {
                info!(
                    "event=record_load module=record status=ok generation={} found=false",
                    completion.generation
                );
                None
            }
            Err(err) => {
                warn!(
                    "event=record_load module=record status=error generation={} error={}",
                    completion.generation, err
                );
                None
            }
        };
        self.persisted = false;

        let targets = self.listeners.borrow_mut().reload_targets();
        for listener in targets {
            listener.on_record_loaded(self);
        }
        true
    }

    /// Hands the pending delta to `sink` and returns the resulting identity.
    ///
    /// Inserts adopt the identity returned by the sink. Pending is cleared
    /// but not merged into the baseline.
    pub fn persist(&mut self, sink: &dyn Sink) -> RecordResult<Identity> {
        let Some(identity) = self.identity.clone() else {
            return Err(RecordError::Deleted {
                operation: "persist",
            });
        };
        if self.pending.is_empty() {
            debug!("event=record_persist module=record status=skip reason=no_changes");
            return Ok(identity);
        }
        if self.is_loading() {
            return Err(RecordError::InvalidOperation {
                operation: "persist while loading",
                identity,
            });
        }

        let identity = if self.is_insert() {
            let created = sink
                .insert(&identity, &self.pending)
                .map_err(|source| RecordError::Collaborator {
                    operation: "insert",
                    source,
                })?;
            info!(
                "event=record_persist module=record status=ok mode=insert keys={}",
                self.pending.len()
            );
            created
        } else {
            sink.update(&identity, &self.pending)
                .map_err(|source| RecordError::Collaborator {
                    operation: "update",
                    source,
                })?;
            info!(
                "event=record_persist module=record status=ok mode=update keys={}",
                self.pending.len()
            );
            identity
        };

        self.identity = Some(identity.clone());
        self.pending.clear();
        self.persisted = true;
        Ok(identity)
    }

    /// Deletes the stored record. The record is unusable afterwards.
    pub fn delete(&mut self, sink: &dyn Sink) -> RecordResult<()> {
        let Some(identity) = self.identity.clone() else {
            warn!("event=record_delete module=record status=skip reason=already_deleted");
            return Ok(());
        };
        if !identity.is_item() {
            return Err(RecordError::InvalidOperation {
                operation: "delete",
                identity,
            });
        }

        sink.delete(&identity)
            .map_err(|source| RecordError::Collaborator {
                operation: "delete",
                source,
            })?;
        info!("event=record_delete module=record status=ok");

        if let Some(load) = self.active_load.take() {
            load.cancel();
        }
        self.baseline = None;
        self.pending.clear();
        self.identity = None;
        Ok(())
    }

    fn has_data(&self) -> bool {
        self.baseline.is_some() || !self.pending.is_empty()
    }

    fn notify_field_changed(&self, key: &str) {
        if self.bulk_depth > 0 {
            self.listeners.borrow_mut().enqueue_field(key);
            return;
        }
        let targets = self.listeners.borrow_mut().field_targets(key);
        for listener in targets {
            listener.on_field_changed(self);
        }
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        if let Some(load) = self.active_load.take() {
            load.cancel();
        }
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("identity", &self.identity)
            .field("baseline", &self.baseline)
            .field("pending", &self.pending)
            .field("bulk_depth", &self.bulk_depth)
            .field("load_generation", &self.load_generation)
            .finish_non_exhaustive()
    }
}
