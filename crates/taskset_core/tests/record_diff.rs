use std::cell::{Cell, RefCell};
use std::rc::Rc;
use taskset_core::{
    CancelSignal, CollaboratorError, Identity, ListenerScope, LoadOutcome, Loader, Record,
    RecordError, RecordListener, RecordState, Sink, Value, ValueMap,
};
use uuid::Uuid;

struct FixedLoader(Option<ValueMap>);

impl Loader for FixedLoader {
    fn fetch(
        &self,
        _identity: &Identity,
        _cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        Ok(match &self.0 {
            Some(values) => LoadOutcome::Found(values.clone()),
            None => LoadOutcome::NotFound,
        })
    }
}

#[derive(Default)]
struct RecordingSink {
    calls: RefCell<Vec<(&'static str, ValueMap)>>,
    created: Cell<Option<Uuid>>,
}

impl Sink for RecordingSink {
    fn insert(&self, target: &Identity, values: &ValueMap) -> Result<Identity, CollaboratorError> {
        self.calls.borrow_mut().push(("insert", values.clone()));
        let id = Uuid::new_v4();
        self.created.set(Some(id));
        Ok(Identity::item(target.collection_name(), id))
    }

    fn update(&self, _target: &Identity, values: &ValueMap) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push(("update", values.clone()));
        Ok(())
    }

    fn delete(&self, _target: &Identity) -> Result<(), CollaboratorError> {
        self.calls.borrow_mut().push(("delete", ValueMap::new()));
        Ok(())
    }
}

#[derive(Default)]
struct CountingListener {
    changed: Cell<usize>,
    loaded: Cell<usize>,
}

impl RecordListener for CountingListener {
    fn on_field_changed(&self, _record: &Record) {
        self.changed.set(self.changed.get() + 1);
    }

    fn on_record_loaded(&self, _record: &Record) {
        self.loaded.set(self.loaded.get() + 1);
    }
}

fn values(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn loaded_record(pairs: &[(&str, Value)]) -> Record {
    let mut record = Record::new(Identity::item("tasks", Uuid::new_v4()));
    let applied = record
        .load_blocking(&FixedLoader(Some(values(pairs))))
        .expect("load baseline");
    assert!(applied);
    record
}

fn counting_listener() -> (Rc<CountingListener>, Rc<dyn RecordListener>) {
    let counter = Rc::new(CountingListener::default());
    let listener: Rc<dyn RecordListener> = counter.clone();
    (counter, listener)
}

#[test]
fn fresh_record_write_is_an_insert() {
    let mut record = Record::new_insert("tasks");
    assert_eq!(record.state(), RecordState::Unbound);

    assert!(record.put("title", "Buy milk"));

    assert!(record.is_insert());
    assert!(!record.is_update());
    assert_eq!(record.get("title"), Some(&Value::from("Buy milk")));
    assert_eq!(record.state(), RecordState::Dirty);
}

#[test]
fn persist_of_loaded_record_sends_only_the_delta() {
    let mut record = loaded_record(&[
        ("title", Value::from("Buy milk")),
        ("done", Value::Integer(0)),
    ]);
    assert_eq!(record.state(), RecordState::Loaded);

    record.put("done", 1_i64);
    assert!(record.is_update());

    let sink = RecordingSink::default();
    let identity = record.persist(&sink).expect("persist update");

    assert_eq!(Some(&identity), record.identity());
    assert_eq!(
        *sink.calls.borrow(),
        vec![("update", values(&[("done", Value::Integer(1))]))]
    );
}

#[test]
fn writing_null_over_null_baseline_is_a_no_op() {
    let mut record = loaded_record(&[("due", Value::Null)]);
    let (counter, listener) = counting_listener();
    let _subscription = record.add_change_listener(&listener, ListenerScope::field("due"), false);

    assert!(!record.put("due", Value::Null));
    assert!(!record.remove("due"));

    assert!(record.pending().is_empty());
    assert_eq!(counter.changed.get(), 0);
}

#[test]
fn writing_the_current_value_is_idempotent() {
    let mut record = Record::new_insert("tasks");
    record.put("title", "eggs");
    let (counter, listener) = counting_listener();
    let _subscription =
        record.add_change_listener(&listener, ListenerScope::field("title"), false);

    let current = record.get("title").cloned().expect("title set");
    assert!(!record.put("title", current));

    assert_eq!(record.pending().len(), 1);
    assert_eq!(counter.changed.get(), 0);
}

#[test]
fn writing_the_baseline_value_back_removes_the_pending_entry() {
    let mut record = loaded_record(&[("priority", Value::Integer(3))]);

    record.put("priority", 5_i64);
    assert!(record.persists_key("priority"));

    record.put("priority", 3_i64);
    assert!(!record.persists_key("priority"));
    assert!(record.pending().is_empty());
    assert!(!record.is_update());
    assert_eq!(record.get_as_integer("priority").expect("integer"), Some(3));
}

#[test]
fn clearing_a_key_missing_from_the_baseline_leaves_no_delta() {
    let mut fresh = Record::new_insert("tasks");
    fresh.put("title", "Buy milk");
    assert!(fresh.remove("title"));

    assert!(fresh.pending().is_empty());
    assert!(!fresh.is_insert());
    assert_eq!(fresh.get("title"), None);

    let mut loaded = loaded_record(&[("priority", Value::Integer(3))]);
    loaded.put("title", "Buy milk");
    assert!(loaded.remove("title"));

    assert!(loaded.pending().is_empty());
    assert!(!loaded.is_update());
    let sink = RecordingSink::default();
    loaded.persist(&sink).expect("persist without delta");
    assert!(sink.calls.borrow().is_empty());
}

#[test]
fn insert_and_update_follow_baseline_and_pending_presence() {
    let empty = Record::new_insert("tasks");
    assert!(!empty.is_insert() && !empty.is_update());

    let mut inserting = Record::new_insert("tasks");
    inserting.put("title", "x");
    assert!(inserting.is_insert() && !inserting.is_update());

    let loaded = loaded_record(&[("title", Value::from("x"))]);
    assert!(!loaded.is_insert() && !loaded.is_update());

    let mut updating = loaded_record(&[("title", Value::from("x"))]);
    updating.put("title", "y");
    assert!(!updating.is_insert() && updating.is_update());
}

#[test]
fn missing_baseline_keeps_record_insert_shaped() {
    let mut record = Record::new(Identity::item("tasks", Uuid::new_v4()));
    let applied = record
        .load_blocking(&FixedLoader(None))
        .expect("load missing");
    assert!(applied);
    assert!(record.baseline().is_none());

    record.put("title", "new");
    assert!(record.is_insert());
}

#[test]
fn insert_adopts_sink_identity_and_clears_pending_without_merge() {
    let mut record = Record::new_insert("tasks");
    record.put("title", "eggs");
    let sink = RecordingSink::default();

    let identity = record.persist(&sink).expect("persist insert");

    let created = sink.created.get().expect("sink created an id");
    assert_eq!(identity, Identity::item("tasks", created));
    assert_eq!(record.identity(), Some(&identity));
    assert!(record.pending().is_empty());
    assert_eq!(record.get("title"), None);
    assert_eq!(record.state(), RecordState::Clean);
    assert_eq!(sink.calls.borrow()[0].0, "insert");
}

#[test]
fn persist_without_changes_does_not_call_the_sink() {
    let mut record = loaded_record(&[("title", Value::from("x"))]);
    let sink = RecordingSink::default();

    let identity = record.persist(&sink).expect("empty persist");

    assert_eq!(Some(&identity), record.identity());
    assert!(sink.calls.borrow().is_empty());
}

#[test]
fn ensure_values_rewrites_baseline_keys() {
    let mut record = loaded_record(&[
        ("title", Value::from("x")),
        ("status", Value::Integer(1)),
    ]);
    record.put("status", 2_i64);

    record.ensure_values(&["title", "status", "missing"]);

    assert_eq!(
        record.pending(),
        &values(&[
            ("status", Value::Integer(2)),
            ("title", Value::from("x")),
        ])
    );
}

#[test]
fn delete_is_terminal_and_repeated_delete_is_harmless() {
    let mut record = loaded_record(&[("title", Value::from("x"))]);
    let sink = RecordingSink::default();

    record.delete(&sink).expect("delete");
    assert_eq!(record.state(), RecordState::Deleted);
    assert_eq!(record.identity(), None);
    assert_eq!(record.get("title"), None);

    record.delete(&sink).expect("second delete is a no-op");
    assert_eq!(sink.calls.borrow().len(), 1);

    assert!(matches!(
        record.persist(&sink),
        Err(RecordError::Deleted { .. })
    ));
    assert!(matches!(
        record.load_blocking(&FixedLoader(None)),
        Err(RecordError::Deleted { .. })
    ));
}

#[test]
fn collection_identities_cannot_be_loaded_or_deleted() {
    let mut record = Record::new_insert("tasks");
    let sink = RecordingSink::default();

    assert!(matches!(
        record.load_blocking(&FixedLoader(None)),
        Err(RecordError::InvalidOperation { .. })
    ));
    assert!(matches!(
        record.delete(&sink),
        Err(RecordError::InvalidOperation { .. })
    ));
    assert!(sink.calls.borrow().is_empty());
}

#[test]
fn unbalanced_bulk_update_is_rejected() {
    let mut record = Record::new_insert("tasks");
    assert!(matches!(
        record.finish_bulk_update(),
        Err(RecordError::UnbalancedBulkUpdate)
    ));

    record.start_bulk_update();
    record.finish_bulk_update().expect("balanced finish");
    assert_eq!(record.bulk_depth(), 0);
}

#[test]
fn bulk_update_notifies_each_listener_once() {
    let mut record = Record::new_insert("tasks");
    let (first, first_listener) = counting_listener();
    let (second, second_listener) = counting_listener();
    let _a = record.add_change_listener(&first_listener, ListenerScope::field("k1"), false);
    let _b = record.add_change_listener(&second_listener, ListenerScope::field("k2"), false);
    let _c = record.add_change_listener(&first_listener, ListenerScope::field("k2"), false);

    record.start_bulk_update();
    record.put("k1", "a");
    record.put("k2", "b");
    record.start_bulk_update();
    record.put("k1", "c");
    record.finish_bulk_update().expect("inner finish");
    assert_eq!(first.changed.get(), 0);
    record.finish_bulk_update().expect("outer finish");

    assert_eq!(first.changed.get(), 1);
    assert_eq!(second.changed.get(), 1);
}

#[test]
fn bulk_update_guard_flushes_on_drop() {
    let mut record = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let _subscription = record.subscribe_fields(&listener, &["k1", "k2"], false);

    {
        let mut scope = record.bulk_update();
        scope.put("k1", 1_i64);
        scope.put("k2", 2_i64);
        assert_eq!(scope.bulk_depth(), 1);
    }

    assert_eq!(record.bulk_depth(), 0);
    assert_eq!(counter.changed.get(), 1);
}

#[test]
fn dropped_subscription_stops_notifications() {
    let mut record = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let subscription = record.add_change_listener(&listener, ListenerScope::field("title"), false);

    record.put("title", "a");
    assert_eq!(counter.changed.get(), 1);

    drop(subscription);
    record.put("title", "b");
    assert_eq!(counter.changed.get(), 1);
    assert_eq!(record.listener_count(&ListenerScope::field("title")), 0);
}

#[test]
fn subscription_dropped_during_bulk_update_is_not_notified() {
    let mut record = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let subscription = record.add_change_listener(&listener, ListenerScope::field("title"), false);

    record.start_bulk_update();
    record.put("title", "x");
    drop(subscription);
    record.finish_bulk_update().expect("balanced finish");

    assert_eq!(counter.changed.get(), 0);
}

#[test]
fn listener_removed_during_bulk_update_is_not_notified() {
    let mut record = Record::new_insert("tasks");
    let (removed, removed_listener) = counting_listener();
    let (kept, kept_listener) = counting_listener();
    let _a = record.add_change_listener(&removed_listener, ListenerScope::field("title"), false);
    let _b = record.add_change_listener(&kept_listener, ListenerScope::field("title"), false);

    record.start_bulk_update();
    record.put("title", "x");
    assert!(record.remove_change_listener(&removed_listener, &ListenerScope::field("title")));
    record.finish_bulk_update().expect("balanced finish");

    assert_eq!(removed.changed.get(), 0);
    assert_eq!(kept.changed.get(), 1);
}

#[test]
fn registry_does_not_keep_listeners_alive() {
    let mut record = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let _subscription = record.add_change_listener(&listener, ListenerScope::field("title"), false);
    let weak = Rc::downgrade(&counter);

    drop(listener);
    drop(counter);
    assert!(weak.upgrade().is_none());

    record.put("title", "a");
    assert_eq!(record.listener_count(&ListenerScope::field("title")), 0);
}

#[test]
fn remove_change_listener_unregisters_scope() {
    let mut record = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let _subscription = record.add_change_listener(&listener, ListenerScope::field("title"), false);

    assert!(record.remove_change_listener(&listener, &ListenerScope::field("title")));
    record.put("title", "a");

    assert_eq!(counter.changed.get(), 0);
    assert!(!record.remove_change_listener(&listener, &ListenerScope::field("title")));
}

#[test]
fn notify_immediately_fires_only_when_data_exists() {
    let empty = Record::new_insert("tasks");
    let (counter, listener) = counting_listener();
    let _first = empty.add_change_listener(&listener, ListenerScope::Reload, true);
    assert_eq!(counter.loaded.get(), 0);

    let loaded = loaded_record(&[("title", Value::from("x"))]);
    let _second = loaded.add_change_listener(&listener, ListenerScope::Reload, true);
    assert_eq!(counter.loaded.get(), 1);
}

#[test]
fn reload_listeners_fire_once_per_applied_load() {
    let mut record = Record::new(Identity::item("tasks", Uuid::new_v4()));
    let (counter, listener) = counting_listener();
    let _subscription = record.add_change_listener(&listener, ListenerScope::Reload, false);

    record
        .load_blocking(&FixedLoader(Some(values(&[("title", Value::from("x"))]))))
        .expect("first load");
    record
        .load_blocking(&FixedLoader(None))
        .expect("second load");

    assert_eq!(counter.loaded.get(), 2);
    assert_eq!(counter.changed.get(), 0);
}

#[test]
fn snapshot_restores_state_without_listeners() {
    let mut record = loaded_record(&[("title", Value::from("x"))]);
    record.put("priority", 4_i64);
    let (_counter, listener) = counting_listener();
    let _subscription = record.add_change_listener(&listener, ListenerScope::Reload, false);

    let json = serde_json::to_string(&record.snapshot()).expect("serialize snapshot");
    let restored = Record::restore(serde_json::from_str(&json).expect("parse snapshot"));

    assert_eq!(restored.identity(), record.identity());
    assert_eq!(restored.baseline(), record.baseline());
    assert_eq!(restored.pending(), record.pending());
    assert!(restored.is_update());
    assert_eq!(restored.listener_count(&ListenerScope::Reload), 0);

    let copy = record.duplicate();
    assert_eq!(copy.pending(), record.pending());
    assert_eq!(copy.listener_count(&ListenerScope::Reload), 0);
}
