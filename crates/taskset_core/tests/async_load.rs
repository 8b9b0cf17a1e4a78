use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use taskset_core::db::open_db;
use taskset_core::{
    CancelSignal, CollaboratorError, Identity, LoadOutcome, Loader, Record, RecordError,
    RecordState, Sink, SqliteFileLoader, SqliteTaskStore, Value, ValueMap,
};
use uuid::Uuid;

struct FixedLoader(ValueMap);

impl Loader for FixedLoader {
    fn fetch(
        &self,
        _identity: &Identity,
        _cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        Ok(LoadOutcome::Found(self.0.clone()))
    }
}

struct FailingLoader;

impl Loader for FailingLoader {
    fn fetch(
        &self,
        _identity: &Identity,
        _cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        Err("backend unavailable".into())
    }
}

/// Blocks until released, then records whether it was cancelled meanwhile.
struct GatedLoader {
    gate: Mutex<Receiver<()>>,
    saw_cancel: Arc<AtomicBool>,
}

impl Loader for GatedLoader {
    fn fetch(
        &self,
        _identity: &Identity,
        cancel: &CancelSignal,
    ) -> Result<LoadOutcome, CollaboratorError> {
        let gate = self.gate.lock().map_err(|_| "gate poisoned")?;
        let _ = gate.recv();
        self.saw_cancel.store(cancel.is_cancelled(), Ordering::SeqCst);
        Ok(LoadOutcome::NotFound)
    }
}

fn gated() -> (Arc<GatedLoader>, Sender<()>, Arc<AtomicBool>) {
    let (release, gate) = mpsc::channel();
    let saw_cancel = Arc::new(AtomicBool::new(false));
    let loader = Arc::new(GatedLoader {
        gate: Mutex::new(gate),
        saw_cancel: saw_cancel.clone(),
    });
    (loader, release, saw_cancel)
}

fn title_map(title: &str) -> ValueMap {
    [("title".to_string(), Value::from(title))]
        .into_iter()
        .collect()
}

fn item_record() -> Record {
    Record::new(Identity::item("tasks", Uuid::new_v4()))
}

#[test]
fn background_load_applies_baseline() {
    let mut record = item_record();
    let task = record
        .load(Arc::new(FixedLoader(title_map("eggs"))))
        .expect("start load");
    assert!(record.is_loading());
    assert_eq!(record.state(), RecordState::Loading);

    let completion = task.wait().expect("worker finished");
    assert!(record.complete_load(completion));

    assert!(!record.is_loading());
    assert_eq!(record.get("title"), Some(&Value::from("eggs")));
    assert_eq!(record.state(), RecordState::Loaded);
}

#[test]
fn only_the_latest_load_is_applied() {
    let mut record = item_record();
    let first = record
        .load(Arc::new(FixedLoader(title_map("stale"))))
        .expect("first load");
    let second = record
        .load(Arc::new(FixedLoader(title_map("fresh"))))
        .expect("second load");
    assert!(second.generation() > first.generation());

    let fresh = second.wait().expect("second finished");
    let stale = first.wait().expect("first finished");

    assert!(record.complete_load(fresh));
    assert!(!record.complete_load(stale));
    assert_eq!(record.get("title"), Some(&Value::from("fresh")));
}

#[test]
fn stale_completion_arriving_first_is_ignored() {
    let mut record = item_record();
    let first = record
        .load(Arc::new(FixedLoader(title_map("stale"))))
        .expect("first load");
    let stale = first.wait().expect("first finished");
    let second = record
        .load(Arc::new(FixedLoader(title_map("fresh"))))
        .expect("second load");

    assert!(!record.complete_load(stale));
    assert!(record.is_loading());
    assert!(record.complete_load(second.wait().expect("second finished")));
    assert_eq!(record.get("title"), Some(&Value::from("fresh")));
}

#[test]
fn fetch_errors_are_treated_as_not_found() {
    let mut record = item_record();
    let task = record.load(Arc::new(FailingLoader)).expect("start load");

    assert!(record.complete_load(task.wait().expect("worker finished")));
    assert!(record.baseline().is_none());
    record.put("title", "new");
    assert!(record.is_insert());
}

#[test]
fn dropping_the_task_cancels_the_fetch() {
    let mut record = item_record();
    let (loader, release, saw_cancel) = gated();
    let task = record.load(loader).expect("start load");

    drop(task);
    release.send(()).expect("release worker");

    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !saw_cancel.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(saw_cancel.load(Ordering::SeqCst));
}

#[test]
fn dropping_the_record_cancels_the_fetch() {
    let mut record = item_record();
    let (loader, release, saw_cancel) = gated();
    let task = record.load(loader).expect("start load");

    drop(record);
    release.send(()).expect("release worker");

    assert!(task.wait().is_some());
    assert!(saw_cancel.load(Ordering::SeqCst));
}

#[test]
fn persist_is_rejected_while_loading() {
    let mut record = item_record();
    let (loader, release, _saw_cancel) = gated();
    let task = record.load(loader).expect("start load");
    record.put("title", "edit");

    let conn = taskset_core::db::open_db_in_memory().expect("open db");
    let store = SqliteTaskStore::new(&conn);
    assert!(matches!(
        record.persist(&store),
        Err(RecordError::InvalidOperation { .. })
    ));

    release.send(()).expect("release worker");
    assert!(record.complete_load(task.wait().expect("worker finished")));
    assert_eq!(record.get("title"), Some(&Value::from("edit")));
}

#[test]
fn file_loader_reads_rows_written_through_another_connection() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tasks.db");

    let identity = {
        let conn = open_db(&path).expect("open file db");
        SqliteTaskStore::new(&conn)
            .insert(&Identity::collection("tasks"), &title_map("from disk"))
            .expect("insert task")
    };

    let mut record = Record::new(identity);
    let task = record
        .load(Arc::new(SqliteFileLoader::new(&path)))
        .expect("start load");
    let completion = loop {
        if let Some(completion) = task.try_take() {
            break completion;
        }
        thread::sleep(Duration::from_millis(5));
    };

    assert!(record.complete_load(completion));
    assert_eq!(record.get("title"), Some(&Value::from("from disk")));
    assert_eq!(record.get("status"), Some(&Value::Null));
}

#[test]
fn file_loader_reports_missing_rows() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tasks.db");
    drop(open_db(&path).expect("create db"));

    let mut record = item_record();
    let task = record
        .load(Arc::new(SqliteFileLoader::new(&path)))
        .expect("start load");
    let completion = task.wait().expect("worker finished");

    assert!(matches!(completion.outcome, Ok(LoadOutcome::NotFound)));
    assert!(record.complete_load(completion));
    assert!(record.baseline().is_none());
}
