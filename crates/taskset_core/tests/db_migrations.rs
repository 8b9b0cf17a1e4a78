use rusqlite::Connection;
use taskset_core::db::migrations::{current_user_version, latest_version};
use taskset_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().expect("open memory db");

    assert_eq!(
        current_user_version(&conn).expect("read version"),
        latest_version()
    );
    assert_table_exists(&conn, "tasks");
    assert_index_exists(&conn, "idx_tasks_due");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tasks.db");

    let first = open_db(&path).expect("first open");
    first
        .execute("INSERT INTO tasks (id, title) VALUES ('a', 'kept')", [])
        .expect("insert row");
    drop(first);

    let second = open_db(&path).expect("second open");
    assert_eq!(
        current_user_version(&second).expect("read version"),
        latest_version()
    );
    let title: String = second
        .query_row("SELECT title FROM tasks WHERE id = 'a'", [], |row| row.get(0))
        .expect("row survives reopen");
    assert_eq!(title, "kept");
}

#[test]
fn new_rows_get_timestamps() {
    let conn = open_db_in_memory().expect("open memory db");
    conn.execute("INSERT INTO tasks (id) VALUES ('t')", [])
        .expect("insert row");

    let (created, updated): (i64, i64) = conn
        .query_row(
            "SELECT created_at, updated_at FROM tasks WHERE id = 't'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("read timestamps");
    assert!(created > 0);
    assert_eq!(created, updated);
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).expect("create raw db");
    conn.execute_batch("PRAGMA user_version = 999;")
        .expect("set future version");
    drop(conn);

    match open_db(&path) {
        Err(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        }) => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("future schema must be rejected"),
    }
}

#[test]
fn unopenable_path_reports_the_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("missing").join("tasks.db");

    match open_db(&path) {
        Err(DbError::Open { path: reported, .. }) => assert_eq!(reported, path),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("missing parent directory must fail"),
    }
}

fn assert_table_exists(conn: &Connection, name: &str) {
    assert_schema_object(conn, "table", name);
}

fn assert_index_exists(conn: &Connection, name: &str) {
    assert_schema_object(conn, "index", name);
}

fn assert_schema_object(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
            [kind, name],
            |row| row.get(0),
        )
        .expect("query sqlite_master");
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
