//! CLI smoke entry point.
//!
//! # Responsibility
//! - Quick-add one task from the command line and read it back.
//! - Exercise config, logging, record and store wiring end to end.
//!
//! Usage: `taskset_cli <title words...>`

use log::{error, info};
use std::process::ExitCode;
use taskset_core::db::{open_db, open_db_in_memory};
use taskset_core::field::FieldAdapter;
use taskset_core::schema::tasks;
use taskset_core::{init_logging, CoreConfig, Record, SqliteTaskStore, TaskModel, Value};

fn main() -> ExitCode {
    let title = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if title.trim().is_empty() {
        eprintln!("usage: taskset_cli <title words...>");
        return ExitCode::from(2);
    }

    let config = CoreConfig::from_env();
    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match quick_add(&config, title.trim()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_quick_add module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn quick_add(config: &CoreConfig, title: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = match &config.database_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    let store = SqliteTaskStore::new(&conn);
    let model = TaskModel::local();

    let mut task = model.new_task();
    {
        let mut scope = task.bulk_update();
        model
            .title
            .validate_and_write(&mut scope, Some(title.to_string()));
        let status = model.status.read_or_default(&scope);
        model.status.validate_and_write(&mut scope, status);
        model
            .list_name
            .validate_and_write(&mut scope, Some("Inbox".to_string()));
    }
    println!("delta keys={}", delta_keys(&task));

    let identity = task.persist(&store)?;
    println!("stored {identity}");

    let mut stored = Record::new(identity);
    stored.load_blocking(&store)?;
    let status = model.status.read(&stored).unwrap_or(tasks::STATUS_NEEDS_ACTION);
    let status_title = model
        .status
        .choices()
        .and_then(|choices| choices.title(&Value::Integer(status)))
        .unwrap_or("unknown");
    println!(
        "title={} status={} percent={} list={}",
        model.title.read(&stored).unwrap_or_default(),
        status_title,
        model.percent_complete.read(&stored).unwrap_or(0),
        model.list_and_account.read(&stored).unwrap_or_default()
    );
    info!(
        "event=cli_quick_add module=cli status=ok tasks={}",
        store.count()?
    );
    Ok(())
}

fn delta_keys(record: &Record) -> String {
    record
        .pending()
        .keys()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
