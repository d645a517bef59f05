//! Run-gate persistence tests against the real SQLite store.

use chrono::Utc;
use owlwatch::gate::{RunGate, RunKey, RunStatus, SqliteStore, StateStore};
use owlwatch::storage;

fn key(s: &str) -> RunKey {
    s.parse().unwrap()
}

#[test]
fn test_completion_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    let am = key("2026-01-30:AM");
    let pm = key("2026-01-30:PM");

    {
        let pool = storage::open_pool(&db).unwrap();
        let gate = RunGate::new(Box::new(SqliteStore::new(pool)));
        assert!(gate.should_run(&am));
        gate.mark_completed(&am, Utc::now()).unwrap();
        assert!(!gate.should_run(&am));
    }

    // A new pool on the same path models a fresh process.
    let pool = storage::open_pool(&db).unwrap();
    let gate = RunGate::new(Box::new(SqliteStore::new(pool)));
    assert!(!gate.should_run(&am));
    assert!(gate.should_run(&pm));
}

#[test]
fn test_failed_attempt_is_retryable_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    let k = key("2026-02-01:PM");

    {
        let pool = storage::open_pool(&db).unwrap();
        let gate = RunGate::new(Box::new(SqliteStore::new(pool)));
        gate.mark_failed(&k).unwrap();
    }

    let pool = storage::open_pool(&db).unwrap();
    let store = SqliteStore::new(pool);
    let record = store.load(&k).unwrap().unwrap();
    assert_eq!(record.status, RunStatus::Failed);
    assert!(record.completed_at.is_none());

    let gate = RunGate::new(Box::new(store));
    assert!(gate.should_run(&k));
}

#[test]
fn test_concurrent_completion_leaves_one_record() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    storage::open_pool(&db).unwrap();

    let k = key("2026-02-02:AM");
    let mut handles = Vec::new();
    for _ in 0..2 {
        let db = db.clone();
        handles.push(std::thread::spawn(move || {
            // Each writer gets its own pool, like two overlapping triggers.
            let pool = storage::open_pool(&db).unwrap();
            let gate = RunGate::new(Box::new(SqliteStore::new(pool)));
            gate.mark_completed(&k, Utc::now()).unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let pool = storage::open_pool(&db).unwrap();
    let store = SqliteStore::new(pool);
    let records = store.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, RunStatus::Completed);
    assert!(records[0].completed_at.is_some());

    let gate = RunGate::new(Box::new(store));
    assert!(!gate.should_run(&k));
}

#[test]
fn test_completed_timestamp_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    let k = key("2026-02-03:AM");

    let pool = storage::open_pool(&db).unwrap();
    let store = SqliteStore::new(pool);
    let first = Utc::now();
    store.save(&k, RunStatus::Completed, Some(first)).unwrap();
    store
        .save(&k, RunStatus::Completed, Some(first + chrono::Duration::hours(1)))
        .unwrap();

    let record = store.load(&k).unwrap().unwrap();
    assert_eq!(record.completed_at.unwrap().timestamp(), first.timestamp());
}

#[test]
fn test_corrupt_status_fails_open() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    let k = key("2026-02-04:AM");

    let pool = storage::open_pool(&db).unwrap();
    pool.get()
        .unwrap()
        .execute(
            "INSERT INTO run_state (run_key, status) VALUES (?1, 'banana')",
            rusqlite::params![k.to_string()],
        )
        .unwrap();

    let store = SqliteStore::new(pool);
    assert!(store.load(&k).is_err());

    let gate = RunGate::new(Box::new(store));
    assert!(gate.should_run(&k));
}

#[test]
fn test_unparseable_store_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("owlwatch.db");
    std::fs::write(&db, "this is not a sqlite database").unwrap();

    // The orchestrator falls back to a volatile store when this fails.
    assert!(storage::open_pool(&db).is_err());
}
