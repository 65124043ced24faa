// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the store facade against real database files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use keyshelf_config::TuningConfig;
use keyshelf_core::{JournalMode, KeyshelfError, KvStore, OpenMode, WorkerState};
use keyshelf_storage::{RawCodec, Store, StoreOptions, list_tables};
use tempfile::TempDir;

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("store.sqlite")
}

fn open(path: &Path, flag: &str, autocommit: bool) -> Store<i64> {
    StoreOptions::new(path)
        .flag(flag)
        .autocommit(autocommit)
        .open()
        .unwrap()
}

#[test]
fn create_mode_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);

    store.set("a", &1).unwrap();
    assert_eq!(store.get("a").unwrap(), Some(1));
    store.delete("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    assert!(matches!(
        store.delete("a"),
        Err(KeyshelfError::KeyNotFound { ref key }) if key == "a"
    ));
    store.close().unwrap();
}

#[test]
fn read_only_mode_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let writer = open(&path, "c", false);
    writer.set("existing", &7).unwrap();
    writer.close().unwrap();

    let reader = open(&path, "r", false);
    assert_eq!(reader.mode(), OpenMode::ReadOnly);
    assert_eq!(reader.get("existing").unwrap(), Some(7));
    assert!(matches!(
        reader.set("new", &1),
        Err(KeyshelfError::AccessDenied { .. })
    ));
    assert!(matches!(
        reader.delete("existing"),
        Err(KeyshelfError::AccessDenied { .. })
    ));
    assert!(matches!(
        reader.clear(),
        Err(KeyshelfError::AccessDenied { .. })
    ));
    assert!(matches!(
        reader.terminate(),
        Err(KeyshelfError::AccessDenied { .. })
    ));
    assert_eq!(reader.len().unwrap(), 1);
    reader.close().unwrap();
}

#[test]
fn truncate_mode_empties_only_its_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let first = StoreOptions::new(&path).table("first").open::<i64>().unwrap();
    first.set("x", &1).unwrap();
    first.close().unwrap();
    let second = StoreOptions::new(&path).table("second").open::<i64>().unwrap();
    second.set("y", &2).unwrap();
    second.close().unwrap();

    let truncated = StoreOptions::new(&path)
        .table("first")
        .mode(OpenMode::Truncate)
        .open::<i64>()
        .unwrap();
    assert!(truncated.is_empty().unwrap());
    truncated.close().unwrap();

    let second = StoreOptions::new(&path).table("second").open::<i64>().unwrap();
    assert_eq!(second.get("y").unwrap(), Some(2));
    second.close().unwrap();
}

#[test]
fn new_mode_erases_the_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let old = StoreOptions::new(&path).table("old").open::<i64>().unwrap();
    old.set("x", &1).unwrap();
    old.close().unwrap();

    let fresh = StoreOptions::new(&path)
        .table("fresh")
        .flag("n")
        .open::<i64>()
        .unwrap();
    fresh.close().unwrap();
    assert_eq!(list_tables(&path).unwrap(), ["fresh"]);
}

#[test]
fn blocking_commit_is_visible_to_a_second_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let writer = open(&path, "c", false);
    writer.set("k", &42).unwrap();
    writer.commit(true).unwrap();

    let reader = open(&path, "r", false);
    assert_eq!(reader.get("k").unwrap(), Some(42));
    reader.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn queued_commit_takes_effect_once_the_worker_reaches_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let writer = open(&path, "c", false);
    writer.set("k", &7).unwrap();
    writer.commit(false).unwrap();
    // Queued behind the commit, so the commit has run when this returns.
    assert_eq!(writer.get("k").unwrap(), Some(7));

    let reader = open(&path, "r", false);
    assert_eq!(reader.get("k").unwrap(), Some(7));
    reader.close().unwrap();
    writer.close().unwrap();
}

#[test]
fn queued_commit_defers_failures_to_the_next_call() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    store
        .connection()
        .execute("UPDATE missing_table SET x = 1", Vec::new())
        .unwrap();

    store.commit(false).unwrap();
    let err = store.get("k").unwrap_err();
    assert!(err.is_statement(), "got {err:?}");
    assert!(err.to_string().contains("missing_table"));
    assert_eq!(store.get("k").unwrap(), None);
    store.close().unwrap();
}

#[test]
fn autocommit_writes_are_durable_without_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let writer = open(&path, "c", true);
    writer.set("a", &1).unwrap();
    writer.set("b", &2).unwrap();
    writer.delete("a").unwrap();

    let reader = open(&path, "r", false);
    assert_eq!(reader.get("a").unwrap(), None);
    assert_eq!(reader.get("b").unwrap(), Some(2));
    reader.close().unwrap();
    writer.close_forced();
}

#[test]
fn forced_close_discards_uncommitted_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    // Rollback needs a journal.
    let tuning = TuningConfig {
        journal_mode: JournalMode::Delete,
        ..TuningConfig::default()
    };
    let store = StoreOptions::new(&path).tuning(tuning).open::<i64>().unwrap();
    store.set("kept", &1).unwrap();
    store.commit(true).unwrap();
    store.set("lost", &2).unwrap();
    store.close_forced();
    while store.state() != WorkerState::Closed {
        thread::yield_now();
    }

    let reader = open(&path, "r", false);
    assert_eq!(reader.get("kept").unwrap(), Some(1));
    assert_eq!(reader.get("lost").unwrap(), None);
    reader.close().unwrap();
}

#[test]
fn graceful_close_commits_pending_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let store = open(&path, "c", false);
    store.update((0..10).map(|i| (format!("k{i}"), i))).unwrap();
    store.close().unwrap();
    assert_eq!(store.state(), WorkerState::Closed);

    let reader = open(&path, "r", false);
    assert_eq!(reader.len().unwrap(), 10);
    reader.close().unwrap();
}

#[test]
fn forced_close_after_close_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    store.close().unwrap();

    let started = Instant::now();
    store.close_forced();
    store.close_forced();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(store.get("x"), Err(KeyshelfError::Closed)));
}

#[test]
fn reads_observe_writes_queued_before_them_across_threads() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&db_path(&dir), "c", false));

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    let key = format!("t{t}-{i}");
                    store.set(&key, &i).unwrap();
                    // Queued after our own write, so it must see it.
                    assert_eq!(store.get(&key).unwrap(), Some(i));
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(store.len().unwrap(), 100);
    store.close().unwrap();
}

#[test]
fn concurrent_autocommit_setters_are_both_counted() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&db_path(&dir), "c", true));

    let left = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.set("left", &1))
    };
    let right = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.set("right", &2))
    };
    left.join().unwrap().unwrap();
    right.join().unwrap().unwrap();

    assert_eq!(store.len().unwrap(), 2);
    store.close().unwrap();
}

#[test]
fn concurrent_deletes_of_one_key_succeed_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(open(&db_path(&dir), "c", true));
    store.set("contested", &1).unwrap();

    let successes = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let successes = Arc::clone(&successes);
            thread::spawn(move || match store.delete("contested") {
                Ok(()) => {
                    successes.fetch_add(1, Ordering::SeqCst);
                }
                Err(KeyshelfError::KeyNotFound { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(successes.load(Ordering::SeqCst), 1);
    store.close().unwrap();
}

#[test]
fn deferred_failure_is_reported_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    store
        .connection()
        .execute("UPDATE missing_table SET x = 1", Vec::new())
        .unwrap();

    let err = store.commit(true).unwrap_err();
    assert!(err.is_statement(), "got {err:?}");
    assert!(err.to_string().contains("missing_table"));

    // Later calls are unaffected.
    store.set("after", &1).unwrap();
    store.commit(true).unwrap();
    assert_eq!(store.get("after").unwrap(), Some(1));
    store.close().unwrap();
}

#[test]
fn raw_connection_selects_stream_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    store.update([("a", 1), ("b", 2)]).unwrap();

    let rows: Vec<_> = store
        .connection()
        .select("SELECT key FROM \"unnamed\" ORDER BY rowid", Vec::new())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(store
        .connection()
        .select_one("SELECT 1 FROM \"unnamed\" WHERE key = 'zzz'", Vec::new())
        .unwrap()
        .is_none());
    store.close().unwrap();
}

#[test]
fn terminate_removes_the_backing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = db_path(&dir);
    let store = open(&path, "c", false);
    store.set("a", &1).unwrap();
    assert!(path.exists());

    store.terminate().unwrap();
    assert!(!path.exists());
    assert!(matches!(store.set("a", &1), Err(KeyshelfError::Closed)));
}

#[test]
fn in_memory_store_terminates_without_touching_disk() {
    let store: Store<i64> = StoreOptions::new(":memory:").open().unwrap();
    store.set("a", &1).unwrap();
    store.terminate().unwrap();
}

#[test]
fn raw_codec_stores_bytes_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreOptions::new(db_path(&dir))
        .open_with_codec(RawCodec)
        .unwrap();
    store.set("blob", &vec![0u8, 159, 146, 150]).unwrap();
    assert_eq!(store.get("blob").unwrap(), Some(vec![0u8, 159, 146, 150]));
    store.close().unwrap();
}

#[test]
fn store_is_usable_through_the_trait() {
    fn fill<S: KvStore<i64>>(store: &S) {
        store.set("one", &1).unwrap();
        store.set(&vec![1, 2], &2).unwrap();
        store.commit(true).unwrap();
    }

    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    fill(&store);
    let keys: Vec<String> = store.keys().unwrap().collect::<Result<_, _>>().unwrap();
    assert_eq!(keys, ["one", "[1,2]"]);
    store.close().unwrap();
}

#[test]
fn trait_calls_attribute_failures_to_their_caller() {
    fn write<S: KvStore<i64>>(store: &S) -> Result<(), KeyshelfError> {
        store.set("k", &1)
    }

    let dir = tempfile::tempdir().unwrap();
    let store = open(&db_path(&dir), "c", false);
    store
        .connection()
        .execute("DROP TABLE \"unnamed\"", Vec::new())
        .unwrap();

    match write(&store) {
        Err(KeyshelfError::Statement { origin, .. }) => {
            assert_eq!(origin.location().file(), file!());
        }
        other => panic!("expected statement failure, got {other:?}"),
    }
    store.close().unwrap();
}

#[test]
fn invalid_flag_and_missing_directory_fail_at_open() {
    let dir = tempfile::tempdir().unwrap();
    let err = StoreOptions::new(db_path(&dir))
        .flag("rw")
        .open::<i64>()
        .unwrap_err();
    assert!(matches!(err, KeyshelfError::InvalidMode(_)));

    let err = Store::<i64>::open(dir.path().join("no/such/dir/x.sqlite")).unwrap_err();
    assert!(matches!(err, KeyshelfError::MissingDirectory { .. }));
}
