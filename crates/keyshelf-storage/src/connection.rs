// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread-safe handle to a worker-owned SQLite connection.
//!
//! Any number of threads may share one [`Connection`]. Submissions go onto a
//! single FIFO queue and are executed in arrival order by the worker; this
//! handle never touches SQLite itself.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use keyshelf_config::TuningConfig;
use keyshelf_core::{KeyshelfError, WorkerState};
use parking_lot::Mutex;
use rusqlite::types::Value;
use tracing::{debug, error};

use crate::command::{Command, CommandKind, Row, Rows};
use crate::worker::{self, Shared};

/// Shared handle to one worker thread and its connection.
pub struct Connection {
    sender: Sender<Command>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl Connection {
    /// Start a worker for `path` (`:memory:` for an in-memory database).
    ///
    /// Returns once the worker has connected and applied `tuning`.
    pub fn open(
        path: impl AsRef<Path>,
        autocommit: bool,
        tuning: &TuningConfig,
    ) -> Result<Self, KeyshelfError> {
        let worker = worker::spawn(path.as_ref(), autocommit, tuning)?;
        debug!(path = %path.as_ref().display(), autocommit, "worker connected");
        Ok(Self {
            sender: worker.sender,
            shared: worker.shared,
            worker: Mutex::new(Some(worker.handle)),
            closed: AtomicBool::new(false),
        })
    }

    /// Queue a statement without waiting for it.
    ///
    /// A failure surfaces on a later call to this connection.
    #[track_caller]
    pub fn execute(&self, statement: &str, params: Vec<Value>) -> Result<(), KeyshelfError> {
        self.submit(Command::statement(
            CommandKind::Execute,
            statement,
            params,
            None,
        ))
    }

    /// Queue a mutating statement and stream whatever rows it returns.
    #[track_caller]
    pub fn execute_returning(
        &self,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<Rows, KeyshelfError> {
        let (tx, rx) = mpsc::channel();
        self.submit(Command::statement(
            CommandKind::Execute,
            statement,
            params,
            Some(tx),
        ))?;
        Ok(Rows::new(rx, Arc::clone(&self.shared)))
    }

    /// Queue a read and stream its rows.
    #[track_caller]
    pub fn select(&self, statement: &str, params: Vec<Value>) -> Result<Rows, KeyshelfError> {
        let (tx, rx) = mpsc::channel();
        self.submit(Command::statement(
            CommandKind::Select,
            statement,
            params,
            Some(tx),
        ))?;
        Ok(Rows::new(rx, Arc::clone(&self.shared)))
    }

    /// First row of a read, or `None` when it returns nothing.
    #[track_caller]
    pub fn select_one(
        &self,
        statement: &str,
        params: Vec<Value>,
    ) -> Result<Option<Row>, KeyshelfError> {
        self.select(statement, params)?.first()
    }

    /// Commit the open transaction.
    ///
    /// With `blocking` the call returns after the commit ran, reporting any
    /// failure recorded up to that point. Without it the commit is only
    /// queued; pending failures stay for the next call.
    #[track_caller]
    pub fn commit(&self, blocking: bool) -> Result<(), KeyshelfError> {
        if blocking {
            let (tx, rx) = mpsc::channel();
            self.submit(Command::control(CommandKind::Commit, Some(tx)))?;
            Rows::new(rx, Arc::clone(&self.shared)).finish()
        } else {
            self.enqueue(Command::control(CommandKind::Commit, None))
        }
    }

    /// Report a pending failure from an earlier statement, if any.
    pub fn check_failure(&self) -> Result<(), KeyshelfError> {
        match self.shared.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Drain the queue, close the connection, and join the worker.
    ///
    /// Everything queued before this call still runs. A transaction left
    /// open is rolled back when the connection closes, so commit first.
    /// Closing twice is a no-op.
    pub fn close(&self) -> Result<(), KeyshelfError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let pending = self.check_failure();

        let (tx, rx) = mpsc::channel();
        if self
            .sender
            .send(Command::control(CommandKind::Close, Some(tx)))
            .is_ok()
        {
            // Either the end marker or a hang-up means the worker is done.
            let _ = rx.recv();
        }
        self.join()?;
        debug!("connection closed");

        pending?;
        self.check_failure()
    }

    /// Close without waiting for the worker.
    ///
    /// Queued commands still run, but uncommitted writes are discarded.
    pub fn close_forced(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(Command::control(CommandKind::Close, None));
        // Detach: the worker exits on its own once it reaches the close.
        self.worker.lock().take();
        debug!("connection closed without waiting");
    }

    pub fn state(&self) -> WorkerState {
        self.shared.state()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn join(&self) -> Result<(), KeyshelfError> {
        let Some(handle) = self.worker.lock().take() else {
            return Ok(());
        };
        handle.join().map_err(|_| {
            error!("worker thread panicked");
            KeyshelfError::Internal("worker thread panicked".to_string())
        })
    }

    /// Report a pending failure, then queue `command`.
    fn submit(&self, command: Command) -> Result<(), KeyshelfError> {
        if self.is_closed() {
            return Err(KeyshelfError::Closed);
        }
        self.check_failure()?;
        self.enqueue(command)
    }

    fn enqueue(&self, command: Command) -> Result<(), KeyshelfError> {
        if self.is_closed() {
            return Err(KeyshelfError::Closed);
        }
        self.sender
            .send(command)
            .map_err(|_| KeyshelfError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close_forced();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyshelf_core::JournalMode;
    use std::thread;

    fn memory(autocommit: bool) -> Connection {
        Connection::open(":memory:", autocommit, &TuningConfig::default()).unwrap()
    }

    fn count(conn: &Connection) -> i64 {
        match conn.select_one("SELECT COUNT(*) FROM t", Vec::new()).unwrap() {
            Some(row) => match row[0] {
                Value::Integer(n) => n,
                ref other => panic!("unexpected {other:?}"),
            },
            None => panic!("COUNT returned no row"),
        }
    }

    #[test]
    fn statements_run_in_submission_order() {
        let conn = memory(true);
        conn.execute("CREATE TABLE t (n INTEGER)", Vec::new()).unwrap();
        for n in 0..100 {
            conn.execute("INSERT INTO t VALUES (?)", vec![Value::Integer(n)])
                .unwrap();
        }
        let rows: Vec<Row> = conn
            .select("SELECT n FROM t ORDER BY rowid", Vec::new())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let got: Vec<Value> = rows.into_iter().map(|mut r| r.remove(0)).collect();
        let want: Vec<Value> = (0..100).map(Value::Integer).collect();
        assert_eq!(got, want);
        conn.close().unwrap();
    }

    #[test]
    fn deferred_failure_surfaces_once_on_next_call() {
        let conn = memory(true);
        conn.execute("INSERT INTO nowhere VALUES (1)", Vec::new())
            .unwrap();
        // The select queues behind the failing insert, so it observes it.
        let err = conn.select_one("SELECT 1", Vec::new()).unwrap_err();
        match err {
            KeyshelfError::Statement {
                ref message,
                ref statement,
                ref origin,
            } => {
                assert!(message.contains("no such table: nowhere"), "{message}");
                assert_eq!(statement, "INSERT INTO nowhere VALUES (1)");
                assert_eq!(origin.location().file(), file!());
            }
            other => panic!("expected statement failure, got {other:?}"),
        }
        assert!(conn.select_one("SELECT 1", Vec::new()).unwrap().is_some());
        conn.close().unwrap();
    }

    #[test]
    #[tracing_test::traced_test]
    fn reraising_a_failure_is_logged() {
        let conn = memory(true);
        conn.execute("DROP TABLE nowhere", Vec::new()).unwrap();
        assert!(conn.commit(true).is_err());
        assert!(logs_contain("re-raising failure from an earlier statement"));
        conn.close().unwrap();
    }

    #[test]
    fn queued_commit_leaves_failures_for_the_next_call() {
        let conn = memory(false);
        conn.execute("DELETE FROM nowhere", Vec::new()).unwrap();
        conn.commit(false).unwrap();
        // The failing delete ran before this select was dequeued.
        let err = conn.select_one("SELECT 1", Vec::new()).unwrap_err();
        assert!(err.is_statement(), "got {err:?}");
        conn.check_failure().unwrap();
        conn.close().unwrap();
    }

    #[test]
    fn many_threads_share_one_connection() {
        let conn = Arc::new(memory(true));
        conn.execute("CREATE TABLE t (n INTEGER)", Vec::new()).unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let conn = Arc::clone(&conn);
                thread::spawn(move || {
                    for j in 0..50 {
                        let mut rows = conn
                            .execute_returning(
                                "INSERT INTO t VALUES (?) RETURNING n",
                                vec![Value::Integer(i * 1000 + j)],
                            )
                            .unwrap();
                        assert!(rows.next().unwrap().is_ok());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(count(&conn), 400);
        conn.close().unwrap();
    }

    #[test]
    fn manual_commit_controls_visibility_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual.sqlite");
        let writer = Connection::open(&path, false, &TuningConfig::default()).unwrap();
        writer.execute("CREATE TABLE t (n INTEGER)", Vec::new()).unwrap();
        writer.execute("INSERT INTO t VALUES (1)", Vec::new()).unwrap();
        writer.commit(true).unwrap();
        writer.close().unwrap();

        let reader = Connection::open(&path, false, &TuningConfig::default()).unwrap();
        assert_eq!(count(&reader), 1);
        reader.close().unwrap();
    }

    #[test]
    fn forced_close_discards_uncommitted_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forced.sqlite");
        let tuning = TuningConfig {
            journal_mode: JournalMode::Delete,
            ..TuningConfig::default()
        };
        let conn = Connection::open(&path, false, &tuning).unwrap();
        conn.execute("CREATE TABLE t (n INTEGER)", Vec::new()).unwrap();
        conn.commit(true).unwrap();
        conn.execute("INSERT INTO t VALUES (1)", Vec::new()).unwrap();
        conn.close_forced();
        // Wait for the detached worker to let go of the file.
        while conn.state() != WorkerState::Closed {
            thread::yield_now();
        }

        let reader = Connection::open(&path, false, &TuningConfig::default()).unwrap();
        assert_eq!(count(&reader), 0);
        reader.close().unwrap();
    }

    #[test]
    fn closed_connection_rejects_work() {
        let conn = memory(false);
        conn.close().unwrap();
        assert!(conn.is_closed());
        assert_eq!(conn.state(), WorkerState::Closed);
        assert!(matches!(
            conn.execute("SELECT 1", Vec::new()),
            Err(KeyshelfError::Closed)
        ));
        // Both close paths are idempotent and never block.
        conn.close().unwrap();
        conn.close_forced();
    }
}
