// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker thread that owns a store's only SQLite connection.
//!
//! Commands are executed strictly in the order they were queued. A failing
//! statement never stops the loop: the failure is logged, parked in the
//! shared slot, and handed to whichever caller next talks to the store.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use keyshelf_config::TuningConfig;
use keyshelf_core::{KeyshelfError, Origin, WorkerState};
use parking_lot::Mutex;
use rusqlite::types::Value;
use tracing::{debug, error, warn};

use crate::command::{Command, CommandKind, Reply, Row};

/// Sentinel path for an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// A statement failure waiting to be reported.
#[derive(Debug)]
struct DeferredFailure {
    /// SQLite result code name, when more specific than a generic error.
    kind: Option<String>,
    message: String,
    statement: String,
    origin: Origin,
}

impl From<DeferredFailure> for KeyshelfError {
    fn from(failure: DeferredFailure) -> Self {
        let message = match failure.kind {
            Some(kind) => format!("[{kind}] {}", failure.message),
            None => failure.message,
        };
        KeyshelfError::Statement {
            message,
            statement: failure.statement,
            origin: failure.origin,
        }
    }
}

/// State shared between the worker and every caller.
///
/// Only the worker writes the failure slot; callers only take from it.
#[derive(Debug)]
pub(crate) struct Shared {
    failure: Mutex<Option<DeferredFailure>>,
    state: AtomicU8,
}

impl Shared {
    fn new() -> Self {
        Self {
            failure: Mutex::new(None),
            state: AtomicU8::new(WorkerState::Init as u8),
        }
    }

    /// Take the pending failure, clearing the slot.
    pub(crate) fn take_failure(&self) -> Option<KeyshelfError> {
        let failure = self.failure.lock().take()?;
        warn!(
            statement = %failure.statement,
            origin = %failure.origin,
            "re-raising failure from an earlier statement"
        );
        Some(failure.into())
    }

    pub(crate) fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        debug!(%state, "worker state");
        self.state.store(state as u8, Ordering::Release);
    }

    fn record(&self, command: &Command, err: &rusqlite::Error) {
        // Plain SQLITE_ERROR maps to `Unknown`, which says nothing.
        let kind = err
            .sqlite_error_code()
            .filter(|code| *code != rusqlite::ErrorCode::Unknown)
            .map(|code| format!("{code:?}"));
        error!(
            statement = %command.statement,
            error = %err,
            origin = %command.origin,
            "statement failed on worker; the error will be raised at the next call"
        );
        *self.failure.lock() = Some(DeferredFailure {
            kind,
            message: err.to_string(),
            statement: command.statement.clone(),
            origin: command.origin.clone(),
        });
    }
}

/// A running worker: its queue, shared state, and thread handle.
pub(crate) struct Worker {
    pub(crate) sender: Sender<Command>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) handle: JoinHandle<()>,
}

/// Spawn a worker for `path` and wait until its connection is configured.
///
/// Connection and pragma failures are returned here, synchronously.
pub(crate) fn spawn(
    path: &Path,
    autocommit: bool,
    tuning: &TuningConfig,
) -> Result<Worker, KeyshelfError> {
    let (sender, receiver) = mpsc::channel::<Command>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<(), KeyshelfError>>();
    let shared = Arc::new(Shared::new());

    let path = path.to_path_buf();
    let tuning = tuning.clone();
    let worker_shared = Arc::clone(&shared);
    let name = format!(
        "keyshelf-{}",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "db".to_string())
    );

    let handle = thread::Builder::new()
        .name(name)
        .spawn(move || {
            let conn = match connect(&path, &tuning) {
                Ok(conn) => conn,
                Err(err) => {
                    worker_shared.set_state(WorkerState::Closed);
                    let _ = ready_tx.send(Err(err));
                    return;
                }
            };
            worker_shared.set_state(WorkerState::Connected);
            let _ = ready_tx.send(Ok(()));
            run(conn, autocommit, &receiver, &worker_shared);
        })
        .map_err(|err| KeyshelfError::Internal(format!("failed to spawn worker thread: {err}")))?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(Worker {
            sender,
            shared,
            handle,
        }),
        Ok(Err(err)) => {
            let _ = handle.join();
            Err(err)
        }
        Err(_) => {
            let _ = handle.join();
            Err(KeyshelfError::Internal(
                "worker thread exited before connecting".to_string(),
            ))
        }
    }
}

fn connect(path: &Path, tuning: &TuningConfig) -> Result<rusqlite::Connection, KeyshelfError> {
    let opened = if path.as_os_str() == MEMORY_PATH {
        rusqlite::Connection::open_in_memory()
    } else {
        rusqlite::Connection::open(path)
    };
    let conn = opened.map_err(|err| {
        error!(path = %path.display(), error = %err, "failed to open connection");
        KeyshelfError::Connection {
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    })?;
    apply_pragmas(&conn, tuning)?;
    Ok(conn)
}

/// Apply journaling, sync, temp storage, mmap, and encoding pragmas.
fn apply_pragmas(conn: &rusqlite::Connection, tuning: &TuningConfig) -> Result<(), KeyshelfError> {
    let mmap_size = i64::try_from(tuning.mmap_size).unwrap_or(i64::MAX);
    let pragmas = [
        format!("PRAGMA journal_mode = {}", tuning.journal_mode),
        format!("PRAGMA synchronous = {}", tuning.synchronous),
        format!("PRAGMA temp_store = {}", tuning.temp_store),
        format!("PRAGMA mmap_size = {mmap_size}"),
        "PRAGMA encoding = 'UTF-8'".to_string(),
    ];

    for pragma in &pragmas {
        conn.execute_batch(pragma).map_err(|err| {
            error!(%pragma, error = %err, "failed to apply pragma");
            KeyshelfError::Configuration {
                message: format!("{pragma}: {err}"),
                source: Some(Box::new(err)),
            }
        })?;
    }
    Ok(())
}

/// Process commands until a close command arrives or every sender is gone.
fn run(
    conn: rusqlite::Connection,
    autocommit: bool,
    receiver: &Receiver<Command>,
    shared: &Shared,
) {
    let mut close_reply = None;

    while let Ok(command) = receiver.recv() {
        if shared.state() == WorkerState::Connected {
            shared.set_state(WorkerState::Running);
        }
        match command.kind {
            CommandKind::Close => {
                close_reply = command.reply;
                break;
            }
            CommandKind::Commit => {
                if let Err(err) = commit_pending(&conn) {
                    shared.record(&command, &err);
                }
                acknowledge(command.reply.as_ref());
            }
            CommandKind::Execute | CommandKind::Select => {
                let outcome = execute(&conn, autocommit, &command);
                if let Err(err) = outcome {
                    shared.record(&command, &err);
                }
                acknowledge(command.reply.as_ref());
            }
        }
    }

    shared.set_state(WorkerState::Closing);
    if let Err((_conn, err)) = conn.close() {
        error!(error = %err, "failed to close connection cleanly");
    }
    shared.set_state(WorkerState::Closed);
    acknowledge(close_reply.as_ref());
}

fn acknowledge(reply: Option<&Sender<Reply>>) {
    if let Some(reply) = reply {
        // The caller may have given up on the channel.
        let _ = reply.send(Reply::Done);
    }
}

/// Commit the open transaction, if there is one.
fn commit_pending(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    if !conn.is_autocommit() {
        conn.execute_batch("COMMIT")?;
    }
    Ok(())
}

/// Run one statement, streaming rows to the command's channel.
fn execute(
    conn: &rusqlite::Connection,
    autocommit: bool,
    command: &Command,
) -> rusqlite::Result<()> {
    let mutating = command.kind == CommandKind::Execute;
    if mutating && !autocommit && conn.is_autocommit() {
        conn.execute_batch("BEGIN")?;
    }

    {
        let mut stmt = conn.prepare_cached(&command.statement)?;
        let width = stmt.column_count();
        let mut rows = stmt.query(rusqlite::params_from_iter(command.params.iter()))?;
        while let Some(row) = rows.next()? {
            let Some(reply) = command.reply.as_ref() else {
                continue;
            };
            let values = (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Row>>()?;
            if reply.send(Reply::Row(values)).is_err() && !mutating {
                // Reader went away; stop scanning.
                break;
            }
        }
    }

    if mutating && autocommit {
        commit_pending(conn)?;
    }
    Ok(())
}
