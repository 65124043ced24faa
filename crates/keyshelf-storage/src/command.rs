// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command queue protocol between callers and the worker thread.
//!
//! A command with a reply channel blocks its caller until the worker sends
//! [`Reply::Done`]; one without is fire-and-forget. The same shape serves
//! multi-row selects, point lookups, and zero-row acknowledgments.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};

use keyshelf_core::{KeyshelfError, Origin};
use rusqlite::types::Value;

use crate::worker::Shared;

thread_local! {
    /// Submitter recorded for commands built on this thread, when the real
    /// call site is on another thread.
    static SUBMITTER: RefCell<Option<Origin>> = const { RefCell::new(None) };
}

/// Run `op`, attributing every command it builds to `origin`.
pub(crate) fn submitted_from<T>(origin: Origin, op: impl FnOnce() -> T) -> T {
    struct Reset;

    impl Drop for Reset {
        fn drop(&mut self) {
            SUBMITTER.with(|slot| slot.borrow_mut().take());
        }
    }

    SUBMITTER.with(|slot| *slot.borrow_mut() = Some(origin));
    let _reset = Reset;
    op()
}

/// One result row, column values in select order.
pub type Row = Vec<Value>;

/// What the worker does with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    /// Mutating statement. Opens a transaction first when not autocommitting.
    Execute,
    /// Read-only statement.
    Select,
    Commit,
    Close,
}

/// A unit of work for the worker. Immutable once sent.
#[derive(Debug)]
pub(crate) struct Command {
    pub(crate) kind: CommandKind,
    pub(crate) statement: String,
    pub(crate) params: Vec<Value>,
    pub(crate) reply: Option<Sender<Reply>>,
    pub(crate) origin: Origin,
}

impl Command {
    #[track_caller]
    pub(crate) fn statement(
        kind: CommandKind,
        statement: impl Into<String>,
        params: Vec<Value>,
        reply: Option<Sender<Reply>>,
    ) -> Self {
        let origin = match SUBMITTER.with(|slot| slot.borrow().clone()) {
            Some(origin) => origin,
            None => Origin::capture(),
        };
        Self {
            kind,
            statement: statement.into(),
            params,
            reply,
            origin,
        }
    }

    #[track_caller]
    pub(crate) fn control(kind: CommandKind, reply: Option<Sender<Reply>>) -> Self {
        Self::statement(kind, String::new(), Vec::new(), reply)
    }
}

/// Message on a result channel.
#[derive(Debug)]
pub(crate) enum Reply {
    Row(Row),
    /// End of stream. Sent exactly once per command that carries a channel,
    /// whether the command succeeded or failed.
    Done,
}

/// Caller side of a result channel.
///
/// Yields rows until the worker's end marker. After every receive the store's
/// deferred failure slot is drained, so a failure recorded before the end
/// marker (including one raised by this very statement) is returned here.
/// Not restartable.
pub struct Rows {
    receiver: Receiver<Reply>,
    shared: Arc<Shared>,
    finished: bool,
}

impl Rows {
    pub(crate) fn new(receiver: Receiver<Reply>, shared: Arc<Shared>) -> Self {
        Self {
            receiver,
            shared,
            finished: false,
        }
    }

    /// Drain the channel, discarding rows, and report any failure.
    pub fn finish(self) -> Result<(), KeyshelfError> {
        for row in self {
            row?;
        }
        Ok(())
    }

    /// The first row, discarding the rest.
    pub fn first(mut self) -> Result<Option<Row>, KeyshelfError> {
        let first = self.next().transpose()?;
        self.finish()?;
        Ok(first)
    }
}

impl Iterator for Rows {
    type Item = Result<Row, KeyshelfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let reply = self.receiver.recv();
        if let Some(failure) = self.shared.take_failure() {
            self.finished = true;
            return Some(Err(failure));
        }
        match reply {
            Ok(Reply::Row(row)) => Some(Ok(row)),
            Ok(Reply::Done) => {
                self.finished = true;
                None
            }
            // The worker dropped the channel without an end marker: it is gone.
            Err(_) => {
                self.finished = true;
                Some(Err(KeyshelfError::Closed))
            }
        }
    }
}

impl std::fmt::Debug for Rows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rows")
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
