// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across keyshelf crates.

use std::fmt;
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::KeyshelfError;

/// How a store opens its backing file and table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
pub enum OpenMode {
    /// Open for read/write, creating the file and table if necessary.
    #[default]
    #[strum(serialize = "c")]
    Create,
    /// Open for read/write and empty the table first.
    #[strum(serialize = "w")]
    Truncate,
    /// Open read-only; every mutation is rejected.
    #[strum(serialize = "r")]
    ReadOnly,
    /// Delete the whole backing file (all tables) before opening.
    #[strum(serialize = "n")]
    New,
}

impl OpenMode {
    /// Parses an open flag, failing with [`KeyshelfError::InvalidMode`].
    pub fn parse(flag: &str) -> Result<Self, KeyshelfError> {
        Self::from_str(flag).map_err(|_| KeyshelfError::InvalidMode(flag.to_string()))
    }

    /// Whether mutations are allowed in this mode.
    pub fn is_writable(self) -> bool {
        self != Self::ReadOnly
    }
}

/// SQLite `journal_mode` values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    #[default]
    Off,
}

/// SQLite `synchronous` levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SynchronousMode {
    #[default]
    Off,
    Normal,
    Full,
    Extra,
}

/// SQLite `temp_store` locations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TempStore {
    Default,
    File,
    #[default]
    Memory,
}

/// Lifecycle of the worker thread that owns a store's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[repr(u8)]
pub enum WorkerState {
    Init = 0,
    Connected = 1,
    Running = 2,
    Closing = 3,
    Closed = 4,
}

impl WorkerState {
    /// Decodes a state stored in an atomic. Unknown values read as `Closed`.
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Init,
            1 => Self::Connected,
            2 => Self::Running,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Submission-time context of a command: the call site and the calling thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    location: &'static Location<'static>,
    thread: Option<String>,
}

impl Origin {
    /// Captures the caller's location. Propagates through `#[track_caller]` frames.
    #[track_caller]
    pub fn capture() -> Self {
        Self {
            location: Location::caller(),
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn thread(&self) -> Option<&str> {
        self.thread.as_deref()
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}", self.location)?;
        match &self.thread {
            Some(name) => write!(f, " on thread `{name}`"),
            None => write!(f, " on an unnamed thread"),
        }
    }
}
