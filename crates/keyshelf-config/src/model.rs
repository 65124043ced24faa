// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for keyshelf.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use keyshelf_core::{JournalMode, SynchronousMode, TempStore};
use serde::{Deserialize, Serialize};

/// Top-level keyshelf configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeyshelfConfig {
    /// Backing file, table, and open mode.
    #[serde(default)]
    pub store: StoreConfig,

    /// Connection pragmas applied when the worker connects.
    #[serde(default)]
    pub tuning: TuningConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which store to open and how.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the SQLite file. Empty means a fresh temporary file,
    /// `:memory:` means an in-memory database.
    #[serde(default = "default_path")]
    pub path: String,

    /// Table holding the key-value pairs. One file may hold many tables.
    #[serde(default = "default_table")]
    pub table: String,

    /// Open flag: `c` (create), `w` (truncate table), `r` (read-only), `n` (new file).
    #[serde(default = "default_flag")]
    pub flag: String,

    /// Commit after every mutating statement.
    #[serde(default)]
    pub autocommit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            table: default_table(),
            flag: default_flag(),
            autocommit: false,
        }
    }
}

fn default_path() -> String {
    "keyshelf.db".to_string()
}

fn default_table() -> String {
    "unnamed".to_string()
}

fn default_flag() -> String {
    "c".to_string()
}

/// Durability and performance pragmas. None of these affect correctness
/// of a single process; they trade crash safety for speed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TuningConfig {
    /// `PRAGMA journal_mode`.
    #[serde(default)]
    pub journal_mode: JournalMode,

    /// `PRAGMA synchronous`.
    #[serde(default)]
    pub synchronous: SynchronousMode,

    /// `PRAGMA temp_store`.
    #[serde(default)]
    pub temp_store: TempStore,

    /// `PRAGMA mmap_size` in bytes.
    #[serde(default = "default_mmap_size")]
    pub mmap_size: u64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            journal_mode: JournalMode::default(),
            synchronous: SynchronousMode::default(),
            temp_store: TempStore::default(),
            mmap_size: default_mmap_size(),
        }
    }
}

fn default_mmap_size() -> u64 {
    30_000_000_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
