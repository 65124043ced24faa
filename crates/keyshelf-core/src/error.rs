// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the keyshelf store.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Origin;

/// Boxed error source carried by the storage-facing variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by every store operation.
#[derive(Debug, Error)]
pub enum KeyshelfError {
    /// The backing file or connection could not be opened.
    #[error("cannot open database {path}: {source}")]
    Connection { path: PathBuf, source: BoxError },

    /// Connection tuning (journal mode, synchronous level, ...) could not be applied.
    #[error("cannot configure connection: {message}")]
    Configuration {
        message: String,
        source: Option<BoxError>,
    },

    /// A statement failed on the worker thread.
    ///
    /// Reported to the first caller that touches the store after the failure,
    /// so it may belong to an earlier, unrelated call. `origin` names the call
    /// site that submitted the failing statement.
    #[error("statement failed: {message} (submitted {origin}): {statement}")]
    Statement {
        message: String,
        statement: String,
        origin: Origin,
    },

    /// A mutating operation was attempted on a read-only store.
    #[error("refusing to {operation} read-only store")]
    AccessDenied { operation: &'static str },

    /// The key is not present in the table.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// The open flag is not one of `c`, `w`, `r`, `n`.
    #[error("unrecognized open flag: {0:?}")]
    InvalidMode(String),

    /// The parent directory of the backing file does not exist.
    #[error("directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },

    /// A value could not be encoded or decoded.
    #[error("codec error: {source}")]
    Codec { source: BoxError },

    /// The store was closed and accepts no more commands.
    #[error("store is closed")]
    Closed,

    /// Filesystem error outside the database engine.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KeyshelfError {
    /// Wraps any encode/decode failure.
    pub fn codec(source: impl Into<BoxError>) -> Self {
        Self::Codec {
            source: source.into(),
        }
    }

    /// Returns `true` for the deferred statement failure variant.
    pub fn is_statement(&self) -> bool {
        matches!(self, Self::Statement { .. })
    }
}
