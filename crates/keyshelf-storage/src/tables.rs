// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inspecting existing database files.

use std::io;
use std::path::Path;

use keyshelf_core::KeyshelfError;
use rusqlite::OpenFlags;

/// Names of the tables in the database at `path`, in creation order.
///
/// Opens its own short-lived read-only connection; the file must exist.
pub fn list_tables(path: impl AsRef<Path>) -> Result<Vec<String>, KeyshelfError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(KeyshelfError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::NotFound, "database file does not exist"),
        });
    }

    let connection_error = |err: rusqlite::Error| KeyshelfError::Connection {
        path: path.to_path_buf(),
        source: Box::new(err),
    };
    let conn = rusqlite::Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(connection_error)?;

    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid")
        .map_err(connection_error)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(connection_error)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(connection_error)?;
    Ok(names)
}
