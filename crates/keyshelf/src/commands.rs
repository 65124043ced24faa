// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.
//!
//! Values are arbitrary JSON. Output goes to the given writer so commands
//! can be exercised without a terminal.

use std::io::Write;
use std::path::PathBuf;

use keyshelf_config::KeyshelfConfig;
use keyshelf_core::KeyshelfError;
use keyshelf_storage::{Store, StoreOptions, list_tables};
use serde_json::Value;
use tracing::debug;

use crate::Commands;

/// Run one subcommand against the store described by `config`.
pub(crate) fn run(
    command: &Commands,
    config: &KeyshelfConfig,
    out: &mut impl Write,
) -> Result<(), KeyshelfError> {
    debug!(?command, path = %config.store.path, table = %config.store.table, "running command");
    if let Commands::Tables = command {
        for table in list_tables(&config.store.path)? {
            emit(out, &table)?;
        }
        return Ok(());
    }

    let store: Store<Value> = StoreOptions::from_config(config).open()?;
    if let Commands::Terminate = command {
        return store.terminate();
    }

    let result = run_on_store(command, &store, out);
    // Close even when the command failed, but report the command's error first.
    let closed = store.close();
    result.and(closed)
}

fn run_on_store(
    command: &Commands,
    store: &Store<Value>,
    out: &mut impl Write,
) -> Result<(), KeyshelfError> {
    match command {
        Commands::Get { key } => match store.get(key.as_str())? {
            Some(value) => emit(out, &value.to_string()),
            None => Err(KeyshelfError::KeyNotFound { key: key.clone() }),
        },
        Commands::Set { key, value } => store.set(key.as_str(), &parse_value(value)),
        Commands::Delete { key } => store.delete(key.as_str()),
        Commands::Keys => {
            for key in store.keys()? {
                emit(out, &key?)?;
            }
            Ok(())
        }
        Commands::Items => {
            for item in store.items()? {
                let (key, value) = item?;
                emit(out, &format!("{key}\t{value}"))?;
            }
            Ok(())
        }
        Commands::Len => emit(out, &store.len()?.to_string()),
        Commands::Clear => store.clear(),
        Commands::Tables | Commands::Terminate => Ok(()),
    }
}

/// JSON when it parses, otherwise the raw text as a JSON string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn emit(out: &mut impl Write, line: &str) -> Result<(), KeyshelfError> {
    writeln!(out, "{line}").map_err(|source| KeyshelfError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    })
}
