// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp-file store harness.
//!
//! `TestStore` owns a temp directory holding one SQLite file and a store
//! opened on it. Everything is removed when the harness is dropped.

use std::path::{Path, PathBuf};

use keyshelf_config::KeyshelfConfig;
use keyshelf_core::{KeyshelfError, OpenMode};
use keyshelf_storage::{Store, StoreOptions};
use serde_json::Value;

/// Builder for [`TestStore`].
pub struct TestStoreBuilder {
    table: String,
    mode: OpenMode,
    autocommit: bool,
    entries: Vec<(String, Value)>,
}

impl TestStoreBuilder {
    fn new() -> Self {
        Self {
            table: "unnamed".to_string(),
            mode: OpenMode::Create,
            autocommit: false,
            entries: Vec::new(),
        }
    }

    /// Use a table other than `unnamed`.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// Open mode of the final store. Seeding always uses `c`, so seeded
    /// entries survive `r` but not `w` or `n`.
    pub fn with_mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Entries committed to the table before the store is handed out.
    pub fn with_entries<K: Into<String>>(mut self, entries: Vec<(K, Value)>) -> Self {
        self.entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect();
        self
    }

    /// Create the temp directory, seed it, and open the store.
    pub fn build(self) -> Result<TestStore, KeyshelfError> {
        let temp_dir = tempfile::TempDir::new().map_err(|source| KeyshelfError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
        let path = temp_dir.path().join("test.sqlite");

        if !self.entries.is_empty() {
            let seed: Store<Value> = StoreOptions::new(&path).table(&self.table).open()?;
            seed.update(self.entries)?;
            seed.close()?;
        }

        let store = StoreOptions::new(&path)
            .table(&self.table)
            .mode(self.mode)
            .autocommit(self.autocommit)
            .open()?;

        Ok(TestStore {
            store,
            path,
            table: self.table,
            autocommit: self.autocommit,
            temp_dir,
        })
    }
}

/// A store on a temp file, cleaned up on drop.
pub struct TestStore {
    /// The open store. Values are arbitrary JSON.
    pub store: Store<Value>,
    path: PathBuf,
    table: String,
    autocommit: bool,
    temp_dir: tempfile::TempDir,
}

impl TestStore {
    pub fn builder() -> TestStoreBuilder {
        TestStoreBuilder::new()
    }

    /// Backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The temp directory holding the database.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Open a second, independent store on the same file and table.
    pub fn reopen(&self, mode: OpenMode) -> Result<Store<Value>, KeyshelfError> {
        StoreOptions::new(&self.path)
            .table(&self.table)
            .mode(mode)
            .open()
    }

    /// Write a `keyshelf.toml` pointing at this store and return its path.
    pub fn write_config(&self) -> Result<PathBuf, KeyshelfError> {
        let mut config = KeyshelfConfig::default();
        config.store.path = self.path.display().to_string();
        config.store.table = self.table.clone();
        config.store.autocommit = self.autocommit;
        config.logging.level = "warn".to_string();

        let config_path = self.dir().join("keyshelf.toml");
        let rendered = toml::to_string(&config)
            .map_err(|err| KeyshelfError::Internal(format!("cannot render config: {err}")))?;
        std::fs::write(&config_path, rendered).map_err(|source| KeyshelfError::Io {
            path: config_path.clone(),
            source,
        })?;
        Ok(config_path)
    }
}
