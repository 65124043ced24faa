// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dict-like facade over one table of a SQLite file.
//!
//! A [`Store`] translates map operations into statements on its
//! [`Connection`]. Keys are normalized with [`StoreKey`], values pass through
//! a [`Codec`], and the table layout is always
//! `(key TEXT PRIMARY KEY, value BLOB)`.

use std::fmt;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use keyshelf_config::{KeyshelfConfig, TuningConfig};
use keyshelf_core::{Codec, KeyshelfError, KvStore, OpenMode, StoreKey, WorkerState};
use rusqlite::types::Value;
use tracing::{error, info};

use crate::codec::JsonCodec;
use crate::command::{Row, Rows};
use crate::connection::Connection;
use crate::worker::MEMORY_PATH;

/// Side files SQLite may leave next to a database.
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Options for opening a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    path: PathBuf,
    table: String,
    flag: String,
    autocommit: bool,
    tuning: TuningConfig,
}

impl StoreOptions {
    /// Options for the file at `path`, with table `unnamed`, flag `c`, and
    /// autocommit off.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: "unnamed".to_string(),
            flag: OpenMode::default().to_string(),
            autocommit: false,
            tuning: TuningConfig::default(),
        }
    }

    /// Options for a fresh temporary file that outlives the store.
    pub fn temporary() -> Self {
        Self::new(PathBuf::new())
    }

    /// Options for the store described by `config`.
    pub fn from_config(config: &KeyshelfConfig) -> Self {
        Self {
            path: PathBuf::from(&config.store.path),
            table: config.store.table.clone(),
            flag: config.store.flag.clone(),
            autocommit: config.store.autocommit,
            tuning: config.tuning.clone(),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Raw open flag. Checked when the store is opened.
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = flag.into();
        self
    }

    pub fn mode(self, mode: OpenMode) -> Self {
        self.flag(mode.to_string())
    }

    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn tuning(mut self, tuning: TuningConfig) -> Self {
        self.tuning = tuning;
        self
    }

    /// Open with the JSON codec.
    pub fn open<V>(self) -> Result<Store<V>, KeyshelfError>
    where
        JsonCodec: Codec<V>,
    {
        self.open_with_codec(JsonCodec)
    }

    pub fn open_with_codec<V, C>(self, codec: C) -> Result<Store<V, C>, KeyshelfError>
    where
        C: Codec<V>,
    {
        Store::open_options(self, codec)
    }
}

/// SQL for one table, built once at open.
#[derive(Debug)]
struct Statements {
    create: String,
    get: String,
    contains: String,
    set: String,
    delete: String,
    count: String,
    last_rowid: String,
    keys: String,
    values: String,
    items: String,
    clear: String,
}

impl Statements {
    fn for_table(table: &str) -> Self {
        let t = quote_identifier(table);
        Self {
            create: format!("CREATE TABLE IF NOT EXISTS {t} (key TEXT PRIMARY KEY, value BLOB)"),
            get: format!("SELECT value FROM {t} WHERE key = ?1"),
            contains: format!("SELECT 1 FROM {t} WHERE key = ?1"),
            set: format!("REPLACE INTO {t} (key, value) VALUES (?1, ?2)"),
            delete: format!("DELETE FROM {t} WHERE key = ?1 RETURNING key"),
            count: format!("SELECT COUNT(*) FROM {t}"),
            last_rowid: format!("SELECT MAX(ROWID) FROM {t}"),
            keys: format!("SELECT key FROM {t} ORDER BY rowid"),
            values: format!("SELECT value FROM {t} ORDER BY rowid"),
            items: format!("SELECT key, value FROM {t} ORDER BY rowid"),
            clear: format!("DELETE FROM {t}"),
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A thread-safe, dict-like view of one table.
///
/// Share it across threads with `Arc<Store<V>>`; all calls are serialized
/// through the worker in submission order.
pub struct Store<V, C = JsonCodec> {
    path: PathBuf,
    table: String,
    mode: OpenMode,
    autocommit: bool,
    in_memory: bool,
    codec: Arc<C>,
    sql: Statements,
    conn: Connection,
    _value: PhantomData<fn() -> V>,
}

impl<V> Store<V>
where
    JsonCodec: Codec<V>,
{
    /// Open table `unnamed` in `path` with default options.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, KeyshelfError> {
        StoreOptions::new(path).open()
    }
}

impl<V, C> Store<V, C>
where
    C: Codec<V>,
{
    fn open_options(options: StoreOptions, codec: C) -> Result<Self, KeyshelfError> {
        let mode = OpenMode::parse(&options.flag)?;

        let path = if options.path.as_os_str().is_empty() {
            temporary_file()?
        } else {
            options.path
        };
        let in_memory = path.as_os_str() == MEMORY_PATH;

        if !in_memory {
            let parent = path.parent().filter(|d| !d.as_os_str().is_empty());
            if let Some(dir) = parent.filter(|d| !d.is_dir()) {
                return Err(KeyshelfError::MissingDirectory {
                    path: dir.to_path_buf(),
                });
            }
            if mode == OpenMode::New {
                remove_if_exists(&path)?;
            }
        }

        info!(
            path = %path.display(),
            table = %options.table,
            %mode,
            autocommit = options.autocommit,
            "opening store"
        );

        let conn = Connection::open(&path, options.autocommit, &options.tuning)?;
        let store = Self {
            sql: Statements::for_table(&options.table),
            path,
            table: options.table,
            mode,
            autocommit: options.autocommit,
            in_memory,
            codec: Arc::new(codec),
            conn,
            _value: PhantomData,
        };

        store.conn.execute(&store.sql.create, Vec::new())?;
        store.conn.commit(true)?;
        if mode == OpenMode::Truncate {
            store.clear()?;
        }
        Ok(store)
    }

    /// Value for `key`, or `None` when absent.
    #[track_caller]
    pub fn get<K: StoreKey + ?Sized>(&self, key: &K) -> Result<Option<V>, KeyshelfError> {
        let row = self.conn.select_one(&self.sql.get, vec![key_param(key)])?;
        match row {
            Some(row) => Ok(Some(decode_value(self.codec.as_ref(), single(row)?)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace the value for `key`, waiting for the worker.
    #[track_caller]
    pub fn set<K: StoreKey + ?Sized>(&self, key: &K, value: &V) -> Result<(), KeyshelfError> {
        self.writable("write to")?;
        let params = vec![key_param(key), Value::Blob(self.codec.encode(value)?)];
        self.conn.execute_returning(&self.sql.set, params)?.finish()
    }

    /// Remove `key` in a single statement.
    ///
    /// Of several concurrent deletes of the same key exactly one succeeds;
    /// the others get [`KeyshelfError::KeyNotFound`].
    #[track_caller]
    pub fn delete<K: StoreKey + ?Sized>(&self, key: &K) -> Result<(), KeyshelfError> {
        self.writable("delete from")?;
        let key = key.normalize();
        let removed = self
            .conn
            .execute_returning(&self.sql.delete, vec![Value::Text(key.clone())])?
            .first()?;
        match removed {
            Some(_) => Ok(()),
            None => Err(KeyshelfError::KeyNotFound { key }),
        }
    }

    #[track_caller]
    pub fn contains<K: StoreKey + ?Sized>(&self, key: &K) -> Result<bool, KeyshelfError> {
        let row = self
            .conn
            .select_one(&self.sql.contains, vec![key_param(key)])?;
        Ok(row.is_some())
    }

    /// Number of entries, counted by scanning the table.
    #[track_caller]
    pub fn len(&self) -> Result<usize, KeyshelfError> {
        let row = self.conn.select_one(&self.sql.count, Vec::new())?;
        match row.and_then(|mut row| row.pop()) {
            Some(Value::Integer(n)) => usize::try_from(n)
                .map_err(|_| KeyshelfError::Internal(format!("negative row count {n}"))),
            other => Err(KeyshelfError::Internal(format!(
                "unexpected COUNT(*) result: {other:?}"
            ))),
        }
    }

    #[track_caller]
    pub fn is_empty(&self) -> Result<bool, KeyshelfError> {
        let row = self.conn.select_one(&self.sql.last_rowid, Vec::new())?;
        Ok(matches!(
            row.and_then(|mut row| row.pop()),
            None | Some(Value::Null)
        ))
    }

    /// Keys in insertion order.
    #[track_caller]
    pub fn keys(&self) -> Result<Keys, KeyshelfError> {
        let rows = self.conn.select(&self.sql.keys, Vec::new())?;
        Ok(Keys { rows })
    }

    /// Values in insertion order.
    #[track_caller]
    pub fn values(&self) -> Result<Values<V, C>, KeyshelfError> {
        let rows = self.conn.select(&self.sql.values, Vec::new())?;
        Ok(Values {
            rows,
            codec: Arc::clone(&self.codec),
            _value: PhantomData,
        })
    }

    /// Entries in insertion order.
    #[track_caller]
    pub fn items(&self) -> Result<Items<V, C>, KeyshelfError> {
        let rows = self.conn.select(&self.sql.items, Vec::new())?;
        Ok(Items {
            rows,
            codec: Arc::clone(&self.codec),
            _value: PhantomData,
        })
    }

    /// Upsert every pair.
    ///
    /// Writes are queued without waiting; with autocommit the call then
    /// waits for a commit, otherwise it only reports failures seen so far.
    #[track_caller]
    pub fn update<K, I>(&self, items: I) -> Result<(), KeyshelfError>
    where
        K: StoreKey,
        I: IntoIterator<Item = (K, V)>,
    {
        self.writable("write to")?;
        for (key, value) in items {
            let params = vec![key_param(&key), Value::Blob(self.codec.encode(&value)?)];
            self.conn.execute(&self.sql.set, params)?;
        }
        if self.autocommit {
            self.conn.commit(true)
        } else {
            self.conn.check_failure()
        }
    }

    /// Delete every entry and commit.
    #[track_caller]
    pub fn clear(&self) -> Result<(), KeyshelfError> {
        self.writable("clear")?;
        // Commit first so pending writes are not folded into the delete.
        self.conn.commit(true)?;
        self.conn.execute(&self.sql.clear, Vec::new())?;
        self.conn.commit(true)
    }

    /// Commit pending writes. See [`Connection::commit`].
    #[track_caller]
    pub fn commit(&self, blocking: bool) -> Result<(), KeyshelfError> {
        self.conn.commit(blocking)
    }

    /// Commit, then close the connection and join the worker.
    ///
    /// Reports the first failure of the two; both steps always run.
    pub fn close(&self) -> Result<(), KeyshelfError> {
        if self.conn.is_closed() {
            return Ok(());
        }
        let committed = self.conn.commit(true);
        let closed = self.conn.close();
        committed.and(closed)
    }

    /// Close without committing or waiting. Never fails.
    pub fn close_forced(&self) {
        self.conn.close_forced();
    }

    /// Close the store and delete its backing file.
    ///
    /// This removes every table in the file, not just this store's.
    pub fn terminate(&self) -> Result<(), KeyshelfError> {
        self.writable("terminate")?;
        self.close()?;
        if self.in_memory {
            return Ok(());
        }
        info!(path = %self.path.display(), "deleting store file");
        remove_if_exists(&self.path).inspect_err(|err| {
            error!(path = %self.path.display(), error = %err, "failed to delete store file");
        })?;
        for suffix in SIDE_FILE_SUFFIXES {
            let mut side = self.path.clone().into_os_string();
            side.push(suffix);
            remove_if_exists(Path::new(&side))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    pub fn state(&self) -> WorkerState {
        self.conn.state()
    }

    /// The underlying connection, for statements beyond the map API.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn writable(&self, operation: &'static str) -> Result<(), KeyshelfError> {
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(KeyshelfError::AccessDenied { operation })
        }
    }
}

impl<V, C> fmt::Display for Store<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Store({} [{}])", self.path.display(), self.table)
    }
}

impl<V, C> fmt::Debug for Store<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("table", &self.table)
            .field("mode", &self.mode)
            .field("autocommit", &self.autocommit)
            .field("conn", &self.conn)
            .finish_non_exhaustive()
    }
}

impl<V, C> KvStore<V> for Store<V, C>
where
    C: Codec<V>,
{
    type Keys = Keys;
    type Values = Values<V, C>;
    type Items = Items<V, C>;

    #[track_caller]
    fn get<K: StoreKey + ?Sized>(&self, key: &K) -> Result<Option<V>, KeyshelfError> {
        Store::get(self, key)
    }

    #[track_caller]
    fn set<K: StoreKey + ?Sized>(&self, key: &K, value: &V) -> Result<(), KeyshelfError> {
        Store::set(self, key, value)
    }

    #[track_caller]
    fn delete<K: StoreKey + ?Sized>(&self, key: &K) -> Result<(), KeyshelfError> {
        Store::delete(self, key)
    }

    #[track_caller]
    fn contains<K: StoreKey + ?Sized>(&self, key: &K) -> Result<bool, KeyshelfError> {
        Store::contains(self, key)
    }

    #[track_caller]
    fn len(&self) -> Result<usize, KeyshelfError> {
        Store::len(self)
    }

    #[track_caller]
    fn is_empty(&self) -> Result<bool, KeyshelfError> {
        Store::is_empty(self)
    }

    #[track_caller]
    fn keys(&self) -> Result<Keys, KeyshelfError> {
        Store::keys(self)
    }

    #[track_caller]
    fn values(&self) -> Result<Values<V, C>, KeyshelfError> {
        Store::values(self)
    }

    #[track_caller]
    fn items(&self) -> Result<Items<V, C>, KeyshelfError> {
        Store::items(self)
    }

    #[track_caller]
    fn clear(&self) -> Result<(), KeyshelfError> {
        Store::clear(self)
    }

    #[track_caller]
    fn commit(&self, blocking: bool) -> Result<(), KeyshelfError> {
        Store::commit(self, blocking)
    }
}

/// Lazy iterator over a store's keys.
#[derive(Debug)]
pub struct Keys {
    rows: Rows,
}

impl Iterator for Keys {
    type Item = Result<String, KeyshelfError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };
        Some(single(row).and_then(decode_key))
    }
}

/// Lazy iterator over a store's decoded values.
pub struct Values<V, C> {
    rows: Rows,
    codec: Arc<C>,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> Iterator for Values<V, C> {
    type Item = Result<V, KeyshelfError>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = match self.rows.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };
        Some(single(row).and_then(|value| decode_value(self.codec.as_ref(), value)))
    }
}

/// Lazy iterator over a store's `(key, value)` pairs.
pub struct Items<V, C> {
    rows: Rows,
    codec: Arc<C>,
    _value: PhantomData<fn() -> V>,
}

impl<V, C: Codec<V>> Iterator for Items<V, C> {
    type Item = Result<(String, V), KeyshelfError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut row = match self.rows.next()? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };
        let (Some(value), Some(key), true) = (row.pop(), row.pop(), row.is_empty()) else {
            return Some(Err(KeyshelfError::Internal(
                "item row is not a (key, value) pair".to_string(),
            )));
        };
        let pair = decode_key(key)
            .and_then(|key| Ok((key, decode_value(self.codec.as_ref(), value)?)));
        Some(pair)
    }
}

fn key_param<K: StoreKey + ?Sized>(key: &K) -> Value {
    Value::Text(key.normalize())
}

/// The only column of a one-column row.
fn single(row: Row) -> Result<Value, KeyshelfError> {
    let width = row.len();
    match (row.into_iter().next(), width) {
        (Some(value), 1) => Ok(value),
        _ => Err(KeyshelfError::Internal(format!(
            "expected one column, got {width}"
        ))),
    }
}

fn decode_key(value: Value) -> Result<String, KeyshelfError> {
    match value {
        Value::Text(key) => Ok(key),
        Value::Integer(n) => Ok(n.to_string()),
        Value::Real(x) => Ok(x.to_string()),
        Value::Blob(bytes) => String::from_utf8(bytes).map_err(KeyshelfError::codec),
        Value::Null => Err(KeyshelfError::Internal("NULL key in table".to_string())),
    }
}

fn decode_value<V, C: Codec<V>>(codec: &C, value: Value) -> Result<V, KeyshelfError> {
    match value {
        Value::Blob(bytes) => codec.decode(&bytes),
        Value::Text(text) => codec.decode(text.as_bytes()),
        other => Err(KeyshelfError::codec(format!(
            "stored value is not a blob: {other:?}"
        ))),
    }
}

/// Create a uniquely named file in the system temp dir and keep it.
fn temporary_file() -> Result<PathBuf, KeyshelfError> {
    let file = tempfile::Builder::new()
        .prefix("keyshelf-")
        .suffix(".sqlite")
        .tempfile()
        .map_err(|source| KeyshelfError::Io {
            path: std::env::temp_dir(),
            source,
        })?;
    let (_, path) = file.keep().map_err(|err| KeyshelfError::Io {
        path: std::env::temp_dir(),
        source: err.error,
    })?;
    Ok(path)
}

fn remove_if_exists(path: &Path) -> Result<(), KeyshelfError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(KeyshelfError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
