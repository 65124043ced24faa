// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dict-like store traits.

use async_trait::async_trait;

use crate::error::KeyshelfError;
use crate::key::StoreKey;

/// Blocking dict-like access to a single key-value table.
///
/// Every method may return a deferred [`KeyshelfError::Statement`] that
/// belongs to an earlier fire-and-forget command; it is reported once.
pub trait KvStore<V> {
    /// Lazy, non-restartable iterator over keys in insertion order.
    type Keys: Iterator<Item = Result<String, KeyshelfError>>;
    /// Lazy, non-restartable iterator over values in insertion order.
    type Values: Iterator<Item = Result<V, KeyshelfError>>;
    /// Lazy, non-restartable iterator over entries in insertion order.
    type Items: Iterator<Item = Result<(String, V), KeyshelfError>>;

    /// Returns the value for `key`, or `None` when absent.
    fn get<K: StoreKey + ?Sized>(&self, key: &K) -> Result<Option<V>, KeyshelfError>;

    /// Inserts or replaces the value for `key`.
    fn set<K: StoreKey + ?Sized>(&self, key: &K, value: &V) -> Result<(), KeyshelfError>;

    /// Removes `key`, failing with [`KeyshelfError::KeyNotFound`] when absent.
    fn delete<K: StoreKey + ?Sized>(&self, key: &K) -> Result<(), KeyshelfError>;

    /// Whether `key` is present.
    fn contains<K: StoreKey + ?Sized>(&self, key: &K) -> Result<bool, KeyshelfError>;

    /// Number of entries. This is a full table scan, not a cached counter.
    fn len(&self) -> Result<usize, KeyshelfError>;

    /// Whether the table has no entries.
    fn is_empty(&self) -> Result<bool, KeyshelfError>;

    fn keys(&self) -> Result<Self::Keys, KeyshelfError>;

    fn values(&self) -> Result<Self::Values, KeyshelfError>;

    fn items(&self) -> Result<Self::Items, KeyshelfError>;

    /// Removes every entry and commits.
    fn clear(&self) -> Result<(), KeyshelfError>;

    /// Commits pending writes. When `blocking` is false the commit is only queued.
    fn commit(&self, blocking: bool) -> Result<(), KeyshelfError>;
}

/// Async counterpart of [`KvStore`] for callers running on an async runtime.
///
/// Listing operations collect their results instead of streaming them.
#[async_trait]
pub trait AsyncKvStore<V: Send + 'static>: Send + Sync {
    async fn get<K>(&self, key: K) -> Result<Option<V>, KeyshelfError>
    where
        K: StoreKey + Send + 'static;

    async fn set<K>(&self, key: K, value: V) -> Result<(), KeyshelfError>
    where
        K: StoreKey + Send + 'static;

    async fn delete<K>(&self, key: K) -> Result<(), KeyshelfError>
    where
        K: StoreKey + Send + 'static;

    async fn contains<K>(&self, key: K) -> Result<bool, KeyshelfError>
    where
        K: StoreKey + Send + 'static;

    async fn len(&self) -> Result<usize, KeyshelfError>;

    async fn keys(&self) -> Result<Vec<String>, KeyshelfError>;

    async fn values(&self) -> Result<Vec<V>, KeyshelfError>;

    async fn items(&self) -> Result<Vec<(String, V)>, KeyshelfError>;

    async fn clear(&self) -> Result<(), KeyshelfError>;

    async fn commit(&self) -> Result<(), KeyshelfError>;
}
