// SPDX-FileCopyrightText: 2026 Keyshelf Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async access to a [`Store`] from a tokio runtime.
//!
//! Every call blocks on the store's result channel, so it runs on tokio's
//! blocking pool instead of a runtime worker.

use std::sync::Arc;

use async_trait::async_trait;
use keyshelf_core::{AsyncKvStore, Codec, KeyshelfError, Origin, StoreKey};

use crate::codec::JsonCodec;
use crate::command::submitted_from;
use crate::store::Store;

/// Async wrapper around a shared [`Store`].
pub struct AsyncStore<V, C = JsonCodec> {
    store: Arc<Store<V, C>>,
}

impl<V, C> AsyncStore<V, C>
where
    V: Send + 'static,
    C: Codec<V>,
{
    pub fn new(store: Store<V, C>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The wrapped store, for blocking callers sharing it.
    pub fn store(&self) -> &Arc<Store<V, C>> {
        &self.store
    }

    /// Value for `key`, or `None` when absent.
    #[track_caller]
    pub fn get<K>(&self, key: K) -> impl Future<Output = Result<Option<V>, KeyshelfError>> + Send
    where
        K: StoreKey + Send + 'static,
    {
        self.run(move |store| store.get(&key))
    }

    #[track_caller]
    pub fn set<K>(&self, key: K, value: V) -> impl Future<Output = Result<(), KeyshelfError>> + Send
    where
        K: StoreKey + Send + 'static,
    {
        self.run(move |store| store.set(&key, &value))
    }

    #[track_caller]
    pub fn delete<K>(&self, key: K) -> impl Future<Output = Result<(), KeyshelfError>> + Send
    where
        K: StoreKey + Send + 'static,
    {
        self.run(move |store| store.delete(&key))
    }

    #[track_caller]
    pub fn contains<K>(&self, key: K) -> impl Future<Output = Result<bool, KeyshelfError>> + Send
    where
        K: StoreKey + Send + 'static,
    {
        self.run(move |store| store.contains(&key))
    }

    #[track_caller]
    pub fn len(&self) -> impl Future<Output = Result<usize, KeyshelfError>> + Send {
        self.run(|store| store.len())
    }

    /// All keys in insertion order, collected.
    #[track_caller]
    pub fn keys(&self) -> impl Future<Output = Result<Vec<String>, KeyshelfError>> + Send {
        self.run(|store| store.keys()?.collect())
    }

    #[track_caller]
    pub fn values(&self) -> impl Future<Output = Result<Vec<V>, KeyshelfError>> + Send {
        self.run(|store| store.values()?.collect())
    }

    #[track_caller]
    pub fn items(&self) -> impl Future<Output = Result<Vec<(String, V)>, KeyshelfError>> + Send {
        self.run(|store| store.items()?.collect())
    }

    #[track_caller]
    pub fn clear(&self) -> impl Future<Output = Result<(), KeyshelfError>> + Send {
        self.run(|store| store.clear())
    }

    /// Blocking commit, run off the runtime.
    #[track_caller]
    pub fn commit(&self) -> impl Future<Output = Result<(), KeyshelfError>> + Send {
        self.run(|store| store.commit(true))
    }

    /// Gracefully close the wrapped store.
    #[track_caller]
    pub fn close(&self) -> impl Future<Output = Result<(), KeyshelfError>> + Send {
        self.run(|store| store.close())
    }

    /// Close the store and delete its file.
    #[track_caller]
    pub fn terminate(&self) -> impl Future<Output = Result<(), KeyshelfError>> + Send {
        self.run(|store| store.terminate())
    }

    /// Run `op` on the blocking pool. Commands it submits are attributed to
    /// the caller of the public method, not to this module.
    #[track_caller]
    fn run<T, F>(&self, op: F) -> impl Future<Output = Result<T, KeyshelfError>> + Send
    where
        T: Send + 'static,
        F: FnOnce(&Store<V, C>) -> Result<T, KeyshelfError> + Send + 'static,
    {
        let origin = Origin::capture();
        let store = Arc::clone(&self.store);
        async move {
            tokio::task::spawn_blocking(move || submitted_from(origin, || op(&store)))
                .await
                .map_err(|err| KeyshelfError::Internal(format!("store task failed: {err}")))?
        }
    }
}

impl<V, C> Clone for AsyncStore<V, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

#[async_trait]
impl<V, C> AsyncKvStore<V> for AsyncStore<V, C>
where
    V: Send + 'static,
    C: Codec<V>,
{
    async fn get<K>(&self, key: K) -> Result<Option<V>, KeyshelfError>
    where
        K: StoreKey + Send + 'static,
    {
        AsyncStore::get(self, key).await
    }

    async fn set<K>(&self, key: K, value: V) -> Result<(), KeyshelfError>
    where
        K: StoreKey + Send + 'static,
    {
        AsyncStore::set(self, key, value).await
    }

    async fn delete<K>(&self, key: K) -> Result<(), KeyshelfError>
    where
        K: StoreKey + Send + 'static,
    {
        AsyncStore::delete(self, key).await
    }

    async fn contains<K>(&self, key: K) -> Result<bool, KeyshelfError>
    where
        K: StoreKey + Send + 'static,
    {
        AsyncStore::contains(self, key).await
    }

    async fn len(&self) -> Result<usize, KeyshelfError> {
        AsyncStore::len(self).await
    }

    async fn keys(&self) -> Result<Vec<String>, KeyshelfError> {
        AsyncStore::keys(self).await
    }

    async fn values(&self) -> Result<Vec<V>, KeyshelfError> {
        AsyncStore::values(self).await
    }

    async fn items(&self) -> Result<Vec<(String, V)>, KeyshelfError> {
        AsyncStore::items(self).await
    }

    async fn clear(&self) -> Result<(), KeyshelfError> {
        AsyncStore::clear(self).await
    }

    async fn commit(&self) -> Result<(), KeyshelfError> {
        AsyncStore::commit(self).await
    }
}
