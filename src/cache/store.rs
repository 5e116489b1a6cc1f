//! Named cache stores.
//!
//! A [`CacheStorage`] holds any number of named stores, each mapping a
//! [`CacheKey`] to a stored [`Response`]. Methods return `impl Future + Send`
//! so network-backed or async implementations can be plugged in later.

use alloc::collections::BTreeMap;
use core::future::{self, Future};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::http::{CacheKey, Response};
use crate::error::{Result, lock_poison_error};

/// Collection of named response caches.
pub trait CacheStorage: core::fmt::Debug + Send + Sync {
    /// Ensures the store `name` exists. Returns `true` if it was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn open(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Names of all existing stores, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Deletes the store `name`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn delete(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Looks up `key` in the store `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn match_request(
        &self,
        name: &str,
        key: &CacheKey,
    ) -> impl Future<Output = Result<Option<Response>>> + Send;

    /// Stores `response` under `key`, creating the store if needed and
    /// replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn put(
        &self,
        name: &str,
        key: CacheKey,
        response: Response,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Stores every entry at once; on error nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn put_all(
        &self,
        name: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Keys stored in `name`, in insertion order. Empty if the store does
    /// not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn requests(&self, name: &str) -> impl Future<Output = Result<Vec<CacheKey>>> + Send;
}

/// One cached entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct CachedEntry {
    /// Request identity.
    key: CacheKey,
    /// Stored response.
    response: Response,
}

/// All stores and their entries; the state shared by every backend.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(super) struct Stores {
    /// Entries per store name.
    stores: BTreeMap<String, Vec<CachedEntry>>,
}

impl Stores {
    /// Creates the store if missing.
    pub(super) fn open(&mut self, name: &str) -> bool {
        if self.stores.contains_key(name) {
            return false;
        }
        let _previous = self.stores.insert(name.to_owned(), Vec::new());
        true
    }

    /// Store names.
    pub(super) fn keys(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    /// Removes a store.
    pub(super) fn delete(&mut self, name: &str) -> bool {
        self.stores.remove(name).is_some()
    }

    /// Finds a stored response.
    pub(super) fn lookup(&self, name: &str, key: &CacheKey) -> Option<Response> {
        self.stores
            .get(name)?
            .iter()
            .find(|entry| entry.key == *key)
            .map(|entry| entry.response.clone())
    }

    /// Inserts or replaces one entry.
    pub(super) fn put(&mut self, name: &str, key: CacheKey, response: Response) {
        let entries = self.stores.entry(name.to_owned()).or_default();
        if let Some(existing) = entries.iter_mut().find(|entry| entry.key == key) {
            existing.response = response;
        } else {
            entries.push(CachedEntry { key, response });
        }
    }

    /// Keys in one store.
    pub(super) fn requests(&self, name: &str) -> Vec<CacheKey> {
        self.stores
            .get(name)
            .map(|entries| entries.iter().map(|entry| entry.key.clone()).collect())
            .unwrap_or_default()
    }
}

/// Thread-safe in-memory cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    /// All stores behind a single mutex.
    inner: Mutex<Stores>,
}

impl MemoryCacheStorage {
    /// Creates an empty storage.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `op` with the locked state.
    fn with<R, F: FnOnce(&mut Stores) -> R>(&self, op: F) -> Result<R> {
        let mut stores = self.inner.lock().map_err(|err| lock_poison_error(&err))?;
        Ok(op(&mut stores))
    }
}

impl CacheStorage for MemoryCacheStorage {
    #[inline]
    fn open(&self, name: &str) -> impl Future<Output = Result<bool>> + Send {
        future::ready(self.with(|stores| stores.open(name)))
    }

    #[inline]
    fn keys(&self) -> impl Future<Output = Result<Vec<String>>> + Send {
        future::ready(self.with(|stores| stores.keys()))
    }

    #[inline]
    fn delete(&self, name: &str) -> impl Future<Output = Result<bool>> + Send {
        future::ready(self.with(|stores| stores.delete(name)))
    }

    #[inline]
    fn match_request(
        &self,
        name: &str,
        key: &CacheKey,
    ) -> impl Future<Output = Result<Option<Response>>> + Send {
        future::ready(self.with(|stores| stores.lookup(name, key)))
    }

    #[inline]
    fn put(
        &self,
        name: &str,
        key: CacheKey,
        response: Response,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with(|stores| stores.put(name, key, response)))
    }

    #[inline]
    fn put_all(
        &self,
        name: &str,
        entries: Vec<(CacheKey, Response)>,
    ) -> impl Future<Output = Result<()>> + Send {
        future::ready(self.with(|stores| {
            for (key, response) in entries {
                stores.put(name, key, response);
            }
        }))
    }

    #[inline]
    fn requests(&self, name: &str) -> impl Future<Output = Result<Vec<CacheKey>>> + Send {
        future::ready(self.with(|stores| stores.requests(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::http::{Method, Request, ResponseKind};

    fn key(path: &str) -> CacheKey {
        Request::parse(Method::Get, &format!("http://localhost:5173{path}"))
            .unwrap()
            .key()
    }

    fn body(text: &str) -> Response {
        Response::new(200, ResponseKind::Basic, text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn open_is_idempotent() {
        let storage = MemoryCacheStorage::new();
        assert!(storage.open("v1").await.unwrap());
        assert!(!storage.open("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), ["v1"]);
    }

    #[tokio::test]
    async fn put_creates_store_and_replaces_entry() {
        let storage = MemoryCacheStorage::new();
        storage.put("v1", key("/a"), body("one")).await.unwrap();
        storage.put("v1", key("/a"), body("two")).await.unwrap();
        let hit = storage.match_request("v1", &key("/a")).await.unwrap().unwrap();
        assert_eq!(hit.body, b"two");
        assert_eq!(storage.requests("v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lookup_is_scoped_to_store() {
        let storage = MemoryCacheStorage::new();
        storage.put("v1", key("/a"), body("old")).await.unwrap();
        assert!(storage.match_request("v2", &key("/a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_store() {
        let storage = MemoryCacheStorage::new();
        _ = storage.open("v0").await.unwrap();
        assert!(storage.delete("v0").await.unwrap());
        assert!(!storage.delete("v0").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn put_all_keeps_insertion_order() {
        let storage = MemoryCacheStorage::new();
        let entries = vec![(key("/b"), body("b")), (key("/a"), body("a"))];
        storage.put_all("v1", entries).await.unwrap();
        let urls: Vec<String> = storage
            .requests("v1")
            .await
            .unwrap()
            .into_iter()
            .map(|k| k.url.path().to_owned())
            .collect();
        assert_eq!(urls, ["/b", "/a"]);
    }
}
