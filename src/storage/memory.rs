//! In-memory key-value backend.
//!
//! Provides [`InMemoryStore`], a thread-safe map of payloads with an
//! optional byte quota. Useful for tests and for running the ledger without
//! touching the file system.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ForexError, Result, lock_poison_error};

/// Thread-safe in-memory key-value store.
///
/// # Example
///
/// ```rust
/// use forex_ledger::storage::{InMemoryStore, KeyValueStore};
///
/// let store = InMemoryStore::with_quota(1024);
/// store.set("greeting", "hello").unwrap();
/// assert_eq!(store.get("greeting").unwrap().as_deref(), Some("hello"));
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Payloads keyed by name.
    entries: Mutex<HashMap<String, String>>,
    /// Maximum size of a single payload in bytes, if limited.
    quota: Option<usize>,
}

impl InMemoryStore {
    /// Creates an empty, unlimited store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store rejecting payloads larger than `quota` bytes.
    #[inline]
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(quota),
        }
    }
}

impl super::KeyValueStore for InMemoryStore {
    #[inline]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|err| lock_poison_error(&err))?;
        Ok(entries.get(key).cloned())
    }

    #[inline]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        if let Some(quota) = self.quota
            && value.len() > quota
        {
            return Err(ForexError::QuotaExceeded {
                needed: value.len(),
                quota,
            });
        }
        let _previous = self
            .entries
            .lock()
            .map_err(|err| lock_poison_error(&err))?
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
