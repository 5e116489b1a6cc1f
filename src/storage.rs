//! Durable key-value storage and the ledger's persistence gateway.
//!
//! [`KeyValueStore`] is the seam between the ledger and a durable backend.
//! [`PersistenceGateway`] serializes the whole transaction list to a single
//! fixed key on every save and reads it back on load.

#[cfg(feature = "storage-file")]
mod file;
mod memory;

#[cfg(feature = "storage-file")]
pub use file::FileStore;
pub use memory::InMemoryStore;

use crate::error::Result;
use crate::models::Transaction;

/// Key under which the serialized transaction list is stored.
pub const STORAGE_KEY: &str = "currencyTransactions";

/// Blocking key-value backend holding text payloads.
///
/// All methods take `&self`; implementations use interior mutability
/// (e.g. `Mutex`) for thread-safe mutation.
pub trait KeyValueStore: core::fmt::Debug + Send + Sync {
    /// Returns the payload stored under `key`, or `Ok(None)` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the payload stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write, including
    /// when the payload exceeds a backend quota.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Loads and saves the full transaction list under one fixed key.
#[derive(Debug)]
pub struct PersistenceGateway<S> {
    /// Durable backend.
    store: S,
    /// Key the list is stored under.
    key: String,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    /// Creates a gateway storing under [`STORAGE_KEY`].
    #[inline]
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_key(store, STORAGE_KEY)
    }

    /// Creates a gateway storing under a custom key.
    #[inline]
    #[must_use]
    pub fn with_key<K: Into<String>>(store: S, key: K) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Reads the stored transaction list.
    ///
    /// Returns an empty list when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ForexError::Serialization`] if the stored
    /// payload cannot be parsed, or a storage error if the backend fails.
    #[inline]
    #[tracing::instrument(skip_all, fields(key = %self.key))]
    pub fn load(&self) -> Result<Vec<Transaction>> {
        let Some(payload) = self.store.get(&self.key)? else {
            tracing::debug!("no stored transactions");
            return Ok(Vec::new());
        };
        let transactions: Vec<Transaction> = serde_json::from_str(&payload)?;
        tracing::debug!(count = transactions.len(), "loaded transactions");
        Ok(transactions)
    }

    /// Serializes and stores the full transaction list, overwriting the
    /// previous payload.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the backend write fails.
    #[inline]
    #[tracing::instrument(skip_all, fields(key = %self.key))]
    pub fn save(&self, transactions: &[Transaction]) -> Result<()> {
        let payload = serde_json::to_string(transactions)?;
        self.store.set(&self.key, &payload)?;
        tracing::debug!(count = transactions.len(), bytes = payload.len(), "saved transactions");
        Ok(())
    }

    /// Returns a reference to the underlying backend.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForexError;
    use crate::ledger::Ledger;
    use crate::models::TransactionInput;

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        let rows = [("buy", "USD", "first"), ("sell", "EUR", ""), ("buy", "KRW", "")];
        for (kind, code, notes) in rows {
            let input = TransactionInput {
                date: "2024-04-01".to_owned(),
                kind: kind.to_owned(),
                foreign_currency_code: code.to_owned(),
                denomination: "12.5".to_owned(),
                notes_count: "3".to_owned(),
                exchange_rate_to_base: "15321.75".to_owned(),
                notes: notes.to_owned(),
            };
            drop(ledger.submit(&input).unwrap());
        }
        ledger
    }

    #[test]
    fn load_from_empty_store_is_empty() {
        let gateway = PersistenceGateway::new(InMemoryStore::new());
        assert!(gateway.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_roundtrips_field_for_field() {
        let gateway = PersistenceGateway::new(InMemoryStore::new());
        let ledger = sample_ledger();
        gateway.save(ledger.transactions()).unwrap();
        assert_eq!(gateway.load().unwrap(), ledger.transactions());
    }

    #[test]
    fn save_uses_fixed_key() {
        let gateway = PersistenceGateway::new(InMemoryStore::new());
        gateway.save(sample_ledger().transactions()).unwrap();
        assert!(gateway.store().get(STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_payload_is_a_serialization_error() {
        let store = InMemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let gateway = PersistenceGateway::new(store);
        let err = gateway.load().unwrap_err();
        assert!(matches!(err, ForexError::Serialization(_)));
    }

    #[test]
    fn save_overwrites_previous_payload() {
        let gateway = PersistenceGateway::new(InMemoryStore::new());
        let mut ledger = sample_ledger();
        gateway.save(ledger.transactions()).unwrap();
        let first_id = ledger.transactions().first().unwrap().id().clone();
        drop(ledger.delete(&first_id, &mut |_: &Transaction| true));
        gateway.save(ledger.transactions()).unwrap();
        assert_eq!(gateway.load().unwrap().len(), 2);
    }
}
