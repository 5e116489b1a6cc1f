//! Ledger with integrated persistence.
//!
//! Combines a [`Ledger`] with a [`PersistenceGateway`]: the list is loaded
//! when the tracker opens and saved after every mutation. Storage failures
//! never abort an operation; they are logged and surfaced as a [`Notice`].

use core::fmt;

use crate::balance::Balances;
use crate::ledger::{Confirm, DeleteOutcome, Ledger, TransactionFilter};
use crate::models::{Transaction, TransactionId, TransactionInput, ValidationError};
use crate::storage::{KeyValueStore, PersistenceGateway};

/// Persistence problem the user should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The stored list could not be read; the tracker started empty.
    LoadFailed,
    /// The latest change could not be written to storage.
    SaveFailed,
}

impl fmt::Display for Notice {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match *self {
            Self::LoadFailed => "Could not load saved transactions.",
            Self::SaveFailed => "Could not save transactions. Data may be lost.",
        })
    }
}

/// Transaction ledger backed by a durable key-value store.
///
/// # Example
///
/// ```rust
/// use forex_ledger::models::TransactionInput;
/// use forex_ledger::storage::InMemoryStore;
/// use forex_ledger::tracker::CurrencyTracker;
///
/// let mut tracker = CurrencyTracker::open(InMemoryStore::new());
/// let input = TransactionInput {
///     date: "2024-05-20".to_owned(),
///     kind: "buy".to_owned(),
///     foreign_currency_code: "USD".to_owned(),
///     denomination: "100".to_owned(),
///     notes_count: "5".to_owned(),
///     exchange_rate_to_base: "15000".to_owned(),
///     notes: String::new(),
/// };
/// let tx = tracker.submit(&input).unwrap();
/// assert_eq!(tx.effective_amount_from(), 7_500_000.0);
/// assert!(tracker.notice().is_none());
/// ```
#[derive(Debug)]
pub struct CurrencyTracker<S> {
    /// In-memory ledger.
    ledger: Ledger,
    /// Durable storage for the ledger.
    gateway: PersistenceGateway<S>,
    /// Pending persistence notice, if any.
    notice: Option<Notice>,
}

impl<S: KeyValueStore> CurrencyTracker<S> {
    /// Opens a tracker over `store`, loading any stored transactions.
    ///
    /// A corrupt or unreadable payload is logged, raises
    /// [`Notice::LoadFailed`], and leaves the tracker empty.
    #[inline]
    #[must_use]
    pub fn open(store: S) -> Self {
        Self::with_gateway(PersistenceGateway::new(store))
    }

    /// Opens a tracker over an already configured gateway.
    #[inline]
    #[must_use]
    #[tracing::instrument(skip_all)]
    pub fn with_gateway(gateway: PersistenceGateway<S>) -> Self {
        let (ledger, notice) = match gateway.load() {
            Ok(transactions) => (Ledger::from_transactions(transactions), None),
            Err(err) => {
                tracing::warn!(error = %err, "could not load saved transactions");
                (Ledger::new(), Some(Notice::LoadFailed))
            }
        };
        Self {
            ledger,
            gateway,
            notice,
        }
    }

    /// Validates and records a transaction, then saves the full list.
    ///
    /// Any previous notice is cleared first. A failed save keeps the
    /// transaction in memory and raises [`Notice::SaveFailed`].
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the input is rejected; nothing is
    /// recorded or saved in that case.
    #[inline]
    pub fn submit(&mut self, input: &TransactionInput) -> Result<Transaction, ValidationError> {
        self.notice = None;
        let tx = self.ledger.submit(input)?;
        self.persist();
        Ok(tx)
    }

    /// Deletes the transaction with `id` after confirmation and saves the
    /// list if something was removed.
    #[inline]
    pub fn delete<C>(&mut self, id: &TransactionId, confirm: &mut C) -> DeleteOutcome
    where
        C: Confirm + ?Sized,
    {
        let outcome = self.ledger.delete(id, confirm);
        if outcome.is_removed() {
            self.persist();
        }
        outcome
    }

    /// All transactions, newest first.
    #[inline]
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        self.ledger.transactions()
    }

    /// Transactions matching `filter`, newest first.
    #[inline]
    #[must_use]
    pub fn filter(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        self.ledger.filter(filter)
    }

    /// Current per-currency balances.
    #[inline]
    #[must_use]
    pub fn balances(&self) -> Balances {
        self.ledger.balances()
    }

    /// Pending persistence notice, if any.
    #[inline]
    #[must_use]
    pub const fn notice(&self) -> Option<Notice> {
        self.notice
    }

    /// The in-memory ledger.
    #[inline]
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The underlying storage backend.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &S {
        self.gateway.store()
    }

    /// Saves the ledger, recording a notice on failure.
    fn persist(&mut self) {
        if let Err(err) = self.gateway.save(self.ledger.transactions()) {
            tracing::warn!(error = %err, "could not save transactions");
            self.notice = Some(Notice::SaveFailed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStore, STORAGE_KEY};

    fn input(
        kind: &str,
        code: &str,
        denomination: &str,
        count: &str,
        rate: &str,
    ) -> TransactionInput {
        TransactionInput {
            date: "2024-05-20".to_owned(),
            kind: kind.to_owned(),
            foreign_currency_code: code.to_owned(),
            denomination: denomination.to_owned(),
            notes_count: count.to_owned(),
            exchange_rate_to_base: rate.to_owned(),
            notes: String::new(),
        }
    }

    #[test]
    fn corrupt_payload_starts_empty_with_notice() {
        let store = InMemoryStore::new();
        store.set(STORAGE_KEY, "not json at all").unwrap();
        let tracker = CurrencyTracker::open(store);
        assert!(tracker.transactions().is_empty());
        assert_eq!(tracker.notice(), Some(Notice::LoadFailed));
    }

    #[test]
    fn missing_payload_starts_empty_without_notice() {
        let tracker = CurrencyTracker::open(InMemoryStore::new());
        assert!(tracker.transactions().is_empty());
        assert!(tracker.notice().is_none());
    }

    #[test]
    fn submit_clears_previous_notice() {
        let store = InMemoryStore::new();
        store.set(STORAGE_KEY, "{").unwrap();
        let mut tracker = CurrencyTracker::open(store);
        assert_eq!(tracker.notice(), Some(Notice::LoadFailed));
        drop(tracker.submit(&input("buy", "USD", "100", "1", "15000")).unwrap());
        assert!(tracker.notice().is_none());
    }

    #[test]
    fn quota_failure_keeps_memory_and_raises_notice() {
        let mut tracker = CurrencyTracker::open(InMemoryStore::with_quota(16));
        let tx = tracker.submit(&input("buy", "USD", "100", "5", "15000")).unwrap();
        assert_eq!(tracker.notice(), Some(Notice::SaveFailed));
        assert_eq!(tracker.transactions(), [tx]);
        assert!(tracker.store().get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn rejected_submit_saves_nothing() {
        let mut tracker = CurrencyTracker::open(InMemoryStore::new());
        assert!(tracker.submit(&input("buy", "USD", "0", "5", "15000")).is_err());
        assert!(tracker.store().get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn mutations_persist_across_reopen() {
        let mut tracker = CurrencyTracker::open(InMemoryStore::new());
        let kept = tracker.submit(&input("buy", "USD", "100", "5", "15000")).unwrap();
        let dropped = tracker.submit(&input("sell", "USD", "100", "2", "16000")).unwrap();
        assert!(tracker.delete(dropped.id(), &mut |_: &Transaction| true).is_removed());

        let payload = tracker.store().get(STORAGE_KEY).unwrap().unwrap();
        let reopened_store = InMemoryStore::new();
        reopened_store.set(STORAGE_KEY, &payload).unwrap();
        let reopened = CurrencyTracker::open(reopened_store);
        assert_eq!(reopened.transactions(), [kept]);
        assert_eq!(reopened.balances().get("USD"), 500.0);
    }

    #[test]
    fn declined_delete_does_not_save() {
        let mut tracker = CurrencyTracker::open(InMemoryStore::new());
        let tx = tracker.submit(&input("buy", "JPY", "1000", "3", "105")).unwrap();
        let before = tracker.store().get(STORAGE_KEY).unwrap();
        let outcome = tracker.delete(tx.id(), &mut |_: &Transaction| false);
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(tracker.store().get(STORAGE_KEY).unwrap(), before);
        assert_eq!(tracker.ledger().len(), 1);
    }

    #[test]
    fn notice_messages() {
        assert_eq!(Notice::LoadFailed.to_string(), "Could not load saved transactions.");
        assert_eq!(
            Notice::SaveFailed.to_string(),
            "Could not save transactions. Data may be lost."
        );
    }
}
