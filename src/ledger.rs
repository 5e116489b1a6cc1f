//! The ledger engine: an owned, newest-first transaction list.
//!
//! [`Ledger`] validates and records new transactions, deletes them after
//! confirmation, and derives balances. It performs no I/O; persistence is
//! layered on top by [`crate::tracker::CurrencyTracker`].

use chrono::Utc;

use crate::balance::{self, Balances};
use crate::models::{
    CurrencyCode, NaiveDate, Transaction, TransactionId, TransactionInput, TransactionKind,
    ValidationError,
};

/// Asks the user whether a transaction may be deleted.
///
/// Implemented for any `FnMut(&Transaction) -> bool`, so a closure can be
/// passed directly.
pub trait Confirm {
    /// Returns `true` if the deletion of `transaction` is confirmed.
    fn confirm(&mut self, transaction: &Transaction) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&Transaction) -> bool,
{
    #[inline]
    fn confirm(&mut self, transaction: &Transaction) -> bool {
        self(transaction)
    }
}

/// Result of a delete request.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// The transaction was confirmed and removed.
    Removed(Transaction),
    /// The user declined; nothing changed.
    Declined,
    /// No transaction has this id; nothing changed.
    NotFound,
}

impl DeleteOutcome {
    /// Returns `true` if a transaction was removed.
    #[inline]
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self, Self::Removed(_))
    }
}

/// Owned list of transactions, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    /// Transactions, most recently created first.
    transactions: Vec<Transaction>,
    /// Highest millisecond id issued or loaded so far.
    last_issued: i64,
}

impl Ledger {
    /// Creates an empty ledger.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger from a previously stored, newest-first list.
    #[inline]
    #[must_use]
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let last_issued = transactions
            .iter()
            .filter_map(|tx| tx.id().as_millis())
            .max()
            .unwrap_or_default();
        Self {
            transactions,
            last_issued,
        }
    }

    /// All transactions, newest first.
    #[inline]
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Consumes the ledger and returns its transactions, newest first.
    #[inline]
    #[must_use]
    pub fn into_transactions(self) -> Vec<Transaction> {
        self.transactions
    }

    /// Number of recorded transactions.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Looks up a transaction by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: &TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id() == id)
    }

    /// Validates `input` and records it at the head of the list.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if any field breaks a business rule.
    /// The ledger is left unchanged in that case.
    #[inline]
    #[tracing::instrument(skip_all)]
    pub fn submit(&mut self, input: &TransactionInput) -> Result<Transaction, ValidationError> {
        let tx = Transaction::from_input(input, || self.next_id()).inspect_err(|err| {
            tracing::debug!(field = ?err.field(), violation = ?err.violation(), "rejected input");
        })?;
        tracing::debug!(
            id = %tx.id(),
            kind = %tx.kind(),
            currency = %tx.foreign_currency_code(),
            "recorded transaction"
        );
        self.transactions.insert(0, tx.clone());
        Ok(tx)
    }

    /// Removes the transaction with `id` once `confirm` agrees.
    ///
    /// The confirmation is only requested when the id exists. Deleting an
    /// id that is already gone is a no-op returning
    /// [`DeleteOutcome::NotFound`].
    #[inline]
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub fn delete<C>(&mut self, id: &TransactionId, confirm: &mut C) -> DeleteOutcome
    where
        C: Confirm + ?Sized,
    {
        let Some(position) = self.transactions.iter().position(|tx| tx.id() == id) else {
            tracing::debug!("nothing to delete");
            return DeleteOutcome::NotFound;
        };
        let Some(candidate) = self.transactions.get(position) else {
            return DeleteOutcome::NotFound;
        };
        if !confirm.confirm(candidate) {
            tracing::debug!("deletion declined");
            return DeleteOutcome::Declined;
        }
        let removed = self.transactions.remove(position);
        tracing::debug!("deleted transaction");
        DeleteOutcome::Removed(removed)
    }

    /// Recomputes per-currency balances from every transaction.
    #[inline]
    #[must_use]
    pub fn balances(&self) -> Balances {
        balance::compute_balances(&self.transactions)
    }

    /// Transactions matching `filter`, newest first.
    #[inline]
    #[must_use]
    pub fn filter(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .collect()
    }

    /// Returns a millisecond id strictly greater than any seen so far.
    fn next_id(&mut self) -> TransactionId {
        let now = Utc::now().timestamp_millis();
        self.last_issued = now.max(self.last_issued.saturating_add(1));
        TransactionId::from_millis(self.last_issued)
    }
}

/// Composable filter over the transaction history.
///
/// All set criteria must hold for a transaction to match.
///
/// # Examples
///
/// ```
/// use forex_ledger::ledger::TransactionFilter;
/// use forex_ledger::models::{NaiveDate, TransactionKind};
///
/// let filter = TransactionFilter::new()
///     .currency("USD")
///     .kind(TransactionKind::Buy)
///     .date_range(
///         NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
///     );
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Foreign currency traded.
    pub currency: Option<CurrencyCode>,
    /// Buy or sell.
    pub kind: Option<TransactionKind>,
    /// Start date (inclusive).
    pub date_from: Option<NaiveDate>,
    /// End date (inclusive).
    pub date_to: Option<NaiveDate>,
    /// Notes substring (case-insensitive).
    pub notes: Option<String>,
}

impl TransactionFilter {
    /// Creates an empty filter that matches every transaction.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to one foreign currency.
    #[inline]
    #[must_use]
    pub fn currency(mut self, code: &str) -> Self {
        self.currency = Some(CurrencyCode::new(code));
        self
    }

    /// Restricts to buys or sells.
    #[inline]
    #[must_use]
    pub const fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to the given date range (inclusive).
    #[inline]
    #[must_use]
    pub const fn date_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.date_from = Some(from);
        self.date_to = Some(to);
        self
    }

    /// Restricts to transactions whose notes contain `text`
    /// (case-insensitive).
    #[inline]
    #[must_use]
    pub fn notes<T: Into<String>>(mut self, text: T) -> Self {
        self.notes = Some(text.into());
        self
    }

    /// Returns `true` if the transaction satisfies all set criteria.
    #[inline]
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.currency
            .as_ref()
            .is_none_or(|code| tx.foreign_currency_code() == code)
            && self.kind.is_none_or(|kind| tx.kind() == kind)
            && self.date_from.is_none_or(|from| tx.date() >= from)
            && self.date_to.is_none_or(|to| tx.date() <= to)
            && self.matches_notes(tx)
    }

    /// Checks the notes criterion.
    fn matches_notes(&self, tx: &Transaction) -> bool {
        self.notes.as_ref().is_none_or(|needle| {
            let needle_lower = needle.to_lowercase();
            tx.notes()
                .is_some_and(|text| text.to_lowercase().contains(&needle_lower))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: &str, code: &str, date: &str, notes: &str) -> TransactionInput {
        TransactionInput {
            date: date.to_owned(),
            kind: kind.to_owned(),
            foreign_currency_code: code.to_owned(),
            denomination: "100".to_owned(),
            notes_count: "2".to_owned(),
            exchange_rate_to_base: "15000".to_owned(),
            notes: notes.to_owned(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn submit_prepends_newest_first() {
        let mut ledger = Ledger::new();
        let first = ledger.submit(&input("buy", "USD", "2024-01-01", "")).unwrap();
        let second = ledger.submit(&input("sell", "USD", "2024-01-02", "")).unwrap();
        let ids: Vec<&TransactionId> = ledger.transactions().iter().map(Transaction::id).collect();
        assert_eq!(ids, [second.id(), first.id()]);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut ledger = Ledger::new();
        let mut previous = 0_i64;
        for _ in 0..50 {
            let tx = ledger.submit(&input("buy", "EUR", "2024-01-01", "")).unwrap();
            let millis = tx.id().as_millis().unwrap();
            assert!(millis > previous);
            previous = millis;
        }
    }

    #[test]
    fn ids_continue_after_loaded_transactions() {
        let mut seed = Ledger::new();
        let loaded = seed.submit(&input("buy", "EUR", "2024-01-01", "")).unwrap();
        let far_future = loaded.id().as_millis().unwrap() + 10_000_000;
        let mut raw = serde_json::to_value([loaded]).unwrap();
        raw[0]["id"] = serde_json::Value::String(far_future.to_string());
        let txs: Vec<Transaction> = serde_json::from_value(raw).unwrap();

        let mut ledger = Ledger::from_transactions(txs);
        let next = ledger.submit(&input("buy", "EUR", "2024-01-02", "")).unwrap();
        assert_eq!(next.id().as_millis(), Some(far_future + 1));
    }

    #[test]
    fn rejected_input_leaves_ledger_unchanged() {
        let mut ledger = Ledger::new();
        drop(ledger.submit(&input("buy", "USD", "2024-01-01", "")).unwrap());
        let before = ledger.clone();
        let mut bad = input("buy", "USD", "2024-01-01", "");
        bad.notes_count = "0".to_owned();
        assert!(ledger.submit(&bad).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn delete_confirmed_removes_entry() {
        let mut ledger = Ledger::new();
        let tx = ledger.submit(&input("buy", "USD", "2024-01-01", "")).unwrap();
        let outcome = ledger.delete(tx.id(), &mut |_: &Transaction| true);
        assert_eq!(outcome, DeleteOutcome::Removed(tx));
        assert!(ledger.is_empty());
    }

    #[test]
    fn delete_declined_keeps_entry() {
        let mut ledger = Ledger::new();
        let tx = ledger.submit(&input("buy", "USD", "2024-01-01", "")).unwrap();
        let outcome = ledger.delete(tx.id(), &mut |_: &Transaction| false);
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn delete_is_idempotent_and_skips_prompt_when_absent() {
        let mut ledger = Ledger::new();
        let tx = ledger.submit(&input("buy", "USD", "2024-01-01", "")).unwrap();
        let mut prompts = 0_u32;
        let mut counting = |_: &Transaction| {
            prompts += 1;
            true
        };
        assert!(ledger.delete(tx.id(), &mut counting).is_removed());
        assert_eq!(ledger.delete(tx.id(), &mut counting), DeleteOutcome::NotFound);
        assert_eq!(ledger.delete(tx.id(), &mut counting), DeleteOutcome::NotFound);
        assert_eq!(prompts, 1);
    }

    #[test]
    fn filter_combines_criteria() {
        let mut ledger = Ledger::new();
        drop(ledger.submit(&input("buy", "USD", "2024-01-10", "Trip to Tokyo")).unwrap());
        drop(ledger.submit(&input("sell", "USD", "2024-02-10", "")).unwrap());
        drop(ledger.submit(&input("buy", "JPY", "2024-03-10", "tokyo cash")).unwrap());

        let usd = TransactionFilter::new().currency("usd");
        assert_eq!(ledger.filter(&usd).len(), 2);

        let buys_in_q1 = TransactionFilter::new()
            .kind(TransactionKind::Buy)
            .date_range(date(2024, 1, 1), date(2024, 2, 29));
        assert_eq!(ledger.filter(&buys_in_q1).len(), 1);

        let tokyo = TransactionFilter::new().notes("TOKYO");
        let matched: Vec<&str> = ledger
            .filter(&tokyo)
            .iter()
            .map(|tx| tx.foreign_currency_code().as_inner())
            .collect();
        assert_eq!(matched, ["JPY", "USD"]);
    }

    #[test]
    fn empty_filter_matches_everything() {
        let mut ledger = Ledger::new();
        drop(ledger.submit(&input("buy", "USD", "2024-01-10", "")).unwrap());
        drop(ledger.submit(&input("sell", "EUR", "2024-01-11", "")).unwrap());
        assert_eq!(ledger.filter(&TransactionFilter::new()).len(), 2);
    }
}
