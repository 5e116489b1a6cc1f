//! Per-currency balance derivation.

use alloc::collections::BTreeMap;

use crate::models::{BASE_CURRENCY, CURRENCIES, CurrencyCode, Transaction};

/// Balances at or below this value are treated as zero when deciding which
/// foreign currencies are available.
pub const AVAILABLE_EPSILON: f64 = 0.001;

/// Signed running totals per currency, derived from a transaction list.
///
/// Every known currency is present (zero if never used). Currencies that
/// only appear in transactions are included as well.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Balances {
    /// Totals keyed by currency code.
    totals: BTreeMap<CurrencyCode, f64>,
}

impl Balances {
    /// Balance of `code`, or zero when it never appeared.
    #[inline]
    #[must_use]
    pub fn get(&self, code: &str) -> f64 {
        self.totals
            .get(&CurrencyCode::new(code))
            .copied()
            .unwrap_or_default()
    }

    /// Iterates over every currency and its balance, ordered by code.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&CurrencyCode, f64)> {
        self.totals.iter().map(|(code, total)| (code, *total))
    }

    /// Number of currencies tracked.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    /// Returns `true` when no currency is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Foreign currencies holding more than [`AVAILABLE_EPSILON`], ordered
    /// by code.
    #[inline]
    #[must_use]
    pub fn available_foreign(&self) -> Vec<(&CurrencyCode, f64)> {
        self.iter()
            .filter(|&(code, total)| code.as_inner() != BASE_CURRENCY && total > AVAILABLE_EPSILON)
            .collect()
    }

    /// Adds `delta` to the balance of `code`.
    fn apply(&mut self, code: &CurrencyCode, delta: f64) {
        *self.totals.entry(code.clone()).or_insert(0.0_f64) += delta;
    }
}

/// Folds every transaction into per-currency balances.
///
/// Each transaction subtracts its effective "from" amount and adds its
/// effective "to" amount. Balances are recomputed from scratch on every call.
#[must_use]
pub fn compute_balances(transactions: &[Transaction]) -> Balances {
    let mut balances = Balances {
        totals: CURRENCIES
            .iter()
            .map(|currency| (CurrencyCode::new(currency.code), 0.0_f64))
            .collect(),
    };
    for tx in transactions {
        balances.apply(tx.effective_currency_from(), -tx.effective_amount_from());
        balances.apply(tx.effective_currency_to(), tx.effective_amount_to());
    }
    balances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::models::TransactionInput;

    fn input(
        kind: &str,
        code: &str,
        denomination: &str,
        count: &str,
        rate: &str,
    ) -> TransactionInput {
        TransactionInput {
            date: "2024-06-01".to_owned(),
            kind: kind.to_owned(),
            foreign_currency_code: code.to_owned(),
            denomination: denomination.to_owned(),
            notes_count: count.to_owned(),
            exchange_rate_to_base: rate.to_owned(),
            notes: String::new(),
        }
    }

    fn ledger_with(inputs: &[TransactionInput]) -> Ledger {
        let mut ledger = Ledger::new();
        for raw in inputs {
            drop(ledger.submit(raw).unwrap());
        }
        ledger
    }

    #[test]
    fn empty_ledger_has_every_known_currency_at_zero() {
        let balances = compute_balances(&[]);
        assert_eq!(balances.len(), CURRENCIES.len());
        assert!(balances.iter().all(|(_, total)| total.abs() < f64::EPSILON));
        assert!(balances.available_foreign().is_empty());
    }

    #[test]
    fn buy_scenario_moves_usd_and_idr() {
        let ledger = ledger_with(&[input("buy", "USD", "100", "5", "15000")]);
        let balances = compute_balances(ledger.transactions());
        assert!((balances.get("USD") - 500.0).abs() < f64::EPSILON);
        assert!((balances.get("IDR") + 7_500_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_scenario_moves_eur_and_idr() {
        let ledger = ledger_with(&[input("sell", "EUR", "50", "10", "16000")]);
        let balances = compute_balances(ledger.transactions());
        assert!((balances.get("EUR") + 500.0).abs() < f64::EPSILON);
        assert!((balances.get("IDR") - 8_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn fold_is_order_independent() {
        let ledger = ledger_with(&[
            input("buy", "USD", "100", "5", "15000"),
            input("sell", "USD", "20", "3", "15500"),
            input("buy", "JPY", "1000", "4", "105"),
            input("sell", "EUR", "50", "2", "16000"),
        ]);
        let forward = compute_balances(ledger.transactions());
        let mut reversed = ledger.transactions().to_vec();
        reversed.reverse();
        assert_eq!(compute_balances(&reversed), forward);
    }

    #[test]
    fn deleting_equals_never_adding() {
        let mut ledger = ledger_with(&[
            input("buy", "USD", "100", "5", "15000"),
            input("buy", "SGD", "10", "8", "11500"),
        ]);
        let expected = compute_balances(ledger.transactions());
        let extra = ledger.submit(&input("sell", "USD", "50", "2", "15200")).unwrap();
        let outcome = ledger.delete(extra.id(), &mut |_: &Transaction| true);
        assert!(outcome.is_removed());
        assert_eq!(compute_balances(ledger.transactions()), expected);
    }

    #[test]
    fn available_foreign_filters_base_and_dust() {
        let ledger = ledger_with(&[
            input("buy", "USD", "100", "1", "15000"),
            input("sell", "USD", "99.9995", "1", "15000"),
            input("buy", "THB", "20", "2", "450"),
            input("sell", "EUR", "5", "1", "16000"),
        ]);
        let balances = compute_balances(ledger.transactions());
        let available: Vec<&str> = balances
            .available_foreign()
            .into_iter()
            .map(|(code, _)| code.as_inner())
            .collect();
        assert_eq!(available, ["THB"]);
    }

    #[test]
    fn unknown_currencies_are_added_dynamically() {
        let json = r#"[{
            "id": "1", "date": "2024-01-01", "kind": "buy",
            "foreignCurrencyCode": "ZAR", "denomination": 100, "notesCount": 2,
            "exchangeRateToBase": 850,
            "effectiveCurrencyFrom": "IDR", "effectiveAmountFrom": 170000,
            "effectiveCurrencyTo": "ZAR", "effectiveAmountTo": 200
        }]"#;
        let txs: Vec<Transaction> = serde_json::from_str(json).unwrap();
        let balances = compute_balances(&txs);
        assert_eq!(balances.len(), CURRENCIES.len() + 1);
        assert!((balances.get("ZAR") - 200.0).abs() < f64::EPSILON);
        assert_eq!(balances.available_foreign().len(), 1);
    }
}
