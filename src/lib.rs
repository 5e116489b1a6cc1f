//! Personal foreign-currency ledger.
//!
//! Records buy/sell transactions of foreign banknotes against the Indonesian
//! rupiah, derives per-currency running balances, and persists everything to
//! a local key-value store. A separate offline cache serves the app's static
//! assets cache-first.
//!
//! # Overview
//!
//! - [`ledger::Ledger`] validates input, records transactions newest-first,
//!   and deletes them after confirmation.
//! - [`balance::compute_balances`] folds transactions into a
//!   [`balance::Balances`] map.
//! - [`storage::PersistenceGateway`] saves and loads the list through a
//!   [`storage::KeyValueStore`].
//! - [`tracker::CurrencyTracker`] ties the ledger to its storage.
//! - [`cache::OfflineCache`] installs, activates, and answers resource
//!   fetches.

extern crate alloc;

pub mod balance;
pub mod cache;
pub mod error;
pub mod format;
pub mod ledger;
pub mod models;
pub mod storage;
pub mod tracker;
