//! Data models for the forex ledger.
//!
//! This module contains the transaction record, the raw form input it is
//! validated from, newtype identifiers, and the supported currency list.

pub mod currency;
mod enums;
mod ids;
mod transaction;

pub use chrono::NaiveDate;
pub use currency::{BASE_CURRENCY, CURRENCIES, Currency};
pub use enums::{ParseKindError, TransactionKind};
pub use ids::{CurrencyCode, TransactionId};
pub use transaction::{
    InputField, Transaction, TransactionInput, VALIDATION_MESSAGE, ValidationError, Violation,
};
