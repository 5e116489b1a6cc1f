//! Enumeration types for constrained ledger values.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Direction of a currency exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    /// Acquire foreign currency, paying with the base currency.
    #[serde(alias = "Beli")]
    Buy,
    /// Dispose of foreign currency, receiving the base currency.
    #[serde(alias = "Jual")]
    Sell,
}

impl TransactionKind {
    /// Returns the lower-case label used in storage and on the command line.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    #[inline]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`TransactionKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown transaction kind: {0}")]
pub struct ParseKindError(String);

impl FromStr for TransactionKind {
    type Err = ParseKindError;

    /// Accepts `buy`/`sell` and the legacy `beli`/`jual`, in any case.
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" | "beli" => Ok(Self::Buy),
            "sell" | "jual" => Ok(Self::Sell),
            _ => Err(ParseKindError(s.to_owned())),
        }
    }
}
