//! Newtype wrappers for identifiers and codes.
//!
//! These keep transaction ids and currency codes from being mixed up with
//! arbitrary strings at compile time.

use serde::{Deserialize, Serialize};

/// Macro to define a newtype wrapping a `String` inner value.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident $({ $($extra:tt)* })?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Returns a reference to the inner string.
            #[inline]
            #[must_use]
            pub fn as_inner(&self) -> &str {
                &self.0
            }

            /// Consumes the wrapper and returns the inner string.
            #[inline]
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            $($($extra)*)?
        }

        impl core::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id! {
    /// Unique identifier of a ledger transaction.
    ///
    /// Ids issued by this crate are the creation time in Unix milliseconds,
    /// rendered as a decimal string. Ids loaded from storage are kept
    /// verbatim.
    TransactionId {
        /// Creates an identifier from the given string.
        #[inline]
        #[must_use]
        pub const fn new(value: String) -> Self {
            Self(value)
        }

        /// Creates an identifier from a Unix timestamp in milliseconds.
        #[inline]
        #[must_use]
        pub fn from_millis(millis: i64) -> Self {
            Self(millis.to_string())
        }

        /// Returns the millisecond timestamp this id encodes, if it is numeric.
        #[inline]
        #[must_use]
        pub fn as_millis(&self) -> Option<i64> {
            self.0.parse().ok()
        }
    }
}

define_string_id! {
    /// ISO 4217 currency code, always stored upper-case.
    CurrencyCode {
        /// Creates a currency code, trimming whitespace and upper-casing it.
        #[inline]
        #[must_use]
        pub fn new(value: &str) -> Self {
            Self(value.trim().to_ascii_uppercase())
        }
    }
}

impl From<String> for TransactionId {
    #[inline]
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TransactionId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<&str> for CurrencyCode {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
