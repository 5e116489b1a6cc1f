//! Supported currencies.

use super::CurrencyCode;

/// Code of the base (home) currency every foreign amount is valued in.
pub const BASE_CURRENCY: &str = "IDR";

/// A supported currency with its display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Currency {
    /// ISO 4217 code.
    pub code: &'static str,
    /// Human-readable name.
    pub name: &'static str,
}

impl Currency {
    /// Returns `true` for the base currency.
    #[inline]
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.code == BASE_CURRENCY
    }
}

/// All currencies known to the ledger, base currency first.
pub const CURRENCIES: &[Currency] = &[
    Currency {
        code: "IDR",
        name: "Indonesian Rupiah",
    },
    Currency {
        code: "USD",
        name: "US Dollar",
    },
    Currency {
        code: "EUR",
        name: "Euro",
    },
    Currency {
        code: "JPY",
        name: "Japanese Yen",
    },
    Currency {
        code: "GBP",
        name: "British Pound",
    },
    Currency {
        code: "SGD",
        name: "Singapore Dollar",
    },
    Currency {
        code: "AUD",
        name: "Australian Dollar",
    },
    Currency {
        code: "MYR",
        name: "Malaysian Ringgit",
    },
    Currency {
        code: "CNY",
        name: "Chinese Yuan",
    },
    Currency {
        code: "KRW",
        name: "South Korean Won",
    },
    Currency {
        code: "THB",
        name: "Thai Baht",
    },
    Currency {
        code: "HKD",
        name: "Hong Kong Dollar",
    },
    Currency {
        code: "CAD",
        name: "Canadian Dollar",
    },
    Currency {
        code: "CHF",
        name: "Swiss Franc",
    },
    Currency {
        code: "NZD",
        name: "New Zealand Dollar",
    },
    Currency {
        code: "SAR",
        name: "Saudi Riyal",
    },
    Currency {
        code: "AED",
        name: "UAE Dirham",
    },
    Currency {
        code: "PHP",
        name: "Philippine Peso",
    },
    Currency {
        code: "VND",
        name: "Vietnamese Dong",
    },
    Currency {
        code: "INR",
        name: "Indian Rupee",
    },
    Currency {
        code: "TWD",
        name: "New Taiwan Dollar",
    },
    Currency {
        code: "TRY",
        name: "Turkish Lira",
    },
    Currency {
        code: "BND",
        name: "Brunei Dollar",
    },
];

/// Returns the base currency code as a [`CurrencyCode`].
#[inline]
#[must_use]
pub fn base_code() -> CurrencyCode {
    CurrencyCode::new(BASE_CURRENCY)
}

/// Looks up a supported currency by code (case-insensitive).
#[inline]
#[must_use]
pub fn find(code: &str) -> Option<&'static Currency> {
    let wanted = code.trim();
    CURRENCIES
        .iter()
        .find(|currency| currency.code.eq_ignore_ascii_case(wanted))
}

/// Iterates over every supported currency except the base one.
#[inline]
pub fn foreign_currencies() -> impl Iterator<Item = &'static Currency> {
    CURRENCIES.iter().filter(|currency| !currency.is_base())
}

/// Returns `true` if `code` names a supported non-base currency.
#[inline]
#[must_use]
pub fn is_supported_foreign(code: &str) -> bool {
    find(code).is_some_and(|currency| !currency.is_base())
}

/// Formats a code as `"Name (CODE)"`, or the bare code when unknown.
#[inline]
#[must_use]
pub fn display_name(code: &str) -> String {
    find(code).map_or_else(
        || code.to_owned(),
        |currency| format!("{} ({})", currency.name, currency.code),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_starts_with_base_currency() {
        assert_eq!(CURRENCIES.first().map(|c| c.code), Some(BASE_CURRENCY));
        assert_eq!(CURRENCIES.len(), 23);
    }

    #[test]
    fn foreign_currencies_exclude_base() {
        assert!(foreign_currencies().all(|c| c.code != BASE_CURRENCY));
        assert_eq!(foreign_currencies().count(), 22);
    }

    #[test]
    fn find_is_case_insensitive() {
        let usd = find("usd").unwrap();
        assert_eq!(usd.code, "USD");
        assert!(find("XXX").is_none());
    }

    #[test]
    fn supported_foreign_rejects_base_and_unknown() {
        assert!(is_supported_foreign("EUR"));
        assert!(is_supported_foreign("bnd"));
        assert!(!is_supported_foreign("IDR"));
        assert!(!is_supported_foreign("ZAR"));
    }

    #[test]
    fn display_name_formats_known_and_unknown() {
        assert_eq!(display_name("JPY"), "Japanese Yen (JPY)");
        assert_eq!(display_name("ZAR"), "ZAR");
    }
}
