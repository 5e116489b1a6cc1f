//! Transaction model and input validation.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::currency;
use super::{CurrencyCode, TransactionId, TransactionKind};

/// Message shown to the user for every rejected input.
pub const VALIDATION_MESSAGE: &str = "all fields except notes are required; denomination, \
    notes count and exchange rate must be positive numbers and notes count must be a whole number";

/// Date format accepted for transaction dates.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A recorded exchange of foreign currency against the base currency.
///
/// Transactions are immutable: the effective from/to pair is derived from
/// the kind and amounts when the transaction is created and cannot be set
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Unique identifier.
    id: TransactionId,
    /// Calendar date of the exchange.
    date: NaiveDate,
    /// Buy or sell.
    #[serde(alias = "type")]
    kind: TransactionKind,
    /// Foreign currency traded.
    foreign_currency_code: CurrencyCode,
    /// Face value per note.
    denomination: f64,
    /// Number of notes.
    notes_count: u32,
    /// Base currency units per one foreign unit.
    #[serde(alias = "exchangeRateToIDR")]
    exchange_rate_to_base: f64,
    /// Currency debited.
    effective_currency_from: CurrencyCode,
    /// Amount debited.
    effective_amount_from: f64,
    /// Currency credited.
    effective_currency_to: CurrencyCode,
    /// Amount credited.
    effective_amount_to: f64,
    /// Optional free text.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    notes: Option<String>,
}

impl Transaction {
    /// Validates `input` and builds a transaction with an id from `next_id`.
    ///
    /// `next_id` is only called once every rule has passed.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    pub(crate) fn from_input<F>(
        input: &TransactionInput,
        next_id: F,
    ) -> Result<Self, ValidationError>
    where
        F: FnOnce() -> TransactionId,
    {
        let validated = input.validate()?;
        Ok(Self::from_validated(next_id(), validated))
    }

    /// Builds a transaction from validated input, deriving the effective
    /// currency movement from the kind.
    fn from_validated(id: TransactionId, input: ValidatedInput) -> Self {
        let total_foreign = input.denomination * f64::from(input.notes_count);
        let total_base = total_foreign * input.exchange_rate_to_base;
        let base = currency::base_code();
        let (from, amount_from, to, amount_to) = match input.kind {
            TransactionKind::Buy => (base, total_base, input.currency.clone(), total_foreign),
            TransactionKind::Sell => (input.currency.clone(), total_foreign, base, total_base),
        };
        Self {
            id,
            date: input.date,
            kind: input.kind,
            foreign_currency_code: input.currency,
            denomination: input.denomination,
            notes_count: input.notes_count,
            exchange_rate_to_base: input.exchange_rate_to_base,
            effective_currency_from: from,
            effective_amount_from: amount_from,
            effective_currency_to: to,
            effective_amount_to: amount_to,
            notes: input.notes,
        }
    }

    /// Unique identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> &TransactionId {
        &self.id
    }

    /// Calendar date of the exchange.
    #[inline]
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    /// Buy or sell.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Foreign currency traded.
    #[inline]
    #[must_use]
    pub const fn foreign_currency_code(&self) -> &CurrencyCode {
        &self.foreign_currency_code
    }

    /// Face value per note.
    #[inline]
    #[must_use]
    pub const fn denomination(&self) -> f64 {
        self.denomination
    }

    /// Number of notes.
    #[inline]
    #[must_use]
    pub const fn notes_count(&self) -> u32 {
        self.notes_count
    }

    /// Base currency units per one foreign unit.
    #[inline]
    #[must_use]
    pub const fn exchange_rate_to_base(&self) -> f64 {
        self.exchange_rate_to_base
    }

    /// Currency whose balance decreases.
    #[inline]
    #[must_use]
    pub const fn effective_currency_from(&self) -> &CurrencyCode {
        &self.effective_currency_from
    }

    /// Amount subtracted from [`Self::effective_currency_from`].
    #[inline]
    #[must_use]
    pub const fn effective_amount_from(&self) -> f64 {
        self.effective_amount_from
    }

    /// Currency whose balance increases.
    #[inline]
    #[must_use]
    pub const fn effective_currency_to(&self) -> &CurrencyCode {
        &self.effective_currency_to
    }

    /// Amount added to [`Self::effective_currency_to`].
    #[inline]
    #[must_use]
    pub const fn effective_amount_to(&self) -> f64 {
        self.effective_amount_to
    }

    /// Optional free text.
    #[inline]
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Total face value in the foreign currency.
    #[inline]
    #[must_use]
    pub fn total_foreign(&self) -> f64 {
        self.denomination * f64::from(self.notes_count)
    }

    /// Total value in the base currency.
    #[inline]
    #[must_use]
    pub fn total_base(&self) -> f64 {
        self.total_foreign() * self.exchange_rate_to_base
    }
}

/// Treats an empty or blank string as an absent value.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|text| !text.trim().is_empty()))
}

/// Raw, unvalidated form input for a new transaction.
///
/// Every field holds the text as typed. A blank field counts as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionInput {
    /// Date as `YYYY-MM-DD`.
    pub date: String,
    /// `buy` or `sell`.
    pub kind: String,
    /// Foreign currency code.
    pub foreign_currency_code: String,
    /// Face value per note.
    pub denomination: String,
    /// Number of notes.
    pub notes_count: String,
    /// Base units per foreign unit.
    pub exchange_rate_to_base: String,
    /// Optional free text.
    pub notes: String,
}

/// Input after every business rule has been checked.
#[derive(Debug, Clone, PartialEq)]
struct ValidatedInput {
    /// Parsed date.
    date: NaiveDate,
    /// Parsed kind.
    kind: TransactionKind,
    /// Supported foreign currency.
    currency: CurrencyCode,
    /// Positive denomination.
    denomination: f64,
    /// Positive note count.
    notes_count: u32,
    /// Positive rate.
    exchange_rate_to_base: f64,
    /// Trimmed notes, `None` when blank.
    notes: Option<String>,
}

impl TransactionInput {
    /// Checks every business rule and returns the typed values.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] naming the first offending field.
    fn validate(&self) -> Result<ValidatedInput, ValidationError> {
        let date_raw = required(&self.date, InputField::Date)?;
        let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
            .map_err(|_parse| ValidationError::with(InputField::Date, Violation::Malformed))?;

        let kind = required(&self.kind, InputField::Kind)?
            .parse::<TransactionKind>()
            .map_err(|_parse| ValidationError::with(InputField::Kind, Violation::Malformed))?;

        let code = required(&self.foreign_currency_code, InputField::Currency)?;
        if !currency::is_supported_foreign(code) {
            return Err(ValidationError::with(
                InputField::Currency,
                Violation::Unsupported,
            ));
        }

        let denomination = positive_number(&self.denomination, InputField::Denomination)?;
        let notes_count = positive_count(&self.notes_count)?;
        let exchange_rate_to_base =
            positive_number(&self.exchange_rate_to_base, InputField::ExchangeRate)?;

        let notes = Some(self.notes.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_owned);

        Ok(ValidatedInput {
            date,
            kind,
            currency: CurrencyCode::new(code),
            denomination,
            notes_count,
            exchange_rate_to_base,
            notes,
        })
    }
}

/// Returns the trimmed value, or a `Missing` error when blank.
fn required(raw: &str, field: InputField) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::with(field, Violation::Missing))
    } else {
        Ok(trimmed)
    }
}

/// Parses a finite number.
fn finite_number(raw: &str, field: InputField) -> Result<f64, ValidationError> {
    let value: f64 = required(raw, field)?
        .parse()
        .map_err(|_parse| ValidationError::with(field, Violation::NotANumber))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::with(field, Violation::NotANumber))
    }
}

/// Parses a finite, strictly positive number.
fn positive_number(raw: &str, field: InputField) -> Result<f64, ValidationError> {
    let value = finite_number(raw, field)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::with(field, Violation::NotPositive))
    }
}

/// Parses a strictly positive whole note count that fits in `u32`.
fn positive_count(raw: &str) -> Result<u32, ValidationError> {
    let field = InputField::NotesCount;
    let value = positive_number(raw, field)?;
    if value.fract().abs() > 0.0_f64 {
        return Err(ValidationError::with(field, Violation::NotInteger));
    }
    format!("{value:.0}")
        .parse::<u32>()
        .map_err(|_overflow| ValidationError::with(field, Violation::OutOfRange))
}

/// Form field a validation failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    /// Transaction date.
    Date,
    /// Buy or sell.
    Kind,
    /// Foreign currency code.
    Currency,
    /// Face value per note.
    Denomination,
    /// Number of notes.
    NotesCount,
    /// Exchange rate to the base currency.
    ExchangeRate,
}

/// Which rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Violation {
    /// The field was blank.
    Missing,
    /// The field is not a date or kind the ledger understands.
    Malformed,
    /// The currency is unknown or is the base currency.
    Unsupported,
    /// The field is not a finite number.
    NotANumber,
    /// The number is zero or negative.
    NotPositive,
    /// The note count has a fractional part.
    NotInteger,
    /// The note count is too large.
    OutOfRange,
}

/// A new transaction was rejected.
///
/// The user-facing message is the same for every failure. The offending
/// field and rule are kept for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{VALIDATION_MESSAGE}")]
pub struct ValidationError {
    /// Offending field.
    field: InputField,
    /// Rule the field broke.
    violation: Violation,
}

impl ValidationError {
    /// Creates a validation error for a field holding a malformed value.
    #[inline]
    #[must_use]
    pub const fn new(field: InputField) -> Self {
        Self::with(field, Violation::Malformed)
    }

    /// Creates a validation error for a specific rule.
    #[inline]
    #[must_use]
    pub const fn with(field: InputField, violation: Violation) -> Self {
        Self { field, violation }
    }

    /// The offending field.
    #[inline]
    #[must_use]
    pub const fn field(&self) -> InputField {
        self.field
    }

    /// The rule that was broken.
    #[inline]
    #[must_use]
    pub const fn violation(&self) -> Violation {
        self.violation
    }
}
