//! Locale-aware amount formatting.
//!
//! Amounts are rendered with grouped thousands and between `min` and `max`
//! fraction digits. When localized rendering is impossible (non-finite
//! value, `min > max`, or more digits than supported) the value falls back
//! to a fixed `max`-decimal rendering.

/// Largest number of fraction digits localized rendering supports.
const MAX_FRACTION_DIGITS: usize = 20;

/// Largest precision the fixed fallback renders.
const MAX_FALLBACK_DIGITS: usize = 100;

/// Fraction digits needed to print any finite `f64` exactly.
const EXACT_FRACTION_DIGITS: usize = 1074;

/// Separator conventions for rendering numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLocale {
    /// `id-ID`: `1.234.567,89`.
    #[default]
    Indonesian,
    /// `en-US`: `1,234,567.89`.
    English,
}

impl NumberLocale {
    /// Returns the (thousands, decimal) separators.
    const fn separators(self) -> (char, char) {
        match self {
            Self::Indonesian => ('.', ','),
            Self::English => (',', '.'),
        }
    }
}

/// Formats `value` in the default (Indonesian) locale.
#[inline]
#[must_use]
pub fn format_amount(value: f64, min_decimals: usize, max_decimals: usize) -> String {
    format_amount_in(NumberLocale::default(), value, min_decimals, max_decimals)
}

/// Formats `value` in `locale`, falling back to fixed decimals when
/// localized rendering fails.
#[inline]
#[must_use]
pub fn format_amount_in(
    locale: NumberLocale,
    value: f64,
    min_decimals: usize,
    max_decimals: usize,
) -> String {
    localized(locale, value, min_decimals, max_decimals).unwrap_or_else(|| {
        let precision = max_decimals.min(MAX_FALLBACK_DIGITS);
        format!("{value:.precision$}")
    })
}

/// Formats a raw textual amount; non-numeric text is returned unchanged.
#[inline]
#[must_use]
pub fn format_amount_str(raw: &str, min_decimals: usize, max_decimals: usize) -> String {
    raw.trim().parse::<f64>().map_or_else(
        |_not_numeric| raw.to_owned(),
        |value| format_amount(value, min_decimals, max_decimals),
    )
}

/// Renders with grouped thousands, or `None` when the request cannot be
/// honoured.
fn localized(locale: NumberLocale, value: f64, min: usize, max: usize) -> Option<String> {
    if !value.is_finite() || min > max || max > MAX_FRACTION_DIGITS {
        return None;
    }
    let (group_sep, decimal_sep) = locale.separators();
    let (integer, rounded) = round_half_away(value, max);
    let keep = rounded.trim_end_matches('0').len().max(min);
    let fraction = rounded.get(..keep).unwrap_or(rounded.as_str());

    let is_zero = integer.bytes().all(|b| b == b'0') && fraction.bytes().all(|b| b == b'0');
    let mut out = String::with_capacity(integer.len() * 2 + fraction.len() + 2);
    if value.is_sign_negative() && !is_zero {
        out.push('-');
    }
    let digits = integer.len();
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (digits - index) % 3 == 0 {
            out.push(group_sep);
        }
        out.push(digit);
    }
    if !fraction.is_empty() {
        out.push(decimal_sep);
        out.push_str(fraction);
    }
    Some(out)
}

/// Rounds `|value|` to `places` fraction digits, ties away from zero.
///
/// Works on the exact decimal expansion, so `0.125` is a tie while `1.005`
/// (stored as `1.00499...`) is not. Returns the integer and fraction digits.
fn round_half_away(value: f64, places: usize) -> (String, String) {
    let exact = format!("{:.EXACT_FRACTION_DIGITS$}", value.abs());
    let (integer, fraction) = exact.split_once('.').unwrap_or((&exact, ""));
    let round_up = fraction
        .as_bytes()
        .get(places)
        .is_some_and(|&digit| digit >= b'5');

    let mut digits: Vec<u8> = integer
        .bytes()
        .chain(fraction.bytes().take(places))
        .collect();
    if round_up {
        increment(&mut digits);
    }
    let fraction_digits = digits.split_off(digits.len().saturating_sub(places));
    (to_string(&digits), to_string(&fraction_digits))
}

/// Adds one to a big-endian ASCII digit string.
fn increment(digits: &mut Vec<u8>) {
    for digit in digits.iter_mut().rev() {
        if *digit == b'9' {
            *digit = b'0';
        } else {
            *digit += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

/// Collects ASCII digits into a string.
fn to_string(digits: &[u8]) -> String {
    digits.iter().map(|&digit| char::from(digit)).collect()
}
