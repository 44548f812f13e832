//! Brazilian real (BRL) formatting and parsing
//!
//! Amounts are formatted as `R$ 1.234,56`. Parsing works on the digits
//! only, read as cents, which is how the input masks store values.

use serde::{Deserialize, Serialize};

/// Format an amount as `R$ 1.234,56`
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return "R$ 0,00".to_string();
    }

    let cents = decimal_to_cents(value);
    let negative = cents < 0;
    let cents = cents.unsigned_abs();

    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    format!(
        "{}R$ {},{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents % 100
    )
}

/// Keep only ASCII digits
pub fn strip_to_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn cents_to_decimal(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Round to the nearest cent
pub fn decimal_to_cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Parse a formatted amount back to a decimal; signs are ignored
pub fn parse_brl(value: &str) -> f64 {
    let digits = strip_to_digits(value);
    let cents = digits.parse::<i64>().unwrap_or(0);
    cents_to_decimal(cents)
}

/// State of a currency text input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyInput {
    pub formatted: String,
    pub numeric: f64,
    /// Digits typed so far, without leading zeros
    pub raw_cents: String,
}

impl CurrencyInput {
    pub fn zero() -> Self {
        Self {
            formatted: format_brl(0.0),
            numeric: 0.0,
            raw_cents: "0".to_string(),
        }
    }

    /// Re-mask whatever the user typed: "12345" reads as R$ 123,45
    pub fn from_typed(value: &str) -> Self {
        let digits = strip_to_digits(value);
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Self::zero();
        }

        let numeric = parse_brl(digits);
        Self {
            formatted: format_brl(numeric),
            numeric,
            raw_cents: digits.to_string(),
        }
    }

    /// Initial state from a stored value
    pub fn from_value(value: f64) -> Self {
        if !value.is_finite() || value == 0.0 {
            return Self::zero();
        }

        Self {
            formatted: format_brl(value),
            numeric: value,
            raw_cents: decimal_to_cents(value).to_string(),
        }
    }
}
