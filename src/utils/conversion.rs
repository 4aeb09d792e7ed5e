//! Type conversion and formatting utilities.
//!
//! Conversions between chain-native values (U256, unix seconds) and the
//! representations used in logs and persisted rows.

use alloy::primitives::{
    utils::{format_units, parse_units, ParseUnits},
    U256,
};
use chrono::{DateTime, SecondsFormat, Utc};

// ============================================
// Amount Conversions
// ============================================

/// Scale a human-readable token amount to the token's smallest unit.
///
/// # Arguments
/// * `amount` - Decimal string such as `"1"` or `"0.25"`
/// * `decimals` - The token's decimal count
///
/// # Returns
/// * The raw amount, or a reason if the string is not a non-negative decimal
///   or carries more fractional digits than `decimals` can represent
///
/// # Example
/// ```ignore
/// let raw = scale_amount("1", 8)?; // 100_000_000
/// ```
pub fn scale_amount(amount: &str, decimals: u8) -> Result<U256, String> {
    let amount = amount.trim();
    // parse_units truncates excess fractional digits
    if let Some((_, fraction)) = amount.split_once('.') {
        if fraction.len() > decimals as usize {
            return Err(format!("{amount} has more than {decimals} decimal places"));
        }
    }

    match parse_units(amount, decimals).map_err(|e| e.to_string())? {
        ParseUnits::U256(value) => Ok(value),
        ParseUnits::I256(_) => Err(format!("amount {amount} is negative")),
    }
}

/// Render a raw token amount with its decimals applied, for logging.
/// Falls back to the raw integer if the decimal count is out of range.
pub fn format_amount(value: U256, decimals: u8) -> String {
    format_units(value, decimals).unwrap_or_else(|_| value.to_string())
}

// ============================================
// Time Conversions
// ============================================

/// Convert a block header timestamp (unix seconds) to UTC.
/// Returns None if the value is outside chrono's representable range.
pub fn timestamp_from_unix(seconds: u64) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(seconds).ok()?;
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso8601(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}
