//! # Unit Conversion
//!
//! Amounts are stored as `u128` base units. People type decimals. This
//! module converts between the two without ever going through floating
//! point: `"1.5"` with 18 decimals is exactly `1_500_000_000_000_000_000`.

use thiserror::Error;

/// Errors that can occur while parsing a decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    /// The input was empty or only a decimal point.
    #[error("empty amount")]
    Empty,

    /// The input contains something other than digits and one `.`.
    #[error("invalid amount: {0}")]
    Invalid(String),

    /// More fractional digits than the unit supports.
    #[error("too many decimal places: {got} (max {max})")]
    TooPrecise {
        /// Fractional digits supplied.
        got: usize,
        /// Decimals of the unit.
        max: u8,
    },

    /// The scaled value does not fit in `u128`.
    #[error("amount overflows u128: {0}")]
    Overflow(String),
}

/// Parse a decimal string into base units with `decimals` places.
///
/// ```
/// use shard_protocol::units::parse_units;
///
/// assert_eq!(parse_units("100", 18).unwrap(), 100 * 10u128.pow(18));
/// assert_eq!(parse_units("0.5", 2).unwrap(), 50);
/// ```
pub fn parse_units(input: &str, decimals: u8) -> Result<u128, UnitsError> {
    let trimmed = input.trim().replace('_', "");
    if trimmed.is_empty() || trimmed == "." {
        return Err(UnitsError::Empty);
    }

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed.as_str(), ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(whole) || !all_digits(fraction) {
        return Err(UnitsError::Invalid(input.to_string()));
    }

    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            got: fraction.len(),
            max: decimals,
        });
    }

    let overflow = || UnitsError::Overflow(input.to_string());
    let scale = 10u128.checked_pow(decimals as u32).ok_or_else(overflow)?;

    let whole_value: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| overflow())?
    };

    let fraction_value: u128 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse().map_err(|_| overflow())?
    };

    whole_value
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_value))
        .ok_or_else(overflow)
}

/// Render base units as a decimal string, trimming trailing zeros.
///
/// ```
/// use shard_protocol::units::format_units;
///
/// assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
/// assert_eq!(format_units(10, 0), "10");
/// ```
pub fn format_units(amount: u128, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let scale = match 10u128.checked_pow(decimals as u32) {
        Some(s) => s,
        None => return amount.to_string(),
    };
    let whole = amount / scale;
    let fraction = amount % scale;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}
