//! Exact conversion between decimal native-unit amounts and smallest units.
//!
//! Amounts never pass through floating point. Text is split at the decimal
//! point and both halves are parsed as integers.

use alloy::primitives::U256;
use thiserror::Error;

/// Decimal exponent of ether.
pub const ETHER_DECIMALS: u8 = 18;

/// Reasons a decimal amount cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount '{0}' is not a plain decimal number")]
    Invalid(String),

    #[error("amount '{amount}' has {digits} fractional digits, at most {max} are representable")]
    PrecisionLoss { amount: String, digits: usize, max: u8 },

    #[error("amount '{0}' must be greater than zero")]
    NotPositive(String),
}

/// Convert decimal text such as `"0.01"` to an integer count of smallest units.
///
/// Accepts `digits[.digits]` with an optional leading `+`; at least one digit
/// must be present. Zero and negative amounts are refused, as are amounts
/// with more fractional digits than `decimals` (even trailing zeros).
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = amount.trim();

    if let Some(magnitude) = trimmed.strip_prefix('-') {
        // Still reject garbage like "-abc" as invalid rather than negative.
        parse_magnitude(magnitude, decimals, trimmed)?;
        return Err(AmountError::NotPositive(trimmed.to_string()));
    }

    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let value = parse_magnitude(unsigned, decimals, trimmed)?;
    if value.is_zero() {
        return Err(AmountError::NotPositive(trimmed.to_string()));
    }
    Ok(value)
}

fn parse_magnitude(text: &str, decimals: u8, original: &str) -> Result<U256, AmountError> {
    let invalid = || AmountError::Invalid(original.to_string());

    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(invalid());
    }

    if frac_part.len() > decimals as usize {
        return Err(AmountError::PrecisionLoss {
            amount: original.to_string(),
            digits: frac_part.len(),
            max: decimals,
        });
    }

    let scale = U256::from(10u64)
        .checked_pow(U256::from(decimals))
        .ok_or_else(invalid)?;
    let whole = parse_digits(int_part).ok_or_else(invalid)?;
    let fraction = if decimals == 0 {
        U256::ZERO
    } else {
        let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
        parse_digits(&padded).ok_or_else(invalid)?
    };

    whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction))
        .ok_or_else(invalid)
}

fn parse_digits(digits: &str) -> Option<U256> {
    if digits.is_empty() {
        return Some(U256::ZERO);
    }
    U256::from_str_radix(digits, 10).ok()
}

/// Render smallest units as canonical decimal text.
///
/// Trailing fractional zeros are dropped and a whole amount has no decimal
/// point, so `parse_units(format_units(v))` returns `v` for every non-zero `v`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    if decimals == 0 {
        return digits;
    }

    let decimals = decimals as usize;
    let padded = if digits.len() <= decimals {
        format!("{:0>width$}", digits, width = decimals + 1)
    } else {
        digits
    };

    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}
