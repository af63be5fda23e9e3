//! XLM <-> stroop conversion.
//!
//! Fractional digits past the seventh are dropped, not rounded.

use crate::types::MarketError;

/// Digits after the decimal point in one XLM.
pub const SCALE: usize = 7;

pub const STROOPS_PER_XLM: i128 = 10_000_000;

/// Parse a non-negative decimal XLM string ("1.5", ".25", "10") into stroops.
pub fn to_base_units(decimal: &str) -> Result<i128, MarketError> {
    let s = decimal.trim();
    let invalid = || MarketError::Validation(format!("not a decimal amount: {decimal:?}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_units: i128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };

    let kept = &frac[..frac.len().min(SCALE)];
    let frac_units: i128 = if kept.is_empty() {
        0
    } else {
        let padded = format!("{kept:0<width$}", width = SCALE);
        padded.parse().map_err(|_| invalid())?
    };

    whole_units
        .checked_mul(STROOPS_PER_XLM)
        .and_then(|v| v.checked_add(frac_units))
        .ok_or_else(|| MarketError::Validation(format!("amount out of range: {decimal:?}")))
}

/// Render stroops as decimal XLM with trailing zeros removed.
pub fn to_decimal_string(stroops: i128) -> String {
    let sign = if stroops < 0 { "-" } else { "" };
    let magnitude = stroops.unsigned_abs();
    let per = STROOPS_PER_XLM as u128;
    let whole = magnitude / per;
    let frac = magnitude % per;
    if frac == 0 {
        return format!("{sign}{whole}");
    }
    let digits = format!("{frac:0>width$}", width = SCALE);
    format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
}
