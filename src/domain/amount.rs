//! Conversion between stored order totals and provider minor units.
//!
//! Orders store totals in major units with two decimal places; the payment
//! provider reports amounts as integers in the smallest currency unit
//! (paise for INR). The exponent is configurable for currencies with a
//! different number of minor digits.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::GatewayError;

/// Default minor-unit exponent (two decimal digits).
pub const DEFAULT_CURRENCY_EXPONENT: u32 = 2;

/// Converts a major-unit total to minor units, rounding half away from zero.
///
/// # Errors
///
/// Returns [`GatewayError::Internal`] if the result does not fit in `i64`.
pub fn to_minor_units(total: Decimal, exponent: u32) -> Result<i64, GatewayError> {
    let scale = Decimal::from(10_i64.checked_pow(exponent).ok_or_else(|| {
        GatewayError::Internal(format!("currency exponent {exponent} out of range"))
    })?);
    total
        .checked_mul(scale)
        .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|v| v.to_i64())
        .ok_or_else(|| GatewayError::Internal(format!("order total {total} out of range")))
}

/// Confirms the provider-captured amount equals the stored order total.
///
/// # Errors
///
/// Returns [`GatewayError::AmountMismatch`] when the amounts differ.
pub fn reconcile(captured: i64, total: Decimal, exponent: u32) -> Result<(), GatewayError> {
    let expected = to_minor_units(total, exponent)?;
    if captured == expected {
        Ok(())
    } else {
        Err(GatewayError::AmountMismatch { expected, captured })
    }
}
