use rust_decimal::Decimal;

use crate::core::error::{AppError, Result};

/// Decimal places for USD amounts
pub const USD_SCALE: u32 = 2;

/// Rounds an amount to USD precision (2 decimal places, banker-free half-up)
pub fn round_usd(amount: Decimal) -> Decimal {
    amount.round_dp(USD_SCALE)
}

/// Validates that an amount is positive and carries at most 2 decimal places
pub fn validate_amount(label: &str, amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation(format!(
            "{} must be greater than zero, got {}",
            label, amount
        )));
    }

    if amount.scale() > USD_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places, got {}",
            label, USD_SCALE, amount
        )));
    }

    Ok(())
}

/// Converts a USD decimal amount to integer cents for the gateway boundary.
///
/// The gateway speaks integer minor-currency-units only; fractional-cent
/// amounts are a caller bug and rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    let scaled = amount * Decimal::from(100);
    if scaled.fract() != Decimal::ZERO {
        return Err(AppError::validation(format!(
            "Amount {} is not representable in cents",
            amount
        )));
    }

    scaled
        .try_into()
        .map_err(|_| AppError::validation(format!("Amount {} out of range", amount)))
}

/// Converts integer cents from the gateway back to a USD decimal amount
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, USD_SCALE)
}
