//! Fixed-point conversions between settlement-asset base units, the 18
//! decimal rate unit and fiat amounts.
//!
//! Fiat amounts are carried with the same six decimals as the settlement
//! asset; a "penny" is therefore `10^4` fiat units. Nothing here touches
//! floating point.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::errors::LiquidityError;

pub const SETTLEMENT_DECIMALS: usize = 6;
pub const FIAT_DISPLAY_DECIMALS: usize = 2;

/// `10^6`, one whole settlement token.
pub const SETTLEMENT_UNIT: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);
/// `10^18`, the fixed-point scale of conversion rates.
pub const RATE_PRECISION: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
/// Smallest fiat increment a quote is rounded to.
pub const PENNY_IN_FIAT_UNITS: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// Which way a deposit's `conversionRate` points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrientation {
    /// Settlement units received per fiat unit: `fiat = amount * 1e18 / rate`.
    #[default]
    SettlementPerFiat,
    /// Fiat units charged per settlement unit: `fiat = amount * rate / 1e18`.
    FiatPerSettlement,
}

/// Parses a human amount such as `"12.5"` into settlement base units.
///
/// Fractions beyond six places are truncated. Zero, signs, exponents and
/// anything that does not fit in 256 bits are rejected with
/// [`LiquidityError::InvalidAmount`].
pub fn to_settlement_units(amount: &str) -> Result<U256, LiquidityError> {
    let mut parts = amount.split('.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();
    if parts.next().is_some() || (whole.is_empty() && fraction.is_empty()) {
        return Err(LiquidityError::InvalidAmount);
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(LiquidityError::InvalidAmount);
    }

    let mut digits = String::with_capacity(whole.len() + SETTLEMENT_DECIMALS);
    digits.push_str(whole);
    digits.extend(
        fraction
            .chars()
            .chain(std::iter::repeat('0'))
            .take(SETTLEMENT_DECIMALS),
    );

    let units = U256::from_str_radix(&digits, 10).map_err(|_| LiquidityError::InvalidAmount)?;
    if units.is_zero() {
        return Err(LiquidityError::InvalidAmount);
    }
    Ok(units)
}

/// Fiat owed for `settlement_amount` at `conversion_rate`, rounded up to the
/// next penny whenever the exact value is not already a whole penny.
pub fn fiat_from_settlement(
    settlement_amount: U256,
    conversion_rate: U256,
    orientation: RateOrientation,
) -> Result<U256, LiquidityError> {
    if conversion_rate.is_zero() {
        return Err(LiquidityError::Overflow);
    }

    let (numerator, denominator) = match orientation {
        RateOrientation::SettlementPerFiat => (
            settlement_amount
                .checked_mul(RATE_PRECISION)
                .ok_or(LiquidityError::Overflow)?,
            conversion_rate,
        ),
        RateOrientation::FiatPerSettlement => (
            settlement_amount
                .checked_mul(conversion_rate)
                .ok_or(LiquidityError::Overflow)?,
            RATE_PRECISION,
        ),
    };

    // The exact quotient may itself have a fractional part; any remainder at
    // either step pushes the result to the next penny.
    let raw = numerator / denominator;
    let exact = (numerator % denominator).is_zero();
    let remainder = raw % PENNY_IN_FIAT_UNITS;

    if remainder.is_zero() && exact {
        Ok(raw)
    } else {
        (raw - remainder)
            .checked_add(PENNY_IN_FIAT_UNITS)
            .ok_or(LiquidityError::Overflow)
    }
}

/// `1500000` -> `"1.5"`, `1000000` -> `"1.0"`.
#[must_use]
pub fn settlement_display(amount: U256) -> String {
    let (whole, fraction) = split_fixed(amount);
    let trimmed = fraction.trim_end_matches('0');
    if trimmed.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{trimmed}")
    }
}

/// Two-decimal rendering of a fiat amount, rounding half up on the third
/// decimal.
#[must_use]
pub fn fiat_display(amount: U256) -> String {
    let half = PENNY_IN_FIAT_UNITS / U256::from(2u64);
    let round_up = amount % PENNY_IN_FIAT_UNITS >= half;
    let cents = amount / PENNY_IN_FIAT_UNITS + U256::from(u64::from(round_up));
    let hundred = U256::from(100u64);
    format!(
        "{}.{:0>width$}",
        cents / hundred,
        (cents % hundred).to_string(),
        width = FIAT_DISPLAY_DECIMALS
    )
}

fn split_fixed(amount: U256) -> (String, String) {
    let digits = format!("{:0>width$}", amount.to_string(), width = SETTLEMENT_DECIMALS + 1);
    let (whole, fraction) = digits.split_at(digits.len() - SETTLEMENT_DECIMALS);
    (whole.to_string(), fraction.to_string())
}
