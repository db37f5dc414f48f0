//! Decimal helpers shared by the evaluator, the gates and the roll-ups.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// One hundred, the percentage scale factor.
pub const HUNDRED: Decimal = dec!(100);

/// Computes `amount / total * 100`.
///
/// Fails with [`Error::InvalidTotalBudget`] when `total` is zero or negative
/// instead of producing a meaningless percentage.
pub fn percentage_of(amount: Decimal, total: Decimal) -> Result<Decimal> {
    if total <= Decimal::ZERO {
        return Err(Error::InvalidTotalBudget { total });
    }

    amount
        .checked_mul(HUNDRED)
        .and_then(|scaled| scaled.checked_div(total))
        .ok_or(Error::ArithmeticOverflow { amount, total })
}

/// Computes `part / whole * 100`, defined as zero when `whole` is not positive.
///
/// Used for roll-ups such as utilization where an empty denominator is a normal
/// state rather than an error.
#[must_use]
pub fn percentage_or_zero(part: Decimal, whole: Decimal) -> Decimal {
    percentage_of(part, whole).unwrap_or(Decimal::ZERO)
}

/// Formats a percentage with one decimal place, rounding half away from zero.
#[must_use]
pub fn format_percentage(percentage: Decimal) -> String {
    let rounded = percentage.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.1}")
}

/// Formats a constraint threshold without trailing zeros (`10`, `12.5`).
#[must_use]
pub fn format_threshold(threshold: Decimal) -> String {
    threshold.normalize().to_string()
}

/// Formats a monetary amount with two decimal places.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}
