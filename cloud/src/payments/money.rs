//! Minor-unit conversion and revenue split
//!
//! Providers charge in minor units (kobo, cents). Amounts are decimals in
//! major units everywhere else; conversion rounds half away from zero.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use shared::error::AppError;

/// Organizer share of gross revenue, in percent
const ORGANIZER_SHARE_PERCENT: i64 = 80;

/// Convert a major-unit amount to provider minor units.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    if amount.is_sign_negative() {
        return Err(AppError::validation("amount cannot be negative"));
    }
    let minor = (amount * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    minor
        .to_i64()
        .ok_or_else(|| AppError::validation("amount out of range"))
}

/// Gross total split between organizer and platform, in minor units.
///
/// The two parts always sum back to the input total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSplit {
    pub organizer_minor: i64,
    pub platform_minor: i64,
}

pub fn split_revenue(total_minor: i64) -> RevenueSplit {
    // round half up on the organizer share, platform takes the remainder
    let organizer_minor = (total_minor * ORGANIZER_SHARE_PERCENT + 50) / 100;
    RevenueSplit {
        organizer_minor,
        platform_minor: total_minor - organizer_minor,
    }
}
