//! Ledger amount precision rules.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Amounts are `rust_decimal::Decimal` kept to three decimal places, and
//! debit/credit totals are considered equal when they differ by at most
//! [`BALANCE_TOLERANCE`].

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places stored for every ledger amount.
pub const AMOUNT_SCALE: u32 = 3;

/// Largest difference between total debits and total credits that still
/// counts as balanced (0.001).
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, AMOUNT_SCALE);

/// Rounds an amount to the ledger precision, half away from zero.
#[must_use]
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true when two totals are equal within [`BALANCE_TOLERANCE`].
#[must_use]
pub fn is_balanced(debit: Decimal, credit: Decimal) -> bool {
    (debit - credit).abs() <= BALANCE_TOLERANCE
}
