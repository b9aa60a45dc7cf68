//! Common types used across the application.

pub mod amount;
pub mod id;

#[cfg(test)]
mod amount_tests;

pub use amount::{AMOUNT_SCALE, BALANCE_TOLERANCE, is_balanced, round_amount};
pub use id::*;
