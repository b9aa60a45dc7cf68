//! Balance derivation and drift detection.
//!
//! Balances are never trusted from a cache; they are recomputed from
//! journal lines:
//! - an account with lines of its own reports the signed sum of those lines
//!   under its type's normal-balance convention
//! - an account with no lines of its own reports the sum of its active
//!   children's balances, recursively
//! - own lines win when an account has both

pub mod drift;
pub mod engine;

#[cfg(test)]
mod engine_props;

pub use drift::Drift;
pub use engine::{AccountBalance, BalanceEngine, BalanceSource, LineTotals, RollupError};
