//! Cash and bank sub-ledgers.
//!
//! A holder (cashbox or bank account) keeps an append-only transaction log
//! and a cached balance. The log is authoritative; the cache is rebuilt from
//! it by [`compute_balance`].

pub mod compute;
pub mod types;

#[cfg(test)]
mod compute_props;

pub use compute::{SubledgerLine, SyncOutcome, compute_balance, signed_effect};
pub use types::{SubledgerError, SubledgerHolder, SubledgerKind, SubledgerTxType};
