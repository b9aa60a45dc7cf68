//! Core ledger logic for Daftar.
//!
//! This crate contains pure business logic with ZERO database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `accounts` - Account types and the chart-of-accounts hierarchy
//! - `balance` - Balance derivation, rollup, and drift detection
//! - `ledger` - Double-entry journal validation and reversal
//! - `sequence` - Document number formatting and counter arithmetic
//! - `subledger` - Cash and bank sub-ledger balances
//! - `posting` - Business event to journal entry rules
//! - `closing` - Year-end closing entries
//! - `permission` - Permission checks for ledger mutations

pub mod accounts;
pub mod balance;
pub mod closing;
pub mod ledger;
pub mod permission;
pub mod posting;
pub mod sequence;
pub mod subledger;
