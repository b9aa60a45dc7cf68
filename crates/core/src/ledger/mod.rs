//! Double-entry journal logic.
//!
//! This module implements the pure side of the journal ledger:
//! - Journal line normalisation (dropping blank lines, rejecting malformed ones)
//! - Balance validation within the 0.001 tolerance
//! - Account resolution through a caller-supplied lookup
//! - Domain types for entry creation
//! - Reversing entries
//! - Error types for ledger operations

pub mod error;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::LedgerError;
pub use reversal::reverse_lines;
pub use service::{AccountInfo, LedgerService};
pub use types::{
    CreateEntryInput, EntryTotals, JournalLineInput, ReferenceType, ResolvedEntry, ValidatedLine,
};
pub use validation::{normalize_lines, validate_entry_number};
