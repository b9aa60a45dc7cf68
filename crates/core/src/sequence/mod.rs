//! Document numbering.
//!
//! Formatting and counter arithmetic for per-document-type sequences.
//! The atomic allocation itself lives in the database layer.

pub mod counter;
pub mod document;

#[cfg(test)]
mod counter_props;

pub use counter::{SequenceError, SequenceState, advance_target, next_candidate, parse_tail};
pub use document::DocumentType;
