//! Sequence counter arithmetic.
//!
//! `current_number` always holds the next number to issue. Healing raises it
//! past the highest number already consumed by records of the same type.

use thiserror::Error;

use super::document::DocumentType;
use daftar_shared::AppError;

/// Widest zero-pad allowed for a sequence.
pub const MAX_DIGITS: u32 = 18;

/// Errors raised by sequence allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
    /// No sequence row exists for the document type.
    #[error("No document sequence is configured for '{0}'")]
    NotConfigured(DocumentType),

    /// Zero-pad width out of range.
    #[error("Sequence digits must be between 1 and {MAX_DIGITS}, got {0}")]
    InvalidDigits(i64),

    /// Prefix is blank or contains digits.
    #[error("Invalid sequence prefix: '{0}'")]
    InvalidPrefix(String),

    /// Concurrent callers kept winning the compare-and-swap.
    #[error("Sequence '{0}' is contended; gave up after {1} attempts")]
    Contended(DocumentType, u32),
}

impl SequenceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "SEQUENCE_NOT_CONFIGURED",
            Self::InvalidDigits(_) => "INVALID_SEQUENCE_DIGITS",
            Self::InvalidPrefix(_) => "INVALID_SEQUENCE_PREFIX",
            Self::Contended(..) => "SEQUENCE_CONTENDED",
        }
    }
}

impl From<SequenceError> for AppError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::NotConfigured(_) => Self::Configuration(err.to_string()),
            SequenceError::InvalidDigits(_) | SequenceError::InvalidPrefix(_) => {
                Self::Validation(err.to_string())
            }
            SequenceError::Contended(..) => Self::Conflict(err.to_string()),
        }
    }
}

/// A snapshot of a sequence row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceState {
    /// Number prefix, e.g. `"JE"`.
    pub prefix: String,
    /// Zero-pad width.
    pub digits: u32,
    /// Next number to issue.
    pub current_number: i64,
}

impl SequenceState {
    /// Builds a state, validating the prefix and width.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank or digit-bearing prefix or an out-of-range width.
    pub fn new(prefix: &str, digits: i64, current_number: i64) -> Result<Self, SequenceError> {
        let prefix = prefix.trim();
        if prefix.is_empty() || prefix.chars().any(|c| c.is_ascii_digit() || c.is_whitespace()) {
            return Err(SequenceError::InvalidPrefix(prefix.to_string()));
        }
        let digits = u32::try_from(digits)
            .ok()
            .filter(|d| (1..=MAX_DIGITS).contains(d))
            .ok_or(SequenceError::InvalidDigits(digits))?;
        Ok(Self {
            prefix: prefix.to_string(),
            digits,
            current_number: current_number.max(1),
        })
    }

    /// Formats `number` as `prefix + zero-pad(number, digits)`.
    ///
    /// Numbers wider than `digits` are not truncated.
    #[must_use]
    pub fn format(&self, number: i64) -> String {
        let width = self.digits as usize;
        format!("{}{number:0width$}", self.prefix)
    }

    /// The next number after healing against `max_used`, formatted.
    #[must_use]
    pub fn peek(&self, max_used: Option<i64>) -> String {
        self.format(next_candidate(self.current_number, max_used))
    }
}

/// Parses the numeric tail of `number` when it starts with `prefix`.
///
/// Returns `None` unless everything after the prefix is ASCII digits.
#[must_use]
pub fn parse_tail(number: &str, prefix: &str) -> Option<i64> {
    let tail = number.strip_prefix(prefix)?;
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

/// The number to issue next, given the counter and the highest consumed number.
#[must_use]
pub fn next_candidate(current_number: i64, max_used: Option<i64>) -> i64 {
    match max_used {
        Some(used) => current_number.max(used.saturating_add(1)),
        None => current_number,
    }
}

/// Counter value after `advanceToAtLeast(n)`. Never lowers the counter.
#[must_use]
pub fn advance_target(current_number: i64, n: i64) -> i64 {
    current_number.max(n.saturating_add(1))
}
