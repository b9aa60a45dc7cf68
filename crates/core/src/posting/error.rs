//! Posting rule errors.

use daftar_shared::AppError;
use rust_decimal::Decimal;
use thiserror::Error;

use super::accounts::AccountRole;
use super::events::{EventKind, Settlement};

/// Errors raised while building a posting draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    /// No rule is registered for the event kind.
    #[error("No posting rule registered for '{0}'")]
    NoRule(EventKind),

    /// A rule was invoked with an event of another kind.
    #[error("Posting rule for '{expected}' received '{actual}'")]
    EventMismatch {
        /// Kind the rule handles.
        expected: EventKind,
        /// Kind it received.
        actual: EventKind,
    },

    /// Configuration names an unknown account role.
    #[error("Unknown posting account role: '{0}'")]
    UnknownRole(String),

    /// Configuration maps a role to a blank code.
    #[error("Posting account role '{0}' is mapped to a blank code")]
    BlankCode(AccountRole),

    /// The settlement method is not valid for the event.
    #[error("Settlement '{settlement:?}' is not valid for '{event}'")]
    UnsupportedSettlement {
        /// Event kind.
        event: EventKind,
        /// Rejected settlement.
        settlement: Settlement,
    },

    /// An event amount is negative.
    #[error("Field '{field}' cannot be negative, got {amount}")]
    NegativeAmount {
        /// Offending field.
        field: &'static str,
        /// Offending amount.
        amount: Decimal,
    },
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoRule(_) => "NO_POSTING_RULE",
            Self::EventMismatch { .. } => "POSTING_EVENT_MISMATCH",
            Self::UnknownRole(_) => "UNKNOWN_ACCOUNT_ROLE",
            Self::BlankCode(_) => "BLANK_ACCOUNT_CODE",
            Self::UnsupportedSettlement { .. } => "UNSUPPORTED_SETTLEMENT",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
        }
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        match err {
            PostingError::NoRule(_)
            | PostingError::EventMismatch { .. }
            | PostingError::UnknownRole(_)
            | PostingError::BlankCode(_) => Self::Configuration(err.to_string()),
            PostingError::UnsupportedSettlement { .. } | PostingError::NegativeAmount { .. } => {
                Self::Validation(err.to_string())
            }
        }
    }
}
