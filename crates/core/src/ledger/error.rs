//! Ledger error types for validation and state errors.

use daftar_shared::types::AccountId;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur while validating a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Line Errors ==========
    /// No line carries a non-zero amount.
    #[error("Journal entry must have at least one line with a non-zero amount")]
    NoValidLines,

    /// A line amount is negative.
    #[error("Line {line}: amounts cannot be negative")]
    NegativeAmount {
        /// 1-based line number.
        line: usize,
    },

    /// A line has both a debit and a credit.
    #[error("Line {line}: a line cannot carry both a debit and a credit")]
    BothSides {
        /// 1-based line number.
        line: usize,
    },

    /// A line names an account but has neither a debit nor a credit.
    #[error("Line {line}: a line must carry either a debit or a credit")]
    EmptyLine {
        /// 1-based line number.
        line: usize,
    },

    /// A line has an amount but no account.
    #[error("Line {line}: an account is required")]
    MissingAccount {
        /// 1-based line number.
        line: usize,
    },

    // ========== Entry Errors ==========
    /// Debits and credits differ by more than the tolerance.
    #[error("Balance mismatch: debits {debit} and credits {credit} differ by {difference}")]
    Unbalanced {
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
        /// `debit - credit`.
        difference: Decimal,
    },

    /// Entry description is blank.
    #[error("Journal entry description is required")]
    MissingDescription,

    /// An explicitly supplied entry number is malformed.
    #[error("Invalid entry number: '{0}'")]
    InvalidEntryNumber(String),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account is inactive and cannot receive postings.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountId),

    // ========== Period Errors ==========
    /// The entry date falls in a year that has been closed.
    #[error("Fiscal year {0} is closed")]
    YearClosed(i32),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NoValidLines => "NO_VALID_LINES",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::BothSides { .. } => "BOTH_SIDES",
            Self::EmptyLine { .. } => "EMPTY_LINE",
            Self::MissingAccount { .. } => "MISSING_ACCOUNT",
            Self::Unbalanced { .. } => "BALANCE_MISMATCH",
            Self::MissingDescription => "MISSING_DESCRIPTION",
            Self::InvalidEntryNumber(_) => "INVALID_ENTRY_NUMBER",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::YearClosed(_) => "YEAR_CLOSED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AccountNotFound(_) => 404,
            Self::YearClosed(_) => 422,
            _ => 400,
        }
    }
}

impl From<LedgerError> for daftar_shared::AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::AccountNotFound(_) => Self::NotFound(err.to_string()),
            LedgerError::YearClosed(_) => Self::BusinessRule(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}
