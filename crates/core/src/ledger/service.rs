//! Ledger service for journal entry validation and resolution.
//!
//! Pure business logic with no database dependencies. Repositories supply
//! account information through a lookup closure.

use daftar_shared::types::AccountId;

use super::error::LedgerError;
use super::types::{JournalLineInput, ResolvedEntry};
use super::validation::{normalize_lines, validate_description};
use crate::accounts::AccountType;

/// Information about an account needed for validation.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Whether the account is active.
    pub is_active: bool,
    /// The account's type.
    pub account_type: AccountType,
}

/// Ledger service for journal entry validation.
pub struct LedgerService;

impl LedgerService {
    /// Validate and resolve a journal entry before persisting.
    ///
    /// 1. Requires a non-blank description
    /// 2. Normalises lines (drops blank rows, rounds, checks balance)
    /// 3. Resolves every referenced account through `account_lookup`
    ///    and rejects missing or inactive ones
    ///
    /// Returns the trimmed description and the resolved entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if validation fails.
    pub fn validate_and_resolve<A>(
        description: &str,
        lines: &[JournalLineInput],
        account_lookup: A,
    ) -> Result<(String, ResolvedEntry), LedgerError>
    where
        A: Fn(AccountId) -> Option<AccountInfo>,
    {
        let description = validate_description(description)?;
        let resolved = normalize_lines(lines)?;

        for line in &resolved.lines {
            let info =
                account_lookup(line.account_id).ok_or(LedgerError::AccountNotFound(line.account_id))?;
            if !info.is_active {
                return Err(LedgerError::AccountInactive(line.account_id));
            }
        }

        Ok((description, resolved))
    }
}
