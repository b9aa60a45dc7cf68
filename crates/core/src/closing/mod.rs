//! Year-end closing.
//!
//! Closing zeroes every nominal (revenue, expense, purchases) account and
//! carries the net result to a capital account. A year is closed on its
//! last day so that every entry dated in the year is included.

use chrono::NaiveDate;
use daftar_shared::AppError;
use daftar_shared::types::{AccountId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::{AccountType, NormalBalance};
use crate::ledger::JournalLineInput;

/// A nominal account's balance at the closing date, in its normal convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominalBalance {
    /// Account.
    pub account_id: AccountId,
    /// Account type.
    pub account_type: AccountType,
    /// Balance, positive on the account's normal side.
    pub balance: Decimal,
}

/// Lines of the closing entry and the resulting net income.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingPlan {
    /// Entry lines, ending with the capital line.
    pub lines: Vec<JournalLineInput>,
    /// Revenue minus expenses and purchases. Negative for a loss.
    pub net_income: Decimal,
}

/// Errors raised by year-end closing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClosingError {
    /// Every nominal account is already zero.
    #[error("Nothing to close for {0}: all revenue and expense accounts are zero")]
    NothingToClose(i32),

    /// The year already has a closing marker.
    #[error("Fiscal year {0} is already closed")]
    AlreadyClosed(i32),

    /// The net result must go to an equity account.
    #[error("Account {0} is not an equity account")]
    CapitalNotEquity(AccountId),
}

impl ClosingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NothingToClose(_) => "NOTHING_TO_CLOSE",
            Self::AlreadyClosed(_) => "YEAR_ALREADY_CLOSED",
            Self::CapitalNotEquity(_) => "CAPITAL_NOT_EQUITY",
        }
    }
}

impl From<ClosingError> for AppError {
    fn from(err: ClosingError) -> Self {
        match err {
            ClosingError::AlreadyClosed(_) => Self::Conflict(err.to_string()),
            ClosingError::NothingToClose(_) => Self::BusinessRule(err.to_string()),
            ClosingError::CapitalNotEquity(_) => Self::Validation(err.to_string()),
        }
    }
}

/// 31 December of `year`, the date its closing entry carries.
#[must_use]
pub fn year_end(year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// Builds the closing entry for `year`.
///
/// Each nominal account gets the line that brings it to zero; balance-sheet
/// accounts in `balances` are ignored.
///
/// # Errors
///
/// Returns [`ClosingError::NothingToClose`] when no nominal account has a balance.
pub fn build_closing_plan(
    year: i32,
    balances: &[NominalBalance],
    capital: AccountId,
) -> Result<ClosingPlan, ClosingError> {
    let mut lines = Vec::new();
    let mut net_income = Decimal::ZERO;

    for item in balances.iter().filter(|b| b.account_type.is_nominal()) {
        let balance = round_amount(item.balance);
        if balance.is_zero() {
            continue;
        }
        // Debit-side amount needed to zero the account: credit-normal accounts
        // are closed with a debit of their balance, debit-normal with a credit.
        let closing_debit = match item.account_type.normal_balance() {
            NormalBalance::Credit => balance,
            NormalBalance::Debit => -balance,
        };
        net_income += closing_debit;
        lines.push(if closing_debit > Decimal::ZERO {
            JournalLineInput::debit(item.account_id, closing_debit)
        } else {
            JournalLineInput::credit(item.account_id, -closing_debit)
        });
    }

    if lines.is_empty() {
        return Err(ClosingError::NothingToClose(year));
    }

    let description = format!("Net result {year}");
    if net_income > Decimal::ZERO {
        lines.push(JournalLineInput::credit(capital, net_income).with_description(description));
    } else if net_income < Decimal::ZERO {
        lines.push(JournalLineInput::debit(capital, -net_income).with_description(description));
    }

    Ok(ClosingPlan { lines, net_income })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::normalize_lines;
    use rust_decimal_macros::dec;

    #[test]
    fn test_year_end_is_last_day() {
        assert_eq!(year_end(2024), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(year_end(i32::MAX), None);
    }

    fn nominal(account_type: AccountType, balance: Decimal) -> NominalBalance {
        NominalBalance {
            account_id: AccountId::new(),
            account_type,
            balance,
        }
    }

    #[test]
    fn test_profit_credits_capital() {
        let capital = AccountId::new();
        let plan = build_closing_plan(
            2025,
            &[
                nominal(AccountType::Revenue, dec!(1000)),
                nominal(AccountType::Expense, dec!(300)),
                nominal(AccountType::Purchases, dec!(200)),
                nominal(AccountType::Asset, dec!(9999)),
            ],
            capital,
        )
        .unwrap();

        assert_eq!(plan.net_income, dec!(500));
        assert_eq!(plan.lines.len(), 4);
        let last = plan.lines.last().unwrap();
        assert_eq!(last.account_id, Some(capital));
        assert_eq!(last.credit, dec!(500));
        assert!(normalize_lines(&plan.lines).is_ok());
    }

    #[test]
    fn test_loss_debits_capital() {
        let capital = AccountId::new();
        let plan = build_closing_plan(
            2025,
            &[
                nominal(AccountType::Revenue, dec!(100)),
                nominal(AccountType::Expense, dec!(400)),
            ],
            capital,
        )
        .unwrap();
        assert_eq!(plan.net_income, dec!(-300));
        assert_eq!(plan.lines.last().unwrap().debit, dec!(300));
        assert!(normalize_lines(&plan.lines).is_ok());
    }

    #[test]
    fn test_contra_balance_flips_side() {
        let plan = build_closing_plan(
            2025,
            &[
                nominal(AccountType::Revenue, dec!(-50)),
                nominal(AccountType::Expense, dec!(-20)),
            ],
            AccountId::new(),
        )
        .unwrap();
        assert_eq!(plan.lines[0].credit, dec!(50));
        assert_eq!(plan.lines[1].debit, dec!(20));
        assert_eq!(plan.net_income, dec!(-30));
    }

    #[test]
    fn test_break_even_has_no_capital_line() {
        let plan = build_closing_plan(
            2025,
            &[
                nominal(AccountType::Revenue, dec!(100)),
                nominal(AccountType::Expense, dec!(100)),
            ],
            AccountId::new(),
        )
        .unwrap();
        assert_eq!(plan.lines.len(), 2);
        assert!(plan.net_income.is_zero());
    }

    #[test]
    fn test_nothing_to_close() {
        assert_eq!(
            build_closing_plan(2025, &[nominal(AccountType::Asset, dec!(10))], AccountId::new()),
            Err(ClosingError::NothingToClose(2025))
        );
    }
}
