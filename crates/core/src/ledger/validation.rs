//! Business rule validation for journal entries.

use daftar_shared::types::{is_balanced, round_amount};
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::{EntryTotals, JournalLineInput, ResolvedEntry, ValidatedLine};

/// Maximum length of an entry number.
pub const MAX_ENTRY_NUMBER_LEN: usize = 50;

/// Normalises and validates the lines of a journal entry.
///
/// Amounts are rounded to ledger precision first. Then:
/// - a line with zero amounts and no account is dropped
/// - a line with zero amounts that names an account is rejected
/// - negative amounts, two-sided lines and amounts without an account are rejected
/// - at least one line must survive
/// - debits must equal credits within 0.001
///
/// # Errors
///
/// Returns the first violated rule.
pub fn normalize_lines(lines: &[JournalLineInput]) -> Result<ResolvedEntry, LedgerError> {
    let mut survivors = Vec::with_capacity(lines.len());
    let mut totals = EntryTotals::default();

    for (index, line) in lines.iter().enumerate() {
        let number = index + 1;
        let debit = round_amount(line.debit);
        let credit = round_amount(line.credit);

        if debit < Decimal::ZERO || credit < Decimal::ZERO {
            return Err(LedgerError::NegativeAmount { line: number });
        }

        match (debit.is_zero(), credit.is_zero()) {
            (true, true) if line.account_id.is_none() => continue,
            (true, true) => return Err(LedgerError::EmptyLine { line: number }),
            (false, false) => return Err(LedgerError::BothSides { line: number }),
            _ => {}
        }

        let account_id = line
            .account_id
            .ok_or(LedgerError::MissingAccount { line: number })?;

        totals.debit += debit;
        totals.credit += credit;
        survivors.push(ValidatedLine {
            account_id,
            debit,
            credit,
            description: line
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(ToString::to_string),
        });
    }

    if survivors.is_empty() {
        return Err(LedgerError::NoValidLines);
    }

    if !is_balanced(totals.debit, totals.credit) {
        return Err(LedgerError::Unbalanced {
            debit: totals.debit,
            credit: totals.credit,
            difference: totals.difference(),
        });
    }

    Ok(ResolvedEntry {
        lines: survivors,
        totals,
    })
}

/// Validates and trims an explicitly supplied entry number.
///
/// # Errors
///
/// Returns an error if the number is blank, too long, or contains whitespace.
pub fn validate_entry_number(raw: &str) -> Result<String, LedgerError> {
    let number = raw.trim();
    if number.is_empty()
        || number.len() > MAX_ENTRY_NUMBER_LEN
        || number.chars().any(char::is_whitespace)
    {
        return Err(LedgerError::InvalidEntryNumber(raw.to_string()));
    }
    Ok(number.to_string())
}

/// Validates and trims an entry description.
///
/// # Errors
///
/// Returns an error if the description is blank.
pub fn validate_description(raw: &str) -> Result<String, LedgerError> {
    let description = raw.trim();
    if description.is_empty() {
        return Err(LedgerError::MissingDescription);
    }
    Ok(description.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use daftar_shared::types::AccountId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balanced_entry() {
        let cash = AccountId::new();
        let sales = AccountId::new();
        let resolved = normalize_lines(&[
            JournalLineInput::debit(cash, dec!(100)),
            JournalLineInput::credit(sales, dec!(100)),
        ])
        .unwrap();
        assert_eq!(resolved.total_amount(), dec!(100));
        assert_eq!(resolved.lines.len(), 2);
    }

    #[test]
    fn test_unbalanced_entry_reports_difference() {
        let result = normalize_lines(&[
            JournalLineInput::debit(AccountId::new(), dec!(100)),
            JournalLineInput::credit(AccountId::new(), dec!(90)),
        ]);
        assert_eq!(
            result,
            Err(LedgerError::Unbalanced {
                debit: dec!(100),
                credit: dec!(90),
                difference: dec!(10),
            })
        );
    }

    #[test]
    fn test_tolerance_accepts_one_mil() {
        let resolved = normalize_lines(&[
            JournalLineInput::debit(AccountId::new(), dec!(100.001)),
            JournalLineInput::credit(AccountId::new(), dec!(100)),
        ]);
        assert!(resolved.is_ok());
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let resolved = normalize_lines(&[
            JournalLineInput::default(),
            JournalLineInput::debit(AccountId::new(), dec!(5)),
            JournalLineInput::default(),
            JournalLineInput::credit(AccountId::new(), dec!(5)),
        ])
        .unwrap();
        assert_eq!(resolved.lines.len(), 2);
    }

    #[test]
    fn test_only_blank_rows_is_error() {
        assert_eq!(
            normalize_lines(&[JournalLineInput::default(), JournalLineInput::default()]),
            Err(LedgerError::NoValidLines)
        );
        assert_eq!(normalize_lines(&[]), Err(LedgerError::NoValidLines));
    }

    #[test]
    fn test_zero_line_with_account_is_rejected() {
        let result = normalize_lines(&[
            JournalLineInput::debit(AccountId::new(), dec!(5)),
            JournalLineInput::debit(AccountId::new(), Decimal::ZERO),
        ]);
        assert_eq!(result, Err(LedgerError::EmptyLine { line: 2 }));
    }

    #[test]
    fn test_both_sides_rejected() {
        let mut line = JournalLineInput::debit(AccountId::new(), dec!(5));
        line.credit = dec!(5);
        assert_eq!(
            normalize_lines(&[line]),
            Err(LedgerError::BothSides { line: 1 })
        );
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(
            normalize_lines(&[JournalLineInput::debit(AccountId::new(), dec!(-5))]),
            Err(LedgerError::NegativeAmount { line: 1 })
        );
    }

    #[test]
    fn test_amount_without_account_rejected() {
        let line = JournalLineInput {
            debit: dec!(5),
            ..JournalLineInput::default()
        };
        assert_eq!(
            normalize_lines(&[line]),
            Err(LedgerError::MissingAccount { line: 1 })
        );
    }

    #[test]
    fn test_amounts_rounded_to_three_places() {
        let resolved = normalize_lines(&[
            JournalLineInput::debit(AccountId::new(), dec!(10.0005)),
            JournalLineInput::credit(AccountId::new(), dec!(10.001)),
        ])
        .unwrap();
        assert_eq!(resolved.lines[0].debit, dec!(10.001));
    }

    #[test]
    fn test_entry_number_rules() {
        assert_eq!(validate_entry_number("  JE000010 ").unwrap(), "JE000010");
        assert!(validate_entry_number("").is_err());
        assert!(validate_entry_number("JE 10").is_err());
        assert!(validate_entry_number(&"X".repeat(51)).is_err());
    }

    #[test]
    fn test_description_required() {
        assert_eq!(
            validate_description("   "),
            Err(LedgerError::MissingDescription)
        );
        assert_eq!(validate_description(" Rent ").unwrap(), "Rent");
    }
}
