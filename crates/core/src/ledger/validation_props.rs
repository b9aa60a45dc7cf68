//! Property-based tests for journal line normalisation.

use daftar_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::types::JournalLineInput;
use super::validation::normalize_lines;

/// Amounts from 0.001 to 1,000,000.000.
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000_000i64).prop_map(|mils| Decimal::new(mils, 3))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Mirrored debit/credit pairs always validate, with debit total equal to the sum.
    #[test]
    fn prop_mirrored_pairs_balance(amounts in prop::collection::vec(positive_amount(), 1..10)) {
        let mut lines = Vec::new();
        for amount in &amounts {
            lines.push(JournalLineInput::debit(AccountId::new(), *amount));
            lines.push(JournalLineInput::credit(AccountId::new(), *amount));
        }
        let resolved = normalize_lines(&lines).unwrap();
        let expected: Decimal = amounts.iter().copied().sum();
        prop_assert_eq!(resolved.totals.debit, expected);
        prop_assert_eq!(resolved.totals.credit, expected);
        prop_assert_eq!(resolved.lines.len(), amounts.len() * 2);
    }

    /// Blank rows anywhere in the input never change the outcome.
    #[test]
    fn prop_blank_rows_ignored(amount in positive_amount(), blanks in 0usize..5, at in 0usize..3) {
        let mut lines = vec![
            JournalLineInput::debit(AccountId::new(), amount),
            JournalLineInput::credit(AccountId::new(), amount),
        ];
        for _ in 0..blanks {
            lines.insert(at.min(lines.len()), JournalLineInput::default());
        }
        let resolved = normalize_lines(&lines).unwrap();
        prop_assert_eq!(resolved.lines.len(), 2);
    }

    /// An imbalance above the tolerance is always reported with its exact difference.
    #[test]
    fn prop_imbalance_reported(amount in positive_amount(), gap in 2i64..1_000_000i64) {
        let gap = Decimal::new(gap, 3);
        let lines = vec![
            JournalLineInput::debit(AccountId::new(), amount + gap),
            JournalLineInput::credit(AccountId::new(), amount),
        ];
        match normalize_lines(&lines) {
            Err(LedgerError::Unbalanced { difference, .. }) => prop_assert_eq!(difference, gap),
            other => prop_assert!(false, "expected imbalance, got {:?}", other),
        }
    }
}
