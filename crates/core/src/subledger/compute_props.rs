//! Property-based tests for sub-ledger balance computation.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::compute::{SubledgerLine, compute_balance, signed_effect};
use super::types::{SubledgerKind, SubledgerTxType};

fn kind() -> impl Strategy<Value = SubledgerKind> {
    prop_oneof![Just(SubledgerKind::Cash), Just(SubledgerKind::Bank)]
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|mils| Decimal::new(mils, 3))
}

fn line_for(kind: SubledgerKind) -> impl Strategy<Value = SubledgerLine> {
    let types: Vec<SubledgerTxType> = SubledgerTxType::ALL
        .into_iter()
        .filter(|t| t.allowed_for(kind))
        .collect();
    (prop::sample::select(types), amount()).prop_map(|(tx_type, amount)| SubledgerLine { tx_type, amount })
}

fn kind_and_lines() -> impl Strategy<Value = (SubledgerKind, Vec<SubledgerLine>)> {
    kind().prop_flat_map(|k| (Just(k), prop::collection::vec(line_for(k), 0..20)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Appending the offsetting row of every transaction restores the initial balance.
    #[test]
    fn prop_offsetting_rows_cancel((kind, lines) in kind_and_lines(), initial in amount()) {
        let offsets: Vec<SubledgerLine> = lines
            .iter()
            .map(|l| SubledgerLine {
                tx_type: l.tx_type.offsetting(),
                amount: if l.tx_type == SubledgerTxType::Adjustment { -l.amount } else { l.amount },
            })
            .collect();
        let all = lines.iter().copied().chain(offsets);
        prop_assert_eq!(compute_balance(kind, initial, all), initial);
    }

    /// The balance does not depend on log order.
    #[test]
    fn prop_order_independent((kind, lines) in kind_and_lines()) {
        let forward = compute_balance(kind, Decimal::ZERO, lines.iter().copied());
        let backward = compute_balance(kind, Decimal::ZERO, lines.iter().rev().copied());
        prop_assert_eq!(forward, backward);
    }

    /// The balance equals the initial value plus the sum of individual effects.
    #[test]
    fn prop_sum_of_effects((kind, lines) in kind_and_lines(), initial in amount()) {
        let expected: Decimal = initial
            + lines.iter().map(|l| signed_effect(kind, l.tx_type, l.amount)).sum::<Decimal>();
        prop_assert_eq!(compute_balance(kind, initial, lines), expected);
    }
}
