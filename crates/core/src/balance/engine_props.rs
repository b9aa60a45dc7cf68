//! Property-based tests for balance roll-up.

use std::collections::HashMap;

use daftar_shared::types::AccountId;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::engine::{BalanceEngine, LineTotals};
use crate::accounts::{AccountNode, AccountType, ChartTree};

/// Strategy to generate a non-negative amount with 3 decimal places.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|mils| Decimal::new(mils, 3))
}

fn account_type_strategy() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
        Just(AccountType::Purchases),
    ]
}

fn leaf(account_type: AccountType, parent: Option<AccountId>, active: bool) -> AccountNode {
    let id = AccountId::new();
    AccountNode {
        id,
        code: id.to_string(),
        account_type,
        parent_id: parent,
        is_active: active,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A leaf's balance is the signed sum of its own lines.
    #[test]
    fn prop_leaf_balance_is_signed_sum(
        account_type in account_type_strategy(),
        lines in prop::collection::vec((amount(), amount()), 1..20),
    ) {
        let account = leaf(account_type, None, true);
        let tree = ChartTree::new([account.clone()]);
        let totals = LineTotals::collect(lines.iter().map(|(d, c)| (account.id, *d, *c)));

        let debit: Decimal = lines.iter().map(|(d, _)| *d).sum();
        let credit: Decimal = lines.iter().map(|(_, c)| *c).sum();
        let expected = account_type.normal_balance().signed(debit, credit);

        let mut engine = BalanceEngine::new(&tree, &totals);
        prop_assert_eq!(engine.balance(account.id).unwrap(), expected);
    }

    /// A parent with no own lines equals the sum of its active children.
    #[test]
    fn prop_parent_equals_sum_of_active_children(
        children in prop::collection::vec((amount(), amount(), any::<bool>()), 1..12),
    ) {
        let parent = leaf(AccountType::Asset, None, true);
        let mut nodes = vec![parent.clone()];
        let mut rows = Vec::new();
        for (debit, credit, active) in &children {
            let child = leaf(AccountType::Asset, Some(parent.id), *active);
            rows.push((child.id, *debit, *credit));
            nodes.push(child);
        }
        let tree = ChartTree::new(nodes.clone());
        let totals = LineTotals::collect(rows);
        let mut engine = BalanceEngine::new(&tree, &totals);

        let mut expected = Decimal::ZERO;
        for child in nodes.iter().skip(1).filter(|n| n.is_active) {
            expected += engine.balance(child.id).unwrap();
        }
        prop_assert_eq!(engine.balance(parent.id).unwrap(), expected);
    }

    /// `all` agrees with per-account queries.
    #[test]
    fn prop_all_matches_individual(
        amounts in prop::collection::vec((amount(), amount()), 1..10),
    ) {
        let root = leaf(AccountType::Expense, None, true);
        let mut nodes = vec![root.clone()];
        let mut rows = Vec::new();
        for (debit, credit) in &amounts {
            let child = leaf(AccountType::Purchases, Some(root.id), true);
            rows.push((child.id, *debit, *credit));
            nodes.push(child);
        }
        let tree = ChartTree::new(nodes.clone());
        let totals: HashMap<AccountId, LineTotals> = LineTotals::collect(rows);

        let all = BalanceEngine::new(&tree, &totals).all().unwrap();
        for node in &nodes {
            let single = BalanceEngine::new(&tree, &totals).balance(node.id).unwrap();
            prop_assert_eq!(all[&node.id], single);
        }
    }
}
