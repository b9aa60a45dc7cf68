//! Property-based tests for hierarchy rules.

use proptest::prelude::*;
use daftar_shared::types::AccountId;

use super::tree::{AccountNode, ChartTree};
use super::types::AccountType;

/// Strategy producing a random forest: node `i` either is a root or hangs
/// under some node `j < i`, so the generated data is always acyclic.
fn forest_strategy() -> impl Strategy<Value = Vec<Option<usize>>> {
    (1usize..24).prop_flat_map(|size| {
        (0..size)
            .map(|i| {
                if i == 0 {
                    Just(None).boxed()
                } else {
                    prop_oneof![Just(None), (0..i).prop_map(Some)].boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

fn build(parents: &[Option<usize>]) -> (ChartTree, Vec<AccountId>) {
    let ids: Vec<AccountId> = parents.iter().map(|_| AccountId::new()).collect();
    let nodes = parents.iter().enumerate().map(|(i, parent)| AccountNode {
        id: ids[i],
        code: format!("{i:04}"),
        account_type: AccountType::Asset,
        parent_id: parent.map(|p| ids[p]),
        is_active: true,
    });
    (ChartTree::new(nodes), ids)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No account may be re-parented under itself or any of its descendants.
    #[test]
    fn prop_descendants_are_never_valid_parents(parents in forest_strategy()) {
        let (tree, ids) = build(&parents);
        for &id in &ids {
            for descendant in tree.descendants(id) {
                prop_assert!(tree.validate_parent(id, descendant).is_err());
            }
            prop_assert!(tree.validate_parent(id, id).is_err());
        }
    }

    /// Allowed parents are exactly the accounts outside the subtree.
    #[test]
    fn prop_allowed_parents_exclude_subtree(parents in forest_strategy()) {
        let (tree, ids) = build(&parents);
        for &id in &ids {
            let subtree = tree.descendants(id);
            let allowed = tree.allowed_parents(id);
            prop_assert_eq!(allowed.len(), ids.len() - subtree.len() - 1);
            for candidate in allowed {
                prop_assert!(candidate.id != id);
                prop_assert!(!subtree.contains(&candidate.id));
                prop_assert!(tree.validate_parent(id, candidate.id).is_ok());
            }
        }
    }

    /// The hierarchy path always starts at a root and ends at the account.
    #[test]
    fn prop_hierarchy_path_ends_at_account(parents in forest_strategy()) {
        let (tree, ids) = build(&parents);
        for &id in &ids {
            let path = tree.hierarchy_path(id);
            prop_assert_eq!(path.last().map(|n| n.id), Some(id));
            prop_assert!(path.first().is_some_and(|n| n.parent_id.is_none()));
            prop_assert_eq!(path.len(), tree.level(id) + 1);
        }
    }
}
