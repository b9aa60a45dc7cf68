//! In-memory account hierarchy.
//!
//! The repository loads every account once and builds a [`ChartTree`]; all
//! hierarchy rules (cycle prevention, allowed parents, suggested parents,
//! roll-up traversal) are evaluated here without touching the database.

use std::collections::{HashMap, HashSet};

use daftar_shared::types::AccountId;
use thiserror::Error;

use super::types::AccountType;

/// The subset of an account needed for hierarchy and balance rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNode {
    /// The account ID.
    pub id: AccountId,
    /// The account code (unique, sortable).
    pub code: String,
    /// The account type.
    pub account_type: AccountType,
    /// Parent account, if any.
    pub parent_id: Option<AccountId>,
    /// Whether the account is active.
    pub is_active: bool,
}

/// Errors raised by hierarchy validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// Account is not part of the chart.
    #[error("Account not found: {0}")]
    UnknownAccount(AccountId),

    /// An account cannot be its own parent.
    #[error("Account {0} cannot be its own parent")]
    SelfParent(AccountId),

    /// The requested parent lies inside the account's own subtree.
    #[error("Moving account {account} under {parent} would create a cycle")]
    Cycle {
        /// The account being moved.
        account: AccountId,
        /// The rejected parent.
        parent: AccountId,
    },

    /// Parent and child types are not compatible.
    #[error("A {child} account cannot be placed under a {parent} account")]
    IncompatibleParent {
        /// The child's type.
        child: AccountType,
        /// The parent's type.
        parent: AccountType,
    },
}

impl HierarchyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAccount(_) => "ACCOUNT_NOT_FOUND",
            Self::SelfParent(_) => "SELF_PARENT",
            Self::Cycle { .. } => "HIERARCHY_CYCLE",
            Self::IncompatibleParent { .. } => "INCOMPATIBLE_PARENT",
        }
    }
}

impl From<HierarchyError> for daftar_shared::AppError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::UnknownAccount(_) => Self::NotFound(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

/// The chart of accounts as a tree.
#[derive(Debug, Clone, Default)]
pub struct ChartTree {
    nodes: HashMap<AccountId, AccountNode>,
    children: HashMap<AccountId, Vec<AccountId>>,
}

impl ChartTree {
    /// Builds a tree from a flat list of accounts.
    ///
    /// Children lists are ordered by account code. A parent reference to an
    /// account not in the list is kept on the node but ignored for traversal.
    #[must_use]
    pub fn new(nodes: impl IntoIterator<Item = AccountNode>) -> Self {
        let nodes: HashMap<AccountId, AccountNode> =
            nodes.into_iter().map(|node| (node.id, node)).collect();

        let mut children: HashMap<AccountId, Vec<AccountId>> = HashMap::new();
        for node in nodes.values() {
            if let Some(parent_id) = node.parent_id
                && nodes.contains_key(&parent_id)
            {
                children.entry(parent_id).or_default().push(node.id);
            }
        }
        for list in children.values_mut() {
            list.sort_by(|a, b| nodes[a].code.cmp(&nodes[b].code));
        }

        Self { nodes, children }
    }

    /// Number of accounts in the chart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the chart has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up an account.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&AccountNode> {
        self.nodes.get(&id)
    }

    /// Looks up an account by its code.
    #[must_use]
    pub fn find_by_code(&self, code: &str) -> Option<&AccountNode> {
        self.nodes.values().find(|node| node.code == code)
    }

    /// Iterates over every account, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &AccountNode> {
        self.nodes.values()
    }

    /// Direct children of an account, ordered by code.
    #[must_use]
    pub fn children(&self, id: AccountId) -> &[AccountId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Direct children that are active.
    pub fn active_children(&self, id: AccountId) -> impl Iterator<Item = &AccountNode> {
        self.children(id)
            .iter()
            .filter_map(|child| self.nodes.get(child))
            .filter(|child| child.is_active)
    }

    /// Every account below `id` (not including `id` itself).
    #[must_use]
    pub fn descendants(&self, id: AccountId) -> HashSet<AccountId> {
        let mut seen = HashSet::new();
        let mut stack: Vec<AccountId> = self.children(id).to_vec();
        while let Some(next) = stack.pop() {
            if next == id || !seen.insert(next) {
                continue;
            }
            stack.extend_from_slice(self.children(next));
        }
        seen
    }

    /// Ancestors of `id`, nearest first.
    ///
    /// Stops early if stored data contains a cycle.
    #[must_use]
    pub fn ancestors(&self, id: AccountId) -> Vec<AccountId> {
        let mut path = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = self.nodes.get(&id).and_then(|node| node.parent_id);
        while let Some(parent_id) = current {
            if !seen.insert(parent_id) {
                break;
            }
            let Some(parent) = self.nodes.get(&parent_id) else {
                break;
            };
            path.push(parent_id);
            current = parent.parent_id;
        }
        path
    }

    /// The path from the root down to `id`, inclusive.
    #[must_use]
    pub fn hierarchy_path(&self, id: AccountId) -> Vec<&AccountNode> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let mut path: Vec<&AccountNode> = self
            .ancestors(id)
            .into_iter()
            .rev()
            .filter_map(|ancestor| self.nodes.get(&ancestor))
            .collect();
        path.push(node);
        path
    }

    /// Depth of an account; roots are level 0.
    #[must_use]
    pub fn level(&self, id: AccountId) -> usize {
        self.ancestors(id).len()
    }

    /// Checks that `parent` may become the parent of an existing account.
    ///
    /// # Errors
    ///
    /// Returns an error if either account is unknown, if `parent` is the
    /// account itself or one of its descendants, or if the types clash.
    pub fn validate_parent(&self, id: AccountId, parent: AccountId) -> Result<(), HierarchyError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(HierarchyError::UnknownAccount(id))?;
        if id == parent {
            return Err(HierarchyError::SelfParent(id));
        }
        if self.descendants(id).contains(&parent) {
            return Err(HierarchyError::Cycle {
                account: id,
                parent,
            });
        }
        self.validate_new_parent(node.account_type, parent)
    }

    /// Checks that `parent` exists and accepts a child of `account_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is unknown or the types clash.
    pub fn validate_new_parent(
        &self,
        account_type: AccountType,
        parent: AccountId,
    ) -> Result<(), HierarchyError> {
        let parent_node = self
            .nodes
            .get(&parent)
            .ok_or(HierarchyError::UnknownAccount(parent))?;
        if !account_type.can_nest_under(parent_node.account_type) {
            return Err(HierarchyError::IncompatibleParent {
                child: account_type,
                parent: parent_node.account_type,
            });
        }
        Ok(())
    }

    /// Accounts that may become the parent of `id`: active, type-compatible,
    /// and outside the account's own subtree. Ordered by code.
    #[must_use]
    pub fn allowed_parents(&self, id: AccountId) -> Vec<&AccountNode> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let excluded = self.descendants(id);
        let mut allowed: Vec<&AccountNode> = self
            .nodes
            .values()
            .filter(|candidate| {
                candidate.id != id
                    && candidate.is_active
                    && !excluded.contains(&candidate.id)
                    && node.account_type.can_nest_under(candidate.account_type)
            })
            .collect();
        allowed.sort_by(|a, b| a.code.cmp(&b.code));
        allowed
    }

    /// Suggests a parent for a new account from its code.
    ///
    /// Dotted codes (`1010.01`) use the code before the last dot. Otherwise
    /// the longest active, type-compatible code that is a proper prefix of
    /// `code` wins (`101` for `10105`).
    #[must_use]
    pub fn suggest_parent(&self, code: &str, account_type: AccountType) -> Option<&AccountNode> {
        self.suggest_parent_excluding(code, account_type, &HashSet::new())
    }

    /// Suggests a parent for an existing account, never proposing the
    /// account itself or anything in its subtree.
    #[must_use]
    pub fn suggest_parent_for(&self, id: AccountId) -> Option<&AccountNode> {
        let node = self.nodes.get(&id)?;
        let mut excluded = self.descendants(id);
        excluded.insert(id);
        self.suggest_parent_excluding(&node.code, node.account_type, &excluded)
    }

    fn suggest_parent_excluding(
        &self,
        code: &str,
        account_type: AccountType,
        excluded: &HashSet<AccountId>,
    ) -> Option<&AccountNode> {
        let eligible = |node: &&AccountNode| {
            node.is_active
                && !excluded.contains(&node.id)
                && account_type.can_nest_under(node.account_type)
        };

        if let Some((prefix, _)) = code.rsplit_once('.') {
            return self
                .nodes
                .values()
                .filter(eligible)
                .find(|node| node.code == prefix);
        }

        self.nodes
            .values()
            .filter(eligible)
            .filter(|node| node.code.len() < code.len() && code.starts_with(node.code.as_str()))
            .max_by_key(|node| node.code.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(code: &str, account_type: AccountType, parent: Option<&AccountNode>) -> AccountNode {
        AccountNode {
            id: AccountId::new(),
            code: code.to_string(),
            account_type,
            parent_id: parent.map(|p| p.id),
            is_active: true,
        }
    }

    #[test]
    fn test_ancestors_and_path() {
        let assets = node("1", AccountType::Asset, None);
        let current = node("10", AccountType::Asset, Some(&assets));
        let cash = node("1010", AccountType::Asset, Some(&current));
        let tree = ChartTree::new([assets.clone(), current.clone(), cash.clone()]);

        assert_eq!(tree.ancestors(cash.id), vec![current.id, assets.id]);
        let codes: Vec<&str> = tree
            .hierarchy_path(cash.id)
            .iter()
            .map(|n| n.code.as_str())
            .collect();
        assert_eq!(codes, vec!["1", "10", "1010"]);
        assert_eq!(tree.level(cash.id), 2);
        assert_eq!(tree.level(assets.id), 0);
    }

    #[test]
    fn test_cannot_move_under_own_descendant() {
        let assets = node("1", AccountType::Asset, None);
        let cash = node("1010", AccountType::Asset, Some(&assets));
        let tree = ChartTree::new([assets.clone(), cash.clone()]);

        assert_eq!(
            tree.validate_parent(assets.id, cash.id),
            Err(HierarchyError::Cycle {
                account: assets.id,
                parent: cash.id
            })
        );
        assert_eq!(
            tree.validate_parent(assets.id, assets.id),
            Err(HierarchyError::SelfParent(assets.id))
        );
    }

    #[test]
    fn test_allowed_parents_exclude_subtree_and_other_types() {
        let assets = node("1", AccountType::Asset, None);
        let cash = node("1010", AccountType::Asset, Some(&assets));
        let petty = node("101001", AccountType::Asset, Some(&cash));
        let bank = node("1020", AccountType::Asset, Some(&assets));
        let sales = node("4010", AccountType::Revenue, None);
        let tree = ChartTree::new([
            assets.clone(),
            cash.clone(),
            petty.clone(),
            bank.clone(),
            sales,
        ]);

        let allowed: Vec<&str> = tree
            .allowed_parents(cash.id)
            .iter()
            .map(|n| n.code.as_str())
            .collect();
        assert_eq!(allowed, vec!["1", "1020"]);
    }

    #[test]
    fn test_purchases_may_nest_under_expense() {
        let expenses = node("5", AccountType::Expense, None);
        let tree = ChartTree::new([expenses.clone()]);
        assert!(tree
            .validate_new_parent(AccountType::Purchases, expenses.id)
            .is_ok());
        assert!(matches!(
            tree.validate_new_parent(AccountType::Revenue, expenses.id),
            Err(HierarchyError::IncompatibleParent { .. })
        ));
    }

    #[test]
    fn test_suggest_parent_by_longest_prefix() {
        let assets = node("1", AccountType::Asset, None);
        let cash = node("101", AccountType::Asset, Some(&assets));
        let sales = node("10", AccountType::Revenue, None);
        let tree = ChartTree::new([assets, cash.clone(), sales]);

        let suggested = tree.suggest_parent("10105", AccountType::Asset).unwrap();
        assert_eq!(suggested.id, cash.id);
        assert!(tree.suggest_parent("20", AccountType::Liability).is_none());
    }

    #[test]
    fn test_suggest_parent_dotted_code() {
        let cash = node("1010", AccountType::Asset, None);
        let tree = ChartTree::new([cash.clone()]);
        assert_eq!(
            tree.suggest_parent("1010.01", AccountType::Asset).map(|n| n.id),
            Some(cash.id)
        );
        assert!(tree.suggest_parent("1011.01", AccountType::Asset).is_none());
    }

    #[test]
    fn test_suggest_parent_for_skips_subtree() {
        let top = node("101", AccountType::Asset, None);
        let below = node("10", AccountType::Asset, Some(&top));
        let tree = ChartTree::new([top.clone(), below]);
        assert!(tree.suggest_parent_for(top.id).is_none());
    }
}
