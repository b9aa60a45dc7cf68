//! Recursive balance roll-up over the chart of accounts.

use std::collections::{HashMap, HashSet};

use daftar_shared::types::{AccountId, round_amount};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::ChartTree;

/// Debit and credit totals of one account's own journal lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
    /// Number of lines summed.
    pub line_count: u64,
}

impl LineTotals {
    /// Adds one journal line.
    pub fn add(&mut self, debit: Decimal, credit: Decimal) {
        self.debit += debit;
        self.credit += credit;
        self.line_count += 1;
    }

    /// Builds per-account totals from `(account, debit, credit)` rows.
    pub fn collect<I>(rows: I) -> HashMap<AccountId, Self>
    where
        I: IntoIterator<Item = (AccountId, Decimal, Decimal)>,
    {
        let mut totals: HashMap<AccountId, Self> = HashMap::new();
        for (account_id, debit, credit) in rows {
            totals.entry(account_id).or_default().add(debit, credit);
        }
        totals
    }
}

/// Where an account's balance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSource {
    /// The account's own journal lines.
    OwnLines,
    /// The sum of its active children.
    Children,
    /// No lines and no active children.
    Empty,
}

/// Account balance with its raw totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Total debit amount of the account's own lines.
    pub debit_total: Decimal,
    /// Total credit amount of the account's own lines.
    pub credit_total: Decimal,
    /// Derived balance under the account's normal-balance convention.
    pub balance: Decimal,
    /// How the balance was derived.
    pub source: BalanceSource,
}

/// Errors raised while rolling balances up the tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollupError {
    /// Account is not part of the chart.
    #[error("Account not found: {0}")]
    UnknownAccount(AccountId),

    /// Stored parent links form a loop through this account.
    #[error("Account hierarchy contains a cycle at {0}")]
    Cycle(AccountId),
}

impl RollupError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownAccount(_) => "ACCOUNT_NOT_FOUND",
            Self::Cycle(_) => "HIERARCHY_CYCLE",
        }
    }
}

impl From<RollupError> for daftar_shared::AppError {
    fn from(err: RollupError) -> Self {
        match err {
            RollupError::UnknownAccount(_) => Self::NotFound(err.to_string()),
            RollupError::Cycle(_) => Self::Internal(err.to_string()),
        }
    }
}

/// Computes balances on demand, memoising each account once.
pub struct BalanceEngine<'a> {
    tree: &'a ChartTree,
    totals: &'a HashMap<AccountId, LineTotals>,
    memo: HashMap<AccountId, Decimal>,
}

impl<'a> BalanceEngine<'a> {
    /// Creates an engine over a chart and the per-account line totals.
    #[must_use]
    pub fn new(tree: &'a ChartTree, totals: &'a HashMap<AccountId, LineTotals>) -> Self {
        Self {
            tree,
            totals,
            memo: HashMap::new(),
        }
    }

    /// Returns how `id`'s balance is derived.
    #[must_use]
    pub fn source(&self, id: AccountId) -> BalanceSource {
        if self.has_own_lines(id) {
            BalanceSource::OwnLines
        } else if self.tree.active_children(id).next().is_some() {
            BalanceSource::Children
        } else {
            BalanceSource::Empty
        }
    }

    /// Derived balance of one account.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown or the stored hierarchy
    /// loops.
    pub fn balance(&mut self, id: AccountId) -> Result<Decimal, RollupError> {
        let mut visiting = HashSet::new();
        self.resolve(id, &mut visiting)
    }

    /// Balance plus totals for one account.
    ///
    /// # Errors
    ///
    /// Same as [`Self::balance`].
    pub fn account_balance(&mut self, id: AccountId) -> Result<AccountBalance, RollupError> {
        let balance = self.balance(id)?;
        let totals = self.totals.get(&id).copied().unwrap_or_default();
        Ok(AccountBalance {
            account_id: id,
            debit_total: totals.debit,
            credit_total: totals.credit,
            balance,
            source: self.source(id),
        })
    }

    /// Derived balance of every account in the chart.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored hierarchy loops.
    pub fn all(&mut self) -> Result<HashMap<AccountId, Decimal>, RollupError> {
        let ids: Vec<AccountId> = self.tree.nodes().map(|node| node.id).collect();
        let mut balances = HashMap::with_capacity(ids.len());
        for id in ids {
            balances.insert(id, self.balance(id)?);
        }
        Ok(balances)
    }

    fn has_own_lines(&self, id: AccountId) -> bool {
        self.totals.get(&id).is_some_and(|t| t.line_count > 0)
    }

    fn resolve(
        &mut self,
        id: AccountId,
        visiting: &mut HashSet<AccountId>,
    ) -> Result<Decimal, RollupError> {
        if let Some(balance) = self.memo.get(&id) {
            return Ok(*balance);
        }
        let (tree, totals) = (self.tree, self.totals);
        let node = tree.get(id).ok_or(RollupError::UnknownAccount(id))?;
        if !visiting.insert(id) {
            return Err(RollupError::Cycle(id));
        }

        let balance = match totals.get(&id) {
            Some(totals) if totals.line_count > 0 => node
                .account_type
                .normal_balance()
                .signed(totals.debit, totals.credit),
            _ => {
                let mut sum = Decimal::ZERO;
                for child in tree.active_children(id) {
                    sum += self.resolve(child.id, visiting)?;
                }
                sum
            }
        };

        visiting.remove(&id);
        let balance = round_amount(balance);
        self.memo.insert(id, balance);
        Ok(balance)
    }
}
