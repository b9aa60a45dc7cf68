//! Account types and balance sign rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Which side of the ledger increases an account's balance.
///
/// - Asset/Expense/Purchases: balance += debit - credit (debit-normal)
/// - Liability/Equity/Revenue: balance += credit - debit (credit-normal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalBalance {
    /// Debit-normal accounts.
    Debit,
    /// Credit-normal accounts.
    Credit,
}

impl NormalBalance {
    /// Calculates the signed balance contribution of a debit/credit pair.
    #[must_use]
    pub fn signed(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Things owned (cash, bank, receivables, inventory, fixed assets).
    Asset,
    /// Amounts owed (payables, tax payable, customer advances).
    Liability,
    /// Owner's capital and retained earnings.
    Equity,
    /// Sales and other income.
    Revenue,
    /// Operating expenses.
    Expense,
    /// Purchases of goods for resale.
    Purchases,
}

impl AccountType {
    /// All account types, in chart order.
    pub const ALL: [Self; 6] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
        Self::Purchases,
    ];

    /// Returns the string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
            Self::Purchases => "purchases",
        }
    }

    /// Returns the normal-balance side for this type.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense | Self::Purchases => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }

    /// Returns true if an account of this type may sit under `parent`.
    ///
    /// Children share their parent's type, except that purchases may be
    /// grouped under an expense heading.
    #[must_use]
    pub fn can_nest_under(self, parent: Self) -> bool {
        self == parent || (self == Self::Purchases && parent == Self::Expense)
    }

    /// Returns true for the temporary accounts zeroed by year-end closing.
    #[must_use]
    pub const fn is_nominal(self) -> bool {
        matches!(self, Self::Revenue | Self::Expense | Self::Purchases)
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "revenue" | "sales" => Ok(Self::Revenue),
            "expense" => Ok(Self::Expense),
            "purchases" => Ok(Self::Purchases),
            _ => Err(format!("Unknown account type: {s}")),
        }
    }
}
