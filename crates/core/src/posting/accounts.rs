//! Account references used by posting rules.

use std::collections::BTreeMap;

use daftar_shared::types::AccountId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::error::PostingError;
use crate::accounts::AccountType;
use crate::subledger::SubledgerHolder;

/// A well-known account a rule posts to, resolved through an [`AccountMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// General cash.
    Cash,
    /// General bank.
    Bank,
    /// Inventory.
    Inventory,
    /// Customer checks awaiting collection.
    ChecksInCollection,
    /// Input tax.
    TaxReceivable,
    /// Accounts receivable.
    AccountsReceivable,
    /// Fixed assets.
    FixedAssets,
    /// Accumulated depreciation.
    AccumulatedDepreciation,
    /// Output tax.
    TaxPayable,
    /// Accounts payable.
    AccountsPayable,
    /// Advances received from customers.
    CustomerAdvances,
    /// Owner's capital.
    Capital,
    /// Sales revenue.
    Sales,
    /// Discounts granted on sales.
    SalesDiscount,
    /// Purchases.
    Purchases,
    /// Cost of goods sold.
    CostOfGoodsSold,
    /// Miscellaneous expenses.
    GeneralExpense,
    /// Bank charges.
    BankFees,
    /// Depreciation expense.
    DepreciationExpense,
}

impl AccountRole {
    /// All roles.
    pub const ALL: [Self; 19] = [
        Self::Cash,
        Self::Bank,
        Self::Inventory,
        Self::ChecksInCollection,
        Self::TaxReceivable,
        Self::AccountsReceivable,
        Self::FixedAssets,
        Self::AccumulatedDepreciation,
        Self::TaxPayable,
        Self::AccountsPayable,
        Self::CustomerAdvances,
        Self::Capital,
        Self::Sales,
        Self::SalesDiscount,
        Self::Purchases,
        Self::CostOfGoodsSold,
        Self::GeneralExpense,
        Self::BankFees,
        Self::DepreciationExpense,
    ];

    /// The configuration key for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
            Self::Inventory => "inventory",
            Self::ChecksInCollection => "checks_in_collection",
            Self::TaxReceivable => "tax_receivable",
            Self::AccountsReceivable => "accounts_receivable",
            Self::FixedAssets => "fixed_assets",
            Self::AccumulatedDepreciation => "accumulated_depreciation",
            Self::TaxPayable => "tax_payable",
            Self::AccountsPayable => "accounts_payable",
            Self::CustomerAdvances => "customer_advances",
            Self::Capital => "capital",
            Self::Sales => "sales",
            Self::SalesDiscount => "sales_discount",
            Self::Purchases => "purchases",
            Self::CostOfGoodsSold => "cost_of_goods_sold",
            Self::GeneralExpense => "general_expense",
            Self::BankFees => "bank_fees",
            Self::DepreciationExpense => "depreciation_expense",
        }
    }
}

impl AccountRole {
    /// The type an account seeded for this role gets.
    #[must_use]
    pub const fn account_type(self) -> AccountType {
        match self {
            Self::Cash
            | Self::Bank
            | Self::Inventory
            | Self::ChecksInCollection
            | Self::TaxReceivable
            | Self::AccountsReceivable
            | Self::FixedAssets
            | Self::AccumulatedDepreciation => AccountType::Asset,
            Self::TaxPayable | Self::AccountsPayable | Self::CustomerAdvances => {
                AccountType::Liability
            }
            Self::Capital => AccountType::Equity,
            Self::Sales | Self::SalesDiscount => AccountType::Revenue,
            Self::Purchases => AccountType::Purchases,
            Self::CostOfGoodsSold
            | Self::GeneralExpense
            | Self::BankFees
            | Self::DepreciationExpense => AccountType::Expense,
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountRole {
    type Err = PostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| PostingError::UnknownRole(s.to_string()))
    }
}

static DEFAULT_CODES: Lazy<BTreeMap<AccountRole, &'static str>> = Lazy::new(|| {
    use AccountRole as R;
    BTreeMap::from([
        (R::Cash, "1010"),
        (R::Bank, "1020"),
        (R::Inventory, "1030"),
        (R::ChecksInCollection, "1040"),
        (R::TaxReceivable, "1070"),
        (R::AccountsReceivable, "1301"),
        (R::FixedAssets, "1500"),
        (R::AccumulatedDepreciation, "1590"),
        (R::TaxPayable, "2030"),
        (R::AccountsPayable, "2101"),
        (R::CustomerAdvances, "2102"),
        (R::Capital, "3010"),
        (R::Sales, "4010"),
        (R::SalesDiscount, "4020"),
        (R::Purchases, "5000"),
        (R::CostOfGoodsSold, "5001"),
        (R::GeneralExpense, "6010"),
        (R::BankFees, "6020"),
        (R::DepreciationExpense, "6030"),
    ])
});

/// Role to account-code mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountMap {
    codes: BTreeMap<AccountRole, String>,
}

impl Default for AccountMap {
    fn default() -> Self {
        Self {
            codes: DEFAULT_CODES
                .iter()
                .map(|(role, code)| (*role, (*code).to_string()))
                .collect(),
        }
    }
}

impl AccountMap {
    /// Applies `role name → code` overrides over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an override names an unknown role or a blank code.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, PostingError> {
        let mut map = Self::default();
        for (name, code) in overrides {
            let role: AccountRole = name.parse()?;
            let code = code.trim();
            if code.is_empty() {
                return Err(PostingError::BlankCode(role));
            }
            map.codes.insert(role, code.to_string());
        }
        Ok(map)
    }

    /// The account code for `role`.
    #[must_use]
    pub fn code(&self, role: AccountRole) -> &str {
        self.codes.get(&role).map_or("", String::as_str)
    }
}

/// How a draft line names its account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum AccountRef {
    /// A well-known role.
    Role(AccountRole),
    /// An explicit account code.
    Code(String),
    /// An explicit account id.
    Id(AccountId),
    /// The GL account linked to a cash/bank holder.
    Holder(SubledgerHolder),
}

impl From<AccountRole> for AccountRef {
    fn from(role: AccountRole) -> Self {
        Self::Role(role)
    }
}

impl From<SubledgerHolder> for AccountRef {
    fn from(holder: SubledgerHolder) -> Self {
        Self::Holder(holder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_every_role() {
        let map = AccountMap::default();
        for role in AccountRole::ALL {
            assert!(!map.code(role).is_empty(), "{role} has no default code");
        }
        assert_eq!(map.code(AccountRole::BankFees), "6020");
        assert_eq!(map.code(AccountRole::CustomerAdvances), "2102");
    }

    #[test]
    fn test_overrides() {
        let overrides = BTreeMap::from([("cash".to_string(), " 1011 ".to_string())]);
        let map = AccountMap::with_overrides(&overrides).unwrap();
        assert_eq!(map.code(AccountRole::Cash), "1011");
        assert_eq!(map.code(AccountRole::Bank), "1020");
    }

    #[test]
    fn test_seed_types_follow_normal_side() {
        assert_eq!(AccountRole::Capital.account_type(), AccountType::Equity);
        assert_eq!(AccountRole::Purchases.account_type(), AccountType::Purchases);
        assert!(AccountRole::SalesDiscount.account_type().is_nominal());
        assert!(!AccountRole::AccumulatedDepreciation.account_type().is_nominal());
    }

    #[test]
    fn test_unknown_role_override() {
        let overrides = BTreeMap::from([("petty_cash".to_string(), "1011".to_string())]);
        assert_eq!(
            AccountMap::with_overrides(&overrides),
            Err(PostingError::UnknownRole("petty_cash".into()))
        );
    }
}
