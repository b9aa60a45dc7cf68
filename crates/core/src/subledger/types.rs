//! Sub-ledger kinds, transaction types, and holders.

use daftar_shared::AppError;
use daftar_shared::types::{BankAccountId, CashboxId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which kind of holder a sub-ledger belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubledgerKind {
    /// Physical cashbox.
    Cash,
    /// Bank account.
    Bank,
}

impl SubledgerKind {
    /// Returns the string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Bank => "bank",
        }
    }
}

/// A sub-ledger transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubledgerTxType {
    /// Money in.
    Deposit,
    /// Money out.
    Withdrawal,
    /// Received from another holder.
    TransferIn,
    /// Sent to another holder.
    TransferOut,
    /// Opening balance recorded as a transaction.
    InitialBalance,
    /// Signed correction.
    Adjustment,
}

impl SubledgerTxType {
    /// All transaction types.
    pub const ALL: [Self; 6] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::TransferIn,
        Self::TransferOut,
        Self::InitialBalance,
        Self::Adjustment,
    ];

    /// Returns the string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
            Self::InitialBalance => "initial_balance",
            Self::Adjustment => "adjustment",
        }
    }

    /// Whether `kind` accepts this transaction type.
    #[must_use]
    pub const fn allowed_for(self, kind: SubledgerKind) -> bool {
        match kind {
            SubledgerKind::Cash => true,
            SubledgerKind::Bank => matches!(self, Self::Deposit | Self::Withdrawal | Self::Adjustment),
        }
    }

    /// The type of the row that cancels this one.
    #[must_use]
    pub const fn offsetting(self) -> Self {
        match self {
            Self::Deposit | Self::InitialBalance => Self::Withdrawal,
            Self::Withdrawal => Self::Deposit,
            Self::TransferIn => Self::TransferOut,
            Self::TransferOut => Self::TransferIn,
            Self::Adjustment => Self::Adjustment,
        }
    }

    /// Validates `amount` for this type on a holder of `kind`.
    ///
    /// # Errors
    ///
    /// Returns an error for unsupported types or non-positive amounts.
    pub fn validate(self, kind: SubledgerKind, amount: Decimal) -> Result<(), SubledgerError> {
        if !self.allowed_for(kind) {
            return Err(SubledgerError::UnsupportedType { kind, tx_type: self });
        }
        match self {
            Self::Adjustment if amount.is_zero() => Err(SubledgerError::ZeroAdjustment),
            Self::Adjustment => Ok(()),
            _ if amount <= Decimal::ZERO => Err(SubledgerError::NonPositiveAmount(amount)),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for SubledgerTxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubledgerTxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown sub-ledger transaction type: {s}"))
    }
}

/// A cash or bank holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SubledgerHolder {
    /// A cashbox.
    Cashbox(CashboxId),
    /// A bank account.
    Bank(BankAccountId),
}

impl SubledgerHolder {
    /// The holder's kind.
    #[must_use]
    pub const fn kind(self) -> SubledgerKind {
        match self {
            Self::Cashbox(_) => SubledgerKind::Cash,
            Self::Bank(_) => SubledgerKind::Bank,
        }
    }

    /// The raw id.
    #[must_use]
    pub fn uuid(self) -> Uuid {
        match self {
            Self::Cashbox(id) => id.into_inner(),
            Self::Bank(id) => id.into_inner(),
        }
    }

    /// Type used when money moves into this holder from another holder.
    #[must_use]
    pub const fn inbound_type(self) -> SubledgerTxType {
        match self {
            Self::Cashbox(_) => SubledgerTxType::TransferIn,
            Self::Bank(_) => SubledgerTxType::Deposit,
        }
    }

    /// Type used when money moves out of this holder to another holder.
    #[must_use]
    pub const fn outbound_type(self) -> SubledgerTxType {
        match self {
            Self::Cashbox(_) => SubledgerTxType::TransferOut,
            Self::Bank(_) => SubledgerTxType::Withdrawal,
        }
    }

    /// Type used to record an opening balance.
    #[must_use]
    pub const fn opening_type(self) -> SubledgerTxType {
        match self {
            Self::Cashbox(_) => SubledgerTxType::InitialBalance,
            Self::Bank(_) => SubledgerTxType::Deposit,
        }
    }
}

impl std::fmt::Display for SubledgerHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cashbox(id) => write!(f, "cashbox:{id}"),
            Self::Bank(id) => write!(f, "bank:{id}"),
        }
    }
}

/// Errors raised by sub-ledger validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubledgerError {
    /// The type is not valid for this holder kind.
    #[error("Transaction type '{tx_type}' is not supported for {} holders", kind.as_str())]
    UnsupportedType {
        /// Holder kind.
        kind: SubledgerKind,
        /// Rejected type.
        tx_type: SubledgerTxType,
    },

    /// Non-adjustment amount must be positive.
    #[error("Transaction amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Adjustments must move the balance.
    #[error("Adjustment amount cannot be zero")]
    ZeroAdjustment,
}

impl SubledgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedType { .. } => "UNSUPPORTED_TRANSACTION_TYPE",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ZeroAdjustment => "ZERO_ADJUSTMENT",
        }
    }
}

impl From<SubledgerError> for AppError {
    fn from(err: SubledgerError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(SubledgerTxType::TransferIn)]
    #[case(SubledgerTxType::TransferOut)]
    #[case(SubledgerTxType::InitialBalance)]
    fn test_bank_rejects_cash_only_types(#[case] tx_type: SubledgerTxType) {
        assert_eq!(
            tx_type.validate(SubledgerKind::Bank, dec!(10)),
            Err(SubledgerError::UnsupportedType {
                kind: SubledgerKind::Bank,
                tx_type
            })
        );
        assert!(tx_type.validate(SubledgerKind::Cash, dec!(10)).is_ok());
    }

    #[test]
    fn test_amount_rules() {
        assert!(SubledgerTxType::Deposit.validate(SubledgerKind::Cash, dec!(0)).is_err());
        assert!(SubledgerTxType::Deposit.validate(SubledgerKind::Cash, dec!(-1)).is_err());
        assert!(SubledgerTxType::Adjustment.validate(SubledgerKind::Bank, dec!(-1)).is_ok());
        assert_eq!(
            SubledgerTxType::Adjustment.validate(SubledgerKind::Cash, dec!(0)),
            Err(SubledgerError::ZeroAdjustment)
        );
    }

    #[test]
    fn test_offsetting_is_allowed_for_same_kind() {
        for tx_type in SubledgerTxType::ALL {
            assert!(tx_type.offsetting().allowed_for(SubledgerKind::Cash));
        }
        for tx_type in [SubledgerTxType::Deposit, SubledgerTxType::Withdrawal] {
            assert!(tx_type.offsetting().allowed_for(SubledgerKind::Bank));
        }
    }

    #[test]
    fn test_holder_transfer_types() {
        let bank = SubledgerHolder::Bank(BankAccountId::new());
        let cashbox = SubledgerHolder::Cashbox(CashboxId::new());
        assert_eq!(bank.inbound_type(), SubledgerTxType::Deposit);
        assert_eq!(cashbox.outbound_type(), SubledgerTxType::TransferOut);
        assert!(bank.opening_type().allowed_for(bank.kind()));
    }
}
