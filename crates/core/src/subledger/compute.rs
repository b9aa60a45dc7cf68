//! Sub-ledger balance computation.

use daftar_shared::types::round_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{SubledgerKind, SubledgerTxType};

/// The part of a log row that affects the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubledgerLine {
    /// Transaction type.
    pub tx_type: SubledgerTxType,
    /// Amount as stored (signed only for adjustments).
    pub amount: Decimal,
}

/// Signed effect of one transaction on a holder's balance.
///
/// Cash: deposit, transfer-in and initial-balance add; withdrawal and
/// transfer-out subtract. Bank: deposit adds, withdrawal subtracts.
/// Adjustments apply their signed amount. Types a kind does not recognise
/// have no effect.
#[must_use]
pub fn signed_effect(kind: SubledgerKind, tx_type: SubledgerTxType, amount: Decimal) -> Decimal {
    use SubledgerTxType as T;
    match (kind, tx_type) {
        (_, T::Adjustment | T::Deposit) | (SubledgerKind::Cash, T::TransferIn | T::InitialBalance) => {
            amount
        }
        (_, T::Withdrawal) | (SubledgerKind::Cash, T::TransferOut) => -amount,
        (SubledgerKind::Bank, T::TransferIn | T::TransferOut | T::InitialBalance) => Decimal::ZERO,
    }
}

/// `initial + Σ credit-type − Σ debit-type`, rounded to ledger precision.
#[must_use]
pub fn compute_balance<I>(kind: SubledgerKind, initial_balance: Decimal, lines: I) -> Decimal
where
    I: IntoIterator<Item = SubledgerLine>,
{
    let movement: Decimal = lines
        .into_iter()
        .map(|line| signed_effect(kind, line.tx_type, line.amount))
        .sum();
    round_amount(initial_balance + movement)
}

/// Result of re-syncing a cached balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    /// Cached value before the sync.
    pub previous: Decimal,
    /// Value computed from the log, now cached.
    pub current: Decimal,
    /// Whether the cache was overwritten.
    pub changed: bool,
}

impl SyncOutcome {
    /// Compares a cached value with a freshly computed one.
    #[must_use]
    pub fn new(previous: Decimal, current: Decimal) -> Self {
        Self {
            previous,
            current,
            changed: round_amount(previous) != round_amount(current),
        }
    }

    /// `current - previous`.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.current - self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(tx_type: SubledgerTxType, amount: Decimal) -> SubledgerLine {
        SubledgerLine { tx_type, amount }
    }

    #[test]
    fn test_cashbox_balance() {
        let balance = compute_balance(
            SubledgerKind::Cash,
            Decimal::ZERO,
            [
                line(SubledgerTxType::Deposit, dec!(50)),
                line(SubledgerTxType::Withdrawal, dec!(20)),
                line(SubledgerTxType::TransferIn, dec!(10)),
            ],
        );
        assert_eq!(balance, dec!(40));
    }

    #[test]
    fn test_bank_ignores_cash_only_types() {
        let balance = compute_balance(
            SubledgerKind::Bank,
            dec!(100),
            [
                line(SubledgerTxType::Deposit, dec!(50)),
                line(SubledgerTxType::TransferIn, dec!(999)),
                line(SubledgerTxType::Withdrawal, dec!(30)),
            ],
        );
        assert_eq!(balance, dec!(120));
    }

    #[test]
    fn test_signed_adjustment() {
        let balance = compute_balance(
            SubledgerKind::Cash,
            dec!(10),
            [line(SubledgerTxType::Adjustment, dec!(-4))],
        );
        assert_eq!(balance, dec!(6));
    }

    #[test]
    fn test_sync_outcome() {
        let outcome = SyncOutcome::new(dec!(30), dec!(40));
        assert!(outcome.changed);
        assert_eq!(outcome.delta(), dec!(10));
        assert!(!SyncOutcome::new(dec!(40), dec!(40.0)).changed);
    }
}
