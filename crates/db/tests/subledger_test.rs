//! Cash and bank sub-ledger synchronisation.

#![allow(clippy::unwrap_used)]

mod common;

use common::{connect, date};
use daftar_core::permission::Actor;
use daftar_core::subledger::{SubledgerHolder, SubledgerTxType};
use daftar_db::entities::cashboxes;
use daftar_db::repositories::{
    AuditAction, AuditFilter, CreateHolderInput, ReconcileMode, RecordInput, SubledgerRepoError,
};
use daftar_db::{AuditRepository, BalanceRepository, SubledgerRepository};
use daftar_shared::types::{UserId, round_amount};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

async fn cashbox(subledger: &SubledgerRepository) -> SubledgerHolder {
    subledger
        .create_cashbox(CreateHolderInput::new("Main till", "USD"))
        .await
        .unwrap()
        .holder
}

async fn record(subledger: &SubledgerRepository, holder: SubledgerHolder, tx_type: SubledgerTxType, amount: Decimal) {
    subledger
        .record(RecordInput::new(holder, tx_type, amount, date(2025, 4, 1)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sync_balance_from_log() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db);
    let till = cashbox(&subledger).await;

    record(&subledger, till, SubledgerTxType::Deposit, dec!(50)).await;
    record(&subledger, till, SubledgerTxType::Withdrawal, dec!(20)).await;
    record(&subledger, till, SubledgerTxType::TransferIn, dec!(10)).await;

    let first = subledger.sync_balance(till).await.unwrap();
    assert_eq!(first.current, dec!(40));
    // Each record already re-synced the cache.
    assert!(!first.changed);

    let second = subledger.sync_balance(till).await.unwrap();
    assert_eq!(second.current, first.current);
    assert!(!second.changed);

    let summary = subledger.find_holder(till).await.unwrap().unwrap();
    assert_eq!(summary.balance, dec!(40));
}

#[tokio::test]
async fn test_initial_balance_and_signed_adjustment() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db);
    let bank = subledger
        .create_bank_account(CreateHolderInput::new("Operating", "USD").with_initial_balance(dec!(1000)))
        .await
        .unwrap()
        .holder;

    record(&subledger, bank, SubledgerTxType::Withdrawal, dec!(250.5)).await;
    record(&subledger, bank, SubledgerTxType::Adjustment, dec!(-0.5)).await;

    assert_eq!(subledger.compute_balance(bank).await.unwrap(), dec!(749));
}

#[tokio::test]
async fn test_invalid_amounts_are_rejected() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db);
    let till = cashbox(&subledger).await;

    let err = subledger
        .record(RecordInput::new(till, SubledgerTxType::Deposit, dec!(-5), date(2025, 4, 1)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NON_POSITIVE_AMOUNT");

    let err = subledger
        .record(RecordInput::new(till, SubledgerTxType::Adjustment, dec!(0), date(2025, 4, 1)))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ZERO_ADJUSTMENT");
    assert!(subledger.list_transactions(till, None, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_inactive_holder_rejects_movements() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db.clone());
    let till = cashbox(&subledger).await;

    let model = cashboxes::Entity::find_by_id(till.uuid()).one(&db).await.unwrap().unwrap();
    let mut active: cashboxes::ActiveModel = model.into();
    active.is_active = Set(false);
    active.update(&db).await.unwrap();

    let err = subledger
        .record(RecordInput::new(till, SubledgerTxType::Deposit, dec!(5), date(2025, 4, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, SubledgerRepoError::HolderInactive(h) if h == till));
}

#[tokio::test]
async fn test_reversal_offsets_once() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db.clone());
    let till = cashbox(&subledger).await;

    record(&subledger, till, SubledgerTxType::Deposit, dec!(80)).await;
    let withdrawal = subledger
        .record(RecordInput::new(till, SubledgerTxType::Withdrawal, dec!(30), date(2025, 4, 2)).describe("Stationery"))
        .await
        .unwrap();

    let user = UserId::new();
    let reversal = subledger
        .reverse_transaction(till, withdrawal.row.id.into_inner(), Some(user))
        .await
        .unwrap();
    assert_eq!(reversal.row.tx_type, SubledgerTxType::Deposit);
    assert_eq!(reversal.sync.current, dec!(80));

    let err = subledger
        .reverse_transaction(till, withdrawal.row.id.into_inner(), Some(user))
        .await
        .unwrap_err();
    assert!(matches!(err, SubledgerRepoError::AlreadyReversed(_)));

    let audit = AuditRepository::new(db)
        .list(AuditFilter {
            action: Some(AuditAction::SubledgerReversed),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor_id, Some(user.into_inner()));
}

#[tokio::test]
async fn test_reconcile_repairs_corrupted_cache() {
    let db = connect().await;
    let subledger = SubledgerRepository::new(db.clone());
    let balances = BalanceRepository::new(db.clone());
    let till = cashbox(&subledger).await;
    record(&subledger, till, SubledgerTxType::Deposit, dec!(40)).await;

    // Simulate a cache written by something other than the sync path.
    let model = cashboxes::Entity::find_by_id(till.uuid()).one(&db).await.unwrap().unwrap();
    let mut active: cashboxes::ActiveModel = model.into();
    active.balance = Set(dec!(55));
    active.update(&db).await.unwrap();

    let dry = balances.reconcile_subledgers(ReconcileMode::DryRun).await.unwrap();
    assert!(!dry.applied);
    assert_eq!(dry.drifts.len(), 1);
    assert_eq!(dry.drifts[0].drift.delta, dec!(-15));
    let still = subledger.find_holder(till).await.unwrap().unwrap();
    assert_eq!(round_amount(still.balance), dec!(55));

    let admin = Actor::superuser(UserId::new());
    let applied = balances.reconcile_subledgers(ReconcileMode::Apply(&admin)).await.unwrap();
    assert!(applied.applied);
    assert_eq!(applied.drifts.len(), 1);
    let fixed = subledger.find_holder(till).await.unwrap().unwrap();
    assert_eq!(fixed.balance, dec!(40));

    let again = balances.reconcile_subledgers(ReconcileMode::DryRun).await.unwrap();
    assert!(again.drifts.is_empty());
}
