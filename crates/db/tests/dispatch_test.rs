//! Event dispatch, the posting failure queue, and ledger divergence.

#![allow(clippy::unwrap_used)]

mod common;

use common::{TestLedger, date, setup};
use daftar_core::accounts::AccountType;
use daftar_core::ledger::ReferenceType;
use daftar_core::posting::{
    AccountRole, BankTransfer, BusinessEvent, CheckEvent, HolderTransfer, OpeningBalance, Receipt,
    Settlement,
};
use daftar_core::subledger::{SubledgerHolder, SubledgerTxType};
use daftar_db::entities::{cashboxes, sea_orm_active_enums::FailureStatus};
use daftar_db::repositories::{
    CreateAccountInput, CreateHolderInput, DispatchError, HandlerOutcome, SideEffectOutcome,
};
use daftar_shared::types::{AccountId, BankAccountId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

async fn till(t: &TestLedger, linked: bool) -> (SubledgerHolder, AccountId) {
    let account = t
        .ledger
        .accounts
        .create_account(CreateAccountInput::new("1011", "Till", AccountType::Asset))
        .await
        .unwrap();
    let account_id = AccountId::from_uuid(account.id);
    let mut input = CreateHolderInput::new("Front desk", "USD");
    if linked {
        input = input.linked_to(account_id);
    }
    let holder = t.ledger.subledger.create_cashbox(input).await.unwrap().holder;
    (holder, account_id)
}

async fn bank(t: &TestLedger, code: &str, name: &str) -> (BankAccountId, AccountId) {
    let account = t
        .ledger
        .accounts
        .create_account(CreateAccountInput::new(code, name, AccountType::Asset))
        .await
        .unwrap();
    let account_id = AccountId::from_uuid(account.id);
    let holder = t
        .ledger
        .subledger
        .create_bank_account(CreateHolderInput::new(name, "USD").linked_to(account_id))
        .await
        .unwrap()
        .holder;
    let SubledgerHolder::Bank(id) = holder else {
        panic!("expected a bank account, got {holder}");
    };
    (id, account_id)
}

async fn publish(t: &TestLedger, event: &BusinessEvent) -> Vec<HandlerOutcome> {
    let txn = t.db.begin().await.unwrap();
    let outcomes = t.ledger.dispatcher.publish(&txn, event, Some(t.admin.user_id)).await.unwrap();
    txn.commit().await.unwrap();
    outcomes
}

async fn assert_in_step(t: &TestLedger) {
    let divergent = t.ledger.balances.ledger_divergence().await.unwrap();
    assert!(divergent.is_empty(), "sub-ledgers diverged: {divergent:?}");
}

fn receipt(holder: SubledgerHolder, amount: Decimal) -> BusinessEvent {
    BusinessEvent::ReceiptCreated(Receipt {
        id: Uuid::now_v7(),
        number: "RV000001".to_string(),
        date: date(2025, 5, 10),
        amount,
        settlement: Settlement::Holder(holder),
        counterparty: None,
    })
}

#[tokio::test]
async fn test_receipt_posts_entry_and_deposit_once() {
    let t = setup().await;
    let (holder, till_account) = till(&t, true).await;
    let event = receipt(holder, dec!(250));

    let txn = t.db.begin().await.unwrap();
    let outcomes = t.ledger.dispatcher.publish(&txn, &event, Some(t.admin.user_id)).await.unwrap();
    txn.commit().await.unwrap();

    assert!(matches!(outcomes[0], HandlerOutcome::Posted(_)));
    assert_eq!(outcomes[1], HandlerOutcome::Recorded(1));

    let entries = t
        .ledger
        .journal
        .find_by_reference(ReferenceType::ReceiptVoucher, event.reference_id())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_amount, dec!(250));

    assert_eq!(t.ledger.balances.get_balance(till_account).await.unwrap().balance, dec!(250));
    let receivable = t.account(AccountRole::AccountsReceivable);
    assert_eq!(t.ledger.balances.get_balance(receivable).await.unwrap().balance, dec!(-250));
    assert_eq!(t.ledger.subledger.compute_balance(holder).await.unwrap(), dec!(250));

    // Publishing the same event again is a no-op for both handlers.
    let txn = t.db.begin().await.unwrap();
    let again = t.ledger.dispatcher.publish(&txn, &event, None).await.unwrap();
    txn.commit().await.unwrap();
    assert_eq!(
        again,
        vec![
            HandlerOutcome::Skipped("already posted"),
            HandlerOutcome::Skipped("already recorded")
        ]
    );
    assert!(t.ledger.balances.ledger_divergence().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_strict_publish_surfaces_errors() {
    let t = setup().await;
    let (holder, _) = till(&t, false).await;

    let txn = t.db.begin().await.unwrap();
    let err = t
        .ledger
        .dispatcher
        .publish(&txn, &receipt(holder, dec!(10)), None)
        .await
        .unwrap_err();
    txn.rollback().await.unwrap();

    assert!(matches!(err, DispatchError::HolderNotLinked(h) if h == holder));
    assert_eq!(err.error_code(), "HOLDER_NOT_LINKED");
}

#[tokio::test]
async fn test_failed_side_effect_is_queued_and_retried() {
    let t = setup().await;
    let (holder, till_account) = till(&t, false).await;
    let event = receipt(holder, dec!(99.5));

    let txn = t.db.begin().await.unwrap();
    let outcome = t
        .ledger
        .dispatcher
        .publish_side_effect(&txn, &event, Some(t.admin.user_id))
        .await
        .unwrap();
    txn.commit().await.unwrap();

    let SideEffectOutcome::Queued(failure_id) = outcome else {
        panic!("expected the posting to be queued, got {outcome:?}");
    };

    // Neither handler left anything behind.
    assert!(
        t.ledger
            .journal
            .find_by_reference(ReferenceType::ReceiptVoucher, event.reference_id())
            .await
            .unwrap()
            .is_empty()
    );
    assert!(t.ledger.subledger.list_transactions(holder, None, None).await.unwrap().is_empty());

    let open = t.ledger.failures().list(Some(FailureStatus::Open)).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, failure_id);
    assert_eq!(open[0].handler, "posting");
    assert_eq!(open[0].error_code, "HOLDER_NOT_LINKED");

    // Retrying before the fix fails again and bumps the attempt count.
    let retry = t.ledger.dispatcher.retry_failure(failure_id, None).await.unwrap();
    assert!(!retry.succeeded);
    assert_eq!(retry.failure.attempts, 2);

    let model = cashboxes::Entity::find_by_id(holder.uuid()).one(&t.db).await.unwrap().unwrap();
    let mut active: cashboxes::ActiveModel = model.into();
    active.account_id = Set(Some(till_account.into_inner()));
    active.update(&t.db).await.unwrap();

    let retry = t.ledger.dispatcher.retry_failure(failure_id, Some(t.admin.user_id)).await.unwrap();
    assert!(retry.succeeded);
    assert_eq!(retry.failure.status, FailureStatus::Resolved);
    assert_eq!(retry.failure.attempts, 3);

    assert_eq!(t.ledger.balances.get_balance(till_account).await.unwrap().balance, dec!(99.5));
    assert_eq!(t.ledger.subledger.compute_balance(holder).await.unwrap(), dec!(99.5));
    assert!(t.ledger.failures().list(Some(FailureStatus::Open)).await.unwrap().is_empty());

    let err = t.ledger.dispatcher.retry_failure(failure_id, None).await.unwrap_err();
    assert_eq!(err.error_code(), "POSTING_FAILURE_RESOLVED");
}

#[tokio::test]
async fn test_failure_can_be_resolved_manually() {
    let t = setup().await;
    let (holder, _) = till(&t, false).await;

    let txn = t.db.begin().await.unwrap();
    let SideEffectOutcome::Queued(failure_id) = t
        .ledger
        .dispatcher
        .publish_side_effect(&txn, &receipt(holder, dec!(5)), None)
        .await
        .unwrap()
    else {
        panic!("expected a queued failure");
    };
    txn.commit().await.unwrap();

    let resolved = t
        .ledger
        .failures()
        .resolve(failure_id, "  posted by hand ", Some(t.admin.user_id))
        .await
        .unwrap();
    assert_eq!(resolved.status, FailureStatus::Resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("posted by hand"));
}

#[tokio::test]
async fn test_deleting_entry_leaves_detectable_divergence() {
    let t = setup().await;
    let (holder, till_account) = till(&t, true).await;
    let event = receipt(holder, dec!(120));

    let txn = t.db.begin().await.unwrap();
    t.ledger.dispatcher.publish(&txn, &event, None).await.unwrap();
    txn.commit().await.unwrap();
    assert!(t.ledger.balances.ledger_divergence().await.unwrap().is_empty());

    let entry = t
        .ledger
        .journal
        .find_by_reference(ReferenceType::ReceiptVoucher, event.reference_id())
        .await
        .unwrap()
        .remove(0);
    t.ledger.journal.delete_entry(entry.id, &t.admin).await.unwrap();

    let divergent = t.ledger.balances.ledger_divergence().await.unwrap();
    assert_eq!(divergent.len(), 1);
    assert_eq!(divergent[0].holder, holder);
    assert_eq!(divergent[0].account_id, till_account);
    assert_eq!(divergent[0].delta, dec!(120));

    // Reversing the matching sub-ledger row closes the gap.
    let reversed = t
        .ledger
        .subledger
        .reverse_by_reference(ReferenceType::ReceiptVoucher, event.reference_id(), None)
        .await
        .unwrap();
    assert_eq!(reversed.len(), 1);
    assert_eq!(reversed[0].row.tx_type, SubledgerTxType::Withdrawal);
    assert!(t.ledger.balances.ledger_divergence().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_void_is_applied_once_by_both_handlers() {
    let t = setup().await;
    let (holder, till_account) = till(&t, true).await;
    let created = receipt(holder, dec!(100));
    let BusinessEvent::ReceiptCreated(voucher) = &created else {
        unreachable!()
    };
    let voided = BusinessEvent::ReceiptVoided(voucher.clone());

    publish(&t, &created).await;
    let first = publish(&t, &voided).await;
    assert!(matches!(first[0], HandlerOutcome::Posted(_)));
    assert_eq!(first[1], HandlerOutcome::Recorded(1));

    let second = publish(&t, &voided).await;
    assert_eq!(
        second,
        vec![
            HandlerOutcome::Skipped("already reversed"),
            HandlerOutcome::Skipped("already recorded")
        ]
    );

    let entries = t
        .ledger
        .journal
        .find_by_reference(ReferenceType::ReceiptVoucher, created.reference_id())
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(t.ledger.balances.get_balance(till_account).await.unwrap().balance, dec!(0));
    assert_eq!(t.ledger.subledger.compute_balance(holder).await.unwrap(), dec!(0));
    assert_in_step(&t).await;
}

#[tokio::test]
async fn test_void_without_original_changes_nothing() {
    let t = setup().await;
    let (holder, till_account) = till(&t, true).await;
    let BusinessEvent::ReceiptCreated(voucher) = receipt(holder, dec!(40)) else {
        unreachable!()
    };

    let outcomes = publish(&t, &BusinessEvent::ReceiptVoided(voucher)).await;
    assert_eq!(
        outcomes,
        vec![
            HandlerOutcome::Skipped("nothing to reverse"),
            HandlerOutcome::Skipped("nothing to reverse")
        ]
    );
    assert_eq!(t.ledger.balances.get_balance(till_account).await.unwrap().balance, dec!(0));
    assert!(t.ledger.subledger.list_transactions(holder, None, None).await.unwrap().is_empty());
    assert_in_step(&t).await;
}

#[tokio::test]
async fn test_opening_balance_and_transfers_with_fees_stay_in_step() {
    let t = setup().await;
    let (main, main_account) = bank(&t, "1021", "Main bank").await;
    let (payroll, payroll_account) = bank(&t, "1022", "Payroll bank").await;
    let (holder, till_account) = till(&t, true).await;

    let opening = publish(
        &t,
        &BusinessEvent::OpeningBalanceRecorded(OpeningBalance {
            holder: SubledgerHolder::Bank(main),
            date: date(2025, 1, 1),
            amount: dec!(1000),
        }),
    )
    .await;
    assert!(matches!(opening[0], HandlerOutcome::Posted(_)));
    assert_eq!(opening[1], HandlerOutcome::Recorded(1));
    assert_in_step(&t).await;

    let transfer = publish(
        &t,
        &BusinessEvent::BankTransferred(BankTransfer {
            id: Uuid::now_v7(),
            number: "BT000001".to_string(),
            date: date(2025, 2, 1),
            from: main,
            to: payroll,
            amount: dec!(300),
            fees: dec!(5),
        }),
    )
    .await;
    assert_eq!(transfer[1], HandlerOutcome::Recorded(2));
    assert_in_step(&t).await;

    publish(
        &t,
        &BusinessEvent::HolderTransferred(HolderTransfer {
            id: Uuid::now_v7(),
            number: "TR000001".to_string(),
            date: date(2025, 2, 2),
            from: SubledgerHolder::Bank(payroll),
            to: holder,
            amount: dec!(100),
            fees: dec!(2),
        }),
    )
    .await;
    assert_in_step(&t).await;

    assert_eq!(t.ledger.balances.get_balance(main_account).await.unwrap().balance, dec!(695));
    assert_eq!(t.ledger.balances.get_balance(payroll_account).await.unwrap().balance, dec!(198));
    assert_eq!(t.ledger.balances.get_balance(till_account).await.unwrap().balance, dec!(100));
    let fees = t.account(AccountRole::BankFees);
    assert_eq!(t.ledger.balances.get_balance(fees).await.unwrap().balance, dec!(7));
}

#[tokio::test]
async fn test_check_events_stay_in_step() {
    let t = setup().await;
    let (main, main_account) = bank(&t, "1021", "Main bank").await;
    let check = |amount| CheckEvent {
        id: Uuid::now_v7(),
        number: "CHK-77".to_string(),
        date: date(2025, 4, 2),
        amount,
        bank: Some(main),
    };

    let collected = publish(&t, &BusinessEvent::CheckCollected(check(dec!(250)))).await;
    assert!(matches!(collected[0], HandlerOutcome::Posted(_)));
    assert_eq!(collected[1], HandlerOutcome::Recorded(1));
    assert_in_step(&t).await;

    let bounced = publish(&t, &BusinessEvent::CheckBounced(check(dec!(80)))).await;
    assert!(matches!(bounced[0], HandlerOutcome::Posted(_)));
    assert_eq!(bounced[1], HandlerOutcome::Skipped("no cash or bank movement"));
    assert_in_step(&t).await;

    assert_eq!(t.ledger.balances.get_balance(main_account).await.unwrap().balance, dec!(250));
    let in_collection = t.account(AccountRole::ChecksInCollection);
    assert_eq!(t.ledger.balances.get_balance(in_collection).await.unwrap().balance, dec!(-330));
}
