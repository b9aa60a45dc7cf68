//! Year-end closing and account reconciliation.

#![allow(clippy::unwrap_used)]

mod common;

use common::{TestLedger, date, setup};
use daftar_core::closing::ClosingError;
use daftar_core::ledger::{CreateEntryInput, JournalLineInput, LedgerError, ReferenceType};
use daftar_core::permission::{Actor, Permission};
use daftar_core::posting::AccountRole;
use daftar_db::entities::accounts;
use daftar_db::repositories::{
    AuditAction, AuditFilter, BalanceError, ClosingRepoError, JournalError, ReconcileMode,
};
use daftar_shared::types::{AccountId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

async fn post(t: &TestLedger, on: chrono::NaiveDate, debit: AccountId, credit: AccountId, amount: Decimal) {
    t.ledger
        .journal
        .create_entry(CreateEntryInput::new(
            on,
            ReferenceType::Manual,
            "Test posting",
            vec![
                JournalLineInput::debit(debit, amount),
                JournalLineInput::credit(credit, amount),
            ],
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close_year_zeroes_nominal_accounts() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let sales = t.account(AccountRole::Sales);
    let expense = t.account(AccountRole::GeneralExpense);
    let capital = t.account(AccountRole::Capital);

    post(&t, date(2025, 3, 1), cash, sales, dec!(1000)).await;
    post(&t, date(2025, 4, 1), expense, cash, dec!(300)).await;
    // Next year's activity stays out of the close.
    post(&t, date(2026, 1, 5), cash, sales, dec!(50)).await;

    let closed = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &t.admin)
        .await
        .unwrap();
    assert_eq!(closed.marker.net_income, dec!(700));
    assert_eq!(closed.entry.entry.total_amount, dec!(1000));
    assert!(t.ledger.closing.is_closed(2025).await.unwrap());

    let at_close = date(2025, 12, 31);
    for account in [sales, expense] {
        let balance = t.ledger.balances.get_balance_as_of(account, at_close).await.unwrap();
        assert_eq!(balance.balance, Decimal::ZERO);
    }
    assert_eq!(t.ledger.balances.get_balance(capital).await.unwrap().balance, dec!(700));
    assert_eq!(t.ledger.balances.get_balance(sales).await.unwrap().balance, dec!(50));

    let audit = t
        .ledger
        .audit
        .list(AuditFilter {
            action: Some(AuditAction::YearClosed),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn test_closed_year_rejects_new_postings_and_second_close() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let sales = t.account(AccountRole::Sales);
    let capital = t.account(AccountRole::Capital);
    post(&t, date(2025, 6, 1), cash, sales, dec!(10)).await;
    t.ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &t.admin)
        .await
        .unwrap();

    let err = t
        .ledger
        .journal
        .create_entry(CreateEntryInput::new(
            date(2025, 7, 1),
            ReferenceType::Manual,
            "Late",
            vec![
                JournalLineInput::debit(cash, dec!(1)),
                JournalLineInput::credit(sales, dec!(1)),
            ],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, JournalError::Ledger(LedgerError::YearClosed(2025))));

    let err = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &t.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::AlreadyClosed(2025))));
}

#[tokio::test]
async fn test_close_year_validation() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let capital = t.account(AccountRole::Capital);

    let err = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &t.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::NothingToClose(2025))));

    let err = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), cash, &t.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::Closing(ClosingError::CapitalNotEquity(_))));

    let err = t
        .ledger
        .closing
        .close_year(2025, date(2026, 1, 1), capital, &t.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::InvalidDate { year: 2025, .. }));
    assert_eq!(err.error_code(), "INVALID_CLOSING_DATE");

    let clerk = Actor::new(UserId::new(), [Permission::AddJournalEntries]);
    let err = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &clerk)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::Permission(_)));
}

#[tokio::test]
async fn test_mid_year_close_is_rejected_and_leaves_year_open() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let sales = t.account(AccountRole::Sales);
    let capital = t.account(AccountRole::Capital);

    post(&t, date(2025, 3, 1), cash, sales, dec!(400)).await;
    post(&t, date(2025, 9, 1), cash, sales, dec!(600)).await;

    let err = t
        .ledger
        .closing
        .close_year(2025, date(2025, 6, 30), capital, &t.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ClosingRepoError::InvalidDate { year: 2025, .. }));
    assert!(!t.ledger.closing.is_closed(2025).await.unwrap());

    // Activity after the rejected date is still postable and closes in full.
    post(&t, date(2025, 11, 1), cash, sales, dec!(5)).await;
    let closed = t
        .ledger
        .closing
        .close_year(2025, date(2025, 12, 31), capital, &t.admin)
        .await
        .unwrap();
    assert_eq!(closed.marker.net_income, dec!(1005));
    assert_eq!(t.ledger.balances.get_balance(sales).await.unwrap().balance, dec!(0));
}

#[tokio::test]
async fn test_account_reconciliation_dry_run_then_apply() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let sales = t.account(AccountRole::Sales);
    post(&t, date(2025, 2, 1), cash, sales, dec!(200)).await;

    let model = accounts::Entity::find_by_id(cash.into_inner()).one(&t.db).await.unwrap().unwrap();
    let mut active: accounts::ActiveModel = model.into();
    active.balance = Set(Some(dec!(180)));
    active.update(&t.db).await.unwrap();

    let dry = t.ledger.balances.reconcile_accounts(ReconcileMode::DryRun).await.unwrap();
    assert!(!dry.applied);
    assert_eq!(dry.checked, AccountRole::ALL.len());
    assert_eq!(dry.drifts.len(), 1);
    assert_eq!(dry.drifts[0].account_id, cash);
    assert_eq!(dry.drifts[0].drift.delta, dec!(20));

    let clerk = Actor::new(UserId::new(), [Permission::ViewJournalEntries]);
    let err = t
        .ledger
        .balances
        .reconcile_accounts(ReconcileMode::Apply(&clerk))
        .await
        .unwrap_err();
    assert!(matches!(err, BalanceError::Permission(_)));

    let applied = t
        .ledger
        .balances
        .reconcile_accounts(ReconcileMode::Apply(&t.admin))
        .await
        .unwrap();
    assert!(applied.applied);
    assert_eq!(applied.drifts.len(), 1);

    let audit = t
        .ledger
        .audit
        .list(AuditFilter {
            entity_id: Some(cash.into_inner()),
            ..AuditFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::AccountBalanceCorrected.as_str());

    let again = t.ledger.balances.reconcile_accounts(ReconcileMode::DryRun).await.unwrap();
    assert!(again.drifts.is_empty());
}

#[tokio::test]
async fn test_trial_balance_lists_every_account() {
    let t = setup().await;
    let cash = t.account(AccountRole::Cash);
    let sales = t.account(AccountRole::Sales);
    post(&t, date(2025, 2, 1), cash, sales, dec!(42)).await;

    let rows = t.ledger.balances.trial_balance(None).await.unwrap();
    assert_eq!(rows.len(), AccountRole::ALL.len());
    let debit: Decimal = rows.iter().map(|r| r.debit_total).sum();
    let credit: Decimal = rows.iter().map(|r| r.credit_total).sum();
    assert_eq!(debit, credit);
    assert_eq!(rows[0].code, "1010");
}
