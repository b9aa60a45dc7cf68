//! Balance queries and reconciliation.
//!
//! Balances are always recomputed from journal lines; cached values on
//! accounts and holders are only compared against the recomputed ones.
//! Reconciliation runs under one transaction and only commits when the
//! caller asks for corrections to be applied.

use chrono::NaiveDate;
use daftar_core::accounts::AccountType;
use daftar_core::balance::{AccountBalance, BalanceEngine, BalanceSource, Drift, RollupError};
use daftar_core::permission::{Actor, Permission, PermissionDenied};
use daftar_core::subledger::SubledgerHolder;
use daftar_shared::types::{AccountId, UserId, round_amount};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::audit::{AuditAction, AuditRecord, AuditRepository};
use super::ledger_state::{load_line_totals, load_tree};
use super::subledger::{SubledgerRepoError, computed_in, find_holder_in, list_holders_in, sync_locked};
use crate::entities::accounts;

/// Error types for balance operations.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Hierarchy could not be rolled up.
    #[error(transparent)]
    Rollup(#[from] RollupError),

    /// Actor may not apply corrections.
    #[error(transparent)]
    Permission(#[from] PermissionDenied),

    /// Sub-ledger failure during reconciliation.
    #[error(transparent)]
    Subledger(#[from] SubledgerRepoError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl BalanceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Rollup(e) => e.error_code(),
            Self::Permission(e) => e.error_code(),
            Self::Subledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<BalanceError> for daftar_shared::AppError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::NotFound(_) => Self::NotFound(err.to_string()),
            BalanceError::Rollup(e) => e.into(),
            BalanceError::Permission(e) => e.into(),
            BalanceError::Subledger(e) => e.into(),
            BalanceError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Whether a reconciliation pass may write.
#[derive(Debug, Clone, Copy)]
pub enum ReconcileMode<'a> {
    /// Report drift; never commit.
    DryRun,
    /// Overwrite drifted caches and audit each correction.
    Apply(&'a Actor),
}

impl ReconcileMode<'_> {
    const fn applies(&self) -> bool {
        matches!(self, Self::Apply(_))
    }

    fn actor(&self) -> Option<UserId> {
        match self {
            Self::DryRun => None,
            Self::Apply(actor) => Some(actor.user_id),
        }
    }
}

/// One row of a trial balance.
#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceRow {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Sum of own debits.
    pub debit_total: Decimal,
    /// Sum of own credits.
    pub credit_total: Decimal,
    /// Derived balance.
    pub balance: Decimal,
    /// How the balance was derived.
    pub source: BalanceSource,
}

/// A drifted account cache.
#[derive(Debug, Clone, Serialize)]
pub struct AccountDrift {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Cached versus computed.
    pub drift: Drift,
}

/// A drifted holder cache.
#[derive(Debug, Clone, Serialize)]
pub struct HolderDrift {
    /// The holder.
    pub holder: SubledgerHolder,
    /// Holder name.
    pub name: String,
    /// Cached versus computed.
    pub drift: Drift,
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport<T> {
    /// Whether corrections were committed.
    pub applied: bool,
    /// Number of rows checked.
    pub checked: usize,
    /// Rows whose cache disagreed with the recomputed value.
    pub drifts: Vec<T>,
}

/// A holder whose sub-ledger balance disagrees with its linked GL account.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerDivergence {
    /// The holder.
    pub holder: SubledgerHolder,
    /// Holder name.
    pub name: String,
    /// Linked GL account.
    pub account_id: AccountId,
    /// Balance computed from the holder's log.
    pub subledger_balance: Decimal,
    /// Balance computed from the GL account's lines.
    pub ledger_balance: Decimal,
    /// `subledger_balance - ledger_balance`.
    pub delta: Decimal,
}

/// Balance repository.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Current balance of one account.
    pub async fn get_balance(&self, account_id: AccountId) -> Result<AccountBalance, BalanceError> {
        self.balance_at(account_id, None).await
    }

    /// Balance of one account counting only entries dated on or before
    /// `as_of`.
    pub async fn get_balance_as_of(
        &self,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<AccountBalance, BalanceError> {
        self.balance_at(account_id, Some(as_of)).await
    }

    async fn balance_at(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<AccountBalance, BalanceError> {
        let tree = load_tree(&self.db).await?;
        if tree.get(account_id).is_none() {
            return Err(BalanceError::NotFound(account_id));
        }
        let totals = load_line_totals(&self.db, as_of).await?;
        Ok(BalanceEngine::new(&tree, &totals).account_balance(account_id)?)
    }

    /// Every account with its totals and derived balance, ordered by code.
    pub async fn trial_balance(&self, as_of: Option<NaiveDate>) -> Result<Vec<TrialBalanceRow>, BalanceError> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await?;
        let tree = load_tree(&self.db).await?;
        let totals = load_line_totals(&self.db, as_of).await?;
        let mut engine = BalanceEngine::new(&tree, &totals);

        let mut rows = Vec::with_capacity(models.len());
        for model in models {
            let balance = engine.account_balance(AccountId::from_uuid(model.id))?;
            rows.push(TrialBalanceRow {
                account_id: balance.account_id,
                code: model.code,
                name: model.name,
                account_type: model.account_type.into(),
                debit_total: balance.debit_total,
                credit_total: balance.credit_total,
                balance: balance.balance,
                source: balance.source,
            });
        }
        Ok(rows)
    }

    /// Compares every account's cached balance with the recomputed one.
    ///
    /// In [`ReconcileMode::Apply`] drifted caches are overwritten and each
    /// correction is audited; otherwise nothing is written.
    pub async fn reconcile_accounts(
        &self,
        mode: ReconcileMode<'_>,
    ) -> Result<ReconciliationReport<AccountDrift>, BalanceError> {
        if let ReconcileMode::Apply(actor) = mode {
            actor.require(Permission::ApplyReconciliation)?;
        }

        let txn = self.db.begin().await?;
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::Code)
            .all(&txn)
            .await?;
        let tree = load_tree(&txn).await?;
        let totals = load_line_totals(&txn, None).await?;
        let mut engine = BalanceEngine::new(&tree, &totals);

        let checked = models.len();
        let mut drifts = Vec::new();
        for model in models {
            let account_id = AccountId::from_uuid(model.id);
            let computed = engine.balance(account_id)?;
            let Some(drift) = Drift::between(model.balance.map(round_amount), computed) else {
                continue;
            };

            if mode.applies() {
                accounts::Entity::update_many()
                    .col_expr(accounts::Column::Balance, Expr::value(Some(drift.computed)))
                    .filter(accounts::Column::Id.eq(model.id))
                    .exec(&txn)
                    .await?;
                AuditRepository::record_in(
                    &txn,
                    AuditRecord {
                        action: AuditAction::AccountBalanceCorrected,
                        entity_type: "account",
                        entity_id: model.id,
                        actor: mode.actor(),
                        details: json!({
                            "code": model.code,
                            "old": drift.cached,
                            "new": drift.computed,
                            "delta": drift.delta,
                        }),
                    },
                )
                .await?;
                info!(code = %model.code, delta = %drift.delta, "account balance corrected");
            }
            drifts.push(AccountDrift {
                account_id,
                code: model.code,
                drift,
            });
        }

        finish(txn, mode).await?;
        Ok(ReconciliationReport {
            applied: mode.applies(),
            checked,
            drifts,
        })
    }

    /// Compares every cashbox and bank account cache with its log.
    pub async fn reconcile_subledgers(
        &self,
        mode: ReconcileMode<'_>,
    ) -> Result<ReconciliationReport<HolderDrift>, BalanceError> {
        if let ReconcileMode::Apply(actor) = mode {
            actor.require(Permission::ApplyReconciliation)?;
        }

        let txn = self.db.begin().await?;
        let holders = list_holders_in(&txn).await?;
        let checked = holders.len();
        let mut drifts = Vec::new();

        for listed in holders {
            let Some(summary) = find_holder_in(&txn, listed.holder, mode.applies()).await? else {
                continue;
            };
            let computed = computed_in(&txn, &summary).await?;
            let Some(drift) = Drift::between(Some(summary.balance), computed) else {
                continue;
            };

            if mode.applies() {
                sync_locked(&txn, &summary).await?;
                AuditRepository::record_in(
                    &txn,
                    AuditRecord {
                        action: AuditAction::HolderBalanceCorrected,
                        entity_type: summary.holder.kind().as_str(),
                        entity_id: summary.holder.uuid(),
                        actor: mode.actor(),
                        details: json!({
                            "name": summary.name,
                            "old": drift.cached,
                            "new": drift.computed,
                            "delta": drift.delta,
                        }),
                    },
                )
                .await?;
            }
            drifts.push(HolderDrift {
                holder: summary.holder,
                name: summary.name,
                drift,
            });
        }

        finish(txn, mode).await?;
        Ok(ReconciliationReport {
            applied: mode.applies(),
            checked,
            drifts,
        })
    }

    /// Holders whose sub-ledger balance disagrees with their linked GL
    /// account, e.g. after a journal entry was deleted without reversing
    /// the matching sub-ledger row.
    pub async fn ledger_divergence(&self) -> Result<Vec<LedgerDivergence>, BalanceError> {
        let tree = load_tree(&self.db).await?;
        let totals = load_line_totals(&self.db, None).await?;
        let mut engine = BalanceEngine::new(&tree, &totals);

        let mut divergent = Vec::new();
        for summary in list_holders_in(&self.db).await? {
            let Some(account_id) = summary.account_id else {
                continue;
            };
            let subledger_balance = computed_in(&self.db, &summary).await?;
            let ledger_balance = engine.balance(account_id)?;
            let delta = round_amount(subledger_balance - ledger_balance);
            if delta.is_zero() {
                continue;
            }
            divergent.push(LedgerDivergence {
                holder: summary.holder,
                name: summary.name,
                account_id,
                subledger_balance,
                ledger_balance,
                delta,
            });
        }
        Ok(divergent)
    }
}

async fn finish(txn: sea_orm::DatabaseTransaction, mode: ReconcileMode<'_>) -> Result<(), DbErr> {
    if mode.applies() {
        txn.commit().await
    } else {
        txn.rollback().await
    }
}
