//! Cash and bank sub-ledger repository.
//!
//! The transaction log is the source of truth. Every write locks the holder
//! row, appends to the log, recomputes the balance from the whole log and
//! overwrites the cached value. There is no incremental update path.

use chrono::{NaiveDate, Utc};
use daftar_core::ledger::ReferenceType;
use daftar_core::ledger::reversal::REVERSAL_PREFIX;
use daftar_core::subledger::{
    SubledgerError, SubledgerHolder, SubledgerLine, SubledgerTxType, SyncOutcome, compute_balance,
};
use daftar_shared::types::{
    AccountId, BankAccountId, CashboxId, SubledgerTransactionId, UserId, round_amount,
};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::audit::{AuditAction, AuditRecord, AuditRepository};
use crate::entities::{
    bank_accounts, bank_transactions, cashbox_transactions, cashboxes, sea_orm_active_enums,
};

/// Error types for sub-ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum SubledgerRepoError {
    /// Movement failed validation.
    #[error(transparent)]
    Subledger(#[from] SubledgerError),

    /// Holder not found.
    #[error("Holder not found: {0}")]
    HolderNotFound(SubledgerHolder),

    /// Holder is inactive.
    #[error("Holder is inactive: {0}")]
    HolderInactive(SubledgerHolder),

    /// Holder name is blank.
    #[error("Holder name is required")]
    MissingName,

    /// Sub-ledger row not found.
    #[error("Sub-ledger transaction not found: {0}")]
    TransactionNotFound(Uuid),

    /// Sub-ledger row already has an offsetting row.
    #[error("Sub-ledger transaction already reversed: {0}")]
    AlreadyReversed(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl SubledgerRepoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Subledger(e) => e.error_code(),
            Self::HolderNotFound(_) => "HOLDER_NOT_FOUND",
            Self::HolderInactive(_) => "HOLDER_INACTIVE",
            Self::MissingName => "MISSING_HOLDER_NAME",
            Self::TransactionNotFound(_) => "SUBLEDGER_TRANSACTION_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<SubledgerRepoError> for daftar_shared::AppError {
    fn from(err: SubledgerRepoError) -> Self {
        match err {
            SubledgerRepoError::Subledger(e) => e.into(),
            SubledgerRepoError::HolderNotFound(_) | SubledgerRepoError::TransactionNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            SubledgerRepoError::MissingName => Self::Validation(err.to_string()),
            SubledgerRepoError::HolderInactive(_) => Self::BusinessRule(err.to_string()),
            SubledgerRepoError::AlreadyReversed(_) => Self::Conflict(err.to_string()),
            SubledgerRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating a cashbox or bank account.
#[derive(Debug, Clone)]
pub struct CreateHolderInput {
    /// Display name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Linked general-ledger account.
    pub account_id: Option<AccountId>,
    /// Opening balance kept on the holder itself.
    pub initial_balance: Decimal,
    /// Bank name; ignored for cashboxes.
    pub bank_name: Option<String>,
}

impl CreateHolderInput {
    /// A holder with a zero opening balance.
    #[must_use]
    pub fn new(name: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            currency: currency.into(),
            account_id: None,
            initial_balance: Decimal::ZERO,
            bank_name: None,
        }
    }

    /// Links the holder to a general-ledger account.
    #[must_use]
    pub const fn linked_to(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    /// Sets the opening balance.
    #[must_use]
    pub const fn with_initial_balance(mut self, initial_balance: Decimal) -> Self {
        self.initial_balance = initial_balance;
        self
    }
}

/// A cashbox or bank account as seen by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderSummary {
    /// The holder.
    pub holder: SubledgerHolder,
    /// Display name.
    pub name: String,
    /// Currency code.
    pub currency: String,
    /// Linked general-ledger account.
    pub account_id: Option<AccountId>,
    /// Opening balance.
    pub initial_balance: Decimal,
    /// Cached balance.
    pub balance: Decimal,
    /// Whether the holder is active.
    pub is_active: bool,
}

impl From<cashboxes::Model> for HolderSummary {
    fn from(model: cashboxes::Model) -> Self {
        Self {
            holder: SubledgerHolder::Cashbox(CashboxId::from_uuid(model.id)),
            name: model.name,
            currency: model.currency,
            account_id: model.account_id.map(AccountId::from_uuid),
            initial_balance: round_amount(model.initial_balance),
            balance: round_amount(model.balance),
            is_active: model.is_active,
        }
    }
}

impl From<bank_accounts::Model> for HolderSummary {
    fn from(model: bank_accounts::Model) -> Self {
        Self {
            holder: SubledgerHolder::Bank(BankAccountId::from_uuid(model.id)),
            name: model.name,
            currency: model.currency,
            account_id: model.account_id.map(AccountId::from_uuid),
            initial_balance: round_amount(model.initial_balance),
            balance: round_amount(model.balance),
            is_active: model.is_active,
        }
    }
}

/// One row of a cash or bank transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubledgerRow {
    /// Row ID.
    pub id: SubledgerTransactionId,
    /// Owning holder.
    pub holder: SubledgerHolder,
    /// Transaction type.
    pub tx_type: SubledgerTxType,
    /// Amount; signed only for adjustments.
    pub amount: Decimal,
    /// Transaction date.
    pub date: NaiveDate,
    /// Originating process.
    pub reference_type: Option<ReferenceType>,
    /// Originating record.
    pub reference_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

impl SubledgerRow {
    const fn line(&self) -> SubledgerLine {
        SubledgerLine {
            tx_type: self.tx_type,
            amount: self.amount,
        }
    }
}

impl From<cashbox_transactions::Model> for SubledgerRow {
    fn from(model: cashbox_transactions::Model) -> Self {
        Self {
            id: SubledgerTransactionId::from_uuid(model.id),
            holder: SubledgerHolder::Cashbox(CashboxId::from_uuid(model.cashbox_id)),
            tx_type: model.transaction_type.into(),
            amount: round_amount(model.amount),
            date: model.transaction_date,
            reference_type: model.reference_type.map(Into::into),
            reference_id: model.reference_id,
            description: model.description,
            created_by: model.created_by.map(UserId::from_uuid),
        }
    }
}

impl From<bank_transactions::Model> for SubledgerRow {
    fn from(model: bank_transactions::Model) -> Self {
        Self {
            id: SubledgerTransactionId::from_uuid(model.id),
            holder: SubledgerHolder::Bank(BankAccountId::from_uuid(model.bank_account_id)),
            tx_type: model.transaction_type.into(),
            amount: round_amount(model.amount),
            date: model.transaction_date,
            reference_type: model.reference_type.map(Into::into),
            reference_id: model.reference_id,
            description: model.description,
            created_by: model.created_by.map(UserId::from_uuid),
        }
    }
}

/// A movement to append to a holder's log.
#[derive(Debug, Clone)]
pub struct RecordInput {
    /// Target holder.
    pub holder: SubledgerHolder,
    /// Transaction type.
    pub tx_type: SubledgerTxType,
    /// Amount; signed only for adjustments.
    pub amount: Decimal,
    /// Transaction date.
    pub date: NaiveDate,
    /// Originating process.
    pub reference_type: Option<ReferenceType>,
    /// Originating record.
    pub reference_id: Option<Uuid>,
    /// Description.
    pub description: Option<String>,
    /// Creating user.
    pub created_by: Option<UserId>,
}

impl RecordInput {
    /// A movement with no reference or description.
    #[must_use]
    pub const fn new(
        holder: SubledgerHolder,
        tx_type: SubledgerTxType,
        amount: Decimal,
        date: NaiveDate,
    ) -> Self {
        Self {
            holder,
            tx_type,
            amount,
            date,
            reference_type: None,
            reference_id: None,
            description: None,
            created_by: None,
        }
    }

    /// Links the movement to its originating record.
    #[must_use]
    pub const fn with_reference(mut self, reference_type: ReferenceType, reference_id: Uuid) -> Self {
        self.reference_type = Some(reference_type);
        self.reference_id = Some(reference_id);
        self
    }

    /// Attaches a description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A stored movement plus the resulting cache sync.
#[derive(Debug, Clone)]
pub struct RecordedMovement {
    /// The appended row.
    pub row: SubledgerRow,
    /// Cached balance before and after.
    pub sync: SyncOutcome,
}

/// Cash and bank sub-ledger repository.
#[derive(Debug, Clone)]
pub struct SubledgerRepository {
    db: DatabaseConnection,
}

impl SubledgerRepository {
    /// Creates a new sub-ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a cashbox.
    pub async fn create_cashbox(&self, input: CreateHolderInput) -> Result<HolderSummary, SubledgerRepoError> {
        let name = holder_name(&input.name)?;
        let now = Utc::now().fixed_offset();
        let initial = round_amount(input.initial_balance);
        let model = cashboxes::ActiveModel {
            id: Set(CashboxId::new().into_inner()),
            name: Set(name),
            currency: Set(input.currency),
            account_id: Set(input.account_id.map(AccountId::into_inner)),
            initial_balance: Set(initial),
            balance: Set(initial),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(model.into())
    }

    /// Creates a bank account.
    pub async fn create_bank_account(
        &self,
        input: CreateHolderInput,
    ) -> Result<HolderSummary, SubledgerRepoError> {
        let name = holder_name(&input.name)?;
        let now = Utc::now().fixed_offset();
        let initial = round_amount(input.initial_balance);
        let model = bank_accounts::ActiveModel {
            id: Set(BankAccountId::new().into_inner()),
            name: Set(name),
            bank_name: Set(input.bank_name),
            currency: Set(input.currency),
            account_id: Set(input.account_id.map(AccountId::into_inner)),
            initial_balance: Set(initial),
            balance: Set(initial),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(model.into())
    }

    /// Finds a holder.
    pub async fn find_holder(
        &self,
        holder: SubledgerHolder,
    ) -> Result<Option<HolderSummary>, SubledgerRepoError> {
        Ok(find_holder_in(&self.db, holder, false).await?)
    }

    /// Lists every cashbox and bank account.
    pub async fn list_holders(&self) -> Result<Vec<HolderSummary>, SubledgerRepoError> {
        Ok(list_holders_in(&self.db).await?)
    }

    /// Appends a movement and re-syncs the holder's cached balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is invalid for the holder kind, the
    /// amount is not acceptable for the type, or the holder is missing or
    /// inactive.
    pub async fn record(&self, input: RecordInput) -> Result<RecordedMovement, SubledgerRepoError> {
        let txn = self.db.begin().await?;
        let recorded = record_in(&txn, input).await?;
        txn.commit().await?;
        Ok(recorded)
    }

    /// Balance computed from the log, without touching the cache.
    pub async fn compute_balance(&self, holder: SubledgerHolder) -> Result<Decimal, SubledgerRepoError> {
        let summary = find_holder_in(&self.db, holder, false)
            .await?
            .ok_or(SubledgerRepoError::HolderNotFound(holder))?;
        computed_in(&self.db, &summary).await
    }

    /// Recomputes the balance and overwrites the cache if it differs.
    ///
    /// Calling it twice in a row never changes anything the second time.
    pub async fn sync_balance(&self, holder: SubledgerHolder) -> Result<SyncOutcome, SubledgerRepoError> {
        let txn = self.db.begin().await?;
        let summary = find_holder_in(&txn, holder, true)
            .await?
            .ok_or(SubledgerRepoError::HolderNotFound(holder))?;
        let outcome = sync_locked(&txn, &summary).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Appends the offsetting row of `tx_id`.
    ///
    /// The new row references the original through an `adjustment`
    /// reference. A row can be reversed only once.
    pub async fn reverse_transaction(
        &self,
        holder: SubledgerHolder,
        tx_id: Uuid,
        created_by: Option<UserId>,
    ) -> Result<RecordedMovement, SubledgerRepoError> {
        let txn = self.db.begin().await?;
        let row = find_row_in(&txn, holder, tx_id)
            .await?
            .ok_or(SubledgerRepoError::TransactionNotFound(tx_id))?;
        let recorded = reverse_row_in(&txn, &row, created_by).await?;
        txn.commit().await?;
        Ok(recorded)
    }

    /// Reverses every not-yet-reversed row linked to a business record.
    pub async fn reverse_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: Uuid,
        created_by: Option<UserId>,
    ) -> Result<Vec<RecordedMovement>, SubledgerRepoError> {
        let txn = self.db.begin().await?;
        let rows = rows_by_reference_in(&txn, reference_type, reference_id).await?;
        let mut reversed = Vec::with_capacity(rows.len());
        for row in rows {
            if is_reversed_in(&txn, &row).await? {
                continue;
            }
            reversed.push(reverse_row_in(&txn, &row, created_by).await?);
        }
        txn.commit().await?;
        Ok(reversed)
    }

    /// A holder's log, oldest first, optionally limited to a date range.
    pub async fn list_transactions(
        &self,
        holder: SubledgerHolder,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<SubledgerRow>, SubledgerRepoError> {
        let rows = rows_in(&self.db, holder).await?;
        Ok(rows
            .into_iter()
            .filter(|row| from.is_none_or(|from| row.date >= from))
            .filter(|row| to.is_none_or(|to| row.date <= to))
            .collect())
    }
}

fn holder_name(raw: &str) -> Result<String, SubledgerRepoError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(SubledgerRepoError::MissingName);
    }
    Ok(name.to_string())
}

/// Loads a holder, optionally taking a row lock for the rest of the
/// transaction.
pub(crate) async fn find_holder_in<C: ConnectionTrait>(
    conn: &C,
    holder: SubledgerHolder,
    lock: bool,
) -> Result<Option<HolderSummary>, DbErr> {
    Ok(match holder {
        SubledgerHolder::Cashbox(id) => {
            let mut query = cashboxes::Entity::find_by_id(id.into_inner());
            if lock {
                query = query.lock_exclusive();
            }
            query.one(conn).await?.map(Into::into)
        }
        SubledgerHolder::Bank(id) => {
            let mut query = bank_accounts::Entity::find_by_id(id.into_inner());
            if lock {
                query = query.lock_exclusive();
            }
            query.one(conn).await?.map(Into::into)
        }
    })
}

pub(crate) async fn list_holders_in<C: ConnectionTrait>(conn: &C) -> Result<Vec<HolderSummary>, DbErr> {
    let mut holders: Vec<HolderSummary> = cashboxes::Entity::find()
        .order_by_asc(cashboxes::Column::Name)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    holders.extend(
        bank_accounts::Entity::find()
            .order_by_asc(bank_accounts::Column::Name)
            .all(conn)
            .await?
            .into_iter()
            .map(HolderSummary::from),
    );
    Ok(holders)
}

async fn rows_in<C: ConnectionTrait>(
    conn: &C,
    holder: SubledgerHolder,
) -> Result<Vec<SubledgerRow>, DbErr> {
    Ok(match holder {
        SubledgerHolder::Cashbox(id) => cashbox_transactions::Entity::find()
            .filter(cashbox_transactions::Column::CashboxId.eq(id.into_inner()))
            .order_by_asc(cashbox_transactions::Column::TransactionDate)
            .order_by_asc(cashbox_transactions::Column::CreatedAt)
            .all(conn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
        SubledgerHolder::Bank(id) => bank_transactions::Entity::find()
            .filter(bank_transactions::Column::BankAccountId.eq(id.into_inner()))
            .order_by_asc(bank_transactions::Column::TransactionDate)
            .order_by_asc(bank_transactions::Column::CreatedAt)
            .all(conn)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}

async fn find_row_in<C: ConnectionTrait>(
    conn: &C,
    holder: SubledgerHolder,
    tx_id: Uuid,
) -> Result<Option<SubledgerRow>, DbErr> {
    Ok(match holder {
        SubledgerHolder::Cashbox(id) => cashbox_transactions::Entity::find_by_id(tx_id)
            .filter(cashbox_transactions::Column::CashboxId.eq(id.into_inner()))
            .one(conn)
            .await?
            .map(Into::into),
        SubledgerHolder::Bank(id) => bank_transactions::Entity::find_by_id(tx_id)
            .filter(bank_transactions::Column::BankAccountId.eq(id.into_inner()))
            .one(conn)
            .await?
            .map(Into::into),
    })
}

async fn rows_by_reference_in<C: ConnectionTrait>(
    conn: &C,
    reference_type: ReferenceType,
    reference_id: Uuid,
) -> Result<Vec<SubledgerRow>, DbErr> {
    let stored = sea_orm_active_enums::ReferenceType::from(reference_type);
    let mut rows: Vec<SubledgerRow> = cashbox_transactions::Entity::find()
        .filter(cashbox_transactions::Column::ReferenceType.eq(stored))
        .filter(cashbox_transactions::Column::ReferenceId.eq(reference_id))
        .order_by_asc(cashbox_transactions::Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    rows.extend(
        bank_transactions::Entity::find()
            .filter(bank_transactions::Column::ReferenceType.eq(stored))
            .filter(bank_transactions::Column::ReferenceId.eq(reference_id))
            .order_by_asc(bank_transactions::Column::CreatedAt)
            .all(conn)
            .await?
            .into_iter()
            .map(SubledgerRow::from),
    );
    Ok(rows)
}

/// Whether a holder already has a row of this type for a business record.
pub(crate) async fn movement_exists_in<C: ConnectionTrait>(
    conn: &C,
    holder: SubledgerHolder,
    tx_type: SubledgerTxType,
    reference_type: ReferenceType,
    reference_id: Uuid,
) -> Result<bool, DbErr> {
    let stored_ref = sea_orm_active_enums::ReferenceType::from(reference_type);
    let stored_type = sea_orm_active_enums::SubledgerTxType::from(tx_type);
    let count = match holder {
        SubledgerHolder::Cashbox(id) => {
            cashbox_transactions::Entity::find()
                .filter(cashbox_transactions::Column::CashboxId.eq(id.into_inner()))
                .filter(cashbox_transactions::Column::TransactionType.eq(stored_type))
                .filter(cashbox_transactions::Column::ReferenceType.eq(stored_ref))
                .filter(cashbox_transactions::Column::ReferenceId.eq(reference_id))
                .count(conn)
                .await?
        }
        SubledgerHolder::Bank(id) => {
            bank_transactions::Entity::find()
                .filter(bank_transactions::Column::BankAccountId.eq(id.into_inner()))
                .filter(bank_transactions::Column::TransactionType.eq(stored_type))
                .filter(bank_transactions::Column::ReferenceType.eq(stored_ref))
                .filter(bank_transactions::Column::ReferenceId.eq(reference_id))
                .count(conn)
                .await?
        }
    };
    Ok(count > 0)
}

async fn is_reversed_in<C: ConnectionTrait>(conn: &C, row: &SubledgerRow) -> Result<bool, DbErr> {
    let offset = row.tx_type.offsetting();
    movement_exists_in(
        conn,
        row.holder,
        offset,
        ReferenceType::Adjustment,
        row.id.into_inner(),
    )
    .await
}

/// Balance computed from a holder's log.
pub(crate) async fn computed_in<C: ConnectionTrait>(
    conn: &C,
    summary: &HolderSummary,
) -> Result<Decimal, SubledgerRepoError> {
    let rows = rows_in(conn, summary.holder).await?;
    Ok(compute_balance(
        summary.holder.kind(),
        summary.initial_balance,
        rows.iter().map(SubledgerRow::line),
    ))
}

/// Recomputes and overwrites the cache of a holder the caller has locked.
pub(crate) async fn sync_locked<C: ConnectionTrait>(
    conn: &C,
    summary: &HolderSummary,
) -> Result<SyncOutcome, SubledgerRepoError> {
    let current = computed_in(conn, summary).await?;
    let outcome = SyncOutcome::new(summary.balance, current);
    if outcome.changed {
        write_cache(conn, summary.holder, current).await?;
        info!(
            holder = %summary.holder,
            previous = %outcome.previous,
            current = %outcome.current,
            "sub-ledger cache updated"
        );
    }
    Ok(outcome)
}

async fn write_cache<C: ConnectionTrait>(
    conn: &C,
    holder: SubledgerHolder,
    balance: Decimal,
) -> Result<(), DbErr> {
    let now = Utc::now().fixed_offset();
    match holder {
        SubledgerHolder::Cashbox(id) => {
            cashboxes::Entity::update_many()
                .col_expr(cashboxes::Column::Balance, Expr::value(balance))
                .col_expr(cashboxes::Column::UpdatedAt, Expr::value(now))
                .filter(cashboxes::Column::Id.eq(id.into_inner()))
                .exec(conn)
                .await?;
        }
        SubledgerHolder::Bank(id) => {
            bank_accounts::Entity::update_many()
                .col_expr(bank_accounts::Column::Balance, Expr::value(balance))
                .col_expr(bank_accounts::Column::UpdatedAt, Expr::value(now))
                .filter(bank_accounts::Column::Id.eq(id.into_inner()))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

/// Appends a movement on `conn` under the holder's row lock and re-syncs
/// the cache.
pub(crate) async fn record_in<C: ConnectionTrait>(
    conn: &C,
    input: RecordInput,
) -> Result<RecordedMovement, SubledgerRepoError> {
    let holder = input.holder;
    let amount = round_amount(input.amount);
    input.tx_type.validate(holder.kind(), amount)?;

    let summary = find_holder_in(conn, holder, true)
        .await?
        .ok_or(SubledgerRepoError::HolderNotFound(holder))?;
    if !summary.is_active {
        return Err(SubledgerRepoError::HolderInactive(holder));
    }

    let id = SubledgerTransactionId::new();
    let now = Utc::now().fixed_offset();
    let tx_type = sea_orm_active_enums::SubledgerTxType::from(input.tx_type);
    let reference_type = input.reference_type.map(sea_orm_active_enums::ReferenceType::from);
    let created_by = input.created_by.map(UserId::into_inner);

    let row: SubledgerRow = match holder {
        SubledgerHolder::Cashbox(cashbox) => cashbox_transactions::ActiveModel {
            id: Set(id.into_inner()),
            cashbox_id: Set(cashbox.into_inner()),
            transaction_type: Set(tx_type),
            amount: Set(amount),
            transaction_date: Set(input.date),
            reference_type: Set(reference_type),
            reference_id: Set(input.reference_id),
            description: Set(input.description),
            created_by: Set(created_by),
            created_at: Set(now),
        }
        .insert(conn)
        .await?
        .into(),
        SubledgerHolder::Bank(bank) => bank_transactions::ActiveModel {
            id: Set(id.into_inner()),
            bank_account_id: Set(bank.into_inner()),
            transaction_type: Set(tx_type),
            amount: Set(amount),
            transaction_date: Set(input.date),
            reference_type: Set(reference_type),
            reference_id: Set(input.reference_id),
            description: Set(input.description),
            created_by: Set(created_by),
            created_at: Set(now),
        }
        .insert(conn)
        .await?
        .into(),
    };

    let sync = sync_locked(conn, &summary).await?;
    Ok(RecordedMovement { row, sync })
}

async fn reverse_row_in<C: ConnectionTrait>(
    conn: &C,
    row: &SubledgerRow,
    created_by: Option<UserId>,
) -> Result<RecordedMovement, SubledgerRepoError> {
    if is_reversed_in(conn, row).await? {
        return Err(SubledgerRepoError::AlreadyReversed(row.id.into_inner()));
    }

    let (tx_type, amount) = match row.tx_type {
        SubledgerTxType::Adjustment => (SubledgerTxType::Adjustment, -row.amount),
        other => (other.offsetting(), row.amount),
    };

    let description = format!(
        "{REVERSAL_PREFIX}{}",
        row.description.as_deref().unwrap_or(row.tx_type.as_str())
    );
    let mut input = RecordInput::new(row.holder, tx_type, amount, row.date)
        .with_reference(ReferenceType::Adjustment, row.id.into_inner())
        .describe(description);
    input.created_by = created_by;
    let recorded = record_in(conn, input).await?;

    AuditRepository::record_in(
        conn,
        AuditRecord {
            action: AuditAction::SubledgerReversed,
            entity_type: row.holder.kind().as_str(),
            entity_id: row.id.into_inner(),
            actor: created_by,
            details: json!({
                "holder": row.holder.to_string(),
                "reversed_type": row.tx_type.as_str(),
                "amount": row.amount,
                "reversal_id": recorded.row.id.into_inner(),
            }),
        },
    )
    .await?;

    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use daftar_core::subledger::SubledgerKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_holder_name_trims() {
        assert_eq!(holder_name("  Main till ").unwrap(), "Main till");
        assert!(matches!(holder_name("   "), Err(SubledgerRepoError::MissingName)));
    }

    #[test]
    fn test_summary_from_cashbox_rounds() {
        let now = Utc::now().fixed_offset();
        let summary = HolderSummary::from(cashboxes::Model {
            id: Uuid::now_v7(),
            name: "Till".to_string(),
            currency: "SAR".to_string(),
            account_id: None,
            initial_balance: dec!(10.0004),
            balance: dec!(39.9996),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        assert_eq!(summary.initial_balance, dec!(10.000));
        assert_eq!(summary.balance, dec!(40.000));
        assert_eq!(summary.holder.kind(), SubledgerKind::Cash);
    }
}
