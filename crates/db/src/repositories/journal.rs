//! Journal repository for entry creation, editing, and deletion.
//!
//! Every write runs in one database transaction: the header, its lines, the
//! entry number and the refreshed cached balances commit or roll back
//! together.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate, Utc};
use daftar_core::balance::RollupError;
use daftar_core::ledger::{
    AccountInfo, CreateEntryInput, JournalLineInput, LedgerError, LedgerService, ReferenceType,
    ResolvedEntry, ValidatedLine, reverse_lines, validate_entry_number,
};
use daftar_core::ledger::reversal::REVERSAL_PREFIX;
use daftar_core::permission::{Actor, Permission, PermissionDenied};
use daftar_core::sequence::DocumentType;
use daftar_shared::types::{AccountId, JournalEntryId, JournalLineId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::audit::{AuditAction, AuditRecord, AuditRepository};
use super::ledger_state::{RefreshError, refresh_cached_balances};
use super::sequence::{SequenceRepoError, SequenceRepository};
use crate::entities::{accounts, journal_entries, journal_lines, year_end_closings};

/// Error types for journal operations.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Entry failed validation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Entry number could not be allocated.
    #[error(transparent)]
    Sequence(#[from] SequenceRepoError),

    /// Actor may not perform the operation.
    #[error(transparent)]
    Permission(#[from] PermissionDenied),

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    NotFound(Uuid),

    /// An explicit entry number is already taken.
    #[error("Entry number '{0}' already exists")]
    DuplicateNumber(String),

    /// Cached balances could not be rolled up.
    #[error(transparent)]
    Rollup(#[from] RollupError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RefreshError> for JournalError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rollup(e) => Self::Rollup(e),
            RefreshError::Database(e) => Self::Database(e),
        }
    }
}

impl JournalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Sequence(e) => e.error_code(),
            Self::Permission(e) => e.error_code(),
            Self::NotFound(_) => "ENTRY_NOT_FOUND",
            Self::DuplicateNumber(_) => "DUPLICATE_ENTRY_NUMBER",
            Self::Rollup(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<JournalError> for daftar_shared::AppError {
    fn from(err: JournalError) -> Self {
        match err {
            JournalError::Ledger(e) => e.into(),
            JournalError::Sequence(e) => e.into(),
            JournalError::Permission(e) => e.into(),
            JournalError::Rollup(e) => e.into(),
            JournalError::NotFound(_) => Self::NotFound(err.to_string()),
            JournalError::DuplicateNumber(_) => Self::Conflict(err.to_string()),
            JournalError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A journal entry with its lines.
#[derive(Debug, Clone)]
pub struct EntryWithLines {
    /// Entry header.
    pub entry: journal_entries::Model,
    /// Lines in posting order.
    pub lines: Vec<journal_lines::Model>,
}

impl EntryWithLines {
    /// The stored lines as validated lines, e.g. for building a reversal.
    #[must_use]
    pub fn validated_lines(&self) -> Vec<ValidatedLine> {
        self.lines
            .iter()
            .map(|line| ValidatedLine {
                account_id: AccountId::from_uuid(line.account_id),
                debit: line.debit,
                credit: line.credit,
                description: line.line_description.clone(),
            })
            .collect()
    }
}

/// Filter options for listing entries.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    /// Entries dated on or after this date.
    pub date_from: Option<NaiveDate>,
    /// Entries dated on or before this date.
    pub date_to: Option<NaiveDate>,
    /// Only this originating process.
    pub reference_type: Option<ReferenceType>,
    /// Only entries with a line on this account.
    pub account_id: Option<AccountId>,
    /// Maximum rows returned.
    pub limit: Option<u64>,
    /// Rows skipped.
    pub offset: Option<u64>,
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    sequences: SequenceRepository,
}

impl JournalRepository {
    /// Creates a journal repository numbering entries from `sequences`.
    #[must_use]
    pub const fn new(db: DatabaseConnection, sequences: SequenceRepository) -> Self {
        Self { db, sequences }
    }

    /// The sequence repository used for entry numbers.
    #[must_use]
    pub const fn sequences(&self) -> &SequenceRepository {
        &self.sequences
    }

    /// Creates a balanced entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The lines do not form a balanced entry
    /// - A referenced account is missing or inactive
    /// - The entry date falls in a closed year
    /// - The explicit entry number is malformed or taken
    /// - No `journal_entry` sequence is configured
    pub async fn create_entry(&self, input: CreateEntryInput) -> Result<EntryWithLines, JournalError> {
        let txn = self.db.begin().await?;
        let entry = self.create_entry_in(&txn, input).await?;
        txn.commit().await?;
        Ok(entry)
    }

    /// Creates an entry on `conn`, usually a transaction owned by the
    /// caller's own business write.
    pub async fn create_entry_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        input: CreateEntryInput,
    ) -> Result<EntryWithLines, JournalError> {
        ensure_year_open(conn, input.entry_date).await?;
        let (description, resolved) = resolve(conn, &input.description, &input.lines).await?;

        let entry_number = match input.entry_number.as_deref() {
            Some(raw) => {
                let number = validate_entry_number(raw)?;
                if number_taken(conn, &number).await? {
                    return Err(JournalError::DuplicateNumber(number));
                }
                number
            }
            None => {
                self.sequences
                    .next_number_in(conn, DocumentType::JournalEntry)
                    .await?
            }
        };

        let now = Utc::now().fixed_offset();
        let entry = journal_entries::ActiveModel {
            id: Set(JournalEntryId::new().into_inner()),
            entry_number: Set(entry_number),
            entry_date: Set(input.entry_date),
            reference_type: Set(input.reference_type.into()),
            reference_id: Set(input.reference_id),
            description: Set(description),
            total_amount: Set(resolved.total_amount()),
            created_by: Set(input.created_by.map(UserId::into_inner)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        let lines = insert_lines(conn, entry.id, &resolved).await?;
        refresh_cached_balances(conn, &touched_accounts(&lines)).await?;

        info!(
            entry_number = %entry.entry_number,
            reference_type = %input.reference_type,
            total = %entry.total_amount,
            "journal entry created"
        );
        Ok(EntryWithLines { entry, lines })
    }

    /// Replaces an entry's full line set.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor lacks the edit permission, the entry is
    /// missing, or the new lines fail validation.
    pub async fn edit_entry(
        &self,
        id: Uuid,
        lines: Vec<JournalLineInput>,
        actor: &Actor,
    ) -> Result<EntryWithLines, JournalError> {
        actor.require(Permission::EditJournalEntries)?;

        let txn = self.db.begin().await?;
        let existing = load_entry(&txn, id).await?.ok_or(JournalError::NotFound(id))?;
        ensure_year_open(&txn, existing.entry.entry_date).await?;
        let (_, resolved) = resolve(&txn, &existing.entry.description, &lines).await?;

        journal_lines::Entity::delete_many()
            .filter(journal_lines::Column::JournalEntryId.eq(id))
            .exec(&txn)
            .await?;
        let new_lines = insert_lines(&txn, id, &resolved).await?;

        let previous_total = existing.entry.total_amount;
        let mut active: journal_entries::ActiveModel = existing.entry.clone().into();
        active.total_amount = Set(resolved.total_amount());
        active.updated_at = Set(Utc::now().fixed_offset());
        let entry = active.update(&txn).await?;

        let mut touched: HashSet<AccountId> = touched_accounts(&existing.lines).into_iter().collect();
        touched.extend(touched_accounts(&new_lines));
        refresh_cached_balances(&txn, &touched.into_iter().collect::<Vec<_>>()).await?;

        AuditRepository::record_in(
            &txn,
            AuditRecord {
                action: AuditAction::EntryEdited,
                entity_type: "journal_entry",
                entity_id: id,
                actor: Some(actor.user_id),
                details: json!({
                    "entry_number": entry.entry_number,
                    "previous_total": previous_total,
                    "new_total": entry.total_amount,
                    "previous_line_count": existing.lines.len(),
                    "new_line_count": new_lines.len(),
                }),
            },
        )
        .await?;

        txn.commit().await?;
        Ok(EntryWithLines {
            entry,
            lines: new_lines,
        })
    }

    /// Deletes an entry and its lines, writing an audit record.
    ///
    /// Sub-ledger rows created alongside the entry are left untouched; use
    /// the sub-ledger repository to reverse them.
    ///
    /// # Errors
    ///
    /// Returns an error if the actor lacks the delete permission or the
    /// entry is missing.
    pub async fn delete_entry(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> Result<journal_entries::Model, JournalError> {
        actor.require(Permission::DeleteJournalEntries)?;

        let txn = self.db.begin().await?;
        let deleted = delete_entry_in(&txn, id, actor.user_id).await?;
        txn.commit().await?;
        Ok(deleted)
    }

    /// Deletes every entry posted for a business record.
    pub async fn delete_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<journal_entries::Model>, JournalError> {
        actor.require(Permission::DeleteJournalEntries)?;

        let txn = self.db.begin().await?;
        let entries = find_by_reference_in(&txn, reference_type, reference_id).await?;
        let mut deleted = Vec::with_capacity(entries.len());
        for entry in entries {
            deleted.push(delete_entry_in(&txn, entry.id, actor.user_id).await?);
        }
        txn.commit().await?;
        Ok(deleted)
    }

    /// Posts an entry that mirrors `id`, dated `entry_date`.
    ///
    /// The reversal references the original entry. Cancelling a posted
    /// entry needs the same permission as editing it.
    pub async fn reverse_entry(
        &self,
        id: Uuid,
        entry_date: NaiveDate,
        actor: &Actor,
    ) -> Result<EntryWithLines, JournalError> {
        actor.require(Permission::EditJournalEntries)?;

        let txn = self.db.begin().await?;
        let original = load_entry(&txn, id).await?.ok_or(JournalError::NotFound(id))?;
        let lines = reverse_lines(&original.validated_lines(), &original.entry.description);

        let mut input = CreateEntryInput::new(
            entry_date,
            ReferenceType::Adjustment,
            format!("{REVERSAL_PREFIX}{}", original.entry.description),
            lines,
        )
        .with_reference(id);
        input.created_by = Some(actor.user_id);

        let reversal = self.create_entry_in(&txn, input).await?;
        txn.commit().await?;
        Ok(reversal)
    }

    /// Finds an entry with its lines.
    pub async fn find_entry(&self, id: Uuid) -> Result<Option<EntryWithLines>, JournalError> {
        Ok(load_entry(&self.db, id).await?)
    }

    /// Finds an entry by its number.
    pub async fn find_by_number(&self, entry_number: &str) -> Result<Option<EntryWithLines>, JournalError> {
        let entry = journal_entries::Entity::find()
            .filter(journal_entries::Column::EntryNumber.eq(entry_number))
            .one(&self.db)
            .await?;
        match entry {
            Some(entry) => Ok(load_entry(&self.db, entry.id).await?),
            None => Ok(None),
        }
    }

    /// Entries posted for a business record, oldest first.
    pub async fn find_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<journal_entries::Model>, JournalError> {
        Ok(find_by_reference_in(&self.db, reference_type, reference_id).await?)
    }

    /// Lists entries, newest first.
    pub async fn list_entries(&self, filter: EntryFilter) -> Result<Vec<journal_entries::Model>, JournalError> {
        let mut query = journal_entries::Entity::find();
        if let Some(from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(to));
        }
        if let Some(reference_type) = filter.reference_type {
            query = query.filter(
                journal_entries::Column::ReferenceType
                    .eq(crate::entities::sea_orm_active_enums::ReferenceType::from(reference_type)),
            );
        }
        if let Some(account_id) = filter.account_id {
            let entry_ids: Vec<Uuid> = journal_lines::Entity::find()
                .select_only()
                .column(journal_lines::Column::JournalEntryId)
                .filter(journal_lines::Column::AccountId.eq(account_id.into_inner()))
                .distinct()
                .into_tuple()
                .all(&self.db)
                .await?;
            query = query.filter(journal_entries::Column::Id.is_in(entry_ids));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.offset(offset);
        }

        Ok(query
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::EntryNumber)
            .all(&self.db)
            .await?)
    }

    /// Number of entries posted for a business record.
    pub async fn count_by_reference_in<C: ConnectionTrait>(
        conn: &C,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<u64, DbErr> {
        journal_entries::Entity::find()
            .filter(
                journal_entries::Column::ReferenceType
                    .eq(crate::entities::sea_orm_active_enums::ReferenceType::from(reference_type)),
            )
            .filter(journal_entries::Column::ReferenceId.eq(reference_id))
            .count(conn)
            .await
    }
}

/// Rejects dates inside a closed fiscal year.
pub(crate) async fn ensure_year_open<C: ConnectionTrait>(
    conn: &C,
    date: NaiveDate,
) -> Result<(), JournalError> {
    let closed = year_end_closings::Entity::find()
        .filter(year_end_closings::Column::FiscalYear.eq(date.year()))
        .count(conn)
        .await?;
    if closed > 0 {
        return Err(LedgerError::YearClosed(date.year()).into());
    }
    Ok(())
}

async fn resolve<C: ConnectionTrait>(
    conn: &C,
    description: &str,
    lines: &[JournalLineInput],
) -> Result<(String, ResolvedEntry), JournalError> {
    let ids: Vec<Uuid> = lines
        .iter()
        .filter_map(|line| line.account_id.map(AccountId::into_inner))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let known: HashMap<AccountId, AccountInfo> = accounts::Entity::find()
        .filter(accounts::Column::Id.is_in(ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|account| {
            let id = AccountId::from_uuid(account.id);
            (
                id,
                AccountInfo {
                    id,
                    is_active: account.is_active,
                    account_type: account.account_type.into(),
                },
            )
        })
        .collect();

    Ok(LedgerService::validate_and_resolve(description, lines, |id| {
        known.get(&id).cloned()
    })?)
}

async fn number_taken<C: ConnectionTrait>(conn: &C, number: &str) -> Result<bool, DbErr> {
    let count = journal_entries::Entity::find()
        .filter(journal_entries::Column::EntryNumber.eq(number))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    entry_id: Uuid,
    resolved: &ResolvedEntry,
) -> Result<Vec<journal_lines::Model>, DbErr> {
    let mut lines = Vec::with_capacity(resolved.lines.len());
    for (order, line) in (0_i32..).zip(&resolved.lines) {
        let model = journal_lines::ActiveModel {
            id: Set(JournalLineId::new().into_inner()),
            journal_entry_id: Set(entry_id),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            line_description: Set(line.description.clone()),
            line_order: Set(order),
        }
        .insert(conn)
        .await?;
        lines.push(model);
    }
    Ok(lines)
}

fn touched_accounts(lines: &[journal_lines::Model]) -> Vec<AccountId> {
    lines
        .iter()
        .map(|line| AccountId::from_uuid(line.account_id))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect()
}

pub(crate) async fn load_entry<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<EntryWithLines>, DbErr> {
    let Some(entry) = journal_entries::Entity::find_by_id(id).one(conn).await? else {
        return Ok(None);
    };
    let lines = journal_lines::Entity::find()
        .filter(journal_lines::Column::JournalEntryId.eq(id))
        .order_by_asc(journal_lines::Column::LineOrder)
        .all(conn)
        .await?;
    Ok(Some(EntryWithLines { entry, lines }))
}

async fn find_by_reference_in<C: ConnectionTrait>(
    conn: &C,
    reference_type: ReferenceType,
    reference_id: Uuid,
) -> Result<Vec<journal_entries::Model>, DbErr> {
    journal_entries::Entity::find()
        .filter(
            journal_entries::Column::ReferenceType
                .eq(crate::entities::sea_orm_active_enums::ReferenceType::from(reference_type)),
        )
        .filter(journal_entries::Column::ReferenceId.eq(reference_id))
        .order_by_asc(journal_entries::Column::CreatedAt)
        .all(conn)
        .await
}

async fn delete_entry_in<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    actor: UserId,
) -> Result<journal_entries::Model, JournalError> {
    let existing = load_entry(conn, id).await?.ok_or(JournalError::NotFound(id))?;
    ensure_year_open(conn, existing.entry.entry_date).await?;

    journal_lines::Entity::delete_many()
        .filter(journal_lines::Column::JournalEntryId.eq(id))
        .exec(conn)
        .await?;
    journal_entries::Entity::delete_by_id(id).exec(conn).await?;
    refresh_cached_balances(conn, &touched_accounts(&existing.lines)).await?;

    let entry = existing.entry;
    let reference_type: ReferenceType = entry.reference_type.into();
    AuditRepository::record_in(
        conn,
        AuditRecord {
            action: AuditAction::EntryDeleted,
            entity_type: "journal_entry",
            entity_id: id,
            actor: Some(actor),
            details: json!({
                "entry_number": entry.entry_number,
                "reference_type": reference_type.as_str(),
                "reference_id": entry.reference_id,
                "total_amount": entry.total_amount,
                "description": entry.description,
            }),
        },
    )
    .await?;

    info!(entry_number = %entry.entry_number, %actor, "journal entry deleted");
    Ok(entry)
}
