//! Fiscal year-end closing.

use chrono::{NaiveDate, Utc};
use daftar_core::accounts::AccountType;
use daftar_core::closing::{ClosingError, NominalBalance, build_closing_plan, year_end};
use daftar_core::ledger::{CreateEntryInput, ReferenceType};
use daftar_core::permission::{Actor, Permission, PermissionDenied};
use daftar_shared::types::{AccountId, YearEndClosingId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::audit::{AuditAction, AuditRecord, AuditRepository};
use super::journal::{EntryWithLines, JournalError, JournalRepository};
use super::ledger_state::load_line_totals;
use crate::entities::{accounts, year_end_closings};

/// Error types for year-end closing.
#[derive(Debug, thiserror::Error)]
pub enum ClosingRepoError {
    /// Closing rule violation.
    #[error(transparent)]
    Closing(#[from] ClosingError),

    /// Actor may not close years.
    #[error(transparent)]
    Permission(#[from] PermissionDenied),

    /// The closing entry could not be posted.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// Capital account not found.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Closing date other than the last day of the fiscal year.
    #[error("Closing date {date} is not 31 December of fiscal year {year}")]
    InvalidDate {
        /// Fiscal year being closed.
        year: i32,
        /// Requested closing date.
        date: NaiveDate,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ClosingRepoError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Closing(e) => e.error_code(),
            Self::Permission(e) => e.error_code(),
            Self::Journal(e) => e.error_code(),
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::InvalidDate { .. } => "INVALID_CLOSING_DATE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<ClosingRepoError> for daftar_shared::AppError {
    fn from(err: ClosingRepoError) -> Self {
        match err {
            ClosingRepoError::Closing(e) => e.into(),
            ClosingRepoError::Permission(e) => e.into(),
            ClosingRepoError::Journal(e) => e.into(),
            ClosingRepoError::NotFound(_) => Self::NotFound(err.to_string()),
            ClosingRepoError::InvalidDate { .. } => Self::Validation(err.to_string()),
            ClosingRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A completed close.
#[derive(Debug, Clone)]
pub struct ClosedYear {
    /// The closing marker.
    pub marker: year_end_closings::Model,
    /// The posted closing entry.
    pub entry: EntryWithLines,
}

/// Year-end closing repository.
#[derive(Debug, Clone)]
pub struct ClosingRepository {
    db: DatabaseConnection,
    journal: JournalRepository,
}

impl ClosingRepository {
    /// Creates a new closing repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, journal: JournalRepository) -> Self {
        Self { db, journal }
    }

    /// Closes `year`: zeroes every revenue, expense and purchases account
    /// as of `closing_date` and carries the net result to `capital`.
    ///
    /// `closing_date` must be 31 December of `year`, so no entry dated in
    /// the year is left outside the closing entry.
    ///
    /// Once closed, entries dated in the year can no longer be created,
    /// edited or deleted.
    pub async fn close_year(
        &self,
        year: i32,
        closing_date: NaiveDate,
        capital: AccountId,
        actor: &Actor,
    ) -> Result<ClosedYear, ClosingRepoError> {
        actor.require(Permission::CloseYear)?;
        if year_end(year) != Some(closing_date) {
            return Err(ClosingRepoError::InvalidDate {
                year,
                date: closing_date,
            });
        }

        let txn = self.db.begin().await?;

        let existing = year_end_closings::Entity::find()
            .filter(year_end_closings::Column::FiscalYear.eq(year))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(ClosingError::AlreadyClosed(year).into());
        }

        let capital_row = accounts::Entity::find_by_id(capital.into_inner())
            .one(&txn)
            .await?
            .ok_or(ClosingRepoError::NotFound(capital))?;
        if AccountType::from(capital_row.account_type) != AccountType::Equity {
            return Err(ClosingError::CapitalNotEquity(capital).into());
        }

        let totals = load_line_totals(&txn, Some(closing_date)).await?;
        let nominal: Vec<NominalBalance> = accounts::Entity::find()
            .all(&txn)
            .await?
            .into_iter()
            .filter_map(|row| {
                let account_type = AccountType::from(row.account_type);
                if !account_type.is_nominal() {
                    return None;
                }
                let account_id = AccountId::from_uuid(row.id);
                let own = totals.get(&account_id).copied().unwrap_or_default();
                Some(NominalBalance {
                    account_id,
                    account_type,
                    balance: account_type.normal_balance().signed(own.debit, own.credit),
                })
            })
            .collect();
        let plan = build_closing_plan(year, &nominal, capital)?;

        let marker_id = YearEndClosingId::new().into_inner();
        let mut input = CreateEntryInput::new(
            closing_date,
            ReferenceType::YearEndClosing,
            format!("Year-end closing {year}"),
            plan.lines,
        )
        .with_reference(marker_id);
        input.created_by = Some(actor.user_id);
        let entry = self.journal.create_entry_in(&txn, input).await?;

        let marker = year_end_closings::ActiveModel {
            id: Set(marker_id),
            fiscal_year: Set(year),
            closing_date: Set(closing_date),
            closing_entry_id: Set(entry.entry.id),
            capital_account_id: Set(capital.into_inner()),
            net_income: Set(plan.net_income),
            closed_by: Set(Some(actor.user_id.into_inner())),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&txn)
        .await?;

        AuditRepository::record_in(
            &txn,
            AuditRecord {
                action: AuditAction::YearClosed,
                entity_type: "fiscal_year",
                entity_id: marker.id,
                actor: Some(actor.user_id),
                details: json!({
                    "fiscal_year": year,
                    "closing_date": closing_date,
                    "entry_number": entry.entry.entry_number,
                    "net_income": plan.net_income,
                }),
            },
        )
        .await?;

        txn.commit().await?;

        info!(
            fiscal_year = year,
            entry_number = %entry.entry.entry_number,
            net_income = %plan.net_income,
            "fiscal year closed"
        );
        Ok(ClosedYear { marker, entry })
    }

    /// Whether `year` has a closing marker.
    pub async fn is_closed(&self, year: i32) -> Result<bool, ClosingRepoError> {
        Ok(year_end_closings::Entity::find()
            .filter(year_end_closings::Column::FiscalYear.eq(year))
            .one(&self.db)
            .await?
            .is_some())
    }

    /// Closing markers, most recent year first.
    pub async fn list(&self) -> Result<Vec<year_end_closings::Model>, ClosingRepoError> {
        Ok(year_end_closings::Entity::find()
            .order_by_desc(year_end_closings::Column::FiscalYear)
            .all(&self.db)
            .await?)
    }

    /// Loads a closing marker by id.
    pub async fn find(&self, id: Uuid) -> Result<Option<year_end_closings::Model>, ClosingRepoError> {
        Ok(year_end_closings::Entity::find_by_id(id).one(&self.db).await?)
    }
}
