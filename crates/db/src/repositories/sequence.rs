//! Document sequence repository.
//!
//! An allocation first claims the counter row with a write, so concurrent
//! allocators queue on the row lock instead of racing on a stale read. The
//! compare-and-swap on `current_number` stays as a guard: the counter is
//! only advanced when it still holds the value that was read. Before each
//! allocation the highest number already used in the registered record
//! tables is looked up and the counter is raised past it if it has fallen
//! behind.

use std::time::Duration;

use chrono::Utc;
use daftar_core::sequence::{
    DocumentType, SequenceError, SequenceState, advance_target, next_candidate, parse_tail,
};
use sea_orm::sea_query::{Alias, Expr, Func, Order, Query, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, RuntimeErr, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::document_sequences;

/// How many times an allocation is retried after losing a race.
pub const MAX_CAS_ATTEMPTS: u32 = 16;

/// How many times [`SequenceRepository::get_next`] restarts its transaction
/// after the database reports lock contention.
pub const MAX_BUSY_RETRIES: u32 = 50;

/// Rows inspected per round trip while looking for the highest used number.
const MAX_USED_PAGE: usize = 32;

/// Error types for sequence operations.
#[derive(Debug, thiserror::Error)]
pub enum SequenceRepoError {
    /// Sequence rule violated.
    #[error(transparent)]
    Sequence(#[from] SequenceError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl SequenceRepoError {
    /// Whether the database gave up waiting for a lock, so the whole
    /// transaction can be retried.
    #[must_use]
    pub fn is_contended(&self) -> bool {
        matches!(self, Self::Database(e) if is_lock_contention(e))
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Sequence(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<SequenceRepoError> for daftar_shared::AppError {
    fn from(err: SequenceRepoError) -> Self {
        match err {
            SequenceRepoError::Sequence(e) => e.into(),
            SequenceRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A record table whose numbers are issued from a document sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealingSource {
    /// Sequence the numbers come from.
    pub document_type: DocumentType,
    /// Table holding the issued numbers.
    pub table: String,
    /// Column holding the formatted number.
    pub column: String,
}

impl HealingSource {
    /// Creates a healing source.
    #[must_use]
    pub fn new(document_type: DocumentType, table: &str, column: &str) -> Self {
        Self {
            document_type,
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Document sequence repository.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
    sources: Vec<HealingSource>,
}

impl SequenceRepository {
    /// Creates a repository with the journal entry table registered as a
    /// healing source.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            sources: vec![HealingSource::new(
                DocumentType::JournalEntry,
                "journal_entries",
                "entry_number",
            )],
        }
    }

    /// Registers another table whose numbers the counter must stay ahead of.
    #[must_use]
    pub fn with_source(mut self, source: HealingSource) -> Self {
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self
    }

    /// Registered healing sources.
    #[must_use]
    pub fn sources(&self) -> &[HealingSource] {
        &self.sources
    }

    /// Lists every configured sequence.
    pub async fn list(&self) -> Result<Vec<document_sequences::Model>, SequenceRepoError> {
        Ok(document_sequences::Entity::find()
            .order_by_asc(document_sequences::Column::DocumentType)
            .all(&self.db)
            .await?)
    }

    /// Formats the number the next allocation would return without
    /// changing any state.
    pub async fn peek_next(&self, document_type: DocumentType) -> Result<String, SequenceRepoError> {
        let (_, state) = load_state(&self.db, document_type).await?;
        let max_used = self.max_used(&self.db, document_type, &state.prefix).await?;
        Ok(state.peek(max_used))
    }

    /// Allocates the next number in its own transaction.
    ///
    /// Lock contention reported by the database (`SQLITE_BUSY`, Postgres
    /// serialization failures and deadlocks) restarts the transaction with
    /// a short backoff.
    pub async fn get_next(&self, document_type: DocumentType) -> Result<String, SequenceRepoError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.allocate(document_type).await {
                Err(e) if attempt < MAX_BUSY_RETRIES && e.is_contended() => {
                    debug!(document_type = %document_type, attempt, error = %e, "sequence row busy; retrying");
                    tokio::time::sleep(Duration::from_millis(u64::from(attempt.min(10)) * 5)).await;
                }
                result => return result,
            }
        }
    }

    async fn allocate(&self, document_type: DocumentType) -> Result<String, SequenceRepoError> {
        let txn = self.db.begin().await?;
        let number = self.next_number_in(&txn, document_type).await?;
        txn.commit().await?;
        Ok(number)
    }

    /// Allocates the next number on `conn`, usually the caller's
    /// transaction, so the number is released if the caller rolls back.
    pub async fn next_number_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        document_type: DocumentType,
    ) -> Result<String, SequenceRepoError> {
        claim_row(conn, document_type).await?;
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            let (row, state) = load_state(conn, document_type).await?;
            let max_used = self.max_used(conn, document_type, &state.prefix).await?;
            let number = next_candidate(state.current_number, max_used);
            if number > state.current_number {
                info!(
                    document_type = %document_type,
                    counter = state.current_number,
                    max_used = ?max_used,
                    "sequence counter behind issued numbers; healing"
                );
            }

            let swapped = document_sequences::Entity::update_many()
                .col_expr(
                    document_sequences::Column::CurrentNumber,
                    Expr::value(number.saturating_add(1)),
                )
                .col_expr(
                    document_sequences::Column::UpdatedAt,
                    Expr::value(Utc::now().fixed_offset()),
                )
                .filter(document_sequences::Column::Id.eq(row.id))
                .filter(document_sequences::Column::CurrentNumber.eq(row.current_number))
                .exec(conn)
                .await?;
            if swapped.rows_affected == 1 {
                return Ok(state.format(number));
            }
            debug!(document_type = %document_type, attempt, "sequence allocation lost a race; retrying");
        }
        Err(SequenceError::Contended(document_type, MAX_CAS_ATTEMPTS).into())
    }

    /// Raises the counter so the next number is at least `n + 1`.
    ///
    /// Returns the counter value after the call. The counter is never
    /// lowered.
    pub async fn advance_to_at_least(
        &self,
        document_type: DocumentType,
        n: i64,
    ) -> Result<i64, SequenceRepoError> {
        self.advance_in(&self.db, document_type, n).await
    }

    /// Same as [`Self::advance_to_at_least`] on `conn`.
    pub async fn advance_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        document_type: DocumentType,
        n: i64,
    ) -> Result<i64, SequenceRepoError> {
        let (row, _) = load_state(conn, document_type).await?;
        let target = advance_target(row.current_number, n);
        document_sequences::Entity::update_many()
            .col_expr(document_sequences::Column::CurrentNumber, Expr::value(target))
            .col_expr(
                document_sequences::Column::UpdatedAt,
                Expr::value(Utc::now().fixed_offset()),
            )
            .filter(document_sequences::Column::Id.eq(row.id))
            .filter(document_sequences::Column::CurrentNumber.lt(target))
            .exec(conn)
            .await?;

        let (row, _) = load_state(conn, document_type).await?;
        Ok(row.current_number)
    }

    /// Creates or updates a sequence's prefix and padding.
    ///
    /// An existing counter is kept as is.
    pub async fn configure(
        &self,
        document_type: DocumentType,
        prefix: &str,
        digits: i64,
    ) -> Result<document_sequences::Model, SequenceRepoError> {
        let state = SequenceState::new(prefix, digits, 1)?;
        let digits = i32::try_from(state.digits).map_err(|_| SequenceError::InvalidDigits(digits))?;
        let now = Utc::now().fixed_offset();

        let existing = find_row(&self.db, document_type).await?;
        let model = match existing {
            Some(row) => {
                let mut active: document_sequences::ActiveModel = row.into();
                active.prefix = Set(state.prefix);
                active.digits = Set(digits);
                active.updated_at = Set(now);
                active.update(&self.db).await?
            }
            None => {
                document_sequences::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    document_type: Set(document_type.into()),
                    prefix: Set(state.prefix),
                    digits: Set(digits),
                    current_number: Set(state.current_number),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await?
            }
        };
        Ok(model)
    }

    async fn max_used<C: ConnectionTrait>(
        &self,
        conn: &C,
        document_type: DocumentType,
        prefix: &str,
    ) -> Result<Option<i64>, DbErr> {
        let mut max_used: Option<i64> = None;
        for source in self.sources.iter().filter(|s| s.document_type == document_type) {
            if let Some(tail) = max_used_in(conn, source, prefix).await? {
                max_used = Some(max_used.map_or(tail, |m| m.max(tail)));
            }
        }
        Ok(max_used)
    }
}

/// Highest numeric tail in `source` for `prefix`.
///
/// Rows are ordered by their tail with leading zeros stripped, longest
/// first and then lexically, which is numeric order for all-digit tails.
/// Rows whose tail is not all digits are skipped, so the first parseable
/// row is the maximum and usually arrives in the first page.
async fn max_used_in<C: ConnectionTrait>(
    conn: &C,
    source: &HealingSource,
    prefix: &str,
) -> Result<Option<i64>, DbErr> {
    let backend = conn.get_database_backend();
    let column = Alias::new(source.column.as_str());
    let tail_start = i32::try_from(prefix.chars().count()).unwrap_or(i32::MAX).saturating_add(1);
    let stripped: SimpleExpr = Func::cust(Alias::new("LTRIM"))
        .arg(
            Func::cust(Alias::new("SUBSTR"))
                .arg(Expr::col(column.clone()))
                .arg(tail_start),
        )
        .arg("0")
        .into();
    let stripped_len: SimpleExpr = Func::cust(Alias::new("LENGTH")).arg(stripped.clone()).into();

    let mut offset = 0;
    loop {
        let stmt = Query::select()
            .column(column.clone())
            .from(Alias::new(source.table.as_str()))
            .and_where(Expr::col(column.clone()).like(format!("{prefix}%")))
            .order_by_expr(stripped_len.clone(), Order::Desc)
            .order_by_expr(stripped.clone(), Order::Desc)
            .limit(MAX_USED_PAGE as u64)
            .offset(offset)
            .to_owned();
        let rows = conn.query_all(backend.build(&stmt)).await?;
        for row in &rows {
            let number: String = row.try_get("", &source.column)?;
            if let Some(tail) = parse_tail(&number, prefix) {
                return Ok(Some(tail));
            }
        }
        if rows.len() < MAX_USED_PAGE {
            return Ok(None);
        }
        offset += MAX_USED_PAGE as u64;
    }
}

/// Takes the counter row's write lock for the rest of the transaction.
///
/// On `PostgreSQL` this is a row lock; on `SQLite` the first write of a
/// deferred transaction takes the database write lock, so the busy
/// timeout applies instead of an immediate lock-upgrade failure.
async fn claim_row<C: ConnectionTrait>(conn: &C, document_type: DocumentType) -> Result<(), SequenceRepoError> {
    let claimed = document_sequences::Entity::update_many()
        .col_expr(
            document_sequences::Column::UpdatedAt,
            Expr::value(Utc::now().fixed_offset()),
        )
        .filter(
            document_sequences::Column::DocumentType
                .eq(crate::entities::sea_orm_active_enums::DocumentType::from(document_type)),
        )
        .exec(conn)
        .await?;
    if claimed.rows_affected == 0 {
        return Err(SequenceError::NotConfigured(document_type).into());
    }
    Ok(())
}

/// Whether `err` is the database reporting lock contention.
pub(crate) fn is_lock_contention(err: &DbErr) -> bool {
    let (DbErr::Conn(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)))
    | DbErr::Exec(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)))
    | DbErr::Query(RuntimeErr::SqlxError(sea_orm::sqlx::Error::Database(db_err)))) = err
    else {
        return false;
    };
    // SQLite BUSY / LOCKED and their extended codes; Postgres serialization
    // failure and deadlock.
    matches!(
        db_err.code().as_deref(),
        Some("5" | "6" | "261" | "262" | "517" | "40001" | "40P01")
    )
}

async fn find_row<C: ConnectionTrait>(
    conn: &C,
    document_type: DocumentType,
) -> Result<Option<document_sequences::Model>, DbErr> {
    document_sequences::Entity::find()
        .filter(
            document_sequences::Column::DocumentType
                .eq(crate::entities::sea_orm_active_enums::DocumentType::from(document_type)),
        )
        .one(conn)
        .await
}

async fn load_state<C: ConnectionTrait>(
    conn: &C,
    document_type: DocumentType,
) -> Result<(document_sequences::Model, SequenceState), SequenceRepoError> {
    let row = find_row(conn, document_type)
        .await?
        .ok_or(SequenceError::NotConfigured(document_type))?;
    let state = SequenceState::new(&row.prefix, i64::from(row.digits), row.current_number)?;
    Ok((row, state))
}
