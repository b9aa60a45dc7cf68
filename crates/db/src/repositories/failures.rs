//! Posting failure queue.
//!
//! Side-effect postings that fail are stored here with the serialized event
//! so an operator can list, retry, or close them.

use chrono::Utc;
use daftar_core::posting::BusinessEvent;
use daftar_shared::types::{PostingFailureId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::json;
use uuid::Uuid;

use super::audit::{AuditAction, AuditRecord, AuditRepository};
use crate::entities::{posting_failures, sea_orm_active_enums::FailureStatus};

/// Error types for failure queue operations.
#[derive(Debug, thiserror::Error)]
pub enum FailureQueueError {
    /// Queue row not found.
    #[error("Posting failure not found: {0}")]
    NotFound(Uuid),

    /// Queue row is already resolved.
    #[error("Posting failure already resolved: {0}")]
    AlreadyResolved(Uuid),

    /// Stored event could not be (de)serialized.
    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl FailureQueueError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "POSTING_FAILURE_NOT_FOUND",
            Self::AlreadyResolved(_) => "POSTING_FAILURE_RESOLVED",
            Self::Payload(_) => "INVALID_EVENT_PAYLOAD",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<FailureQueueError> for daftar_shared::AppError {
    fn from(err: FailureQueueError) -> Self {
        match err {
            FailureQueueError::NotFound(_) => Self::NotFound(err.to_string()),
            FailureQueueError::AlreadyResolved(_) => Self::Conflict(err.to_string()),
            FailureQueueError::Payload(_) => Self::Internal(err.to_string()),
            FailureQueueError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// A failure to enqueue.
#[derive(Debug, Clone)]
pub struct NewFailure<'a> {
    /// Handler that failed.
    pub handler: &'static str,
    /// The event being published.
    pub event: &'a BusinessEvent,
    /// Rendered error.
    pub error: String,
    /// Machine-readable error code.
    pub error_code: &'static str,
    /// Who published the event.
    pub actor: Option<UserId>,
}

/// Posting failure repository.
#[derive(Debug, Clone)]
pub struct PostingFailureRepository {
    db: DatabaseConnection,
}

impl PostingFailureRepository {
    /// Creates a new failure repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Stores a failure on `conn`.
    pub async fn record_in<C: ConnectionTrait>(
        conn: &C,
        failure: NewFailure<'_>,
    ) -> Result<posting_failures::Model, FailureQueueError> {
        let now = Utc::now().fixed_offset();
        Ok(posting_failures::ActiveModel {
            id: Set(PostingFailureId::new().into_inner()),
            handler: Set(failure.handler.to_string()),
            event_kind: Set(failure.event.kind().as_str().to_string()),
            reference_id: Set(failure.event.reference_id()),
            payload: Set(serde_json::to_value(failure.event)?),
            error: Set(failure.error),
            error_code: Set(failure.error_code.to_string()),
            attempts: Set(1),
            status: Set(FailureStatus::Open),
            resolution: Set(None),
            actor_id: Set(failure.actor.map(UserId::into_inner)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?)
    }

    /// Lists failures, oldest first.
    pub async fn list(
        &self,
        status: Option<FailureStatus>,
    ) -> Result<Vec<posting_failures::Model>, FailureQueueError> {
        let mut query = posting_failures::Entity::find();
        if let Some(status) = status {
            query = query.filter(posting_failures::Column::Status.eq(status));
        }
        Ok(query
            .order_by_asc(posting_failures::Column::CreatedAt)
            .order_by_asc(posting_failures::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Finds one failure.
    pub async fn find(&self, id: Uuid) -> Result<Option<posting_failures::Model>, FailureQueueError> {
        Ok(posting_failures::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Loads an open failure and its decoded event.
    pub async fn open_event(
        &self,
        id: Uuid,
    ) -> Result<(posting_failures::Model, BusinessEvent), FailureQueueError> {
        let failure = self.find(id).await?.ok_or(FailureQueueError::NotFound(id))?;
        if failure.status == FailureStatus::Resolved {
            return Err(FailureQueueError::AlreadyResolved(id));
        }
        let event: BusinessEvent = serde_json::from_value(failure.payload.clone())?;
        Ok((failure, event))
    }

    /// Records the outcome of a retry attempt.
    pub async fn record_attempt(
        &self,
        failure: posting_failures::Model,
        outcome: Result<(), (String, &'static str)>,
    ) -> Result<posting_failures::Model, FailureQueueError> {
        let attempts = failure.attempts.saturating_add(1);
        let mut active: posting_failures::ActiveModel = failure.into();
        active.attempts = Set(attempts);
        active.updated_at = Set(Utc::now().fixed_offset());
        match outcome {
            Ok(()) => {
                active.status = Set(FailureStatus::Resolved);
                active.resolution = Set(Some("retried".to_string()));
            }
            Err((error, code)) => {
                active.error = Set(error);
                active.error_code = Set(code.to_string());
            }
        }
        Ok(active.update(&self.db).await?)
    }

    /// Closes a failure without re-posting, e.g. after a manual correction.
    pub async fn resolve(
        &self,
        id: Uuid,
        note: &str,
        actor: Option<UserId>,
    ) -> Result<posting_failures::Model, FailureQueueError> {
        let txn = self.db.begin().await?;
        let failure = posting_failures::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(FailureQueueError::NotFound(id))?;
        if failure.status == FailureStatus::Resolved {
            return Err(FailureQueueError::AlreadyResolved(id));
        }

        let event_kind = failure.event_kind.clone();
        let mut active: posting_failures::ActiveModel = failure.into();
        active.status = Set(FailureStatus::Resolved);
        active.resolution = Set(Some(note.trim().to_string()));
        active.updated_at = Set(Utc::now().fixed_offset());
        let resolved = active.update(&txn).await?;

        AuditRepository::record_in(
            &txn,
            AuditRecord {
                action: AuditAction::FailureResolved,
                entity_type: "posting_failure",
                entity_id: id,
                actor,
                details: json!({ "event_kind": event_kind, "note": note.trim() }),
            },
        )
        .await?;

        txn.commit().await?;
        Ok(resolved)
    }
}
