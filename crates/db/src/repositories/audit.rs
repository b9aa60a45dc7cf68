//! Audit log repository.

use chrono::Utc;
use daftar_shared::types::{AuditLogId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::audit_logs;

/// Actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    /// A journal entry's lines were replaced.
    EntryEdited,
    /// A journal entry was deleted.
    EntryDeleted,
    /// A cached account balance was overwritten by reconciliation.
    AccountBalanceCorrected,
    /// A cached cash/bank balance was overwritten by reconciliation.
    HolderBalanceCorrected,
    /// A sub-ledger row was reversed by an offsetting row.
    SubledgerReversed,
    /// A fiscal year was closed.
    YearClosed,
    /// A queued posting failure was resolved manually.
    FailureResolved,
}

impl AuditAction {
    /// Returns the stored action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntryEdited => "journal_entry.edited",
            Self::EntryDeleted => "journal_entry.deleted",
            Self::AccountBalanceCorrected => "account.balance_corrected",
            Self::HolderBalanceCorrected => "subledger.balance_corrected",
            Self::SubledgerReversed => "subledger.reversed",
            Self::YearClosed => "fiscal_year.closed",
            Self::FailureResolved => "posting_failure.resolved",
        }
    }
}

/// One audit record to write.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// What happened.
    pub action: AuditAction,
    /// Kind of the affected row (`journal_entry`, `account`, ...).
    pub entity_type: &'static str,
    /// ID of the affected row.
    pub entity_id: Uuid,
    /// Who did it, if known.
    pub actor: Option<UserId>,
    /// Free-form details (prior values, deltas).
    pub details: serde_json::Value,
}

/// Filter options for listing audit rows.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only rows for this entity.
    pub entity_id: Option<Uuid>,
    /// Only rows with this action.
    pub action: Option<AuditAction>,
    /// Maximum number of rows, newest first.
    pub limit: Option<u64>,
}

/// Audit log repository.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Writes one audit row on `conn`, usually the caller's transaction.
    pub async fn record_in<C: ConnectionTrait>(
        conn: &C,
        record: AuditRecord,
    ) -> Result<audit_logs::Model, DbErr> {
        audit_logs::ActiveModel {
            id: Set(AuditLogId::new().into_inner()),
            action: Set(record.action.as_str().to_string()),
            entity_type: Set(record.entity_type.to_string()),
            entity_id: Set(record.entity_id),
            actor_id: Set(record.actor.map(UserId::into_inner)),
            details: Set(record.details),
            created_at: Set(Utc::now().into()),
        }
        .insert(conn)
        .await
    }

    /// Lists audit rows, newest first.
    pub async fn list(&self, filter: AuditFilter) -> Result<Vec<audit_logs::Model>, DbErr> {
        let mut query = audit_logs::Entity::find();
        if let Some(entity_id) = filter.entity_id {
            query = query.filter(audit_logs::Column::EntityId.eq(entity_id));
        }
        if let Some(action) = filter.action {
            query = query.filter(audit_logs::Column::Action.eq(action.as_str()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }
        query
            .order_by_desc(audit_logs::Column::CreatedAt)
            .order_by_desc(audit_logs::Column::Id)
            .all(&self.db)
            .await
    }
}
