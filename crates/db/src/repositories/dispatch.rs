//! Explicit business-event dispatch.
//!
//! Collaborators publish a [`BusinessEvent`] after their own write; the
//! handlers registered on the [`EventDispatcher`] turn it into journal
//! entries and sub-ledger rows on the same transaction. Nothing is wired
//! implicitly: a handler runs only if it was registered.

use std::sync::Arc;

use async_trait::async_trait;
use daftar_core::ledger::{CreateEntryInput, JournalLineInput};
use daftar_core::posting::{
    AccountMap, AccountRef, BusinessEvent, PostingError, RuleRegistry, subledger_movements,
};
use daftar_core::subledger::SubledgerHolder;
use daftar_shared::types::{AccountId, UserId};
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::account::find_by_code_in;
use super::failures::{FailureQueueError, NewFailure, PostingFailureRepository};
use super::journal::{JournalError, JournalRepository};
use super::subledger::{
    RecordInput, SubledgerRepoError, find_holder_in, movement_exists_in, record_in,
};
use crate::entities::{accounts, posting_failures};

/// Error types for event dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The posting rule rejected the event.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// The journal entry could not be created.
    #[error(transparent)]
    Journal(#[from] JournalError),

    /// The sub-ledger row could not be recorded.
    #[error(transparent)]
    Subledger(#[from] SubledgerRepoError),

    /// A draft names an account that does not exist.
    #[error("Posting account not found: {0}")]
    UnresolvedAccount(String),

    /// A holder has no linked general-ledger account.
    #[error("Holder {0} is not linked to a ledger account")]
    HolderNotLinked(SubledgerHolder),

    /// Failure queue error.
    #[error(transparent)]
    Queue(#[from] FailureQueueError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DispatchError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Posting(e) => e.error_code(),
            Self::Journal(e) => e.error_code(),
            Self::Subledger(e) => e.error_code(),
            Self::UnresolvedAccount(_) => "POSTING_ACCOUNT_NOT_FOUND",
            Self::HolderNotLinked(_) => "HOLDER_NOT_LINKED",
            Self::Queue(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<DispatchError> for daftar_shared::AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Posting(e) => e.into(),
            DispatchError::Journal(e) => e.into(),
            DispatchError::Subledger(e) => e.into(),
            DispatchError::Queue(e) => e.into(),
            DispatchError::UnresolvedAccount(_) | DispatchError::HolderNotLinked(_) => {
                Self::Configuration(err.to_string())
            }
            DispatchError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// What a handler did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// A journal entry was created.
    Posted(Uuid),
    /// Sub-ledger rows were appended.
    Recorded(usize),
    /// Nothing to do.
    Skipped(&'static str),
}

/// Reacts to business events inside the publisher's transaction.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name stored with queued failures.
    fn name(&self) -> &'static str;

    /// Applies the event.
    async fn handle(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<HandlerOutcome, DispatchError>;
}

/// Posts the journal entry a posting rule drafts for the event.
#[derive(Debug, Clone)]
pub struct PostingHandler {
    rules: RuleRegistry,
    accounts: AccountMap,
    journal: JournalRepository,
}

impl PostingHandler {
    /// Creates a posting handler.
    #[must_use]
    pub const fn new(rules: RuleRegistry, accounts: AccountMap, journal: JournalRepository) -> Self {
        Self {
            rules,
            accounts,
            journal,
        }
    }

    async fn resolve(
        &self,
        txn: &DatabaseTransaction,
        account: &AccountRef,
    ) -> Result<AccountId, DispatchError> {
        let found = match account {
            AccountRef::Role(role) => {
                let code = self.accounts.code(*role);
                find_by_code_in(txn, code)
                    .await?
                    .ok_or_else(|| DispatchError::UnresolvedAccount(format!("{role} ({code})")))?
            }
            AccountRef::Code(code) => find_by_code_in(txn, code)
                .await?
                .ok_or_else(|| DispatchError::UnresolvedAccount(code.clone()))?,
            AccountRef::Id(id) => accounts::Entity::find_by_id(id.into_inner())
                .one(txn)
                .await?
                .ok_or_else(|| DispatchError::UnresolvedAccount(id.to_string()))?,
            AccountRef::Holder(holder) => {
                let summary = find_holder_in(txn, *holder, false)
                    .await?
                    .ok_or(SubledgerRepoError::HolderNotFound(*holder))?;
                return summary
                    .account_id
                    .ok_or(DispatchError::HolderNotLinked(*holder));
            }
        };
        Ok(AccountId::from_uuid(found.id))
    }
}

#[async_trait]
impl EventHandler for PostingHandler {
    fn name(&self) -> &'static str {
        "posting"
    }

    async fn handle(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<HandlerOutcome, DispatchError> {
        let Some(draft) = self.rules.draft(event)? else {
            return Ok(HandlerOutcome::Skipped("no amount to post"));
        };
        let existing =
            JournalRepository::count_by_reference_in(txn, draft.reference_type, draft.reference_id)
                .await?;
        if let Some(reason) = draft.kind.skip_reason(existing) {
            return Ok(HandlerOutcome::Skipped(reason));
        }

        let mut lines = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            lines.push(JournalLineInput {
                account_id: Some(self.resolve(txn, &line.account).await?),
                debit: line.debit,
                credit: line.credit,
                description: line.description.clone(),
            });
        }

        let mut input =
            CreateEntryInput::new(draft.entry_date, draft.reference_type, draft.description, lines)
                .with_reference(draft.reference_id);
        input.created_by = actor;
        let posted = self.journal.create_entry_in(txn, input).await?;
        Ok(HandlerOutcome::Posted(posted.entry.id))
    }
}

/// Appends the cash/bank rows implied by the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubledgerHandler;

#[async_trait]
impl EventHandler for SubledgerHandler {
    fn name(&self) -> &'static str {
        "subledger"
    }

    async fn handle(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<HandlerOutcome, DispatchError> {
        let movements = subledger_movements(event);
        if movements.is_empty() {
            return Ok(HandlerOutcome::Skipped("no cash or bank movement"));
        }

        let mut recorded = 0;
        let mut unmatched = 0;
        for movement in movements {
            if movement_exists_in(
                txn,
                movement.holder,
                movement.tx_type,
                movement.reference_type,
                movement.reference_id,
            )
            .await?
            {
                continue;
            }
            if let Some(original) = movement.reverses
                && !movement_exists_in(
                    txn,
                    movement.holder,
                    original,
                    movement.reference_type,
                    movement.reference_id,
                )
                .await?
            {
                unmatched += 1;
                continue;
            }
            let mut input =
                RecordInput::new(movement.holder, movement.tx_type, movement.amount, movement.date)
                    .with_reference(movement.reference_type, movement.reference_id)
                    .describe(movement.description);
            input.created_by = actor;
            record_in(txn, input).await?;
            recorded += 1;
        }

        Ok(if recorded == 0 && unmatched > 0 {
            HandlerOutcome::Skipped("nothing to reverse")
        } else if recorded == 0 {
            HandlerOutcome::Skipped("already recorded")
        } else {
            HandlerOutcome::Recorded(recorded)
        })
    }
}

/// Result of a best-effort side-effect publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectOutcome {
    /// Every handler succeeded.
    Applied(Vec<HandlerOutcome>),
    /// A handler failed; its work was rolled back and the event queued.
    Queued(Uuid),
}

/// Result of retrying a queued failure.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    /// The queue row after the attempt.
    pub failure: posting_failures::Model,
    /// Whether the event posted this time.
    pub succeeded: bool,
}

/// Runs registered handlers for published events.
#[derive(Clone)]
pub struct EventDispatcher {
    db: DatabaseConnection,
    handlers: Vec<Arc<dyn EventHandler>>,
    failures: PostingFailureRepository,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field(
                "handlers",
                &self.handlers.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl EventDispatcher {
    /// A dispatcher with no handlers.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            failures: PostingFailureRepository::new(db.clone()),
            db,
            handlers: Vec::new(),
        }
    }

    /// A dispatcher with the posting handler followed by the sub-ledger
    /// handler.
    #[must_use]
    pub fn standard(db: DatabaseConnection, journal: JournalRepository, accounts: AccountMap) -> Self {
        Self::new(db)
            .with_handler(PostingHandler::new(RuleRegistry::standard(), accounts, journal))
            .with_handler(SubledgerHandler)
    }

    /// Registers a handler; handlers run in registration order.
    #[must_use]
    pub fn with_handler(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Names of the registered handlers.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// The failure queue.
    #[must_use]
    pub const fn failures(&self) -> &PostingFailureRepository {
        &self.failures
    }

    /// Runs every handler on `txn`. Any failure is returned and the caller's
    /// transaction should be rolled back.
    pub async fn publish(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<Vec<HandlerOutcome>, DispatchError> {
        self.run(txn, event, actor)
            .await
            .map_err(|(_, error)| error)
    }

    /// Runs every handler inside a savepoint of `txn`.
    ///
    /// On failure the savepoint is rolled back, the event is written to the
    /// failure queue on `txn`, and the caller's own write still commits.
    pub async fn publish_side_effect(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<SideEffectOutcome, DispatchError> {
        let savepoint = txn.begin().await?;
        match self.run(&savepoint, event, actor).await {
            Ok(outcomes) => {
                savepoint.commit().await?;
                Ok(SideEffectOutcome::Applied(outcomes))
            }
            Err((handler, error)) => {
                savepoint.rollback().await?;
                let queued = PostingFailureRepository::record_in(
                    txn,
                    NewFailure {
                        handler,
                        event,
                        error: error.to_string(),
                        error_code: error.error_code(),
                        actor,
                    },
                )
                .await?;
                warn!(
                    event_kind = %event.kind(),
                    reference_id = %event.reference_id(),
                    handler,
                    error = %error,
                    failure_id = %queued.id,
                    "posting failed; queued for remediation"
                );
                Ok(SideEffectOutcome::Queued(queued.id))
            }
        }
    }

    /// Re-publishes a queued event in its own transaction.
    ///
    /// The queue row is resolved on success and its attempt count bumped
    /// either way.
    pub async fn retry_failure(
        &self,
        id: Uuid,
        actor: Option<UserId>,
    ) -> Result<RetryOutcome, DispatchError> {
        let (failure, event) = self.failures.open_event(id).await?;

        let txn = self.db.begin().await?;
        let attempt = match self.publish(&txn, &event, actor).await {
            Ok(_) => {
                txn.commit().await?;
                Ok(())
            }
            Err(error) => {
                txn.rollback().await?;
                Err((error.to_string(), error.error_code()))
            }
        };

        let succeeded = attempt.is_ok();
        let failure = self.failures.record_attempt(failure, attempt).await?;
        if succeeded {
            info!(failure_id = %id, event_kind = %failure.event_kind, "queued posting retried");
        } else {
            warn!(failure_id = %id, attempts = failure.attempts, error = %failure.error, "queued posting failed again");
        }
        Ok(RetryOutcome { failure, succeeded })
    }

    async fn run(
        &self,
        txn: &DatabaseTransaction,
        event: &BusinessEvent,
        actor: Option<UserId>,
    ) -> Result<Vec<HandlerOutcome>, (&'static str, DispatchError)> {
        let mut outcomes = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            let outcome = handler
                .handle(txn, event, actor)
                .await
                .map_err(|error| (handler.name(), error))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
