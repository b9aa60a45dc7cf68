//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Operations that have to join a caller's transaction come in `*_in`
//! variants generic over [`sea_orm::ConnectionTrait`].

pub mod account;
pub mod audit;
pub mod balance;
pub mod closing;
pub mod dispatch;
pub mod failures;
pub mod journal;
mod ledger_state;
pub mod sequence;
pub mod subledger;

pub use account::{
    AccountError, AccountFilter, AccountRepository, CreateAccountInput, ParentFix,
    UpdateAccountInput,
};
pub use audit::{AuditAction, AuditFilter, AuditRecord, AuditRepository};
pub use balance::{
    AccountDrift, BalanceError, BalanceRepository, HolderDrift, LedgerDivergence, ReconcileMode,
    ReconciliationReport, TrialBalanceRow,
};
pub use closing::{ClosedYear, ClosingRepoError, ClosingRepository};
pub use dispatch::{
    DispatchError, EventDispatcher, EventHandler, HandlerOutcome, PostingHandler, RetryOutcome,
    SideEffectOutcome, SubledgerHandler,
};
pub use failures::{FailureQueueError, NewFailure, PostingFailureRepository};
pub use journal::{EntryFilter, EntryWithLines, JournalError, JournalRepository};
pub use ledger_state::RefreshError;
pub use sequence::{
    HealingSource, MAX_BUSY_RETRIES, MAX_CAS_ATTEMPTS, SequenceRepoError, SequenceRepository,
};
pub use subledger::{
    CreateHolderInput, HolderSummary, RecordInput, RecordedMovement, SubledgerRepoError,
    SubledgerRepository, SubledgerRow,
};
