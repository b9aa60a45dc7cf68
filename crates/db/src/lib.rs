//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - Database migrations
//! - The event dispatcher that turns business events into postings

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    AccountRepository, AuditRepository, BalanceRepository, ClosingRepository, EventDispatcher,
    JournalRepository, PostingFailureRepository, SequenceRepository, SubledgerRepository,
};

use std::time::Duration;

use daftar_core::posting::AccountMap;
use daftar_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection using the configured limits.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Every repository wired to one connection pool.
#[derive(Debug, Clone)]
pub struct Ledger {
    /// Chart of accounts.
    pub accounts: AccountRepository,
    /// Journal entries.
    pub journal: JournalRepository,
    /// Document sequences.
    pub sequences: SequenceRepository,
    /// Cashboxes and bank accounts.
    pub subledger: SubledgerRepository,
    /// Balances and reconciliation.
    pub balances: BalanceRepository,
    /// Year-end closing.
    pub closing: ClosingRepository,
    /// Audit trail.
    pub audit: AuditRepository,
    /// Event dispatcher with the standard handlers.
    pub dispatcher: EventDispatcher,
}

impl Ledger {
    /// Wires the repositories with the given posting accounts.
    #[must_use]
    pub fn new(db: &DatabaseConnection, posting_accounts: AccountMap) -> Self {
        let sequences = SequenceRepository::new(db.clone());
        let journal = JournalRepository::new(db.clone(), sequences.clone());
        Self {
            accounts: AccountRepository::new(db.clone()),
            subledger: SubledgerRepository::new(db.clone()),
            balances: BalanceRepository::new(db.clone()),
            closing: ClosingRepository::new(db.clone(), journal.clone()),
            audit: AuditRepository::new(db.clone()),
            dispatcher: EventDispatcher::standard(db.clone(), journal.clone(), posting_accounts),
            sequences,
            journal,
        }
    }

    /// The posting failure queue.
    #[must_use]
    pub const fn failures(&self) -> &PostingFailureRepository {
        self.dispatcher.failures()
    }
}
