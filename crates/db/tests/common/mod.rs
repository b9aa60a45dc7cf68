//! Shared fixtures for the database integration tests.
//!
//! Every test gets its own in-memory SQLite database with the full schema
//! and a chart covering the default posting roles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use daftar_core::permission::Actor;
use daftar_core::posting::{AccountMap, AccountRole};
use daftar_db::Ledger;
use daftar_db::migration::{Migrator, MigratorTrait};
use daftar_shared::types::{AccountId, UserId};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use uuid::Uuid;

/// A migrated database with the default chart.
pub struct TestLedger {
    pub db: DatabaseConnection,
    pub ledger: Ledger,
    pub roles: HashMap<AccountRole, AccountId>,
    pub admin: Actor,
}

impl TestLedger {
    /// The account seeded for `role`.
    pub fn account(&self, role: AccountRole) -> AccountId {
        self.roles[&role]
    }
}

/// Single-connection pool so every test sees the same in-memory database.
pub async fn connect() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// A migrated database file shared by a real connection pool.
///
/// The file is removed when the value drops.
pub struct FileDb {
    pub db: DatabaseConnection,
    path: PathBuf,
}

impl Drop for FileDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Opens a fresh database file with up to `connections` pooled connections.
pub async fn connect_file(connections: u32) -> FileDb {
    let path = std::env::temp_dir().join(format!("daftar-{}.db", Uuid::now_v7()));
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(connections).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    FileDb { db, path }
}

/// Connects, migrates, and seeds one account per posting role.
pub async fn setup() -> TestLedger {
    let db = connect().await;
    let map = AccountMap::default();
    let ledger = Ledger::new(&db, map.clone());

    let roles: HashMap<AccountRole, AccountId> = ledger
        .accounts
        .ensure_posting_accounts(&map)
        .await
        .unwrap()
        .into_iter()
        .map(|(role, account)| (role, AccountId::from_uuid(account.id)))
        .collect();
    assert_eq!(roles.len(), AccountRole::ALL.len());

    TestLedger {
        db,
        ledger,
        roles,
        admin: Actor::superuser(UserId::new()),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
