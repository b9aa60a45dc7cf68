//! Database migration runner for Daftar.
//!
//! Usage:
//!   migrator up [-n N]    - Run pending migrations
//!   migrator down [-n N]  - Roll back the last N migrations (default 1)
//!   migrator status       - Show migration status
//!   migrator fresh        - Drop all tables and re-run migrations
//!
//! The database is taken from the application configuration
//! (`config/default.toml`, `DAFTAR__DATABASE__URL`, ...).

use anyhow::Context;
use clap::{Parser, Subcommand};
use daftar_db::migration::Migrator;
use daftar_shared::AppConfig;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "migrator", about = "Apply Daftar database migrations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run pending migrations.
    Up {
        /// Only apply this many.
        #[arg(short = 'n', long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations.
    Down {
        #[arg(short = 'n', long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations.
    Status,
    /// Drop every table and migrate from scratch.
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let db = daftar_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;

    match cli.command {
        Command::Up { steps } => {
            Migrator::up(&db, steps).await?;
            info!("migrations applied");
        }
        Command::Down { steps } => {
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "migrations rolled back");
        }
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => {
            Migrator::fresh(&db).await?;
            info!("database recreated");
        }
    }
    Ok(())
}
