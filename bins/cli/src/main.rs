//! Daftar operator CLI.
//!
//! Reads the same configuration as every other Daftar binary
//! (`config/default.toml`, `config/{RUN_MODE}.toml`, `DAFTAR__*`) and runs
//! one maintenance command against the ledger database.

mod commands;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use daftar_core::posting::AccountMap;
use daftar_core::sequence::DocumentType;
use daftar_db::Ledger;
use daftar_shared::AppConfig;
use daftar_shared::config::LoggingConfig;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "daftar")]
#[command(about = "Maintenance commands for the Daftar general ledger")]
struct Cli {
    /// User recorded on audit rows written by this run.
    #[arg(long, env = "DAFTAR_OPERATOR", default_value_t = Uuid::nil())]
    operator: Uuid,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the accounts the posting rules need, skipping existing codes.
    InitChart,
    /// Attach parentless accounts to their suggested parents.
    FixParents,
    /// Show one account's balance.
    Balance(BalanceArgs),
    /// List every account with its totals and balance.
    TrialBalance(AsOfArgs),
    /// Compare cached balances with the values recomputed from the logs.
    Reconcile(ReconcileArgs),
    /// List cash and bank accounts whose log disagrees with their GL account.
    Divergence,
    /// Inspect or adjust document sequences.
    Sequence(SequenceArgs),
    /// Work the posting failure queue.
    Failures(FailuresArgs),
    /// Close a fiscal year into a capital account.
    CloseYear(CloseYearArgs),
    /// Show recent audit rows.
    Audit(AuditArgs),
}

#[derive(Args, Debug)]
struct AsOfArgs {
    /// Only count entries dated on or before this day (YYYY-MM-DD).
    #[arg(long)]
    as_of: Option<chrono::NaiveDate>,
}

#[derive(Args, Debug)]
struct BalanceArgs {
    /// Account code.
    code: String,
    #[command(flatten)]
    as_of: AsOfArgs,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    #[command(subcommand)]
    target: ReconcileTarget,
    /// Write corrections instead of only reporting them.
    #[arg(long, global = true)]
    apply: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileTarget {
    /// Cached account balances.
    Accounts,
    /// Cached cashbox and bank account balances.
    Subledgers,
}

#[derive(Args, Debug)]
struct SequenceArgs {
    #[command(subcommand)]
    command: SequenceCommand,
}

#[derive(Subcommand, Debug)]
enum SequenceCommand {
    /// List configured sequences.
    List,
    /// Show the next number without consuming it.
    Peek {
        /// Document type, e.g. `journal_entry`.
        #[arg(value_parser = parse_document_type)]
        document_type: DocumentType,
    },
    /// Consume and print the next number.
    Next {
        /// Document type.
        #[arg(value_parser = parse_document_type)]
        document_type: DocumentType,
    },
    /// Raise the counter so the next number is at least N + 1.
    Advance {
        /// Document type.
        #[arg(value_parser = parse_document_type)]
        document_type: DocumentType,
        /// Highest number already used elsewhere.
        n: i64,
    },
    /// Set a sequence's prefix and width.
    Configure {
        /// Document type.
        #[arg(value_parser = parse_document_type)]
        document_type: DocumentType,
        /// Number prefix.
        #[arg(long)]
        prefix: String,
        /// Zero-pad width.
        #[arg(long, default_value_t = 6)]
        digits: i64,
    },
}

#[derive(Args, Debug)]
struct FailuresArgs {
    #[command(subcommand)]
    command: FailuresCommand,
}

#[derive(Subcommand, Debug)]
enum FailuresCommand {
    /// List queued failures.
    List {
        /// Include resolved failures.
        #[arg(long)]
        all: bool,
    },
    /// Re-publish a queued event.
    Retry {
        /// Failure id.
        id: Uuid,
    },
    /// Close a failure without re-posting.
    Resolve {
        /// Failure id.
        id: Uuid,
        /// What was done about it.
        #[arg(long)]
        note: String,
    },
}

#[derive(Args, Debug)]
struct CloseYearArgs {
    /// Fiscal year.
    year: i32,
    /// Code of the equity account receiving the net result.
    #[arg(long)]
    capital: String,
}

#[derive(Args, Debug)]
struct AuditArgs {
    /// Only rows about this entity.
    #[arg(long)]
    entity: Option<Uuid>,
    /// Maximum rows.
    #[arg(long, default_value_t = 50)]
    limit: u64,
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    raw.parse()
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    let posting_accounts = AccountMap::with_overrides(&config.ledger.posting_accounts)
        .context("invalid ledger.posting_accounts")?;
    let db = daftar_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let ledger = Ledger::new(&db, posting_accounts.clone());
    commands::run(&ledger, &posting_accounts, cli.operator, cli.command).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["daftar", "reconcile", "accounts"], ReconcileTarget::Accounts, false)]
    #[case(&["daftar", "reconcile", "subledgers", "--apply"], ReconcileTarget::Subledgers, true)]
    #[case(&["daftar", "reconcile", "--apply", "accounts"], ReconcileTarget::Accounts, true)]
    fn test_reconcile_args(#[case] argv: &[&str], #[case] target: ReconcileTarget, #[case] apply: bool) {
        let cli = Cli::try_parse_from(argv).unwrap();
        let Command::Reconcile(args) = cli.command else {
            panic!("expected reconcile");
        };
        assert_eq!(args.target, target);
        assert_eq!(args.apply, apply);
    }

    #[test]
    fn test_sequence_type_is_validated() {
        let cli = Cli::try_parse_from(["daftar", "sequence", "peek", "journal_entry"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Sequence(SequenceArgs {
                command: SequenceCommand::Peek {
                    document_type: DocumentType::JournalEntry
                }
            })
        ));
        assert!(Cli::try_parse_from(["daftar", "sequence", "peek", "invoice"]).is_err());
    }

    #[test]
    fn test_close_year_args() {
        let cli = Cli::try_parse_from([
            "daftar",
            "--operator",
            "00000000-0000-0000-0000-000000000007",
            "close-year",
            "2025",
            "--capital",
            "3010",
        ])
        .unwrap();
        assert_eq!(cli.operator.as_u128(), 7);
        let Command::CloseYear(args) = cli.command else {
            panic!("expected close-year");
        };
        assert_eq!(args.year, 2025);
        assert_eq!(args.capital, "3010");
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
