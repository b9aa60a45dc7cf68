//! Command implementations. Output goes to stdout, logs to stderr.

use anyhow::{Context, bail};
use daftar_core::closing::year_end;
use daftar_core::permission::Actor;
use daftar_core::posting::AccountMap;
use daftar_db::Ledger;
use daftar_db::entities::sea_orm_active_enums::FailureStatus;
use daftar_db::repositories::{AuditFilter, ReconcileMode};
use daftar_shared::types::{AccountId, UserId};
use tracing::info;
use uuid::Uuid;

use crate::{
    AuditArgs, CloseYearArgs, Command, FailuresCommand, ReconcileArgs, ReconcileTarget,
    SequenceCommand,
};

pub async fn run(
    ledger: &Ledger,
    posting_accounts: &AccountMap,
    operator: Uuid,
    command: Command,
) -> anyhow::Result<()> {
    let operator = UserId::from_uuid(operator);
    let actor = Actor::superuser(operator);

    match command {
        Command::InitChart => {
            let created = ledger.accounts.ensure_posting_accounts(posting_accounts).await?;
            for (role, account) in &created {
                println!("{:<6} {:<30} {}", account.code, account.name, role.as_str());
            }
            println!("{} account(s) created", created.len());
        }
        Command::FixParents => {
            let fixes = ledger.accounts.fix_missing_parents().await?;
            for fix in &fixes {
                println!("{} -> {}", fix.account_id, fix.parent_id);
            }
            println!("{} account(s) attached", fixes.len());
        }
        Command::Balance(args) => {
            let account = ledger
                .accounts
                .find_by_code(&args.code)
                .await?
                .with_context(|| format!("account {} not found", args.code))?;
            let id = AccountId::from_uuid(account.id);
            let balance = match args.as_of.as_of {
                Some(as_of) => ledger.balances.get_balance_as_of(id, as_of).await?,
                None => ledger.balances.get_balance(id).await?,
            };
            println!("{} {}", account.code, account.name);
            println!("  debit   {}", balance.debit_total);
            println!("  credit  {}", balance.credit_total);
            println!("  balance {} ({:?})", balance.balance, balance.source);
        }
        Command::TrialBalance(args) => {
            let rows = ledger.balances.trial_balance(args.as_of).await?;
            for row in &rows {
                println!(
                    "{:<8} {:<30} {:<10} {:>16} {:>16} {:>16}",
                    row.code, row.name, row.account_type.as_str(), row.debit_total, row.credit_total, row.balance
                );
            }
        }
        Command::Reconcile(args) => reconcile(ledger, &actor, &args).await?,
        Command::Divergence => {
            let divergent = ledger.balances.ledger_divergence().await?;
            for row in &divergent {
                println!(
                    "{} {:<24} sub-ledger {} ledger {} delta {}",
                    row.holder, row.name, row.subledger_balance, row.ledger_balance, row.delta
                );
            }
            if divergent.is_empty() {
                println!("no divergence");
            }
        }
        Command::Sequence(args) => sequence(ledger, args.command).await?,
        Command::Failures(args) => failures(ledger, operator, args.command).await?,
        Command::CloseYear(args) => close_year(ledger, &actor, args).await?,
        Command::Audit(args) => audit(ledger, &args).await?,
    }
    Ok(())
}

async fn reconcile(ledger: &Ledger, actor: &Actor, args: &ReconcileArgs) -> anyhow::Result<()> {
    let mode = if args.apply {
        ReconcileMode::Apply(actor)
    } else {
        ReconcileMode::DryRun
    };

    let (checked, drifted, applied) = match args.target {
        ReconcileTarget::Accounts => {
            let report = ledger.balances.reconcile_accounts(mode).await?;
            for row in &report.drifts {
                println!(
                    "{:<8} cached {:?} computed {} delta {}",
                    row.code, row.drift.cached, row.drift.computed, row.drift.delta
                );
            }
            (report.checked, report.drifts.len(), report.applied)
        }
        ReconcileTarget::Subledgers => {
            let report = ledger.balances.reconcile_subledgers(mode).await?;
            for row in &report.drifts {
                println!(
                    "{} {:<24} cached {:?} computed {} delta {}",
                    row.holder, row.name, row.drift.cached, row.drift.computed, row.drift.delta
                );
            }
            (report.checked, report.drifts.len(), report.applied)
        }
    };

    let verb = if applied { "corrected" } else { "drifted" };
    println!("{checked} checked, {drifted} {verb}");
    Ok(())
}

async fn sequence(ledger: &Ledger, command: SequenceCommand) -> anyhow::Result<()> {
    match command {
        SequenceCommand::List => {
            for row in ledger.sequences.list().await? {
                println!(
                    "{:<28} {:<6} digits {} current {}",
                    format!("{:?}", row.document_type),
                    row.prefix,
                    row.digits,
                    row.current_number
                );
            }
        }
        SequenceCommand::Peek { document_type } => {
            println!("{}", ledger.sequences.peek_next(document_type).await?);
        }
        SequenceCommand::Next { document_type } => {
            let number = ledger.sequences.get_next(document_type).await?;
            info!(%number, "consumed document number");
            println!("{number}");
        }
        SequenceCommand::Advance { document_type, n } => {
            let current = ledger.sequences.advance_to_at_least(document_type, n).await?;
            println!("counter now {current}");
        }
        SequenceCommand::Configure {
            document_type,
            prefix,
            digits,
        } => {
            let row = ledger.sequences.configure(document_type, &prefix, digits).await?;
            println!("{} padded to {} digits", row.prefix, row.digits);
        }
    }
    Ok(())
}

async fn failures(ledger: &Ledger, operator: UserId, command: FailuresCommand) -> anyhow::Result<()> {
    match command {
        FailuresCommand::List { all } => {
            let status = if all { None } else { Some(FailureStatus::Open) };
            for row in ledger.failures().list(status).await? {
                println!(
                    "{} {:<10} {:<24} attempts {} [{}] {}",
                    row.id, row.handler, row.event_kind, row.attempts, row.error_code, row.error
                );
            }
        }
        FailuresCommand::Retry { id } => {
            let outcome = ledger.dispatcher.retry_failure(id, Some(operator)).await?;
            if outcome.succeeded {
                println!("{id} posted after {} attempt(s)", outcome.failure.attempts);
            } else {
                bail!(
                    "{id} still failing after {} attempt(s): {}",
                    outcome.failure.attempts,
                    outcome.failure.error
                );
            }
        }
        FailuresCommand::Resolve { id, note } => {
            if note.trim().is_empty() {
                bail!("a resolution note is required");
            }
            ledger.failures().resolve(id, &note, Some(operator)).await?;
            println!("{id} resolved");
        }
    }
    Ok(())
}

async fn close_year(ledger: &Ledger, actor: &Actor, args: CloseYearArgs) -> anyhow::Result<()> {
    let capital = ledger
        .accounts
        .find_by_code(&args.capital)
        .await?
        .with_context(|| format!("account {} not found", args.capital))?;
    let date = year_end(args.year).with_context(|| format!("invalid year {}", args.year))?;

    let closed = ledger
        .closing
        .close_year(args.year, date, AccountId::from_uuid(capital.id), actor)
        .await?;
    println!(
        "closed {} with entry {} (net {})",
        args.year, closed.entry.entry.entry_number, closed.marker.net_income
    );
    Ok(())
}

async fn audit(ledger: &Ledger, args: &AuditArgs) -> anyhow::Result<()> {
    let rows = ledger
        .audit
        .list(AuditFilter {
            entity_id: args.entity,
            action: None,
            limit: Some(args.limit),
        })
        .await?;
    for row in rows {
        println!(
            "{} {:<28} {:<18} {} {}",
            row.created_at.format("%Y-%m-%d %H:%M:%S"),
            row.action,
            row.entity_type,
            row.entity_id,
            row.details
        );
    }
    Ok(())
}
