//! Chart and line loaders shared by the repositories.
//!
//! Every function takes a generic connection so callers can run it on the
//! pool or inside their own transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use daftar_core::accounts::{AccountNode, ChartTree};
use daftar_core::balance::{BalanceEngine, LineTotals, RollupError};
use daftar_shared::types::{AccountId, round_amount};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::entities::{accounts, journal_entries, journal_lines};

/// Builds a hierarchy node from an account row.
pub(crate) fn node(model: &accounts::Model) -> AccountNode {
    AccountNode {
        id: AccountId::from_uuid(model.id),
        code: model.code.clone(),
        account_type: model.account_type.into(),
        parent_id: model.parent_id.map(AccountId::from_uuid),
        is_active: model.is_active,
    }
}

/// Loads the whole chart of accounts into memory.
pub(crate) async fn load_tree<C: ConnectionTrait>(conn: &C) -> Result<ChartTree, DbErr> {
    let rows = accounts::Entity::find().all(conn).await?;
    Ok(ChartTree::new(rows.iter().map(node)))
}

/// Per-account totals of journal lines, optionally limited to entries dated
/// on or before `as_of`.
pub(crate) async fn load_line_totals<C: ConnectionTrait>(
    conn: &C,
    as_of: Option<NaiveDate>,
) -> Result<HashMap<AccountId, LineTotals>, DbErr> {
    let mut query = journal_lines::Entity::find()
        .select_only()
        .column(journal_lines::Column::AccountId)
        .column(journal_lines::Column::Debit)
        .column(journal_lines::Column::Credit);
    if let Some(date) = as_of {
        query = query
            .inner_join(journal_entries::Entity)
            .filter(journal_entries::Column::EntryDate.lte(date));
    }

    let rows: Vec<(Uuid, Decimal, Decimal)> = query.into_tuple().all(conn).await?;
    Ok(LineTotals::collect(rows.into_iter().map(|(account, debit, credit)| {
        (
            AccountId::from_uuid(account),
            round_amount(debit),
            round_amount(credit),
        )
    })))
}

/// Errors raised while refreshing cached balances.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// Hierarchy could not be rolled up.
    #[error(transparent)]
    Rollup(#[from] RollupError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Recomputes the cached balance of `touched` accounts and all their
/// ancestors and writes the results.
pub(crate) async fn refresh_cached_balances<C: ConnectionTrait>(
    conn: &C,
    touched: &[AccountId],
) -> Result<(), RefreshError> {
    if touched.is_empty() {
        return Ok(());
    }
    let tree = load_tree(conn).await?;
    let totals = load_line_totals(conn, None).await?;
    let mut engine = BalanceEngine::new(&tree, &totals);

    let mut targets: HashSet<AccountId> = HashSet::new();
    for id in touched {
        if tree.get(*id).is_some() {
            targets.insert(*id);
            targets.extend(tree.ancestors(*id));
        }
    }

    let now: DateTime<FixedOffset> = Utc::now().into();
    for id in targets {
        let balance = engine.balance(id)?;
        accounts::Entity::update_many()
            .col_expr(accounts::Column::Balance, Expr::value(Some(balance)))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .exec(conn)
            .await?;
    }
    Ok(())
}
