//! Account repository for chart of accounts database operations.

use std::collections::HashMap;

use chrono::Utc;
use daftar_core::accounts::{AccountType, ChartTree, HierarchyError};
use daftar_core::balance::RollupError;
use daftar_core::posting::{AccountMap, AccountRole};
use daftar_shared::types::AccountId;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use super::ledger_state::{RefreshError, load_tree, node, refresh_cached_balances};
use crate::entities::{accounts, bank_accounts, cashboxes, journal_lines, sea_orm_active_enums};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account code already exists.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Account code is blank or contains whitespace.
    #[error("Invalid account code '{0}'")]
    InvalidCode(String),

    /// Account name is blank.
    #[error("Account name is required")]
    MissingName,

    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// Parent assignment violates the hierarchy rules.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Cannot delete an account that owns journal lines.
    #[error("Cannot delete account: account has {0} journal lines")]
    HasLines(u64),

    /// Cannot delete an account with child accounts.
    #[error("Cannot delete account: account has {0} child accounts")]
    HasChildren(u64),

    /// Cannot delete an account linked to a cashbox or bank account.
    #[error("Cannot delete account: it is linked to a cash or bank account")]
    LinkedToHolder,

    /// Cached balances could not be rolled up.
    #[error(transparent)]
    Rollup(#[from] RollupError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<RefreshError> for AccountError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Rollup(e) => Self::Rollup(e),
            RefreshError::Database(e) => Self::Database(e),
        }
    }
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::InvalidCode(_) => "INVALID_ACCOUNT_CODE",
            Self::MissingName => "MISSING_ACCOUNT_NAME",
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::Hierarchy(e) => e.error_code(),
            Self::HasLines(_) => "ACCOUNT_HAS_LINES",
            Self::HasChildren(_) => "ACCOUNT_HAS_CHILDREN",
            Self::LinkedToHolder => "ACCOUNT_LINKED_TO_HOLDER",
            Self::Rollup(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<AccountError> for daftar_shared::AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Hierarchy(e) => e.into(),
            AccountError::Rollup(e) => e.into(),
            AccountError::NotFound(_) => Self::NotFound(err.to_string()),
            AccountError::DuplicateCode(_) => Self::Conflict(err.to_string()),
            AccountError::InvalidCode(_) | AccountError::MissingName => {
                Self::Validation(err.to_string())
            }
            AccountError::HasLines(_) | AccountError::HasChildren(_) | AccountError::LinkedToHolder => {
                Self::BusinessRule(err.to_string())
            }
            AccountError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Account code (unique).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Explicit parent.
    pub parent_id: Option<AccountId>,
    /// Whether the account is active.
    pub is_active: bool,
    /// When no parent is given, attach to the suggested parent if one exists.
    pub auto_parent: bool,
}

impl CreateAccountInput {
    /// An active root-level account.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            is_active: true,
            auto_parent: false,
        }
    }

    /// Places the account under `parent`.
    #[must_use]
    pub const fn under(mut self, parent: AccountId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Input for updating an account.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccountInput {
    /// New code.
    pub code: Option<String>,
    /// New name.
    pub name: Option<String>,
    /// New parent; `Some(None)` detaches the account.
    pub parent_id: Option<Option<AccountId>>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// Filter options for listing accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Filter by account type.
    pub account_type: Option<AccountType>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Only direct children of this account.
    pub parent_id: Option<AccountId>,
}

/// An orphan that was attached to its suggested parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFix {
    /// The previously parentless account.
    pub account_id: AccountId,
    /// The parent it was attached to.
    pub parent_id: AccountId,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is taken or malformed, or the parent is
    /// missing or type-incompatible.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<accounts::Model, AccountError> {
        let code = validate_code(&input.code)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AccountError::MissingName);
        }

        let txn = self.db.begin().await?;
        if code_taken(&txn, &code, None).await? {
            return Err(AccountError::DuplicateCode(code));
        }

        let tree = load_tree(&txn).await?;
        let parent_id = match input.parent_id {
            Some(parent) => {
                tree.validate_new_parent(input.account_type, parent)?;
                Some(parent)
            }
            None if input.auto_parent => tree
                .suggest_parent(&code, input.account_type)
                .map(|parent| parent.id),
            None => None,
        };

        let now = Utc::now().fixed_offset();
        let account = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            code: Set(code),
            name: Set(name.to_string()),
            account_type: Set(input.account_type.into()),
            parent_id: Set(parent_id.map(AccountId::into_inner)),
            is_active: Set(input.is_active),
            balance: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(account)
    }

    /// Updates an account's code, name, parent, or active flag.
    ///
    /// A new parent is checked against the account's own subtree so the
    /// hierarchy can never loop.
    pub async fn update_account(
        &self,
        id: AccountId,
        input: UpdateAccountInput,
    ) -> Result<accounts::Model, AccountError> {
        let txn = self.db.begin().await?;
        let existing = accounts::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;
        let old_parent = existing.parent_id.map(AccountId::from_uuid);
        let mut active: accounts::ActiveModel = existing.into();
        let mut reshaped = false;

        if let Some(code) = input.code {
            let code = validate_code(&code)?;
            if code_taken(&txn, &code, Some(id)).await? {
                return Err(AccountError::DuplicateCode(code));
            }
            active.code = Set(code);
        }
        if let Some(name) = input.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AccountError::MissingName);
            }
            active.name = Set(name.to_string());
        }
        if let Some(parent) = input.parent_id {
            if let Some(parent) = parent {
                load_tree(&txn).await?.validate_parent(id, parent)?;
            }
            active.parent_id = Set(parent.map(AccountId::into_inner));
            reshaped = true;
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
            reshaped = true;
        }
        active.updated_at = Set(Utc::now().fixed_offset());
        let account = active.update(&txn).await?;

        if reshaped {
            let mut touched = vec![id];
            touched.extend(old_parent);
            refresh_cached_balances(&txn, &touched).await?;
        }

        txn.commit().await?;
        Ok(account)
    }

    /// Deletes an account that owns no lines, has no children, and is not
    /// linked to a cash or bank account.
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AccountError> {
        let txn = self.db.begin().await?;
        let existing = accounts::Entity::find_by_id(id.into_inner())
            .one(&txn)
            .await?
            .ok_or(AccountError::NotFound(id))?;

        let lines = journal_lines::Entity::find()
            .filter(journal_lines::Column::AccountId.eq(existing.id))
            .count(&txn)
            .await?;
        if lines > 0 {
            return Err(AccountError::HasLines(lines));
        }
        let children = accounts::Entity::find()
            .filter(accounts::Column::ParentId.eq(existing.id))
            .count(&txn)
            .await?;
        if children > 0 {
            return Err(AccountError::HasChildren(children));
        }
        let linked = cashboxes::Entity::find()
            .filter(cashboxes::Column::AccountId.eq(existing.id))
            .count(&txn)
            .await?
            + bank_accounts::Entity::find()
                .filter(bank_accounts::Column::AccountId.eq(existing.id))
                .count(&txn)
                .await?;
        if linked > 0 {
            return Err(AccountError::LinkedToHolder);
        }

        accounts::Entity::delete_by_id(existing.id).exec(&txn).await?;
        if let Some(parent) = existing.parent_id {
            refresh_cached_balances(&txn, &[AccountId::from_uuid(parent)]).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Finds an account by ID.
    pub async fn find_account(&self, id: AccountId) -> Result<Option<accounts::Model>, AccountError> {
        Ok(accounts::Entity::find_by_id(id.into_inner()).one(&self.db).await?)
    }

    /// Finds an account by code.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<accounts::Model>, AccountError> {
        Ok(find_by_code_in(&self.db, code).await?)
    }

    /// Lists accounts ordered by code.
    pub async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<accounts::Model>, AccountError> {
        let mut query = accounts::Entity::find();
        if let Some(account_type) = filter.account_type {
            query = query.filter(
                accounts::Column::AccountType.eq(sea_orm_active_enums::AccountType::from(account_type)),
            );
        }
        if let Some(is_active) = filter.is_active {
            query = query.filter(accounts::Column::IsActive.eq(is_active));
        }
        if let Some(parent) = filter.parent_id {
            query = query.filter(accounts::Column::ParentId.eq(parent.into_inner()));
        }
        Ok(query.order_by_asc(accounts::Column::Code).all(&self.db).await?)
    }

    /// Accounts that may become the parent of `id`.
    pub async fn allowed_parents(&self, id: AccountId) -> Result<Vec<accounts::Model>, AccountError> {
        let (tree, models) = self.chart().await?;
        if tree.get(id).is_none() {
            return Err(AccountError::NotFound(id));
        }
        Ok(pick(&models, tree.allowed_parents(id).into_iter().map(|n| n.id)))
    }

    /// The chain from the root down to `id`.
    pub async fn hierarchy_path(&self, id: AccountId) -> Result<Vec<accounts::Model>, AccountError> {
        let (tree, models) = self.chart().await?;
        if tree.get(id).is_none() {
            return Err(AccountError::NotFound(id));
        }
        Ok(pick(&models, tree.hierarchy_path(id).into_iter().map(|n| n.id)))
    }

    /// Suggests a parent for a new account code.
    pub async fn suggest_parent(
        &self,
        code: &str,
        account_type: AccountType,
    ) -> Result<Option<accounts::Model>, AccountError> {
        let (tree, models) = self.chart().await?;
        Ok(tree
            .suggest_parent(code.trim(), account_type)
            .and_then(|parent| models.get(&parent.id).cloned()))
    }

    /// Attaches every parentless account to its suggested parent.
    pub async fn fix_missing_parents(&self) -> Result<Vec<ParentFix>, AccountError> {
        let txn = self.db.begin().await?;
        let tree = load_tree(&txn).await?;

        let mut fixes: Vec<ParentFix> = tree
            .nodes()
            .filter(|node| node.parent_id.is_none())
            .filter_map(|node| {
                tree.suggest_parent_for(node.id).map(|parent| ParentFix {
                    account_id: node.id,
                    parent_id: parent.id,
                })
            })
            .collect();
        fixes.sort_by_key(|fix| fix.account_id);

        let now = Utc::now().fixed_offset();
        let mut applied = Vec::with_capacity(fixes.len());
        for fix in fixes {
            let current = load_tree(&txn).await?;
            if current.validate_parent(fix.account_id, fix.parent_id).is_err() {
                continue;
            }
            accounts::ActiveModel {
                id: Set(fix.account_id.into_inner()),
                parent_id: Set(Some(fix.parent_id.into_inner())),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await?;
            applied.push(fix);
        }

        let touched: Vec<AccountId> = applied.iter().map(|fix| fix.account_id).collect();
        refresh_cached_balances(&txn, &touched).await?;
        txn.commit().await?;

        if !applied.is_empty() {
            info!(count = applied.len(), "attached orphan accounts to suggested parents");
        }
        Ok(applied)
    }

    /// Creates an account for every posting role whose configured code does
    /// not exist yet. Existing accounts are left untouched.
    pub async fn ensure_posting_accounts(
        &self,
        map: &AccountMap,
    ) -> Result<Vec<(AccountRole, accounts::Model)>, AccountError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();
        let mut created = Vec::new();

        for role in AccountRole::ALL {
            let code = validate_code(map.code(role))?;
            if code_taken(&txn, &code, None).await? {
                continue;
            }
            let account = accounts::ActiveModel {
                id: Set(AccountId::new().into_inner()),
                code: Set(code),
                name: Set(role_name(role)),
                account_type: Set(role.account_type().into()),
                parent_id: Set(None),
                is_active: Set(true),
                balance: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            created.push((role, account));
        }

        txn.commit().await?;
        if !created.is_empty() {
            info!(count = created.len(), "posting accounts created");
        }
        Ok(created)
    }

    async fn chart(&self) -> Result<(ChartTree, HashMap<AccountId, accounts::Model>), DbErr> {
        let models = accounts::Entity::find().all(&self.db).await?;
        let tree = ChartTree::new(models.iter().map(node));
        let by_id = models
            .into_iter()
            .map(|model| (AccountId::from_uuid(model.id), model))
            .collect();
        Ok((tree, by_id))
    }
}

/// Finds an account by code on `conn`.
pub(crate) async fn find_by_code_in<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<accounts::Model>, DbErr> {
    accounts::Entity::find()
        .filter(accounts::Column::Code.eq(code))
        .one(conn)
        .await
}

fn validate_code(raw: &str) -> Result<String, AccountError> {
    let code = raw.trim();
    if code.is_empty() || code.chars().any(char::is_whitespace) {
        return Err(AccountError::InvalidCode(raw.to_string()));
    }
    Ok(code.to_string())
}

async fn code_taken<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    except: Option<AccountId>,
) -> Result<bool, DbErr> {
    let mut query = accounts::Entity::find().filter(accounts::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(accounts::Column::Id.ne(id.into_inner()));
    }
    Ok(query.count(conn).await? > 0)
}

fn role_name(role: AccountRole) -> String {
    let mut name = role.as_str().replace('_', " ");
    if let Some(first) = name.get_mut(..1) {
        first.make_ascii_uppercase();
    }
    name
}

fn pick(
    models: &HashMap<AccountId, accounts::Model>,
    ids: impl Iterator<Item = AccountId>,
) -> Vec<accounts::Model> {
    ids.filter_map(|id| models.get(&id).cloned()).collect()
}
