//! Permission checks for ledger mutations.
//!
//! Authentication happens outside this crate; callers pass an [`Actor`]
//! describing who is acting and what they may do.

use std::collections::HashSet;

use daftar_shared::AppError;
use daftar_shared::types::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A ledger permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Read journal entries.
    ViewJournalEntries,
    /// Create journal entries.
    AddJournalEntries,
    /// Edit journal entries.
    EditJournalEntries,
    /// Delete journal entries.
    DeleteJournalEntries,
    /// Write corrected balances during reconciliation.
    ApplyReconciliation,
    /// Close a fiscal year.
    CloseYear,
}

impl Permission {
    /// Returns the permission codename.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ViewJournalEntries => "view_journal_entries",
            Self::AddJournalEntries => "add_journal_entries",
            Self::EditJournalEntries => "edit_journal_entries",
            Self::DeleteJournalEntries => "delete_journal_entries",
            Self::ApplyReconciliation => "apply_reconciliation",
            Self::CloseYear => "close_year",
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The actor is missing a required permission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("User {user} lacks permission '{permission}'")]
pub struct PermissionDenied {
    /// The acting user.
    pub user: UserId,
    /// The missing permission.
    pub permission: Permission,
}

impl PermissionDenied {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        "PERMISSION_DENIED"
    }
}

impl From<PermissionDenied> for AppError {
    fn from(err: PermissionDenied) -> Self {
        Self::Forbidden(err.to_string())
    }
}

/// Who is performing a ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    permissions: HashSet<Permission>,
    is_superuser: bool,
}

impl Actor {
    /// An actor with the given permissions.
    #[must_use]
    pub fn new(user_id: UserId, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            user_id,
            permissions: permissions.into_iter().collect(),
            is_superuser: false,
        }
    }

    /// An actor that holds every permission.
    #[must_use]
    pub fn superuser(user_id: UserId) -> Self {
        Self {
            user_id,
            permissions: HashSet::new(),
            is_superuser: true,
        }
    }

    /// Whether the actor holds `permission`.
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.is_superuser || self.permissions.contains(&permission)
    }

    /// Requires `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionDenied`] if the actor lacks it.
    pub fn require(&self, permission: Permission) -> Result<(), PermissionDenied> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(PermissionDenied {
                user: self.user_id,
                permission,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        let actor = Actor::new(UserId::new(), [Permission::ViewJournalEntries]);
        assert!(actor.require(Permission::ViewJournalEntries).is_ok());
        let denied = actor.require(Permission::DeleteJournalEntries).unwrap_err();
        assert_eq!(denied.permission, Permission::DeleteJournalEntries);
        assert_eq!(AppError::from(denied).status_code(), 403);
    }

    #[test]
    fn test_superuser_has_everything() {
        let actor = Actor::superuser(UserId::new());
        assert!(actor.has(Permission::ApplyReconciliation));
        assert!(actor.has(Permission::CloseYear));
    }
}
