//! Journal entry drafts produced by posting rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accounts::AccountRef;
use crate::ledger::reversal::REVERSAL_PREFIX;
use crate::ledger::{EntryTotals, ReferenceType};

/// A draft line whose account is still a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    /// Account to post to.
    pub account: AccountRef,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Line description.
    pub description: Option<String>,
}

impl DraftLine {
    /// A debit line.
    #[must_use]
    pub fn debit(account: impl Into<AccountRef>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account: impl Into<AccountRef>, amount: Decimal) -> Self {
        Self {
            account: account.into(),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a line description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn is_zero(&self) -> bool {
        self.debit.is_zero() && self.credit.is_zero()
    }
}

/// Whether a draft records a business event or cancels an earlier one.
///
/// Each reference carries at most one original entry and one reversal of
/// it, and a reversal is only posted once its original exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftKind {
    /// Posted when the reference has no entry yet.
    Original,
    /// Posted when the reference has exactly its original entry.
    Reversal,
}

impl DraftKind {
    /// Why a draft of this kind must be skipped, given how many entries
    /// already carry its reference; `None` when it should be posted.
    #[must_use]
    pub const fn skip_reason(self, existing: u64) -> Option<&'static str> {
        match (self, existing) {
            (Self::Original, 0) | (Self::Reversal, 1) => None,
            (Self::Original, _) => Some("already posted"),
            (Self::Reversal, 0) => Some("nothing to reverse"),
            (Self::Reversal, _) => Some("already reversed"),
        }
    }
}

/// The journal entry a rule wants posted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDraft {
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Originating business process.
    pub reference_type: ReferenceType,
    /// Originating record.
    pub reference_id: Uuid,
    /// Entry description.
    pub description: String,
    /// Lines, zero lines already removed.
    pub lines: Vec<DraftLine>,
    /// Original posting or reversal of one.
    pub kind: DraftKind,
}

impl PostingDraft {
    /// An empty original draft.
    #[must_use]
    pub fn new(
        entry_date: NaiveDate,
        reference_type: ReferenceType,
        reference_id: Uuid,
        description: impl Into<String>,
    ) -> Self {
        Self {
            entry_date,
            reference_type,
            reference_id,
            description: description.into(),
            lines: Vec::new(),
            kind: DraftKind::Original,
        }
    }

    /// Appends a line unless both of its amounts are zero.
    #[must_use]
    pub fn line(mut self, line: DraftLine) -> Self {
        if !line.is_zero() {
            self.lines.push(line);
        }
        self
    }

    /// Whether the draft carries no amount at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Debit and credit totals.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        self.lines.iter().fold(EntryTotals::default(), |acc, l| EntryTotals {
            debit: acc.debit + l.debit,
            credit: acc.credit + l.credit,
        })
    }

    /// The mirrored draft that cancels this one.
    #[must_use]
    pub fn reversed(self) -> Self {
        Self {
            description: format!("{REVERSAL_PREFIX}{}", self.description),
            lines: self
                .lines
                .into_iter()
                .map(|l| DraftLine {
                    account: l.account,
                    debit: l.credit,
                    credit: l.debit,
                    description: l.description.map(|d| format!("{REVERSAL_PREFIX}{d}")),
                })
                .collect(),
            kind: DraftKind::Reversal,
            ..self
        }
    }
}
