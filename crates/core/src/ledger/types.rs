//! Domain types for journal entry creation.

use chrono::NaiveDate;
use daftar_shared::types::{AccountId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The business process that produced a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    /// Entered by hand.
    Manual,
    /// Sales invoice.
    SalesInvoice,
    /// Sales return.
    SalesReturn,
    /// Purchase invoice.
    PurchaseInvoice,
    /// Purchase return.
    PurchaseReturn,
    /// Receipt voucher.
    ReceiptVoucher,
    /// Payment voucher.
    PaymentVoucher,
    /// Transfer between bank accounts.
    BankTransfer,
    /// Transfer between a bank account and a cashbox.
    BankCashTransfer,
    /// Transfer between cashboxes.
    CashboxTransfer,
    /// Transfer between warehouses.
    WarehouseTransfer,
    /// Fixed asset purchase.
    AssetPurchase,
    /// Depreciation charge.
    Depreciation,
    /// Customer check returned unpaid.
    CheckBounced,
    /// Customer check cleared.
    CheckCollected,
    /// Cash collected against an invoice.
    InvoiceCollection,
    /// Opening balance of a cash or bank holder.
    OpeningBalance,
    /// Year-end closing entry.
    YearEndClosing,
    /// Correcting or reversing entry.
    Adjustment,
}

impl ReferenceType {
    /// All reference types.
    pub const ALL: [Self; 19] = [
        Self::Manual,
        Self::SalesInvoice,
        Self::SalesReturn,
        Self::PurchaseInvoice,
        Self::PurchaseReturn,
        Self::ReceiptVoucher,
        Self::PaymentVoucher,
        Self::BankTransfer,
        Self::BankCashTransfer,
        Self::CashboxTransfer,
        Self::WarehouseTransfer,
        Self::AssetPurchase,
        Self::Depreciation,
        Self::CheckBounced,
        Self::CheckCollected,
        Self::InvoiceCollection,
        Self::OpeningBalance,
        Self::YearEndClosing,
        Self::Adjustment,
    ];

    /// Returns the string form stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::SalesInvoice => "sales_invoice",
            Self::SalesReturn => "sales_return",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::PurchaseReturn => "purchase_return",
            Self::ReceiptVoucher => "receipt_voucher",
            Self::PaymentVoucher => "payment_voucher",
            Self::BankTransfer => "bank_transfer",
            Self::BankCashTransfer => "bank_cash_transfer",
            Self::CashboxTransfer => "cashbox_transfer",
            Self::WarehouseTransfer => "warehouse_transfer",
            Self::AssetPurchase => "asset_purchase",
            Self::Depreciation => "depreciation",
            Self::CheckBounced => "check_bounced",
            Self::CheckCollected => "check_collected",
            Self::InvoiceCollection => "invoice_collection",
            Self::OpeningBalance => "opening_balance",
            Self::YearEndClosing => "year_end_closing",
            Self::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReferenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown reference type: {s}"))
    }
}

/// A journal line as submitted by a caller, before validation.
///
/// `account_id` is optional so that blank rows from an entry form can be
/// submitted and silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineInput {
    /// Account to post to.
    pub account_id: Option<AccountId>,
    /// Debit amount (zero if credit).
    pub debit: Decimal,
    /// Credit amount (zero if debit).
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
}

impl JournalLineInput {
    /// A debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id: Some(account_id),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id: Some(account_id),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Attaches a line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A line that passed validation. Exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedLine {
    /// Account to post to.
    pub account_id: AccountId,
    /// Debit amount, rounded to 3 dp.
    pub debit: Decimal,
    /// Credit amount, rounded to 3 dp.
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
}

impl From<ValidatedLine> for JournalLineInput {
    fn from(line: ValidatedLine) -> Self {
        Self {
            account_id: Some(line.account_id),
            debit: line.debit,
            credit: line.credit,
            description: line.description,
        }
    }
}

/// Debit and credit totals of an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl EntryTotals {
    /// `debit - credit`.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Normalised lines plus totals, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Surviving lines, in input order.
    pub lines: Vec<ValidatedLine>,
    /// Totals over `lines`.
    pub totals: EntryTotals,
}

impl ResolvedEntry {
    /// The entry's `total_amount` (sum of debits).
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.totals.debit
    }
}

/// Input for creating a journal entry.
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Originating business process.
    pub reference_type: ReferenceType,
    /// Loose link to the originating record.
    pub reference_id: Option<Uuid>,
    /// Entry description.
    pub description: String,
    /// Lines, possibly including blank rows.
    pub lines: Vec<JournalLineInput>,
    /// The user creating the entry.
    pub created_by: Option<UserId>,
    /// Explicit entry number; allocated from the `journal_entry` sequence when absent.
    pub entry_number: Option<String>,
}

impl CreateEntryInput {
    /// Creates an input with no reference, creator, or explicit number.
    #[must_use]
    pub fn new(
        entry_date: NaiveDate,
        reference_type: ReferenceType,
        description: impl Into<String>,
        lines: Vec<JournalLineInput>,
    ) -> Self {
        Self {
            entry_date,
            reference_type,
            reference_id: None,
            description: description.into(),
            lines,
            created_by: None,
            entry_number: None,
        }
    }

    /// Links the entry to its originating record.
    #[must_use]
    pub fn with_reference(mut self, reference_id: Uuid) -> Self {
        self.reference_id = Some(reference_id);
        self
    }

    /// Records the creating user.
    #[must_use]
    pub fn created_by(mut self, user: UserId) -> Self {
        self.created_by = Some(user);
        self
    }

    /// Uses an explicit entry number instead of the sequence.
    #[must_use]
    pub fn with_number(mut self, entry_number: impl Into<String>) -> Self {
        self.entry_number = Some(entry_number.into());
        self
    }
}
