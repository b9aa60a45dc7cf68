//! Document types that draw numbers from a sequence.

use serde::{Deserialize, Serialize};

/// A document type with its own number sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Sales invoice.
    SalesInvoice,
    /// Point-of-sale invoice.
    PosInvoice,
    /// Sales return.
    SalesReturn,
    /// Credit note.
    CreditNote,
    /// Debit note.
    DebitNote,
    /// Purchase invoice.
    PurchaseInvoice,
    /// Purchase return.
    PurchaseReturn,
    /// Transfer between bank accounts.
    BankTransfer,
    /// Transfer between a bank account and a cashbox.
    BankCashTransfer,
    /// Transfer between cashboxes.
    CashboxTransfer,
    /// Journal entry.
    JournalEntry,
    /// Warehouse transfer.
    WarehouseTransfer,
    /// Receipt voucher.
    ReceiptVoucher,
    /// Payment voucher.
    PaymentVoucher,
}

impl DocumentType {
    /// All document types.
    pub const ALL: [Self; 14] = [
        Self::SalesInvoice,
        Self::PosInvoice,
        Self::SalesReturn,
        Self::CreditNote,
        Self::DebitNote,
        Self::PurchaseInvoice,
        Self::PurchaseReturn,
        Self::BankTransfer,
        Self::BankCashTransfer,
        Self::CashboxTransfer,
        Self::JournalEntry,
        Self::WarehouseTransfer,
        Self::ReceiptVoucher,
        Self::PaymentVoucher,
    ];

    /// Default zero-pad width.
    pub const DEFAULT_DIGITS: u32 = 6;

    /// Returns the string key stored in the database.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SalesInvoice => "sales_invoice",
            Self::PosInvoice => "pos_invoice",
            Self::SalesReturn => "sales_return",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::PurchaseReturn => "purchase_return",
            Self::BankTransfer => "bank_transfer",
            Self::BankCashTransfer => "bank_cash_transfer",
            Self::CashboxTransfer => "cashbox_transfer",
            Self::JournalEntry => "journal_entry",
            Self::WarehouseTransfer => "warehouse_transfer",
            Self::ReceiptVoucher => "receipt_voucher",
            Self::PaymentVoucher => "payment_voucher",
        }
    }

    /// Prefix used when the sequence is first seeded.
    #[must_use]
    pub const fn default_prefix(self) -> &'static str {
        match self {
            Self::SalesInvoice => "SI",
            Self::PosInvoice => "POS",
            Self::SalesReturn => "SR",
            Self::CreditNote => "CN",
            Self::DebitNote => "DN",
            Self::PurchaseInvoice => "PI",
            Self::PurchaseReturn => "PR",
            Self::BankTransfer => "BT",
            Self::BankCashTransfer => "BCT",
            Self::CashboxTransfer => "CT",
            Self::JournalEntry => "JE",
            Self::WarehouseTransfer => "WT",
            Self::ReceiptVoucher => "RV",
            Self::PaymentVoucher => "PV",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown document type: {s}"))
    }
}
