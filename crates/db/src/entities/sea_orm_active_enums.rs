//! `SeaORM` active enums, stored as strings and mirrored from the core types.

use daftar_core::{accounts, ledger, sequence, subledger};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

macro_rules! mirrored_enum {
    ($name:ident => $core:ty { $($variant:ident = $value:tt),+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
        )]
        #[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
        pub enum $name {
            $(
                #[sea_orm(string_value = $value)]
                $variant,
            )+
        }

        impl From<$core> for $name {
            fn from(value: $core) -> Self {
                match value {
                    $(<$core>::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$name> for $core {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirrored_enum!(AccountType => accounts::AccountType {
    Asset = "asset",
    Liability = "liability",
    Equity = "equity",
    Revenue = "revenue",
    Expense = "expense",
    Purchases = "purchases",
});

mirrored_enum!(ReferenceType => ledger::ReferenceType {
    Manual = "manual",
    SalesInvoice = "sales_invoice",
    SalesReturn = "sales_return",
    PurchaseInvoice = "purchase_invoice",
    PurchaseReturn = "purchase_return",
    ReceiptVoucher = "receipt_voucher",
    PaymentVoucher = "payment_voucher",
    BankTransfer = "bank_transfer",
    BankCashTransfer = "bank_cash_transfer",
    CashboxTransfer = "cashbox_transfer",
    WarehouseTransfer = "warehouse_transfer",
    AssetPurchase = "asset_purchase",
    Depreciation = "depreciation",
    CheckBounced = "check_bounced",
    CheckCollected = "check_collected",
    InvoiceCollection = "invoice_collection",
    OpeningBalance = "opening_balance",
    YearEndClosing = "year_end_closing",
    Adjustment = "adjustment",
});

mirrored_enum!(DocumentType => sequence::DocumentType {
    SalesInvoice = "sales_invoice",
    PosInvoice = "pos_invoice",
    SalesReturn = "sales_return",
    CreditNote = "credit_note",
    DebitNote = "debit_note",
    PurchaseInvoice = "purchase_invoice",
    PurchaseReturn = "purchase_return",
    BankTransfer = "bank_transfer",
    BankCashTransfer = "bank_cash_transfer",
    CashboxTransfer = "cashbox_transfer",
    JournalEntry = "journal_entry",
    WarehouseTransfer = "warehouse_transfer",
    ReceiptVoucher = "receipt_voucher",
    PaymentVoucher = "payment_voucher",
});

mirrored_enum!(SubledgerTxType => subledger::SubledgerTxType {
    Deposit = "deposit",
    Withdrawal = "withdrawal",
    TransferIn = "transfer_in",
    TransferOut = "transfer_out",
    InitialBalance = "initial_balance",
    Adjustment = "adjustment",
});

/// Remediation state of a queued posting failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum FailureStatus {
    /// Awaiting retry or manual resolution.
    #[sea_orm(string_value = "open")]
    Open,
    /// Retried successfully or closed by an operator.
    #[sea_orm(string_value = "resolved")]
    Resolved,
}
