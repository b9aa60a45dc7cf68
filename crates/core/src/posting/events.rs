//! Business events published by collaborators.

use chrono::NaiveDate;
use daftar_shared::types::BankAccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::accounts::{AccountRef, AccountRole};
use crate::subledger::SubledgerHolder;

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "holder", rename_all = "snake_case")]
pub enum Settlement {
    /// General cash account.
    Cash,
    /// General bank account.
    Bank,
    /// A specific cashbox or bank account.
    Holder(SubledgerHolder),
    /// Customer check, held until collected.
    Check,
    /// On account.
    Credit,
}

impl Settlement {
    /// The money account this settlement moves, if any.
    #[must_use]
    pub fn money_account(self) -> Option<AccountRef> {
        match self {
            Self::Cash => Some(AccountRole::Cash.into()),
            Self::Bank => Some(AccountRole::Bank.into()),
            Self::Holder(holder) => Some(holder.into()),
            Self::Check => Some(AccountRole::ChecksInCollection.into()),
            Self::Credit => None,
        }
    }

    /// The holder whose sub-ledger this settlement touches.
    #[must_use]
    pub const fn holder(self) -> Option<SubledgerHolder> {
        match self {
            Self::Holder(holder) => Some(holder),
            _ => None,
        }
    }
}

/// Receipt voucher: money received from a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Voucher id.
    pub id: Uuid,
    /// Voucher number.
    pub number: String,
    /// Voucher date.
    pub date: NaiveDate,
    /// Amount received.
    pub amount: Decimal,
    /// Where the money went.
    pub settlement: Settlement,
    /// Account credited; accounts receivable when absent.
    #[serde(default)]
    pub counterparty: Option<AccountRef>,
}

/// Payment voucher: money paid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Voucher id.
    pub id: Uuid,
    /// Voucher number.
    pub number: String,
    /// Voucher date.
    pub date: NaiveDate,
    /// Amount paid.
    pub amount: Decimal,
    /// Where the money came from.
    pub settlement: Settlement,
    /// Account debited; general expense when absent.
    #[serde(default)]
    pub counterparty: Option<AccountRef>,
}

/// Transfer between two bank accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransfer {
    /// Transfer id.
    pub id: Uuid,
    /// Transfer number.
    pub number: String,
    /// Transfer date.
    pub date: NaiveDate,
    /// Sending account.
    pub from: BankAccountId,
    /// Receiving account.
    pub to: BankAccountId,
    /// Amount received by `to`.
    pub amount: Decimal,
    /// Fees charged to `from` on top of `amount`.
    #[serde(default)]
    pub fees: Decimal,
}

/// Transfer involving at least one cashbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderTransfer {
    /// Transfer id.
    pub id: Uuid,
    /// Transfer number.
    pub number: String,
    /// Transfer date.
    pub date: NaiveDate,
    /// Sending holder.
    pub from: SubledgerHolder,
    /// Receiving holder.
    pub to: SubledgerHolder,
    /// Amount received by `to`.
    pub amount: Decimal,
    /// Fees charged to `from` on top of `amount`.
    #[serde(default)]
    pub fees: Decimal,
}

/// Fixed asset bought outright.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPurchase {
    /// Asset id.
    pub id: Uuid,
    /// Asset name.
    pub name: String,
    /// Purchase date.
    pub date: NaiveDate,
    /// Purchase cost.
    pub amount: Decimal,
    /// Asset account; fixed assets when absent.
    #[serde(default)]
    pub asset_account: Option<AccountRef>,
    /// How the asset was paid for.
    pub settlement: Settlement,
}

/// Periodic depreciation charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Depreciation {
    /// Depreciation record id.
    pub id: Uuid,
    /// Asset name.
    pub asset_name: String,
    /// Charge date.
    pub date: NaiveDate,
    /// Charge amount.
    pub amount: Decimal,
}

/// A customer check changing state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEvent {
    /// Check id.
    pub id: Uuid,
    /// Check number.
    pub number: String,
    /// Event date.
    pub date: NaiveDate,
    /// Check amount.
    pub amount: Decimal,
    /// Bank account credited on collection; general bank when absent.
    #[serde(default)]
    pub bank: Option<BankAccountId>,
}

/// Cash collected against a sales invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCollection {
    /// Collection id.
    pub id: Uuid,
    /// Invoice number.
    pub invoice_number: String,
    /// Collection date.
    pub date: NaiveDate,
    /// Amount collected.
    pub amount: Decimal,
    /// Whether the invoice has been fully issued.
    pub invoice_complete: bool,
    /// Where the money went.
    pub settlement: Settlement,
}

/// Sales invoice issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesInvoice {
    /// Invoice id.
    pub id: Uuid,
    /// Invoice number.
    pub number: String,
    /// Invoice date.
    pub date: NaiveDate,
    /// Amount before discount and tax.
    pub subtotal: Decimal,
    /// Discount granted.
    #[serde(default)]
    pub discount: Decimal,
    /// Output tax.
    #[serde(default)]
    pub tax: Decimal,
    /// How the customer paid.
    pub settlement: Settlement,
}

impl SalesInvoice {
    /// `subtotal - discount + tax`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal - self.discount + self.tax
    }
}

/// A return or purchase document: subtotal plus tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDocument {
    /// Document id.
    pub id: Uuid,
    /// Document number.
    pub number: String,
    /// Document date.
    pub date: NaiveDate,
    /// Amount before tax.
    pub subtotal: Decimal,
    /// Tax amount.
    #[serde(default)]
    pub tax: Decimal,
    /// How the document was settled.
    pub settlement: Settlement,
}

impl TradeDocument {
    /// `subtotal + tax`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal + self.tax
    }
}

/// Opening balance of a cashbox or bank account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalance {
    /// The holder.
    pub holder: SubledgerHolder,
    /// Opening date.
    pub date: NaiveDate,
    /// Opening amount.
    pub amount: Decimal,
}

/// A business event that may produce a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum BusinessEvent {
    /// Receipt voucher created.
    ReceiptCreated(Receipt),
    /// Receipt voucher voided.
    ReceiptVoided(Receipt),
    /// Payment voucher created.
    PaymentCreated(Payment),
    /// Payment voucher voided.
    PaymentVoided(Payment),
    /// Bank-to-bank transfer.
    BankTransferred(BankTransfer),
    /// Cashbox-to-cashbox or cashbox/bank transfer.
    HolderTransferred(HolderTransfer),
    /// Fixed asset purchased.
    AssetPurchased(AssetPurchase),
    /// Depreciation recorded.
    DepreciationRecorded(Depreciation),
    /// Customer check bounced.
    CheckBounced(CheckEvent),
    /// Customer check collected.
    CheckCollected(CheckEvent),
    /// Money collected against an invoice.
    InvoiceCollected(InvoiceCollection),
    /// Sales invoice issued.
    SalesInvoiceIssued(SalesInvoice),
    /// Goods returned by a customer.
    SalesReturned(TradeDocument),
    /// Purchase invoice received.
    PurchaseInvoiceReceived(TradeDocument),
    /// Goods returned to a supplier.
    PurchaseReturned(TradeDocument),
    /// Holder opening balance recorded.
    OpeningBalanceRecorded(OpeningBalance),
}

/// Discriminant of [`BusinessEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// See [`BusinessEvent::ReceiptCreated`].
    ReceiptCreated,
    /// See [`BusinessEvent::ReceiptVoided`].
    ReceiptVoided,
    /// See [`BusinessEvent::PaymentCreated`].
    PaymentCreated,
    /// See [`BusinessEvent::PaymentVoided`].
    PaymentVoided,
    /// See [`BusinessEvent::BankTransferred`].
    BankTransferred,
    /// See [`BusinessEvent::HolderTransferred`].
    HolderTransferred,
    /// See [`BusinessEvent::AssetPurchased`].
    AssetPurchased,
    /// See [`BusinessEvent::DepreciationRecorded`].
    DepreciationRecorded,
    /// See [`BusinessEvent::CheckBounced`].
    CheckBounced,
    /// See [`BusinessEvent::CheckCollected`].
    CheckCollected,
    /// See [`BusinessEvent::InvoiceCollected`].
    InvoiceCollected,
    /// See [`BusinessEvent::SalesInvoiceIssued`].
    SalesInvoiceIssued,
    /// See [`BusinessEvent::SalesReturned`].
    SalesReturned,
    /// See [`BusinessEvent::PurchaseInvoiceReceived`].
    PurchaseInvoiceReceived,
    /// See [`BusinessEvent::PurchaseReturned`].
    PurchaseReturned,
    /// See [`BusinessEvent::OpeningBalanceRecorded`].
    OpeningBalanceRecorded,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 16] = [
        Self::ReceiptCreated,
        Self::ReceiptVoided,
        Self::PaymentCreated,
        Self::PaymentVoided,
        Self::BankTransferred,
        Self::HolderTransferred,
        Self::AssetPurchased,
        Self::DepreciationRecorded,
        Self::CheckBounced,
        Self::CheckCollected,
        Self::InvoiceCollected,
        Self::SalesInvoiceIssued,
        Self::SalesReturned,
        Self::PurchaseInvoiceReceived,
        Self::PurchaseReturned,
        Self::OpeningBalanceRecorded,
    ];

    /// Returns the string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReceiptCreated => "receipt_created",
            Self::ReceiptVoided => "receipt_voided",
            Self::PaymentCreated => "payment_created",
            Self::PaymentVoided => "payment_voided",
            Self::BankTransferred => "bank_transferred",
            Self::HolderTransferred => "holder_transferred",
            Self::AssetPurchased => "asset_purchased",
            Self::DepreciationRecorded => "depreciation_recorded",
            Self::CheckBounced => "check_bounced",
            Self::CheckCollected => "check_collected",
            Self::InvoiceCollected => "invoice_collected",
            Self::SalesInvoiceIssued => "sales_invoice_issued",
            Self::SalesReturned => "sales_returned",
            Self::PurchaseInvoiceReceived => "purchase_invoice_received",
            Self::PurchaseReturned => "purchase_returned",
            Self::OpeningBalanceRecorded => "opening_balance_recorded",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BusinessEvent {
    /// The event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ReceiptCreated(_) => EventKind::ReceiptCreated,
            Self::ReceiptVoided(_) => EventKind::ReceiptVoided,
            Self::PaymentCreated(_) => EventKind::PaymentCreated,
            Self::PaymentVoided(_) => EventKind::PaymentVoided,
            Self::BankTransferred(_) => EventKind::BankTransferred,
            Self::HolderTransferred(_) => EventKind::HolderTransferred,
            Self::AssetPurchased(_) => EventKind::AssetPurchased,
            Self::DepreciationRecorded(_) => EventKind::DepreciationRecorded,
            Self::CheckBounced(_) => EventKind::CheckBounced,
            Self::CheckCollected(_) => EventKind::CheckCollected,
            Self::InvoiceCollected(_) => EventKind::InvoiceCollected,
            Self::SalesInvoiceIssued(_) => EventKind::SalesInvoiceIssued,
            Self::SalesReturned(_) => EventKind::SalesReturned,
            Self::PurchaseInvoiceReceived(_) => EventKind::PurchaseInvoiceReceived,
            Self::PurchaseReturned(_) => EventKind::PurchaseReturned,
            Self::OpeningBalanceRecorded(_) => EventKind::OpeningBalanceRecorded,
        }
    }

    /// Id of the originating record.
    #[must_use]
    pub fn reference_id(&self) -> Uuid {
        match self {
            Self::ReceiptCreated(r) | Self::ReceiptVoided(r) => r.id,
            Self::PaymentCreated(p) | Self::PaymentVoided(p) => p.id,
            Self::BankTransferred(t) => t.id,
            Self::HolderTransferred(t) => t.id,
            Self::AssetPurchased(a) => a.id,
            Self::DepreciationRecorded(d) => d.id,
            Self::CheckBounced(c) | Self::CheckCollected(c) => c.id,
            Self::InvoiceCollected(c) => c.id,
            Self::SalesInvoiceIssued(i) => i.id,
            Self::SalesReturned(d) | Self::PurchaseInvoiceReceived(d) | Self::PurchaseReturned(d) => {
                d.id
            }
            Self::OpeningBalanceRecorded(o) => o.holder.uuid(),
        }
    }
}
