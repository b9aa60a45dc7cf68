//! The posting rule registry.

use std::collections::HashMap;

use rust_decimal::Decimal;

use super::accounts::{AccountRef, AccountRole};
use super::draft::{DraftLine, PostingDraft};
use super::error::PostingError;
use super::events::{
    BusinessEvent, EventKind, InvoiceCollection, Payment, Receipt, SalesInvoice, Settlement,
    TradeDocument,
};
use crate::ledger::ReferenceType;
use crate::subledger::SubledgerHolder;

/// A posting rule: builds the draft for one event kind.
pub type RuleFn = fn(&BusinessEvent) -> Result<PostingDraft, PostingError>;

/// Maps event kinds to rules.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<EventKind, RuleFn>,
}

impl RuleRegistry {
    /// A registry with no rules.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with a rule for every built-in event kind.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(EventKind::ReceiptCreated, receipt_created)
            .register(EventKind::ReceiptVoided, receipt_voided)
            .register(EventKind::PaymentCreated, payment_created)
            .register(EventKind::PaymentVoided, payment_voided)
            .register(EventKind::BankTransferred, bank_transferred)
            .register(EventKind::HolderTransferred, holder_transferred)
            .register(EventKind::AssetPurchased, asset_purchased)
            .register(EventKind::DepreciationRecorded, depreciation_recorded)
            .register(EventKind::CheckBounced, check_bounced)
            .register(EventKind::CheckCollected, check_collected)
            .register(EventKind::InvoiceCollected, invoice_collected)
            .register(EventKind::SalesInvoiceIssued, sales_invoice_issued)
            .register(EventKind::SalesReturned, sales_returned)
            .register(EventKind::PurchaseInvoiceReceived, purchase_invoice_received)
            .register(EventKind::PurchaseReturned, purchase_returned)
            .register(EventKind::OpeningBalanceRecorded, opening_balance_recorded);
        registry
    }

    /// Registers (or replaces) the rule for `kind`.
    pub fn register(&mut self, kind: EventKind, rule: RuleFn) -> &mut Self {
        self.rules.insert(kind, rule);
        self
    }

    /// Whether a rule exists for `kind`.
    #[must_use]
    pub fn handles(&self, kind: EventKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Builds the draft for `event`.
    ///
    /// Returns `Ok(None)` when the rule produces no non-zero line.
    ///
    /// # Errors
    ///
    /// Returns an error if no rule is registered or the rule rejects the event.
    pub fn draft(&self, event: &BusinessEvent) -> Result<Option<PostingDraft>, PostingError> {
        let kind = event.kind();
        let rule = self.rules.get(&kind).ok_or(PostingError::NoRule(kind))?;
        let draft = rule(event)?;
        Ok((!draft.is_empty()).then_some(draft))
    }
}

macro_rules! payload {
    ($event:expr, $variant:ident) => {
        match $event {
            BusinessEvent::$variant(payload) => payload,
            other => {
                return Err(PostingError::EventMismatch {
                    expected: EventKind::$variant,
                    actual: other.kind(),
                })
            }
        }
    };
}

fn non_negative(field: &'static str, amount: Decimal) -> Result<Decimal, PostingError> {
    if amount < Decimal::ZERO {
        return Err(PostingError::NegativeAmount { field, amount });
    }
    Ok(amount)
}

fn money_side(event: EventKind, settlement: Settlement) -> Result<AccountRef, PostingError> {
    settlement
        .money_account()
        .ok_or(PostingError::UnsupportedSettlement { event, settlement })
}

fn receipt_draft(receipt: &Receipt, kind: EventKind) -> Result<PostingDraft, PostingError> {
    let amount = non_negative("amount", receipt.amount)?;
    let money = money_side(kind, receipt.settlement)?;
    let counterparty = receipt
        .counterparty
        .clone()
        .unwrap_or(AccountRole::AccountsReceivable.into());
    Ok(PostingDraft::new(
        receipt.date,
        ReferenceType::ReceiptVoucher,
        receipt.id,
        format!("Receipt voucher {}", receipt.number),
    )
    .line(DraftLine::debit(money, amount))
    .line(DraftLine::credit(counterparty, amount)))
}

fn receipt_created(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    receipt_draft(payload!(event, ReceiptCreated), EventKind::ReceiptCreated)
}

fn receipt_voided(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    Ok(receipt_draft(payload!(event, ReceiptVoided), EventKind::ReceiptVoided)?.reversed())
}

fn payment_draft(payment: &Payment, kind: EventKind) -> Result<PostingDraft, PostingError> {
    let amount = non_negative("amount", payment.amount)?;
    let money = match payment.settlement {
        Settlement::Check => AccountRole::Bank.into(),
        other => money_side(kind, other)?,
    };
    let counterparty = payment
        .counterparty
        .clone()
        .unwrap_or(AccountRole::GeneralExpense.into());
    Ok(PostingDraft::new(
        payment.date,
        ReferenceType::PaymentVoucher,
        payment.id,
        format!("Payment voucher {}", payment.number),
    )
    .line(DraftLine::debit(counterparty, amount))
    .line(DraftLine::credit(money, amount)))
}

fn payment_created(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    payment_draft(payload!(event, PaymentCreated), EventKind::PaymentCreated)
}

fn payment_voided(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    Ok(payment_draft(payload!(event, PaymentVoided), EventKind::PaymentVoided)?.reversed())
}

fn transfer_lines(
    draft: PostingDraft,
    from: SubledgerHolder,
    to: SubledgerHolder,
    amount: Decimal,
    fees: Decimal,
) -> Result<PostingDraft, PostingError> {
    let amount = non_negative("amount", amount)?;
    let fees = non_negative("fees", fees)?;
    Ok(draft
        .line(DraftLine::debit(to, amount))
        .line(DraftLine::debit(AccountRole::BankFees, fees).describe("Transfer fees"))
        .line(DraftLine::credit(from, amount + fees)))
}

fn bank_transferred(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let transfer = payload!(event, BankTransferred);
    let draft = PostingDraft::new(
        transfer.date,
        ReferenceType::BankTransfer,
        transfer.id,
        format!("Bank transfer {}", transfer.number),
    );
    transfer_lines(
        draft,
        SubledgerHolder::Bank(transfer.from),
        SubledgerHolder::Bank(transfer.to),
        transfer.amount,
        transfer.fees,
    )
}

fn holder_transferred(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let transfer = payload!(event, HolderTransferred);
    let reference_type = match (transfer.from, transfer.to) {
        (SubledgerHolder::Cashbox(_), SubledgerHolder::Cashbox(_)) => ReferenceType::CashboxTransfer,
        (SubledgerHolder::Bank(_), SubledgerHolder::Bank(_)) => ReferenceType::BankTransfer,
        _ => ReferenceType::BankCashTransfer,
    };
    let draft = PostingDraft::new(
        transfer.date,
        reference_type,
        transfer.id,
        format!("Transfer {} from {} to {}", transfer.number, transfer.from, transfer.to),
    );
    transfer_lines(draft, transfer.from, transfer.to, transfer.amount, transfer.fees)
}

fn asset_purchased(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let asset = payload!(event, AssetPurchased);
    let amount = non_negative("amount", asset.amount)?;
    let paid_from = match asset.settlement {
        Settlement::Credit => AccountRole::AccountsPayable.into(),
        Settlement::Check => AccountRole::Bank.into(),
        other => money_side(EventKind::AssetPurchased, other)?,
    };
    let asset_account = asset
        .asset_account
        .clone()
        .unwrap_or(AccountRole::FixedAssets.into());
    Ok(PostingDraft::new(
        asset.date,
        ReferenceType::AssetPurchase,
        asset.id,
        format!("Purchase of asset {}", asset.name),
    )
    .line(DraftLine::debit(asset_account, amount))
    .line(DraftLine::credit(paid_from, amount)))
}

fn depreciation_recorded(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let charge = payload!(event, DepreciationRecorded);
    let amount = non_negative("amount", charge.amount)?;
    Ok(PostingDraft::new(
        charge.date,
        ReferenceType::Depreciation,
        charge.id,
        format!("Depreciation of {}", charge.asset_name),
    )
    .line(DraftLine::debit(AccountRole::DepreciationExpense, amount))
    .line(DraftLine::credit(AccountRole::AccumulatedDepreciation, amount)))
}

fn check_bounced(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let check = payload!(event, CheckBounced);
    let amount = non_negative("amount", check.amount)?;
    Ok(PostingDraft::new(
        check.date,
        ReferenceType::CheckBounced,
        check.id,
        format!("Bounced check {}", check.number),
    )
    .line(DraftLine::debit(AccountRole::AccountsReceivable, amount))
    .line(DraftLine::credit(AccountRole::ChecksInCollection, amount)))
}

fn check_collected(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let check = payload!(event, CheckCollected);
    let amount = non_negative("amount", check.amount)?;
    let bank: AccountRef = check
        .bank
        .map_or(AccountRole::Bank.into(), |b| SubledgerHolder::Bank(b).into());
    Ok(PostingDraft::new(
        check.date,
        ReferenceType::CheckCollected,
        check.id,
        format!("Collected check {}", check.number),
    )
    .line(DraftLine::debit(bank, amount))
    .line(DraftLine::credit(AccountRole::ChecksInCollection, amount)))
}

fn invoice_collected(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let collection: &InvoiceCollection = payload!(event, InvoiceCollected);
    let amount = non_negative("amount", collection.amount)?;
    let money = money_side(EventKind::InvoiceCollected, collection.settlement)?;
    let credit_role = if collection.invoice_complete {
        AccountRole::Sales
    } else {
        AccountRole::CustomerAdvances
    };
    Ok(PostingDraft::new(
        collection.date,
        ReferenceType::InvoiceCollection,
        collection.id,
        format!("Collection on invoice {}", collection.invoice_number),
    )
    .line(DraftLine::debit(money, amount))
    .line(DraftLine::credit(credit_role, amount)))
}

fn sales_invoice_issued(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let invoice: &SalesInvoice = payload!(event, SalesInvoiceIssued);
    let subtotal = non_negative("subtotal", invoice.subtotal)?;
    let discount = non_negative("discount", invoice.discount)?;
    let tax = non_negative("tax", invoice.tax)?;
    let receivable = match invoice.settlement {
        Settlement::Credit => AccountRole::AccountsReceivable.into(),
        other => money_side(EventKind::SalesInvoiceIssued, other)?,
    };
    Ok(PostingDraft::new(
        invoice.date,
        ReferenceType::SalesInvoice,
        invoice.id,
        format!("Sales invoice {}", invoice.number),
    )
    .line(DraftLine::debit(receivable, invoice.total()))
    .line(DraftLine::debit(AccountRole::SalesDiscount, discount))
    .line(DraftLine::credit(AccountRole::Sales, subtotal))
    .line(DraftLine::credit(AccountRole::TaxPayable, tax)))
}

fn sales_returned(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let document: &TradeDocument = payload!(event, SalesReturned);
    let subtotal = non_negative("subtotal", document.subtotal)?;
    let tax = non_negative("tax", document.tax)?;
    let refund = match document.settlement {
        Settlement::Credit => AccountRole::AccountsReceivable.into(),
        other => money_side(EventKind::SalesReturned, other)?,
    };
    Ok(PostingDraft::new(
        document.date,
        ReferenceType::SalesReturn,
        document.id,
        format!("Sales return {}", document.number),
    )
    .line(DraftLine::debit(AccountRole::Sales, subtotal))
    .line(DraftLine::debit(AccountRole::TaxPayable, tax))
    .line(DraftLine::credit(refund, document.total())))
}

fn purchase_invoice_received(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let document: &TradeDocument = payload!(event, PurchaseInvoiceReceived);
    let subtotal = non_negative("subtotal", document.subtotal)?;
    let tax = non_negative("tax", document.tax)?;
    let payable = match document.settlement {
        Settlement::Credit => AccountRole::AccountsPayable.into(),
        Settlement::Check => AccountRole::Bank.into(),
        other => money_side(EventKind::PurchaseInvoiceReceived, other)?,
    };
    Ok(PostingDraft::new(
        document.date,
        ReferenceType::PurchaseInvoice,
        document.id,
        format!("Purchase invoice {}", document.number),
    )
    .line(DraftLine::debit(AccountRole::Purchases, subtotal))
    .line(DraftLine::debit(AccountRole::TaxReceivable, tax))
    .line(DraftLine::credit(payable, document.total())))
}

fn purchase_returned(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let document: &TradeDocument = payload!(event, PurchaseReturned);
    let subtotal = non_negative("subtotal", document.subtotal)?;
    let tax = non_negative("tax", document.tax)?;
    let refund = match document.settlement {
        Settlement::Credit => AccountRole::AccountsPayable.into(),
        other => money_side(EventKind::PurchaseReturned, other)?,
    };
    Ok(PostingDraft::new(
        document.date,
        ReferenceType::PurchaseReturn,
        document.id,
        format!("Purchase return {}", document.number),
    )
    .line(DraftLine::debit(refund, document.total()))
    .line(DraftLine::credit(AccountRole::Purchases, subtotal))
    .line(DraftLine::credit(AccountRole::TaxReceivable, tax)))
}

fn opening_balance_recorded(event: &BusinessEvent) -> Result<PostingDraft, PostingError> {
    let opening = payload!(event, OpeningBalanceRecorded);
    let amount = non_negative("amount", opening.amount)?;
    Ok(PostingDraft::new(
        opening.date,
        ReferenceType::OpeningBalance,
        opening.holder.uuid(),
        format!("Opening balance of {}", opening.holder),
    )
    .line(DraftLine::debit(opening.holder, amount))
    .line(DraftLine::credit(AccountRole::Capital, amount)))
}
