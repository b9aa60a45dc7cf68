//! Sub-ledger rows implied by business events.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{BusinessEvent, Settlement};
use crate::ledger::ReferenceType;
use crate::ledger::reversal::REVERSAL_PREFIX;
use crate::subledger::{SubledgerHolder, SubledgerTxType};

/// A cash/bank log row to append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    /// Holder whose log receives the row.
    pub holder: SubledgerHolder,
    /// Row type.
    pub tx_type: SubledgerTxType,
    /// Positive amount.
    pub amount: Decimal,
    /// Row date.
    pub date: NaiveDate,
    /// Originating business process.
    pub reference_type: ReferenceType,
    /// Originating record.
    pub reference_id: Uuid,
    /// Row description.
    pub description: String,
    /// For a void, the type of the row it cancels.
    pub reverses: Option<SubledgerTxType>,
}

struct Origin<'a> {
    date: NaiveDate,
    reference_type: ReferenceType,
    reference_id: Uuid,
    description: &'a str,
}

impl Origin<'_> {
    fn movement(&self, holder: SubledgerHolder, tx_type: SubledgerTxType, amount: Decimal) -> Option<Movement> {
        (amount > Decimal::ZERO).then(|| Movement {
            holder,
            tx_type,
            amount,
            date: self.date,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            description: self.description.to_string(),
            reverses: None,
        })
    }

    fn inflow(&self, settlement: Settlement, amount: Decimal) -> Vec<Movement> {
        settlement
            .holder()
            .and_then(|h| self.movement(h, SubledgerTxType::Deposit, amount))
            .into_iter()
            .collect()
    }

    fn outflow(&self, settlement: Settlement, amount: Decimal) -> Vec<Movement> {
        settlement
            .holder()
            .and_then(|h| self.movement(h, SubledgerTxType::Withdrawal, amount))
            .into_iter()
            .collect()
    }

    fn transfer(
        &self,
        from: SubledgerHolder,
        to: SubledgerHolder,
        amount: Decimal,
        fees: Decimal,
    ) -> Vec<Movement> {
        self.movement(from, from.outbound_type(), amount + fees)
            .into_iter()
            .chain(self.movement(to, to.inbound_type(), amount))
            .collect()
    }
}

fn reversed(movements: Vec<Movement>) -> Vec<Movement> {
    movements
        .into_iter()
        .map(|m| Movement {
            tx_type: m.tx_type.offsetting(),
            description: format!("{REVERSAL_PREFIX}{}", m.description),
            reverses: Some(m.tx_type),
            ..m
        })
        .collect()
}

/// The sub-ledger rows `event` implies.
///
/// Only settlements naming a specific holder produce rows; general cash or
/// bank roles have no sub-ledger. Voids produce the offsetting rows.
#[must_use]
pub fn subledger_movements(event: &BusinessEvent) -> Vec<Movement> {
    use BusinessEvent as E;
    use ReferenceType as R;

    match event {
        E::ReceiptCreated(r) | E::ReceiptVoided(r) => {
            let description = format!("Receipt voucher {}", r.number);
            let origin = Origin {
                date: r.date,
                reference_type: R::ReceiptVoucher,
                reference_id: r.id,
                description: &description,
            };
            let rows = origin.inflow(r.settlement, r.amount);
            if matches!(event, E::ReceiptVoided(_)) { reversed(rows) } else { rows }
        }
        E::PaymentCreated(p) | E::PaymentVoided(p) => {
            let description = format!("Payment voucher {}", p.number);
            let origin = Origin {
                date: p.date,
                reference_type: R::PaymentVoucher,
                reference_id: p.id,
                description: &description,
            };
            let rows = origin.outflow(p.settlement, p.amount);
            if matches!(event, E::PaymentVoided(_)) { reversed(rows) } else { rows }
        }
        E::BankTransferred(t) => {
            let description = format!("Bank transfer {}", t.number);
            Origin {
                date: t.date,
                reference_type: R::BankTransfer,
                reference_id: t.id,
                description: &description,
            }
            .transfer(SubledgerHolder::Bank(t.from), SubledgerHolder::Bank(t.to), t.amount, t.fees)
        }
        E::HolderTransferred(t) => {
            let description = format!("Transfer {}", t.number);
            let reference_type = match (t.from, t.to) {
                (SubledgerHolder::Cashbox(_), SubledgerHolder::Cashbox(_)) => R::CashboxTransfer,
                (SubledgerHolder::Bank(_), SubledgerHolder::Bank(_)) => R::BankTransfer,
                _ => R::BankCashTransfer,
            };
            Origin {
                date: t.date,
                reference_type,
                reference_id: t.id,
                description: &description,
            }
            .transfer(t.from, t.to, t.amount, t.fees)
        }
        E::AssetPurchased(a) => {
            let description = format!("Purchase of asset {}", a.name);
            Origin {
                date: a.date,
                reference_type: R::AssetPurchase,
                reference_id: a.id,
                description: &description,
            }
            .outflow(a.settlement, a.amount)
        }
        E::CheckCollected(c) => {
            let description = format!("Collected check {}", c.number);
            let origin = Origin {
                date: c.date,
                reference_type: R::CheckCollected,
                reference_id: c.id,
                description: &description,
            };
            c.bank
                .and_then(|b| origin.movement(SubledgerHolder::Bank(b), SubledgerTxType::Deposit, c.amount))
                .into_iter()
                .collect()
        }
        E::InvoiceCollected(c) => {
            let description = format!("Collection on invoice {}", c.invoice_number);
            Origin {
                date: c.date,
                reference_type: R::InvoiceCollection,
                reference_id: c.id,
                description: &description,
            }
            .inflow(c.settlement, c.amount)
        }
        E::SalesInvoiceIssued(i) => {
            let description = format!("Sales invoice {}", i.number);
            Origin {
                date: i.date,
                reference_type: R::SalesInvoice,
                reference_id: i.id,
                description: &description,
            }
            .inflow(i.settlement, i.total())
        }
        E::SalesReturned(d) => {
            let description = format!("Sales return {}", d.number);
            Origin {
                date: d.date,
                reference_type: R::SalesReturn,
                reference_id: d.id,
                description: &description,
            }
            .outflow(d.settlement, d.total())
        }
        E::PurchaseInvoiceReceived(d) => {
            let description = format!("Purchase invoice {}", d.number);
            Origin {
                date: d.date,
                reference_type: R::PurchaseInvoice,
                reference_id: d.id,
                description: &description,
            }
            .outflow(d.settlement, d.total())
        }
        E::PurchaseReturned(d) => {
            let description = format!("Purchase return {}", d.number);
            Origin {
                date: d.date,
                reference_type: R::PurchaseReturn,
                reference_id: d.id,
                description: &description,
            }
            .inflow(d.settlement, d.total())
        }
        E::OpeningBalanceRecorded(o) => {
            let description = format!("Opening balance of {}", o.holder);
            Origin {
                date: o.date,
                reference_type: R::OpeningBalance,
                reference_id: o.holder.uuid(),
                description: &description,
            }
            .movement(o.holder, o.holder.opening_type(), o.amount)
            .into_iter()
            .collect()
        }
        E::DepreciationRecorded(_) | E::CheckBounced(_) => Vec::new(),
    }
}
