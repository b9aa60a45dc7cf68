//! Posting rules: business events to journal entries.
//!
//! Collaborators publish a [`BusinessEvent`] after their own domain write.
//! The [`RuleRegistry`] turns it into a [`PostingDraft`] whose account
//! references are resolved by the database layer, and
//! [`subledger_movements`] lists the cash/bank log rows the same event
//! implies.

pub mod accounts;
pub mod draft;
pub mod error;
pub mod events;
pub mod movements;
pub mod rules;


pub use accounts::{AccountMap, AccountRef, AccountRole};
pub use draft::{DraftKind, DraftLine, PostingDraft};
pub use error::PostingError;
pub use events::{
    AssetPurchase, BankTransfer, BusinessEvent, CheckEvent, Depreciation, EventKind,
    HolderTransfer, InvoiceCollection, OpeningBalance, Payment, Receipt, SalesInvoice, Settlement,
    TradeDocument,
};
pub use movements::{Movement, subledger_movements};
pub use rules::{RuleFn, RuleRegistry};
