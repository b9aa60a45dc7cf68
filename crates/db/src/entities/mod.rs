//! `SeaORM` entity definitions.

pub mod accounts;
pub mod audit_logs;
pub mod bank_accounts;
pub mod bank_transactions;
pub mod cashbox_transactions;
pub mod cashboxes;
pub mod document_sequences;
pub mod journal_entries;
pub mod journal_lines;
pub mod posting_failures;
pub mod sea_orm_active_enums;
pub mod year_end_closings;
