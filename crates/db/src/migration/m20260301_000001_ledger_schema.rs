//! Ledger schema.
//!
//! Tables are generated from the entity definitions so the same migration runs
//! on `PostgreSQL` in production and `SQLite` in tests.

use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entities::{
    accounts, audit_logs, bank_accounts, bank_transactions, cashbox_transactions, cashboxes,
    document_sequences, journal_entries, journal_lines, posting_failures, year_end_closings,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E: EntityTrait>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr> {
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        create(manager, &schema, accounts::Entity).await?;
        create(manager, &schema, journal_entries::Entity).await?;
        create(manager, &schema, journal_lines::Entity).await?;
        create(manager, &schema, document_sequences::Entity).await?;
        create(manager, &schema, cashboxes::Entity).await?;
        create(manager, &schema, bank_accounts::Entity).await?;
        create(manager, &schema, cashbox_transactions::Entity).await?;
        create(manager, &schema, bank_transactions::Entity).await?;
        create(manager, &schema, audit_logs::Entity).await?;
        create(manager, &schema, posting_failures::Entity).await?;
        create(manager, &schema, year_end_closings::Entity).await?;

        let indexes = [
            Index::create()
                .name("idx_accounts_parent")
                .table(accounts::Entity)
                .col(accounts::Column::ParentId)
                .to_owned(),
            Index::create()
                .name("idx_journal_entries_reference")
                .table(journal_entries::Entity)
                .col(journal_entries::Column::ReferenceType)
                .col(journal_entries::Column::ReferenceId)
                .to_owned(),
            Index::create()
                .name("idx_journal_entries_date")
                .table(journal_entries::Entity)
                .col(journal_entries::Column::EntryDate)
                .to_owned(),
            Index::create()
                .name("idx_journal_lines_entry")
                .table(journal_lines::Entity)
                .col(journal_lines::Column::JournalEntryId)
                .to_owned(),
            Index::create()
                .name("idx_journal_lines_account")
                .table(journal_lines::Entity)
                .col(journal_lines::Column::AccountId)
                .to_owned(),
            Index::create()
                .name("idx_cashbox_transactions_holder")
                .table(cashbox_transactions::Entity)
                .col(cashbox_transactions::Column::CashboxId)
                .col(cashbox_transactions::Column::TransactionDate)
                .to_owned(),
            Index::create()
                .name("idx_bank_transactions_holder")
                .table(bank_transactions::Entity)
                .col(bank_transactions::Column::BankAccountId)
                .col(bank_transactions::Column::TransactionDate)
                .to_owned(),
            Index::create()
                .name("idx_audit_logs_entity")
                .table(audit_logs::Entity)
                .col(audit_logs::Column::EntityType)
                .col(audit_logs::Column::EntityId)
                .to_owned(),
            Index::create()
                .name("idx_posting_failures_status")
                .table(posting_failures::Entity)
                .col(posting_failures::Column::Status)
                .to_owned(),
        ];
        for mut index in indexes {
            manager.create_index(index.if_not_exists().to_owned()).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(year_end_closings::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(posting_failures::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(audit_logs::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(bank_transactions::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(cashbox_transactions::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(bank_accounts::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(cashboxes::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(document_sequences::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(journal_lines::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(journal_entries::Entity).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(accounts::Entity).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
