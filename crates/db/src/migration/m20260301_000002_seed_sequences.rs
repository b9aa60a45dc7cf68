//! Seeds one numbering counter per document type.

use chrono::Utc;
use daftar_core::sequence::DocumentType;
use sea_orm::{EntityTrait, Set};
use sea_orm_migration::prelude::*;
use uuid::Uuid;

use crate::entities::document_sequences;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = Utc::now();
        let rows = DocumentType::ALL.into_iter().map(|document_type| document_sequences::ActiveModel {
            id: Set(Uuid::now_v7()),
            document_type: Set(document_type.into()),
            prefix: Set(document_type.default_prefix().to_string()),
            digits: Set(<i32 as TryFrom<_>>::try_from(DocumentType::DEFAULT_DIGITS).unwrap_or(6)),
            current_number: Set(1),
            updated_at: Set(now.into()),
        });

        document_sequences::Entity::insert_many(rows)
            .exec(manager.get_connection())
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        document_sequences::Entity::delete_many()
            .exec(manager.get_connection())
            .await?;
        Ok(())
    }
}
