//! `SeaORM` Entity for fiscal year closing markers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "year_end_closings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub fiscal_year: i32,
    pub closing_date: Date,
    pub closing_entry_id: Uuid,
    pub capital_account_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 3)))")]
    pub net_income: Decimal,
    pub closed_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::journal_entries::Entity",
        from = "Column::ClosingEntryId",
        to = "super::journal_entries::Column::Id",
        on_delete = "Restrict"
    )]
    ClosingEntry,
}

impl Related<super::journal_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClosingEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
