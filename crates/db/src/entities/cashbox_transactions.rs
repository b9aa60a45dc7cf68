//! `SeaORM` Entity for cashbox sub-ledger rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ReferenceType, SubledgerTxType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cashbox_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cashbox_id: Uuid,
    pub transaction_type: SubledgerTxType,
    #[sea_orm(column_type = "Decimal(Some((16, 3)))")]
    pub amount: Decimal,
    pub transaction_date: Date,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cashboxes::Entity",
        from = "Column::CashboxId",
        to = "super::cashboxes::Column::Id",
        on_delete = "Restrict"
    )]
    Holder,
}

impl Related<super::cashboxes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Holder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
