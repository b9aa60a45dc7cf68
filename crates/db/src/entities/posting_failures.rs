//! `SeaORM` Entity for side-effect postings that failed and await remediation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::FailureStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "posting_failures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub handler: String,
    pub event_kind: String,
    pub reference_id: Uuid,
    /// The serialized business event, replayed on retry.
    pub payload: Json,
    pub error: String,
    pub error_code: String,
    pub attempts: i32,
    pub status: FailureStatus,
    pub resolution: Option<String>,
    pub actor_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
