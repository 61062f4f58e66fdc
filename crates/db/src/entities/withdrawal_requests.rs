//! `SeaORM` Entity for withdrawal_requests table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{EntityKind, PaymentMethod, WithdrawalStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawal_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_id: Uuid,
    pub entity_kind: EntityKind,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    #[sea_orm(column_type = "JsonBinary")]
    pub account_details: Json,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub status: WithdrawalStatus,
    pub requested_at: DateTimeWithTimeZone,
    pub approved_by: Option<Uuid>,
    pub reviewed_at: Option<DateTimeWithTimeZone>,
    pub processed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Text", nullable)]
    pub admin_notes: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::balances::Entity",
        from = "Column::EntityId",
        to = "super::balances::Column::EntityId"
    )]
    Balances,
}

impl Related<super::balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Balances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
