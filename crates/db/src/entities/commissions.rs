//! `SeaORM` Entity for commissions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::CommissionStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "commissions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_id: Uuid,
    pub order_id: String,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub order_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub commission_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub commission_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub credited_amount: Decimal,
    pub status: CommissionStatus,
    pub created_at: DateTimeWithTimeZone,
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
