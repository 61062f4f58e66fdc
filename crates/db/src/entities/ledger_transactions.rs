//! `SeaORM` Entity for ledger_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TransactionType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entity_id: Uuid,
    pub sequence: i64,
    pub transaction_type: TransactionType,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub amount: Decimal,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub reference_id: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub balance_after: Decimal,
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
