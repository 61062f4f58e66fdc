//! `SeaORM` Entity for balances table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::EntityKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_id: Uuid,
    pub kind: EntityKind,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_earnings: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub total_deductions: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub withdrawn_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub pending_withdrawal: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 2)))")]
    pub available_balance: Decimal,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_transactions::Entity")]
    LedgerTransactions,
    #[sea_orm(has_many = "super::commissions::Entity")]
    Commissions,
    #[sea_orm(has_many = "super::withdrawal_requests::Entity")]
    WithdrawalRequests,
    #[sea_orm(has_one = "super::commission_rate_overrides::Entity")]
    CommissionRateOverrides,
}

impl Related<super::ledger_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerTransactions.def()
    }
}

impl Related<super::commissions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Commissions.def()
    }
}

impl Related<super::withdrawal_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WithdrawalRequests.def()
    }
}

impl Related<super::commission_rate_overrides::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommissionRateOverrides.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
