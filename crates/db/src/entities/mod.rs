//! `SeaORM` entity definitions for the earnings ledger tables.

pub mod prelude;

pub mod balances;
pub mod commission_rate_overrides;
pub mod commissions;
pub mod ledger_transactions;
pub mod sea_orm_active_enums;
pub mod withdrawal_requests;
