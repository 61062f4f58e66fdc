//! `SeaORM` active enums backed by PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `entity_kind` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entity_kind")]
pub enum EntityKind {
    /// Driver.
    #[sea_orm(string_value = "driver")]
    Driver,
    /// Restaurant.
    #[sea_orm(string_value = "restaurant")]
    Restaurant,
}

/// `transaction_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Commission.
    #[sea_orm(string_value = "commission")]
    Commission,
    /// Manual add.
    #[sea_orm(string_value = "manual_add")]
    ManualAdd,
    /// Bonus.
    #[sea_orm(string_value = "bonus")]
    Bonus,
    /// Adjustment.
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
    /// Refund.
    #[sea_orm(string_value = "refund")]
    Refund,
    /// Deduction.
    #[sea_orm(string_value = "deduction")]
    Deduction,
    /// Withdrawal.
    #[sea_orm(string_value = "withdrawal")]
    Withdrawal,
    /// Payout.
    #[sea_orm(string_value = "payout")]
    Payout,
}

/// `commission_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "commission_status")]
pub enum CommissionStatus {
    /// Approved.
    #[sea_orm(string_value = "approved")]
    Approved,
}

/// `withdrawal_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "withdrawal_status")]
pub enum WithdrawalStatus {
    /// Pending.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected.
    #[sea_orm(string_value = "rejected")]
    Rejected,
    /// Processed.
    #[sea_orm(string_value = "processed")]
    Processed,
}

/// `payment_method` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_method")]
pub enum PaymentMethod {
    /// Bank transfer.
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    /// Wallet.
    #[sea_orm(string_value = "wallet")]
    Wallet,
    /// Cash.
    #[sea_orm(string_value = "cash")]
    Cash,
}
