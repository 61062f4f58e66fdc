//! Conversions between entity models and ledger domain types.
//!
//! Rows are validated on the way out: a stored amount that no longer fits the
//! domain types is reported as a storage error rather than silently accepted.

use chrono::{DateTime, Utc};
use fleetpay_core::commission::types::{Commission, CommissionStatus};
use fleetpay_core::ledger::{Balance, EntityKind, LedgerError, LedgerTransaction, TransactionType};
use fleetpay_core::withdrawal::types::{PaymentMethod, WithdrawalRequest, WithdrawalStatus};
use fleetpay_shared::types::{
    Amount, CommissionId, EntityId, Rate, TransactionId, UserId, WithdrawalId,
};
use rust_decimal::Decimal;
use sea_orm::Set;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::sea_orm_active_enums as db;
use crate::entities::{balances, commissions, ledger_transactions, withdrawal_requests};

fn amount(column: &str, value: Decimal) -> Result<Amount, LedgerError> {
    Amount::new(value).map_err(|err| LedgerError::Storage(format!("Invalid {column} in storage: {err}")))
}

pub(crate) fn rate(value: Decimal) -> Result<Rate, LedgerError> {
    Rate::new(value).map_err(|err| LedgerError::Storage(format!("Invalid rate in storage: {err}")))
}

fn utc(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

// ========== Enums ==========

impl From<EntityKind> for db::EntityKind {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Driver => Self::Driver,
            EntityKind::Restaurant => Self::Restaurant,
        }
    }
}

impl From<db::EntityKind> for EntityKind {
    fn from(kind: db::EntityKind) -> Self {
        match kind {
            db::EntityKind::Driver => Self::Driver,
            db::EntityKind::Restaurant => Self::Restaurant,
        }
    }
}

impl From<TransactionType> for db::TransactionType {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Commission => Self::Commission,
            TransactionType::ManualAdd => Self::ManualAdd,
            TransactionType::Bonus => Self::Bonus,
            TransactionType::Adjustment => Self::Adjustment,
            TransactionType::Refund => Self::Refund,
            TransactionType::Deduction => Self::Deduction,
            TransactionType::Withdrawal => Self::Withdrawal,
            TransactionType::Payout => Self::Payout,
        }
    }
}

impl From<db::TransactionType> for TransactionType {
    fn from(kind: db::TransactionType) -> Self {
        match kind {
            db::TransactionType::Commission => Self::Commission,
            db::TransactionType::ManualAdd => Self::ManualAdd,
            db::TransactionType::Bonus => Self::Bonus,
            db::TransactionType::Adjustment => Self::Adjustment,
            db::TransactionType::Refund => Self::Refund,
            db::TransactionType::Deduction => Self::Deduction,
            db::TransactionType::Withdrawal => Self::Withdrawal,
            db::TransactionType::Payout => Self::Payout,
        }
    }
}

impl From<WithdrawalStatus> for db::WithdrawalStatus {
    fn from(status: WithdrawalStatus) -> Self {
        match status {
            WithdrawalStatus::Pending => Self::Pending,
            WithdrawalStatus::Approved => Self::Approved,
            WithdrawalStatus::Rejected => Self::Rejected,
            WithdrawalStatus::Processed => Self::Processed,
        }
    }
}

impl From<db::WithdrawalStatus> for WithdrawalStatus {
    fn from(status: db::WithdrawalStatus) -> Self {
        match status {
            db::WithdrawalStatus::Pending => Self::Pending,
            db::WithdrawalStatus::Approved => Self::Approved,
            db::WithdrawalStatus::Rejected => Self::Rejected,
            db::WithdrawalStatus::Processed => Self::Processed,
        }
    }
}

impl From<PaymentMethod> for db::PaymentMethod {
    fn from(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::BankTransfer => Self::BankTransfer,
            PaymentMethod::Wallet => Self::Wallet,
            PaymentMethod::Cash => Self::Cash,
        }
    }
}

impl From<db::PaymentMethod> for PaymentMethod {
    fn from(method: db::PaymentMethod) -> Self {
        match method {
            db::PaymentMethod::BankTransfer => Self::BankTransfer,
            db::PaymentMethod::Wallet => Self::Wallet,
            db::PaymentMethod::Cash => Self::Cash,
        }
    }
}

impl From<CommissionStatus> for db::CommissionStatus {
    fn from(status: CommissionStatus) -> Self {
        match status {
            CommissionStatus::Approved => Self::Approved,
        }
    }
}

impl From<db::CommissionStatus> for CommissionStatus {
    fn from(status: db::CommissionStatus) -> Self {
        match status {
            db::CommissionStatus::Approved => Self::Approved,
        }
    }
}

// ========== Balances ==========

pub(crate) fn balance_from_model(model: balances::Model) -> Result<Balance, LedgerError> {
    Ok(Balance {
        entity_id: EntityId::from_uuid(model.entity_id),
        kind: model.kind.into(),
        total_earnings: amount("total_earnings", model.total_earnings)?,
        total_deductions: amount("total_deductions", model.total_deductions)?,
        withdrawn_amount: amount("withdrawn_amount", model.withdrawn_amount)?,
        pending_withdrawal: amount("pending_withdrawal", model.pending_withdrawal)?,
        available_balance: amount("available_balance", model.available_balance)?,
        version: model.version,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn balance_active_model(balance: &Balance) -> balances::ActiveModel {
    balances::ActiveModel {
        entity_id: Set(balance.entity_id.into_inner()),
        kind: Set(balance.kind.into()),
        total_earnings: Set(balance.total_earnings.value()),
        total_deductions: Set(balance.total_deductions.value()),
        withdrawn_amount: Set(balance.withdrawn_amount.value()),
        pending_withdrawal: Set(balance.pending_withdrawal.value()),
        available_balance: Set(balance.available_balance.value()),
        version: Set(balance.version),
        created_at: Set(balance.created_at.into()),
        updated_at: Set(balance.updated_at.into()),
    }
}

// ========== Transactions ==========

pub(crate) fn transaction_from_model(
    model: ledger_transactions::Model,
) -> Result<LedgerTransaction, LedgerError> {
    Ok(LedgerTransaction {
        id: TransactionId::from_uuid(model.id),
        entity_id: EntityId::from_uuid(model.entity_id),
        sequence: model.sequence,
        transaction_type: model.transaction_type.into(),
        amount: model.amount,
        description: model.description,
        reference_id: model.reference_id,
        balance_after: amount("balance_after", model.balance_after)?,
        created_at: utc(model.created_at),
    })
}

pub(crate) fn transaction_active_model(
    transaction: &LedgerTransaction,
) -> ledger_transactions::ActiveModel {
    ledger_transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        entity_id: Set(transaction.entity_id.into_inner()),
        sequence: Set(transaction.sequence),
        transaction_type: Set(transaction.transaction_type.into()),
        amount: Set(transaction.amount),
        description: Set(transaction.description.clone()),
        reference_id: Set(transaction.reference_id.clone()),
        balance_after: Set(transaction.balance_after.value()),
        created_at: Set(transaction.created_at.into()),
    }
}

// ========== Commissions ==========

pub(crate) fn commission_from_model(model: commissions::Model) -> Result<Commission, LedgerError> {
    Ok(Commission {
        id: CommissionId::from_uuid(model.id),
        entity_id: EntityId::from_uuid(model.entity_id),
        order_id: model.order_id,
        order_amount: amount("order_amount", model.order_amount)?,
        commission_rate: rate(model.commission_rate)?,
        commission_amount: amount("commission_amount", model.commission_amount)?,
        credited_amount: amount("credited_amount", model.credited_amount)?,
        status: model.status.into(),
        created_at: utc(model.created_at),
    })
}

pub(crate) fn commission_active_model(commission: &Commission) -> commissions::ActiveModel {
    commissions::ActiveModel {
        id: Set(commission.id.into_inner()),
        entity_id: Set(commission.entity_id.into_inner()),
        order_id: Set(commission.order_id.clone()),
        order_amount: Set(commission.order_amount.value()),
        commission_rate: Set(commission.commission_rate.value()),
        commission_amount: Set(commission.commission_amount.value()),
        credited_amount: Set(commission.credited_amount.value()),
        status: Set(commission.status.into()),
        created_at: Set(commission.created_at.into()),
    }
}

// ========== Withdrawal requests ==========

pub(crate) fn withdrawal_from_model(
    model: withdrawal_requests::Model,
) -> Result<WithdrawalRequest, LedgerError> {
    Ok(WithdrawalRequest {
        id: WithdrawalId::from_uuid(model.id),
        entity_id: EntityId::from_uuid(model.entity_id),
        entity_kind: model.entity_kind.into(),
        amount: amount("amount", model.amount)?,
        payment_method: model.payment_method.into(),
        account_details: model.account_details,
        notes: model.notes,
        status: model.status.into(),
        requested_at: utc(model.requested_at),
        approved_by: model.approved_by.map(UserId::from_uuid),
        reviewed_at: model.reviewed_at.map(utc),
        processed_at: model.processed_at.map(utc),
        admin_notes: model.admin_notes,
        rejection_reason: model.rejection_reason,
    })
}

pub(crate) fn withdrawal_active_model(
    request: &WithdrawalRequest,
) -> withdrawal_requests::ActiveModel {
    withdrawal_requests::ActiveModel {
        id: Set(request.id.into_inner()),
        entity_id: Set(request.entity_id.into_inner()),
        entity_kind: Set(request.entity_kind.into()),
        amount: Set(request.amount.value()),
        payment_method: Set(request.payment_method.into()),
        account_details: Set(request.account_details.clone()),
        notes: Set(request.notes.clone()),
        status: Set(request.status.into()),
        requested_at: Set(request.requested_at.into()),
        approved_by: Set(request.approved_by.map(UserId::into_inner)),
        reviewed_at: Set(request.reviewed_at.map(Into::into)),
        processed_at: Set(request.processed_at.map(Into::into)),
        admin_notes: Set(request.admin_notes.clone()),
        rejection_reason: Set(request.rejection_reason.clone()),
    }
}
