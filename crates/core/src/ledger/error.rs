//! Ledger error taxonomy.
//!
//! Every fallible operation of the earnings ledger, the commission engine,
//! the withdrawal workflow and the settlement coordinator reports one of
//! these variants. A replayed commission is not an error; see
//! `CommissionOutcome::AlreadyProcessed`.

use fleetpay_shared::types::{Amount, AmountError, EntityId, WithdrawalId};
use thiserror::Error;

use crate::withdrawal::types::WithdrawalStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Malformed request (rate, order id, reason, date range).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Negative, zero or over-precise amount where a positive one is required.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    // ========== Business Rule Errors ==========
    /// Debit, reservation or withdrawal exceeds the available balance.
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// The amount asked for.
        requested: Amount,
        /// The available balance at the time of the request.
        available: Amount,
    },

    /// Withdrawal state machine violation.
    #[error("Invalid withdrawal transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: WithdrawalStatus,
        /// The attempted target status.
        to: WithdrawalStatus,
    },

    /// Settling or releasing more than is held in reservation.
    #[error("Reservation exceeded: requested {requested}, reserved {reserved}")]
    ReservationExceeded {
        /// The amount asked for.
        requested: Amount,
        /// The amount currently held.
        reserved: Amount,
    },

    // ========== Lookup Errors ==========
    /// No ledger exists for the entity.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// No withdrawal request with this id.
    #[error("Withdrawal request not found: {0}")]
    WithdrawalNotFound(WithdrawalId),

    /// A ledger was already opened for the entity.
    #[error("Entity {0} already has a ledger")]
    EntityAlreadyExists(EntityId),

    // ========== Concurrency Errors ==========
    /// The unit of work could not commit and may be retried.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The entity lock could not be acquired in time.
    #[error("Timed out waiting for the ledger lock of entity {0}")]
    LockTimeout(EntityId),

    /// A unit of work ran past its deadline after taking the lock.
    ///
    /// The store may or may not have committed it, so it is never retried;
    /// callers re-read the ledger to learn the outcome.
    #[error("Ledger update for entity {0} timed out; re-read to confirm its outcome")]
    UnitTimeout(EntityId),

    // ========== Storage Errors ==========
    /// Storage backend failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::ReservationExceeded { .. } => "RESERVATION_EXCEEDED",
            Self::EntityNotFound(_) => "ENTITY_NOT_FOUND",
            Self::WithdrawalNotFound(_) => "WITHDRAWAL_NOT_FOUND",
            Self::EntityAlreadyExists(_) => "ENTITY_ALREADY_EXISTS",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::UnitTimeout(_) => "UNIT_TIMEOUT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidInput(_) | Self::InvalidAmount(_) => 400,

            // 404 Not Found
            Self::EntityNotFound(_) | Self::WithdrawalNotFound(_) => 404,

            // 409 Conflict - state and concurrency errors
            Self::InvalidTransition { .. }
            | Self::EntityAlreadyExists(_)
            | Self::ConcurrencyConflict(_) => 409,

            // 422 Unprocessable - business rule violations
            Self::InsufficientBalance { .. } => 422,

            // 503 Service Unavailable - entity is busy or the update stalled
            Self::LockTimeout(_) | Self::UnitTimeout(_) => 503,

            // 500 Internal Server Error
            Self::ReservationExceeded { .. } | Self::Storage(_) => 500,
        }
    }

    /// Returns true if the coordinator should retry the unit of work.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_) | Self::LockTimeout(_))
    }
}

impl From<AmountError> for LedgerError {
    fn from(err: AmountError) -> Self {
        match err {
            AmountError::RateOutOfRange(_) | AmountError::RateTooPrecise(_) => {
                Self::InvalidInput(err.to_string())
            }
            AmountError::Negative(_) | AmountError::TooPrecise(_) | AmountError::TooLarge(_) => {
                Self::InvalidAmount(err.to_string())
            }
        }
    }
}
