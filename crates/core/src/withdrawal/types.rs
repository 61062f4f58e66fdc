//! Withdrawal domain types.
//!
//! This module defines the withdrawal request, its lifecycle status and the
//! actions produced by state transitions.

use chrono::{DateTime, Utc};
use fleetpay_shared::types::{Amount, EntityId, UserId, WithdrawalId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::types::EntityKind;

/// Withdrawal request status.
///
/// The valid transitions are:
/// - Pending → Approved (approve)
/// - Pending → Rejected (reject)
/// - Approved → Processed (mark processed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    /// Awaiting review; the amount is reserved.
    Pending,
    /// Approved; the reservation has been settled.
    Approved,
    /// Rejected; the reservation has been released.
    Rejected,
    /// Payout confirmed externally.
    Processed,
}

impl WithdrawalStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Processed => "processed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "processed" => Some(Self::Processed),
            _ => None,
        }
    }

    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Processed)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the entity wants to be paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Bank transfer; account details are required.
    BankTransfer,
    /// Platform wallet.
    Wallet,
    /// Cash handed over at the office.
    Cash,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::Wallet => "wallet",
            Self::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to move money out of an entity's available balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    /// Request ID.
    pub id: WithdrawalId,
    /// The entity withdrawing.
    pub entity_id: EntityId,
    /// Driver or restaurant; decides the settlement transaction type.
    pub entity_kind: EntityKind,
    /// Reserved amount.
    pub amount: Amount,
    /// Payout channel.
    pub payment_method: PaymentMethod,
    /// Free-form payout details (bank, account number, holder).
    pub account_details: serde_json::Value,
    /// Requester's notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Current status.
    pub status: WithdrawalStatus,
    /// When the request was created.
    pub requested_at: DateTime<Utc>,
    /// Reviewer who approved the request.
    pub approved_by: Option<UserId>,
    /// When the request was approved or rejected.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// When payout was confirmed.
    pub processed_at: Option<DateTime<Utc>>,
    /// Reviewer notes.
    pub admin_notes: Option<String>,
    /// Why the request was rejected.
    pub rejection_reason: Option<String>,
}

/// Fields needed to open a withdrawal request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWithdrawal {
    /// Payout channel.
    pub payment_method: PaymentMethod,
    /// Payout details.
    #[serde(default)]
    pub account_details: serde_json::Value,
    /// Free-form note from the requester.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A state transition with its audit data.
#[derive(Debug, Clone)]
pub enum WithdrawalAction {
    /// Approve a pending request.
    Approve {
        /// The new status after approval.
        new_status: WithdrawalStatus,
        /// The reviewer.
        approved_by: UserId,
        /// When the request was approved.
        approved_at: DateTime<Utc>,
        /// Optional reviewer notes.
        admin_notes: Option<String>,
    },
    /// Reject a pending request.
    Reject {
        /// The new status after rejection.
        new_status: WithdrawalStatus,
        /// When the request was rejected.
        rejected_at: DateTime<Utc>,
        /// The reason for rejection.
        rejection_reason: String,
    },
    /// Confirm payout of an approved request.
    Process {
        /// The new status after processing.
        new_status: WithdrawalStatus,
        /// When payout was confirmed.
        processed_at: DateTime<Utc>,
    },
}

impl WithdrawalAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> WithdrawalStatus {
        match self {
            Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Process { new_status, .. } => *new_status,
        }
    }

    /// Applies the action to `request`, returning the updated request.
    #[must_use]
    pub fn apply(self, request: WithdrawalRequest) -> WithdrawalRequest {
        match self {
            Self::Approve {
                new_status,
                approved_by,
                approved_at,
                admin_notes,
            } => WithdrawalRequest {
                status: new_status,
                approved_by: Some(approved_by),
                reviewed_at: Some(approved_at),
                admin_notes,
                ..request
            },
            Self::Reject {
                new_status,
                rejected_at,
                rejection_reason,
            } => WithdrawalRequest {
                status: new_status,
                reviewed_at: Some(rejected_at),
                rejection_reason: Some(rejection_reason),
                ..request
            },
            Self::Process {
                new_status,
                processed_at,
            } => WithdrawalRequest {
                status: new_status,
                processed_at: Some(processed_at),
                ..request
            },
        }
    }
}

/// Filter for listing withdrawal requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WithdrawalFilter {
    /// Only include requests of this entity.
    pub entity_id: Option<EntityId>,
    /// Only include requests in this status.
    pub status: Option<WithdrawalStatus>,
}

impl WithdrawalFilter {
    /// Admin review queue: pending requests across all entities.
    #[must_use]
    pub fn pending_queue() -> Self {
        Self {
            entity_id: None,
            status: Some(WithdrawalStatus::Pending),
        }
    }

    /// Returns true if `request` passes the filter.
    #[must_use]
    pub fn matches(&self, request: &WithdrawalRequest) -> bool {
        self.entity_id.is_none_or(|id| id == request.entity_id)
            && self.status.is_none_or(|status| status == request.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str() {
        assert_eq!(WithdrawalStatus::Pending.as_str(), "pending");
        assert_eq!(WithdrawalStatus::Approved.as_str(), "approved");
        assert_eq!(WithdrawalStatus::Rejected.as_str(), "rejected");
        assert_eq!(WithdrawalStatus::Processed.as_str(), "processed");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            WithdrawalStatus::parse("PENDING"),
            Some(WithdrawalStatus::Pending)
        );
        assert_eq!(
            WithdrawalStatus::parse("Processed"),
            Some(WithdrawalStatus::Processed)
        );
        assert_eq!(WithdrawalStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!WithdrawalStatus::Pending.is_terminal());
        assert!(!WithdrawalStatus::Approved.is_terminal());
        assert!(WithdrawalStatus::Rejected.is_terminal());
        assert!(WithdrawalStatus::Processed.is_terminal());
    }

    #[test]
    fn test_payment_method_serde() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"bank_transfer\"");
        let parsed: PaymentMethod = serde_json::from_str("\"wallet\"").unwrap();
        assert_eq!(parsed, PaymentMethod::Wallet);
        assert!(serde_json::from_str::<PaymentMethod>("\"cheque\"").is_err());
    }

    #[test]
    fn test_filter_matches() {
        let entity = EntityId::new();
        let request = WithdrawalRequest {
            id: WithdrawalId::new(),
            entity_id: entity,
            entity_kind: EntityKind::Driver,
            amount: Amount::from_minor(50_000).unwrap(),
            payment_method: PaymentMethod::Cash,
            account_details: serde_json::Value::Null,
            notes: None,
            status: WithdrawalStatus::Pending,
            requested_at: Utc::now(),
            approved_by: None,
            reviewed_at: None,
            processed_at: None,
            admin_notes: None,
            rejection_reason: None,
        };

        assert!(WithdrawalFilter::default().matches(&request));
        assert!(WithdrawalFilter::pending_queue().matches(&request));
        assert!(
            !WithdrawalFilter {
                entity_id: Some(EntityId::new()),
                status: None,
            }
            .matches(&request)
        );
        assert!(
            !WithdrawalFilter {
                entity_id: Some(entity),
                status: Some(WithdrawalStatus::Approved),
            }
            .matches(&request)
        );
    }
}
