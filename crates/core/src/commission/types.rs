//! Commission domain types.

use chrono::{DateTime, Utc};
use fleetpay_shared::types::{Amount, AmountError, CommissionId, EntityId, Rate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commission status. Commissions are approved on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    /// Credited to the entity's balance.
    Approved,
}

impl CommissionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Earnings computed from one delivered order, applied at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    /// Commission ID.
    pub id: CommissionId,
    /// The credited entity.
    pub entity_id: EntityId,
    /// Order reference; unique per entity.
    pub order_id: String,
    /// Order total.
    pub order_amount: Amount,
    /// Rate applied, in percent.
    pub commission_rate: Rate,
    /// `order_amount × commission_rate / 100`, rounded half-up.
    pub commission_amount: Amount,
    /// What the entity's balance was credited with.
    pub credited_amount: Amount,
    /// Status.
    pub status: CommissionStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Result of applying a delivered-order event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "commission", rename_all = "snake_case")]
pub enum CommissionOutcome {
    /// The commission was created and credited.
    Applied(Commission),
    /// The order had already been credited; nothing changed.
    AlreadyProcessed(Commission),
}

impl CommissionOutcome {
    /// Returns the commission record.
    #[must_use]
    pub fn commission(&self) -> &Commission {
        match self {
            Self::Applied(commission) | Self::AlreadyProcessed(commission) => commission,
        }
    }

    /// Consumes the outcome, returning the commission record.
    #[must_use]
    pub fn into_commission(self) -> Commission {
        match self {
            Self::Applied(commission) | Self::AlreadyProcessed(commission) => commission,
        }
    }

    /// Returns true if this call changed the ledger.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// "Order delivered" event emitted by the order service.
///
/// Amounts arrive as raw decimals and are validated by the engine, so a
/// malformed event fails with a ledger error rather than a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDelivered {
    /// The entity to credit.
    pub entity_id: EntityId,
    /// Order reference.
    pub order_id: String,
    /// Order total.
    pub order_amount: Decimal,
    /// Explicit rate; the entity's configured rate is used when absent.
    #[serde(default)]
    pub commission_rate: Option<Decimal>,
}

/// Aggregate of commissions in a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionTotals {
    /// Number of commissions.
    pub count: u64,
    /// Sum of order totals.
    pub order_total: Amount,
    /// Sum of credited amounts.
    pub credited_total: Amount,
}

impl CommissionTotals {
    /// Adds one commission to the totals.
    pub fn add(self, commission: &Commission) -> Result<Self, AmountError> {
        Ok(Self {
            count: self.count + 1,
            order_total: self.order_total.checked_add(commission.order_amount)?,
            credited_total: self.credited_total.checked_add(commission.credited_amount)?,
        })
    }
}
