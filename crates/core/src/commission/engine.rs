//! Commission computation.
//!
//! Drivers are paid a share of the order total: the rate is the driver's
//! share and the commission amount is what gets credited. Restaurants pay a
//! platform fee: the rate is the fee and the restaurant is credited with the
//! order total net of it.

use chrono::{DateTime, Utc};
use fleetpay_shared::LedgerConfig;
use fleetpay_shared::types::{Amount, CommissionId, EntityId, Rate};

use crate::commission::types::{Commission, CommissionStatus, OrderDelivered};
use crate::ledger::error::LedgerError;
use crate::ledger::types::EntityKind;

/// Longest accepted order reference.
pub const MAX_ORDER_ID_LEN: usize = 128;

/// Default commission rates per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionRates {
    driver: Rate,
    restaurant: Rate,
}

impl CommissionRates {
    /// Creates rates from per-kind defaults.
    #[must_use]
    pub fn new(driver: Rate, restaurant: Rate) -> Self {
        Self { driver, restaurant }
    }

    /// Reads the defaults from ledger configuration.
    pub fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        Ok(Self::new(
            Rate::new(config.default_driver_rate)?,
            Rate::new(config.default_restaurant_rate)?,
        ))
    }

    /// Default rate for `kind`.
    #[must_use]
    pub fn default_for(&self, kind: EntityKind) -> Rate {
        match kind {
            EntityKind::Driver => self.driver,
            EntityKind::Restaurant => self.restaurant,
        }
    }

    /// Picks the rate to apply: the event's explicit rate, then the entity's
    /// override, then the kind default.
    #[must_use]
    pub fn resolve(
        &self,
        kind: EntityKind,
        entity_override: Option<Rate>,
        explicit: Option<Rate>,
    ) -> Rate {
        explicit
            .or(entity_override)
            .unwrap_or_else(|| self.default_for(kind))
    }
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
            .unwrap_or(Self::new(Rate::ZERO, Rate::ZERO))
    }
}

/// Validated content of an `OrderDelivered` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    /// Trimmed order reference.
    pub order_id: String,
    /// Order total.
    pub order_amount: Amount,
    /// Explicit rate, if the event carried one.
    pub commission_rate: Option<Rate>,
}

/// Stateless commission calculator.
pub struct CommissionEngine;

impl CommissionEngine {
    /// Validates an incoming event.
    ///
    /// # Returns
    /// * `Err(LedgerError::InvalidInput)` for an empty or oversized order id,
    ///   or a rate outside `[0, 100]`
    /// * `Err(LedgerError::InvalidAmount)` for a negative or sub-cent order total
    pub fn validate(event: &OrderDelivered) -> Result<ValidatedOrder, LedgerError> {
        let order_id = event.order_id.trim();
        if order_id.is_empty() {
            return Err(LedgerError::InvalidInput("Order id is required".to_string()));
        }
        if order_id.len() > MAX_ORDER_ID_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "Order id exceeds {MAX_ORDER_ID_LEN} characters"
            )));
        }

        Ok(ValidatedOrder {
            order_id: order_id.to_string(),
            order_amount: Amount::new(event.order_amount)?,
            commission_rate: event.commission_rate.map(Rate::new).transpose()?,
        })
    }

    /// Amount credited to an entity of `kind` for a commission.
    #[must_use]
    pub fn credited_amount(kind: EntityKind, order_amount: Amount, commission_amount: Amount) -> Amount {
        match kind {
            EntityKind::Driver => commission_amount,
            // A percentage never exceeds its base, so the subtraction cannot underflow.
            EntityKind::Restaurant => order_amount
                .checked_sub(commission_amount)
                .unwrap_or(Amount::ZERO),
        }
    }

    /// Computes the commission record for an order.
    pub fn compute(
        entity_id: EntityId,
        kind: EntityKind,
        order: &ValidatedOrder,
        rate: Rate,
        now: DateTime<Utc>,
    ) -> Result<Commission, LedgerError> {
        let commission_amount = order.order_amount.percentage(rate)?;
        Ok(Commission {
            id: CommissionId::new(),
            entity_id,
            order_id: order.order_id.clone(),
            order_amount: order.order_amount,
            commission_rate: rate,
            commission_amount,
            credited_amount: Self::credited_amount(kind, order.order_amount, commission_amount),
            status: CommissionStatus::Approved,
            created_at: now,
        })
    }
}
