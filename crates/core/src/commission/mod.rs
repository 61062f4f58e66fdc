//! Commission engine.
//!
//! Turns an "order delivered" event into a commission record and the amount
//! credited to the entity. Exactly-once application is enforced by the
//! settlement layer through the `(entity_id, order_id)` uniqueness of
//! commission records.

pub mod engine;
pub mod types;

#[cfg(test)]
mod engine_props;

pub use engine::{CommissionEngine, CommissionRates, MAX_ORDER_ID_LEN, ValidatedOrder};
pub use types::{
    Commission, CommissionOutcome, CommissionStatus, CommissionTotals, OrderDelivered,
};
