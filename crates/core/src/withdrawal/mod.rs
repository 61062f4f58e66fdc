//! Withdrawal workflow.
//!
//! A withdrawal request reserves money on creation, then is either approved
//! (the reservation settles and a `withdrawal` or `payout` transaction is
//! written) or rejected (the reservation is released). Approved requests are
//! marked processed once payout is confirmed.
//!
//! # Modules
//!
//! - `types` - Request, status and action types
//! - `service` - State transition logic

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::WithdrawalService;
pub use types::{
    NewWithdrawal, PaymentMethod, WithdrawalAction, WithdrawalFilter, WithdrawalRequest,
    WithdrawalStatus,
};
