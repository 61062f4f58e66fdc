//! Entity aliases.

pub use super::balances::Entity as Balances;
pub use super::commission_rate_overrides::Entity as CommissionRateOverrides;
pub use super::commissions::Entity as Commissions;
pub use super::ledger_transactions::Entity as LedgerTransactions;
pub use super::withdrawal_requests::Entity as WithdrawalRequests;
