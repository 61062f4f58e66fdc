//! In-memory `LedgerStore`.
//!
//! Holds all state behind one async `RwLock`; `commit` validates the whole
//! changeset before touching anything, so a rejected commit leaves no trace.
//! Used by tests and by the API test harness.

use std::collections::HashMap;

use async_trait::async_trait;
use fleetpay_shared::types::{EntityId, PageRequest, PageResponse, Rate, WithdrawalId};
use tokio::sync::RwLock;

use crate::commission::types::{Commission, CommissionTotals};
use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::ledger::transaction::LedgerTransaction;
use crate::ledger::types::{DateRange, TransactionFilter};
use crate::settlement::store::{Changeset, LedgerSnapshot, LedgerStore};
use crate::withdrawal::types::{WithdrawalFilter, WithdrawalRequest, WithdrawalStatus};

#[derive(Debug, Default)]
struct State {
    balances: HashMap<EntityId, Balance>,
    // Append order is creation order.
    transactions: Vec<LedgerTransaction>,
    commissions: Vec<Commission>,
    commission_index: HashMap<(EntityId, String), usize>,
    withdrawals: Vec<WithdrawalRequest>,
    withdrawal_index: HashMap<WithdrawalId, usize>,
    rates: HashMap<EntityId, Rate>,
}

/// A `LedgerStore` kept entirely in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transactions recorded for an entity.
    pub async fn transaction_count(&self, entity_id: EntityId) -> usize {
        let state = self.state.read().await;
        state
            .transactions
            .iter()
            .filter(|tx| tx.entity_id == entity_id)
            .count()
    }

    /// Number of commissions recorded for an entity.
    pub async fn commission_count(&self, entity_id: EntityId) -> usize {
        let state = self.state.read().await;
        state
            .commissions
            .iter()
            .filter(|c| c.entity_id == entity_id)
            .count()
    }
}

fn paginate<T: Clone>(newest_first: &[T], page: PageRequest) -> PageResponse<T> {
    let total = u64::try_from(newest_first.len()).unwrap_or(u64::MAX);
    PageResponse::new(page.slice(newest_first), page.page, page.per_page, total)
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_balance(&self, balance: &Balance) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if state.balances.contains_key(&balance.entity_id) {
            return Err(LedgerError::EntityAlreadyExists(balance.entity_id));
        }
        state.balances.insert(balance.entity_id, balance.clone());
        Ok(())
    }

    async fn load_balance(&self, entity_id: EntityId) -> Result<Option<Balance>, LedgerError> {
        Ok(self.state.read().await.balances.get(&entity_id).cloned())
    }

    async fn find_commission(
        &self,
        entity_id: EntityId,
        order_id: &str,
    ) -> Result<Option<Commission>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .commission_index
            .get(&(entity_id, order_id.to_string()))
            .map(|&idx| state.commissions[idx].clone()))
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .withdrawal_index
            .get(&id)
            .map(|&idx| state.withdrawals[idx].clone()))
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        let entity_id = changeset.balance.entity_id;

        let current = state
            .balances
            .get(&entity_id)
            .ok_or(LedgerError::EntityNotFound(entity_id))?;
        if current.version != changeset.expected_version
            || changeset.balance.version != changeset.expected_version + 1
        {
            return Err(LedgerError::ConcurrencyConflict(format!(
                "balance of {entity_id} is at version {}, expected {}",
                current.version, changeset.expected_version
            )));
        }
        if let Some(commission) = &changeset.commission {
            let key = (commission.entity_id, commission.order_id.clone());
            if state.commission_index.contains_key(&key) {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "order {} already credited to {}",
                    commission.order_id, commission.entity_id
                )));
            }
        }

        state.balances.insert(entity_id, changeset.balance);
        if let Some(transaction) = changeset.transaction {
            state.transactions.push(transaction);
        }
        if let Some(commission) = changeset.commission {
            let key = (commission.entity_id, commission.order_id.clone());
            let idx = state.commissions.len();
            state.commissions.push(commission);
            state.commission_index.insert(key, idx);
        }
        if let Some(withdrawal) = changeset.withdrawal {
            if let Some(&idx) = state.withdrawal_index.get(&withdrawal.id) {
                state.withdrawals[idx] = withdrawal;
            } else {
                let idx = state.withdrawals.len();
                state.withdrawal_index.insert(withdrawal.id, idx);
                state.withdrawals.push(withdrawal);
            }
        }
        Ok(())
    }

    async fn list_transactions(
        &self,
        entity_id: EntityId,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        let state = self.state.read().await;
        let matching: Vec<LedgerTransaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.entity_id == entity_id && tx.matches(filter))
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn ledger_snapshot(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<LedgerSnapshot>, LedgerError> {
        let state = self.state.read().await;
        let Some(balance) = state.balances.get(&entity_id).cloned() else {
            return Ok(None);
        };
        let transactions = state
            .transactions
            .iter()
            .filter(|tx| tx.entity_id == entity_id)
            .cloned()
            .collect();
        let pending_withdrawals = state
            .withdrawals
            .iter()
            .filter(|w| w.entity_id == entity_id && w.status == WithdrawalStatus::Pending)
            .cloned()
            .collect();
        Ok(Some(LedgerSnapshot {
            balance,
            transactions,
            pending_withdrawals,
        }))
    }

    async fn list_commissions(
        &self,
        entity_id: EntityId,
        period: &DateRange,
        page: PageRequest,
    ) -> Result<PageResponse<Commission>, LedgerError> {
        let state = self.state.read().await;
        let matching: Vec<Commission> = state
            .commissions
            .iter()
            .rev()
            .filter(|c| c.entity_id == entity_id && period.contains(c.created_at))
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn commission_totals(
        &self,
        entity_id: EntityId,
        period: &DateRange,
    ) -> Result<CommissionTotals, LedgerError> {
        let state = self.state.read().await;
        state
            .commissions
            .iter()
            .filter(|c| c.entity_id == entity_id && period.contains(c.created_at))
            .try_fold(CommissionTotals::default(), CommissionTotals::add)
            .map_err(LedgerError::from)
    }

    async fn list_withdrawals(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, LedgerError> {
        let state = self.state.read().await;
        let matching: Vec<WithdrawalRequest> = state
            .withdrawals
            .iter()
            .rev()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        Ok(paginate(&matching, page))
    }

    async fn set_commission_rate(
        &self,
        entity_id: EntityId,
        rate: Option<Rate>,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if !state.balances.contains_key(&entity_id) {
            return Err(LedgerError::EntityNotFound(entity_id));
        }
        match rate {
            Some(rate) => state.rates.insert(entity_id, rate),
            None => state.rates.remove(&entity_id),
        };
        Ok(())
    }

    async fn commission_rate(&self, entity_id: EntityId) -> Result<Option<Rate>, LedgerError> {
        Ok(self.state.read().await.rates.get(&entity_id).copied())
    }
}
