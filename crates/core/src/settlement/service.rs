//! The earnings ledger facade.
//!
//! Every mutating operation runs as one unit of work under the entity's lock:
//! read the balance, compute the outcome with the pure ledger, commission and
//! withdrawal logic, then commit a single `Changeset`. Reads go straight to
//! the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleetpay_shared::LedgerConfig;
use fleetpay_shared::types::{
    Amount, EntityId, PageRequest, PageResponse, Rate, UserId, WithdrawalId,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};

use crate::commission::engine::{CommissionEngine, CommissionRates, ValidatedOrder};
use crate::commission::types::{Commission, CommissionOutcome, CommissionTotals, OrderDelivered};
use crate::ledger::balance::Balance;
use crate::ledger::error::LedgerError;
use crate::ledger::reconcile::{ReconciliationReport, reconcile};
use crate::ledger::transaction::{LedgerTransaction, MAX_DESCRIPTION_LEN, MAX_REFERENCE_LEN};
use crate::ledger::types::{BalanceEffect, DateRange, EntityKind, TransactionFilter, TransactionType};
use crate::settlement::coordinator::SettlementCoordinator;
use crate::settlement::store::{Changeset, LedgerStore};
use crate::withdrawal::service::WithdrawalService;
use crate::withdrawal::types::{
    NewWithdrawal, WithdrawalAction, WithdrawalFilter, WithdrawalRequest,
};

/// A manual credit or debit posted by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualPosting {
    /// Transaction type; must match the direction of the operation.
    pub transaction_type: TransactionType,
    /// Positive amount.
    pub amount: Decimal,
    /// Human-readable description.
    pub description: String,
    /// Optional external reference.
    pub reference_id: Option<String>,
}

/// Result of a posting: the new balance and the transaction written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Posting {
    /// Balance after the posting.
    pub balance: Balance,
    /// The transaction appended to the log.
    pub transaction: LedgerTransaction,
}

/// Commission earnings of an entity over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarningsSummary {
    /// The entity.
    pub entity_id: EntityId,
    /// Window start, if bounded.
    pub from: Option<DateTime<Utc>>,
    /// Window end, if bounded.
    pub to: Option<DateTime<Utc>>,
    /// Number of commissions in the window.
    pub commission_count: u64,
    /// Sum of order totals.
    pub order_total: Amount,
    /// Sum of credited amounts.
    pub credited_total: Amount,
    /// Average credit per order, rounded half-up to the cent.
    pub average_credit: Amount,
    /// Current balance.
    pub balance: Balance,
}

/// Entry point for every ledger operation.
pub struct EarningsLedger {
    store: Arc<dyn LedgerStore>,
    coordinator: SettlementCoordinator,
    rates: CommissionRates,
}

impl EarningsLedger {
    /// Creates a ledger over `store` with explicit coordinator and rates.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        coordinator: SettlementCoordinator,
        rates: CommissionRates,
    ) -> Self {
        Self {
            store,
            coordinator,
            rates,
        }
    }

    /// Creates a ledger configured from `config`.
    pub fn from_config(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Result<Self, LedgerError> {
        Ok(Self::new(
            store,
            SettlementCoordinator::from_config(config),
            CommissionRates::from_config(config)?,
        ))
    }

    // ========== Accounts ==========

    /// Opens a zeroed ledger for a newly onboarded entity.
    #[instrument(skip(self))]
    pub async fn open_account(
        &self,
        entity_id: EntityId,
        kind: EntityKind,
    ) -> Result<Balance, LedgerError> {
        let balance = Balance::open(entity_id, kind, Utc::now());
        self.store.create_balance(&balance).await?;
        info!(entity_id = %entity_id, kind = %kind, "Opened ledger");
        Ok(balance)
    }

    /// Current balance snapshot.
    pub async fn balance(&self, entity_id: EntityId) -> Result<Balance, LedgerError> {
        self.store
            .load_balance(entity_id)
            .await?
            .ok_or(LedgerError::EntityNotFound(entity_id))
    }

    // ========== Manual postings ==========

    /// Credits the entity (manual_add, bonus or refund).
    ///
    /// Commissions are only credited through `apply_commission`.
    #[instrument(skip(self, posting), fields(kind = %posting.transaction_type))]
    pub async fn credit(
        &self,
        entity_id: EntityId,
        posting: ManualPosting,
    ) -> Result<Posting, LedgerError> {
        if posting.transaction_type == TransactionType::Commission
            || posting.transaction_type.effect() != BalanceEffect::Credit
        {
            return Err(LedgerError::InvalidInput(format!(
                "{} cannot be posted as a manual credit",
                posting.transaction_type
            )));
        }
        self.post(entity_id, posting).await
    }

    /// Debits the entity (deduction or adjustment).
    #[instrument(skip(self, posting), fields(kind = %posting.transaction_type))]
    pub async fn debit(
        &self,
        entity_id: EntityId,
        posting: ManualPosting,
    ) -> Result<Posting, LedgerError> {
        if posting.transaction_type.effect() != BalanceEffect::Debit {
            return Err(LedgerError::InvalidInput(format!(
                "{} cannot be posted as a manual debit",
                posting.transaction_type
            )));
        }
        self.post(entity_id, posting).await
    }

    async fn post(&self, entity_id: EntityId, posting: ManualPosting) -> Result<Posting, LedgerError> {
        let amount = positive_amount(posting.amount)?;
        let description = posting.description.trim();
        if description.is_empty() {
            return Err(LedgerError::InvalidInput("Description is required".to_string()));
        }
        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(LedgerError::InvalidInput(format!(
                "Description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        if posting
            .reference_id
            .as_ref()
            .is_some_and(|reference| reference.len() > MAX_REFERENCE_LEN)
        {
            return Err(LedgerError::InvalidInput(format!(
                "Reference id exceeds {MAX_REFERENCE_LEN} characters"
            )));
        }

        self.coordinator
            .with_entity_lock(entity_id, || {
                self.post_unit(entity_id, &posting, amount, description)
            })
            .await
    }

    async fn post_unit(
        &self,
        entity_id: EntityId,
        posting: &ManualPosting,
        amount: Amount,
        description: &str,
    ) -> Result<Posting, LedgerError> {
        let before = self.balance(entity_id).await?;
        let after = match posting.transaction_type.effect() {
            BalanceEffect::Credit => before.credit(amount)?,
            BalanceEffect::Debit | BalanceEffect::Settlement => before.debit(amount)?,
        }
        .next_version(Utc::now());
        let transaction = LedgerTransaction::record(
            &after,
            posting.transaction_type,
            amount,
            description,
            posting.reference_id.clone(),
        )?;

        self.store
            .commit(Changeset::new(&before, after.clone()).with_transaction(transaction.clone()))
            .await?;
        info!(
            entity_id = %entity_id,
            kind = %posting.transaction_type,
            amount = %amount,
            "Posted manual transaction"
        );
        Ok(Posting {
            balance: after,
            transaction,
        })
    }

    // ========== Commissions ==========

    /// Applies the commission for a delivered order, at most once per
    /// `(entity_id, order_id)`.
    ///
    /// A replayed event returns `CommissionOutcome::AlreadyProcessed` with the
    /// original record and leaves the ledger untouched.
    #[instrument(skip(self, event), fields(entity_id = %event.entity_id, order_id = %event.order_id))]
    pub async fn apply_commission(
        &self,
        event: OrderDelivered,
    ) -> Result<CommissionOutcome, LedgerError> {
        let order = CommissionEngine::validate(&event)?;
        let entity_id = event.entity_id;

        self.coordinator
            .with_entity_lock(entity_id, || self.commission_unit(entity_id, &order))
            .await
    }

    async fn commission_unit(
        &self,
        entity_id: EntityId,
        order: &ValidatedOrder,
    ) -> Result<CommissionOutcome, LedgerError> {
        let before = self.balance(entity_id).await?;
        if let Some(existing) = self.store.find_commission(entity_id, &order.order_id).await? {
            info!(entity_id = %entity_id, order_id = %order.order_id, "Commission already processed");
            return Ok(CommissionOutcome::AlreadyProcessed(existing));
        }

        let entity_override = self.store.commission_rate(entity_id).await?;
        let rate = self
            .rates
            .resolve(before.kind, entity_override, order.commission_rate);
        let now = Utc::now();
        let commission = CommissionEngine::compute(entity_id, before.kind, order, rate, now)?;

        let after = before.credit(commission.credited_amount)?.next_version(now);
        let transaction = LedgerTransaction::record(
            &after,
            TransactionType::Commission,
            commission.credited_amount,
            format!("Commission for order {}", order.order_id),
            Some(order.order_id.clone()),
        )?;

        self.store
            .commit(
                Changeset::new(&before, after)
                    .with_transaction(transaction)
                    .with_commission(commission.clone()),
            )
            .await?;
        info!(
            entity_id = %entity_id,
            order_id = %order.order_id,
            rate = %rate,
            credited = %commission.credited_amount,
            "Commission applied"
        );
        Ok(CommissionOutcome::Applied(commission))
    }

    /// Sets or clears an entity's commission rate override, returning the
    /// rate now in effect.
    #[instrument(skip(self))]
    pub async fn set_commission_rate(
        &self,
        entity_id: EntityId,
        rate: Option<Decimal>,
    ) -> Result<Rate, LedgerError> {
        let rate = rate.map(Rate::new).transpose()?;
        let balance = self.balance(entity_id).await?;
        self.store.set_commission_rate(entity_id, rate).await?;
        info!(entity_id = %entity_id, "Commission rate updated");
        Ok(self.rates.resolve(balance.kind, rate, None))
    }

    /// Rate applied to the entity's next commission when the event carries none.
    pub async fn commission_rate(&self, entity_id: EntityId) -> Result<Rate, LedgerError> {
        let balance = self.balance(entity_id).await?;
        let entity_override = self.store.commission_rate(entity_id).await?;
        Ok(self.rates.resolve(balance.kind, entity_override, None))
    }

    // ========== Withdrawals ==========

    /// Opens a pending withdrawal request, reserving `amount`.
    #[instrument(skip(self, new))]
    pub async fn create_withdrawal(
        &self,
        entity_id: EntityId,
        amount: Decimal,
        new: NewWithdrawal,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let amount = Amount::new(amount)?;
        self.coordinator
            .with_entity_lock(entity_id, || {
                self.open_withdrawal(entity_id, Some(amount), &new)
            })
            .await
    }

    /// Withdraws the whole available balance.
    ///
    /// The balance is read inside the entity's lock, so the amount reserved is
    /// the available balance at commit time, never a stale one.
    #[instrument(skip(self, new))]
    pub async fn withdraw_full(
        &self,
        entity_id: EntityId,
        new: NewWithdrawal,
    ) -> Result<WithdrawalRequest, LedgerError> {
        self.coordinator
            .with_entity_lock(entity_id, || self.open_withdrawal(entity_id, None, &new))
            .await
    }

    /// Reserves `amount`, or the whole available balance when `None`.
    async fn open_withdrawal(
        &self,
        entity_id: EntityId,
        amount: Option<Amount>,
        new: &NewWithdrawal,
    ) -> Result<WithdrawalRequest, LedgerError> {
        let before = self.balance(entity_id).await?;
        let amount = match amount {
            Some(amount) => amount,
            None if before.available_balance.is_zero() => {
                return Err(LedgerError::InvalidAmount(
                    "No available balance to withdraw".to_string(),
                ));
            }
            None => before.available_balance,
        };

        let now = Utc::now();
        let (request, reserved) = WithdrawalService::open(&before, amount, new.clone(), now)?;
        let after = reserved.next_version(now);
        self.store
            .commit(Changeset::new(&before, after).with_withdrawal(request.clone()))
            .await?;
        info!(
            entity_id = %request.entity_id,
            withdrawal_id = %request.id,
            amount = %request.amount,
            "Withdrawal requested"
        );
        Ok(request)
    }

    /// Approves a pending request: settles the reservation and writes a
    /// `withdrawal` (driver) or `payout` (restaurant) transaction.
    #[instrument(skip(self))]
    pub async fn approve_withdrawal(
        &self,
        id: WithdrawalId,
        approved_by: UserId,
        admin_notes: Option<String>,
    ) -> Result<WithdrawalRequest, LedgerError> {
        self.transition(id, |request| {
            WithdrawalService::approve(request.status, approved_by, admin_notes.clone())
        })
        .await
    }

    /// Rejects a pending request, releasing the reservation. No transaction
    /// is written.
    #[instrument(skip(self))]
    pub async fn reject_withdrawal(
        &self,
        id: WithdrawalId,
        reason: String,
    ) -> Result<WithdrawalRequest, LedgerError> {
        self.transition(id, |request| {
            WithdrawalService::reject(request.status, reason.clone())
        })
        .await
    }

    /// Marks an approved request as paid out.
    #[instrument(skip(self))]
    pub async fn mark_processed(&self, id: WithdrawalId) -> Result<WithdrawalRequest, LedgerError> {
        self.transition(id, |request| WithdrawalService::mark_processed(request.status))
            .await
    }

    async fn transition<F>(
        &self,
        id: WithdrawalId,
        decide: F,
    ) -> Result<WithdrawalRequest, LedgerError>
    where
        F: Fn(&WithdrawalRequest) -> Result<WithdrawalAction, LedgerError>,
    {
        let entity_id = self.withdrawal(id).await?.entity_id;
        self.coordinator
            .with_entity_lock(entity_id, || self.transition_unit(id, &decide))
            .await
    }

    async fn transition_unit<F>(
        &self,
        id: WithdrawalId,
        decide: &F,
    ) -> Result<WithdrawalRequest, LedgerError>
    where
        F: Fn(&WithdrawalRequest) -> Result<WithdrawalAction, LedgerError>,
    {
        // Re-read under the lock; another unit may have moved it on.
        let request = self.withdrawal(id).await?;
        let action = decide(&request)?;
        let before = self.balance(request.entity_id).await?;
        let after = WithdrawalService::settle(&action, &before, request.amount)?
            .next_version(Utc::now());

        let transaction = if matches!(action, WithdrawalAction::Approve { .. }) {
            Some(LedgerTransaction::record(
                &after,
                TransactionType::settlement_for(request.entity_kind),
                request.amount,
                format!("Withdrawal {id} approved"),
                Some(id.to_string()),
            )?)
        } else {
            None
        };
        let from = request.status;
        let updated = action.apply(request);

        let mut changeset = Changeset::new(&before, after).with_withdrawal(updated.clone());
        changeset.transaction = transaction;
        self.store.commit(changeset).await?;
        info!(
            entity_id = %updated.entity_id,
            withdrawal_id = %id,
            from = %from,
            to = %updated.status,
            "Withdrawal transitioned"
        );
        Ok(updated)
    }

    /// Looks up a withdrawal request.
    pub async fn withdrawal(&self, id: WithdrawalId) -> Result<WithdrawalRequest, LedgerError> {
        self.store
            .find_withdrawal(id)
            .await?
            .ok_or(LedgerError::WithdrawalNotFound(id))
    }

    /// Lists withdrawal requests, newest first.
    pub async fn list_withdrawals(
        &self,
        filter: WithdrawalFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, LedgerError> {
        self.store.list_withdrawals(&filter, page).await
    }

    // ========== Reporting ==========

    /// Lists an entity's transactions, newest first.
    pub async fn list_transactions(
        &self,
        entity_id: EntityId,
        filter: TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        validate_period(&filter.period)?;
        self.balance(entity_id).await?;
        self.store.list_transactions(entity_id, &filter, page).await
    }

    /// Lists an entity's commissions, newest first.
    pub async fn list_commissions(
        &self,
        entity_id: EntityId,
        period: DateRange,
        page: PageRequest,
    ) -> Result<PageResponse<Commission>, LedgerError> {
        validate_period(&period)?;
        self.balance(entity_id).await?;
        self.store.list_commissions(entity_id, &period, page).await
    }

    /// Commission earnings over a window, with the current balance.
    pub async fn earnings_summary(
        &self,
        entity_id: EntityId,
        period: DateRange,
    ) -> Result<EarningsSummary, LedgerError> {
        validate_period(&period)?;
        let balance = self.balance(entity_id).await?;
        let totals: CommissionTotals = self.store.commission_totals(entity_id, &period).await?;

        Ok(EarningsSummary {
            entity_id,
            from: period.from,
            to: period.to,
            commission_count: totals.count,
            order_total: totals.order_total,
            credited_total: totals.credited_total,
            average_credit: average(totals.credited_total, totals.count),
            balance,
        })
    }

    /// Replays the entity's log and compares it with the stored balance.
    ///
    /// The balance, log and pending requests are read from one store snapshot.
    pub async fn reconcile(&self, entity_id: EntityId) -> Result<ReconciliationReport, LedgerError> {
        let snapshot = self
            .store
            .ledger_snapshot(entity_id)
            .await?
            .ok_or(LedgerError::EntityNotFound(entity_id))?;
        let pending = Amount::try_sum(
            snapshot
                .pending_withdrawals
                .iter()
                .map(|request| request.amount),
        )?;
        Ok(reconcile(&snapshot.balance, &snapshot.transactions, pending))
    }
}

fn positive_amount(value: Decimal) -> Result<Amount, LedgerError> {
    let amount = Amount::new(value)?;
    if amount.is_zero() {
        return Err(LedgerError::InvalidAmount(
            "Amount must be greater than zero".to_string(),
        ));
    }
    Ok(amount)
}

fn validate_period(period: &DateRange) -> Result<(), LedgerError> {
    if period.is_inverted() {
        return Err(LedgerError::InvalidInput(
            "Date range start must not be after its end".to_string(),
        ));
    }
    Ok(())
}

fn average(total: Amount, count: u64) -> Amount {
    if count == 0 {
        return Amount::ZERO;
    }
    let mean = total.value() / Decimal::from(count);
    Amount::new(mean.round_dp_with_strategy(
        fleetpay_shared::types::MINOR_UNIT_SCALE,
        rust_decimal::RoundingStrategy::MidpointAwayFromZero,
    ))
    .unwrap_or(Amount::ZERO)
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
