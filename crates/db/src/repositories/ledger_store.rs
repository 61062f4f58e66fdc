//! PostgreSQL implementation of `LedgerStore`.
//!
//! Each `commit` runs in one database transaction: the balance row is locked
//! with `SELECT ... FOR UPDATE`, its version checked against the changeset,
//! and every row of the changeset written before the transaction commits.
//! Dropping the transaction on any error rolls everything back.

use async_trait::async_trait;
use chrono::Utc;
use fleetpay_core::commission::types::{Commission, CommissionTotals};
use fleetpay_core::ledger::{Balance, DateRange, LedgerError, LedgerTransaction, TransactionFilter};
use fleetpay_core::settlement::{Changeset, LedgerSnapshot, LedgerStore};
use fleetpay_core::withdrawal::types::{WithdrawalFilter, WithdrawalRequest, WithdrawalStatus};
use fleetpay_shared::types::{EntityId, PageRequest, PageResponse, Rate, WithdrawalId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    SqlErr, TransactionTrait,
};
use tracing::{debug, warn};

use super::mapping::{
    balance_active_model, balance_from_model, commission_active_model, commission_from_model,
    rate, transaction_active_model, transaction_from_model, withdrawal_active_model,
    withdrawal_from_model,
};
use crate::entities::sea_orm_active_enums as db;
use crate::entities::{
    balances, commission_rate_overrides, commissions, ledger_transactions, withdrawal_requests,
};

/// Maps a database error onto the ledger taxonomy.
///
/// Unique violations mean another writer got there first and are retryable.
fn storage(err: DbErr) -> LedgerError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => LedgerError::ConcurrencyConflict(detail),
        _ => LedgerError::Storage(err.to_string()),
    }
}

/// Restricts `query` to rows whose `column` falls in `period`.
fn within<E, C>(query: Select<E>, column: C, period: &DateRange) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let query = match period.from {
        Some(from) => query.filter(column.gte(from)),
        None => query,
    };
    match period.to {
        Some(to) => query.filter(column.lte(to)),
        None => query,
    }
}

/// `LedgerStore` backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an open connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Locks the entity's balance row for the rest of `txn`.
    async fn lock_balance(
        txn: &DatabaseTransaction,
        entity_id: EntityId,
    ) -> Result<balances::Model, LedgerError> {
        balances::Entity::find_by_id(entity_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(storage)?
            .ok_or(LedgerError::EntityNotFound(entity_id))
    }

    async fn write_withdrawal(
        txn: &DatabaseTransaction,
        request: &WithdrawalRequest,
    ) -> Result<(), LedgerError> {
        let existing = withdrawal_requests::Entity::find_by_id(request.id.into_inner())
            .one(txn)
            .await
            .map_err(storage)?;
        let active = withdrawal_active_model(request);
        if existing.is_some() {
            active.update(txn).await.map_err(storage)?;
        } else {
            active.insert(txn).await.map_err(storage)?;
        }
        Ok(())
    }

    async fn page_of<E, T, F>(
        &self,
        query: Select<E>,
        page: PageRequest,
        convert: F,
    ) -> Result<PageResponse<T>, LedgerError>
    where
        E: EntityTrait,
        E::Model: Sync,
        F: Fn(E::Model) -> Result<T, LedgerError>,
    {
        let total = query.clone().count(&self.db).await.map_err(storage)?;
        let rows = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(storage)?;
        let data = rows.into_iter().map(convert).collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn create_balance(&self, balance: &Balance) -> Result<(), LedgerError> {
        match balance_active_model(balance).insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(LedgerError::EntityAlreadyExists(balance.entity_id))
            }
            Err(err) => Err(storage(err)),
        }
    }

    async fn load_balance(&self, entity_id: EntityId) -> Result<Option<Balance>, LedgerError> {
        balances::Entity::find_by_id(entity_id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(balance_from_model)
            .transpose()
    }

    async fn find_commission(
        &self,
        entity_id: EntityId,
        order_id: &str,
    ) -> Result<Option<Commission>, LedgerError> {
        commissions::Entity::find()
            .filter(commissions::Column::EntityId.eq(entity_id.into_inner()))
            .filter(commissions::Column::OrderId.eq(order_id))
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(commission_from_model)
            .transpose()
    }

    async fn find_withdrawal(
        &self,
        id: WithdrawalId,
    ) -> Result<Option<WithdrawalRequest>, LedgerError> {
        withdrawal_requests::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(withdrawal_from_model)
            .transpose()
    }

    async fn commit(&self, changeset: Changeset) -> Result<(), LedgerError> {
        let entity_id = changeset.balance.entity_id;
        let txn = self.db.begin().await.map_err(storage)?;

        let current = Self::lock_balance(&txn, entity_id).await?;
        if current.version != changeset.expected_version
            || changeset.balance.version != changeset.expected_version + 1
        {
            warn!(
                entity_id = %entity_id,
                stored = current.version,
                expected = changeset.expected_version,
                "Stale balance version"
            );
            return Err(LedgerError::ConcurrencyConflict(format!(
                "balance of {entity_id} is at version {}, expected {}",
                current.version, changeset.expected_version
            )));
        }

        balance_active_model(&changeset.balance)
            .update(&txn)
            .await
            .map_err(storage)?;
        if let Some(transaction) = &changeset.transaction {
            transaction_active_model(transaction)
                .insert(&txn)
                .await
                .map_err(storage)?;
        }
        if let Some(commission) = &changeset.commission {
            commission_active_model(commission)
                .insert(&txn)
                .await
                .map_err(storage)?;
        }
        if let Some(request) = &changeset.withdrawal {
            Self::write_withdrawal(&txn, request).await?;
        }

        txn.commit().await.map_err(storage)?;
        debug!(entity_id = %entity_id, version = changeset.balance.version, "Committed changeset");
        Ok(())
    }

    async fn list_transactions(
        &self,
        entity_id: EntityId,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<LedgerTransaction>, LedgerError> {
        let mut query = ledger_transactions::Entity::find()
            .filter(ledger_transactions::Column::EntityId.eq(entity_id.into_inner()));
        if let Some(kind) = filter.transaction_type {
            query = query.filter(
                ledger_transactions::Column::TransactionType.eq(db::TransactionType::from(kind)),
            );
        }
        let query = within(query, ledger_transactions::Column::CreatedAt, &filter.period)
            .order_by_desc(ledger_transactions::Column::Sequence);
        self.page_of(query, page, transaction_from_model).await
    }

    async fn ledger_snapshot(
        &self,
        entity_id: EntityId,
    ) -> Result<Option<LedgerSnapshot>, LedgerError> {
        // One REPEATABLE READ transaction: every query sees the same snapshot.
        let txn = self
            .db
            .begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
            .await
            .map_err(storage)?;

        let Some(balance) = balances::Entity::find_by_id(entity_id.into_inner())
            .one(&txn)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };

        let transactions = ledger_transactions::Entity::find()
            .filter(ledger_transactions::Column::EntityId.eq(entity_id.into_inner()))
            .order_by_asc(ledger_transactions::Column::Sequence)
            .all(&txn)
            .await
            .map_err(storage)?
            .into_iter()
            .map(transaction_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        let pending_withdrawals = withdrawal_requests::Entity::find()
            .filter(withdrawal_requests::Column::EntityId.eq(entity_id.into_inner()))
            .filter(
                withdrawal_requests::Column::Status
                    .eq(db::WithdrawalStatus::from(WithdrawalStatus::Pending)),
            )
            .order_by_asc(withdrawal_requests::Column::RequestedAt)
            .all(&txn)
            .await
            .map_err(storage)?
            .into_iter()
            .map(withdrawal_from_model)
            .collect::<Result<Vec<_>, _>>()?;

        txn.commit().await.map_err(storage)?;
        Ok(Some(LedgerSnapshot {
            balance: balance_from_model(balance)?,
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
        let query = commissions::Entity::find()
            .filter(commissions::Column::EntityId.eq(entity_id.into_inner()));
        let query = within(query, commissions::Column::CreatedAt, period)
            .order_by_desc(commissions::Column::CreatedAt)
            .order_by_desc(commissions::Column::Id);
        self.page_of(query, page, commission_from_model).await
    }

    async fn commission_totals(
        &self,
        entity_id: EntityId,
        period: &DateRange,
    ) -> Result<CommissionTotals, LedgerError> {
        let query = commissions::Entity::find()
            .filter(commissions::Column::EntityId.eq(entity_id.into_inner()));
        within(query, commissions::Column::CreatedAt, period)
            .all(&self.db)
            .await
            .map_err(storage)?
            .into_iter()
            .map(commission_from_model)
            .try_fold(CommissionTotals::default(), |totals, commission| {
                commission.and_then(|c| totals.add(&c).map_err(LedgerError::from))
            })
    }

    async fn list_withdrawals(
        &self,
        filter: &WithdrawalFilter,
        page: PageRequest,
    ) -> Result<PageResponse<WithdrawalRequest>, LedgerError> {
        let mut query = withdrawal_requests::Entity::find();
        if let Some(entity_id) = filter.entity_id {
            query = query.filter(withdrawal_requests::Column::EntityId.eq(entity_id.into_inner()));
        }
        if let Some(status) = filter.status {
            query = query.filter(withdrawal_requests::Column::Status.eq(db::WithdrawalStatus::from(status)));
        }
        let query = query
            .order_by_desc(withdrawal_requests::Column::RequestedAt)
            .order_by_desc(withdrawal_requests::Column::Id);
        self.page_of(query, page, withdrawal_from_model).await
    }

    async fn set_commission_rate(
        &self,
        entity_id: EntityId,
        rate: Option<Rate>,
    ) -> Result<(), LedgerError> {
        if self.load_balance(entity_id).await?.is_none() {
            return Err(LedgerError::EntityNotFound(entity_id));
        }

        match rate {
            Some(rate) => {
                let row = commission_rate_overrides::ActiveModel {
                    entity_id: Set(entity_id.into_inner()),
                    rate: Set(rate.value()),
                    updated_at: Set(Utc::now().into()),
                };
                commission_rate_overrides::Entity::insert(row)
                    .on_conflict(
                        OnConflict::column(commission_rate_overrides::Column::EntityId)
                            .update_columns([
                                commission_rate_overrides::Column::Rate,
                                commission_rate_overrides::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec(&self.db)
                    .await
                    .map_err(storage)?;
            }
            None => {
                commission_rate_overrides::Entity::delete_by_id(entity_id.into_inner())
                    .exec(&self.db)
                    .await
                    .map_err(storage)?;
            }
        }
        Ok(())
    }

    async fn commission_rate(&self, entity_id: EntityId) -> Result<Option<Rate>, LedgerError> {
        commission_rate_overrides::Entity::find_by_id(entity_id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?
            .map(|row| rate(row.rate))
            .transpose()
    }
}
