//! Per-entity serialization of ledger units of work.
//!
//! Each entity gets its own async mutex from a concurrent map, so units of
//! work on one entity run one at a time while other entities proceed in
//! parallel. A unit is bounded by a lock-acquisition timeout and an
//! execution timeout. Lock timeouts and store conflicts are retried with
//! exponential backoff before being surfaced; an execution timeout is not,
//! since the store may already have committed the unit. Locks of idle
//! entities are dropped from the map once released.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use fleetpay_shared::LedgerConfig;
use fleetpay_shared::types::EntityId;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::ledger::error::LedgerError;

/// Longest pause between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(2);

/// Bounded exponential backoff for retryable failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause before the first retry; doubled for each further retry.
    pub base_backoff: Duration,
}

impl RetryPolicy {
    /// Pause before retry number `attempt` (starting at 1).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let config = LedgerConfig::default();
        Self {
            max_retries: config.max_retries,
            base_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

/// Serializes units of work per entity.
#[derive(Debug)]
pub struct SettlementCoordinator {
    locks: DashMap<EntityId, Arc<Mutex<()>>>,
    lock_timeout: Duration,
    unit_timeout: Duration,
    retry: RetryPolicy,
}

impl SettlementCoordinator {
    /// Creates a coordinator with explicit limits.
    #[must_use]
    pub fn new(lock_timeout: Duration, unit_timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            locks: DashMap::new(),
            lock_timeout,
            unit_timeout,
            retry,
        }
    }

    /// Creates a coordinator from ledger configuration.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            Duration::from_millis(config.lock_timeout_ms),
            Duration::from_millis(config.unit_timeout_ms),
            RetryPolicy {
                max_retries: config.max_retries,
                base_backoff: Duration::from_millis(config.retry_backoff_ms),
            },
        )
    }

    /// Runs `unit` while holding the entity's lock.
    ///
    /// `unit` is called again for each retry, so it must re-read whatever it
    /// depends on. A unit that outlives the unit timeout is dropped and
    /// reported as `LedgerError::UnitTimeout` without a retry.
    pub async fn with_entity_lock<T, F, Fut>(
        &self,
        entity_id: EntityId,
        mut unit: F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0;
        loop {
            match self.run_once(entity_id, &mut unit).await {
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let pause = self.retry.backoff(attempt);
                    warn!(
                        entity_id = %entity_id,
                        attempt,
                        backoff_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying ledger unit of work"
                    );
                    sleep(pause).await;
                }
                result => return result,
            }
        }
    }

    async fn run_once<T, F, Fut>(&self, entity_id: EntityId, unit: &mut F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let result = self.run_locked(entity_id, self.lock_for(entity_id), unit).await;
        self.release(entity_id);
        result
    }

    async fn run_locked<T, F, Fut>(
        &self,
        entity_id: EntityId,
        lock: Arc<Mutex<()>>,
        unit: &mut F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let _guard = timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| LedgerError::LockTimeout(entity_id))?;
        debug!(entity_id = %entity_id, "Acquired ledger lock");

        timeout(self.unit_timeout, unit()).await.map_err(|_| {
            warn!(
                entity_id = %entity_id,
                timeout_ms = u64::try_from(self.unit_timeout.as_millis()).unwrap_or(u64::MAX),
                "Ledger unit of work timed out"
            );
            LedgerError::UnitTimeout(entity_id)
        })?
    }

    fn lock_for(&self, entity_id: EntityId) -> Arc<Mutex<()>> {
        self.locks.entry(entity_id).or_default().clone()
    }

    /// Drops the entity's lock if no other unit holds or awaits it.
    fn release(&self, entity_id: EntityId) {
        self.locks
            .remove_if(&entity_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    fn tracked_entities(&self) -> usize {
        self.locks.len()
    }
}

impl Default for SettlementCoordinator {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}
