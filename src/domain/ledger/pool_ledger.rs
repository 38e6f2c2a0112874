//! In-memory pool ledger: the read-model built from DEX router events

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::VecDeque;
use tracing::debug;

use super::event_applier::{self, LedgerState};
use crate::shared::errors::LedgerError;
use crate::shared::types::{ContractEvent, LedgerConfig, LiquidityPosition, Pool, TransactionRecord, TransactionType};

/// Result of feeding one event to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(TransactionType),
    /// Event from another contract or an untracked router method
    Ignored,
}

struct Inner {
    state: LedgerState,
    transactions: VecDeque<TransactionRecord>,
}

/// Exclusive owner of pools, LP positions and transaction history.
///
/// A single read/write lock guards the whole aggregate set: event application
/// takes it exclusively, queries share it. Every returned collection is a copy.
pub struct PoolLedger {
    router_contract: String,
    history_capacity: usize,
    inner: RwLock<Inner>,
}

impl PoolLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            router_contract: config.router_contract.clone(),
            history_capacity: config.history_capacity.max(1),
            inner: RwLock::new(Inner {
                state: LedgerState::default(),
                transactions: VecDeque::with_capacity(config.history_capacity.max(1)),
            }),
        }
    }

    pub fn router_contract(&self) -> &str {
        &self.router_contract
    }

    /// Apply one contract event. Only events from the router contract are
    /// considered; a failed event leaves the ledger untouched.
    pub fn apply_event(&self, event: &ContractEvent) -> Result<ApplyOutcome, LedgerError> {
        if event.contract != self.router_contract {
            debug!(contract = %event.contract, tx_id = %event.tx_id, "ignoring event from unrelated contract");
            return Ok(ApplyOutcome::Ignored);
        }

        let timestamp = event.timestamp.unwrap_or_else(Utc::now);

        let mut inner = self.inner.write();
        let record = match event_applier::apply_event(&mut inner.state, event, timestamp)? {
            Some(record) => record,
            None => return Ok(ApplyOutcome::Ignored),
        };

        let tx_type = record.tx_type;
        inner.transactions.push_back(record);
        while inner.transactions.len() > self.history_capacity {
            inner.transactions.pop_front();
        }

        Ok(ApplyOutcome::Applied(tx_type))
    }

    /// All pools, ordered by id
    pub fn query_pools(&self) -> Vec<Pool> {
        let inner = self.inner.read();
        let mut pools: Vec<Pool> = inner.state.pools.values().cloned().collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        pools
    }

    pub fn get_pool(&self, pool_id: &str) -> Option<Pool> {
        self.inner.read().state.pools.get(pool_id).cloned()
    }

    /// Pools trading `asset` on either side, ordered by id
    pub fn pools_by_asset(&self, asset: &str) -> Vec<Pool> {
        let inner = self.inner.read();
        let mut pools: Vec<Pool> = inner
            .state
            .pools
            .values()
            .filter(|pool| pool.contains(asset))
            .cloned()
            .collect();
        pools.sort_by(|a, b| a.id.cmp(&b.id));
        pools
    }

    /// Positions for a pool ordered by user; empty for unknown pools
    pub fn query_positions(&self, pool_id: &str) -> Vec<LiquidityPosition> {
        self.inner
            .read()
            .state
            .positions
            .get(pool_id)
            .map(|positions| positions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Largest holders first (ties by user ascending), sliced to `[offset, offset + limit)`
    pub fn query_rich_list(&self, pool_id: &str, offset: usize, limit: usize) -> Vec<LiquidityPosition> {
        let mut positions = self.query_positions(pool_id);
        // query_positions is already user-ordered, so a stable sort keeps user ascending on ties
        positions.sort_by(|a, b| b.amount.cmp(&a.amount));

        positions.into_iter().skip(offset).take(limit).collect()
    }

    /// Most recent first, filtered by pool and type when given
    pub fn query_transactions(
        &self,
        pool_id: Option<&str>,
        tx_type: Option<TransactionType>,
        limit: usize,
    ) -> Vec<TransactionRecord> {
        let inner = self.inner.read();
        inner
            .transactions
            .iter()
            .rev()
            .filter(|tx| pool_id.map_or(true, |id| tx.pool_id == id))
            .filter(|tx| tx_type.map_or(true, |t| tx.tx_type == t))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get_transaction(&self, tx_id: &str) -> Option<TransactionRecord> {
        let inner = self.inner.read();
        inner.transactions.iter().rev().find(|tx| tx.id == tx_id).cloned()
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.read().transactions.len()
    }
}

impl Default for PoolLedger {
    fn default() -> Self {
        Self::new(&LedgerConfig::default())
    }
}
