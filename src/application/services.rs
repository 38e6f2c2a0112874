//! Application services: event ingestion and transport-level queries

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::ledger::{ApplyOutcome, PoolLedger};
use crate::shared::errors::QueryError;
use crate::shared::types::{
    ContractEvent, LiquidityPosition, Pool, QueryConfig, TransactionRecord, TransactionType,
};

/// Counters reported after an ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub applied: usize,
    pub ignored: usize,
    pub rejected: usize,
}

/// Single writer feeding finalized events into the ledger, in delivery order
pub struct IngestionService {
    ledger: Arc<PoolLedger>,
    stats: IngestStats,
}

impl IngestionService {
    pub fn new(ledger: Arc<PoolLedger>) -> Self {
        Self {
            ledger,
            stats: IngestStats::default(),
        }
    }

    pub fn stats(&self) -> IngestStats {
        self.stats
    }

    /// Apply one event. A rejected event is logged and dropped; it never
    /// stops the stream.
    pub fn ingest(&mut self, event: &ContractEvent) {
        match self.ledger.apply_event(event) {
            Ok(ApplyOutcome::Applied(tx_type)) => {
                debug!(tx_id = %event.tx_id, %tx_type, "event applied");
                self.stats.applied += 1;
            }
            Ok(ApplyOutcome::Ignored) => self.stats.ignored += 1,
            Err(e) => {
                warn!(
                    tx_id = %event.tx_id,
                    method = %event.method,
                    block_height = event.block_height,
                    error = %e,
                    "rejected event"
                );
                self.stats.rejected += 1;
            }
        }
    }

    /// Replay a recorded event log
    pub fn replay(&mut self, events: &[ContractEvent]) -> IngestStats {
        for event in events {
            self.ingest(event);
        }
        self.log_summary();
        self.stats
    }

    /// Consume events until every sender is dropped
    pub async fn run(mut self, mut receiver: mpsc::Receiver<ContractEvent>) -> IngestStats {
        while let Some(event) = receiver.recv().await {
            self.ingest(&event);
        }
        self.log_summary();
        self.stats
    }

    fn log_summary(&self) {
        info!(
            contract = %self.ledger.router_contract(),
            applied = self.stats.applied,
            ignored = self.stats.ignored,
            rejected = self.stats.rejected,
            retained = self.ledger.transaction_count(),
            "ingestion finished"
        );
    }
}

/// Read-side facade used by the CLI; owns the limit policy for paged queries
pub struct QueryService {
    ledger: Arc<PoolLedger>,
    limits: QueryConfig,
}

impl QueryService {
    pub fn new(ledger: Arc<PoolLedger>, limits: QueryConfig) -> Self {
        Self { ledger, limits }
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.ledger.query_pools()
    }

    pub fn pool(&self, pool_id: &str) -> Result<Pool, QueryError> {
        self.ledger.get_pool(pool_id).ok_or_else(|| QueryError::NotFound {
            kind: "pool",
            id: pool_id.to_string(),
        })
    }

    pub fn positions(&self, pool_id: &str) -> Vec<LiquidityPosition> {
        self.ledger.query_positions(pool_id)
    }

    pub fn rich_list(
        &self,
        pool_id: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> Vec<LiquidityPosition> {
        let limit = resolve_limit(
            limit,
            self.limits.rich_list_default_limit,
            self.limits.rich_list_max_limit,
        );
        self.ledger.query_rich_list(pool_id, offset.unwrap_or(0), limit)
    }

    pub fn transactions(
        &self,
        pool_id: Option<&str>,
        tx_type: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionRecord>, QueryError> {
        let tx_type = tx_type.map(str::parse::<TransactionType>).transpose()?;
        let limit = resolve_limit(
            limit,
            self.limits.transactions_default_limit,
            self.limits.transactions_max_limit,
        );
        Ok(self.ledger.query_transactions(pool_id, tx_type, limit))
    }

    pub fn transaction(&self, tx_id: &str) -> Result<TransactionRecord, QueryError> {
        self.ledger.get_transaction(tx_id).ok_or_else(|| QueryError::NotFound {
            kind: "transaction",
            id: tx_id.to_string(),
        })
    }
}

/// Requested limits outside `1..=max` fall back to the default
fn resolve_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    match requested {
        Some(limit) if (1..=max).contains(&limit) => limit,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(method: &str, args: serde_json::Value, tx_id: &str) -> ContractEvent {
        ContractEvent::new("dex-router", method, args, 1, tx_id)
    }

    fn seeded() -> Arc<PoolLedger> {
        let ledger = Arc::new(PoolLedger::default());
        let mut ingest = IngestionService::new(Arc::clone(&ledger));
        ingest.replay(&[
            event("pool_created", json!({"pool_id": "p1", "asset0": "HBD", "asset1": "HIVE", "fee_bps": 8}), "t1"),
            event("liquidity_added", json!({"pool_id": "p1", "user": "alice", "amount0": 100, "amount1": 200, "lp_tokens": 50}), "t2"),
            event("liquidity_added", json!({"pool_id": "p1", "user": "bob", "amount0": 100, "amount1": 200, "lp_tokens": 70}), "t3"),
            event("swap_executed", json!({"pool_id": "p1", "user": "carol", "asset_in": "HBD", "asset_out": "HIVE", "amount_in": 10, "amount_out": 18}), "t4"),
        ]);
        ledger
    }

    #[test]
    fn test_replay_counts_outcomes() {
        let ledger = Arc::new(PoolLedger::default());
        let mut ingest = IngestionService::new(Arc::clone(&ledger));
        let stats = ingest.replay(&[
            event("pool_created", json!({"pool_id": "p1", "asset0": "HBD", "asset1": "HIVE"}), "t1"),
            event("pool_created", json!({"pool_id": "p1", "asset0": "HBD", "asset1": "HIVE"}), "t2"),
            event("liquidity_added", json!({"pool_id": 7}), "t3"),
            event("vote_cast", json!({}), "t4"),
            ContractEvent::new("other-contract", "pool_created", json!({}), 1, "t5"),
            event("liquidity_added", json!({"pool_id": "p1", "user": "alice", "amount0": 1, "amount1": 1, "lp_tokens": 1}), "t6"),
        ]);

        assert_eq!(stats, IngestStats { applied: 2, ignored: 2, rejected: 2 });
        assert_eq!(ingest.stats(), stats);
        assert_eq!(ledger.transaction_count(), 2);
        assert_eq!(ledger.get_pool("p1").unwrap().total_supply, 1);
    }

    #[tokio::test]
    async fn test_run_drains_channel_in_order() {
        let ledger = Arc::new(PoolLedger::default());
        let (tx, rx) = mpsc::channel(4);
        let worker = tokio::spawn(IngestionService::new(Arc::clone(&ledger)).run(rx));

        tx.send(event("pool_created", json!({"pool_id": "p1", "asset0": "HBD", "asset1": "HIVE"}), "t1"))
            .await
            .unwrap();
        tx.send(event("liquidity_added", json!({"pool_id": "p1", "user": "alice", "amount0": 10, "amount1": 10, "lp_tokens": 10}), "t2"))
            .await
            .unwrap();
        drop(tx);

        let stats = worker.await.unwrap();
        assert_eq!(stats.applied, 2);
        assert_eq!(ledger.get_pool("p1").unwrap().reserve0, 10);
    }

    #[test]
    fn test_rich_list_limit_policy() {
        let queries = QueryService::new(seeded(), QueryConfig::default());

        let all = queries.rich_list("p1", None, None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user, "bob");

        assert_eq!(queries.rich_list("p1", None, Some(1)).len(), 1);
        // out of range falls back to the default
        assert_eq!(queries.rich_list("p1", None, Some(0)).len(), 2);
        assert_eq!(queries.rich_list("p1", None, Some(101)).len(), 2);
        assert_eq!(queries.rich_list("p1", Some(1), None)[0].user, "alice");
        assert!(queries.rich_list("p1", Some(5), None).is_empty());
        assert!(queries.rich_list("nope", None, None).is_empty());
    }

    #[test]
    fn test_transactions_filters() {
        let queries = QueryService::new(seeded(), QueryConfig::default());

        let all = queries.transactions(None, None, None).unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].id, "t4");

        let deposits = queries.transactions(Some("p1"), Some("deposit"), None).unwrap();
        assert_eq!(deposits.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["t3", "t2"]);

        assert_eq!(queries.transactions(None, None, Some(2)).unwrap().len(), 2);
        assert_eq!(queries.transactions(None, None, Some(5000)).unwrap().len(), 4);
        assert!(queries.transactions(Some("p2"), None, None).unwrap().is_empty());

        assert!(matches!(
            queries.transactions(None, Some("mint"), None),
            Err(QueryError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_absence_is_not_found() {
        let queries = QueryService::new(seeded(), QueryConfig::default());

        assert_eq!(queries.pool("p1").unwrap().reserve0, 210);
        assert_eq!(queries.transaction("t2").unwrap().user.as_deref(), Some("alice"));
        assert_eq!(
            queries.pool("p2").unwrap_err(),
            QueryError::NotFound { kind: "pool", id: "p2".to_string() }
        );
        assert!(matches!(queries.transaction("t9"), Err(QueryError::NotFound { .. })));
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, 50, 100), 50);
        assert_eq!(resolve_limit(Some(100), 50, 100), 100);
        assert_eq!(resolve_limit(Some(0), 50, 100), 50);
        assert_eq!(resolve_limit(Some(101), 50, 100), 50);
    }
}
