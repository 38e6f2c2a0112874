use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::ledger::PoolLedger;
use crate::domain::routing::PoolQuerier;
use crate::shared::errors::QuerierError;
use crate::shared::types::Pool;

/// Pool querier backed by the in-process ledger
pub struct LedgerPoolQuerier {
    ledger: Arc<PoolLedger>,
}

impl LedgerPoolQuerier {
    pub fn new(ledger: Arc<PoolLedger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl PoolQuerier for LedgerPoolQuerier {
    async fn get_pool_by_id(&self, pool_id: &str) -> Result<Pool, QuerierError> {
        self.ledger
            .get_pool(pool_id)
            .ok_or_else(|| QuerierError::NotFound(pool_id.to_string()))
    }

    async fn get_pools_by_asset(&self, asset: &str) -> Result<Vec<Pool>, QuerierError> {
        Ok(self.ledger.pools_by_asset(asset))
    }
}
