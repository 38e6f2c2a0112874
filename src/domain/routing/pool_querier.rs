use async_trait::async_trait;

use crate::shared::errors::QuerierError;
use crate::shared::types::Pool;

/// Source of pool snapshots for route planning.
///
/// Implementations return owned copies; the planner never sees live ledger state.
#[async_trait]
pub trait PoolQuerier: Send + Sync {
    async fn get_pool_by_id(&self, pool_id: &str) -> Result<Pool, QuerierError>;

    /// Pools with `asset` as asset0 or asset1
    async fn get_pools_by_asset(&self, asset: &str) -> Result<Vec<Pool>, QuerierError>;
}
