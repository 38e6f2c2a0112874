use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::routing::PoolQuerier;
use crate::shared::errors::QuerierError;
use crate::shared::types::{IndexerConfig, Pool};
use crate::shared::utils::percent_to_bps;

/// Pool record as served by the indexer's `/api/v1/pools` endpoints
#[derive(Debug, Clone, Deserialize)]
struct RemotePoolInfo {
    id: String,
    asset0: String,
    asset1: String,
    #[serde(default)]
    reserve0: u64,
    #[serde(default)]
    reserve1: u64,
    /// Decimal percent, e.g. 0.08 for 8 bps
    #[serde(default)]
    fee: f64,
    #[serde(default)]
    total_supply: u64,
}

impl TryFrom<RemotePoolInfo> for Pool {
    type Error = QuerierError;

    fn try_from(info: RemotePoolInfo) -> Result<Self, Self::Error> {
        let fee_bps = percent_to_bps(info.fee).ok_or_else(|| {
            QuerierError::RemoteUnavailable(format!("pool {} has invalid fee {}", info.id, info.fee))
        })?;
        Ok(Pool {
            id: info.id,
            asset0: info.asset0,
            asset1: info.asset1,
            reserve0: info.reserve0,
            reserve1: info.reserve1,
            fee_bps,
            total_supply: info.total_supply,
        })
    }
}

/// Pool querier over the remote indexer HTTP API
pub struct IndexerPoolQuerier {
    http_client: Client,
    base_url: Url,
}

impl IndexerPoolQuerier {
    pub fn new(config: &IndexerConfig) -> Result<Self, QuerierError> {
        let http_client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| QuerierError::RemoteUnavailable(e.to_string()))?;
        let base_url = Url::parse(&config.endpoint).map_err(|e| {
            QuerierError::RemoteUnavailable(format!("invalid indexer endpoint {}: {}", config.endpoint, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(QuerierError::RemoteUnavailable(format!(
                "invalid indexer endpoint {}",
                config.endpoint
            )));
        }
        Ok(Self { http_client, base_url })
    }

    /// `{endpoint}/api/v1/pools[/{pool_id}]`, with the id escaped as a single path segment
    fn pools_url(&self, pool_id: Option<&str>) -> Result<Url, QuerierError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                QuerierError::RemoteUnavailable(format!("invalid indexer endpoint {}", self.base_url))
            })?;
            segments.pop_if_empty().extend(["api", "v1", "pools"]);
            if let Some(pool_id) = pool_id {
                segments.push(pool_id);
            }
        }
        Ok(url)
    }

    async fn fetch_all(&self) -> Result<Vec<RemotePoolInfo>, QuerierError> {
        let url = self.pools_url(None)?;
        debug!(%url, "fetching pool list from indexer");

        let response = self.http_client.get(url.clone()).send().await.map_err(unavailable)?;
        if !response.status().is_success() {
            warn!(%url, status = %response.status(), "indexer pool list request failed");
            return Err(QuerierError::RemoteUnavailable(format!(
                "indexer returned status {}",
                response.status()
            )));
        }
        response.json().await.map_err(unavailable)
    }
}

fn unavailable(err: reqwest::Error) -> QuerierError {
    if err.is_timeout() {
        QuerierError::RemoteUnavailable(format!("indexer request timed out: {}", err))
    } else {
        QuerierError::RemoteUnavailable(err.to_string())
    }
}

#[async_trait]
impl PoolQuerier for IndexerPoolQuerier {
    async fn get_pool_by_id(&self, pool_id: &str) -> Result<Pool, QuerierError> {
        let url = self.pools_url(Some(pool_id))?;
        debug!(%url, "fetching pool from indexer");

        let response = self.http_client.get(url.clone()).send().await.map_err(unavailable)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(QuerierError::NotFound(pool_id.to_string())),
            status if !status.is_success() => {
                warn!(%url, %status, "indexer pool request failed");
                Err(QuerierError::RemoteUnavailable(format!("indexer returned status {}", status)))
            }
            _ => {
                let info: RemotePoolInfo = response.json().await.map_err(unavailable)?;
                if info.id != pool_id {
                    warn!(%url, returned = %info.id, "indexer returned a different pool");
                    return Err(QuerierError::RemoteUnavailable(format!(
                        "indexer returned pool {} for {}",
                        info.id, pool_id
                    )));
                }
                Pool::try_from(info)
            }
        }
    }

    async fn get_pools_by_asset(&self, asset: &str) -> Result<Vec<Pool>, QuerierError> {
        self.fetch_all()
            .await?
            .into_iter()
            .filter(|info| info.asset0 == asset || info.asset1 == asset)
            .map(Pool::try_from)
            .collect()
    }
}
