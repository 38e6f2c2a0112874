//! Common types used across the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared::errors::QueryError;

/// Constant-product liquidity pool as indexed from router events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub id: String,
    pub asset0: String,
    pub asset1: String,
    pub reserve0: u64,
    pub reserve1: u64,
    /// Fee in basis points (8 = 0.08%)
    pub fee_bps: u32,
    /// Total LP shares issued
    pub total_supply: u64,
}

impl Pool {
    pub fn new(id: impl Into<String>, asset0: impl Into<String>, asset1: impl Into<String>, fee_bps: u32) -> Self {
        Self {
            id: id.into(),
            asset0: asset0.into(),
            asset1: asset1.into(),
            reserve0: 0,
            reserve1: 0,
            fee_bps,
            total_supply: 0,
        }
    }

    pub fn contains(&self, asset: &str) -> bool {
        self.asset0 == asset || self.asset1 == asset
    }

    /// True when the pool trades exactly this pair, in either order.
    pub fn connects(&self, asset_a: &str, asset_b: &str) -> bool {
        (self.asset0 == asset_a && self.asset1 == asset_b)
            || (self.asset0 == asset_b && self.asset1 == asset_a)
    }

    /// Reserves oriented for a trade selling `asset_in`: `(reserve_in, reserve_out)`.
    pub fn oriented_reserves(&self, asset_in: &str) -> Option<(u64, u64)> {
        if asset_in == self.asset0 {
            Some((self.reserve0, self.reserve1))
        } else if asset_in == self.asset1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    pub fn has_liquidity(&self) -> bool {
        self.reserve0 > 0 && self.reserve1 > 0
    }
}

/// A user's LP shares in one pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub user: String,
    pub pool_id: String,
    pub amount: u64,
    /// Percentage of the pool's total supply held by this position
    pub share: f64,
}

impl LiquidityPosition {
    pub fn new(user: impl Into<String>, pool_id: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pool_id: pool_id.into(),
            amount: 0,
            share: 0.0,
        }
    }

    pub fn recompute_share(&mut self, total_supply: u64) {
        self.share = if total_supply > 0 {
            self.amount as f64 / total_supply as f64 * 100.0
        } else {
            0.0
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    PoolCreated,
    Deposit,
    Withdrawal,
    Swap,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::PoolCreated => "pool_created",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Swap => "swap",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pool_created" => Ok(TransactionType::PoolCreated),
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            "swap" => Ok(TransactionType::Swap),
            _ => Err(QueryError::InvalidFilter(format!("unknown transaction type: {}", s))),
        }
    }
}

/// Immutable history entry appended for every applied router event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub pool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// One finalized contract call delivered by the upstream event source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub contract: String,
    pub method: String,
    #[serde(default)]
    pub args: serde_json::Value,
    pub block_height: u64,
    pub tx_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ContractEvent {
    pub fn new(
        contract: impl Into<String>,
        method: impl Into<String>,
        args: serde_json::Value,
        block_height: u64,
        tx_id: impl Into<String>,
    ) -> Self {
        Self {
            contract: contract.into(),
            method: method.into(),
            args,
            block_height,
            tx_id: tx_id.into(),
            timestamp: None,
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub router_contract: String,
    pub history_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            router_contract: "dex-router".to_string(),
            history_capacity: 1000,
        }
    }
}

/// Route planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub bridge_asset: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bridge_asset: "HBD".to_string(),
        }
    }
}

/// Remote pool-data service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080".to_string(),
            timeout_ms: 5000,
        }
    }
}

/// Query limits applied by the transport layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub rich_list_default_limit: usize,
    pub rich_list_max_limit: usize,
    pub transactions_default_limit: usize,
    pub transactions_max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            rich_list_default_limit: 50,
            rich_list_max_limit: 100,
            transactions_default_limit: 100,
            transactions_max_limit: 1000,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ledger: LedgerConfig,
    pub router: RouterConfig,
    pub indexer: IndexerConfig,
    pub query: QueryConfig,
}
