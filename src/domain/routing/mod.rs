//! Routing domain - swap quotes over one or two constant-product pools

mod pool_querier;
mod route_planner;

pub use pool_querier::PoolQuerier;
pub use route_planner::RoutePlanner;

use serde::{Deserialize, Serialize};

/// Single pool step of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapHop {
    pub pool_id: String,
    pub asset_in: String,
    pub asset_out: String,
    pub amount_in: u64,
    pub amount_out: u64,
    pub reserve_in: u64,
    pub reserve_out: u64,
    pub fee_bps: u32,
    /// Fee taken from this hop's input, in asset_in units
    pub fee_amount: u64,
}

/// Executable swap quote handed to the execution layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteQuote {
    pub asset_in: String,
    pub asset_out: String,
    pub amount_in: u64,
    pub amount_out: u64,
    /// amount_out reduced by the caller's slippage bound, if any
    pub min_amount_out: u64,
    pub price_impact_bps: f64,
    pub total_fee_bps: u32,
    /// Fee taken on the first hop, in asset_in units
    pub fee_amount: u64,
    /// Asset symbols visited, source first
    pub path: Vec<String>,
    pub hops: Vec<SwapHop>,
}

impl RouteQuote {
    pub fn is_multi_hop(&self) -> bool {
        self.hops.len() > 1
    }
}
