//! Route planning over pool snapshots: direct pool first, then via the bridge asset

use std::sync::Arc;
use tracing::{debug, info};

use super::{PoolQuerier, RouteQuote, SwapHop};
use crate::math::{
    amount_after_fee, calculate_amount_out, calculate_min_out, calculate_price_impact_bps,
    compound_fee_bps, spot_rate,
};
use crate::shared::errors::{QuerierError, RouteError};
use crate::shared::types::Pool;

/// Computes swap quotes from snapshots supplied by a [`PoolQuerier`]
pub struct RoutePlanner {
    querier: Arc<dyn PoolQuerier>,
    bridge_asset: String,
}

impl RoutePlanner {
    pub fn new(querier: Arc<dyn PoolQuerier>, bridge_asset: impl Into<String>) -> Self {
        Self {
            querier,
            bridge_asset: bridge_asset.into(),
        }
    }

    /// Quote a swap of `amount_in` units of `asset_in` into `asset_out`.
    ///
    /// Uses the best direct pool with liquidity, otherwise the best pair of pools
    /// through the bridge asset. With `max_slippage_bps`, a quote whose price
    /// impact exceeds the bound fails instead of being returned.
    pub async fn compute_route(
        &self,
        asset_in: &str,
        asset_out: &str,
        amount_in: u64,
        max_slippage_bps: Option<u32>,
    ) -> Result<RouteQuote, RouteError> {
        if asset_in == asset_out {
            return Err(RouteError::InvalidRoute(format!("cannot swap {} to itself", asset_in)));
        }
        if amount_in == 0 {
            return Err(RouteError::InvalidRoute("amount_in must be positive".to_string()));
        }

        let source_pools = self.pools_with(asset_in).await?;

        let hops = match best_direct_hop(&source_pools, asset_in, asset_out, amount_in) {
            Some(hop) => vec![hop],
            None => self
                .best_bridged_hops(&source_pools, asset_in, asset_out, amount_in)
                .await?
                .ok_or_else(|| RouteError::NoRouteFound {
                    asset_in: asset_in.to_string(),
                    asset_out: asset_out.to_string(),
                })?,
        };

        let quote = build_quote(asset_in, asset_out, amount_in, hops, max_slippage_bps);

        if let Some(max_bps) = max_slippage_bps {
            if quote.price_impact_bps > max_bps as f64 {
                debug!(impact_bps = quote.price_impact_bps, max_bps, "quote rejected on slippage");
                return Err(RouteError::SlippageExceeded {
                    impact_bps: quote.price_impact_bps,
                    max_bps,
                });
            }
        }

        info!(
            "Route {} -> {}: {} in, {} out over {} hop(s), impact {:.2} bps",
            asset_in,
            asset_out,
            quote.amount_in,
            quote.amount_out,
            quote.hops.len(),
            quote.price_impact_bps
        );
        Ok(quote)
    }

    async fn pools_with(&self, asset: &str) -> Result<Vec<Pool>, RouteError> {
        match self.querier.get_pools_by_asset(asset).await {
            Ok(pools) => Ok(pools),
            Err(QuerierError::NotFound(_)) => Ok(Vec::new()),
            Err(QuerierError::RemoteUnavailable(reason)) => Err(RouteError::RemoteUnavailable(reason)),
        }
    }

    async fn best_bridged_hops(
        &self,
        source_pools: &[Pool],
        asset_in: &str,
        asset_out: &str,
        amount_in: u64,
    ) -> Result<Option<Vec<SwapHop>>, RouteError> {
        let bridge = self.bridge_asset.as_str();
        if asset_in == bridge || asset_out == bridge {
            return Ok(None);
        }

        let first_legs: Vec<SwapHop> = sorted_by_id(source_pools)
            .into_iter()
            .filter(|pool| pool.connects(asset_in, bridge))
            .filter_map(|pool| quote_hop(pool, asset_in, amount_in))
            .collect();
        if first_legs.is_empty() {
            debug!(asset_in, bridge, "no usable first leg");
            return Ok(None);
        }

        let target_pools = self.pools_with(asset_out).await?;
        let second_pools: Vec<&Pool> = sorted_by_id(&target_pools)
            .into_iter()
            .filter(|pool| pool.connects(bridge, asset_out))
            .collect();

        let mut best: Option<(SwapHop, SwapHop)> = None;
        for first in &first_legs {
            for pool in &second_pools {
                let Some(second) = quote_hop(pool, bridge, first.amount_out) else {
                    continue;
                };
                let better = best
                    .as_ref()
                    .map_or(true, |(_, current)| second.amount_out > current.amount_out);
                if better {
                    best = Some((first.clone(), second));
                }
            }
        }

        Ok(best.map(|(first, second)| vec![first, second]))
    }
}

fn sorted_by_id(pools: &[Pool]) -> Vec<&Pool> {
    let mut sorted: Vec<&Pool> = pools.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}

/// Quote one pool for selling `amount_in` of `asset_in`; `None` if the pool cannot fill it
fn quote_hop(pool: &Pool, asset_in: &str, amount_in: u64) -> Option<SwapHop> {
    if !pool.has_liquidity() {
        return None;
    }
    let (reserve_in, reserve_out) = pool.oriented_reserves(asset_in)?;

    let amount_out = calculate_amount_out(amount_in, reserve_in, reserve_out, pool.fee_bps);
    if amount_out == 0 {
        return None;
    }

    let asset_out = if pool.asset0 == asset_in { &pool.asset1 } else { &pool.asset0 };
    Some(SwapHop {
        pool_id: pool.id.clone(),
        asset_in: asset_in.to_string(),
        asset_out: asset_out.clone(),
        amount_in,
        amount_out,
        reserve_in,
        reserve_out,
        fee_bps: pool.fee_bps,
        fee_amount: amount_in - amount_after_fee(amount_in, pool.fee_bps),
    })
}

fn best_direct_hop(pools: &[Pool], asset_in: &str, asset_out: &str, amount_in: u64) -> Option<SwapHop> {
    let mut best: Option<SwapHop> = None;
    for pool in sorted_by_id(pools) {
        if !pool.connects(asset_in, asset_out) {
            continue;
        }
        if let Some(hop) = quote_hop(pool, asset_in, amount_in) {
            if best.as_ref().map_or(true, |current| hop.amount_out > current.amount_out) {
                best = Some(hop);
            }
        }
    }
    best
}

fn build_quote(
    asset_in: &str,
    asset_out: &str,
    amount_in: u64,
    hops: Vec<SwapHop>,
    max_slippage_bps: Option<u32>,
) -> RouteQuote {
    let amount_out = hops.last().map(|hop| hop.amount_out).unwrap_or(0);
    let spot: f64 = hops.iter().map(|hop| spot_rate(hop.reserve_in, hop.reserve_out)).product();
    let fees: Vec<u32> = hops.iter().map(|hop| hop.fee_bps).collect();

    let mut path = vec![asset_in.to_string()];
    path.extend(hops.iter().map(|hop| hop.asset_out.clone()));

    RouteQuote {
        asset_in: asset_in.to_string(),
        asset_out: asset_out.to_string(),
        amount_in,
        amount_out,
        min_amount_out: max_slippage_bps
            .map(|bps| calculate_min_out(amount_out, bps))
            .unwrap_or(amount_out),
        price_impact_bps: calculate_price_impact_bps(amount_in, amount_out, spot),
        total_fee_bps: compound_fee_bps(&fees),
        fee_amount: hops.first().map(|hop| hop.fee_amount).unwrap_or(0),
        path,
        hops,
    }
}
