//! Per-method state transitions for DEX router events.
//!
//! Every function here runs under the ledger's write lock. Arguments are fully
//! decoded before any state is touched, so a malformed payload leaves the
//! ledger unchanged.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::shared::errors::LedgerError;
use crate::shared::types::{ContractEvent, LiquidityPosition, Pool, TransactionRecord, TransactionType};
use crate::shared::utils::{percent_to_bps, MAX_BPS};

const METHOD_POOL_CREATED: &str = "pool_created";
const METHOD_LIQUIDITY_ADDED: &str = "liquidity_added";
const METHOD_LIQUIDITY_REMOVED: &str = "liquidity_removed";
const METHOD_SWAP_EXECUTED: &str = "swap_executed";

/// Aggregates owned by the ledger
#[derive(Debug, Default)]
pub struct LedgerState {
    pub pools: HashMap<String, Pool>,
    /// pool_id -> user -> position
    pub positions: HashMap<String, BTreeMap<String, LiquidityPosition>>,
}

#[derive(Debug, Deserialize)]
struct PoolCreatedArgs {
    pool_id: String,
    asset0: String,
    asset1: String,
    #[serde(default)]
    fee: Option<f64>,
    #[serde(default)]
    fee_bps: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LiquidityAddedArgs {
    pool_id: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    amount0: u64,
    #[serde(default)]
    amount1: u64,
    #[serde(default)]
    lp_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct LiquidityRemovedArgs {
    pool_id: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    amount0: u64,
    #[serde(default)]
    amount1: u64,
    #[serde(default)]
    lp_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct SwapExecutedArgs {
    pool_id: String,
    #[serde(default)]
    user: Option<String>,
    /// Legacy signed reserve delta for asset0
    #[serde(default)]
    amount0: i64,
    /// Legacy signed reserve delta for asset1
    #[serde(default)]
    amount1: i64,
    #[serde(default)]
    amount_in: u64,
    #[serde(default)]
    amount_out: u64,
    #[serde(default)]
    asset_in: String,
    #[serde(default)]
    asset_out: String,
}

/// Apply one router event. `Ok(None)` means the method is not one the ledger tracks.
pub fn apply_event(
    state: &mut LedgerState,
    event: &ContractEvent,
    timestamp: DateTime<Utc>,
) -> Result<Option<TransactionRecord>, LedgerError> {
    let record = match event.method.as_str() {
        METHOD_POOL_CREATED => apply_pool_created(state, event, timestamp)?,
        METHOD_LIQUIDITY_ADDED => apply_liquidity_added(state, event, timestamp)?,
        METHOD_LIQUIDITY_REMOVED => apply_liquidity_removed(state, event, timestamp)?,
        METHOD_SWAP_EXECUTED => apply_swap_executed(state, event, timestamp)?,
        other => {
            debug!(method = %other, tx_id = %event.tx_id, "ignoring untracked router method");
            return Ok(None);
        }
    };
    Ok(Some(record))
}

fn decode_args<T: DeserializeOwned>(event: &ContractEvent) -> Result<T, LedgerError> {
    T::deserialize(&event.args).map_err(|e| LedgerError::malformed(&event.method, e))
}

fn non_empty(user: Option<String>) -> Option<String> {
    user.filter(|u| !u.is_empty())
}

fn new_record(
    event: &ContractEvent,
    tx_type: TransactionType,
    pool_id: String,
    user: Option<String>,
    timestamp: DateTime<Utc>,
    details: serde_json::Value,
) -> TransactionRecord {
    let details = match details {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    TransactionRecord {
        id: event.tx_id.clone(),
        tx_type,
        pool_id,
        user,
        block_height: event.block_height,
        timestamp,
        details,
    }
}

fn apply_pool_created(
    state: &mut LedgerState,
    event: &ContractEvent,
    timestamp: DateTime<Utc>,
) -> Result<TransactionRecord, LedgerError> {
    let args: PoolCreatedArgs = decode_args(event)?;

    if args.asset0 == args.asset1 {
        return Err(LedgerError::malformed(&event.method, "asset0 and asset1 must differ"));
    }

    // Integer fee_bps wins over the decimal-percent field
    let fee_bps = match (args.fee_bps, args.fee) {
        (Some(bps), _) => bps,
        (None, Some(percent)) => percent_to_bps(percent)
            .ok_or_else(|| LedgerError::malformed(&event.method, format!("invalid fee: {}", percent)))?,
        (None, None) => 0,
    };
    if fee_bps > MAX_BPS {
        return Err(LedgerError::malformed(&event.method, format!("fee above {} bps: {}", MAX_BPS, fee_bps)));
    }

    if state.pools.contains_key(&args.pool_id) {
        return Err(LedgerError::DuplicatePool(args.pool_id));
    }

    state.pools.insert(
        args.pool_id.clone(),
        Pool::new(args.pool_id.clone(), args.asset0.clone(), args.asset1.clone(), fee_bps),
    );

    Ok(new_record(
        event,
        TransactionType::PoolCreated,
        args.pool_id,
        None,
        timestamp,
        json!({
            "asset0": args.asset0,
            "asset1": args.asset1,
            "fee_bps": fee_bps,
        }),
    ))
}

fn apply_liquidity_added(
    state: &mut LedgerState,
    event: &ContractEvent,
    timestamp: DateTime<Utc>,
) -> Result<TransactionRecord, LedgerError> {
    let args: LiquidityAddedArgs = decode_args(event)?;
    let user = non_empty(args.user);

    // Schema v0 events carry no lp_tokens; the credited LP count is then amount0.
    let lp_credited = if args.lp_tokens == 0 { args.amount0 } else { args.lp_tokens };

    if let Some(pool) = state.pools.get_mut(&args.pool_id) {
        pool.reserve0 = credit(&pool.id, "reserve0", pool.reserve0, args.amount0);
        pool.reserve1 = credit(&pool.id, "reserve1", pool.reserve1, args.amount1);
        pool.total_supply = credit(&pool.id, "total_supply", pool.total_supply, lp_credited);

        if let Some(user) = &user {
            increase_position(state, &args.pool_id, user, lp_credited);
        }
        recompute_shares(state, &args.pool_id);
    } else {
        warn!(pool_id = %args.pool_id, tx_id = %event.tx_id, "deposit for unknown pool, recording only");
    }

    Ok(new_record(
        event,
        TransactionType::Deposit,
        args.pool_id,
        user,
        timestamp,
        json!({
            "amount0": args.amount0,
            "amount1": args.amount1,
            "lp_tokens": args.lp_tokens,
            "lp_credited": lp_credited,
        }),
    ))
}

fn apply_liquidity_removed(
    state: &mut LedgerState,
    event: &ContractEvent,
    timestamp: DateTime<Utc>,
) -> Result<TransactionRecord, LedgerError> {
    let args: LiquidityRemovedArgs = decode_args(event)?;
    let user = non_empty(args.user);

    if state.pools.contains_key(&args.pool_id) {
        let burned = match &user {
            Some(user) => decrease_position(state, &args.pool_id, user, args.lp_tokens),
            None => args.lp_tokens,
        };

        if let Some(pool) = state.pools.get_mut(&args.pool_id) {
            pool.reserve0 = debit(&pool.id, "reserve0", pool.reserve0, args.amount0);
            pool.reserve1 = debit(&pool.id, "reserve1", pool.reserve1, args.amount1);
            pool.total_supply = debit(&pool.id, "total_supply", pool.total_supply, burned);
        }
        recompute_shares(state, &args.pool_id);
    } else {
        warn!(pool_id = %args.pool_id, tx_id = %event.tx_id, "withdrawal for unknown pool, recording only");
    }

    Ok(new_record(
        event,
        TransactionType::Withdrawal,
        args.pool_id,
        user,
        timestamp,
        json!({
            "amount0": args.amount0,
            "amount1": args.amount1,
            "lp_tokens": args.lp_tokens,
        }),
    ))
}

fn apply_swap_executed(
    state: &mut LedgerState,
    event: &ContractEvent,
    timestamp: DateTime<Utc>,
) -> Result<TransactionRecord, LedgerError> {
    let args: SwapExecutedArgs = decode_args(event)?;
    let user = non_empty(args.user.clone());

    if let Some(pool) = state.pools.get_mut(&args.pool_id) {
        if args.amount0 != 0 || args.amount1 != 0 {
            // Legacy encoding: signed reserve deltas
            pool.reserve0 = apply_delta(&pool.id, "reserve0", pool.reserve0, args.amount0);
            pool.reserve1 = apply_delta(&pool.id, "reserve1", pool.reserve1, args.amount1);
        } else if args.asset_in == pool.asset0 {
            pool.reserve0 = credit(&pool.id, "reserve0", pool.reserve0, args.amount_in);
            pool.reserve1 = debit(&pool.id, "reserve1", pool.reserve1, args.amount_out);
        } else if args.asset_in == pool.asset1 {
            pool.reserve1 = credit(&pool.id, "reserve1", pool.reserve1, args.amount_in);
            pool.reserve0 = debit(&pool.id, "reserve0", pool.reserve0, args.amount_out);
        } else {
            warn!(
                pool_id = %pool.id,
                asset_in = %args.asset_in,
                tx_id = %event.tx_id,
                "swap input asset not in pool, reserves unchanged"
            );
        }
    } else {
        warn!(pool_id = %args.pool_id, tx_id = %event.tx_id, "swap for unknown pool, recording only");
    }

    Ok(new_record(
        event,
        TransactionType::Swap,
        args.pool_id,
        user,
        timestamp,
        json!({
            "amount0": args.amount0,
            "amount1": args.amount1,
            "amount_in": args.amount_in,
            "amount_out": args.amount_out,
            "asset_in": args.asset_in,
            "asset_out": args.asset_out,
        }),
    ))
}

fn credit(pool_id: &str, field: &'static str, value: u64, amount: u64) -> u64 {
    value.checked_add(amount).unwrap_or_else(|| {
        warn!(pool_id = %pool_id, field, value, amount, "overflow, saturating");
        u64::MAX
    })
}

fn debit(pool_id: &str, field: &'static str, value: u64, amount: u64) -> u64 {
    if amount > value {
        warn!(pool_id = %pool_id, field, value, amount, "would go negative, clamping to zero");
        return 0;
    }
    value - amount
}

fn apply_delta(pool_id: &str, field: &'static str, value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        credit(pool_id, field, value, delta as u64)
    } else {
        debit(pool_id, field, value, delta.unsigned_abs())
    }
}

fn increase_position(state: &mut LedgerState, pool_id: &str, user: &str, amount: u64) {
    let positions = state.positions.entry(pool_id.to_string()).or_default();
    match positions.get_mut(user) {
        Some(position) => {
            position.amount = credit(pool_id, "position", position.amount, amount);
        }
        None if amount > 0 => {
            let mut position = LiquidityPosition::new(user, pool_id);
            position.amount = amount;
            positions.insert(user.to_string(), position);
        }
        None => {}
    }
}

/// Burn up to `amount` LP shares from a user; returns the amount actually burned.
fn decrease_position(state: &mut LedgerState, pool_id: &str, user: &str, amount: u64) -> u64 {
    let held = state
        .positions
        .get_mut(pool_id)
        .and_then(|positions| positions.get_mut(user));

    let burned = match held {
        Some(position) => {
            let burned = amount.min(position.amount);
            position.amount -= burned;
            burned
        }
        None => 0,
    };

    if burned < amount {
        warn!(
            pool_id = %pool_id,
            user = %user,
            requested = amount,
            burned,
            "withdrawal exceeds position, floored at zero"
        );
    }
    burned
}

fn recompute_shares(state: &mut LedgerState, pool_id: &str) {
    let total_supply = state.pools.get(pool_id).map(|p| p.total_supply).unwrap_or(0);
    if let Some(positions) = state.positions.get_mut(pool_id) {
        for position in positions.values_mut() {
            position.recompute_share(total_supply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: &str, args: serde_json::Value, tx_id: &str) -> ContractEvent {
        ContractEvent::new("dex-router", method, args, 1, tx_id)
    }

    fn apply(state: &mut LedgerState, method: &str, args: serde_json::Value) -> Result<Option<TransactionRecord>, LedgerError> {
        apply_event(state, &event(method, args, "tx"), Utc::now())
    }

    fn seeded_state() -> LedgerState {
        let mut state = LedgerState::default();
        apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p1", "asset0": "HBD", "asset1": "HIVE", "fee_bps": 8})).unwrap();
        state
    }

    #[test]
    fn test_pool_created() {
        let state = seeded_state();
        let pool = &state.pools["p1"];
        assert_eq!(pool.fee_bps, 8);
        assert_eq!((pool.reserve0, pool.reserve1, pool.total_supply), (0, 0, 0));
    }

    #[test]
    fn test_pool_created_decimal_fee() {
        let mut state = LedgerState::default();
        let record = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p2", "asset0": "A", "asset1": "B", "fee": 0.3}))
            .unwrap()
            .unwrap();
        assert_eq!(state.pools["p2"].fee_bps, 30);
        assert_eq!(record.tx_type, TransactionType::PoolCreated);
        assert_eq!(record.user, None);
        assert_eq!(record.details["fee_bps"], 30);
    }

    #[test]
    fn test_pool_created_fee_above_max_malformed() {
        let mut state = LedgerState::default();
        let err = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p", "asset0": "A", "asset1": "B", "fee_bps": 10_001}))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent { .. }));

        let err = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p", "asset0": "A", "asset1": "B", "fee": 100.5}))
            .unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent { .. }));
        assert!(state.pools.is_empty());

        apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p", "asset0": "A", "asset1": "B", "fee_bps": 10_000})).unwrap();
        assert_eq!(state.pools["p"].fee_bps, 10_000);
    }

    #[test]
    fn test_pool_created_fee_bps_wins_over_percent() {
        let mut state = LedgerState::default();
        let record = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p", "asset0": "A", "asset1": "B", "fee": 0.3, "fee_bps": 8}))
            .unwrap()
            .unwrap();
        assert_eq!(state.pools["p"].fee_bps, 8);
        assert_eq!(record.details["fee_bps"], 8);
    }

    #[test]
    fn test_pool_created_duplicate_rejected() {
        let mut state = seeded_state();
        let err = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p1", "asset0": "X", "asset1": "Y"})).unwrap_err();
        assert_eq!(err, LedgerError::DuplicatePool("p1".to_string()));
        assert_eq!(state.pools["p1"].asset0, "HBD");
    }

    #[test]
    fn test_pool_created_same_assets_malformed() {
        let mut state = LedgerState::default();
        let err = apply(&mut state, METHOD_POOL_CREATED, json!({"pool_id": "p", "asset0": "A", "asset1": "A"})).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent { .. }));
        assert!(state.pools.is_empty());
    }

    #[test]
    fn test_liquidity_added_credits_position() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "alice", "amount0": 1000, "amount1": 500, "lp_tokens": 700})).unwrap();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "bob", "amount0": 1000, "amount1": 500, "lp_tokens": 300})).unwrap();

        let pool = &state.pools["p1"];
        assert_eq!((pool.reserve0, pool.reserve1, pool.total_supply), (2000, 1000, 1000));

        let positions = &state.positions["p1"];
        assert_eq!(positions["alice"].amount, 700);
        assert!((positions["alice"].share - 70.0).abs() < 1e-9);
        assert!((positions["bob"].share - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_liquidity_added_legacy_lp_fallback() {
        let mut state = seeded_state();
        let record = apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "alice", "amount0": 1234, "amount1": 99}))
            .unwrap()
            .unwrap();

        assert_eq!(state.pools["p1"].total_supply, 1234);
        assert_eq!(state.positions["p1"]["alice"].amount, 1234);
        assert_eq!(record.details["lp_tokens"], 0);
        assert_eq!(record.details["lp_credited"], 1234);
    }

    #[test]
    fn test_liquidity_added_without_user() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "amount0": 10, "amount1": 10, "lp_tokens": 10})).unwrap();
        assert_eq!(state.pools["p1"].total_supply, 10);
        assert!(state.positions.get("p1").map_or(true, |p| p.is_empty()));
    }

    #[test]
    fn test_liquidity_removed_floors_position() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "alice", "amount0": 100, "amount1": 100, "lp_tokens": 100})).unwrap();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "bob", "amount0": 100, "amount1": 100, "lp_tokens": 100})).unwrap();
        apply(&mut state, METHOD_LIQUIDITY_REMOVED, json!({"pool_id": "p1", "user": "alice", "amount0": 50, "amount1": 50, "lp_tokens": 150})).unwrap();

        let pool = &state.pools["p1"];
        assert_eq!(pool.total_supply, 100);
        assert_eq!((pool.reserve0, pool.reserve1), (150, 150));
        assert_eq!(state.positions["p1"]["alice"].amount, 0);
        assert_eq!(state.positions["p1"]["alice"].share, 0.0);
        assert!((state.positions["p1"]["bob"].share - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_liquidity_removed_clamps_reserves() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "alice", "amount0": 100, "amount1": 100, "lp_tokens": 100})).unwrap();
        apply(&mut state, METHOD_LIQUIDITY_REMOVED, json!({"pool_id": "p1", "user": "alice", "amount0": 500, "amount1": 20, "lp_tokens": 10})).unwrap();

        let pool = &state.pools["p1"];
        assert_eq!((pool.reserve0, pool.reserve1), (0, 80));
    }

    #[test]
    fn test_swap_directional() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "user": "alice", "amount0": 1000, "amount1": 1000, "lp_tokens": 1000})).unwrap();

        apply(&mut state, METHOD_SWAP_EXECUTED, json!({"pool_id": "p1", "asset_in": "HBD", "asset_out": "HIVE", "amount_in": 100, "amount_out": 90})).unwrap();
        assert_eq!((state.pools["p1"].reserve0, state.pools["p1"].reserve1), (1100, 910));

        apply(&mut state, METHOD_SWAP_EXECUTED, json!({"pool_id": "p1", "asset_in": "HIVE", "asset_out": "HBD", "amount_in": 90, "amount_out": 100})).unwrap();
        assert_eq!((state.pools["p1"].reserve0, state.pools["p1"].reserve1), (1000, 1000));
    }

    #[test]
    fn test_swap_unknown_asset_leaves_reserves() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "amount0": 10, "amount1": 10})).unwrap();
        let record = apply(&mut state, METHOD_SWAP_EXECUTED, json!({"pool_id": "p1", "asset_in": "BTC", "amount_in": 5, "amount_out": 5}))
            .unwrap()
            .unwrap();
        assert_eq!((state.pools["p1"].reserve0, state.pools["p1"].reserve1), (10, 10));
        assert_eq!(record.tx_type, TransactionType::Swap);
    }

    #[test]
    fn test_swap_legacy_deltas_clamp_to_zero() {
        let mut state = seeded_state();
        apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "amount0": 100, "amount1": 100})).unwrap();

        apply(&mut state, METHOD_SWAP_EXECUTED, json!({"pool_id": "p1", "amount0": 25, "amount1": -20})).unwrap();
        assert_eq!((state.pools["p1"].reserve0, state.pools["p1"].reserve1), (125, 80));

        apply(&mut state, METHOD_SWAP_EXECUTED, json!({"pool_id": "p1", "amount0": -1000, "amount1": 5})).unwrap();
        assert_eq!((state.pools["p1"].reserve0, state.pools["p1"].reserve1), (0, 85));
    }

    #[test]
    fn test_unknown_pool_still_recorded() {
        let mut state = LedgerState::default();
        let record = apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "ghost", "user": "alice", "amount0": 5}))
            .unwrap()
            .unwrap();
        assert_eq!(record.pool_id, "ghost");
        assert_eq!(record.user.as_deref(), Some("alice"));
        assert!(state.pools.is_empty());
        assert!(state.positions.is_empty());
    }

    #[test]
    fn test_malformed_args() {
        let mut state = seeded_state();
        let err = apply(&mut state, METHOD_LIQUIDITY_ADDED, json!({"pool_id": "p1", "amount0": "lots"})).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent { ref method, .. } if method == METHOD_LIQUIDITY_ADDED));

        let err = apply(&mut state, METHOD_SWAP_EXECUTED, serde_json::Value::Null).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedEvent { .. }));
        assert_eq!(state.pools["p1"].reserve0, 0);
    }

    #[test]
    fn test_untracked_method_ignored() {
        let mut state = seeded_state();
        assert_eq!(apply(&mut state, "fees_claimed", json!({})).unwrap(), None);
    }
}
