// src/math.rs
//! Constant-product AMM arithmetic.
//!
//! Amounts use integer truncation per step, matching the router contract's
//! on-chain arithmetic. Only the price-impact ratio is computed in floating point.

use crate::shared::utils::MAX_BPS;

/// Input remaining after the pool fee: `amount_in * (10000 - fee_bps) / 10000`
pub fn amount_after_fee(amount_in: u64, fee_bps: u32) -> u64 {
    let keep_bps = (MAX_BPS - fee_bps.min(MAX_BPS)) as u128;
    ((amount_in as u128 * keep_bps) / MAX_BPS as u128) as u64
}

/// Output of a single constant-product swap with the fee deducted from the input.
///
/// Returns 0 when either reserve is empty.
pub fn calculate_amount_out(amount_in: u64, reserve_in: u64, reserve_out: u64, fee_bps: u32) -> u64 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }

    let in_after_fee = amount_after_fee(amount_in, fee_bps) as u128;
    let numerator = reserve_out as u128 * in_after_fee;
    let denominator = reserve_in as u128 + in_after_fee;

    // amount_out < reserve_out, so it always fits back into u64
    (numerator / denominator) as u64
}

/// Pre-trade spot rate (units of output per unit of input)
pub fn spot_rate(reserve_in: u64, reserve_out: u64) -> f64 {
    if reserve_in == 0 {
        return 0.0;
    }
    reserve_out as f64 / reserve_in as f64
}

/// Relative shortfall of the execution rate against the spot rate, in basis points.
///
/// Includes the fee component; never negative.
pub fn calculate_price_impact_bps(amount_in: u64, amount_out: u64, spot_rate: f64) -> f64 {
    if amount_in == 0 || spot_rate <= 0.0 {
        return 0.0;
    }
    let execution_rate = amount_out as f64 / amount_in as f64;
    let impact = (spot_rate - execution_rate) / spot_rate * MAX_BPS as f64;
    impact.max(0.0)
}

/// Calculate minimum output amount with slippage protection
pub fn calculate_min_out(amount_out: u64, slippage_bps: u32) -> u64 {
    let keep_bps = (MAX_BPS - slippage_bps.min(MAX_BPS)) as u128;
    ((amount_out as u128 * keep_bps) / MAX_BPS as u128) as u64
}

/// Effective fee of several hops applied in sequence
pub fn compound_fee_bps(fees_bps: &[u32]) -> u32 {
    let keep = fees_bps.iter().fold(MAX_BPS as u64, |keep, fee| {
        keep * (MAX_BPS - (*fee).min(MAX_BPS)) as u64 / MAX_BPS as u64
    });
    MAX_BPS - keep as u32
}
