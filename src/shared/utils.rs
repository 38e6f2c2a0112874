//! Utility functions and helpers

/// Basis points in 100%
pub const MAX_BPS: u32 = 10_000;

/// Convert a decimal-percent fee (0.08 meaning 0.08%) into basis points.
///
/// Rounds to the nearest basis point so float representation error never
/// drops a bps at common tiers (0.30 -> 30, 0.05 -> 5). Returns `None` for
/// non-finite, negative, or above-100% inputs.
pub fn percent_to_bps(fee_percent: f64) -> Option<u32> {
    if !fee_percent.is_finite() || fee_percent < 0.0 {
        return None;
    }
    let bps = (fee_percent * 100.0).round();
    if bps > MAX_BPS as f64 {
        return None;
    }
    Some(bps as u32)
}
