//! Ledger domain - event-sourced pool, position and history aggregates

mod event_applier;
mod pool_ledger;

pub use pool_ledger::{ApplyOutcome, PoolLedger};
