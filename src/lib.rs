//! dexledger - event-sourced DEX pool ledger and swap route planner
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod math;
pub mod shared;

// Re-export main types for convenience
pub use domain::ledger::{ApplyOutcome, PoolLedger};
pub use domain::routing::{PoolQuerier, RoutePlanner, RouteQuote, SwapHop};
pub use infrastructure::{IndexerPoolQuerier, LedgerPoolQuerier};
