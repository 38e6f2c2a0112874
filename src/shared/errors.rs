//! Error handling for the application

use thiserror::Error;

/// Errors raised while applying contract events to the ledger
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Malformed {method} event: {reason}")]
    MalformedEvent { method: String, reason: String },

    #[error("Pool already exists: {0}")]
    DuplicatePool(String),
}

impl LedgerError {
    pub fn malformed(method: &str, reason: impl ToString) -> Self {
        LedgerError::MalformedEvent {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Pool lookup errors surfaced by pool queriers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuerierError {
    #[error("Pool not found: {0}")]
    NotFound(String),

    #[error("Pool data service unavailable: {0}")]
    RemoteUnavailable(String),
}

/// Route computation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("No route found from {asset_in} to {asset_out}")]
    NoRouteFound { asset_in: String, asset_out: String },

    #[error("Slippage tolerance exceeded: impact {impact_bps:.2} bps > {max_bps} bps")]
    SlippageExceeded { impact_bps: f64, max_bps: u32 },

    #[error("Pool data service unavailable: {0}")]
    RemoteUnavailable(String),
}

/// Query-side errors for the transport layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Event source error: {0}")]
    EventSource(String),
}
