//! Adapters: pool queriers and event ingress

pub mod event_source;
pub mod indexer_client;
pub mod ledger_querier;

pub use indexer_client::IndexerPoolQuerier;
pub use ledger_querier::LedgerPoolQuerier;
