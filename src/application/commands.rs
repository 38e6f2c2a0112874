//! CLI commands and handlers
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::application::services::{IngestStats, IngestionService, QueryService};
use crate::domain::ledger::PoolLedger;
use crate::domain::routing::{PoolQuerier, RoutePlanner};
use crate::infrastructure::event_source;
use crate::infrastructure::{IndexerPoolQuerier, LedgerPoolQuerier};
use crate::shared::types::AppConfig;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "dexledger")]
#[command(version, about = "Event-sourced DEX pool ledger and swap route planner")]
pub struct Cli {
    /// Path to config file (defaults to ./Config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// JSON-lines file of router events to replay before answering
    #[arg(long, global = true)]
    pub events: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// List all pools
    Pools,

    /// Show one pool
    Pool { id: String },

    /// List LP positions of a pool
    Positions { pool_id: String },

    /// Largest LP holders of a pool
    #[command(name = "rich-list")]
    RichList {
        pool_id: String,

        #[arg(long)]
        offset: Option<usize>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Recent transactions, newest first
    Transactions {
        #[arg(long)]
        pool: Option<String>,

        /// pool_created, deposit, withdrawal or swap
        #[arg(long = "type")]
        tx_type: Option<String>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one transaction
    Transaction { id: String },

    /// Quote a swap over one or two pools
    Route {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        amount: u64,

        #[arg(long)]
        max_slippage_bps: Option<u32>,

        /// Query pools from the remote indexer instead of the local ledger
        #[arg(long)]
        remote: bool,

        /// Bridge asset for two-hop routes (overrides config)
        #[arg(long)]
        bridge: Option<String>,
    },
}

/// Runs CLI commands against a ledger built from the configured event log
pub struct CommandExecutor {
    config: AppConfig,
    ledger: Arc<PoolLedger>,
}

impl CommandExecutor {
    pub fn new(config: AppConfig, ledger: Arc<PoolLedger>) -> Self {
        Self { config, ledger }
    }

    /// Build a ledger and replay `events` into it through the ingestion channel
    pub async fn bootstrap(config: AppConfig, events: Option<&Path>) -> Result<Self> {
        let ledger = Arc::new(PoolLedger::new(&config.ledger));

        if let Some(path) = events {
            let stats = replay_file(Arc::clone(&ledger), path).await?;
            info!(
                path = %path.display(),
                applied = stats.applied,
                ignored = stats.ignored,
                rejected = stats.rejected,
                "event log replayed"
            );
        }

        Ok(Self::new(config, ledger))
    }

    /// Execute a command, returning its JSON result
    pub async fn execute(&self, command: Commands) -> Result<Value> {
        let queries = QueryService::new(Arc::clone(&self.ledger), self.config.query.clone());

        let output = match command {
            Commands::Pools => serde_json::to_value(queries.pools())?,
            Commands::Pool { id } => serde_json::to_value(queries.pool(&id)?)?,
            Commands::Positions { pool_id } => serde_json::to_value(queries.positions(&pool_id))?,
            Commands::RichList { pool_id, offset, limit } => {
                serde_json::to_value(queries.rich_list(&pool_id, offset, limit))?
            }
            Commands::Transactions { pool, tx_type, limit } => serde_json::to_value(
                queries.transactions(pool.as_deref(), tx_type.as_deref(), limit)?,
            )?,
            Commands::Transaction { id } => serde_json::to_value(queries.transaction(&id)?)?,
            Commands::Route { from, to, amount, max_slippage_bps, remote, bridge } => {
                self.execute_route(&from, &to, amount, max_slippage_bps, remote, bridge)
                    .await?
            }
        };

        Ok(output)
    }

    async fn execute_route(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        max_slippage_bps: Option<u32>,
        remote: bool,
        bridge: Option<String>,
    ) -> Result<Value> {
        let querier: Arc<dyn PoolQuerier> = if remote {
            Arc::new(
                IndexerPoolQuerier::new(&self.config.indexer)
                    .context("Failed to build indexer client")?,
            )
        } else {
            Arc::new(LedgerPoolQuerier::new(Arc::clone(&self.ledger)))
        };
        let bridge = bridge.unwrap_or_else(|| self.config.router.bridge_asset.clone());

        let planner = RoutePlanner::new(querier, bridge);
        let quote = planner
            .compute_route(from, to, amount, max_slippage_bps)
            .await
            .with_context(|| format!("No quote for {} {} -> {}", amount, from, to))?;

        Ok(serde_json::to_value(quote)?)
    }
}

/// Stream a JSON-lines file through a single ingestion worker
async fn replay_file(ledger: Arc<PoolLedger>, path: &Path) -> Result<IngestStats> {
    let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let worker = tokio::spawn(IngestionService::new(ledger).run(receiver));

    let sent = event_source::stream_events(path, sender).await;
    let stats = worker.await.context("Ingestion worker panicked")?;
    sent.with_context(|| format!("Failed to read events from {}", path.display()))?;

    Ok(stats)
}
