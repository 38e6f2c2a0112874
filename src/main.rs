use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dexledger::application::{Cli, CommandExecutor};
use dexledger::shared::config::ConfigLoader;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries JSON results, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_config().context("Failed to load Config.toml")?,
    };

    let executor = CommandExecutor::bootstrap(config, cli.events.as_deref()).await?;
    let output = executor.execute(cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
