use std::fs;
use std::path::Path;
use tracing::debug;
use crate::shared::types::AppConfig;
use crate::shared::errors::AppError;

const DEFAULT_CONFIG_PATH: &str = "Config.toml";

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from Config.toml in the working directory,
    /// falling back to defaults when the file does not exist
    pub fn load_config() -> Result<AppConfig, AppError> {
        if !Path::new(DEFAULT_CONFIG_PATH).exists() {
            debug!("{} not found, using default configuration", DEFAULT_CONFIG_PATH);
            return Ok(AppConfig::default());
        }
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from an explicit path; the file must exist
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<AppConfig, AppError> {
        let config_content = fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Self::parse(&config_content)
    }

    pub fn parse(content: &str) -> Result<AppConfig, AppError> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        if config.ledger.history_capacity == 0 {
            return Err(AppError::ConfigError("ledger.history_capacity must be positive".to_string()));
        }
        if config.router.bridge_asset.is_empty() {
            return Err(AppError::ConfigError("router.bridge_asset must not be empty".to_string()));
        }

        Ok(config)
    }
}
