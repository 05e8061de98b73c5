pub mod settings;

pub use settings::Config;

use crate::error::ProspectorError;
use std::sync::Arc;
use url::Url;

/// Loads and returns the application configuration as an `Arc<Config>`.
/// Centralizes `.env` loading and validation.
pub fn load_config() -> Result<Arc<Config>, ProspectorError> {
    dotenv::dotenv().ok(); // Load .env file if present, ignore errors

    let config = Config::from_env();
    validate(&config)?;
    Ok(Arc::new(config))
}

fn validate(config: &Config) -> Result<(), ProspectorError> {
    if config.rpc_urls.is_empty() {
        return Err(ProspectorError::ConfigError(
            "RPC_URLS cannot be empty".to_string(),
        ));
    }
    for url in &config.rpc_urls {
        Url::parse(url)
            .map_err(|e| ProspectorError::ConfigError(format!("invalid RPC url '{}': {}", url, e)))?;
    }
    if config.turbo_multiplier == 0 {
        return Err(ProspectorError::ConfigError(
            "TURBO_MULTIPLIER must be at least 1".to_string(),
        ));
    }
    if config.rate_ceiling_per_min == 0 {
        return Err(ProspectorError::ConfigError(
            "RATE_CEILING_PER_MIN must be at least 1".to_string(),
        ));
    }
    if config.poll_interval_ms == 0 {
        return Err(ProspectorError::ConfigError(
            "POLL_INTERVAL_MS must be at least 1".to_string(),
        ));
    }
    if config.stats_interval_ms == 0 || config.persist_interval_ms == 0 {
        return Err(ProspectorError::ConfigError(
            "STATS_INTERVAL_MS and PERSIST_INTERVAL_MS must be at least 1".to_string(),
        ));
    }
    Ok(())
}
