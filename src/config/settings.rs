use crate::rpc::pool::EndpointConfig;
use log::{info, warn};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_urls: Vec<String>,
    pub rpc_weights: Vec<u32>,
    pub rpc_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub turbo_multiplier: u32,
    pub rate_ceiling_per_min: u32,
    pub health_check_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub stats_interval_ms: u64,
    pub persist_interval_ms: u64,
    pub state_file: String,
    pub watch_address: Option<String>,
    pub simulate: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            rpc_urls: env::var("RPC_URLS")
                .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            rpc_weights: env::var("RPC_WEIGHTS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .filter_map(|part| part.trim().parse::<u32>().ok())
                        .collect()
                })
                .unwrap_or_default(),
            rpc_timeout_ms: env::var("RPC_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()
                .unwrap_or(2000),
            turbo_multiplier: env::var("TURBO_MULTIPLIER")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            rate_ceiling_per_min: env::var("RATE_CEILING_PER_MIN")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            health_check_interval_secs: env::var("HEALTH_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            probe_timeout_secs: env::var("PROBE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "8".to_string())
                .parse()
                .unwrap_or(8),
            stats_interval_ms: env::var("STATS_INTERVAL_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            persist_interval_ms: env::var("PERSIST_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            state_file: env::var("STATE_FILE").unwrap_or_else(|_| "poll_state.json".to_string()),
            watch_address: env::var("WATCH_ADDRESS").ok(),
            simulate: env::var("SIMULATE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }

    /// Registration-ordered endpoint list. Weights are matched positionally;
    /// endpoints without a configured weight default to 1.
    pub fn endpoints(&self) -> Vec<EndpointConfig> {
        self.rpc_urls
            .iter()
            .enumerate()
            .map(|(i, url)| EndpointConfig {
                url: url.clone(),
                weight: self.rpc_weights.get(i).copied().unwrap_or(1),
            })
            .collect()
    }

    pub fn validate_and_log(&self) {
        info!("Configuration:");
        info!("   RPC endpoints: {}", self.rpc_urls.len());
        for endpoint in self.endpoints() {
            info!("      {} (weight: {})", endpoint.url, endpoint.weight);
        }
        info!(
            "   Poll interval: {}ms (turbo x{}), rate ceiling: {}/min",
            self.poll_interval_ms, self.turbo_multiplier, self.rate_ceiling_per_min
        );
        info!(
            "   Health checks every {}s (probe timeout {}s)",
            self.health_check_interval_secs, self.probe_timeout_secs
        );
        info!("   State file: {}", self.state_file);
        if self.simulate {
            info!("   Mode: SIMULATED - no live RPC queries will be issued");
        } else if self.watch_address.is_none() {
            warn!("   WATCH_ADDRESS is not set - live mode needs --address");
        }
        if self.rpc_weights.len() > self.rpc_urls.len() {
            warn!(
                "   RPC_WEIGHTS lists {} entries for {} endpoints - extras ignored",
                self.rpc_weights.len(),
                self.rpc_urls.len()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_config() -> Config {
        Config {
            rpc_urls: vec!["https://a.invalid".to_string(), "https://b.invalid".to_string()],
            rpc_weights: vec![10],
            rpc_timeout_ms: 5000,
            poll_interval_ms: 2000,
            turbo_multiplier: 10,
            rate_ceiling_per_min: 10,
            health_check_interval_secs: 30,
            probe_timeout_secs: 8,
            stats_interval_ms: 1000,
            persist_interval_ms: 5000,
            state_file: "poll_state.json".to_string(),
            watch_address: None,
            simulate: true,
        }
    }

    #[test]
    fn test_endpoints_pair_urls_with_weights() {
        let config = base_config();
        let endpoints = config.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].url, "https://a.invalid");
        assert_eq!(endpoints[0].weight, 10);
        // Missing weights default to 1
        assert_eq!(endpoints[1].weight, 1);
    }
}
