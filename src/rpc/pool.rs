// src/rpc/pool.rs
//! RPC endpoint pool with per-endpoint health metadata.
//!
//! Holds the authoritative, registration-ordered list of RPC providers and
//! their live health counters. Health fields are mutated only through
//! `report_outcome` and `reset_all`; url and weight are immutable after
//! registration.

use crate::error::ProspectorError;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use solana_client::nonblocking::rpc_client::RpcClient as NonBlockingRpcClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Consecutive failures before an endpoint is taken out of rotation
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;
/// Accumulated rate-limit hits before an endpoint is taken out of rotation
pub const MAX_RATE_LIMIT_HITS: u32 = 5;

/// Stable index into the pool's registration-ordered endpoint list
pub type EndpointId = usize;

/// Result of one call routed to an endpoint, as seen by the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    RateLimited,
}

/// Static endpoint registration: an ordered list of these is supplied at
/// construction; there is no dynamic add/remove.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub weight: u32,
}

/// Point-in-time view of one endpoint, as used by the selection policy.
/// Snapshots across endpoints may mix old and new field values; selection
/// only needs eventually-consistent health.
#[derive(Debug, Clone)]
pub struct EndpointSnapshot {
    pub id: EndpointId,
    pub url: String,
    pub weight: u32,
    pub failure_count: u32,
    pub rate_limit_hits: u32,
    pub is_healthy: bool,
    pub last_used_at: Option<Instant>,
}

/// Connection handle passed to caller-supplied operations
#[derive(Clone)]
pub struct EndpointHandle {
    pub id: EndpointId,
    pub url: String,
    pub client: Arc<NonBlockingRpcClient>,
}

#[derive(Debug)]
struct HealthState {
    failure_count: u32,
    rate_limit_hits: u32,
    is_healthy: bool,
    last_used_at: Option<Instant>,
}

impl HealthState {
    fn new() -> Self {
        Self {
            failure_count: 0,
            rate_limit_hits: 0,
            is_healthy: true,
            last_used_at: None,
        }
    }

    fn reset(&mut self) {
        self.failure_count = 0;
        self.rate_limit_hits = 0;
        self.is_healthy = true;
    }
}

struct EndpointEntry {
    url: String,
    weight: u32,
    client: Arc<NonBlockingRpcClient>,
    health: RwLock<HealthState>,
}

/// The one pool holding the authoritative endpoint list.
pub struct EndpointPool {
    entries: Vec<EndpointEntry>,
}

impl EndpointPool {
    /// Build the pool from static configuration. The registration order of
    /// `configs` is preserved and doubles as the endpoint id space.
    pub fn new(configs: Vec<EndpointConfig>, rpc_timeout: Duration) -> crate::error::Result<Self> {
        if configs.is_empty() {
            return Err(ProspectorError::ConfigError(
                "at least one RPC endpoint must be configured".to_string(),
            ));
        }

        let entries: Vec<EndpointEntry> = configs
            .into_iter()
            .map(|config| EndpointEntry {
                client: Arc::new(NonBlockingRpcClient::new_with_timeout(
                    config.url.clone(),
                    rpc_timeout,
                )),
                url: config.url,
                weight: config.weight,
                health: RwLock::new(HealthState::new()),
            })
            .collect();

        info!("🏊 Endpoint pool initialized with {} endpoints", entries.len());
        for (id, entry) in entries.iter().enumerate() {
            info!("   📡 [{}] {} (weight: {})", id, entry.url, entry.weight);
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Connection handle for a registered endpoint
    pub fn handle(&self, id: EndpointId) -> Option<EndpointHandle> {
        self.entries.get(id).map(|entry| EndpointHandle {
            id,
            url: entry.url.clone(),
            client: entry.client.clone(),
        })
    }

    /// Snapshot of every endpoint in stable registration order
    pub async fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let mut snapshots = Vec::with_capacity(self.entries.len());
        for (id, entry) in self.entries.iter().enumerate() {
            let health = entry.health.read().await;
            snapshots.push(EndpointSnapshot {
                id,
                url: entry.url.clone(),
                weight: entry.weight,
                failure_count: health.failure_count,
                rate_limit_hits: health.rate_limit_hits,
                is_healthy: health.is_healthy,
                last_used_at: health.last_used_at,
            });
        }
        snapshots
    }

    /// Stamp an endpoint as just selected (fairness tie-break input)
    pub async fn mark_used(&self, id: EndpointId) {
        if let Some(entry) = self.entries.get(id) {
            entry.health.write().await.last_used_at = Some(Instant::now());
        }
    }

    /// Feed one call outcome back into the endpoint's health counters.
    /// Unknown endpoint ids are a warning-level no-op.
    pub async fn report_outcome(&self, id: EndpointId, outcome: Outcome) {
        let Some(entry) = self.entries.get(id) else {
            warn!("⚠️ Outcome reported for unknown endpoint id {} - ignoring", id);
            return;
        };

        let mut health = entry.health.write().await;
        let was_healthy = health.is_healthy;

        match outcome {
            Outcome::Success => {
                health.failure_count = 0;
                // Slow decay: one rate-limit hit forgiven per success
                health.rate_limit_hits = health.rate_limit_hits.saturating_sub(1);
                health.is_healthy = true;
            }
            Outcome::Failure => {
                health.failure_count += 1;
                health.is_healthy = health.failure_count < MAX_CONSECUTIVE_FAILURES
                    && health.rate_limit_hits < MAX_RATE_LIMIT_HITS;
            }
            Outcome::RateLimited => {
                // A rate limit is also a failure for circuit-breaking purposes
                health.rate_limit_hits += 1;
                health.failure_count += 1;
                health.is_healthy = health.failure_count < MAX_CONSECUTIVE_FAILURES
                    && health.rate_limit_hits < MAX_RATE_LIMIT_HITS;
            }
        }

        if was_healthy && !health.is_healthy {
            warn!(
                "🚫 Endpoint {} marked unhealthy (failures: {}, rate-limit hits: {})",
                entry.url, health.failure_count, health.rate_limit_hits
            );
        } else if !was_healthy && health.is_healthy {
            info!("✅ Endpoint {} restored to rotation", entry.url);
        } else {
            debug!(
                "Endpoint {} outcome {:?} (failures: {}, rate-limit hits: {})",
                entry.url, outcome, health.failure_count, health.rate_limit_hits
            );
        }
    }

    /// Last-resort recovery: clear failure/rate-limit counters and restore
    /// health on every endpoint, so the pool is never permanently unusable.
    pub async fn reset_all(&self) {
        for entry in &self.entries {
            entry.health.write().await.reset();
        }
        warn!("♻️ Endpoint pool reset - all endpoints restored to rotation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn test_pool(count: usize) -> EndpointPool {
        let configs = (0..count)
            .map(|i| EndpointConfig {
                url: format!("http://rpc-{}.invalid", i),
                weight: 1,
            })
            .collect();
        EndpointPool::new(configs, Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn test_empty_config_is_rejected() {
        let result = EndpointPool::new(Vec::new(), Duration::from_millis(100));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_preserves_registration_order() {
        let pool = test_pool(3);
        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot.len(), 3);
        for (i, endpoint) in snapshot.iter().enumerate() {
            assert_eq!(endpoint.id, i);
            assert_eq!(endpoint.url, format!("http://rpc-{}.invalid", i));
            assert!(endpoint.is_healthy);
        }
    }

    #[tokio::test]
    async fn test_three_consecutive_failures_mark_unhealthy() {
        let pool = test_pool(1);
        pool.report_outcome(0, Outcome::Failure).await;
        pool.report_outcome(0, Outcome::Failure).await;
        assert!(pool.snapshot().await[0].is_healthy);

        pool.report_outcome(0, Outcome::Failure).await;
        let snapshot = pool.snapshot().await;
        assert!(!snapshot[0].is_healthy);
        assert_eq!(snapshot[0].failure_count, 3);
    }

    #[tokio::test]
    async fn test_success_resets_failures_and_decays_rate_limit_hits() {
        let pool = test_pool(1);
        pool.report_outcome(0, Outcome::RateLimited).await;
        pool.report_outcome(0, Outcome::RateLimited).await;
        pool.report_outcome(0, Outcome::Success).await;

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot[0].failure_count, 0);
        assert_eq!(snapshot[0].rate_limit_hits, 1); // decayed by exactly one
        assert!(snapshot[0].is_healthy);
    }

    #[tokio::test]
    async fn test_five_rate_limit_hits_mark_unhealthy() {
        let pool = test_pool(1);
        for _ in 0..4 {
            pool.report_outcome(0, Outcome::RateLimited).await;
            // Keep the consecutive-failure counter below its own threshold so
            // only the rate-limit path is exercised
            pool.report_outcome(0, Outcome::Success).await;
            pool.report_outcome(0, Outcome::RateLimited).await;
        }
        // Each success decays one hit, so 8 hits - 4 decays = 4 accumulated
        assert_eq!(pool.snapshot().await[0].rate_limit_hits, 4);
        assert!(pool.snapshot().await[0].is_healthy);

        pool.report_outcome(0, Outcome::RateLimited).await;
        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot[0].rate_limit_hits, 5);
        assert!(!snapshot[0].is_healthy);
    }

    #[tokio::test]
    async fn test_reset_all_restores_every_endpoint() {
        let pool = test_pool(2);
        for id in 0..2 {
            for _ in 0..3 {
                pool.report_outcome(id, Outcome::Failure).await;
            }
        }
        assert!(pool.snapshot().await.iter().all(|e| !e.is_healthy));

        pool.reset_all().await;
        let snapshot = pool.snapshot().await;
        assert!(snapshot.iter().all(|e| e.is_healthy));
        assert!(snapshot.iter().all(|e| e.failure_count == 0 && e.rate_limit_hits == 0));
    }

    #[tokio::test]
    async fn test_unknown_endpoint_id_is_a_noop() {
        let pool = test_pool(1);
        pool.report_outcome(99, Outcome::Failure).await;
        assert!(pool.snapshot().await[0].is_healthy);
    }
}
