// src/rpc/health.rs
//! Background endpoint health probing.
//!
//! Every endpoint is probed on a fixed interval regardless of its current
//! health, so an endpoint taken out of rotation is reinstated automatically
//! once it recovers. The probe is a lightweight read-only call (current
//! chain slot). Probes run concurrently, each under its own timeout, so one
//! hung endpoint cannot stall the sweep. Probe failures never propagate;
//! they only update pool state.

use super::pool::{EndpointPool, Outcome};
use crate::error::{classify_failure, FailureKind};
use futures::future::join_all;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant};

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(8);

pub struct HealthMonitor {
    pool: Arc<EndpointPool>,
    probe_interval: Duration,
    probe_timeout: Duration,
}

impl HealthMonitor {
    pub fn new(pool: Arc<EndpointPool>, probe_interval: Duration, probe_timeout: Duration) -> Self {
        Self {
            pool,
            probe_interval,
            probe_timeout,
        }
    }

    /// Start the probe loop as a background task. Abort the returned handle
    /// to stop probing.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "💓 Health monitor started (interval: {:?}, probe timeout: {:?})",
                self.probe_interval, self.probe_timeout
            );
            let mut ticker = interval(self.probe_interval);
            loop {
                ticker.tick().await;
                self.probe_all().await;
            }
        })
    }

    /// One probe sweep across every endpoint, concurrently.
    pub async fn probe_all(&self) {
        let probes = (0..self.pool.len())
            .filter_map(|id| self.pool.handle(id))
            .map(|handle| {
                let probe_timeout = self.probe_timeout;
                async move {
                    let started = Instant::now();
                    let outcome = match timeout(probe_timeout, handle.client.get_slot()).await {
                        Ok(Ok(slot)) => {
                            debug!(
                                "✅ Probe ok for {} (slot {}, {}ms)",
                                handle.url,
                                slot,
                                started.elapsed().as_millis()
                            );
                            Outcome::Success
                        }
                        Ok(Err(err)) => {
                            let message = err.to_string();
                            warn!("❌ Probe failed for {}: {}", handle.url, message);
                            match classify_failure(&message) {
                                FailureKind::RateLimited => Outcome::RateLimited,
                                _ => Outcome::Failure,
                            }
                        }
                        Err(_) => {
                            warn!("⏱️ Probe timed out for {} after {:?}", handle.url, probe_timeout);
                            Outcome::Failure
                        }
                    };
                    (handle.id, outcome)
                }
            });

        for (id, outcome) in join_all(probes).await {
            self.pool.report_outcome(id, outcome).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::pool::EndpointConfig;
    use pretty_assertions::assert_eq;

    // Nothing listens on these ports, so every probe fails fast with a
    // connection error and no test ever leaves the machine.
    fn unreachable_pool(count: usize) -> Arc<EndpointPool> {
        let configs = (0..count)
            .map(|i| EndpointConfig {
                url: format!("http://127.0.0.1:{}", 9 + i),
                weight: 1,
            })
            .collect();
        Arc::new(EndpointPool::new(configs, Duration::from_millis(200)).unwrap())
    }

    #[tokio::test]
    async fn test_failed_probes_feed_the_pool() {
        let pool = unreachable_pool(2);
        let monitor = HealthMonitor::new(
            pool.clone(),
            DEFAULT_PROBE_INTERVAL,
            Duration::from_secs(2),
        );

        monitor.probe_all().await;

        let snapshot = pool.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        for endpoint in &snapshot {
            assert_eq!(endpoint.failure_count, 1);
            assert!(endpoint.is_healthy); // one failure is below the threshold
        }
    }

    #[tokio::test]
    async fn test_unhealthy_endpoints_are_still_probed() {
        let pool = unreachable_pool(1);
        for _ in 0..3 {
            pool.report_outcome(0, Outcome::Failure).await;
        }
        assert!(!pool.snapshot().await[0].is_healthy);

        let monitor = HealthMonitor::new(
            pool.clone(),
            DEFAULT_PROBE_INTERVAL,
            Duration::from_secs(2),
        );
        monitor.probe_all().await;

        // The sweep reached the endpoint even though it is out of rotation;
        // a recovered provider would have been reinstated the same way
        assert_eq!(pool.snapshot().await[0].failure_count, 4);
    }
}
