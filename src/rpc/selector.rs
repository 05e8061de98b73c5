// src/rpc/selector.rs
//! Endpoint selection policy.
//!
//! Pure ranking over a pool snapshot: rate-limit-quiet endpoints first,
//! premium weight next, least-recently-used breaks remaining ties. The
//! ordering is deterministic given identical pool state.

use super::pool::{EndpointHandle, EndpointId, EndpointPool, EndpointSnapshot};
use log::warn;
use std::cmp::Reverse;
use std::sync::Arc;

/// Rank the healthy endpoints of a snapshot and return the best candidate's
/// id, or `None` when every endpoint is unhealthy.
///
/// Order: ascending `rate_limit_hits`, then descending `weight`, then
/// ascending `last_used_at` (never-used endpoints sort first; the stable sort
/// preserves registration order on full ties).
pub fn rank(snapshot: &[EndpointSnapshot]) -> Option<EndpointId> {
    let mut healthy: Vec<&EndpointSnapshot> =
        snapshot.iter().filter(|e| e.is_healthy).collect();
    if healthy.is_empty() {
        return None;
    }
    healthy.sort_by_key(|e| (e.rate_limit_hits, Reverse(e.weight), e.last_used_at));
    Some(healthy[0].id)
}

/// Selection front-end over the pool, including the total-outage recovery
/// path.
pub struct EndpointSelector {
    pool: Arc<EndpointPool>,
}

impl EndpointSelector {
    pub fn new(pool: Arc<EndpointPool>) -> Self {
        Self { pool }
    }

    /// Pick the best endpoint for the next call. When every endpoint is
    /// unhealthy the pool is reset and the first registered endpoint is
    /// returned, so a total outage never leaves the caller without a
    /// candidate.
    pub async fn select(&self) -> EndpointHandle {
        let snapshot = self.pool.snapshot().await;
        let id = match rank(&snapshot) {
            Some(id) => id,
            None => {
                warn!("⚠️ Every endpoint is unhealthy - resetting pool and falling back to the first registered endpoint");
                self.pool.reset_all().await;
                0
            }
        };
        self.pool.mark_used(id).await;
        self.pool
            .handle(id)
            .expect("selected id comes from a snapshot of registered endpoints")
    }
}
