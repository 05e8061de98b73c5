// src/rpc/failover.rs
//! Failover execution with retry and exponential backoff.
//!
//! Wraps one logical operation with endpoint selection, outcome reporting
//! and capped exponential backoff. The retry ceiling is `2 x` the number of
//! registered endpoints, so every endpoint gets roughly two chances before
//! the operation is given up as exhausted. Each retry re-selects from the
//! pool; there is no sticky retry against the endpoint that just failed.

use super::pool::{EndpointHandle, EndpointPool, Outcome};
use super::selector::EndpointSelector;
use crate::error::{classify_failure, FailureKind, ProspectorError};
use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const BASE_BACKOFF_MS: f64 = 1000.0;
const BACKOFF_FACTOR: f64 = 1.5;
const MAX_BACKOFF_MS: f64 = 10_000.0;

pub struct FailoverExecutor {
    pool: Arc<EndpointPool>,
    selector: EndpointSelector,
}

impl FailoverExecutor {
    pub fn new(pool: Arc<EndpointPool>) -> Self {
        Self {
            selector: EndpointSelector::new(pool.clone()),
            pool,
        }
    }

    /// Backoff before retry `attempt + 1`: `min(1000 * 1.5^attempt, 10_000)` ms
    pub fn backoff_delay(attempt: u32) -> Duration {
        let ms = (BASE_BACKOFF_MS * BACKOFF_FACTOR.powi(attempt as i32)).min(MAX_BACKOFF_MS);
        Duration::from_millis(ms as u64)
    }

    /// Run one logical operation with failover. A terminal
    /// `ProspectorError::Exhausted` applies to this operation only; the
    /// executor stays usable for subsequent calls.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> crate::error::Result<T>
    where
        F: FnMut(EndpointHandle) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let ceiling = (self.pool.len() as u32) * 2;
        let mut last_error = String::from("no attempts were made");

        for attempt in 0..ceiling {
            let handle = self.selector.select().await;
            match operation(handle.clone()).await {
                Ok(value) => {
                    self.pool.report_outcome(handle.id, Outcome::Success).await;
                    if attempt > 0 {
                        debug!("✅ Operation succeeded on {} after {} retries", handle.url, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let message = format!("{:#}", err);
                    let kind = classify_failure(&message);
                    let outcome = match kind {
                        FailureKind::RateLimited => Outcome::RateLimited,
                        // Access-denied is a distinct class but still a plain
                        // failure as far as the health counters are concerned
                        FailureKind::AccessDenied | FailureKind::Transient => Outcome::Failure,
                    };
                    warn!(
                        "❌ Attempt {}/{} failed on {} ({:?}): {}",
                        attempt + 1,
                        ceiling,
                        handle.url,
                        kind,
                        message
                    );
                    self.pool.report_outcome(handle.id, outcome).await;
                    last_error = message;

                    if attempt + 1 < ceiling {
                        let delay = Self::backoff_delay(attempt);
                        debug!("🔄 Backing off {:?} before retry", delay);
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(ProspectorError::Exhausted {
            attempts: ceiling,
            last_error,
        })
    }
}
