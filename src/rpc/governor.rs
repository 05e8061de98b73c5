// src/rpc/governor.rs
//! Rolling-window admission control.
//!
//! A local guard on outgoing call rate, independent of both the failover
//! executor's retry logic and any provider-reported rate limits: it stops
//! calls from being initiated at all once the client is at its self-imposed
//! ceiling for the trailing window.

use dashmap::DashMap;
use log::debug;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Length of the rolling window
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

pub struct RateGovernor {
    windows: DashMap<String, VecDeque<Instant>>,
    ceiling: AtomicU32,
}

impl RateGovernor {
    /// Create a governor with the given per-window call ceiling.
    pub fn new(ceiling: u32) -> Self {
        Self {
            windows: DashMap::new(),
            ceiling: AtomicU32::new(ceiling),
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling.load(Ordering::Relaxed)
    }

    /// Replace the ceiling; applies to the next permission check. Used by the
    /// poll loop to scale the limit together with the turbo multiplier.
    pub fn set_ceiling(&self, ceiling: u32) {
        self.ceiling.store(ceiling, Ordering::Relaxed);
        debug!("🚦 Rate ceiling set to {}/window", ceiling);
    }

    /// Admit or deny one call under `key`. Entries older than the window are
    /// evicted lazily before the check; the call is recorded only when
    /// admitted.
    pub fn permit(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) >= RATE_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        let ceiling = self.ceiling.load(Ordering::Relaxed) as usize;
        if window.len() < ceiling {
            window.push_back(now);
            true
        } else {
            debug!(
                "🚦 Rate ceiling reached for '{}' ({}/{} in window)",
                key,
                window.len(),
                ceiling
            );
            false
        }
    }

    /// Calls currently recorded in `key`'s window (without evicting)
    pub fn in_window(&self, key: &str) -> usize {
        self.windows.get(key).map(|w| w.len()).unwrap_or(0)
    }
}
