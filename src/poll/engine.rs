// src/poll/engine.rs
//! The bounded polling loop.
//!
//! Outer scheduler over the failover executor: one logical balance query per
//! cycle, admission-checked by the rate governor, with turbo cadence,
//! periodic state persistence and a fixed-cadence statistics stream. Cycles
//! of one loop instance never overlap; all mutable counters are owned by the
//! instance.

use crate::error::ProspectorError;
use crate::poll::state::{PollState, StateStore};
use crate::poll::stats::{throughput_signal, StatsEvent};
use crate::query::BalanceProbe;
use crate::rpc::failover::FailoverExecutor;
use crate::rpc::governor::RateGovernor;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Instant};

#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Inter-cycle delay in the conservative profile
    pub base_interval: Duration,
    /// Turbo divides the interval and multiplies the rate ceiling by this
    pub turbo_multiplier: u32,
    /// Governor ceiling per rolling window in the conservative profile
    pub base_rate_ceiling: u32,
    /// Cadence of the statistics stream, independent of call cadence
    pub stats_interval: Duration,
    /// Cadence of state persistence while running
    pub persist_interval: Duration,
    /// Governor key; share it across loop instances to pool their budget
    pub governor_key: String,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(2000),
            turbo_multiplier: 10,
            base_rate_ceiling: 10,
            stats_interval: Duration::from_millis(1000),
            persist_interval: Duration::from_millis(5000),
            governor_key: "poll".to_string(),
        }
    }
}

/// `Idle -> Running -> Idle`. Stopped is not distinguished from Idle and
/// there is no paused state.
pub struct PollLoop {
    config: PollConfig,
    executor: Arc<FailoverExecutor>,
    governor: Arc<RateGovernor>,
    store: Arc<dyn StateStore>,
    probe: Arc<dyn BalanceProbe>,
    attempts: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    // Bumped on every start; tasks from an earlier run retire when their
    // generation goes stale, even across an immediate stop/start pair
    generation: Arc<AtomicU64>,
    turbo: Arc<AtomicBool>,
    started_at: Arc<Mutex<Option<Instant>>>,
    wake: Arc<Notify>,
    // Serializes snapshot writes so a periodic save can never land after the
    // final stop() save and resurrect a stale running flag
    save_gate: Arc<Mutex<()>>,
    stats_tx: broadcast::Sender<StatsEvent>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PollLoop {
    pub fn new(
        config: PollConfig,
        executor: Arc<FailoverExecutor>,
        governor: Arc<RateGovernor>,
        store: Arc<dyn StateStore>,
        probe: Arc<dyn BalanceProbe>,
    ) -> Self {
        let (stats_tx, _) = broadcast::channel(64);
        Self {
            config,
            executor,
            governor,
            store,
            probe,
            attempts: Arc::new(AtomicU64::new(0)),
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            turbo: Arc::new(AtomicBool::new(false)),
            started_at: Arc::new(Mutex::new(None)),
            wake: Arc::new(Notify::new()),
            save_gate: Arc::new(Mutex::new(())),
            stats_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe_stats(&self) -> broadcast::Receiver<StatsEvent> {
        self.stats_tx.subscribe()
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Read the persisted snapshot and return the attempt count to resume
    /// from. Load failures are logged and treated as a fresh start.
    pub async fn resume_attempts(&self) -> u64 {
        match self.store.load().await {
            Ok(Some(state)) => {
                info!(
                    "💾 Restored poll state: {} attempts (was running: {})",
                    state.attempt_count, state.is_running
                );
                state.attempt_count
            }
            Ok(None) => 0,
            Err(err) => {
                warn!("⚠️ Failed to load persisted poll state, starting fresh: {:#}", err);
                0
            }
        }
    }

    /// Applies on the next scheduling decision, not retroactively.
    pub fn set_turbo(&self, on: bool) {
        self.turbo.store(on, Ordering::SeqCst);
        self.apply_rate_ceiling(on);
        info!("⚡ Turbo mode {}", if on { "enabled" } else { "disabled" });
    }

    pub fn is_turbo(&self) -> bool {
        self.turbo.load(Ordering::SeqCst)
    }

    fn apply_rate_ceiling(&self, turbo: bool) {
        let ceiling = if turbo {
            self.config.base_rate_ceiling * self.config.turbo_multiplier
        } else {
            self.config.base_rate_ceiling
        };
        self.governor.set_ceiling(ceiling);
    }

    fn effective_interval(config: &PollConfig, turbo: bool) -> Duration {
        if turbo {
            config.base_interval / config.turbo_multiplier
        } else {
            config.base_interval
        }
    }

    /// Idle -> Running. The attempt counter resumes at
    /// `resume_attempt_count`; the first cycle is scheduled immediately.
    /// Starting an already-running loop is a warning-level no-op.
    pub async fn start(&self, resume_attempt_count: u64, turbo: bool) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Poll loop already running - ignoring start request");
            return;
        }

        self.attempts.store(resume_attempt_count, Ordering::SeqCst);
        self.turbo.store(turbo, Ordering::SeqCst);
        self.apply_rate_ceiling(turbo);
        *self.started_at.lock().await = Some(Instant::now());
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        info!(
            "🚀 Poll loop started (resumed attempts: {}, turbo: {})",
            resume_attempt_count, turbo
        );

        let mut tasks = self.tasks.lock().await;
        tasks.push(self.spawn_cycles(generation));
        tasks.push(self.spawn_tickers(generation));
    }

    /// Running -> Idle. Cancels future cycles only: a call already in flight
    /// runs to completion and its outcome is still reported to the pool. The
    /// final snapshot (with `is_running: false`) is written before this
    /// returns, so a crash right after stop can never resurrect a stale
    /// running flag.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Poll loop already idle - ignoring stop request");
            return;
        }
        self.wake.notify_waiters();

        let state = {
            let _gate = self.save_gate.lock().await;
            let state = PollState::now(false, self.attempts.load(Ordering::SeqCst));
            if let Err(err) = self.store.save(&state).await {
                warn!("⚠️ Failed to persist final poll state: {:#}", err);
            }
            state
        };

        // Detach the background tasks; the cycle task exits after any
        // in-flight call completes, the ticker exits on the wake signal.
        self.tasks.lock().await.clear();

        info!("🛑 Poll loop stopped after {} attempts", state.attempt_count);
    }

    fn spawn_cycles(&self, generation: u64) -> JoinHandle<()> {
        let config = self.config.clone();
        let executor = self.executor.clone();
        let governor = self.governor.clone();
        let probe = self.probe.clone();
        let attempts = self.attempts.clone();
        let running = self.running.clone();
        let current_generation = self.generation.clone();
        let turbo = self.turbo.clone();
        let wake = self.wake.clone();

        tokio::spawn(async move {
            let live = || {
                running.load(Ordering::SeqCst)
                    && current_generation.load(Ordering::SeqCst) == generation
            };
            while live() {
                if governor.permit(&config.governor_key) {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    let probe = probe.clone();
                    let result = executor
                        .execute(|handle| {
                            let probe = probe.clone();
                            async move { probe.query(handle).await }
                        })
                        .await;
                    match result {
                        Ok(balance) => debug!("Cycle complete, balance: {} lamports", balance),
                        Err(ProspectorError::Exhausted { attempts, last_error }) => {
                            warn!(
                                "Cycle exhausted its retries ({} attempts): {}",
                                attempts, last_error
                            );
                        }
                        Err(err) => warn!("Cycle failed: {}", err),
                    }
                } else {
                    // Denial slows the loop down rather than erroring
                    debug!("🚦 Cycle skipped - self-imposed rate ceiling reached");
                }

                if !live() {
                    break;
                }
                let delay = Self::effective_interval(&config, turbo.load(Ordering::SeqCst));
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = wake.notified() => {}
                }
            }
            debug!("Poll cycle task exited");
        })
    }

    fn spawn_tickers(&self, generation: u64) -> JoinHandle<()> {
        let config = self.config.clone();
        let store = self.store.clone();
        let attempts = self.attempts.clone();
        let running = self.running.clone();
        let current_generation = self.generation.clone();
        let started_at = self.started_at.clone();
        let stats_tx = self.stats_tx.clone();
        let wake = self.wake.clone();
        let save_gate = self.save_gate.clone();

        tokio::spawn(async move {
            let live = || {
                running.load(Ordering::SeqCst)
                    && current_generation.load(Ordering::SeqCst) == generation
            };
            let mut stats_tick = interval(config.stats_interval);
            let mut persist_tick = interval(config.persist_interval);
            // Both intervals fire immediately on the first tick; swallow
            // those so the cadence starts one period from now
            stats_tick.tick().await;
            persist_tick.tick().await;

            while live() {
                tokio::select! {
                    _ = stats_tick.tick() => {
                        let elapsed = match *started_at.lock().await {
                            Some(t) => t.elapsed(),
                            None => Duration::ZERO,
                        };
                        let event = StatsEvent {
                            attempts: attempts.load(Ordering::SeqCst),
                            throughput_signal: throughput_signal(elapsed),
                        };
                        let _ = stats_tx.send(event);
                    }
                    _ = persist_tick.tick() => {
                        let _gate = save_gate.lock().await;
                        if !live() {
                            break;
                        }
                        let state = PollState::now(true, attempts.load(Ordering::SeqCst));
                        if let Err(err) = store.save(&state).await {
                            // Never halts the loop
                            warn!("⚠️ Failed to persist poll state: {:#}", err);
                        }
                    }
                    _ = wake.notified() => {}
                }
            }
            debug!("Poll ticker task exited");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_turbo_scales_the_interval_down() {
        let config = PollConfig::default();
        assert_eq!(
            PollLoop::effective_interval(&config, false),
            Duration::from_millis(2000)
        );
        assert_eq!(
            PollLoop::effective_interval(&config, true),
            Duration::from_millis(200)
        );
    }
}
