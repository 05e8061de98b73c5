//! End-to-end tests for the assembled poll loop: failover executor, rate
//! governor and state store wired together, driven under paused time.

use async_trait::async_trait;
use balance_prospector::{
    BalanceProbe, EndpointConfig, EndpointHandle, EndpointPool, FailoverExecutor,
    MemoryStateStore, PollConfig, PollLoop, RateGovernor,
};
use balance_prospector::poll::{SIGNAL_CEILING, SIGNAL_FLOOR};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

struct InstantBalance;

#[async_trait]
impl BalanceProbe for InstantBalance {
    async fn query(&self, _handle: EndpointHandle) -> anyhow::Result<u64> {
        Ok(0)
    }
}

struct SlowBalance(Duration);

#[async_trait]
impl BalanceProbe for SlowBalance {
    async fn query(&self, _handle: EndpointHandle) -> anyhow::Result<u64> {
        sleep(self.0).await;
        Ok(0)
    }
}

fn build_loop(
    config: PollConfig,
    store: Arc<MemoryStateStore>,
    probe: Arc<dyn BalanceProbe>,
) -> (Arc<PollLoop>, Arc<RateGovernor>) {
    let endpoints = vec![
        EndpointConfig {
            url: "http://rpc-0.invalid".to_string(),
            weight: 2,
        },
        EndpointConfig {
            url: "http://rpc-1.invalid".to_string(),
            weight: 1,
        },
    ];
    let pool = Arc::new(EndpointPool::new(endpoints, Duration::from_millis(100)).unwrap());
    let governor = Arc::new(RateGovernor::new(config.base_rate_ceiling));
    let executor = Arc::new(FailoverExecutor::new(pool));
    let poll = Arc::new(PollLoop::new(
        config,
        executor,
        governor.clone(),
        store,
        probe,
    ));
    (poll, governor)
}

#[tokio::test(start_paused = true)]
async fn stop_then_start_resumes_the_attempt_counter() {
    let store = Arc::new(MemoryStateStore::new());
    let (poll, _governor) = build_loop(PollConfig::default(), store.clone(), Arc::new(InstantBalance));

    poll.start(5, false).await;
    sleep(Duration::from_millis(4100)).await; // a few cycles at 2000ms cadence
    poll.stop().await;

    let after_stop = poll.attempts();
    assert!(after_stop > 5, "cycles should have advanced the resumed counter");
    assert!(!poll.is_running());

    let saved = store.current().await.expect("stop always writes a snapshot");
    assert_eq!(saved.attempt_count, after_stop);
    assert!(!saved.is_running);

    // Restart resumes exactly where the caller says, never at zero
    poll.start(42, false).await;
    assert_eq!(poll.attempts(), 42);
    poll.stop().await;
}

#[tokio::test(start_paused = true)]
async fn final_snapshot_is_not_running_even_with_a_call_in_flight() {
    let store = Arc::new(MemoryStateStore::new());
    let (poll, _governor) = build_loop(
        PollConfig::default(),
        store.clone(),
        Arc::new(SlowBalance(Duration::from_millis(500))),
    );

    poll.start(0, false).await;
    sleep(Duration::from_millis(100)).await; // first call is now in flight
    poll.stop().await;

    let saved = store.current().await.expect("stop always writes a snapshot");
    assert!(!saved.is_running);
    assert_eq!(saved.attempt_count, 1);
}

#[tokio::test(start_paused = true)]
async fn turbo_scales_cadence_and_governor_ceiling_together() {
    let store = Arc::new(MemoryStateStore::new());
    let (poll, governor) = build_loop(PollConfig::default(), store, Arc::new(InstantBalance));

    poll.start(0, true).await;
    assert_eq!(governor.ceiling(), 100); // 10/min base x10 multiplier

    // One second of turbo at 200ms cadence fits several cycles; the
    // conservative cadence would have managed barely one
    sleep(Duration::from_millis(1050)).await;
    assert!(poll.attempts() >= 5, "got {} attempts", poll.attempts());

    poll.set_turbo(false);
    assert_eq!(governor.ceiling(), 10);

    poll.stop().await;
}

#[tokio::test(start_paused = true)]
async fn governor_denial_slows_the_loop_without_erroring() {
    let store = Arc::new(MemoryStateStore::new());
    let config = PollConfig {
        base_rate_ceiling: 2,
        ..PollConfig::default()
    };
    let (poll, _governor) = build_loop(config, store, Arc::new(InstantBalance));

    poll.start(0, false).await;
    sleep(Duration::from_millis(10_100)).await;

    // Only two calls fit the window; denied cycles skip the call but keep
    // the loop alive
    assert_eq!(poll.attempts(), 2);
    assert!(poll.is_running());

    // Once the window rolls over, calls get through again
    sleep(Duration::from_secs(55)).await;
    assert!(poll.attempts() > 2);

    poll.stop().await;
}

#[tokio::test(start_paused = true)]
async fn stats_stream_reports_attempts_and_a_bounded_signal() {
    let store = Arc::new(MemoryStateStore::new());
    let (poll, _governor) = build_loop(PollConfig::default(), store, Arc::new(InstantBalance));

    let mut stats = poll.subscribe_stats();
    poll.start(0, false).await;
    sleep(Duration::from_millis(3100)).await;
    poll.stop().await;

    let mut events = 0;
    while let Ok(event) = stats.try_recv() {
        events += 1;
        assert!(
            (SIGNAL_FLOOR..=SIGNAL_CEILING).contains(&event.throughput_signal),
            "signal {} out of band",
            event.throughput_signal
        );
        assert!(event.attempts >= 1);
    }
    assert!(events >= 3, "expected one event per stats interval, got {}", events);
}
