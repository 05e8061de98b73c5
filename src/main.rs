// src/main.rs
use balance_prospector::{
    config, utils, BalanceProbe, EndpointPool, FailoverExecutor, HealthMonitor,
    JsonFileStateStore, LiveBalanceQuery, PollConfig, PollLoop, ProspectorError, RateGovernor,
    SimulatedBalanceQuery, StateStore,
};
use clap::Parser;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Parser)]
#[command(
    name = "balance-prospector",
    about = "Resilient multi-endpoint RPC balance polling"
)]
struct Cli {
    /// Start in turbo mode (shorter cycle interval, scaled rate ceiling)
    #[arg(long)]
    turbo: bool,

    /// Run simulated queries instead of live RPC calls
    #[arg(long)]
    simulate: bool,

    /// Override the persisted state file path
    #[arg(long)]
    state_file: Option<String>,

    /// Address to query (base58), overrides WATCH_ADDRESS
    #[arg(long)]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::setup_logging().expect("Failed to initialize logging");
    let cli = Cli::parse();

    info!("🚀 balance-prospector starting...");
    let app_config = config::load_config()?;
    app_config.validate_and_log();

    let pool = Arc::new(EndpointPool::new(
        app_config.endpoints(),
        Duration::from_millis(app_config.rpc_timeout_ms),
    )?);

    let monitor = HealthMonitor::new(
        pool.clone(),
        Duration::from_secs(app_config.health_check_interval_secs),
        Duration::from_secs(app_config.probe_timeout_secs),
    );
    let monitor_handle = monitor.spawn();

    let governor = Arc::new(RateGovernor::new(app_config.rate_ceiling_per_min));
    let executor = Arc::new(FailoverExecutor::new(pool.clone()));

    let state_file = cli
        .state_file
        .clone()
        .unwrap_or_else(|| app_config.state_file.clone());
    let store: Arc<dyn StateStore> = Arc::new(JsonFileStateStore::new(&state_file));

    let probe: Arc<dyn BalanceProbe> = if cli.simulate || app_config.simulate {
        Arc::new(SimulatedBalanceQuery::new(Duration::from_millis(25)))
    } else {
        let address = cli
            .address
            .clone()
            .or_else(|| app_config.watch_address.clone())
            .ok_or_else(|| {
                ProspectorError::ConfigError(
                    "WATCH_ADDRESS (or --address) is required for live queries".to_string(),
                )
            })?;
        Arc::new(LiveBalanceQuery::parse(&address)?)
    };

    let poll_config = PollConfig {
        base_interval: Duration::from_millis(app_config.poll_interval_ms),
        turbo_multiplier: app_config.turbo_multiplier,
        base_rate_ceiling: app_config.rate_ceiling_per_min,
        stats_interval: Duration::from_millis(app_config.stats_interval_ms),
        persist_interval: Duration::from_millis(app_config.persist_interval_ms),
        governor_key: "poll".to_string(),
    };
    let poll = Arc::new(PollLoop::new(poll_config, executor, governor, store, probe));

    // Stand-in for the UI collaborator: log the statistics stream
    let mut stats_rx = poll.subscribe_stats();
    tokio::spawn(async move {
        loop {
            match stats_rx.recv().await {
                Ok(event) => info!(
                    "📊 attempts: {} | signal: {}",
                    event.attempts, event.throughput_signal
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Stats consumer lagging, skipped {} events", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let resume = poll.resume_attempts().await;
    poll.start(resume, cli.turbo).await;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received - shutting down");
    poll.stop().await;
    monitor_handle.abort();

    Ok(())
}
