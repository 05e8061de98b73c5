// src/utils/mod.rs
use log::info;
use std::env;

/// Initialize the fern dispatch. `LOG_LEVEL` overrides the default `Info`
/// level; noisy upstream targets stay at `Warn` either way.
pub fn setup_logging() -> Result<(), fern::InitError> {
    let level = env::var("LOG_LEVEL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("solana_client", log::LevelFilter::Warn)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .apply()?;
    info!("Logging initialized.");
    Ok(())
}
