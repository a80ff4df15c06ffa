//! # Brawl Engine
//!
//! Headless runner for the brawl combat core.
//!
//! Reads `brawl.toml` (or the path given as the first argument), sets up
//! logging, then plays one of the modes. `brawl --init [path]` writes the
//! default config instead.
//!
//! - `versus`: a best-of match against one AI
//! - `audit`: a gauntlet of random enemies
//! - `training`: an untimed session against a pinned dummy
//! - `tower`: a ten-floor ladder ending in a boss

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;
mod display;
mod timing;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{EngineConfig, LogFormat, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut path = args.next().unwrap_or_else(|| CONFIG_FILE.to_string());
    let write_defaults = path == "--init";
    if write_defaults {
        path = args.next().unwrap_or_else(|| CONFIG_FILE.to_string());
    }

    // Logging depends on the file, so peek at it before anything can log
    let format = match EngineConfig::read(&path) {
        Ok(Some(config)) => config.log_format,
        _ => LogFormat::default(),
    };

    let filter = EnvFilter::from_default_env().add_directive("brawl=info".parse()?);
    match format {
        LogFormat::Pretty => tracing_subscriber::registry().with(fmt::layer()).with(filter).init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    info!("Brawl starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if write_defaults {
        EngineConfig::default()
            .save_to(&path)
            .with_context(|| format!("failed to write {path}"))?;
        return Ok(());
    }

    let config = EngineConfig::load_from(&path);

    let summary = app::run(&config).context("run failed")?;
    info!(
        outcome = ?summary.outcome,
        score = summary.score,
        rounds = summary.rounds,
        cleared = summary.stages_cleared,
        total = summary.stages_total,
        hits_landed = summary.hits_landed,
        hits_taken = summary.hits_taken,
        simulated = summary.simulated,
        "Run complete"
    );
    info!("{}", serde_json::to_string(&summary).context("failed to encode summary")?);

    info!("Brawl shutdown complete");
    Ok(())
}
