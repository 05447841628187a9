//! # Keepfall
//!
//! Runs one headless Keepfall session: loads `keepfall.toml` (or the path
//! given as the first argument), generates a level and plays it with the
//! autopilot.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use keepfall_engine::assets::AssetRegistry;
use keepfall_engine::config::{EngineConfig, CONFIG_FILE};
use keepfall_engine::session::Session;

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("keepfall=info".parse()?))
        .init();

    info!("Keepfall starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = EngineConfig::load_from(&config_path);
    config.validate();

    let assets = AssetRegistry::with_standard_assets(&config.asset_root);
    let mut session = Session::new(&config, &assets)?;
    let summary = session.run();

    info!(
        "Seed {}: {:?}, {} kills, {} damage taken, {} chests, {} hp left",
        summary.seed,
        summary.outcome,
        summary.stats.kills,
        summary.stats.damage_taken,
        summary.stats.chests_opened,
        summary.player_hp
    );
    info!("Keepfall shutdown complete");
    Ok(())
}
