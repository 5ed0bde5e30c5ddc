//! # Fable Engine
//!
//! Headless entry point for Fable.
//!
//! Loads the configuration and content catalog, builds the party and plays
//! the configured encounters one after another:
//! - Config: `fable.toml` or `$FABLE_CONFIG`
//! - Content: built-in TOML catalog unless `content_path` is set
//! - Session: party, world enemies, save store and the running battle

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod config;
mod content;
mod session;

use anyhow::{Context, Result};
use fable_battle::Combatant;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::EngineConfig;
use crate::session::Session;

/// Set to emit logs as JSON lines.
const JSON_LOG_ENV: &str = "FABLE_LOG_JSON";

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    let json = std::env::var_os(JSON_LOG_ENV).is_some();
    tracing_subscriber::registry()
        .with(json.then(|| fmt::layer().json()))
        .with((!json).then(fmt::layer))
        .with(EnvFilter::from_default_env().add_directive("fable=info".parse()?))
        .init();

    info!("Fable starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = EngineConfig::load();
    config.validate();

    let mut session = Session::boot(&config)?;

    for reference in &config.encounters {
        match session.run_encounter(reference) {
            Ok(Some(outcome)) => info!("{reference}: {outcome:?}"),
            Ok(None) => warn!("{reference}: no battle took place"),
            Err(e) => warn!("Skipping encounter {reference}: {e}"),
        }
    }

    let tally = session.tally();
    let cleared = session.world().iter().filter(|e| e.is_defeated()).count();
    info!(
        "Encounters done: {} won, {} lost, {} fled, {cleared} enemies cleared",
        tally.victories, tally.defeats, tally.flights
    );
    if let Some(heroes) = session.heroes() {
        for hero in heroes.members() {
            let stats = hero.stats();
            info!(
                "{}: level {}, {}/{} hp, {} exp",
                hero.name(),
                stats.level(),
                stats.hp(),
                stats.max_hp(),
                stats.experience()
            );
        }
    }

    if let Some(path) = &config.save_path {
        session
            .write_save(path)
            .with_context(|| format!("writing save to {}", path.display()))?;
    }

    info!("Fable shutdown complete");
    Ok(())
}
