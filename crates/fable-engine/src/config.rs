//! Engine configuration.
//!
//! Provides the content source, simulation pacing, the party and scripted
//! encounters, and the battle tunables. Configuration can be loaded from and
//! saved to a TOML file.

use fable_battle::BattleConfig;
use fable_common::ContentRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "fable.toml";

/// Environment variable overriding the configuration file location.
const CONFIG_ENV: &str = "FABLE_CONFIG";

/// Engine configuration parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Content Settings ===
    /// Content catalog file (None = built-in content)
    pub content_path: Option<PathBuf>,
    /// Where to dump the save store on exit (None = don't)
    pub save_path: Option<PathBuf>,

    // === Simulation Settings ===
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Tick budget per encounter before giving up
    pub max_ticks: u32,
    /// Per-subscriber event queue capacity
    pub event_capacity: usize,

    // === Party Settings ===
    /// Heroes in the party, leader first
    pub party: Vec<ContentRef>,
    /// Enemies met in order
    pub encounters: Vec<ContentRef>,
    /// Leader hp fraction below which the autopilot runs (0.0 = never)
    pub flee_below: f32,

    // === Battle Settings ===
    /// Battle timing, layout and progression
    pub battle: BattleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Content
            content_path: None,
            save_path: None,

            // Simulation
            tick_rate: 60,
            max_ticks: 20_000,
            event_capacity: 1024,

            // Party
            party: vec!["hero.ada".into(), "hero.bram".into()],
            encounters: vec!["enemy.slime".into(), "enemy.goblin".into()],
            flee_below: 0.0,

            // Battle
            battle: BattleConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the configuration file path: `$FABLE_CONFIG`, else `fable.toml`
    /// in the working directory.
    fn config_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        // Simulation
        self.tick_rate = self.tick_rate.clamp(1, 1000);
        self.max_ticks = self.max_ticks.clamp(100, 10_000_000);
        self.event_capacity = self.event_capacity.clamp(16, 65_536);

        // Party
        self.flee_below = self.flee_below.clamp(0.0, 1.0);
        if self.party.is_empty() {
            warn!("Empty party configured, using the default party");
            self.party = Self::default().party;
        }

        // Battle
        self.battle.validate();
    }

    /// Seconds per tick.
    #[must_use]
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}
