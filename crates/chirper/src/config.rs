//! Configuration management for the chirper demo host.
//!
//! The TOML file has one table per concern: `[bus]` and `[chirps]` configure
//! the plugin, `[simulation]` drives the simulated city and `[logging]` the
//! subscriber. Every key has a default, so a partial file is valid.

use custom_chirps::ChirpConfig;
use payload_bus::BusConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

fn default_tick_interval() -> u64 {
    50 // 20 ticks per second
}

fn default_producer_threads() -> usize {
    2
}

fn default_posts_per_producer() -> u64 {
    25
}

fn default_vanilla_chirps_per_tick() -> usize {
    1
}

fn default_buildings() -> usize {
    8
}

fn default_stats_interval() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub chirps: ChirpConfig,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Drives the simulated city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Host tick interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Ticks to run before shutting down (0 runs until a signal arrives)
    #[serde(default)]
    pub max_ticks: u64,
    /// Threads posting chirps through the producer API
    #[serde(default = "default_producer_threads")]
    pub producer_threads: usize,
    #[serde(default = "default_posts_per_producer")]
    pub posts_per_producer: u64,
    /// Chirps the host makes on its own every tick
    #[serde(default = "default_vanilla_chirps_per_tick")]
    pub vanilla_chirps_per_tick: usize,
    /// Buildings available as link targets
    #[serde(default = "default_buildings")]
    pub buildings: usize,
    /// Ticks between bus statistics reports
    #[serde(default = "default_stats_interval")]
    pub stats_interval_ticks: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            max_ticks: 0,
            producer_threads: default_producer_threads(),
            posts_per_producer: default_posts_per_producer(),
            vanilla_chirps_per_tick: default_vanilla_chirps_per_tick(),
            buildings: default_buildings(),
            stats_interval_ticks: default_stats_interval(),
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration there and
    /// returns it.
    pub async fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.bus.validate()?;

        if self.simulation.tick_interval_ms == 0 {
            return Err("Tick interval must be greater than zero".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
