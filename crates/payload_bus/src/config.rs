//! Bus configuration, loaded as the `[bus]` table of the application config.

use crate::cache::DEFAULT_WINDOW_SIZE;
use serde::{Deserialize, Serialize};

fn default_text_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_admission_percent() -> i32 {
    100
}

fn default_orphan_sweep_interval() -> u64 {
    60
}

/// Tunables of a [`PayloadBus`](crate::PayloadBus).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusConfig {
    /// Number of generated texts kept in the sliding window.
    #[serde(default = "default_text_window_size")]
    pub text_window_size: usize,
    /// Percentage of unmatched host events that survive admission (0-100).
    #[serde(default = "default_admission_percent")]
    pub vanilla_admission_percent: i32,
    /// Fixed sampler seed; seeded from the clock when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    /// Ticks between orphan placeholder sweeps (0 disables sweeping).
    #[serde(default = "default_orphan_sweep_interval")]
    pub orphan_sweep_interval_ticks: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            text_window_size: default_text_window_size(),
            vanilla_admission_percent: default_admission_percent(),
            rng_seed: None,
            orphan_sweep_interval_ticks: default_orphan_sweep_interval(),
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.text_window_size == 0 {
            return Err("Text window size must be at least 1".to_string());
        }
        if !(0..=100).contains(&self.vanilla_admission_percent) {
            return Err(format!(
                "Vanilla admission percent must be within 0..=100, got {}",
                self.vanilla_admission_percent
            ));
        }
        Ok(())
    }
}
