//! Plugin configuration and the runtime-tunable settings derived from it.

use crate::filter::DEFAULT_BLOCKED_PREFIX;
use payload_bus::{AdmissionPolicy, BusConfig};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

fn default_use_markers() -> bool {
    true
}

fn default_blocked_prefixes() -> Vec<String> {
    vec![DEFAULT_BLOCKED_PREFIX.to_string()]
}

/// The `[chirps]` table of the application config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpConfig {
    /// Hide every chirp that did not come through the plugin.
    #[serde(default)]
    pub disable_vanilla_chirps: bool,
    /// Route posts through placeholder tokens instead of heuristics alone.
    #[serde(default = "default_use_markers")]
    pub use_markers: bool,
    /// Vanilla message keys that are never published.
    #[serde(default)]
    pub blocked_keys: Vec<String>,
    /// Vanilla message ids (key without its `:index` suffix) never published.
    #[serde(default = "default_blocked_prefixes")]
    pub blocked_prefixes: Vec<String>,
}

impl Default for ChirpConfig {
    fn default() -> Self {
        Self {
            disable_vanilla_chirps: false,
            use_markers: default_use_markers(),
            blocked_keys: Vec::new(),
            blocked_prefixes: default_blocked_prefixes(),
        }
    }
}

/// Settings an operator may change while the host runs.
#[derive(Debug)]
pub struct ChirpSettings {
    disable_vanilla_chirps: AtomicBool,
    admission_percent: AtomicI32,
}

impl ChirpSettings {
    pub fn new(disable_vanilla_chirps: bool, admission_percent: i32) -> Self {
        Self {
            disable_vanilla_chirps: AtomicBool::new(disable_vanilla_chirps),
            admission_percent: AtomicI32::new(admission_percent.clamp(0, 100)),
        }
    }

    pub fn from_config(chirps: &ChirpConfig, bus: &BusConfig) -> Self {
        Self::new(chirps.disable_vanilla_chirps, bus.vanilla_admission_percent)
    }

    pub fn disable_vanilla_chirps(&self) -> bool {
        self.disable_vanilla_chirps.load(Ordering::Relaxed)
    }

    pub fn set_disable_vanilla_chirps(&self, disabled: bool) {
        self.disable_vanilla_chirps.store(disabled, Ordering::Relaxed);
    }

    pub fn set_admission_percent(&self, percent: i32) {
        self.admission_percent
            .store(percent.clamp(0, 100), Ordering::Relaxed);
    }
}

impl AdmissionPolicy for ChirpSettings {
    fn admission_percent(&self) -> i32 {
        self.admission_percent.load(Ordering::Relaxed)
    }
}
