//! Block list for vanilla chirp messages.

use crate::settings::ChirpConfig;
use std::collections::HashSet;

/// Vanilla electricity import complaints, blocked unless configured otherwise.
pub const DEFAULT_BLOCKED_PREFIX: &str = "Chirper.CITY_SERVICE_ELECTRICITY_IMPORT";

/// Decides which vanilla message keys are never published.
///
/// A key like `Chirper.GOOD_EDUCATION_SERVICE:2` is blocked when it is listed
/// exactly, or when its id (everything before the last `:`) is listed as a
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChirpFilter {
    exact: HashSet<String>,
    prefixes: HashSet<String>,
}

impl ChirpFilter {
    pub fn new<I, J>(exact: I, prefixes: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            exact: exact.into_iter().collect(),
            prefixes: prefixes.into_iter().collect(),
        }
    }

    pub fn from_config(config: &ChirpConfig) -> Self {
        Self::new(
            config.blocked_keys.iter().cloned(),
            config.blocked_prefixes.iter().cloned(),
        )
    }

    pub fn is_blocked(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        if self.exact.contains(key) {
            return true;
        }
        let id = key.rsplit_once(':').map_or(key, |(id, _)| id);
        self.prefixes.contains(id)
    }
}
