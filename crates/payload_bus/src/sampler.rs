//! Admission sampling for events no payload claimed.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Probabilistic pass/drop filter for unmatched host events.
///
/// The generator is seeded once, with a non-zero seed, and lives as long as the
/// sampler. Only the consumer thread draws from it, so the lock never contends.
#[derive(Debug)]
pub struct AdmissionSampler {
    rng: Mutex<StdRng>,
    seed: u64,
}

impl AdmissionSampler {
    /// Seeds from the wall clock.
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default();
        Self::with_seed(seed)
    }

    /// Seeds deterministically. A zero seed is replaced with `1`.
    pub fn with_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 1 } else { seed };
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Decides whether one unmatched event survives.
    ///
    /// `percent <= 0` always rejects and `percent >= 100` always admits without
    /// drawing. Otherwise a uniform roll in `0..100` admits iff it is below
    /// `percent`.
    pub fn admit(&self, percent: i32) -> bool {
        if percent <= 0 {
            return false;
        }
        if percent >= 100 {
            return true;
        }
        let roll: i32 = self.rng.lock().gen_range(0..100);
        roll < percent
    }
}

impl Default for AdmissionSampler {
    fn default() -> Self {
        Self::new()
    }
}
