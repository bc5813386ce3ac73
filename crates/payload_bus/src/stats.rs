use crate::types::HeuristicStrategy;
use serde::{Deserialize, Serialize};

/// Counters describing what the bus has done since it was created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStats {
    /// Payloads accepted by the heuristic index.
    pub enqueued: u64,
    /// Payloads routed through a placeholder token.
    pub marker_posts: u64,
    pub matched_token: u64,
    pub matched_exact_target: u64,
    pub matched_variant: u64,
    pub matched_producer: u64,
    pub unmatched_admitted: u64,
    pub unmatched_rejected: u64,
    pub invalid_producers: u64,
    pub unresolved_tokens: u64,
    pub orphans_reclaimed: u64,
    pub texts_evicted: u64,
}

impl BusStats {
    pub(crate) fn record_heuristic(&mut self, strategy: HeuristicStrategy) {
        match strategy {
            HeuristicStrategy::ExactTarget => self.matched_exact_target += 1,
            HeuristicStrategy::Variant => self.matched_variant += 1,
            HeuristicStrategy::Producer => self.matched_producer += 1,
        }
    }

    /// Every payload claimed by any strategy.
    pub fn total_matched(&self) -> u64 {
        self.matched_token
            + self.matched_exact_target
            + self.matched_variant
            + self.matched_producer
    }
}
