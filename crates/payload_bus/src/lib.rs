//! # Payload Bus
//!
//! A deferred payload dispatch bus. Producers queue a payload (a text key plus
//! optional sender, target and display name) and then ask the host to create
//! an event. The host creates the event later, asynchronously, and hands it to
//! a consumer. The bus pairs each created event with the payload it was meant
//! for, so every payload is claimed at most once and every unmatched event is
//! either admitted or dropped by a configurable sampling filter.
//!
//! ## Correlation Paths
//!
//! - **Token path**: the producer passes a placeholder entity carrying a
//!   [`CorrelationToken`] as the creation target. The consumer finds the
//!   placeholder in the event's links and claims the payload bound to it.
//! - **Heuristic path**: exact target match, then a variant-aware scored
//!   match, then producer-only FIFO. Used when no placeholder is found.
//!
//! ## Components
//!
//! - [`MatchingIndex`]: pending queue with target and producer indices
//! - [`TokenTable`]: token bindings and live placeholders
//! - [`TextWindow`]: bounded FIFO store for generated display texts
//! - [`AdmissionSampler`]: pass/drop filter for unmatched events
//! - [`PayloadBus`]: the thread-safe facade tying them together
//!
//! ## Quick Start
//!
//! ```rust
//! use payload_bus::*;
//!
//! let bus = create_payload_bus(&BusConfig::default());
//! let template = Entity(7);
//!
//! bus.enqueue(template, Some(Entity(99)), PayloadBody::new("power-outage"))
//!     .unwrap();
//!
//! let created = CreatedEvent { id: Entity(500), producer: template, sender: None };
//! let mut links = vec![Entity(99)];
//! let resolution = bus.resolve(&created, &mut links, &NullHost);
//!
//! assert_eq!(resolution.body().map(|b| b.text_key.as_str()), Some("power-outage"));
//! ```

use std::sync::Arc;

pub mod bus;
pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod index;
pub mod sampler;
pub mod stats;
pub mod token;
pub mod types;

pub use bus::PayloadBus;
pub use cache::{TextWindow, DEFAULT_WINDOW_SIZE};
pub use config::BusConfig;
pub use error::BusError;
pub use host::{
    AdmissionPolicy, FixedAdmission, LinkSlots, NoVariants, NullHost, PlaceholderStore,
    SharedAdmission, VariantLookup,
};
pub use index::{IndexSizes, MatchingIndex, PendingItem};
pub use sampler::AdmissionSampler;
pub use stats::BusStats;
pub use token::{LiveMarker, PlaceholderHit, TokenCounter, TokenTable};
pub use types::{
    CorrelationToken, CreatedEvent, Entity, HeuristicStrategy, Marker, PayloadBody, Resolution,
    Ticket,
};

/// Creates a shared bus from `config` with a fixed admission percentage.
pub fn create_payload_bus(config: &BusConfig) -> Arc<PayloadBus> {
    Arc::new(PayloadBus::new(config))
}

/// Creates a shared bus that reads its admission percentage from `policy`.
pub fn create_payload_bus_with_policy(
    config: &BusConfig,
    policy: Arc<dyn AdmissionPolicy>,
) -> Arc<PayloadBus> {
    Arc::new(PayloadBus::with_policy(config, policy))
}
