//! # Host Collaborator Interfaces
//!
//! The bus never owns host state. Everything it needs from the host
//! application goes through the traits in this module:
//!
//! - [`PlaceholderStore`] - create and destroy the ephemeral placeholder entities
//!   used by the token path
//! - [`VariantLookup`] - which concrete producers an umbrella template may spawn
//! - [`AdmissionPolicy`] - the operator-configured admission percentage
//! - [`LinkSlots`] - the reference list the host attached to a created event

use crate::error::BusError;
use crate::types::{Entity, Marker};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, Ordering};

/// Host entity storage as seen by the token path.
pub trait PlaceholderStore: Send + Sync {
    /// Materializes a placeholder entity carrying `marker`.
    fn spawn_placeholder(&self, marker: Marker) -> Result<Entity, BusError>;

    /// Reads the marker of `entity`, or `None` if it is not a live placeholder.
    fn read_marker(&self, entity: Entity) -> Option<Marker>;

    /// Destroys a placeholder. Destroying an unknown entity is a no-op.
    fn destroy_placeholder(&self, placeholder: Entity);

    /// Whether anything in the host (a queued creation request or a live
    /// event's reference list) still points at `placeholder`.
    fn is_referenced(&self, placeholder: Entity) -> bool;
}

/// Reports which concrete producers an umbrella template can spawn.
pub trait VariantLookup {
    /// Concrete producers `umbrella` may spawn instead of itself.
    fn variants_of(&self, umbrella: Entity) -> Vec<Entity>;

    /// Whether `variant` is one of the producers `umbrella` may spawn.
    fn covers(&self, umbrella: Entity, variant: Entity) -> bool {
        self.variants_of(umbrella).contains(&variant)
    }
}

/// Lookup for hosts without umbrella templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariants;

impl VariantLookup for NoVariants {
    fn variants_of(&self, _umbrella: Entity) -> Vec<Entity> {
        Vec::new()
    }

    fn covers(&self, _umbrella: Entity, _variant: Entity) -> bool {
        false
    }
}

/// A host that offers neither placeholders nor variants.
///
/// Useful for heuristic-only correlation. Spawning a placeholder fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl PlaceholderStore for NullHost {
    fn spawn_placeholder(&self, _marker: Marker) -> Result<Entity, BusError> {
        Err(BusError::PlaceholderUnavailable(
            "host has no placeholder storage".to_string(),
        ))
    }

    fn read_marker(&self, _entity: Entity) -> Option<Marker> {
        None
    }

    fn destroy_placeholder(&self, _placeholder: Entity) {}

    fn is_referenced(&self, _placeholder: Entity) -> bool {
        false
    }
}

impl VariantLookup for NullHost {
    fn variants_of(&self, _umbrella: Entity) -> Vec<Entity> {
        Vec::new()
    }

    fn covers(&self, _umbrella: Entity, _variant: Entity) -> bool {
        false
    }
}

impl VariantLookup for HashMap<Entity, Vec<Entity>> {
    fn variants_of(&self, umbrella: Entity) -> Vec<Entity> {
        self.get(&umbrella).cloned().unwrap_or_default()
    }

    fn covers(&self, umbrella: Entity, variant: Entity) -> bool {
        self.get(&umbrella)
            .is_some_and(|variants| variants.contains(&variant))
    }
}

/// Source of the percentage of unmatched events that survive admission.
pub trait AdmissionPolicy: Send + Sync {
    /// Percentage in `0..=100`; values outside are clamped by the sampler.
    fn admission_percent(&self) -> i32;
}

/// A policy that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdmission(pub i32);

impl AdmissionPolicy for FixedAdmission {
    fn admission_percent(&self) -> i32 {
        self.0
    }
}

/// A policy that can be retuned at runtime from any thread.
#[derive(Debug, Default)]
pub struct SharedAdmission(AtomicI32);

impl SharedAdmission {
    pub fn new(percent: i32) -> Self {
        Self(AtomicI32::new(percent))
    }

    pub fn set(&self, percent: i32) {
        self.0.store(percent, Ordering::Relaxed);
    }
}

impl AdmissionPolicy for SharedAdmission {
    fn admission_percent(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// The reference list the host attached to a created event.
pub trait LinkSlots {
    fn slot_count(&self) -> usize;

    fn slot(&self, index: usize) -> Entity;

    fn replace_slot(&mut self, index: usize, entity: Entity);

    fn remove_slot(&mut self, index: usize);

    /// First non-null entry, used as the event's actual target.
    fn first_target(&self) -> Option<Entity> {
        (0..self.slot_count())
            .map(|index| self.slot(index))
            .find(|entity| !entity.is_null())
    }
}

impl LinkSlots for Vec<Entity> {
    fn slot_count(&self) -> usize {
        self.len()
    }

    fn slot(&self, index: usize) -> Entity {
        self[index]
    }

    fn replace_slot(&mut self, index: usize, entity: Entity) {
        self[index] = entity;
    }

    fn remove_slot(&mut self, index: usize) {
        self.remove(index);
    }
}
