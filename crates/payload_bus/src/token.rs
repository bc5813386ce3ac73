//! # Token / Marker Reconciliation
//!
//! The deterministic correlation path. A producer asks for a placeholder
//! entity carrying a fresh [`CorrelationToken`], binds its payload to that
//! token, and passes the placeholder to the host's creation call as the
//! target. The host copies the placeholder into the created event's link list
//! without knowing what it is; the consumer finds it there, claims the payload
//! by token, puts the real target back and destroys the placeholder.
//!
//! [`TokenTable`] holds the bookkeeping. It is not synchronized on its own;
//! the bus keeps it under the same lock as the matching index.

use crate::error::BusError;
use crate::host::{LinkSlots, PlaceholderStore};
use crate::types::{CorrelationToken, Entity, Marker, PayloadBody};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues tokens from a process-lifetime counter, never returning `0`.
#[derive(Debug)]
pub struct TokenCounter(AtomicU64);

impl TokenCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> CorrelationToken {
        loop {
            let value = self.0.fetch_add(1, Ordering::Relaxed);
            if value != 0 {
                return CorrelationToken(value);
            }
        }
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A placeholder the bus created and has not resolved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveMarker {
    pub token: CorrelationToken,
    pub placeholder: Entity,
    pub final_target: Option<Entity>,
    /// Set when an orphan sweep found the placeholder unreferenced.
    pub suspect: bool,
}

/// Token bindings and live placeholders.
#[derive(Debug, Default)]
pub struct TokenTable {
    bindings: HashMap<CorrelationToken, PayloadBody>,
    markers: HashMap<CorrelationToken, LiveMarker>,
}

impl TokenTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_marker(
        &mut self,
        token: CorrelationToken,
        placeholder: Entity,
        final_target: Option<Entity>,
    ) {
        self.markers.insert(
            token,
            LiveMarker {
                token,
                placeholder,
                final_target,
                suspect: false,
            },
        );
    }

    /// Stores `body` under `token`. A token carries at most one body.
    pub fn bind(&mut self, token: CorrelationToken, body: PayloadBody) -> Result<(), BusError> {
        if !token.is_valid() {
            return Err(BusError::InvalidToken);
        }
        if self.bindings.contains_key(&token) {
            return Err(BusError::TokenAlreadyBound(token));
        }
        self.bindings.insert(token, body);
        Ok(())
    }

    /// Consumes the binding of `token` together with its live marker.
    pub fn consume(&mut self, token: CorrelationToken) -> Option<PayloadBody> {
        self.markers.remove(&token);
        self.bindings.remove(&token)
    }

    pub fn is_bound(&self, token: CorrelationToken) -> bool {
        self.bindings.contains_key(&token)
    }

    pub fn live_markers(&self) -> Vec<LiveMarker> {
        self.markers.values().copied().collect()
    }

    pub fn marker_mut(&mut self, token: CorrelationToken) -> Option<&mut LiveMarker> {
        self.markers.get_mut(&token)
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.markers.clear();
    }
}

/// A placeholder found in an event's link list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderHit {
    pub slot: usize,
    pub placeholder: Entity,
    pub marker: Marker,
}

/// Finds the first slot in `links` that holds a live placeholder.
pub fn find_placeholder<L, S>(links: &L, store: &S) -> Option<PlaceholderHit>
where
    L: LinkSlots + ?Sized,
    S: PlaceholderStore + ?Sized,
{
    (0..links.slot_count()).find_map(|slot| {
        let placeholder = links.slot(slot);
        if placeholder.is_null() {
            return None;
        }
        store.read_marker(placeholder).map(|marker| PlaceholderHit {
            slot,
            placeholder,
            marker,
        })
    })
}

/// Puts the real target back where the placeholder was, or drops the slot.
pub fn restore_slot<L>(links: &mut L, hit: &PlaceholderHit)
where
    L: LinkSlots + ?Sized,
{
    match hit.marker.final_target.and_then(Entity::non_null) {
        Some(target) => links.replace_slot(hit.slot, target),
        None => links.remove_slot(hit.slot),
    }
}
