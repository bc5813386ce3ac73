//! # Bus Facade
//!
//! [`PayloadBus`] composes the matching index, the token table, the text
//! window and the admission sampler behind one service object that producers
//! and consumers share through an `Arc`.
//!
//! ## Locking
//!
//! - `state`: one mutex over the matching index and the token table, so that
//!   removal from every index happens inside a single critical section
//! - `attached`: a `DashMap`, written at bind time and read by renderers
//! - `texts`: its own mutex; the window is independent of the index
//! - `stats`: a read-write lock, written after the work is done
//!
//! No lock is held while calling into the host, except that the variant lookup
//! is consulted during the heuristic cascade.

use crate::cache::TextWindow;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::host::{AdmissionPolicy, FixedAdmission, LinkSlots, PlaceholderStore, VariantLookup};
use crate::index::{IndexSizes, MatchingIndex};
use crate::sampler::AdmissionSampler;
use crate::stats::BusStats;
use crate::token::{self, TokenCounter, TokenTable};
use crate::types::{
    CorrelationToken, CreatedEvent, Entity, Marker, PayloadBody, Resolution, Ticket,
};
use dashmap::{DashMap, DashSet};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct BusState {
    index: MatchingIndex,
    tokens: TokenTable,
}

/// Outcome of looking for a placeholder in an event's links.
enum PlaceholderClaim {
    Absent,
    Claimed(PayloadBody),
    /// A placeholder was present but its token had no binding.
    Unbound,
}

/// The deferred payload dispatch bus.
///
/// # Examples
///
/// ```rust
/// use payload_bus::{BusConfig, Entity, PayloadBody, PayloadBus};
///
/// let bus = PayloadBus::new(&BusConfig::default());
/// let template = Entity(10);
/// bus.enqueue(template, None, PayloadBody::new("greeting")).unwrap();
///
/// // Later, on the consumer side:
/// let claimed = bus.dequeue_by_producer(template);
/// assert_eq!(claimed.unwrap().text_key, "greeting");
/// ```
pub struct PayloadBus {
    state: Mutex<BusState>,
    tokens: TokenCounter,
    attached: DashMap<Entity, PayloadBody>,
    /// Events that already went through `resolve`, matched or not.
    resolved: DashSet<Entity>,
    texts: Mutex<TextWindow>,
    sampler: AdmissionSampler,
    policy: Arc<dyn AdmissionPolicy>,
    stats: RwLock<BusStats>,
}

impl std::fmt::Debug for PayloadBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadBus")
            .field("pending", &self.pending_count())
            .field("attached", &self.attached.len())
            .field("texts", &self.text_count())
            .field("admission_percent", &self.policy.admission_percent())
            .finish_non_exhaustive()
    }
}

impl PayloadBus {
    /// Creates a bus whose admission percentage is fixed by `config`.
    pub fn new(config: &BusConfig) -> Self {
        Self::with_policy(
            config,
            Arc::new(FixedAdmission(config.vanilla_admission_percent)),
        )
    }

    /// Creates a bus that asks `policy` for the admission percentage.
    pub fn with_policy(config: &BusConfig, policy: Arc<dyn AdmissionPolicy>) -> Self {
        let sampler = match config.rng_seed {
            Some(seed) => AdmissionSampler::with_seed(seed),
            None => AdmissionSampler::new(),
        };
        info!(
            "🚌 Payload bus ready (text window: {}, sampler seed: {})",
            config.text_window_size,
            sampler.seed()
        );
        Self {
            state: Mutex::new(BusState::default()),
            tokens: TokenCounter::new(),
            attached: DashMap::new(),
            resolved: DashSet::new(),
            texts: Mutex::new(TextWindow::new(config.text_window_size)),
            sampler,
            policy,
            stats: RwLock::new(BusStats::default()),
        }
    }

    // ------------------------------------------------------------------
    // Producer side
    // ------------------------------------------------------------------

    /// Queues `body` for the next event created from `producer`.
    pub fn enqueue(
        &self,
        producer: Entity,
        target: Option<Entity>,
        body: PayloadBody,
    ) -> Result<Ticket, BusError> {
        let result = self.state.lock().index.enqueue(producer, target, body);
        match &result {
            Ok(ticket) => {
                self.stats.write().enqueued += 1;
                debug!("📥 Queued payload {} for producer {}", ticket, producer);
            }
            Err(e) => {
                self.stats.write().invalid_producers += 1;
                warn!("🚫 Payload rejected: {}", e);
            }
        }
        result
    }

    /// Mints a token and asks the host for a placeholder carrying it.
    ///
    /// The caller hands the returned placeholder to the host creation call in
    /// place of the real target, then binds the payload with [`bind_token`].
    ///
    /// [`bind_token`]: PayloadBus::bind_token
    pub fn create_marker<S>(
        &self,
        final_target: Option<Entity>,
        store: &S,
    ) -> Result<(Entity, CorrelationToken), BusError>
    where
        S: PlaceholderStore + ?Sized,
    {
        let token = self.tokens.next();
        let final_target = final_target.and_then(Entity::non_null);
        let placeholder = store.spawn_placeholder(Marker {
            token,
            final_target,
        })?;
        self.state
            .lock()
            .tokens
            .record_marker(token, placeholder, final_target);
        debug!("🏷️ Placeholder {} carries {}", placeholder, token);
        Ok((placeholder, token))
    }

    /// Binds `body` to `token`. Must happen before the consumer resolves.
    pub fn bind_token(&self, token: CorrelationToken, body: PayloadBody) -> Result<(), BusError> {
        self.state.lock().tokens.bind(token, body)
    }

    /// Creates a marker and binds `body` to it in one step.
    ///
    /// Returns the placeholder to pass to the host. If binding fails the
    /// placeholder is destroyed again.
    pub fn enqueue_with_marker<S>(
        &self,
        final_target: Option<Entity>,
        body: PayloadBody,
        store: &S,
    ) -> Result<Entity, BusError>
    where
        S: PlaceholderStore + ?Sized,
    {
        let (placeholder, token) = self.create_marker(final_target, store)?;
        if let Err(e) = self.bind_token(token, body) {
            self.state.lock().tokens.consume(token);
            store.destroy_placeholder(placeholder);
            return Err(e);
        }
        self.stats.write().marker_posts += 1;
        Ok(placeholder)
    }

    // ------------------------------------------------------------------
    // Consumer side
    // ------------------------------------------------------------------

    pub fn dequeue_exact_target(&self, target: Entity) -> Option<PayloadBody> {
        let body = self.state.lock().index.dequeue_exact_target(target);
        if body.is_some() {
            self.stats.write().matched_exact_target += 1;
        }
        body
    }

    pub fn dequeue_by_producer(&self, producer: Entity) -> Option<PayloadBody> {
        let body = self.state.lock().index.dequeue_by_producer(producer);
        if body.is_some() {
            self.stats.write().matched_producer += 1;
        }
        body
    }

    /// Variant-aware scored match. O(pending) per call.
    pub fn dequeue_best_variant<V>(
        &self,
        producer: Entity,
        sender: Option<Entity>,
        target: Option<Entity>,
        variants: &V,
    ) -> Option<PayloadBody>
    where
        V: VariantLookup + ?Sized,
    {
        let body = self
            .state
            .lock()
            .index
            .dequeue_best_variant(producer, sender, target, variants);
        if body.is_some() {
            self.stats.write().matched_variant += 1;
        }
        body
    }

    /// Claims the payload bound to a placeholder in `links`, if there is one.
    ///
    /// The placeholder's slot is replaced by its final target (or removed when
    /// it has none) and the placeholder is destroyed, whether or not a binding
    /// was found. A placeholder without binding is logged as a protocol
    /// violation and yields `None`.
    pub fn resolve_by_placeholder<L, S>(
        &self,
        event: Entity,
        links: &mut L,
        store: &S,
    ) -> Option<PayloadBody>
    where
        L: LinkSlots + ?Sized,
        S: PlaceholderStore + ?Sized,
    {
        match self.claim_placeholder(event, links, store) {
            PlaceholderClaim::Claimed(body) => Some(body),
            PlaceholderClaim::Absent | PlaceholderClaim::Unbound => None,
        }
    }

    fn claim_placeholder<L, S>(&self, event: Entity, links: &mut L, store: &S) -> PlaceholderClaim
    where
        L: LinkSlots + ?Sized,
        S: PlaceholderStore + ?Sized,
    {
        let Some(hit) = token::find_placeholder(links, store) else {
            return PlaceholderClaim::Absent;
        };
        let body = self.state.lock().tokens.consume(hit.marker.token);
        token::restore_slot(links, &hit);
        store.destroy_placeholder(hit.placeholder);

        match body {
            Some(body) => {
                self.stats.write().matched_token += 1;
                debug!(
                    "🎯 Event {} claimed payload '{}' by {}",
                    event, body.text_key, hit.marker.token
                );
                PlaceholderClaim::Claimed(body)
            }
            None => {
                self.stats.write().unresolved_tokens += 1;
                let error = BusError::UnresolvedToken {
                    token: hit.marker.token,
                    placeholder: hit.placeholder,
                };
                warn!("⚠️ {} (event {})", error, event);
                PlaceholderClaim::Unbound
            }
        }
    }

    /// Resolves a freshly created event: token first, then the heuristic
    /// cascade, then admission sampling.
    ///
    /// An event carrying a placeholder with no binding skips the cascade and
    /// goes straight to admission. A matched payload is remembered as the
    /// event's attached record.
    pub fn resolve<L, H>(&self, event: &CreatedEvent, links: &mut L, host: &H) -> Resolution
    where
        L: LinkSlots + ?Sized,
        H: PlaceholderStore + VariantLookup + ?Sized,
    {
        if !event.id.is_null() {
            self.resolved.insert(event.id);
        }

        match self.claim_placeholder(event.id, links, host) {
            PlaceholderClaim::Claimed(body) => {
                self.remember(event.id, body.clone());
                return Resolution::Token(body);
            }
            PlaceholderClaim::Unbound => return self.unmatched(event.id),
            PlaceholderClaim::Absent => {}
        }

        let target = links.first_target();
        let claimed =
            self.state
                .lock()
                .index
                .dequeue_cascade(event.producer, event.sender, target, host);

        if let Some((body, strategy)) = claimed {
            self.stats.write().record_heuristic(strategy);
            debug!(
                "🔗 Event {} claimed payload '{}' via {} match",
                event.id, body.text_key, strategy
            );
            self.remember(event.id, body.clone());
            return Resolution::Heuristic { body, strategy };
        }

        self.unmatched(event.id)
    }

    fn unmatched(&self, event: Entity) -> Resolution {
        let admitted = self.admit_unmatched();
        debug!(
            "🎲 Unmatched event {} {}",
            event,
            if admitted { "admitted" } else { "dropped" }
        );
        Resolution::Unmatched { admitted }
    }

    /// Runs the admission sampler once for an unmatched event.
    pub fn admit_unmatched(&self) -> bool {
        let admitted = self.sampler.admit(self.policy.admission_percent());
        let mut stats = self.stats.write();
        if admitted {
            stats.unmatched_admitted += 1;
        } else {
            stats.unmatched_rejected += 1;
        }
        admitted
    }

    /// Reclaims placeholders that can no longer be matched.
    ///
    /// A placeholder the host already destroyed is reclaimed at once. One that
    /// still exists but is referenced by nothing is marked suspect and
    /// reclaimed if the next sweep finds it unreferenced again, which leaves
    /// room for a producer that has minted a marker but not yet submitted its
    /// creation request.
    pub fn reclaim_orphans<S>(&self, store: &S) -> Vec<BusError>
    where
        S: PlaceholderStore + ?Sized,
    {
        let markers = self.state.lock().tokens.live_markers();
        let mut reclaimed = Vec::new();

        for marker in markers {
            let gone = store.read_marker(marker.placeholder).is_none();
            if !gone && store.is_referenced(marker.placeholder) {
                if let Some(live) = self.state.lock().tokens.marker_mut(marker.token) {
                    live.suspect = false;
                }
                continue;
            }
            if !gone && !marker.suspect {
                if let Some(live) = self.state.lock().tokens.marker_mut(marker.token) {
                    live.suspect = true;
                }
                continue;
            }

            {
                let mut state = self.state.lock();
                if state.tokens.marker_mut(marker.token).is_none() {
                    continue;
                }
                state.tokens.consume(marker.token);
            }
            store.destroy_placeholder(marker.placeholder);

            let error = BusError::OrphanPlaceholder {
                token: marker.token,
                placeholder: marker.placeholder,
            };
            warn!("🧹 Reclaimed {}", error);
            reclaimed.push(error);
        }

        if !reclaimed.is_empty() {
            self.stats.write().orphans_reclaimed += reclaimed.len() as u64;
        }
        reclaimed
    }

    // ------------------------------------------------------------------
    // Attached records
    // ------------------------------------------------------------------

    /// Records the payload bound to a concrete event.
    pub fn remember(&self, event: Entity, body: PayloadBody) {
        if !event.is_null() {
            self.attached.insert(event, body);
        }
    }

    pub fn attached(&self, event: Entity) -> Option<PayloadBody> {
        self.attached.get(&event).map(|entry| entry.value().clone())
    }

    /// Drops the attached record of a destroyed or forgotten event.
    pub fn forget(&self, event: Entity) -> Option<PayloadBody> {
        self.resolved.remove(&event);
        self.attached.remove(&event).map(|(_, body)| body)
    }

    /// Whether `event` has already been through [`PayloadBus::resolve`].
    pub fn was_resolved(&self, event: Entity) -> bool {
        self.resolved.contains(&event)
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    // ------------------------------------------------------------------
    // Text window
    // ------------------------------------------------------------------

    pub fn remember_text(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), BusError> {
        let evicted = self.texts.lock().put(key, value)?;
        if let Some(evicted) = evicted {
            self.stats.write().texts_evicted += 1;
            debug!("🗑️ Text window evicted '{}'", evicted);
        }
        Ok(())
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.texts.lock().get(key).map(str::to_owned)
    }

    pub fn forget_text(&self, key: &str) -> Option<String> {
        self.texts.lock().remove(key)
    }

    pub fn clear_texts(&self) {
        self.texts.lock().clear();
    }

    pub fn text_count(&self) -> usize {
        self.texts.lock().len()
    }

    // ------------------------------------------------------------------
    // Inspection and teardown
    // ------------------------------------------------------------------

    pub fn pending_count(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn index_sizes(&self) -> IndexSizes {
        self.state.lock().index.sizes()
    }

    /// Number of placeholders minted and not yet resolved or reclaimed.
    pub fn live_marker_count(&self) -> usize {
        self.state.lock().tokens.marker_count()
    }

    /// Number of token bindings not yet consumed.
    pub fn bound_token_count(&self) -> usize {
        self.state.lock().tokens.binding_count()
    }

    pub fn stats(&self) -> BusStats {
        self.stats.read().clone()
    }

    /// Destroys every live placeholder and drops all bus state.
    pub fn shutdown<S>(&self, store: &S)
    where
        S: PlaceholderStore + ?Sized,
    {
        let markers = {
            let mut state = self.state.lock();
            let markers = state.tokens.live_markers();
            state.tokens.clear();
            state.index.clear();
            markers
        };
        for marker in &markers {
            store.destroy_placeholder(marker.placeholder);
        }
        self.attached.clear();
        self.resolved.clear();
        self.texts.lock().clear();
        info!(
            "🛑 Payload bus shut down ({} placeholders destroyed)",
            markers.len()
        );
    }
}
