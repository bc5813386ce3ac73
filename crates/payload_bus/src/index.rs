//! # Matching Index Store
//!
//! Holds every not-yet-claimed payload and answers "which payload belongs to
//! this concrete event" with three strategies of decreasing confidence.
//!
//! ## Layout
//!
//! - global order: `BTreeMap<Ticket, PendingItem>` owns the items
//! - producer index: producer -> ordered ticket set, always populated
//! - target index: target -> ordered ticket set, only for items with a target
//!
//! Every removal goes through [`MatchingIndex::take`], which unlinks the
//! ticket from all three structures before returning, so an item is never
//! visible in one index after it left another.
//!
//! ## Costs
//!
//! - enqueue, exact-target and producer dequeue: O(log n)
//! - variant-aware dequeue: O(pending) per call, a linear scan over every
//!   item in the producer scope. The pending set is expected to stay small.

use crate::error::BusError;
use crate::host::VariantLookup;
use crate::types::{Entity, HeuristicStrategy, PayloadBody, Ticket};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A queued unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub ticket: Ticket,
    pub producer: Entity,
    pub target: Option<Entity>,
    pub body: PayloadBody,
}

impl PendingItem {
    /// +2 for an equal target, +1 for an equal implied sender.
    fn score(&self, sender: Option<Entity>, target: Option<Entity>) -> u8 {
        let mut score = 0;
        if self.target.is_some() && self.target == target {
            score += 2;
        }
        if self.body.sender.is_some() && self.body.sender == sender {
            score += 1;
        }
        score
    }
}

/// Entry counts of each index, for consistency checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSizes {
    /// Items in the global order.
    pub pending: usize,
    /// Tickets reachable through the target index.
    pub by_target: usize,
    /// Tickets reachable through the producer index.
    pub by_producer: usize,
}

/// Multi-index table of pending payloads.
#[derive(Debug, Default)]
pub struct MatchingIndex {
    next_ticket: u64,
    pending: BTreeMap<Ticket, PendingItem>,
    by_target: HashMap<Entity, BTreeSet<Ticket>>,
    by_producer: HashMap<Entity, BTreeSet<Ticket>>,
}

impl MatchingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `body` for the next event originating from `producer`.
    ///
    /// A null `target` is treated as absent. A null `producer` is rejected
    /// with [`BusError::InvalidProducer`] and leaves no state behind.
    pub fn enqueue(
        &mut self,
        producer: Entity,
        target: Option<Entity>,
        body: PayloadBody,
    ) -> Result<Ticket, BusError> {
        if producer.is_null() {
            return Err(BusError::InvalidProducer(producer));
        }

        let target = target.and_then(Entity::non_null);
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        self.by_producer.entry(producer).or_default().insert(ticket);
        if let Some(target) = target {
            self.by_target.entry(target).or_default().insert(ticket);
        }
        self.pending.insert(
            ticket,
            PendingItem {
                ticket,
                producer,
                target,
                body,
            },
        );

        Ok(ticket)
    }

    /// Removes and returns the earliest payload queued against `target`.
    pub fn dequeue_exact_target(&mut self, target: Entity) -> Option<PayloadBody> {
        if target.is_null() {
            return None;
        }
        let ticket = *self.by_target.get(&target)?.first()?;
        self.take(ticket).map(|item| item.body)
    }

    /// Removes and returns the earliest payload queued against `producer`.
    pub fn dequeue_by_producer(&mut self, producer: Entity) -> Option<PayloadBody> {
        let ticket = *self.by_producer.get(&producer)?.first()?;
        self.take(ticket).map(|item| item.body)
    }

    /// Scores every candidate in the producer scope and claims the best one.
    ///
    /// Candidates are items queued against `producer` itself plus items queued
    /// against an umbrella that `variants` reports as covering `producer`.
    /// Highest score wins; equal scores go to the smallest ticket.
    pub fn dequeue_best_variant<V>(
        &mut self,
        producer: Entity,
        sender: Option<Entity>,
        target: Option<Entity>,
        variants: &V,
    ) -> Option<PayloadBody>
    where
        V: VariantLookup + ?Sized,
    {
        let sender = sender.and_then(Entity::non_null);
        let target = target.and_then(Entity::non_null);
        let mut best: Option<(u8, Ticket)> = None;

        for (&scope, tickets) in &self.by_producer {
            if scope != producer && !variants.covers(scope, producer) {
                continue;
            }
            for &ticket in tickets {
                let Some(item) = self.pending.get(&ticket) else {
                    continue;
                };
                let score = item.score(sender, target);
                let better = match best {
                    None => true,
                    Some((best_score, best_ticket)) => {
                        score > best_score || (score == best_score && ticket < best_ticket)
                    }
                };
                if better {
                    best = Some((score, ticket));
                }
            }
        }

        let (_, ticket) = best?;
        self.take(ticket).map(|item| item.body)
    }

    /// Runs the heuristic cascade: exact target, variant-aware, producer-only.
    pub fn dequeue_cascade<V>(
        &mut self,
        producer: Entity,
        sender: Option<Entity>,
        target: Option<Entity>,
        variants: &V,
    ) -> Option<(PayloadBody, HeuristicStrategy)>
    where
        V: VariantLookup + ?Sized,
    {
        if let Some(body) = target.and_then(|target| self.dequeue_exact_target(target)) {
            return Some((body, HeuristicStrategy::ExactTarget));
        }
        if let Some(body) = self.dequeue_best_variant(producer, sender, target, variants) {
            return Some((body, HeuristicStrategy::Variant));
        }
        self.dequeue_by_producer(producer)
            .map(|body| (body, HeuristicStrategy::Producer))
    }

    /// Unlinks `ticket` from every index it belongs to.
    fn take(&mut self, ticket: Ticket) -> Option<PendingItem> {
        let item = self.pending.remove(&ticket)?;
        unlink(&mut self.by_producer, item.producer, ticket);
        if let Some(target) = item.target {
            unlink(&mut self.by_target, target, ticket);
        }
        Some(item)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending item. Ticket numbering keeps counting up.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.by_target.clear();
        self.by_producer.clear();
    }

    /// Pending items in ticket order.
    pub fn items(&self) -> impl Iterator<Item = &PendingItem> {
        self.pending.values()
    }

    pub fn sizes(&self) -> IndexSizes {
        IndexSizes {
            pending: self.pending.len(),
            by_target: self.by_target.values().map(BTreeSet::len).sum(),
            by_producer: self.by_producer.values().map(BTreeSet::len).sum(),
        }
    }
}

fn unlink(index: &mut HashMap<Entity, BTreeSet<Ticket>>, key: Entity, ticket: Ticket) {
    if let Some(tickets) = index.get_mut(&key) {
        tickets.remove(&ticket);
        if tickets.is_empty() {
            index.remove(&key);
        }
    }
}
