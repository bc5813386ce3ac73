//! # Chirp Spawner
//!
//! Runs once per host tick, after the host has turned its creation queue into
//! chirps. Every new chirp without custom text is resolved against the bus:
//! a matched payload is attached, an unmatched chirp is kept or destroyed by
//! the admission sampler. Every few ticks the spawner also reclaims
//! placeholders that can no longer be matched.

use crate::host::{ChirpHost, ChirpView};
use payload_bus::{CreatedEvent, Entity, PayloadBody, PayloadBus, Resolution};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// What one spawner tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnReport {
    pub matched_token: usize,
    pub matched_heuristic: usize,
    pub kept_vanilla: usize,
    pub dropped_vanilla: usize,
    pub orphans_reclaimed: usize,
}

impl SpawnReport {
    pub fn matched(&self) -> usize {
        self.matched_token + self.matched_heuristic
    }

    pub fn is_idle(&self) -> bool {
        *self == SpawnReport::default()
    }
}

pub struct ChirpSpawner<H: ChirpHost> {
    host: Arc<H>,
    bus: Arc<PayloadBus>,
    sweep_interval: u64,
    ticks: AtomicU64,
}

impl<H: ChirpHost> ChirpSpawner<H> {
    /// `sweep_interval` is the number of ticks between orphan sweeps; `0`
    /// disables them.
    pub fn new(host: Arc<H>, bus: Arc<PayloadBus>, sweep_interval: u64) -> Self {
        Self {
            host,
            bus,
            sweep_interval,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn run_tick(&self) -> SpawnReport {
        let mut report = SpawnReport::default();

        for chirp in self.host.take_created_chirps() {
            let Some(view) = self.host.chirp(chirp) else {
                continue;
            };
            if view.prefab.is_null() {
                continue;
            }
            self.resolve_chirp(&view, &mut report);
        }

        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if self.sweep_interval > 0 && tick % self.sweep_interval == 0 {
            report.orphans_reclaimed = self.bus.reclaim_orphans(self.host.as_ref()).len();
        }

        if !report.is_idle() {
            debug!("🐦 Spawner tick {}: {:?}", tick, report);
        }
        report
    }

    fn resolve_chirp(&self, view: &ChirpView, report: &mut SpawnReport) {
        let event = CreatedEvent {
            id: view.id,
            producer: view.prefab,
            sender: view.sender.non_null(),
        };
        let mut links = view.links.clone();
        let resolution = self.bus.resolve(&event, &mut links, self.host.as_ref());

        let body = match resolution {
            Resolution::Token(body) => {
                report.matched_token += 1;
                body
            }
            Resolution::Heuristic { body, .. } => {
                report.matched_heuristic += 1;
                body
            }
            Resolution::Unmatched { admitted: true } => {
                if links != view.links {
                    self.host.set_links(view.id, links);
                }
                report.kept_vanilla += 1;
                return;
            }
            Resolution::Unmatched { admitted: false } => {
                self.host.destroy_chirp(view.id);
                self.bus.forget(view.id);
                report.dropped_vanilla += 1;
                return;
            }
        };

        apply_payload(self.host.as_ref(), view, &body, links);
        info!("✨ Chirp {} now carries {}", view.id, body.text_key);
    }
}

/// Writes a claimed payload onto a chirp: text key, sender account, sender
/// label and target link.
pub(crate) fn apply_payload<H>(host: &H, view: &ChirpView, body: &PayloadBody, mut links: Vec<Entity>)
where
    H: ChirpHost + ?Sized,
{
    host.attach_text(view.id, &body.text_key);

    if let Some(sender) = body.sender {
        if sender != view.sender {
            host.set_sender(view.id, sender);
        }
    }
    if let Some(name) = &body.sender_name {
        host.set_override_sender(view.id, name);
    }

    if let Some(target) = body.target {
        if !links.contains(&target) {
            links.push(target);
        }
    }
    if links != view.links {
        host.set_links(view.id, links);
    }
}

/// Whether `view` already shows everything `body` asks for.
pub(crate) fn payload_applied(view: &ChirpView, body: &PayloadBody) -> bool {
    view.text_key.as_deref() == Some(body.text_key.as_str())
        && body.sender.map_or(true, |sender| sender == view.sender)
        && body
            .sender_name
            .as_ref()
            .map_or(true, |name| view.sender_override.as_ref() == Some(name))
        && body.target.map_or(true, |target| view.links.contains(&target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimWorld;
    use payload_bus::BusConfig;

    #[test]
    fn test_heuristic_match_forces_sender_and_link() {
        let world = Arc::new(SimWorld::with_default_accounts());
        let bus = payload_bus::create_payload_bus(&BusConfig::default());
        let spawner = ChirpSpawner::new(world.clone(), bus.clone(), 0);

        let prefab = world.default_chirp_prefab().unwrap();
        let police = world.find_account("PoliceChirperAccount").unwrap();
        let water = world.find_account("WaterChirperAccount").unwrap();
        let station = world.spawn_building("Police Station");

        bus.enqueue(
            prefab,
            None,
            PayloadBody::new("customchirps:patrol")
                .with_sender(police)
                .with_target(station)
                .with_sender_name("Night Shift"),
        )
        .unwrap();
        let chirp = world.spawn_vanilla_chirp(prefab, water, None, "Chirper.WATER:0");

        let report = spawner.run_tick();
        assert_eq!(report.matched_heuristic, 1);

        let view = world.chirp(chirp).unwrap();
        assert_eq!(view.text_key.as_deref(), Some("customchirps:patrol"));
        assert_eq!(view.sender, police);
        assert_eq!(view.links, vec![station]);
        assert_eq!(view.sender_override.as_deref(), Some("Night Shift"));
        assert!(bus.attached(chirp).is_some());
    }

    #[test]
    fn test_sweep_runs_on_interval() {
        let world = Arc::new(SimWorld::with_default_accounts());
        let bus = payload_bus::create_payload_bus(&BusConfig::default());
        let spawner = ChirpSpawner::new(world.clone(), bus.clone(), 2);

        // Minted but never handed to the host, so nothing references it.
        bus.enqueue_with_marker(None, PayloadBody::new("customchirps:lost"), world.as_ref())
            .unwrap();

        assert_eq!(spawner.run_tick().orphans_reclaimed, 0);
        // First sweep only marks it suspect.
        assert_eq!(spawner.run_tick().orphans_reclaimed, 0);
        assert_eq!(spawner.run_tick().orphans_reclaimed, 0);
        assert_eq!(spawner.run_tick().orphans_reclaimed, 1);
    }

    #[test]
    fn test_payload_applied_detects_missing_parts() {
        let body = PayloadBody::new("customchirps:fair")
            .with_sender(Entity(3))
            .with_target(Entity(8));
        let mut view = ChirpView {
            id: Entity(1),
            prefab: Entity(2),
            sender: Entity(3),
            links: vec![Entity(8)],
            text_key: Some("customchirps:fair".to_string()),
            sender_override: None,
        };
        assert!(payload_applied(&view, &body));

        view.links.clear();
        assert!(!payload_applied(&view, &body));

        view.links.push(Entity(8));
        view.sender = Entity(4);
        assert!(!payload_applied(&view, &body));
    }
}
