//! # Reference Host
//!
//! [`SimWorld`] is an in-memory stand-in for the host application: entity
//! storage, a creation queue drained once per tick, umbrella prefabs that
//! instantiate one of their variants, and chirps the host makes on its own.
//! The demo binary and the integration tests run the plugin against it.

use crate::department::DepartmentAccount;
use crate::host::{ChirpCreation, ChirpHost, ChirpView};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use payload_bus::{BusError, Entity, Marker, PlaceholderStore, VariantLookup};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::{debug, info};

/// Name of the trigger prefab custom chirps are created from.
pub const CHIRP_TRIGGER_PREFAB: &str = "CustomChirpTrigger";

#[derive(Debug, Clone)]
enum SimEntity {
    Prefab {
        name: String,
        variants: Vec<Entity>,
    },
    Account {
        name: String,
    },
    Building {
        name: String,
    },
    Chirp(ChirpRecord),
    Placeholder(Marker),
}

#[derive(Debug, Clone)]
struct ChirpRecord {
    prefab: Entity,
    sender: Entity,
    links: Vec<Entity>,
    text_key: Option<String>,
    sender_override: Option<String>,
    vanilla_key: String,
}

/// Counts of live entities by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldCensus {
    pub prefabs: usize,
    pub accounts: usize,
    pub buildings: usize,
    pub chirps: usize,
    pub placeholders: usize,
}

#[derive(Debug)]
pub struct SimWorld {
    next_id: AtomicU64,
    entities: DashMap<Entity, SimEntity>,
    chirp_prefab: RwLock<Option<Entity>>,
    creation_queue: Mutex<Vec<ChirpCreation>>,
    created: Mutex<Vec<Entity>>,
    variant_cursor: AtomicUsize,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entities: DashMap::new(),
            chirp_prefab: RwLock::new(None),
            creation_queue: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            variant_cursor: AtomicUsize::new(0),
        }
    }

    /// A world with one account per department and a chirp trigger prefab.
    pub fn with_default_accounts() -> Self {
        let world = Self::new();
        for department in DepartmentAccount::ALL {
            world.spawn_account(department.prefab_name());
        }
        world.spawn_chirp_trigger(CHIRP_TRIGGER_PREFAB, Vec::new());
        info!(
            "🌍 Simulated world ready with {} department accounts",
            DepartmentAccount::ALL.len()
        );
        world
    }

    fn allocate(&self) -> Entity {
        Entity(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn spawn_prefab(&self, name: &str, variants: Vec<Entity>) -> Entity {
        let entity = self.allocate();
        self.entities.insert(
            entity,
            SimEntity::Prefab {
                name: name.to_string(),
                variants,
            },
        );
        entity
    }

    /// Spawns a prefab and makes it the default chirp trigger if none is set.
    pub fn spawn_chirp_trigger(&self, name: &str, variants: Vec<Entity>) -> Entity {
        let entity = self.spawn_prefab(name, variants);
        self.chirp_prefab.write().get_or_insert(entity);
        entity
    }

    pub fn spawn_account(&self, name: &str) -> Entity {
        let entity = self.allocate();
        self.entities.insert(
            entity,
            SimEntity::Account {
                name: name.to_string(),
            },
        );
        entity
    }

    pub fn spawn_building(&self, name: &str) -> Entity {
        let entity = self.allocate();
        self.entities.insert(
            entity,
            SimEntity::Building {
                name: name.to_string(),
            },
        );
        entity
    }

    pub fn name_of(&self, entity: Entity) -> Option<String> {
        self.entities.get(&entity).and_then(|e| match e.value() {
            SimEntity::Prefab { name, .. }
            | SimEntity::Account { name }
            | SimEntity::Building { name } => Some(name.clone()),
            _ => None,
        })
    }

    /// A chirp the host creates on its own, with a vanilla message key.
    pub fn spawn_vanilla_chirp(
        &self,
        prefab: Entity,
        sender: Entity,
        target: Option<Entity>,
        vanilla_key: &str,
    ) -> Entity {
        let entity = self.allocate();
        self.entities.insert(
            entity,
            SimEntity::Chirp(ChirpRecord {
                prefab,
                sender,
                links: target.into_iter().collect(),
                text_key: None,
                sender_override: None,
                vanilla_key: vanilla_key.to_string(),
            }),
        );
        self.created.lock().push(entity);
        entity
    }

    /// Turns every queued creation request into a chirp.
    ///
    /// An umbrella prefab instantiates its variants in round-robin order. The
    /// request target becomes the chirp's only link.
    pub fn process_creation_queue(&self) -> Vec<Entity> {
        let requests = std::mem::take(&mut *self.creation_queue.lock());
        let mut spawned = Vec::with_capacity(requests.len());

        for request in requests {
            let prefab = self.concrete_prefab(request.trigger_prefab);
            let vanilla_key = format!(
                "Chirper.{}:0",
                self.name_of(prefab).unwrap_or_default().to_uppercase()
            );
            let chirp =
                self.spawn_vanilla_chirp(prefab, request.sender, request.target, &vanilla_key);
            spawned.push(chirp);
        }

        if !spawned.is_empty() {
            debug!("🏗️ Host created {} chirps", spawned.len());
        }
        spawned
    }

    fn concrete_prefab(&self, prefab: Entity) -> Entity {
        let variants = self.variants_of(prefab);
        if variants.is_empty() {
            return prefab;
        }
        let cursor = self.variant_cursor.fetch_add(1, Ordering::Relaxed);
        variants[cursor % variants.len()]
    }

    pub fn pending_creations(&self) -> usize {
        self.creation_queue.lock().len()
    }

    pub fn census(&self) -> WorldCensus {
        let mut census = WorldCensus::default();
        for entry in self.entities.iter() {
            match entry.value() {
                SimEntity::Prefab { .. } => census.prefabs += 1,
                SimEntity::Account { .. } => census.accounts += 1,
                SimEntity::Building { .. } => census.buildings += 1,
                SimEntity::Chirp(_) => census.chirps += 1,
                SimEntity::Placeholder(_) => census.placeholders += 1,
            }
        }
        census
    }

    /// Live chirps, oldest first.
    pub fn chirps(&self) -> Vec<Entity> {
        let mut chirps: Vec<Entity> = self
            .entities
            .iter()
            .filter(|entry| matches!(entry.value(), SimEntity::Chirp(_)))
            .map(|entry| *entry.key())
            .collect();
        chirps.sort();
        chirps
    }

    fn with_chirp<F>(&self, chirp: Entity, update: F)
    where
        F: FnOnce(&mut ChirpRecord),
    {
        if let Some(mut entry) = self.entities.get_mut(&chirp) {
            if let SimEntity::Chirp(record) = entry.value_mut() {
                update(record);
            }
        }
    }
}

impl PlaceholderStore for SimWorld {
    fn spawn_placeholder(&self, marker: Marker) -> Result<Entity, BusError> {
        let entity = self.allocate();
        self.entities.insert(entity, SimEntity::Placeholder(marker));
        Ok(entity)
    }

    fn read_marker(&self, entity: Entity) -> Option<Marker> {
        self.entities.get(&entity).and_then(|e| match e.value() {
            SimEntity::Placeholder(marker) => Some(*marker),
            _ => None,
        })
    }

    fn destroy_placeholder(&self, placeholder: Entity) {
        self.entities
            .remove_if(&placeholder, |_, e| matches!(e, SimEntity::Placeholder(_)));
    }

    fn is_referenced(&self, placeholder: Entity) -> bool {
        let queued = self
            .creation_queue
            .lock()
            .iter()
            .any(|request| request.target == Some(placeholder));
        queued
            || self.entities.iter().any(|entry| match entry.value() {
                SimEntity::Chirp(record) => record.links.contains(&placeholder),
                _ => false,
            })
    }
}

impl VariantLookup for SimWorld {
    fn variants_of(&self, umbrella: Entity) -> Vec<Entity> {
        self.entities
            .get(&umbrella)
            .and_then(|e| match e.value() {
                SimEntity::Prefab { variants, .. } => Some(variants.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}

impl ChirpHost for SimWorld {
    fn find_account(&self, prefab_name: &str) -> Option<Entity> {
        self.entities.iter().find_map(|entry| match entry.value() {
            SimEntity::Account { name } if name.eq_ignore_ascii_case(prefab_name) => {
                Some(*entry.key())
            }
            _ => None,
        })
    }

    fn default_chirp_prefab(&self) -> Option<Entity> {
        *self.chirp_prefab.read()
    }

    fn enqueue_creation(&self, request: ChirpCreation) {
        self.creation_queue.lock().push(request);
    }

    fn take_created_chirps(&self) -> Vec<Entity> {
        let created = std::mem::take(&mut *self.created.lock());
        created
            .into_iter()
            .filter(|chirp| {
                self.chirp(*chirp)
                    .is_some_and(|view| view.text_key.is_none())
            })
            .collect()
    }

    fn chirp(&self, chirp: Entity) -> Option<ChirpView> {
        self.entities.get(&chirp).and_then(|e| match e.value() {
            SimEntity::Chirp(record) => Some(ChirpView {
                id: chirp,
                prefab: record.prefab,
                sender: record.sender,
                links: record.links.clone(),
                text_key: record.text_key.clone(),
                sender_override: record.sender_override.clone(),
            }),
            _ => None,
        })
    }

    fn set_sender(&self, chirp: Entity, sender: Entity) {
        self.with_chirp(chirp, |record| record.sender = sender);
    }

    fn set_links(&self, chirp: Entity, links: Vec<Entity>) {
        self.with_chirp(chirp, |record| record.links = links);
    }

    fn attach_text(&self, chirp: Entity, key: &str) {
        self.with_chirp(chirp, |record| record.text_key = Some(key.to_string()));
    }

    fn set_override_sender(&self, chirp: Entity, name: &str) {
        self.with_chirp(chirp, |record| {
            record.sender_override = Some(name.to_string())
        });
    }

    fn destroy_chirp(&self, chirp: Entity) {
        let removed = self
            .entities
            .remove_if(&chirp, |_, e| matches!(e, SimEntity::Chirp(_)));
        if let Some((_, SimEntity::Chirp(record))) = removed {
            for link in record.links {
                self.destroy_placeholder(link);
            }
        }
    }

    fn vanilla_message_id(&self, chirp: Entity) -> Option<String> {
        self.entities.get(&chirp).and_then(|e| match e.value() {
            SimEntity::Chirp(record) => Some(record.vanilla_key.clone()),
            _ => None,
        })
    }

    fn exists(&self, entity: Entity) -> bool {
        self.entities.contains_key(&entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payload_bus::CorrelationToken;

    #[test]
    fn test_default_accounts_resolve_case_insensitively() {
        let world = SimWorld::with_default_accounts();
        assert!(world.find_account("policechirperaccount").is_some());
        assert!(world.default_chirp_prefab().is_some());
        assert_eq!(world.census().accounts, 18);
    }

    #[test]
    fn test_umbrella_instantiates_variants_round_robin() {
        let world = SimWorld::new();
        let a = world.spawn_prefab("VariantA", Vec::new());
        let b = world.spawn_prefab("VariantB", Vec::new());
        let umbrella = world.spawn_chirp_trigger("Umbrella", vec![a, b]);
        let sender = world.spawn_account("Sender");

        for _ in 0..3 {
            world.enqueue_creation(ChirpCreation {
                trigger_prefab: umbrella,
                sender,
                target: None,
            });
        }
        let chirps = world.process_creation_queue();
        let prefabs: Vec<Entity> = chirps
            .iter()
            .map(|c| world.chirp(*c).unwrap().prefab)
            .collect();

        assert_eq!(prefabs, vec![a, b, a]);
        assert_eq!(
            world.vanilla_message_id(chirps[1]).as_deref(),
            Some("Chirper.VARIANTB:0")
        );
    }

    #[test]
    fn test_placeholder_referenced_by_queue_and_links() {
        let world = SimWorld::new();
        let placeholder = world
            .spawn_placeholder(Marker {
                token: CorrelationToken(1),
                final_target: None,
            })
            .unwrap();
        assert!(!world.is_referenced(placeholder));

        world.enqueue_creation(ChirpCreation {
            trigger_prefab: Entity(999),
            sender: Entity::NULL,
            target: Some(placeholder),
        });
        assert!(world.is_referenced(placeholder));

        let chirp = world.process_creation_queue()[0];
        assert!(world.is_referenced(placeholder));

        world.destroy_chirp(chirp);
        assert_eq!(world.read_marker(placeholder), None);
    }

    #[test]
    fn test_tagged_chirps_not_reported_as_created() {
        let world = SimWorld::new();
        let first = world.spawn_vanilla_chirp(Entity(1), Entity(2), None, "Chirper.A:0");
        let second = world.spawn_vanilla_chirp(Entity(1), Entity(2), None, "Chirper.B:0");
        world.attach_text(first, "customchirps:x");

        assert_eq!(world.take_created_chirps(), vec![second]);
        assert!(world.take_created_chirps().is_empty());
    }
}
