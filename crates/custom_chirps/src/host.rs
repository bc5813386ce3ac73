//! # Chirp Host Interface
//!
//! What the plugin needs from the host application: sender account lookup,
//! the asynchronous chirp creation queue, and read/write access to the chirps
//! it created. The host also stores placeholders and reports prefab variants,
//! so [`ChirpHost`] extends the bus collaborator traits.

use payload_bus::{Entity, PlaceholderStore, VariantLookup};
use serde::{Deserialize, Serialize};

/// A request for the host to create one chirp on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpCreation {
    /// Trigger prefab to instantiate. May be an umbrella with variants.
    pub trigger_prefab: Entity,
    pub sender: Entity,
    /// Entity the host copies into the new chirp's link list.
    pub target: Option<Entity>,
}

/// Snapshot of a live chirp.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChirpView {
    pub id: Entity,
    /// Concrete prefab the host instantiated.
    pub prefab: Entity,
    pub sender: Entity,
    pub links: Vec<Entity>,
    /// Custom text key, once one has been attached.
    pub text_key: Option<String>,
    /// Sender label stamped by the spawner.
    pub sender_override: Option<String>,
}

pub trait ChirpHost: PlaceholderStore + VariantLookup {
    /// Finds the sender account whose prefab is named `prefab_name`, ignoring case.
    fn find_account(&self, prefab_name: &str) -> Option<Entity>;

    /// The generic chirp trigger prefab custom chirps are created from.
    fn default_chirp_prefab(&self) -> Option<Entity>;

    /// Queues a creation request. The chirp appears on a later tick.
    fn enqueue_creation(&self, request: ChirpCreation);

    /// Chirps created since the last call that carry no custom text yet.
    fn take_created_chirps(&self) -> Vec<Entity>;

    fn chirp(&self, chirp: Entity) -> Option<ChirpView>;

    fn set_sender(&self, chirp: Entity, sender: Entity);

    fn set_links(&self, chirp: Entity, links: Vec<Entity>);

    fn attach_text(&self, chirp: Entity, key: &str);

    fn set_override_sender(&self, chirp: Entity, name: &str);

    /// Destroys a chirp together with any placeholder still in its links.
    fn destroy_chirp(&self, chirp: Entity);

    /// The message id the host would display for a chirp it made on its own.
    fn vanilla_message_id(&self, chirp: Entity) -> Option<String>;

    fn exists(&self, entity: Entity) -> bool;
}
