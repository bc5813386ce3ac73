//! # Chirper UI Resolution
//!
//! The read side used when the host displays chirps: which message id a chirp
//! shows, which text that id stands for, which sender label to print, and
//! which freshly created chirps get published at all.

use crate::api::is_custom_key;
use crate::filter::ChirpFilter;
use crate::host::ChirpHost;
use crate::settings::ChirpSettings;
use crate::spawner::{apply_payload, payload_applied};
use payload_bus::{Entity, PayloadBus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// A chirp as the feed shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedChirp {
    pub id: Entity,
    pub message_id: String,
    pub text: String,
    pub sender: Entity,
    /// Label shown instead of the sender account's own name.
    pub sender_label: Option<String>,
    pub links: Vec<Entity>,
    pub custom: bool,
}

pub struct ChirperUi<H: ChirpHost> {
    host: Arc<H>,
    bus: Arc<PayloadBus>,
    settings: Arc<ChirpSettings>,
    filter: ChirpFilter,
}

impl<H: ChirpHost> ChirperUi<H> {
    pub fn new(
        host: Arc<H>,
        bus: Arc<PayloadBus>,
        settings: Arc<ChirpSettings>,
        filter: ChirpFilter,
    ) -> Self {
        Self {
            host,
            bus,
            settings,
            filter,
        }
    }

    /// The message id a chirp displays.
    ///
    /// A chirp that already carries custom text keeps it, and is only written
    /// back to when the host lost part of its payload. A chirp the spawner has
    /// not processed yet may still claim a payload queued for its prefab.
    /// Anything else shows the host's own id.
    pub fn message_id(&self, chirp: Entity) -> Option<String> {
        let view = self.host.chirp(chirp)?;

        if let Some(key) = &view.text_key {
            if let Some(body) = self.bus.attached(chirp) {
                if !payload_applied(&view, &body) {
                    apply_payload(self.host.as_ref(), &view, &body, view.links.clone());
                }
            }
            return Some(key.clone());
        }

        if !view.prefab.is_null() && !self.bus.was_resolved(chirp) {
            if let Some(body) = self.bus.dequeue_by_producer(view.prefab) {
                debug!("⏱️ Late-bound {} to chirp {}", body.text_key, chirp);
                apply_payload(self.host.as_ref(), &view, &body, view.links.clone());
                let key = body.text_key.clone();
                self.bus.remember(chirp, body);
                return Some(key);
            }
        }

        self.host.vanilla_message_id(chirp)
    }

    /// The sender label override for a chirp, if it has one.
    pub fn sender_label(&self, chirp: Entity) -> Option<String> {
        self.bus
            .attached(chirp)
            .and_then(|body| body.sender_name)
            .or_else(|| self.host.chirp(chirp).and_then(|view| view.sender_override))
    }

    pub fn render(&self, chirp: Entity) -> Option<RenderedChirp> {
        let message_id = self.message_id(chirp)?;
        let view = self.host.chirp(chirp)?;
        let custom = is_custom_key(&message_id);
        let text = if custom {
            self.bus.text(&message_id).unwrap_or_else(|| message_id.clone())
        } else {
            message_id.clone()
        };

        Some(RenderedChirp {
            id: chirp,
            message_id,
            text,
            sender: view.sender,
            sender_label: self.sender_label(chirp),
            links: view.links,
            custom,
        })
    }

    /// Filters newly created chirps before the feed publishes them.
    ///
    /// Custom chirps always pass. Vanilla chirps are destroyed when vanilla
    /// chirps are disabled or their key is block-listed. Returns the chirps
    /// that remain published.
    pub fn publish_filter(&self, created: &[Entity]) -> Vec<Entity> {
        let disable_vanilla = self.settings.disable_vanilla_chirps();
        let mut published = Vec::with_capacity(created.len());

        for &chirp in created {
            let Some(key) = self.message_id(chirp) else {
                continue;
            };
            if is_custom_key(&key) {
                published.push(chirp);
                continue;
            }
            if disable_vanilla || self.filter.is_blocked(&key) {
                info!("🔇 Filtered chirp {} ({})", chirp, key);
                self.host.destroy_chirp(chirp);
                self.on_chirp_destroyed(chirp);
                continue;
            }
            published.push(chirp);
        }
        published
    }

    /// Drops what the plugin remembers about a destroyed chirp.
    pub fn on_chirp_destroyed(&self, chirp: Entity) {
        self.bus.forget(chirp);
    }
}
