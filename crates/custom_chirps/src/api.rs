//! # Producer API
//!
//! [`ChirpApi::post_chirp`] is what other mods call to publish a chirp. The
//! host offers no way to create a chirp with custom text directly, so the API
//! stores the text, queues the payload on the bus and then asks the host for
//! an ordinary chirp. The spawner pairs the two up once the host has created it.

use crate::department::DepartmentAccount;
use crate::error::ChirpError;
use crate::host::{ChirpCreation, ChirpHost};
use crate::settings::ChirpConfig;
use payload_bus::{BusError, Entity, PayloadBody, PayloadBus};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Prefix of every text key the plugin generates.
pub const KEY_PREFIX: &str = "customchirps:";

/// Link token the host replaces with the first linked entity.
pub const LINK_TOKEN: &str = "{LINK_1}";

pub fn is_custom_key(key: &str) -> bool {
    key.starts_with(KEY_PREFIX)
}

/// Appends ` {LINK_1}` when there is a target and the text has no link token.
pub fn with_link_token(text: &str, has_target: bool) -> String {
    if has_target && !text.contains("{LINK_") {
        format!("{text} {LINK_TOKEN}")
    } else {
        text.to_string()
    }
}

pub struct ChirpApi<H: ChirpHost> {
    host: Arc<H>,
    bus: Arc<PayloadBus>,
    use_markers: bool,
}

impl<H: ChirpHost> ChirpApi<H> {
    pub fn new(host: Arc<H>, bus: Arc<PayloadBus>, config: &ChirpConfig) -> Self {
        Self {
            host,
            bus,
            use_markers: config.use_markers,
        }
    }

    /// Posts a chirp from `department`, optionally linking `target` and
    /// showing `sender_name` instead of the department's name.
    ///
    /// Returns the generated text key.
    pub fn post_chirp(
        &self,
        text: &str,
        department: DepartmentAccount,
        target: Option<Entity>,
        sender_name: Option<&str>,
    ) -> Result<String, ChirpError> {
        let sender = self
            .host
            .find_account(department.prefab_name())
            .ok_or(ChirpError::DepartmentMissing(department))?;
        let prefab = self
            .host
            .default_chirp_prefab()
            .ok_or(ChirpError::NoChirpPrefab)?;

        let target = target.and_then(Entity::non_null);
        let key = format!("{KEY_PREFIX}{}", Uuid::new_v4());
        self.bus
            .remember_text(key.clone(), with_link_token(text, target.is_some()))?;

        let mut body = PayloadBody::new(key.clone()).with_sender(sender);
        if let Some(target) = target {
            body = body.with_target(target);
        }
        if let Some(name) = sender_name {
            body = body.with_sender_name(name);
        }

        let creation_target = self.queue_payload(prefab, target, body)?;
        self.host.enqueue_creation(ChirpCreation {
            trigger_prefab: prefab,
            sender,
            target: creation_target,
        });

        info!(
            "📣 Queued chirp {} (department: {}, sender: {}, target: {})",
            key,
            department,
            sender,
            target.map_or_else(|| "none".to_string(), |t| t.to_string())
        );
        Ok(key)
    }

    /// Drops every stored chirp text.
    pub fn clear_window(&self) {
        self.bus.clear_texts();
    }

    /// Queues `body` and returns the entity to hand to the host as target.
    fn queue_payload(
        &self,
        prefab: Entity,
        target: Option<Entity>,
        body: PayloadBody,
    ) -> Result<Option<Entity>, ChirpError> {
        if self.use_markers {
            match self
                .bus
                .enqueue_with_marker(target, body.clone(), self.host.as_ref())
            {
                Ok(placeholder) => return Ok(Some(placeholder)),
                Err(BusError::PlaceholderUnavailable(reason)) => {
                    warn!("⚠️ No placeholder ({}), falling back to heuristic matching", reason);
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.bus.enqueue(prefab, target, body)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_token_appended_once() {
        assert_eq!(with_link_token("Fire!", true), "Fire! {LINK_1}");
        assert_eq!(with_link_token("See {LINK_2}", true), "See {LINK_2}");
        assert_eq!(with_link_token("Quiet day", false), "Quiet day");
    }

    #[test]
    fn test_custom_key_prefix() {
        assert!(is_custom_key("customchirps:1234"));
        assert!(!is_custom_key("Chirper.TRAFFIC_JAM:0"));
    }
}
