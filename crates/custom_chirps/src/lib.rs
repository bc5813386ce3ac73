//! # Custom Chirps
//!
//! Lets other mods post chirps with their own text, sender label and link
//! target, although the host only creates chirps through its own queue and
//! never says which request produced which chirp.
//!
//! - [`ChirpApi`] stores the text, queues the payload on the
//!   [`PayloadBus`](payload_bus::PayloadBus) and asks the host for a chirp
//! - [`ChirpSpawner`] pairs each chirp the host created with its payload
//! - [`ChirperUi`] resolves message ids, texts and sender labels for display
//!   and filters vanilla chirps before they are published
//! - [`SimWorld`] is an in-memory host for tests and the demo binary
//!
//! ```rust
//! use custom_chirps::*;
//! use payload_bus::BusConfig;
//! use std::sync::Arc;
//!
//! let world = Arc::new(SimWorld::with_default_accounts());
//! let plugin = CustomChirps::new(world.clone(), &BusConfig::default(), &ChirpConfig::default());
//!
//! let key = plugin
//!     .api()
//!     .post_chirp("Power restored", DepartmentAccount::Electricity, None, Some("Grid Ops"))
//!     .unwrap();
//!
//! let chirps = world.process_creation_queue();
//! plugin.on_tick();
//!
//! let rendered = plugin.ui().render(chirps[0]).unwrap();
//! assert_eq!(rendered.message_id, key);
//! assert_eq!(rendered.text, "Power restored");
//! assert_eq!(rendered.sender_label.as_deref(), Some("Grid Ops"));
//! ```

pub mod api;
pub mod department;
pub mod error;
pub mod filter;
pub mod host;
pub mod plugin;
pub mod settings;
pub mod sim;
pub mod spawner;
pub mod ui;

pub use api::{is_custom_key, with_link_token, ChirpApi, KEY_PREFIX};
pub use department::DepartmentAccount;
pub use error::ChirpError;
pub use filter::{ChirpFilter, DEFAULT_BLOCKED_PREFIX};
pub use host::{ChirpCreation, ChirpHost, ChirpView};
pub use plugin::CustomChirps;
pub use settings::{ChirpConfig, ChirpSettings};
pub use sim::{SimWorld, WorldCensus, CHIRP_TRIGGER_PREFAB};
pub use spawner::{ChirpSpawner, SpawnReport};
pub use ui::{ChirperUi, RenderedChirp};
