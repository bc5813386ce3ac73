use crate::api::ChirpApi;
use crate::filter::ChirpFilter;
use crate::host::ChirpHost;
use crate::settings::{ChirpConfig, ChirpSettings};
use crate::spawner::{ChirpSpawner, SpawnReport};
use crate::ui::ChirperUi;
use payload_bus::{BusConfig, PayloadBus};
use std::sync::Arc;
use tracing::info;

/// The plugin as a host sees it: one bus shared by the producer API, the
/// spawner and the UI resolver.
pub struct CustomChirps<H: ChirpHost> {
    host: Arc<H>,
    bus: Arc<PayloadBus>,
    settings: Arc<ChirpSettings>,
    api: ChirpApi<H>,
    spawner: ChirpSpawner<H>,
    ui: ChirperUi<H>,
}

impl<H: ChirpHost> CustomChirps<H> {
    pub fn new(host: Arc<H>, bus_config: &BusConfig, chirp_config: &ChirpConfig) -> Self {
        let settings = Arc::new(ChirpSettings::from_config(chirp_config, bus_config));
        let bus = payload_bus::create_payload_bus_with_policy(bus_config, settings.clone());

        let api = ChirpApi::new(host.clone(), bus.clone(), chirp_config);
        let spawner = ChirpSpawner::new(
            host.clone(),
            bus.clone(),
            bus_config.orphan_sweep_interval_ticks,
        );
        let ui = ChirperUi::new(
            host.clone(),
            bus.clone(),
            settings.clone(),
            ChirpFilter::from_config(chirp_config),
        );

        info!(
            "🔌 Custom chirps plugin ready (markers: {}, vanilla disabled: {})",
            chirp_config.use_markers, chirp_config.disable_vanilla_chirps
        );
        Self {
            host,
            bus,
            settings,
            api,
            spawner,
            ui,
        }
    }

    pub fn api(&self) -> &ChirpApi<H> {
        &self.api
    }

    pub fn ui(&self) -> &ChirperUi<H> {
        &self.ui
    }

    pub fn settings(&self) -> &Arc<ChirpSettings> {
        &self.settings
    }

    pub fn bus(&self) -> &Arc<PayloadBus> {
        &self.bus
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Runs the spawner for one host tick.
    pub fn on_tick(&self) -> SpawnReport {
        self.spawner.run_tick()
    }

    /// Destroys every placeholder the plugin still owns and drops its state.
    pub fn shutdown(&self) {
        self.bus.shutdown(self.host.as_ref());
        info!("🔌 Custom chirps plugin shut down");
    }
}
