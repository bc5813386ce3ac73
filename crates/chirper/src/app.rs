//! The demo application: a simulated city, producer threads posting chirps
//! through the plugin API, and the host tick loop.

use crate::cli::CliArgs;
use crate::config::AppConfig;
use crate::logging::setup_logging;
use crate::signals::wait_for_shutdown;
use anyhow::anyhow;
use custom_chirps::{ChirpHost, CustomChirps, DepartmentAccount, SimWorld, SpawnReport};
use payload_bus::Entity;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const VANILLA_KEYS: [&str; 5] = [
    "Chirper.CITY_SERVICE_ELECTRICITY_IMPORT:0",
    "Chirper.TRAFFIC_JAM:0",
    "Chirper.GOOD_PARKS:1",
    "Chirper.HIGH_TAXES:0",
    "Chirper.NEW_MILESTONE:2",
];

const HEADLINES: [&str; 6] = [
    "Crews are on site",
    "Service restored ahead of schedule",
    "Please expect delays today",
    "Thank you for your patience",
    "New schedule starts tomorrow",
    "Inspection passed with flying colors",
];

pub struct Application {
    config: AppConfig,
    world: Arc<SimWorld>,
    plugin: Arc<CustomChirps<SimWorld>>,
    buildings: Arc<Vec<Entity>>,
    vanilla_prefab: Entity,
    stop: Arc<AtomicBool>,
}

impl Application {
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        // Load configuration first (before logging setup)
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }
        if args.json_logs {
            config.logging.json_format = true;
        }
        if let Some(ticks) = args.ticks {
            config.simulation.max_ticks = ticks;
        }

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        setup_logging(&config.logging)?;
        display_banner();

        let world = Arc::new(SimWorld::with_default_accounts());
        let vanilla_prefab = world.spawn_prefab("VanillaChirpTrigger", Vec::new());
        let buildings = (0..config.simulation.buildings)
            .map(|i| world.spawn_building(&format!("Building #{}", i + 1)))
            .collect();
        let plugin = Arc::new(CustomChirps::new(
            world.clone(),
            &config.bus,
            &config.chirps,
        ));

        info!("📂 Config: {}", args.config_path.display());
        Ok(Self {
            config,
            world,
            plugin,
            buildings: Arc::new(buildings),
            vanilla_prefab,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let simulation = &self.config.simulation;
        info!("🌟 Starting chirper");
        info!("📋 Configuration Summary:");
        info!("  ⏱️ Tick interval: {}ms", simulation.tick_interval_ms);
        info!(
            "  🧵 Producers: {} x {} posts",
            simulation.producer_threads, simulation.posts_per_producer
        );
        info!(
            "  🎲 Vanilla admission: {}%",
            self.config.bus.vanilla_admission_percent
        );

        let producers = self.spawn_producers();
        let max_ticks = simulation.max_ticks;

        tokio::select! {
            result = self.tick_loop(max_ticks) => {
                result?;
                info!("🏁 Reached {} ticks", max_ticks);
            }
            result = wait_for_shutdown() => {
                let received = result?;
                info!("🛑 Received {} signal, stopping producers and draining the bus...", received);
            }
        }

        self.stop.store(true, Ordering::Relaxed);
        for producer in producers {
            if let Err(e) = producer.await {
                warn!("⚠️ Producer task failed: {}", e);
            }
        }
        self.plugin.shutdown();

        let stats = self.plugin.bus().stats();
        info!("📊 Final Statistics:");
        info!("  - Payloads queued: {}", stats.enqueued + stats.marker_posts);
        info!("  - Payloads matched: {}", stats.total_matched());
        info!("  - Orphans reclaimed: {}", stats.orphans_reclaimed);
        info!("👋 Chirper shutdown complete");
        Ok(())
    }

    fn spawn_producers(&self) -> Vec<JoinHandle<()>> {
        let simulation = &self.config.simulation;
        let pause = Duration::from_millis(simulation.tick_interval_ms.max(1) * 2);

        (0..simulation.producer_threads)
            .map(|producer| {
                let plugin = self.plugin.clone();
                let buildings = self.buildings.clone();
                let posts = simulation.posts_per_producer;
                let stop = self.stop.clone();

                tokio::task::spawn_blocking(move || {
                    let mut rng = rand::thread_rng();
                    for n in 0..posts {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let department = DepartmentAccount::ALL
                            .choose(&mut rng)
                            .copied()
                            .unwrap_or(DepartmentAccount::Roads);
                        let target = if rng.gen_bool(0.5) {
                            buildings.choose(&mut rng).copied()
                        } else {
                            None
                        };
                        let headline = HEADLINES.choose(&mut rng).copied().unwrap_or_default();
                        let sender_name =
                            (n % 3 == 0).then(|| format!("{department} Desk #{producer}"));

                        if let Err(e) = plugin.api().post_chirp(
                            &format!("{headline} ({department} #{n})"),
                            department,
                            target,
                            sender_name.as_deref(),
                        ) {
                            warn!("⚠️ Producer {} failed to post: {}", producer, e);
                        }
                        std::thread::sleep(pause);
                    }
                    info!("✅ Producer {} finished {} posts", producer, posts);
                })
            })
            .collect()
    }

    /// Runs host ticks until `max_ticks` is reached, or forever when it is 0.
    async fn tick_loop(&self, max_ticks: u64) -> anyhow::Result<()> {
        let simulation = &self.config.simulation;
        let mut interval =
            tokio::time::interval(Duration::from_millis(simulation.tick_interval_ms));
        let mut totals = SpawnReport::default();
        let mut tick = 0u64;

        while max_ticks == 0 || tick < max_ticks {
            interval.tick().await;
            tick += 1;

            let report = self.host_tick();
            totals.matched_token += report.matched_token;
            totals.matched_heuristic += report.matched_heuristic;
            totals.kept_vanilla += report.kept_vanilla;
            totals.dropped_vanilla += report.dropped_vanilla;
            totals.orphans_reclaimed += report.orphans_reclaimed;

            if simulation.stats_interval_ticks > 0 && tick % simulation.stats_interval_ticks == 0 {
                match serde_json::to_string(&self.plugin.bus().stats()) {
                    Ok(stats) => info!("📊 Tick {} bus stats: {}", tick, stats),
                    Err(e) => error!("❌ Failed to serialize bus stats: {}", e),
                }
                info!(
                    "📈 Tick {} totals: {} matched, {} vanilla kept, {} vanilla dropped, {} chirps live",
                    tick,
                    totals.matched(),
                    totals.kept_vanilla,
                    totals.dropped_vanilla,
                    self.world.census().chirps
                );
            }
        }
        Ok(())
    }

    /// One host tick: create queued chirps, let the host chirp on its own,
    /// run the plugin, then publish what survived.
    fn host_tick(&self) -> SpawnReport {
        let mut created = self.world.process_creation_queue();
        created.extend(self.inject_vanilla_chirps());

        let report = self.plugin.on_tick();

        let created: Vec<Entity> = created
            .into_iter()
            .filter(|chirp| self.world.exists(*chirp))
            .collect();
        for chirp in self.plugin.ui().publish_filter(&created) {
            if let Some(rendered) = self.plugin.ui().render(chirp) {
                let sender = rendered
                    .sender_label
                    .clone()
                    .or_else(|| self.world.name_of(rendered.sender))
                    .unwrap_or_else(|| rendered.sender.to_string());
                info!("🐦 {}: {}", sender, rendered.text);
            }
        }
        report
    }

    fn inject_vanilla_chirps(&self) -> Vec<Entity> {
        let mut rng = rand::thread_rng();
        (0..self.config.simulation.vanilla_chirps_per_tick)
            .filter_map(|_| {
                let department = DepartmentAccount::ALL.choose(&mut rng).copied()?;
                let sender = self.world_account(department)?;
                let key = VANILLA_KEYS.choose(&mut rng).copied()?;
                Some(
                    self.world
                        .spawn_vanilla_chirp(self.vanilla_prefab, sender, None, key),
                )
            })
            .collect()
    }

    fn world_account(&self, department: DepartmentAccount) -> Option<Entity> {
        self.world.find_account(department.prefab_name())
    }
}

fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("🐦 Chirper v{} - custom chirps demo host", version);
}
