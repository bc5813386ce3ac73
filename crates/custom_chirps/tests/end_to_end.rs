//! End-to-end tests for the custom chirps plugin against the reference host.

use custom_chirps::*;
use payload_bus::BusConfig;
use std::collections::HashSet;
use std::sync::Arc;

fn bus_config(percent: i32) -> BusConfig {
    BusConfig {
        vanilla_admission_percent: percent,
        rng_seed: Some(99),
        orphan_sweep_interval_ticks: 1,
        ..BusConfig::default()
    }
}

fn plugin_with(
    world: Arc<SimWorld>,
    percent: i32,
    chirps: ChirpConfig,
) -> CustomChirps<SimWorld> {
    CustomChirps::new(world, &bus_config(percent), &chirps)
}

fn heuristic_only() -> ChirpConfig {
    ChirpConfig {
        use_markers: false,
        ..ChirpConfig::default()
    }
}

#[test]
fn test_token_path_links_target_and_sender() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());
    let school = world.spawn_building("Elementary School");
    let police = world.find_account("PoliceChirperAccount").unwrap();

    let key = plugin
        .api()
        .post_chirp("Break-in reported", DepartmentAccount::Police, Some(school), None)
        .unwrap();
    assert!(key.starts_with(KEY_PREFIX));
    assert_eq!(world.census().placeholders, 1);

    let chirp = world.process_creation_queue()[0];
    let report = plugin.on_tick();
    assert_eq!(report.matched_token, 1);

    let rendered = plugin.ui().render(chirp).unwrap();
    assert_eq!(rendered.message_id, key);
    assert_eq!(rendered.text, "Break-in reported {LINK_1}");
    assert_eq!(rendered.links, vec![school]);
    assert_eq!(rendered.sender, police);
    assert_eq!(rendered.sender_label, None);
    assert!(rendered.custom);
    assert_eq!(world.census().placeholders, 0);
}

#[test]
fn test_heuristic_path_with_umbrella_variants() {
    let world = Arc::new(SimWorld::new());
    for department in DepartmentAccount::ALL {
        world.spawn_account(department.prefab_name());
    }
    let a = world.spawn_prefab("ChirpVariantA", Vec::new());
    let b = world.spawn_prefab("ChirpVariantB", Vec::new());
    world.spawn_chirp_trigger("ChirpUmbrella", vec![a, b]);
    let plugin = plugin_with(world.clone(), 100, heuristic_only());

    let park = world.spawn_building("Central Park");
    let depot = world.spawn_building("Bus Depot");
    let park_key = plugin
        .api()
        .post_chirp("Picnic season", DepartmentAccount::ParkAndRec, Some(park), None)
        .unwrap();
    let depot_key = plugin
        .api()
        .post_chirp("New routes", DepartmentAccount::Transportation, Some(depot), None)
        .unwrap();

    // Swap the links so producer FIFO alone would hand out the wrong texts.
    let chirps = world.process_creation_queue();
    world.set_links(chirps[0], vec![depot]);
    world.set_links(chirps[1], vec![park]);
    let report = plugin.on_tick();

    assert_eq!(report.matched_heuristic, 2);
    assert_eq!(plugin.ui().message_id(chirps[0]), Some(depot_key));
    assert_eq!(plugin.ui().message_id(chirps[1]), Some(park_key));
    assert_eq!(plugin.bus().pending_count(), 0);
}

#[test]
fn test_unmatched_vanilla_chirps_follow_admission() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 0, ChirpConfig::default());
    let prefab = world.default_chirp_prefab().unwrap();
    let sender = world.find_account("WaterChirperAccount").unwrap();

    let first = world.spawn_vanilla_chirp(prefab, sender, None, "Chirper.WATER_PUMPING:0");
    let second = world.spawn_vanilla_chirp(prefab, sender, None, "Chirper.WATER_PUMPING:1");
    let report = plugin.on_tick();
    assert_eq!(report.dropped_vanilla, 2);
    assert_eq!(world.census().chirps, 0);
    assert!(!plugin.bus().was_resolved(first));
    assert!(!plugin.bus().was_resolved(second));

    plugin.settings().set_admission_percent(100);
    world.spawn_vanilla_chirp(prefab, sender, None, "Chirper.WATER_PUMPING:2");
    let report = plugin.on_tick();
    assert_eq!(report.kept_vanilla, 1);
    assert_eq!(world.census().chirps, 1);
}

#[test]
fn test_publish_filter_drops_blocked_and_disabled_vanilla() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());
    let prefab = world.default_chirp_prefab().unwrap();
    let sender = world.find_account("ElectricityChirperAccount").unwrap();

    let blocked = world.spawn_vanilla_chirp(
        prefab,
        sender,
        None,
        "Chirper.CITY_SERVICE_ELECTRICITY_IMPORT:3",
    );
    let allowed = world.spawn_vanilla_chirp(prefab, sender, None, "Chirper.POWER_GOOD:0");
    plugin.on_tick();
    let published = plugin.ui().publish_filter(&[blocked, allowed]);
    assert_eq!(published, vec![allowed]);
    assert!(!world.exists(blocked));

    plugin.settings().set_disable_vanilla_chirps(true);
    plugin
        .api()
        .post_chirp("Grid upgraded", DepartmentAccount::Electricity, None, None)
        .unwrap();
    let custom = world.process_creation_queue()[0];
    plugin.on_tick();

    let published = plugin.ui().publish_filter(&[allowed, custom]);
    assert_eq!(published, vec![custom]);
    assert!(!world.exists(allowed));
}

#[test]
fn test_ui_late_binds_before_spawner_runs() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, heuristic_only());

    let key = plugin
        .api()
        .post_chirp("Mail delayed", DepartmentAccount::Post, None, Some("Postmaster"))
        .unwrap();
    let chirp = world.process_creation_queue()[0];

    assert_eq!(plugin.ui().message_id(chirp), Some(key.clone()));
    assert_eq!(plugin.ui().sender_label(chirp).as_deref(), Some("Postmaster"));

    // Already tagged, so the spawner leaves it alone.
    assert!(plugin.on_tick().is_idle());
    assert_eq!(plugin.ui().message_id(chirp), Some(key));
}

#[test]
fn test_ui_never_late_binds_admitted_vanilla_chirp() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, heuristic_only());
    let prefab = world.default_chirp_prefab().unwrap();
    let sender = world.find_account("TransportationChirperAccount").unwrap();

    let old = world.spawn_vanilla_chirp(prefab, sender, None, "Chirper.TRAFFIC_JAM:0");
    assert_eq!(plugin.on_tick().kept_vanilla, 1);

    let key = plugin
        .api()
        .post_chirp("Bus lanes open", DepartmentAccount::Transportation, None, None)
        .unwrap();

    // Re-rendering the admitted chirp must leave the queued payload alone.
    assert_eq!(
        plugin.ui().message_id(old).as_deref(),
        Some("Chirper.TRAFFIC_JAM:0")
    );
    assert_eq!(plugin.bus().pending_count(), 1);

    let fresh = world.process_creation_queue()[0];
    assert_eq!(plugin.on_tick().matched_heuristic, 1);
    assert_eq!(world.chirp(fresh).unwrap().text_key, Some(key.clone()));
    assert_eq!(plugin.ui().message_id(fresh), Some(key));
}

#[test]
fn test_ui_restores_lost_target_link() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, heuristic_only());
    let park = world.spawn_building("Central Park");

    let key = plugin
        .api()
        .post_chirp("Concert tonight", DepartmentAccount::ParkAndRec, Some(park), None)
        .unwrap();
    let chirp = world.process_creation_queue()[0];
    plugin.on_tick();
    assert_eq!(world.chirp(chirp).unwrap().links, vec![park]);

    world.set_links(chirp, Vec::new());
    assert_eq!(plugin.ui().message_id(chirp), Some(key));
    assert_eq!(world.chirp(chirp).unwrap().links, vec![park]);
}

#[test]
fn test_orphan_placeholder_reclaimed_after_host_destroys_chirp() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());

    plugin
        .api()
        .post_chirp("Never shown", DepartmentAccount::Garbage, None, None)
        .unwrap();
    let chirp = world.process_creation_queue()[0];
    world.destroy_chirp(chirp);
    plugin.ui().on_chirp_destroyed(chirp);

    let report = plugin.on_tick();
    assert_eq!(report.orphans_reclaimed, 1);
    assert_eq!(plugin.bus().live_marker_count(), 0);
    assert_eq!(plugin.bus().bound_token_count(), 0);
}

#[test]
fn test_missing_department_and_prefab() {
    let world = Arc::new(SimWorld::new());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());

    assert_eq!(
        plugin
            .api()
            .post_chirp("Hello", DepartmentAccount::Healthcare, None, None),
        Err(ChirpError::DepartmentMissing(DepartmentAccount::Healthcare))
    );

    world.spawn_account("HealthcareChirperAccount");
    assert_eq!(
        plugin
            .api()
            .post_chirp("Hello", DepartmentAccount::Healthcare, None, None),
        Err(ChirpError::NoChirpPrefab)
    );
    assert_eq!(plugin.bus().text_count(), 0);
}

#[test]
fn test_shutdown_destroys_outstanding_placeholders() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());
    for _ in 0..3 {
        plugin
            .api()
            .post_chirp("Pending", DepartmentAccount::Roads, None, None)
            .unwrap();
    }
    assert_eq!(world.census().placeholders, 3);

    plugin.shutdown();
    assert_eq!(world.census().placeholders, 0);
    assert_eq!(plugin.bus().text_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_posts_each_land_on_one_chirp() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = Arc::new(plugin_with(world.clone(), 100, ChirpConfig::default()));

    let mut producers = Vec::new();
    for department in [
        DepartmentAccount::Police,
        DepartmentAccount::FireRescue,
        DepartmentAccount::Education,
    ] {
        let plugin = plugin.clone();
        producers.push(tokio::task::spawn_blocking(move || {
            (0..50)
                .map(|n| {
                    plugin
                        .api()
                        .post_chirp(&format!("{department} #{n}"), department, None, None)
                        .expect("post succeeds")
                })
                .collect::<Vec<_>>()
        }));
    }

    let mut posted = HashSet::new();
    for producer in producers {
        posted.extend(producer.await.expect("producer panicked"));
    }

    world.process_creation_queue();
    let report = plugin.on_tick();
    assert_eq!(report.matched_token, 150);

    let shown: HashSet<String> = world
        .chirps()
        .into_iter()
        .filter_map(|chirp| plugin.ui().message_id(chirp))
        .collect();
    assert_eq!(shown, posted);
    assert_eq!(plugin.bus().live_marker_count(), 0);
    assert_eq!(world.census().placeholders, 0);
}

#[test]
fn test_blank_sender_name_ignored() {
    let world = Arc::new(SimWorld::with_default_accounts());
    let plugin = plugin_with(world.clone(), 100, ChirpConfig::default());
    plugin
        .api()
        .post_chirp("Census day", DepartmentAccount::CensusBureau, None, Some("  "))
        .unwrap();
    let chirp = world.process_creation_queue()[0];
    plugin.on_tick();

    assert_eq!(plugin.ui().sender_label(chirp), None);
    assert_eq!(world.chirp(chirp).map(|view| view.sender_override), Some(None));
    assert!(world.exists(chirp));
}
