//! End-to-end correlation tests against the public bus API.

use payload_bus::*;
use std::collections::HashMap;

fn bus_with(percent: i32) -> PayloadBus {
    PayloadBus::new(&BusConfig {
        vanilla_admission_percent: percent,
        rng_seed: Some(3),
        ..BusConfig::default()
    })
}

/// Umbrella template 1 spawns concrete variants 10 and 11.
fn umbrella_variants() -> HashMap<Entity, Vec<Entity>> {
    let mut variants = HashMap::new();
    variants.insert(Entity(1), vec![Entity(10), Entity(11)]);
    variants
}

#[test]
fn test_variant_scoring_prefers_matching_target() {
    let bus = bus_with(100);
    let umbrella = Entity(1);
    let t1 = Entity(200);

    bus.enqueue(umbrella, Some(t1), PayloadBody::new("A")).unwrap();
    bus.enqueue(umbrella, None, PayloadBody::new("B")).unwrap();

    let claimed = bus.dequeue_best_variant(Entity(10), None, Some(t1), &umbrella_variants());
    assert_eq!(claimed.map(|b| b.text_key), Some("A".to_string()));

    let claimed = bus.dequeue_best_variant(Entity(11), None, None, &umbrella_variants());
    assert_eq!(claimed.map(|b| b.text_key), Some("B".to_string()));
    assert_eq!(bus.index_sizes(), IndexSizes::default());
}

#[test]
fn test_sender_breaks_tie_between_variants() {
    let bus = bus_with(100);
    let police = Entity(70);
    bus.enqueue(Entity(1), None, PayloadBody::new("fire"))
        .unwrap();
    bus.enqueue(
        Entity(1),
        None,
        PayloadBody::new("police").with_sender(police),
    )
    .unwrap();

    let claimed = bus.dequeue_best_variant(Entity(10), Some(police), None, &umbrella_variants());
    assert_eq!(claimed.map(|b| b.text_key), Some("police".to_string()));
}

#[test]
fn test_producer_fifo_through_resolve() {
    let bus = bus_with(100);
    for key in ["first", "second", "third"] {
        bus.enqueue(Entity(5), None, PayloadBody::new(key)).unwrap();
    }

    let keys: Vec<String> = (0..3)
        .map(|i| {
            let event = CreatedEvent {
                id: Entity(100 + i),
                producer: Entity(5),
                sender: None,
            };
            bus.resolve(&event, &mut Vec::<Entity>::new(), &NullHost)
                .into_body()
                .map(|b| b.text_key)
                .unwrap_or_default()
        })
        .collect();

    assert_eq!(keys, ["first", "second", "third"]);
    assert_eq!(bus.attached_count(), 3);
    assert_eq!(bus.stats().total_matched(), 3);
}

#[test]
fn test_exact_target_wins_over_earlier_producer_item() {
    let bus = bus_with(100);
    bus.enqueue(Entity(5), None, PayloadBody::new("generic"))
        .unwrap();
    bus.enqueue(Entity(5), Some(Entity(42)), PayloadBody::new("linked"))
        .unwrap();

    let event = CreatedEvent {
        id: Entity(900),
        producer: Entity(5),
        sender: None,
    };
    let resolution = bus.resolve(&event, &mut vec![Entity(42)], &NullHost);
    assert_eq!(
        resolution,
        Resolution::Heuristic {
            body: PayloadBody::new("linked"),
            strategy: HeuristicStrategy::ExactTarget,
        }
    );
    assert_eq!(bus.pending_count(), 1);
}

#[test]
fn test_unmatched_event_follows_policy() {
    let policy = std::sync::Arc::new(SharedAdmission::new(100));
    let bus = PayloadBus::with_policy(&BusConfig::default(), policy.clone());
    let event = CreatedEvent {
        id: Entity(1),
        producer: Entity(2),
        sender: None,
    };

    assert_eq!(
        bus.resolve(&event, &mut Vec::<Entity>::new(), &NullHost),
        Resolution::Unmatched { admitted: true }
    );

    policy.set(0);
    assert_eq!(
        bus.resolve(&event, &mut Vec::<Entity>::new(), &NullHost),
        Resolution::Unmatched { admitted: false }
    );

    let stats = bus.stats();
    assert_eq!(stats.unmatched_admitted, 1);
    assert_eq!(stats.unmatched_rejected, 1);
}

#[test]
fn test_marker_requires_placeholder_storage() {
    let bus = bus_with(100);
    let result = bus.enqueue_with_marker(None, PayloadBody::new("x"), &NullHost);

    assert!(matches!(result, Err(BusError::PlaceholderUnavailable(_))));
    assert_eq!(bus.live_marker_count(), 0);
    assert_eq!(bus.bound_token_count(), 0);
}

#[test]
fn test_text_window_keeps_most_recent() {
    let bus = PayloadBus::new(&BusConfig {
        text_window_size: 3,
        ..BusConfig::default()
    });
    for i in 0..5 {
        bus.remember_text(format!("k{i}"), format!("text {i}")).unwrap();
    }
    // Re-inserting refreshes position, so k2 survives the next eviction.
    bus.remember_text("k2", "text 2 again").unwrap();
    bus.remember_text("k5", "text 5").unwrap();

    assert_eq!(bus.text("k3"), None);
    assert_eq!(bus.text("k2").as_deref(), Some("text 2 again"));
    assert_eq!(bus.text_count(), 3);
}

#[test]
fn test_stats_serialize_for_reporting() {
    let bus = bus_with(100);
    bus.enqueue(Entity(1), None, PayloadBody::new("a")).unwrap();

    let json = serde_json::to_value(bus.stats()).unwrap();
    assert_eq!(json["enqueued"], 1);
    assert_eq!(json["orphans_reclaimed"], 0);
}
