use gridsight_sim::{
    Bounds, DistanceMetric, EntityRecord, EventLog, GridMode, InterestConfig, InterestManager, PlayerRecord,
    QueryMode, RangePolicy, RangeRule, Roster, RosterSnapshot, StaticBounds, Subscriber, SubscriptionEvent,
    SubscriptionScope, Vec2, Vec3, VisibilityPolicy, WorldBox,
};
use std::collections::HashSet;

fn entity(id: u32, x: f32, z: f32, range: f32) -> EntityRecord {
    EntityRecord::new(id, Vec3::new(x, 0.0, z), range)
}

fn set(ids: &[u32]) -> HashSet<u32> {
    ids.iter().copied().collect()
}

/// Force a scan and return what it emitted.
fn scan<P: VisibilityPolicy>(manager: &mut InterestManager<P>, roster: &RosterSnapshot) -> EventLog {
    let mut log = EventLog::new();
    manager.force_scan();
    manager.tick(0.0, roster, &mut log);
    log
}

fn two_entity_roster() -> RosterSnapshot {
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(entity(2, 10.0, 10.0, 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));
    roster
}

#[test]
fn test_first_scan_subscribes_self_and_neighbours() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let roster = two_entity_roster();

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 2]);
    assert!(log.removed_for(1).is_empty());
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&set(&[1, 2])));
    assert_eq!(manager.scan_count(), 1);

    // Nothing moved: a second scan is silent.
    let log = scan(&mut manager, &roster);
    assert!(log.is_empty());
}

#[test]
fn test_leaving_range_unsubscribes() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_entity(entity(3, 400.0, 400.0, 50.0));
    scan(&mut manager, &roster);

    roster.set_position(2, Vec3::new(300.0, 0.0, 300.0));
    roster.set_position(3, Vec3::new(20.0, 0.0, 0.0));
    let log = scan(&mut manager, &roster);

    assert_eq!(
        log.events(),
        &[
            SubscriptionEvent::Added {
                subscriber: Subscriber::player(1),
                entity: 3
            },
            SubscriptionEvent::Removed {
                subscriber: Subscriber::player(1),
                entity: 2
            },
        ]
    );
    assert_eq!(manager.player_subscriptions(1), set(&[1, 3]));
}

#[test]
fn test_self_visible_with_zero_range() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 0.0));
    roster.upsert_entity(entity(2, 30.0, 30.0, 0.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1]);
}

#[test]
fn test_degenerate_bounds_keep_previous_state() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = two_entity_roster();
    scan(&mut manager, &roster);

    // A single remaining entity has zero-area bounds.
    roster.remove_entity(2);
    let mut log = EventLog::new();
    manager.force_scan();
    let report = manager.tick(0.0, &roster, &mut log);

    assert!(report.skipped_rebuild);
    assert!(!report.scanned);
    assert!(log.is_empty());
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&set(&[1, 2])));

    // No live entities at all.
    roster.remove_entity(1);
    let log = scan(&mut manager, &roster);
    assert!(log.is_empty());
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&set(&[1, 2])));
    assert_eq!(manager.grid().unwrap().len(), 2);
}

#[test]
fn test_collinear_entities_are_degenerate() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 5.0, 50.0));
    roster.upsert_entity(entity(2, 40.0, 5.0, 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    let log = scan(&mut manager, &roster);
    assert!(log.is_empty());
    assert!(manager.grid().is_none());
}

#[test]
fn test_world_bounds_size_static_grid() {
    let config = InterestConfig {
        grid_mode: GridMode::Static {
            bounds: StaticBounds::World,
        },
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.set_world_bounds(Some(WorldBox::new(
        Vec3::new(-1000.0, -50.0, -1000.0),
        Vec3::new(2000.0, 100.0, 2000.0),
    )));
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    // One entity is enough when the world defines the extent.
    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1]);
    let dims = manager.dimensions().unwrap();
    assert_eq!(dims.origin, Vec2::new(-1000.0, -1000.0));
    assert_eq!((dims.cols, dims.rows), (21, 21));
}

#[test]
fn test_world_bounds_missing_falls_back_to_live_entities() {
    let config = InterestConfig {
        grid_mode: GridMode::Static {
            bounds: StaticBounds::World,
        },
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let roster = two_entity_roster();

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 2]);
    assert_eq!(manager.dimensions().unwrap().origin, Vec2::new(0.0, 0.0));
}

#[test]
fn test_flat_world_bounds_fall_back_to_live_entities() {
    let config = InterestConfig {
        grid_mode: GridMode::Static {
            bounds: StaticBounds::World,
        },
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = two_entity_roster();
    // No extent along z, so the projected box has zero height.
    roster.set_world_bounds(Some(WorldBox::new(Vec3::new(-500.0, 0.0, -500.0), Vec3::new(1000.0, 10.0, 0.0))));

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 2]);
    assert_eq!(manager.dimensions().unwrap().origin, Vec2::new(0.0, 0.0));
}

#[test]
fn test_stale_player_dropped_without_events() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_player(PlayerRecord::new(2, true, vec![2]));
    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(2), vec![1, 2]);

    roster.remove_player(2);
    let log = scan(&mut manager, &roster);
    assert!(log.is_empty());
    assert!(manager.subscriptions(&Subscriber::player(2)).is_none());
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&set(&[1, 2])));
}

#[test]
fn test_unready_player_keeps_subscriptions() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_entity(entity(3, 300.0, 300.0, 50.0));
    scan(&mut manager, &roster);

    roster.set_ready(1, false);
    roster.set_position(2, Vec3::new(250.0, 0.0, 250.0));
    let log = scan(&mut manager, &roster);
    assert!(log.is_empty());
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&set(&[1, 2])));

    roster.set_ready(1, true);
    let log = scan(&mut manager, &roster);
    assert_eq!(log.removed_for(1), vec![2]);
}

#[test]
fn test_despawned_observer_withdraws_everything() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_entity(entity(3, 200.0, 200.0, 50.0));
    scan(&mut manager, &roster);

    roster.remove_entity(1);
    let log = scan(&mut manager, &roster);
    assert_eq!(log.removed_for(1), vec![1, 2]);
    assert_eq!(manager.subscriptions(&Subscriber::player(1)), Some(&HashSet::new()));
}

#[test]
fn test_per_player_scope_unions_owned_entities() {
    let mut manager = InterestManager::new(InterestConfig::default()).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(entity(2, 300.0, 300.0, 50.0));
    roster.upsert_entity(entity(3, 20.0, 20.0, 50.0));
    roster.upsert_entity(entity(4, 310.0, 300.0, 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1, 2]));

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 2, 3, 4]);
}

#[test]
fn test_per_entity_scope_keeps_separate_sets() {
    let config = InterestConfig {
        subscription_scope: SubscriptionScope::PerEntity,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(entity(2, 300.0, 300.0, 50.0));
    roster.upsert_entity(entity(3, 20.0, 20.0, 50.0));
    roster.upsert_entity(entity(4, 310.0, 300.0, 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1, 2]));

    let log = scan(&mut manager, &roster);
    assert_eq!(manager.subscriptions(&Subscriber::entity(1, 1)), Some(&set(&[1, 3])));
    assert_eq!(manager.subscriptions(&Subscriber::entity(1, 2)), Some(&set(&[2, 4])));
    assert!(manager.subscriptions(&Subscriber::player(1)).is_none());
    assert_eq!(
        log.events()[0],
        SubscriptionEvent::Added {
            subscriber: Subscriber::entity(1, 1),
            entity: 1
        }
    );

    // Despawning an observer drops its set after withdrawing it.
    roster.remove_entity(2);
    let log = scan(&mut manager, &roster);
    assert_eq!(log.removed_for(1), vec![2, 4]);
    assert!(manager.subscriptions(&Subscriber::entity(1, 2)).is_none());
}

#[test]
fn test_range_rules_through_manager() {
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 100.0));
    roster.upsert_entity(entity(2, 60.0, 0.0, 10.0));
    roster.upsert_entity(entity(3, 0.0, 200.0, 10.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    let mut candidate = InterestManager::new(InterestConfig::default()).unwrap();
    assert_eq!(scan(&mut candidate, &roster).added_for(1), vec![1]);

    let observer_config = InterestConfig {
        range_rule: RangeRule::Observer,
        ..Default::default()
    };
    let mut observer = InterestManager::new(observer_config).unwrap();
    assert_eq!(scan(&mut observer, &roster).added_for(1), vec![1, 2]);
}

#[test]
fn test_planar_metric_ignores_height() {
    let config = InterestConfig {
        distance_metric: DistanceMetric::Planar,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(EntityRecord::new(2, Vec3::new(10.0, 900.0, 10.0), 50.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    assert_eq!(scan(&mut manager, &roster).added_for(1), vec![1, 2]);
}

#[test]
fn test_custom_policy_closure() {
    let same_parity = |observer: &EntityRecord, candidate: &EntityRecord| observer.id % 2 == candidate.id % 2;
    let mut manager = InterestManager::with_policy(InterestConfig::default(), same_parity).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_entity(entity(3, 15.0, 5.0, 50.0));

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 3]);
}

#[test]
fn test_dynamic_grid_only_sees_indexed_entities() {
    let config = InterestConfig {
        grid_mode: GridMode::Dynamic {
            bounds: Some(Bounds::new(Vec2::new(-100.0, -100.0), Vec2::new(200.0, 200.0))),
        },
        cell_size: 25.0,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = two_entity_roster();
    roster.upsert_entity(entity(3, 5.0, 5.0, 50.0));

    manager.add(1, Vec3::ZERO, 50.0).unwrap();
    manager.add(2, Vec3::new(10.0, 0.0, 10.0), 50.0).unwrap();
    // Indexed but no longer spawned.
    manager.add(9, Vec3::new(1.0, 0.0, 1.0), 50.0).unwrap();

    let log = scan(&mut manager, &roster);
    assert_eq!(log.added_for(1), vec![1, 2]);

    assert!(manager.remove(2));
    let log = scan(&mut manager, &roster);
    assert_eq!(log.removed_for(1), vec![2]);
}

#[test]
fn test_scan_cadence_follows_interval() {
    let config = InterestConfig {
        update_interval: 0.5,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let roster = two_entity_roster();
    let mut log = EventLog::new();

    let mut scans = 0;
    for _ in 0..20 {
        if manager.tick(0.1, &roster, &mut log).scanned {
            scans += 1;
        }
    }
    // Immediately, then once per half second.
    assert_eq!(scans, 4);
    assert_eq!(manager.scan_count(), 4);
    assert!(manager.profiler().get_section("scan").is_some());
}

#[test]
fn test_push_mode_subscribers() {
    let config = InterestConfig {
        query_mode: QueryMode::Push,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(entity(2, 30.0, 30.0, 50.0));
    roster.upsert_entity(entity(3, 500.0, 500.0, 10.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));
    roster.upsert_player(PlayerRecord::new(2, true, vec![2]));

    let mut log = EventLog::new();
    let report = manager.tick(1.0, &roster, &mut log);
    assert!(report.scanned);
    assert_eq!(report.rebuilt_subjects, 3);
    assert_eq!(manager.subscribers_of(1), vec![1, 2]);
    assert_eq!(manager.subscribers_of(2), vec![1, 2]);
    assert!(manager.subscribers_of(3).is_empty());
    assert!(log
        .events()
        .contains(&SubscriptionEvent::SubscribersChanged { entity: 1, players: vec![1, 2] }));
    assert_eq!(log.added_for(1), vec![1, 2]);

    roster.remove_entity(2);
    let mut log = EventLog::new();
    manager.tick(1.0, &roster, &mut log);
    assert_eq!(
        log.events(),
        &[
            SubscriptionEvent::Removed {
                subscriber: Subscriber::player(1),
                entity: 2
            },
            SubscriptionEvent::Removed {
                subscriber: Subscriber::player(2),
                entity: 2
            },
            SubscriptionEvent::SubscribersChanged { entity: 2, players: vec![] },
            SubscriptionEvent::Removed {
                subscriber: Subscriber::player(2),
                entity: 1
            },
            SubscriptionEvent::SubscribersChanged { entity: 1, players: vec![1] },
        ]
    );
}

#[test]
fn test_push_mode_despawn_skips_disconnected_players() {
    let config = InterestConfig {
        query_mode: QueryMode::Push,
        update_interval: 0.0,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 50.0));
    roster.upsert_entity(entity(2, 20.0, 20.0, 50.0));
    roster.upsert_entity(entity(3, 300.0, 300.0, 10.0));
    roster.upsert_player(PlayerRecord::new(7, true, vec![1]));

    let mut log = EventLog::new();
    manager.tick(0.1, &roster, &mut log);
    assert_eq!(manager.subscribers_of(2), vec![7]);

    // Disconnect and despawn land in the same frame.
    roster.remove_player(7);
    roster.remove_entity(2);
    let mut log = EventLog::new();
    manager.tick(0.1, &roster, &mut log);
    assert!(log.removed_for(7).is_empty());
    assert!(!log
        .events()
        .iter()
        .any(|e| matches!(e, SubscriptionEvent::SubscribersChanged { entity: 2, .. })));
    assert!(manager.subscribers_of(2).is_empty());
}

#[test]
fn test_push_mode_owner_always_subscribed() {
    let config = InterestConfig {
        query_mode: QueryMode::Push,
        ..Default::default()
    };
    let mut manager = InterestManager::new(config).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 0.0));
    roster.upsert_entity(entity(2, 300.0, 300.0, 0.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    let mut log = EventLog::new();
    manager.tick(1.0, &roster, &mut log);
    assert_eq!(manager.subscribers_of(1), vec![1]);
    assert!(manager.subscribers_of(2).is_empty());
}

/// Deterministic generator so the comparison is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next_f32(&mut self) -> f32 {
        self.0 = self.0.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }
}

#[test]
fn test_pull_matches_brute_force() {
    let mut rng = Lcg(7);
    let mut roster = RosterSnapshot::new();
    for id in 0..200u32 {
        let x = rng.next_f32() * 1000.0 - 500.0;
        let y = rng.next_f32() * 40.0;
        let z = rng.next_f32() * 1000.0 - 500.0;
        let range = 20.0 + rng.next_f32() * 120.0;
        roster.upsert_entity(EntityRecord::new(id, Vec3::new(x, y, z), range));
    }
    for player in 0..10u64 {
        let owned = vec![player as u32 * 3, player as u32 * 3 + 1];
        roster.upsert_player(PlayerRecord::new(player, true, owned));
    }

    let config = InterestConfig {
        cell_size: 64.0,
        ..Default::default()
    };
    let policy = config.range_policy();
    let mut manager = InterestManager::new(config).unwrap();
    scan(&mut manager, &roster);

    let records = roster.spawned_entities();
    for player in roster.players() {
        let mut expected = HashSet::new();
        for &owned in &player.owned {
            let observer = roster.lookup_entity(owned).unwrap();
            for candidate in &records {
                if policy.should_subscribe(&observer, candidate) {
                    expected.insert(candidate.id);
                }
            }
        }
        assert_eq!(manager.player_subscriptions(player.id), expected, "player {}", player.id);
    }
}

#[test]
fn test_custom_range_policy_type() {
    let config = InterestConfig::default();
    let policy = RangePolicy::new(RangeRule::Both, DistanceMetric::Full3d, config.projector());
    let mut manager = InterestManager::with_policy(config, policy).unwrap();
    let mut roster = RosterSnapshot::new();
    roster.upsert_entity(entity(1, 0.0, 0.0, 100.0));
    roster.upsert_entity(entity(2, 30.0, 0.0, 20.0));
    roster.upsert_entity(entity(3, 15.0, 15.0, 40.0));
    roster.upsert_player(PlayerRecord::new(1, true, vec![1]));

    assert_eq!(scan(&mut manager, &roster).added_for(1), vec![1, 3]);
}
