//! Manager Tests - Spawn Caps, Tick Ordering and Load Shedding
//!
//! End-to-end checks of the projectile manager against plain health
//! targets.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use volley_engine::faction::Faction;
use volley_engine::game::{
    HealthTarget, ProjectileManager, SpawnParams, TargetRef, VolleyConfig,
};
use volley_engine::render::EffectKind;
use volley_engine::world::ArenaBounds;

const DT: f32 = 1.0 / 60.0;

/// Shared target plus a typed handle for inspecting its health.
fn health(
    faction: Faction,
    position: Vec3,
    radius: f32,
    hp: f32,
) -> (TargetRef, Rc<RefCell<HealthTarget>>) {
    let concrete = Rc::new(RefCell::new(HealthTarget::new(faction, position, radius, hp)));
    let shared: TargetRef = concrete.clone();
    (shared, concrete)
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_player_shot_hits_boss_exactly_once() {
    let mut manager = ProjectileManager::default();
    let (boss, boss_state) = health(Faction::Boss, Vec3::new(0.0, 0.0, 5.0), 2.0, 100.0);
    assert!(manager.register_target(&boss));

    let handle = manager
        .spawn_projectile(Faction::Player, Vec3::ZERO, Vec3::Z, Some(40.0), Some(10.0))
        .unwrap();

    // Gap of 3 units at 40 u/s: ceil(3 / 40 / dt) = 5 ticks.
    let expected_tick = ((5.0f32 - 2.0) / 40.0 / DT).ceil() as usize;
    assert_eq!(expected_tick, 5);

    let mut hits_seen = 0;
    for tick in 1..=expected_tick + 3 {
        let hits = manager.update(DT, Vec3::ZERO);
        if tick < expected_tick {
            assert!(hits.is_empty(), "early hit on tick {tick}");
            continue;
        }
        if tick == expected_tick {
            assert_eq!(hits.len(), 1);
            assert!(Rc::ptr_eq(&hits[0].target, &boss));
            assert_eq!(hits[0].damage, 10.0);
            assert_eq!(hits[0].projectile, handle);
            assert!(!manager.is_active(handle));
        }
        hits_seen += hits.len();
    }

    assert_eq!(hits_seen, 1);
    assert_eq!(boss_state.borrow().health, 90.0);
    assert_eq!(boss_state.borrow().hits, 1);
}

#[test]
fn test_spawns_beyond_faction_cap_are_refused() {
    let mut manager = ProjectileManager::default();
    let cap = manager.config().player.max_pool_size;

    let handles: Vec<_> = (0..cap + 5)
        .map(|_| manager.spawn_player_projectile(Vec3::ZERO, Vec3::X))
        .collect();

    assert_eq!(handles.iter().filter(|h| h.is_some()).count(), cap);
    assert!(handles[cap..].iter().all(Option::is_none));
    assert_eq!(manager.active_count_for(Faction::Player), cap);
    assert_eq!(manager.stats().refused_spawns, 5);
}

#[test]
fn test_spawns_beyond_global_cap_are_refused() {
    let mut config = VolleyConfig::default();
    config.max_projectiles = 60;
    let mut manager = ProjectileManager::new(config).unwrap();

    let mut accepted = 0;
    for i in 0..80 {
        let faction = Faction::ALL[i % 3];
        if manager.spawn_projectile(faction, Vec3::ZERO, Vec3::X, None, None).is_some() {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 60);
    assert_eq!(manager.active_count(), 60);
}

#[test]
fn test_max_travel_distance_expires_in_one_tick() {
    let mut manager = ProjectileManager::default();
    let params = SpawnParams {
        speed: Some(100.0),
        max_travel_distance: Some(10.0),
        ..Default::default()
    };
    let handle = manager
        .spawn_with(Faction::Minion, Vec3::ZERO, Vec3::X, params)
        .unwrap();

    manager.update(1.0, Vec3::ZERO);
    assert!(!manager.is_active(handle));
    assert!(manager.projectile(handle).is_none());
    assert_eq!(manager.stats().expired_distance, 1);
}

#[test]
fn test_emergency_cleanup_releases_oldest() {
    let mut manager = ProjectileManager::default();
    let cap = manager.config().max_projectiles;
    let target = (cap as f32 * 0.85).round() as usize;

    let mut spawned = Vec::with_capacity(target);
    for i in 0..target {
        let faction = Faction::ALL[i % 3];
        let handle = manager
            .spawn_projectile(faction, Vec3::ZERO, Vec3::X, None, None)
            .unwrap();
        spawned.push(handle);
        // Distinct spawn times.
        manager.update(0.01, Vec3::ZERO);
    }
    assert_eq!(manager.active_count(), target);

    let released = manager.emergency_cleanup();
    let expected = (target as f32 * 0.3).ceil() as usize;
    assert_eq!(released, expected);
    assert!(manager.active_count() as f32 <= cap as f32 * 0.7);

    let (oldest, newest) = spawned.split_at(expected);
    assert!(oldest.iter().all(|&h| !manager.is_active(h)));
    assert!(newest.iter().all(|&h| manager.is_active(h)));
}

#[test]
fn test_emergency_cleanup_noop_below_threshold() {
    let mut manager = ProjectileManager::default();
    for _ in 0..10 {
        manager.spawn_player_projectile(Vec3::ZERO, Vec3::X);
    }
    assert_eq!(manager.emergency_cleanup(), 0);
    assert_eq!(manager.active_count(), 10);
}

#[test]
fn test_same_tick_spawns_released_in_spawn_order() {
    let mut config = VolleyConfig::default();
    config.max_projectiles = 10;
    let mut manager = ProjectileManager::new(config).unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| manager.spawn_boss_projectile(Vec3::ZERO, Vec3::X).unwrap())
        .collect();

    assert_eq!(manager.emergency_cleanup(), 3);
    assert!(handles[..3].iter().all(|&h| !manager.is_active(h)));
    assert!(handles[3..].iter().all(|&h| manager.is_active(h)));
}

#[test]
fn test_auto_emergency_cleanup_runs_in_update() {
    let mut config = VolleyConfig::default();
    config.max_projectiles = 10;
    config.auto_emergency_cleanup = true;
    let mut manager = ProjectileManager::new(config).unwrap();
    for _ in 0..9 {
        manager.spawn_player_projectile(Vec3::ZERO, Vec3::X);
    }

    manager.update(DT, Vec3::ZERO);
    assert_eq!(manager.active_count(), 6);
    assert_eq!(manager.stats().emergency_released, 3);
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn test_caps_hold_under_random_load() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut manager = ProjectileManager::default();
    let config = manager.config().clone();

    for _ in 0..600 {
        for _ in 0..rng.gen_range(0..8) {
            let faction = Faction::ALL[rng.gen_range(0..3)];
            let direction = Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0));
            manager.spawn_projectile(faction, Vec3::ZERO, direction, None, None);
        }
        manager.update(DT, Vec3::ZERO);

        assert!(manager.active_count() <= config.max_projectiles);
        for faction in Faction::ALL {
            let pool = manager.pool(faction).stats();
            assert!(pool.in_use <= config.faction(faction).max_pool_size);
            assert_eq!(pool.free + pool.in_use, pool.created);
            assert!(pool.created <= pool.max_size);
        }
    }
}

#[test]
fn test_projectile_hits_at_most_one_target() {
    let mut manager = ProjectileManager::default();
    let (first, first_state) = health(Faction::Minion, Vec3::ZERO, 1.0, 50.0);
    let (second, second_state) = health(Faction::Boss, Vec3::ZERO, 1.0, 50.0);
    manager.register_target(&first);
    manager.register_target(&second);

    let handle = manager.spawn_player_projectile(Vec3::ZERO, Vec3::Z).unwrap();
    let hits = manager.update(DT, Vec3::ZERO);
    assert_eq!(hits.len(), 1);
    assert!(!manager.is_active(handle));
    assert!(manager.update(DT, Vec3::ZERO).is_empty());

    // Bosses come before minions for player shots.
    assert_eq!(second_state.borrow().hits, 1);
    assert_eq!(first_state.borrow().hits, 0);
}

#[test]
fn test_lifetime_expiry_within_one_tick() {
    let mut manager = ProjectileManager::default();
    let params = SpawnParams {
        speed: Some(1.0),
        time_to_live: Some(0.5),
        ..Default::default()
    };
    let handle = manager
        .spawn_with(Faction::Boss, Vec3::ZERO, Vec3::X, params)
        .unwrap();

    let dt = 0.1f32;
    while manager.is_active(handle) {
        manager.update(dt, Vec3::ZERO);
        assert!(manager.clock() <= 0.5 + f64::from(dt) + 1e-4);
    }
    assert_eq!(manager.stats().expired_lifetime, 1);
}

#[test]
fn test_double_registration_damages_once() {
    let mut manager = ProjectileManager::default();
    let (boss, boss_state) = health(Faction::Boss, Vec3::ZERO, 1.0, 100.0);
    assert!(manager.register_target(&boss));
    assert!(!manager.register_target(&boss));

    manager.spawn_player_projectile(Vec3::ZERO, Vec3::Z);
    manager.update(DT, Vec3::ZERO);
    assert_eq!(boss_state.borrow().hits, 1);
    assert_eq!(manager.stats().registered_targets, 1);
}

// ============================================================================
// Bounds, damage and rendering data
// ============================================================================

#[test]
fn test_out_of_bounds_projectiles_are_released() {
    let mut manager = ProjectileManager::default();
    manager.set_arena_bounds(ArenaBounds::circular(10.0));
    let handle = manager
        .spawn_projectile(Faction::Player, Vec3::ZERO, Vec3::X, Some(40.0), None)
        .unwrap();

    // Margin is 5: still inside at x = 12, out at x = 16.
    manager.update(0.3, Vec3::ZERO);
    assert!(manager.is_active(handle));
    manager.update(0.1, Vec3::ZERO);
    assert!(!manager.is_active(handle));
    assert_eq!(manager.stats().out_of_bounds, 1);

    manager.clear_arena_bounds();
    assert!(manager.arena_bounds().is_none());
}

#[test]
fn test_destroyed_flag_reported() {
    let mut manager = ProjectileManager::default();
    let (minion, minion_state) = health(Faction::Minion, Vec3::ZERO, 1.0, 5.0);
    manager.register_target(&minion);

    manager.spawn_projectile(Faction::Player, Vec3::ZERO, Vec3::Z, None, Some(10.0));
    let hits = manager.update(DT, Vec3::ZERO);
    assert_eq!(hits.len(), 1);
    assert!(hits[0].target_destroyed);
    assert!(minion_state.borrow().is_destroyed());
    // Destroyed targets stay registered until their owner unregisters them.
    assert!(manager.unregister_target(&minion));
}

#[test]
fn test_enemy_shots_ignore_each_other() {
    let mut manager = ProjectileManager::default();
    let (boss, _boss_state) = health(Faction::Boss, Vec3::ZERO, 2.0, 100.0);
    let (player, player_state) = health(Faction::Player, Vec3::new(0.0, 0.0, 0.5), 0.5, 100.0);
    manager.register_target(&boss);
    manager.register_target(&player);

    manager.spawn_minion_projectile(Vec3::ZERO, Vec3::Z);
    let hits = manager.update(DT, Vec3::ZERO);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target_faction, Faction::Player);
    assert_eq!(hits[0].projectile_faction(), Faction::Minion);
    assert_eq!(player_state.borrow().damage_taken, 5.0);
}

#[test]
fn test_collision_budget_defers_work() {
    let mut config = VolleyConfig::default();
    config.max_collision_checks_per_frame = 1;
    let mut manager = ProjectileManager::new(config).unwrap();
    let (boss, _state) = health(Faction::Boss, Vec3::new(0.0, 0.0, 100.0), 1.0, 100.0);
    manager.register_target(&boss);

    manager.spawn_player_projectile(Vec3::ZERO, Vec3::X);
    manager.spawn_player_projectile(Vec3::ZERO, Vec3::X);
    manager.update(DT, Vec3::ZERO);

    let stats = manager.stats();
    assert_eq!(stats.collision_checks_last_frame, 1);
    assert_eq!(stats.deferred_last_frame, 1);
}

#[test]
fn test_enemy_shots_land_while_player_floods_the_budget() {
    let mut config = VolleyConfig::default();
    config.max_collision_checks_per_frame = 100;
    let mut manager = ProjectileManager::new(config).unwrap();

    let (player, player_state) = health(Faction::Player, Vec3::ZERO, 1.0, 1.0e9);
    manager.register_target(&player);
    let minions: Vec<TargetRef> = (0..10)
        .map(|i| health(Faction::Minion, Vec3::new(500.0 + i as f32 * 5.0, 0.0, 0.0), 1.0, 100.0).0)
        .collect();
    for minion in &minions {
        manager.register_target(minion);
    }

    let mut boss_hits = 0;
    for _ in 0..120 {
        for _ in 0..3 {
            manager.spawn_player_projectile(Vec3::new(0.0, 0.0, -50.0), Vec3::NEG_Z);
        }
        manager.spawn_projectile(Faction::Boss, Vec3::ZERO, Vec3::X, Some(0.1), None);
        boss_hits += manager
            .update(DT, Vec3::ZERO)
            .iter()
            .filter(|hit| hit.projectile_faction() == Faction::Boss)
            .count();
    }

    assert!(manager.stats().deferred_last_frame > 0);
    assert!(boss_hits >= 100, "boss hits: {boss_hits}");
    assert!(manager.active_count_for(Faction::Boss) <= 8);
    assert_eq!(player_state.borrow().hits, boss_hits as u32);
}

#[test]
fn test_projectile_instances_track_active_set() {
    let mut manager = ProjectileManager::default();
    let a = manager.spawn_player_projectile(Vec3::ZERO, Vec3::X).unwrap();
    manager.spawn_boss_projectile(Vec3::ONE, Vec3::Z);
    assert_eq!(manager.projectile_instances().len(), 2);

    manager.release_projectile(a);
    let instances = manager.projectile_instances();
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].faction, Faction::Boss.index() as u32);
    assert_eq!(instances[0].direction, [0.0, 0.0, 1.0]);
}

#[test]
fn test_impacts_are_drawn_after_update() {
    let mut manager = ProjectileManager::default();
    let (boss, _state) = health(Faction::Boss, Vec3::ZERO, 1.0, 100.0);
    manager.register_target(&boss);
    manager.spawn_player_projectile(Vec3::ZERO, Vec3::Z);
    manager.update(DT, Vec3::new(0.0, 0.0, -10.0));

    let effects = manager.effects();
    assert_eq!(effects.batch(EffectKind::Impact).instances.len(), 1);
    assert_eq!(effects.draw_call_count(), 3);
}

#[test]
fn test_stats_serialize_to_json() {
    let mut manager = ProjectileManager::default();
    manager.spawn_player_projectile(Vec3::ZERO, Vec3::X);
    manager.update(DT, Vec3::ZERO);

    let json = serde_json::to_value(manager.stats()).unwrap();
    assert_eq!(json["active_total"], 1);
    assert_eq!(json["pools"][0]["faction"], "player");
    assert_eq!(json["frames"], 1);
}
