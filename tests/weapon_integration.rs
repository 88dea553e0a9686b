//! Weapon engine integration tests

mod common;

use common::{count_events, TestOwner, World};
use hailfire::core::config::TargetingConfig;
use hailfire::core::error::WeaponError;
use hailfire::core::types::Vec2;
use hailfire::progression::modifiers::{Modifier, ModifierOp, StatPath};
use hailfire::weapon::{AddWeaponOpts, DefinitionTable, WeaponEvent, WeaponManager};
use std::sync::Arc;

fn manager_with(keys: &[&str]) -> WeaponManager {
    let table = Arc::new(DefinitionTable::builtin().unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 42);
    for key in keys {
        manager.add_weapon(key, AddWeaponOpts::default()).unwrap();
    }
    manager
}

fn fire_starts(events: &[WeaponEvent], key: &str) -> usize {
    count_events(events, |e| matches!(e, WeaponEvent::FireStarted { key: k, .. } if k == key))
}

#[test]
fn test_bolt_fires_exactly_twice_in_1200ms() {
    let mut manager = manager_with(&["bolt"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    world.spawn(Vec2::new(200.0, 0.0), 10_000.0);

    let events = world.run(&mut manager, &owner, 1200, 100);
    assert_eq!(fire_starts(&events, "bolt"), 2);
}

#[test]
fn test_no_target_freezes_cadence() {
    let mut manager = manager_with(&["bolt"]);
    let owner = TestOwner::default();
    let mut world = World::new();

    // no targets at all: the cadence timer must not advance
    let events = world.run(&mut manager, &owner, 3000, 100);
    assert_eq!(fire_starts(&events, "bolt"), 0);

    // a target appearing later still gets the full first shot immediately
    world.spawn(Vec2::new(150.0, 0.0), 10_000.0);
    let events = world.run(&mut manager, &owner, 200, 100);
    assert_eq!(fire_starts(&events, "bolt"), 1);
}

#[test]
fn test_self_mode_fires_without_targets() {
    let mut manager = manager_with(&["cleave"]);
    let owner = TestOwner::default();
    let mut world = World::new();

    // cleave: warmup 150 + cadence 1100, no target required
    let events = world.run(&mut manager, &owner, 2600, 50);
    assert!(fire_starts(&events, "cleave") >= 2);
}

#[test]
fn test_owner_gate_blocks_firing() {
    let mut manager = manager_with(&["cleave"]);
    let owner = TestOwner { gate_open: false, ..Default::default() };
    let mut world = World::new();

    let events = world.run(&mut manager, &owner, 2000, 50);
    assert_eq!(fire_starts(&events, "cleave"), 0);
    assert!(count_events(&events, |e| {
        matches!(e, WeaponEvent::FireSkipped { .. })
    }) > 0);
}

#[test]
fn test_impacts_reduce_target_hp() {
    let mut manager = manager_with(&["bolt"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    let target = world.spawn(Vec2::new(120.0, 0.0), 50.0);

    let events = world.run(&mut manager, &owner, 1500, 16);
    assert!(count_events(&events, |e| matches!(e, WeaponEvent::Impact { .. })) > 0);
    assert!(world.hp_of(target) < 50.0);
    assert!(!world.dealt.is_empty());
}

#[test]
fn test_remove_weapon_releases_projectiles_and_reservations() {
    let mut manager = manager_with(&["fan_knives"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    // far enough that the 3-knife salvo stays in flight
    world.spawn(Vec2::new(340.0, 0.0), 10_000.0);

    world.tick(&mut manager, &owner, 16);
    let pool = manager.controller("fan_knives").unwrap().pool();
    assert_eq!(pool.active_count(), 3);
    assert!(!manager.coordinator().is_empty());

    manager.remove_weapon("fan_knives").unwrap();
    assert!(manager.controller("fan_knives").is_none());
    assert!(manager.coordinator().is_empty());

    let events = world.tick(&mut manager, &owner, 16);
    assert!(events
        .iter()
        .any(|e| matches!(e, WeaponEvent::WeaponRemoved { key } if key == "fan_knives")));
}

#[test]
fn test_active_projectiles_never_exceed_pool_capacity() {
    const TINY_POOL: &str = r#"
version = 1

[[weapon]]
key = "pepper"
range = 500.0
pool_capacity = 3

[weapon.cadence]
delay_ms = 100

[weapon.damage]
base = 1.0

[weapon.archetype]
kind = "projectile"
salvo = 5
spread_deg = 40.0

[weapon.projectile]
speed = 50.0
lifetime_ms = 5000
"#;
    let table = Arc::new(DefinitionTable::from_toml(TINY_POOL).unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 1);
    manager.add_weapon("pepper", AddWeaponOpts::default()).unwrap();
    let owner = TestOwner::default();
    let mut world = World::new();
    world.spawn(Vec2::new(400.0, 0.0), 100_000.0);

    let mut saw_skip = false;
    for _ in 0..40 {
        let events = world.tick(&mut manager, &owner, 50);
        let pool = manager.controller("pepper").unwrap().pool();
        assert!(pool.active_count() <= pool.capacity());
        saw_skip |= events
            .iter()
            .any(|e| matches!(e, WeaponEvent::FireSkipped { .. }));
    }
    assert!(saw_skip, "expected pool exhaustion telemetry");
}

#[test]
fn test_add_weapon_rejects_bad_keys() {
    let mut manager = manager_with(&["bolt"]);

    let err = manager.add_weapon("railgun", AddWeaponOpts::default()).unwrap_err();
    assert!(matches!(err, WeaponError::UnknownKey(_)));

    let err = manager.add_weapon("bolt", AddWeaponOpts::default()).unwrap_err();
    assert!(matches!(err, WeaponError::AlreadyEquipped(_)));

    manager.set_allowed_keys(["bolt"]);
    let err = manager.add_weapon("cleave", AddWeaponOpts::default()).unwrap_err();
    assert!(matches!(err, WeaponError::NotAllowed(_)));

    // rejections left the loadout untouched
    assert_eq!(manager.weapon_keys(), vec!["bolt"]);
}

#[test]
fn test_set_loadout_diffs_and_dedupes() {
    let mut manager = manager_with(&[]);
    manager.set_loadout(&["bolt", "arc_lash", "bolt"]).unwrap();
    assert_eq!(manager.weapon_keys(), vec!["bolt", "arc_lash"]);

    // idempotent on the unchanged set
    manager.set_loadout(&["bolt", "arc_lash"]).unwrap();
    assert_eq!(manager.weapon_keys(), vec!["bolt", "arc_lash"]);

    manager.set_loadout(&["bolt", "cleave"]).unwrap();
    assert_eq!(manager.weapon_keys(), vec!["bolt", "cleave"]);

    // a bad key rejects the whole call and changes nothing
    let err = manager.set_loadout(&["bolt", "railgun"]).unwrap_err();
    assert!(matches!(err, WeaponError::UnknownKey(_)));
    assert_eq!(manager.weapon_keys(), vec!["bolt", "cleave"]);
}

#[test]
fn test_upgrade_applies_level_modifiers_once_each() {
    let mut manager = manager_with(&["bolt"]);
    assert_eq!(manager.level_of("bolt"), Some(1));

    manager.upgrade_weapon("bolt").unwrap();
    manager.upgrade_weapon("bolt").unwrap();
    assert_eq!(manager.level_of("bolt"), Some(3));

    let resolved = manager.controller("bolt").unwrap().instance.resolved().clone();
    assert!((resolved.damage_base - 9.6).abs() < 1e-4);
    assert!((resolved.delay_ms - 540.0).abs() < 1e-4);
}

#[test]
fn test_describe_upgrade_lists_next_level_changes() {
    let manager = manager_with(&["bolt"]);
    let lines = manager.describe_upgrade("bolt").unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "Damage +20%");
}

#[test]
fn test_upgrade_clamps_at_max_level() {
    let mut manager = manager_with(&["cleave"]);
    for _ in 0..10 {
        manager.upgrade_weapon("cleave").unwrap();
    }
    assert_eq!(manager.level_of("cleave"), Some(3));
}

#[test]
fn test_global_modifier_reaches_current_and_future_weapons() {
    let mut manager = manager_with(&["bolt"]);
    manager.apply_global_modifier(Modifier {
        op: ModifierOp::Multiply,
        path: StatPath::DamageBase,
        value: 2.0,
    });
    assert_eq!(
        manager.controller("bolt").unwrap().instance.resolved().damage_base,
        16.0
    );

    manager.add_weapon("cleave", AddWeaponOpts::default()).unwrap();
    assert_eq!(
        manager.controller("cleave").unwrap().instance.resolved().damage_base,
        28.0
    );
}

#[test]
fn test_set_modifiers_replaces_custom_layer_only() {
    let mut manager = manager_with(&["bolt"]);
    manager.upgrade_weapon("bolt").unwrap(); // 1.2x from level 2

    manager
        .set_modifiers_for_weapon("bolt", vec![Modifier::add(StatPath::DamageBase, 2.0)])
        .unwrap();
    // (8 + 2) * 1.2
    assert!(
        (manager.controller("bolt").unwrap().instance.resolved().damage_base - 12.0).abs() < 1e-4
    );

    manager.set_modifiers_for_weapon("bolt", Vec::new()).unwrap();
    assert!(
        (manager.controller("bolt").unwrap().instance.resolved().damage_base - 9.6).abs() < 1e-4
    );
}

#[test]
fn test_destroy_leaves_nothing_behind() {
    let mut manager = manager_with(&["bolt", "fan_knives", "orbit_blades"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    world.spawn(Vec2::new(200.0, 0.0), 10_000.0);

    world.run(&mut manager, &owner, 600, 16);
    manager.destroy();
    assert!(manager.weapon_keys().is_empty());
    assert!(manager.coordinator().is_empty());
}

#[test]
fn test_orbiters_persist_and_hit_repeatedly() {
    let mut manager = manager_with(&["orbit_blades"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    // park a tanky target on the orbit ring
    let target = world.spawn(Vec2::new(80.0, 0.0), 100_000.0);

    let events = world.run(&mut manager, &owner, 8000, 16);
    let hits = count_events(&events, |e| {
        matches!(e, WeaponEvent::Impact { target: t, .. } if *t == target)
    });
    // one hit per activation window at most, several windows in 8s
    assert!(hits >= 2, "orbiters should re-hit across activations, got {}", hits);

    let pool = manager.controller("orbit_blades").unwrap().pool();
    assert_eq!(pool.active_count(), 3);
}

#[test]
fn test_chain_hits_multiple_targets_with_falloff() {
    let mut manager = manager_with(&["arc_lash"]);
    let owner = TestOwner::default();
    let mut world = World::new();
    let first = world.spawn(Vec2::new(100.0, 0.0), 1000.0);
    let second = world.spawn(Vec2::new(220.0, 0.0), 1000.0);
    let third = world.spawn(Vec2::new(340.0, 0.0), 1000.0);

    let events = world.tick(&mut manager, &owner, 16);
    let impacts: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            WeaponEvent::Impact { target, damage, .. } => Some((*target, *damage)),
            _ => None,
        })
        .collect();
    assert_eq!(impacts.len(), 3);
    assert_eq!(impacts[0].0, first);
    assert_eq!(impacts[1].0, second);
    assert_eq!(impacts[2].0, third);
    // 20% falloff per hop
    assert!((impacts[1].1 - impacts[0].1 * 0.8).abs() < 1e-3);
    assert!((impacts[2].1 - impacts[0].1 * 0.64).abs() < 1e-3);
}
