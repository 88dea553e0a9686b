//! Cross-weapon targeting and reservation integration tests

mod common;

use common::{TestOwner, World};
use hailfire::core::config::TargetingConfig;
use hailfire::core::types::{TargetId, Vec2, WeaponId};
use hailfire::targeting::coordinator::TargetingCoordinator;
use hailfire::weapon::{AddWeaponOpts, DefinitionTable, WeaponEvent, WeaponManager};
use std::sync::Arc;

/// Two identical heavy bolts so the second weapon must route around the
/// first weapon's predicted kill
const TWIN_BOLTS: &str = r#"
version = 1

[[weapon]]
key = "bolt_a"
range = 500.0
pool_capacity = 8

[weapon.cadence]
delay_ms = 700

[weapon.damage]
base = 12.0

[weapon.archetype]
kind = "projectile"

[weapon.projectile]
speed = 400.0
lifetime_ms = 2500

[[weapon]]
key = "bolt_b"
range = 500.0
pool_capacity = 8

[weapon.cadence]
delay_ms = 700

[weapon.damage]
base = 12.0

[weapon.archetype]
kind = "projectile"

[weapon.projectile]
speed = 400.0
lifetime_ms = 2500
"#;

#[test]
fn test_second_weapon_avoids_predicted_dead_target() {
    let table = Arc::new(DefinitionTable::from_toml(TWIN_BOLTS).unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 3);
    manager.add_weapon("bolt_a", AddWeaponOpts::default()).unwrap();
    manager.add_weapon("bolt_b", AddWeaponOpts::default()).unwrap();

    let owner = TestOwner::default();
    let mut world = World::new();
    // 12 damage one-shots the near target; the far one survives
    let near = world.spawn(Vec2::new(150.0, 0.0), 10.0);
    let far = world.spawn(Vec2::new(300.0, 0.0), 100.0);

    // one tick: bolt_a commits to `near` first, bolt_b sees the ledger
    world.tick(&mut manager, &owner, 16);

    let reserved_targets: Vec<TargetId> = [near, far]
        .into_iter()
        .filter(|t| manager.coordinator().predicted_damage_before(*t, u64::MAX / 2, 0) > 0.0)
        .collect();
    assert_eq!(reserved_targets, vec![near, far]);
}

#[test]
fn test_both_weapons_share_target_when_it_survives_both() {
    let table = Arc::new(DefinitionTable::from_toml(TWIN_BOLTS).unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 3);
    manager.add_weapon("bolt_a", AddWeaponOpts::default()).unwrap();
    manager.add_weapon("bolt_b", AddWeaponOpts::default()).unwrap();

    let owner = TestOwner::default();
    let mut world = World::new();
    let tank = world.spawn(Vec2::new(150.0, 0.0), 500.0);
    world.spawn(Vec2::new(300.0, 0.0), 500.0);

    world.tick(&mut manager, &owner, 16);
    // 24 predicted damage on the tank: both weapons picked the nearest
    let predicted = manager
        .coordinator()
        .predicted_damage_before(tank, u64::MAX / 2, 0);
    assert!((predicted - 24.0).abs() < 1e-3);
}

#[test]
fn test_reservation_consumed_on_impact() {
    let table = Arc::new(DefinitionTable::from_toml(TWIN_BOLTS).unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 3);
    manager.add_weapon("bolt_a", AddWeaponOpts::default()).unwrap();

    let owner = TestOwner::default();
    let mut world = World::new();
    world.spawn(Vec2::new(100.0, 0.0), 10_000.0);

    world.tick(&mut manager, &owner, 16);
    assert_eq!(manager.coordinator().len(), 1);

    // fly until impact (100px at 400px/s ~ 250ms)
    let events = world.run(&mut manager, &owner, 400, 16);
    assert!(events.iter().any(|e| matches!(e, WeaponEvent::Impact { .. })));
    // consumed on impact, not waiting for expiry
    assert_eq!(manager.coordinator().len(), 0);
}

#[test]
fn test_dead_target_reservations_pruned() {
    let table = Arc::new(DefinitionTable::from_toml(TWIN_BOLTS).unwrap());
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), 3);
    manager.add_weapon("bolt_a", AddWeaponOpts::default()).unwrap();

    let owner = TestOwner::default();
    let mut world = World::new();
    let target = world.spawn(Vec2::new(400.0, 0.0), 10_000.0);

    world.tick(&mut manager, &owner, 16);
    assert_eq!(manager.coordinator().len(), 1);

    // target dies externally before the shot lands
    world.kill(target);
    world.tick(&mut manager, &owner, 16);
    assert_eq!(manager.coordinator().len(), 0);
}

#[test]
fn test_spec_scenario_predicted_hp_at_horizon() {
    // enemy with 10 HP; weapon A reserves 10 damage landing at t=100ms;
    // weapon B evaluates at t=50ms with horizon t=120ms, tolerance 0
    let mut coord = TargetingCoordinator::new(TargetingConfig::default());
    let enemy = TargetId::new();
    coord.reserve(WeaponId(0), enemy, 100, 10.0);

    let hp_at_impact = coord.predicted_hp_at_impact(enemy, 10.0, 120, 0);
    assert!(hp_at_impact <= 0.0);
}
