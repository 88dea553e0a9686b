//! Headless Arena Runner
//!
//! Drives the weapon engine against a scripted target wave and prints a
//! telemetry summary. Useful for balance passes and as a smoke harness.

use ahash::AHashMap;
use clap::Parser;
use hailfire::combat::{CombatContext, DamagePipeline, Owner, TargetRegistry, TargetSnapshot};
use hailfire::core::config::TargetingConfig;
use hailfire::core::types::{TargetId, Vec2};
use hailfire::weapon::{AddWeaponOpts, DefinitionTable, WeaponEvent, WeaponManager};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;

/// Headless Arena Runner - scripted waves for balance telemetry
#[derive(Parser, Debug)]
#[command(name = "arena_runner")]
#[command(about = "Run the weapon engine headless and output telemetry")]
struct Args {
    /// Comma-separated loadout keys
    #[arg(long, default_value = "bolt,arc_lash,orbit_blades")]
    loadout: String,

    /// Simulated duration in milliseconds
    #[arg(long, default_value_t = 30_000)]
    duration_ms: u64,

    /// Tick length in milliseconds
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Number of targets in the wave
    #[arg(long, default_value_t = 40)]
    targets: usize,

    /// Random seed for deterministic runs
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

struct StaticOwner;

impl Owner for StaticOwner {
    fn position(&self) -> Vec2 {
        Vec2::ZERO
    }
    fn facing_direction(&self) -> Vec2 {
        Vec2::new(1.0, 0.0)
    }
    fn can_fire(&self) -> bool {
        true
    }
}

/// Target wave plus the damage ledger; doubles as registry and pipeline
#[derive(Default)]
struct Arena {
    hp: AHashMap<TargetId, f32>,
    positions: AHashMap<TargetId, Vec2>,
}

impl Arena {
    fn spawn_wave(&mut self, count: usize, rng: &mut StdRng) {
        for _ in 0..count {
            let id = TargetId::new();
            let angle = rng.gen::<f32>() * std::f32::consts::TAU;
            let dist = 120.0 + rng.gen::<f32>() * 260.0;
            self.positions.insert(id, Vec2::from_angle(angle) * dist);
            self.hp.insert(id, 20.0 + rng.gen::<f32>() * 30.0);
        }
    }

    fn alive(&self) -> usize {
        self.hp.values().filter(|hp| **hp > 0.0).count()
    }
}

impl TargetRegistry for Arena {
    fn active_targets(&self) -> Vec<TargetSnapshot> {
        self.hp
            .iter()
            .filter(|(_, hp)| **hp > 0.0)
            .map(|(id, hp)| TargetSnapshot {
                id: *id,
                position: self.positions[id],
                hp: *hp,
                radius: 14.0,
            })
            .collect()
    }

    fn is_active(&self, id: TargetId) -> bool {
        self.hp.get(&id).is_some_and(|hp| *hp > 0.0)
    }

    fn snapshot(&self, id: TargetId) -> Option<TargetSnapshot> {
        let hp = *self.hp.get(&id)?;
        (hp > 0.0).then(|| TargetSnapshot {
            id,
            position: self.positions[&id],
            hp,
            radius: 14.0,
        })
    }
}

impl DamagePipeline for Arena {
    fn resolve(&self, raw: f32, _target: TargetId) -> f32 {
        raw
    }

    fn deal(&mut self, raw: f32, target: TargetId) -> f32 {
        match self.hp.get_mut(&target) {
            Some(hp) if *hp > 0.0 => {
                *hp -= raw;
                raw
            }
            _ => 0.0,
        }
    }
}

#[derive(Serialize)]
struct RunSummary {
    ticks: u64,
    activations: u64,
    impacts: u64,
    skips: u64,
    total_damage: f32,
    targets_killed: usize,
    reservations_left: usize,
}

fn main() -> hailfire::core::error::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("hailfire=info")
        .init();

    let args = Args::parse();
    let table = Arc::new(DefinitionTable::builtin()?);
    let mut manager = WeaponManager::new(table, TargetingConfig::default(), args.seed);
    for key in args.loadout.split(',') {
        manager.add_weapon(key.trim(), AddWeaponOpts::default())?;
    }

    let mut wave_rng = StdRng::seed_from_u64(args.seed);
    let mut arena = Arena::default();
    arena.spawn_wave(args.targets, &mut wave_rng);
    let start_alive = arena.alive();

    let owner = StaticOwner;
    let mut summary = RunSummary {
        ticks: 0,
        activations: 0,
        impacts: 0,
        skips: 0,
        total_damage: 0.0,
        targets_killed: 0,
        reservations_left: 0,
    };

    let mut elapsed = 0;
    while elapsed < args.duration_ms {
        // arena is both registry and pipeline; freeze the read side per tick
        let view = ArenaView(arena.active_targets());
        let mut ctx = CombatContext {
            owner: &owner,
            targets: &view,
            damage: &mut arena,
        };
        let events = manager.update(args.tick_ms, &mut ctx);
        for event in events {
            match event {
                WeaponEvent::FireStarted { .. } => summary.activations += 1,
                WeaponEvent::Impact { damage, .. } => {
                    summary.impacts += 1;
                    summary.total_damage += damage;
                }
                WeaponEvent::FireSkipped { .. } => summary.skips += 1,
                _ => {}
            }
        }
        summary.ticks += 1;
        elapsed += args.tick_ms;
    }

    summary.targets_killed = start_alive - arena.alive();
    summary.reservations_left = manager.coordinator().len();

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("ticks:           {}", summary.ticks);
        println!("activations:     {}", summary.activations);
        println!("impacts:         {}", summary.impacts);
        println!("skipped fires:   {}", summary.skips);
        println!("total damage:    {:.1}", summary.total_damage);
        println!("targets killed:  {}/{}", summary.targets_killed, args.targets);
        println!("reservations:    {}", summary.reservations_left);
    }
    Ok(())
}

/// Frozen read-side view of the arena for one tick
struct ArenaView(Vec<TargetSnapshot>);

impl TargetRegistry for ArenaView {
    fn active_targets(&self) -> Vec<TargetSnapshot> {
        self.0.clone()
    }

    fn is_active(&self, id: TargetId) -> bool {
        self.0.iter().any(|t| t.id == id)
    }

    fn snapshot(&self, id: TargetId) -> Option<TargetSnapshot> {
        self.0.iter().copied().find(|t| t.id == id)
    }
}
