//! Shared test harness: a hand-rolled world implementing the engine's
//! collaborator seams

#![allow(dead_code)]

use ahash::AHashMap;
use hailfire::combat::{CombatContext, DamagePipeline, Owner, TargetRegistry, TargetSnapshot};
use hailfire::core::types::{TargetId, Vec2};
use hailfire::weapon::{WeaponEvent, WeaponManager};

pub const TARGET_RADIUS: f32 = 14.0;

/// Owner stub with controllable position/facing/gate
pub struct TestOwner {
    pub position: Vec2,
    pub facing: Vec2,
    pub gate_open: bool,
}

impl Default for TestOwner {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            facing: Vec2::new(1.0, 0.0),
            gate_open: true,
        }
    }
}

impl Owner for TestOwner {
    fn position(&self) -> Vec2 {
        self.position
    }
    fn facing_direction(&self) -> Vec2 {
        self.facing
    }
    fn can_fire(&self) -> bool {
        self.gate_open
    }
}

/// Mutable target world; doubles as the damage pipeline
#[derive(Default)]
pub struct World {
    pub hp: AHashMap<TargetId, f32>,
    pub positions: AHashMap<TargetId, Vec2>,
    /// Every `deal` call in order, for assertions
    pub dealt: Vec<(TargetId, f32)>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, position: Vec2, hp: f32) -> TargetId {
        let id = TargetId::new();
        self.positions.insert(id, position);
        self.hp.insert(id, hp);
        id
    }

    pub fn kill(&mut self, id: TargetId) {
        self.hp.insert(id, 0.0);
    }

    pub fn hp_of(&self, id: TargetId) -> f32 {
        self.hp.get(&id).copied().unwrap_or(0.0)
    }

    pub fn alive(&self) -> usize {
        self.hp.values().filter(|hp| **hp > 0.0).count()
    }

    /// Frozen read-side snapshot for one tick
    pub fn view(&self) -> WorldView {
        WorldView(
            self.hp
                .iter()
                .filter(|(_, hp)| **hp > 0.0)
                .map(|(id, hp)| TargetSnapshot {
                    id: *id,
                    position: self.positions[id],
                    hp: *hp,
                    radius: TARGET_RADIUS,
                })
                .collect(),
        )
    }

    /// Drive the manager one tick against this world
    pub fn tick(
        &mut self,
        manager: &mut WeaponManager,
        owner: &TestOwner,
        delta_ms: u64,
    ) -> Vec<WeaponEvent> {
        let view = self.view();
        let mut ctx = CombatContext {
            owner,
            targets: &view,
            damage: self,
        };
        manager.update(delta_ms, &mut ctx)
    }

    /// Run `total_ms` of simulation in `step_ms` ticks, collecting events
    pub fn run(
        &mut self,
        manager: &mut WeaponManager,
        owner: &TestOwner,
        total_ms: u64,
        step_ms: u64,
    ) -> Vec<WeaponEvent> {
        let mut events = Vec::new();
        let mut elapsed = 0;
        while elapsed < total_ms {
            events.extend(self.tick(manager, owner, step_ms));
            elapsed += step_ms;
        }
        events
    }
}

impl DamagePipeline for World {
    fn resolve(&self, raw: f32, _target: TargetId) -> f32 {
        raw
    }

    fn deal(&mut self, raw: f32, target: TargetId) -> f32 {
        match self.hp.get_mut(&target) {
            Some(hp) if *hp > 0.0 => {
                *hp -= raw;
                self.dealt.push((target, raw));
                raw
            }
            _ => 0.0,
        }
    }
}

/// Snapshot registry handed to the engine each tick
pub struct WorldView(pub Vec<TargetSnapshot>);

impl TargetRegistry for WorldView {
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

/// Count events matching a predicate
pub fn count_events(events: &[WeaponEvent], pred: impl Fn(&WeaponEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
