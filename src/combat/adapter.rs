//! Combat adapter seams - bridge between the weapon engine and the world
//!
//! The engine never touches concrete world types. The scene supplies an
//! owner view, a target registry and a damage pipeline through these
//! traits, and the manager threads them into every controller tick.

use crate::core::types::{TargetId, Vec2};
use serde::{Deserialize, Serialize};

/// Read-only snapshot of one attackable target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: TargetId,
    pub position: Vec2,
    pub hp: f32,
    /// Collision radius used for projectile contact tests
    pub radius: f32,
}

/// The entity that carries the weapons
pub trait Owner {
    fn position(&self) -> Vec2;
    /// Last aim/movement direction; used by `facing` targeting mode
    fn facing_direction(&self) -> Vec2;
    /// Global fire gate (stunned, disarmed, cutscene, ...)
    fn can_fire(&self) -> bool;
}

/// Queryable registry of active targets
pub trait TargetRegistry {
    /// Snapshots of every active target. Order is not significant; the
    /// selection layer sorts deterministically.
    fn active_targets(&self) -> Vec<TargetSnapshot>;

    fn is_active(&self, id: TargetId) -> bool;

    fn snapshot(&self, id: TargetId) -> Option<TargetSnapshot>;
}

/// External damage resolution - applies buffs the engine knows nothing about
///
/// `resolve` previews the effective damage for reservation accounting;
/// `deal` actually applies it. Both take the raw post-crit roll.
pub trait DamagePipeline {
    fn resolve(&self, raw: f32, target: TargetId) -> f32;

    /// Apply damage. Returns the amount actually applied.
    fn deal(&mut self, raw: f32, target: TargetId) -> f32;
}

/// Everything a controller tick needs from the outside world
pub struct CombatContext<'a> {
    pub owner: &'a dyn Owner,
    pub targets: &'a dyn TargetRegistry,
    pub damage: &'a mut dyn DamagePipeline,
}
