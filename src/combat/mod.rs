//! Damage resolution and world-facing seams

pub mod adapter;
pub mod damage;

pub use adapter::{CombatContext, DamagePipeline, Owner, TargetRegistry, TargetSnapshot};
pub use damage::{roll_damage, CritSpec, DamageRoll, DamageSpec};
