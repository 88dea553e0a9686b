//! Stat modifiers over a closed set of addressable paths
//!
//! A modifier is `{op, path, value}`. Per path, adds apply before
//! multiplies, and paths resolve in declaration order, so any composed
//! list produces the same result regardless of the layers it came from.

use crate::progression::level_spec::{accumulate_level_spec, LevelTable};
use serde::{Deserialize, Serialize};

/// Modifier operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifierOp {
    Add,
    Multiply,
}

/// The fixed set of addressable stat paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatPath {
    DamageBase,
    CritChance,
    CritMult,
    CadenceDelayMs,
    CadenceWarmupMs,
    ProjectileSpeed,
    ProjectilePierce,
    ProjectileLifetimeMs,
    ProjectileMaxDistance,
    AoeRadius,
    AoeDamageMult,
    Salvo,
    ChainHops,
    OrbitCount,
}

impl StatPath {
    /// Declaration order, used for deterministic application and rendering
    pub const ALL: [StatPath; 14] = [
        StatPath::DamageBase,
        StatPath::CritChance,
        StatPath::CritMult,
        StatPath::CadenceDelayMs,
        StatPath::CadenceWarmupMs,
        StatPath::ProjectileSpeed,
        StatPath::ProjectilePierce,
        StatPath::ProjectileLifetimeMs,
        StatPath::ProjectileMaxDistance,
        StatPath::AoeRadius,
        StatPath::AoeDamageMult,
        StatPath::Salvo,
        StatPath::ChainHops,
        StatPath::OrbitCount,
    ];

    /// Human-readable label for upgrade summaries
    pub fn label(&self) -> &'static str {
        match self {
            StatPath::DamageBase => "Damage",
            StatPath::CritChance => "Crit chance",
            StatPath::CritMult => "Crit damage",
            StatPath::CadenceDelayMs => "Cooldown",
            StatPath::CadenceWarmupMs => "Warmup",
            StatPath::ProjectileSpeed => "Projectile speed",
            StatPath::ProjectilePierce => "Pierce",
            StatPath::ProjectileLifetimeMs => "Lifetime",
            StatPath::ProjectileMaxDistance => "Range",
            StatPath::AoeRadius => "Area radius",
            StatPath::AoeDamageMult => "Area damage",
            StatPath::Salvo => "Salvo",
            StatPath::ChainHops => "Chain hops",
            StatPath::OrbitCount => "Orbiters",
        }
    }
}

/// A single stat modification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub op: ModifierOp,
    pub path: StatPath,
    pub value: f32,
}

impl Modifier {
    pub fn add(path: StatPath, value: f32) -> Self {
        Self { op: ModifierOp::Add, path, value }
    }

    pub fn multiply(path: StatPath, value: f32) -> Self {
        Self { op: ModifierOp::Multiply, path, value }
    }
}

/// Apply a composed modifier list to one base value.
///
/// Adds first, then multiplies, restricted to `path`.
pub fn apply_to(base: f32, path: StatPath, modifiers: &[Modifier]) -> f32 {
    let mut value = base;
    for m in modifiers.iter().filter(|m| m.path == path && m.op == ModifierOp::Add) {
        value += m.value;
    }
    for m in modifiers
        .iter()
        .filter(|m| m.path == path && m.op == ModifierOp::Multiply)
    {
        value *= m.value;
    }
    value
}

/// Derive the modifier list encoded by one accumulated level spec.
///
/// Field mapping is fixed (`*_mult` -> Multiply, `*_add` -> Add) and emitted
/// in `StatPath::ALL` order so the result is reproducible.
pub fn spec_modifiers(spec: &crate::progression::level_spec::LevelDelta) -> Vec<Modifier> {
    let mut out = Vec::new();
    if let Some(d) = &spec.damage {
        if let Some(v) = d.base_add {
            out.push(Modifier::add(StatPath::DamageBase, v));
        }
        if let Some(v) = d.base_mult {
            out.push(Modifier::multiply(StatPath::DamageBase, v));
        }
        if let Some(v) = d.crit_chance_add {
            out.push(Modifier::add(StatPath::CritChance, v));
        }
        if let Some(v) = d.crit_mult_add {
            out.push(Modifier::add(StatPath::CritMult, v));
        }
    }
    if let Some(c) = &spec.cadence {
        if let Some(v) = c.delay_ms_mult {
            out.push(Modifier::multiply(StatPath::CadenceDelayMs, v));
        }
        if let Some(v) = c.warmup_ms_mult {
            out.push(Modifier::multiply(StatPath::CadenceWarmupMs, v));
        }
    }
    if let Some(p) = &spec.projectile {
        if let Some(v) = p.speed_mult {
            out.push(Modifier::multiply(StatPath::ProjectileSpeed, v));
        }
        if let Some(v) = p.pierce_add {
            out.push(Modifier::add(StatPath::ProjectilePierce, v as f32));
        }
        if let Some(v) = p.lifetime_ms_mult {
            out.push(Modifier::multiply(StatPath::ProjectileLifetimeMs, v));
        }
        if let Some(v) = p.max_distance_mult {
            out.push(Modifier::multiply(StatPath::ProjectileMaxDistance, v));
        }
    }
    if let Some(a) = &spec.aoe {
        if let Some(v) = a.radius_mult {
            out.push(Modifier::multiply(StatPath::AoeRadius, v));
        }
        if let Some(v) = a.damage_mult {
            out.push(Modifier::multiply(StatPath::AoeDamageMult, v));
        }
    }
    if let Some(v) = spec.salvo_add {
        out.push(Modifier::add(StatPath::Salvo, v as f32));
    }
    if let Some(v) = spec.hops_add {
        out.push(Modifier::add(StatPath::ChainHops, v as f32));
    }
    if let Some(v) = spec.orbit_count_add {
        out.push(Modifier::add(StatPath::OrbitCount, v as f32));
    }
    out
}

/// Level-derived modifiers for a weapon at `level`
pub fn level_modifiers(levels: &LevelTable, level: u32) -> Vec<Modifier> {
    spec_modifiers(&accumulate_level_spec(levels, level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::level_spec::{CadenceDelta, DamageDelta, LevelDelta, LevelTable};

    fn bolt_table() -> LevelTable {
        let mut levels = LevelTable::new();
        levels.insert(
            2,
            LevelDelta {
                damage: Some(DamageDelta { base_mult: Some(1.2), ..Default::default() }),
                ..Default::default()
            },
        );
        levels.insert(
            3,
            LevelDelta {
                cadence: Some(CadenceDelta {
                    delay_ms_mult: Some(0.9),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        levels
    }

    #[test]
    fn test_level_one_has_no_modifiers() {
        assert!(level_modifiers(&bolt_table(), 1).is_empty());
    }

    #[test]
    fn test_level_three_has_both_multiplies_once_each() {
        let mods = level_modifiers(&bolt_table(), 3);
        let damage: Vec<_> = mods.iter().filter(|m| m.path == StatPath::DamageBase).collect();
        let cadence: Vec<_> = mods
            .iter()
            .filter(|m| m.path == StatPath::CadenceDelayMs)
            .collect();
        assert_eq!(damage.len(), 1);
        assert_eq!(damage[0].op, ModifierOp::Multiply);
        assert_eq!(damage[0].value, 1.2);
        assert_eq!(cadence.len(), 1);
        assert_eq!(cadence[0].value, 0.9);
    }

    #[test]
    fn test_apply_adds_before_multiplies() {
        let mods = vec![
            Modifier::multiply(StatPath::DamageBase, 2.0),
            Modifier::add(StatPath::DamageBase, 3.0),
        ];
        // (10 + 3) * 2, regardless of list order
        assert_eq!(apply_to(10.0, StatPath::DamageBase, &mods), 26.0);
    }

    #[test]
    fn test_apply_ignores_other_paths() {
        let mods = vec![Modifier::multiply(StatPath::AoeRadius, 3.0)];
        assert_eq!(apply_to(10.0, StatPath::DamageBase, &mods), 10.0);
    }
}
