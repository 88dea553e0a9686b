//! Weapon definitions and the static definition table
//!
//! Definitions are authored in TOML (`data/weapons.toml`), loaded once at
//! startup and validated entry by entry. A malformed entry is rejected
//! with a clear error, never silently defaulted; table-level validation
//! failure is the one condition that should halt initialization.

use crate::combat::damage::{CritSpec, DamageSpec};
use crate::core::error::{Result, WeaponError};
use crate::progression::level_spec::{LevelDelta, LevelTable};
use crate::progression::modifiers::{apply_to, Modifier, StatPath};
use crate::weapon::archetype::{ArchetypeSpec, TargetingMode};
use ahash::AHashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Embedded stock weapon table
const BUILTIN_TABLE: &str = include_str!("../../data/weapons.toml");

/// Fire cadence parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CadenceSpec {
    /// Minimum delay between activations
    pub delay_ms: u64,
    /// Optional pre-fire delay per activation
    #[serde(default)]
    pub warmup_ms: u64,
}

fn default_hit_radius() -> f32 {
    14.0
}

/// Shared projectile parameter block
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectileSpec {
    pub speed: f32,
    pub lifetime_ms: u64,
    #[serde(default)]
    pub pierce: u32,
    #[serde(default)]
    pub max_distance: Option<f32>,
    #[serde(default = "default_hit_radius")]
    pub hit_radius: f32,
}

fn default_damage_mult() -> f32 {
    1.0
}

/// Area-effect block (expiry explosions, slash/strike areas)
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AoeSpec {
    pub radius: f32,
    /// Fraction of the flight's damage applied in the area
    #[serde(default = "default_damage_mult")]
    pub damage_mult: f32,
}

/// Immutable weapon definition; many instances may share one
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponDefinition {
    pub key: String,
    pub name: String,
    pub archetype: ArchetypeSpec,
    pub targeting: TargetingMode,
    /// Acquisition range for target-dependent modes
    pub range: f32,
    pub pool_capacity: usize,
    pub cadence: CadenceSpec,
    pub damage: DamageSpec,
    pub projectile: Option<ProjectileSpec>,
    pub aoe: Option<AoeSpec>,
    /// Per-level delta table (levels 2..=max)
    pub levels: LevelTable,
}

impl WeaponDefinition {
    /// Highest reachable level (1 when the weapon has no deltas)
    pub fn max_level(&self) -> u32 {
        self.levels.keys().max().copied().unwrap_or(1).max(1)
    }
}

fn default_targeting() -> TargetingMode {
    TargetingMode::Nearest
}

fn default_pool_capacity() -> usize {
    64
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWeapon {
    key: String,
    #[serde(default)]
    name: Option<String>,
    archetype: ArchetypeSpec,
    #[serde(default = "default_targeting")]
    targeting: TargetingMode,
    #[serde(default)]
    range: Option<f32>,
    #[serde(default = "default_pool_capacity")]
    pool_capacity: usize,
    cadence: CadenceSpec,
    damage: DamageSpec,
    #[serde(default)]
    projectile: Option<ProjectileSpec>,
    #[serde(default)]
    aoe: Option<AoeSpec>,
    #[serde(default)]
    levels: BTreeMap<String, LevelDelta>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTable {
    version: u32,
    #[serde(default, rename = "weapon")]
    weapons: Vec<RawWeapon>,
}

/// The static, versioned weapon definition table
#[derive(Debug, Clone)]
pub struct DefinitionTable {
    pub version: u32,
    weapons: AHashMap<String, Arc<WeaponDefinition>>,
}

impl DefinitionTable {
    /// Parse and validate a TOML definition table
    pub fn from_toml(text: &str) -> Result<Self> {
        let raw: RawTable = toml::from_str(text)?;
        if raw.version == 0 {
            return Err(WeaponError::InvalidTable("version must be >= 1".into()));
        }
        let mut weapons = AHashMap::new();
        for raw_weapon in raw.weapons {
            let def = validate_weapon(raw_weapon)?;
            let key = def.key.clone();
            if weapons.insert(key.clone(), Arc::new(def)).is_some() {
                return Err(WeaponError::InvalidTable(format!("duplicate key '{}'", key)));
            }
        }
        Ok(Self { version: raw.version, weapons })
    }

    /// The embedded stock table
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_TABLE)
    }

    pub fn get(&self, key: &str) -> Option<Arc<WeaponDefinition>> {
        self.weapons.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.weapons.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.weapons.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> WeaponError {
    WeaponError::InvalidDefinition { key: key.to_string(), reason: reason.into() }
}

fn validate_weapon(raw: RawWeapon) -> Result<WeaponDefinition> {
    let key = raw.key.trim().to_string();
    if key.is_empty() {
        return Err(WeaponError::InvalidTable("entry with empty key".into()));
    }
    if raw.cadence.delay_ms == 0 {
        return Err(invalid(&key, "cadence.delay_ms must be > 0"));
    }
    if raw.damage.base < 0.0 {
        return Err(invalid(&key, "damage.base must be >= 0"));
    }
    if !(0.0..=1.0).contains(&raw.damage.crit.chance) {
        return Err(invalid(&key, "damage.crit.chance must be within 0..=1"));
    }
    if raw.damage.crit.mult <= 0.0 {
        return Err(invalid(&key, "damage.crit.mult must be > 0"));
    }
    if raw.pool_capacity == 0 {
        return Err(invalid(&key, "pool_capacity must be >= 1"));
    }
    if raw.archetype.needs_projectile_spec() && raw.projectile.is_none() {
        return Err(invalid(
            &key,
            format!("archetype '{}' requires a [weapon.projectile] block", raw.archetype.kind_name()),
        ));
    }
    if let Some(p) = &raw.projectile {
        if p.speed <= 0.0 {
            return Err(invalid(&key, "projectile.speed must be > 0"));
        }
        if p.lifetime_ms == 0 {
            return Err(invalid(&key, "projectile.lifetime_ms must be > 0"));
        }
    }
    if let Some(a) = &raw.aoe {
        if a.radius <= 0.0 {
            return Err(invalid(&key, "aoe.radius must be > 0"));
        }
    }

    let range = match raw.targeting {
        TargetingMode::Nearest => raw
            .range
            .filter(|r| *r > 0.0)
            .ok_or_else(|| invalid(&key, "targeting 'nearest' requires range > 0"))?,
        _ => raw.range.unwrap_or(0.0),
    };

    validate_archetype(&key, &raw.archetype, raw.aoe.as_ref())?;
    if matches!(raw.archetype, ArchetypeSpec::Cross { .. }) && range <= 0.0 {
        return Err(invalid(&key, "cross requires range > 0 (arm extent bound)"));
    }

    let mut levels = LevelTable::new();
    for (level_key, delta) in raw.levels {
        let level: u32 = level_key
            .parse()
            .map_err(|_| invalid(&key, format!("level key '{}' is not a number", level_key)))?;
        if level < 2 {
            return Err(invalid(&key, format!("level {} deltas are invalid; deltas start at 2", level)));
        }
        validate_delta(&key, level, &delta)?;
        levels.insert(level, delta);
    }

    Ok(WeaponDefinition {
        name: raw.name.unwrap_or_else(|| key.clone()),
        key,
        archetype: raw.archetype,
        targeting: raw.targeting,
        range,
        pool_capacity: raw.pool_capacity,
        cadence: raw.cadence,
        damage: raw.damage,
        projectile: raw.projectile,
        aoe: raw.aoe,
        levels,
    })
}

fn validate_archetype(key: &str, archetype: &ArchetypeSpec, aoe: Option<&AoeSpec>) -> Result<()> {
    match archetype {
        ArchetypeSpec::Projectile { salvo, spread_deg } => {
            if *salvo == 0 {
                return Err(invalid(key, "salvo must be >= 1"));
            }
            if *spread_deg < 0.0 {
                return Err(invalid(key, "spread_deg must be >= 0"));
            }
        }
        ArchetypeSpec::Slash { radius, .. } => {
            if *radius <= 0.0 {
                return Err(invalid(key, "slash radius must be > 0"));
            }
        }
        ArchetypeSpec::Chain { max_hops, hop_range, falloff_per_hop }
        | ArchetypeSpec::ChainThrow { max_hops, hop_range, falloff_per_hop, .. } => {
            if *max_hops == 0 {
                return Err(invalid(key, "max_hops must be >= 1"));
            }
            if *hop_range <= 0.0 {
                return Err(invalid(key, "hop_range must be > 0"));
            }
            if !(0.0..1.0).contains(falloff_per_hop) {
                return Err(invalid(key, "falloff_per_hop must be within 0..1"));
            }
            if let ArchetypeSpec::ChainThrow { per_hop_duration_ms, .. } = archetype {
                if *per_hop_duration_ms == 0 {
                    return Err(invalid(key, "per_hop_duration_ms must be > 0"));
                }
            }
        }
        ArchetypeSpec::Cluster { count, angles_deg, .. } => {
            if *count == 0 {
                return Err(invalid(key, "cluster count must be >= 1"));
            }
            if !angles_deg.is_empty() && angles_deg.len() != *count as usize {
                return Err(invalid(key, "angles_deg must match cluster count"));
            }
        }
        ArchetypeSpec::Ballistic { launch_angle_deg, launch_speed, gravity } => {
            if !(0.0..90.0).contains(launch_angle_deg) {
                return Err(invalid(key, "launch_angle_deg must be within 0..90"));
            }
            if *launch_speed <= 0.0 || *gravity <= 0.0 {
                return Err(invalid(key, "launch_speed and gravity must be > 0"));
            }
        }
        ArchetypeSpec::Bazooka { detonate_seconds, cluster_count } => {
            if *detonate_seconds <= 0.0 {
                return Err(invalid(key, "detonate_seconds must be > 0"));
            }
            if *cluster_count == 0 {
                return Err(invalid(key, "cluster_count must be >= 1"));
            }
            if aoe.is_none() {
                return Err(invalid(key, "bazooka requires an [weapon.aoe] block"));
            }
        }
        ArchetypeSpec::Circular { count, radius, angular_velocity_deg, .. } => {
            if *count == 0 {
                return Err(invalid(key, "orbiter count must be >= 1"));
            }
            if *radius <= 0.0 || *angular_velocity_deg == 0.0 {
                return Err(invalid(key, "orbit radius and angular velocity must be nonzero"));
            }
        }
        ArchetypeSpec::Cross { step_px_per_frame } => {
            if *step_px_per_frame <= 0.0 {
                return Err(invalid(key, "step_px_per_frame must be > 0"));
            }
        }
        ArchetypeSpec::Strike { impact_delay_ms, radius, .. } => {
            if *impact_delay_ms == 0 {
                return Err(invalid(key, "impact_delay_ms must be > 0"));
            }
            if *radius <= 0.0 {
                return Err(invalid(key, "strike radius must be > 0"));
            }
        }
    }
    Ok(())
}

fn validate_delta(key: &str, level: u32, delta: &LevelDelta) -> Result<()> {
    let mults = [
        delta.damage.and_then(|d| d.base_mult),
        delta.cadence.and_then(|c| c.delay_ms_mult),
        delta.cadence.and_then(|c| c.warmup_ms_mult),
        delta.projectile.and_then(|p| p.speed_mult),
        delta.projectile.and_then(|p| p.lifetime_ms_mult),
        delta.projectile.and_then(|p| p.max_distance_mult),
        delta.aoe.and_then(|a| a.radius_mult),
        delta.aoe.and_then(|a| a.damage_mult),
    ];
    if mults.iter().flatten().any(|m| *m <= 0.0) {
        return Err(invalid(key, format!("level {} has a non-positive multiplier", level)));
    }
    Ok(())
}

/// Definition stats after applying a composed modifier list
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub damage_base: f32,
    pub crit: CritSpec,
    pub delay_ms: f32,
    pub warmup_ms: f32,
    pub speed: f32,
    pub pierce: u32,
    pub lifetime_ms: f32,
    pub max_distance: Option<f32>,
    pub hit_radius: f32,
    pub aoe_radius: f32,
    pub aoe_damage_mult: f32,
    pub salvo: u32,
    pub spread_deg: f32,
    pub hops: u32,
    pub orbit_count: u32,
}

/// Resolve the effective stats of `def` under `modifiers`.
///
/// Every addressable path starts from the definition's base value; paths
/// the archetype does not use resolve to inert defaults.
pub fn resolve_config(def: &WeaponDefinition, modifiers: &[Modifier]) -> ResolvedConfig {
    let proj = def.projectile;
    let aoe = def.aoe;

    let base_salvo = match &def.archetype {
        ArchetypeSpec::Projectile { salvo, .. } => *salvo,
        ArchetypeSpec::Cluster { count, .. } => *count,
        ArchetypeSpec::Bazooka { cluster_count, .. } => *cluster_count,
        _ => 1,
    };
    let base_spread = match &def.archetype {
        ArchetypeSpec::Projectile { spread_deg, .. } => *spread_deg,
        _ => 0.0,
    };
    let base_hops = match &def.archetype {
        ArchetypeSpec::Chain { max_hops, .. } | ArchetypeSpec::ChainThrow { max_hops, .. } => {
            *max_hops
        }
        _ => 0,
    };
    let base_orbits = match &def.archetype {
        ArchetypeSpec::Circular { count, .. } => *count,
        _ => 0,
    };
    // slash/strike carry their area radius on the archetype; expose it
    // through the aoe.radius path so level deltas reach it
    let base_aoe_radius = aoe.map(|a| a.radius).unwrap_or(match &def.archetype {
        ArchetypeSpec::Slash { radius, .. } | ArchetypeSpec::Strike { radius, .. } => *radius,
        _ => 0.0,
    });

    let round_count = |v: f32| v.round().max(0.0) as u32;

    ResolvedConfig {
        damage_base: apply_to(def.damage.base, StatPath::DamageBase, modifiers),
        crit: CritSpec {
            chance: apply_to(def.damage.crit.chance, StatPath::CritChance, modifiers)
                .clamp(0.0, 1.0),
            mult: apply_to(def.damage.crit.mult, StatPath::CritMult, modifiers).max(1.0),
        },
        delay_ms: apply_to(def.cadence.delay_ms as f32, StatPath::CadenceDelayMs, modifiers)
            .max(1.0),
        warmup_ms: apply_to(def.cadence.warmup_ms as f32, StatPath::CadenceWarmupMs, modifiers)
            .max(0.0),
        speed: apply_to(
            proj.map(|p| p.speed).unwrap_or(0.0),
            StatPath::ProjectileSpeed,
            modifiers,
        ),
        pierce: round_count(apply_to(
            proj.map(|p| p.pierce as f32).unwrap_or(0.0),
            StatPath::ProjectilePierce,
            modifiers,
        )),
        lifetime_ms: apply_to(
            proj.map(|p| p.lifetime_ms as f32).unwrap_or(0.0),
            StatPath::ProjectileLifetimeMs,
            modifiers,
        ),
        max_distance: proj.and_then(|p| p.max_distance).map(|d| {
            apply_to(d, StatPath::ProjectileMaxDistance, modifiers)
        }),
        hit_radius: proj.map(|p| p.hit_radius).unwrap_or_else(default_hit_radius),
        aoe_radius: apply_to(base_aoe_radius, StatPath::AoeRadius, modifiers),
        aoe_damage_mult: apply_to(
            aoe.map(|a| a.damage_mult).unwrap_or(1.0),
            StatPath::AoeDamageMult,
            modifiers,
        ),
        salvo: round_count(apply_to(base_salvo as f32, StatPath::Salvo, modifiers)).max(1),
        spread_deg: base_spread,
        hops: round_count(apply_to(base_hops as f32, StatPath::ChainHops, modifiers)),
        orbit_count: round_count(apply_to(base_orbits as f32, StatPath::OrbitCount, modifiers)),
    }
}
