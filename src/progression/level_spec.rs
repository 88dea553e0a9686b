//! Per-level delta accumulation
//!
//! Each weapon definition carries a delta table keyed by level (2..=max).
//! Upgrading to level L applies every delta from 2 up to L, merged over a
//! closed schema: later levels override scalars, nested blocks merge
//! field-wise. Unknown fields fail at deserialization, they never pass
//! through silently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Damage deltas for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DamageDelta {
    pub base_mult: Option<f32>,
    pub base_add: Option<f32>,
    pub crit_chance_add: Option<f32>,
    pub crit_mult_add: Option<f32>,
}

/// Cadence deltas for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CadenceDelta {
    pub delay_ms_mult: Option<f32>,
    pub warmup_ms_mult: Option<f32>,
}

/// Projectile deltas for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ProjectileDelta {
    pub speed_mult: Option<f32>,
    pub pierce_add: Option<u32>,
    pub lifetime_ms_mult: Option<f32>,
    pub max_distance_mult: Option<f32>,
}

/// Area-effect deltas for one level
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AoeDelta {
    pub radius_mult: Option<f32>,
    pub damage_mult: Option<f32>,
}

/// One level's complete delta block (closed schema)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LevelDelta {
    pub damage: Option<DamageDelta>,
    pub cadence: Option<CadenceDelta>,
    pub projectile: Option<ProjectileDelta>,
    pub aoe: Option<AoeDelta>,
    pub salvo_add: Option<u32>,
    pub hops_add: Option<u32>,
    pub orbit_count_add: Option<u32>,
}

/// Per-weapon level delta table, keyed by the level that introduces the delta
pub type LevelTable = BTreeMap<u32, LevelDelta>;

fn merge_damage(into: &mut DamageDelta, from: &DamageDelta) {
    if from.base_mult.is_some() {
        into.base_mult = from.base_mult;
    }
    if from.base_add.is_some() {
        into.base_add = from.base_add;
    }
    if from.crit_chance_add.is_some() {
        into.crit_chance_add = from.crit_chance_add;
    }
    if from.crit_mult_add.is_some() {
        into.crit_mult_add = from.crit_mult_add;
    }
}

fn merge_cadence(into: &mut CadenceDelta, from: &CadenceDelta) {
    if from.delay_ms_mult.is_some() {
        into.delay_ms_mult = from.delay_ms_mult;
    }
    if from.warmup_ms_mult.is_some() {
        into.warmup_ms_mult = from.warmup_ms_mult;
    }
}

fn merge_projectile(into: &mut ProjectileDelta, from: &ProjectileDelta) {
    if from.speed_mult.is_some() {
        into.speed_mult = from.speed_mult;
    }
    if from.pierce_add.is_some() {
        into.pierce_add = from.pierce_add;
    }
    if from.lifetime_ms_mult.is_some() {
        into.lifetime_ms_mult = from.lifetime_ms_mult;
    }
    if from.max_distance_mult.is_some() {
        into.max_distance_mult = from.max_distance_mult;
    }
}

fn merge_aoe(into: &mut AoeDelta, from: &AoeDelta) {
    if from.radius_mult.is_some() {
        into.radius_mult = from.radius_mult;
    }
    if from.damage_mult.is_some() {
        into.damage_mult = from.damage_mult;
    }
}

/// Merge one level's delta into an accumulated spec.
///
/// Scalars override; nested blocks merge field-wise so a later level can
/// touch one field without clobbering its siblings.
pub fn merge_delta(into: &mut LevelDelta, from: &LevelDelta) {
    if let Some(d) = &from.damage {
        merge_damage(into.damage.get_or_insert_with(Default::default), d);
    }
    if let Some(c) = &from.cadence {
        merge_cadence(into.cadence.get_or_insert_with(Default::default), c);
    }
    if let Some(p) = &from.projectile {
        merge_projectile(into.projectile.get_or_insert_with(Default::default), p);
    }
    if let Some(a) = &from.aoe {
        merge_aoe(into.aoe.get_or_insert_with(Default::default), a);
    }
    if from.salvo_add.is_some() {
        into.salvo_add = from.salvo_add;
    }
    if from.hops_add.is_some() {
        into.hops_add = from.hops_add;
    }
    if from.orbit_count_add.is_some() {
        into.orbit_count_add = from.orbit_count_add;
    }
}

/// Accumulate every delta from level 2 up to `level`.
///
/// Level 1 (and below) yields the empty spec. Accumulation is monotonic:
/// raising the level never removes a previously applied field.
pub fn accumulate_level_spec(levels: &LevelTable, level: u32) -> LevelDelta {
    let mut acc = LevelDelta::default();
    if level < 2 {
        return acc;
    }
    for (_, delta) in levels.range(2..=level) {
        merge_delta(&mut acc, delta);
    }
    acc
}
