//! Damage block shared by every weapon archetype
//!
//! All archetypes carry the same `{base, crit}` block. Final damage is
//! resolved by rolling crit, then handed to the external damage pipeline
//! before any reservation is made.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Critical-hit parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CritSpec {
    /// Chance per roll, 0.0..=1.0
    pub chance: f32,
    /// Damage multiplier on crit
    pub mult: f32,
}

impl Default for CritSpec {
    fn default() -> Self {
        Self { chance: 0.0, mult: 2.0 }
    }
}

/// Damage block `{base, crit}` carried by every weapon definition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageSpec {
    pub base: f32,
    #[serde(default)]
    pub crit: CritSpec,
}

/// One resolved damage roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    pub amount: f32,
    pub crit: bool,
}

/// Roll crit against `base` damage (already modifier-resolved)
pub fn roll_damage(base: f32, crit: CritSpec, rng: &mut impl Rng) -> DamageRoll {
    let is_crit = crit.chance > 0.0 && rng.gen::<f32>() < crit.chance;
    let amount = if is_crit { base * crit.mult } else { base };
    DamageRoll { amount, crit: is_crit }
}
