//! Weapon archetypes
//!
//! A weapon's firing behavior is declared by kind in the definition table
//! and dispatched with an exhaustive match, so adding a kind without
//! wiring its routine is a compile error, not a runtime surprise.

use crate::projectile::SpinDirection;
use serde::{Deserialize, Serialize};

/// How a weapon picks its aim point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetingMode {
    /// Closest in-range enemy, stable tie-break, anti-overkill preference
    Nearest,
    /// No target required; the effect anchors to the owner
    #[serde(rename = "self")]
    SelfAnchored,
    /// Owner's last aim/movement direction
    Facing,
}

impl TargetingMode {
    /// Target-dependent modes gate cadence on a valid target existing
    pub fn requires_target(&self) -> bool {
        matches!(self, TargetingMode::Nearest)
    }
}

/// When a strike's damage lands relative to its cast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeTiming {
    /// Fire-start is delayed with the damage (synced to a wind-up anim)
    Animation,
    /// Fire-start is immediate, only the damage is delayed
    Impact,
}

fn default_salvo() -> u32 {
    1
}

fn default_spin() -> SpinDirection {
    SpinDirection::Clockwise
}

/// Declared behavioral kind of a weapon, one variant per firing routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchetypeSpec {
    /// Straight pooled shot(s) toward target/facing
    Projectile {
        #[serde(default = "default_salvo")]
        salvo: u32,
        /// Fan width for salvos, degrees around the aim angle
        #[serde(default)]
        spread_deg: f32,
    },
    /// Short-lived owner-anchored arc, area damage once at `hit_delay_ms`
    Slash { radius: f32, hit_delay_ms: u64 },
    /// Instantaneous hops across nearby enemies, no repeats per activation
    Chain {
        max_hops: u32,
        hop_range: f32,
        /// Fractional damage reduction per hop, 0..1
        falloff_per_hop: f32,
    },
    /// Chain hops with the projectile physically relocating between targets
    ChainThrow {
        max_hops: u32,
        hop_range: f32,
        falloff_per_hop: f32,
        per_hop_duration_ms: u64,
    },
    /// Ring or explicit-spread burst of sub-shots, optionally staggered
    Cluster {
        count: u32,
        #[serde(default)]
        stagger_ms: u64,
        /// Explicit launch angles in degrees; empty means an even ring
        #[serde(default)]
        angles_deg: Vec<f32>,
    },
    /// Launch angle/speed under constant downward acceleration
    Ballistic {
        launch_angle_deg: f32,
        launch_speed: f32,
        /// Downward acceleration, px/s^2
        gravity: f32,
    },
    /// Moving shot that detonates on impact or after `detonate_seconds`,
    /// spawning a secondary cluster
    Bazooka {
        detonate_seconds: f32,
        cluster_count: u32,
    },
    /// Persistent orbiters around the owner, contact re-evaluated per tick
    Circular {
        count: u32,
        radius: f32,
        angular_velocity_deg: f32,
        #[serde(default = "default_spin")]
        spin: SpinDirection,
    },
    /// Expanding two-axis pattern, damage along the leading edge
    Cross { step_px_per_frame: f32 },
    /// Target-anchored delayed-impact area effect
    Strike {
        impact_delay_ms: u64,
        timing: StrikeTiming,
        radius: f32,
    },
}

impl ArchetypeSpec {
    /// Tag string as written in the definition table (for logs and errors)
    pub fn kind_name(&self) -> &'static str {
        match self {
            ArchetypeSpec::Projectile { .. } => "projectile",
            ArchetypeSpec::Slash { .. } => "slash",
            ArchetypeSpec::Chain { .. } => "chain",
            ArchetypeSpec::ChainThrow { .. } => "chain_throw",
            ArchetypeSpec::Cluster { .. } => "cluster",
            ArchetypeSpec::Ballistic { .. } => "ballistic",
            ArchetypeSpec::Bazooka { .. } => "bazooka",
            ArchetypeSpec::Circular { .. } => "circular",
            ArchetypeSpec::Cross { .. } => "cross",
            ArchetypeSpec::Strike { .. } => "strike",
        }
    }

    /// Does this kind require the shared projectile parameter block?
    pub fn needs_projectile_spec(&self) -> bool {
        matches!(
            self,
            ArchetypeSpec::Projectile { .. }
                | ArchetypeSpec::ChainThrow { .. }
                | ArchetypeSpec::Cluster { .. }
                | ArchetypeSpec::Ballistic { .. }
                | ArchetypeSpec::Bazooka { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_round_trip() {
        let toml = "kind = \"projectile\"\nsalvo = 3\nspread_deg = 15.0\n";
        let spec: ArchetypeSpec = toml::from_str(toml).unwrap();
        assert_eq!(spec, ArchetypeSpec::Projectile { salvo: 3, spread_deg: 15.0 });
        assert_eq!(spec.kind_name(), "projectile");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let toml = "kind = \"laser\"\n";
        assert!(toml::from_str::<ArchetypeSpec>(toml).is_err());
    }

    #[test]
    fn test_self_mode_needs_no_target() {
        assert!(TargetingMode::Nearest.requires_target());
        assert!(!TargetingMode::SelfAnchored.requires_target());
        assert!(!TargetingMode::Facing.requires_target());
    }
}
