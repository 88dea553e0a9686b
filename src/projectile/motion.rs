//! Scripted projectile motion
//!
//! Most shots integrate velocity, but several archetypes derive their
//! position from script state instead: orbiters from a phase angle, chain
//! throws from hop interpolation, cross arms from an expanding extent.
//! Coordinates are screen-style: +y is down, so "downward acceleration"
//! for ballistic shots is a positive y component.

use crate::core::types::{TargetId, TimeMs, Vec2};
use serde::{Deserialize, Serialize};

/// Spin direction for orbiting shots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinDirection {
    Clockwise,
    CounterClockwise,
}

impl SpinDirection {
    pub fn sign(&self) -> f32 {
        match self {
            SpinDirection::Clockwise => 1.0,
            SpinDirection::CounterClockwise => -1.0,
        }
    }
}

/// Expiry-triggered area effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExplosionSpec {
    pub radius: f32,
    /// Fraction of the flight's damage applied in the area
    pub damage_mult: f32,
}

/// Per-flight scripted motion state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Velocity-integrated straight flight
    Linear,
    /// Velocity plus constant acceleration; lands on return to launch height
    Ballistic { launch_y: f32 },
    /// Owner-centred orbit; position derived from the phase angle each tick
    Orbit {
        radius: f32,
        /// Radians per second
        angular_velocity: f32,
        phase: f32,
        spin: SpinDirection,
    },
    /// Physical relocation between chain-hop targets
    Hop {
        from: Vec2,
        to: Vec2,
        target: TargetId,
        elapsed_ms: f32,
        duration_ms: f32,
        hop_index: u32,
    },
    /// One arm of an expanding cross; steps a fixed distance per tick
    CrossArm {
        origin: Vec2,
        dir: Vec2,
        extent: f32,
        step_per_tick: f32,
    },
    /// Fixed-position effect (slash arcs, strikes)
    Anchored,
}

/// Everything `fire` needs to launch or re-launch one flight
#[derive(Debug, Clone)]
pub struct FireParams {
    pub position: Vec2,
    /// Normalized flight direction (ignored by orbit/anchored motion)
    pub direction: Vec2,
    pub speed: f32,
    /// None keeps the flight alive until released (persistent orbiters)
    pub lifetime_ms: Option<TimeMs>,
    pub pierce: u32,
    /// Resolved damage this flight carries (crit already rolled)
    pub damage: f32,
    pub crit: bool,
    pub acceleration: Vec2,
    pub max_distance: Option<f32>,
    pub explode_on_expiry: Option<ExplosionSpec>,
    pub motion: Motion,
}

impl FireParams {
    /// Straight shot with the common defaults; callers override fields
    pub fn linear(position: Vec2, direction: Vec2, speed: f32) -> Self {
        Self {
            position,
            direction,
            speed,
            lifetime_ms: None,
            pierce: 0,
            damage: 0.0,
            crit: false,
            acceleration: Vec2::ZERO,
            max_distance: None,
            explode_on_expiry: None,
            motion: Motion::Linear,
        }
    }
}
