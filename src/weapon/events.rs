//! Events emitted by the weapon engine
//!
//! These are returned by `WeaponManager::update` for the presentation
//! layer (VFX, audio, HUD log). The engine itself never renders.

use crate::core::types::{TargetId, Vec2};
use serde::Serialize;

/// Why a due fire activation was dropped this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Pool had no free slot; the attempt is dropped, not queued
    PoolExhausted,
    /// Owner's fire gate (`can_fire`) was closed
    OwnerGated,
}

/// Notifications produced during weapon lifecycle and firing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum WeaponEvent {
    WeaponAdded {
        key: String,
        level: u32,
    },
    WeaponRemoved {
        key: String,
    },
    WeaponUpgraded {
        key: String,
        level: u32,
    },
    /// One firing activation began
    FireStarted {
        key: String,
        position: Vec2,
    },
    /// The activation finished (last salvo/stagger shot spawned)
    FireEnded {
        key: String,
    },
    /// Damage was applied to a target
    Impact {
        key: String,
        target: TargetId,
        damage: f32,
        crit: bool,
    },
    /// A due activation was dropped (telemetry)
    FireSkipped {
        key: String,
        reason: SkipReason,
    },
}
