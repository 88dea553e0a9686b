//! Engine tuning configuration with documented constants
//!
//! All targeting magic numbers are collected here with explanations of
//! their purpose and how they interact with each other.

use serde::{Deserialize, Serialize};

/// Tuning knobs for target selection and the reservation ledger
///
/// These values have been tuned against the stock weapon table. Changing
/// them shifts how aggressively weapons spread fire across a horde.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetingConfig {
    /// Maximum number of nearest candidates scored per selection pass
    ///
    /// Smaller = cheaper scans, but a weapon may miss a better target just
    /// outside the pool. Larger = better choices in dense hordes at higher
    /// per-tick cost.
    pub candidate_pool_size: usize,

    /// Slack added to a reservation's predicted impact time (ms) when
    /// summing predicted damage against a horizon
    ///
    /// Absorbs ETA estimation error from moving targets. Zero means only
    /// reservations strictly inside the horizon count.
    pub eta_tolerance_ms: u64,

    /// How long past predicted impact a reservation survives before
    /// `prune` drops it (ms)
    ///
    /// A projectile that misses or is released early stops poisoning the
    /// ledger after this buffer.
    pub expiry_buffer_ms: u64,

    /// Score bonus for a shot predicted to finish its target off
    ///
    /// Rewards committing exactly-lethal damage instead of splitting fire.
    pub kill_shot_bonus: f32,

    /// Score penalty for targets already predicted to be at or below
    /// zero HP when our shot would land
    ///
    /// The anti-overkill term: pushes weapons toward targets that will
    /// still be alive.
    pub overkill_penalty: f32,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            candidate_pool_size: 8,
            eta_tolerance_ms: 50,
            expiry_buffer_ms: 250,
            kill_shot_bonus: 0.5,
            overkill_penalty: 2.0,
        }
    }
}
