//! Cross-weapon damage reservation ledger
//!
//! Every committed shot registers a prediction: this much damage lands on
//! that target at that time. Controllers consult the ledger before
//! committing so several weapons do not burn their cadence overkilling a
//! target that is already as good as dead.
//!
//! This is the only mutable state shared across weapons; all access goes
//! through this API.

use crate::combat::TargetRegistry;
use crate::core::config::TargetingConfig;
use crate::core::types::{ReservationId, TargetId, TimeMs, WeaponId};
use ahash::AHashMap;
use tracing::debug;

/// A coordinator-tracked prediction of future damage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reservation {
    pub id: ReservationId,
    pub weapon: WeaponId,
    pub target: TargetId,
    pub impact_at: TimeMs,
    pub damage: f32,
    pub expires_at: TimeMs,
}

/// Shared predictive ledger. Owned by the manager, threaded into each
/// controller tick by reference.
#[derive(Debug)]
pub struct TargetingCoordinator {
    cfg: TargetingConfig,
    next_id: u64,
    reservations: AHashMap<ReservationId, Reservation>,
}

impl TargetingCoordinator {
    pub fn new(cfg: TargetingConfig) -> Self {
        Self {
            cfg,
            next_id: 0,
            reservations: AHashMap::new(),
        }
    }

    pub fn config(&self) -> &TargetingConfig {
        &self.cfg
    }

    /// Register predicted damage landing on `target` at `impact_at`.
    ///
    /// The reservation self-expires `expiry_buffer_ms` past its impact time
    /// if never consumed (missed shot, early release).
    pub fn reserve(
        &mut self,
        weapon: WeaponId,
        target: TargetId,
        impact_at: TimeMs,
        damage: f32,
    ) -> ReservationId {
        let id = ReservationId(self.next_id);
        self.next_id += 1;
        self.reservations.insert(
            id,
            Reservation {
                id,
                weapon,
                target,
                impact_at,
                damage,
                expires_at: impact_at + self.cfg.expiry_buffer_ms,
            },
        );
        id
    }

    /// Sum of reserved damage predicted to land on `target` no later than
    /// `horizon + tolerance_ms`
    pub fn predicted_damage_before(
        &self,
        target: TargetId,
        horizon: TimeMs,
        tolerance_ms: TimeMs,
    ) -> f32 {
        self.reservations
            .values()
            .filter(|r| r.target == target && r.impact_at <= horizon + tolerance_ms)
            .map(|r| r.damage)
            .sum()
    }

    /// Predicted HP of `target` at `impact_at`, given its current HP.
    ///
    /// The anti-overkill primitive: at or below zero means the target is
    /// already spoken for.
    pub fn predicted_hp_at_impact(
        &self,
        target: TargetId,
        current_hp: f32,
        impact_at: TimeMs,
        tolerance_ms: TimeMs,
    ) -> f32 {
        current_hp - self.predicted_damage_before(target, impact_at, tolerance_ms)
    }

    /// Remove one reservation. Returns whether it was still present.
    ///
    /// Double consumes happen on defensive release paths and are a guarded
    /// no-op, not an error.
    pub fn consume_reservation(&mut self, id: ReservationId) -> bool {
        let found = self.reservations.remove(&id).is_some();
        if !found {
            debug!(?id, "consume of unknown reservation ignored");
        }
        found
    }

    /// Drop every reservation tagged to `weapon` (unequip path)
    pub fn release_by_weapon(&mut self, weapon: WeaponId) {
        self.reservations.retain(|_, r| r.weapon != weapon);
    }

    /// Drop every reservation against `target` (death path)
    pub fn clear_for_enemy(&mut self, target: TargetId) {
        self.reservations.retain(|_, r| r.target != target);
    }

    /// Drop reservations past expiry or whose target left play.
    ///
    /// Must run at least once per tick; the ledger must never grow without
    /// bound.
    pub fn prune(&mut self, now: TimeMs, targets: &dyn TargetRegistry) {
        self.reservations
            .retain(|_, r| now < r.expires_at && targets.is_active(r.target));
    }

    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }
}
