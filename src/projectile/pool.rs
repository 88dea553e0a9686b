//! Fixed-capacity projectile pool
//!
//! Slots are allocated lazily up to capacity and recycled forever after.
//! Handles carry a serial so anything held past a release becomes a guarded
//! no-op instead of touching a recycled flight. `acquire` never blocks:
//! exhaustion yields `None` and the fire attempt is dropped.

use crate::core::types::{ReservationId, TargetId, TimeMs, Vec2};
use crate::projectile::motion::{ExplosionSpec, FireParams, Motion};
use crate::targeting::coordinator::TargetingCoordinator;
use ahash::AHashSet;
use tracing::{debug, warn};

/// Handle to one pooled flight. Stale handles (older serial) are rejected
/// by every pool operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectileHandle {
    pub index: u32,
    serial: u32,
}

/// One pooled projectile slot
#[derive(Debug)]
pub struct Projectile {
    active: bool,
    serial: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    /// Visual heading, aligned to velocity while moving
    pub heading: Vec2,
    acceleration: Vec2,
    pub pierce_left: u32,
    pub damage: f32,
    pub crit: bool,
    hit: AHashSet<TargetId>,
    expires_at: Option<TimeMs>,
    max_distance: Option<f32>,
    traveled: f32,
    pub explode_on_expiry: Option<ExplosionSpec>,
    pub reservation: Option<ReservationId>,
    pub motion: Motion,
}

impl Projectile {
    fn empty() -> Self {
        Self {
            active: false,
            serial: 0,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            heading: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            pierce_left: 0,
            damage: 0.0,
            crit: false,
            hit: AHashSet::new(),
            expires_at: None,
            max_distance: None,
            traveled: 0.0,
            explode_on_expiry: None,
            reservation: None,
            motion: Motion::Linear,
        }
    }

    pub fn has_hit(&self, target: TargetId) -> bool {
        self.hit.contains(&target)
    }
}

/// Outcome of registering a contact against a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Damage applies; `retire` means the pierce budget is spent and the
    /// flight must be released after this hit
    Hit { retire: bool },
    /// Target already damaged by this flight; no double counting
    AlreadyHit,
    /// Stale or inactive handle
    Stale,
}

/// Signals produced by the per-tick pool update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// Lifetime deadline passed; owner applies any expiry effect, then
    /// releases
    Expired(ProjectileHandle),
    /// Max travel distance reached; the slot was auto-released
    MaxTravel(ProjectileHandle),
    /// Hop interpolation arrived at its destination
    HopArrived(ProjectileHandle),
    /// Ballistic shot returned to launch height
    BallisticLanded(ProjectileHandle),
}

/// Per-weapon pool. The owning controller is the only caller; pools are
/// never shared across weapons.
#[derive(Debug)]
pub struct ProjectilePool {
    slots: Vec<Projectile>,
    free: Vec<u32>,
    capacity: usize,
}

impl ProjectilePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Reserve an inactive slot, allocating lazily up to capacity.
    ///
    /// Returns `None` on exhaustion; never blocks, never errors.
    pub fn acquire(&mut self) -> Option<ProjectileHandle> {
        let index = match self.free.pop() {
            Some(i) => i,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Projectile::empty());
                (self.slots.len() - 1) as u32
            }
            None => return None,
        };
        let slot = &mut self.slots[index as usize];
        slot.serial = slot.serial.wrapping_add(1);
        slot.active = true;
        Some(ProjectileHandle { index, serial: slot.serial })
    }

    fn slot_mut(&mut self, h: ProjectileHandle) -> Option<&mut Projectile> {
        let slot = self.slots.get_mut(h.index as usize)?;
        (slot.active && slot.serial == h.serial).then_some(slot)
    }

    pub fn get(&self, h: ProjectileHandle) -> Option<&Projectile> {
        let slot = self.slots.get(h.index as usize)?;
        (slot.active && slot.serial == h.serial).then_some(slot)
    }

    pub fn get_mut(&mut self, h: ProjectileHandle) -> Option<&mut Projectile> {
        self.slot_mut(h)
    }

    /// Launch (or re-launch) a flight on an acquired handle.
    ///
    /// Re-firing replaces the previous flight outright: deadline and
    /// per-flight state reset rather than stack. An orbit re-fire keeps the
    /// phase already reached so orbiters stay continuous across
    /// activations.
    pub fn fire(&mut self, h: ProjectileHandle, params: FireParams, now: TimeMs) -> bool {
        let Some(slot) = self.slot_mut(h) else {
            debug!(?h, "fire on stale handle ignored");
            return false;
        };

        let motion = match (&slot.motion, params.motion) {
            (
                Motion::Orbit { phase, .. },
                Motion::Orbit { radius, angular_velocity, spin, .. },
            ) => Motion::Orbit {
                radius,
                angular_velocity,
                phase: *phase,
                spin,
            },
            (_, m) => m,
        };

        slot.position = params.position;
        slot.velocity = params.direction * params.speed;
        slot.heading = if params.speed > 0.0 {
            params.direction
        } else {
            Vec2::ZERO
        };
        slot.acceleration = params.acceleration;
        slot.pierce_left = params.pierce;
        slot.damage = params.damage;
        slot.crit = params.crit;
        slot.hit.clear();
        slot.expires_at = params.lifetime_ms.map(|l| now + l);
        slot.max_distance = params.max_distance;
        slot.traveled = 0.0;
        slot.explode_on_expiry = params.explode_on_expiry;
        slot.motion = motion;
        true
    }

    /// Attach the reservation this flight originated
    pub fn set_reservation(&mut self, h: ProjectileHandle, id: ReservationId) {
        if let Some(slot) = self.slot_mut(h) {
            slot.reservation = Some(id);
        }
    }

    /// Take the reservation off the flight (consumed on primary impact)
    pub fn take_reservation(&mut self, h: ProjectileHandle) -> Option<ReservationId> {
        self.slot_mut(h).and_then(|s| s.reservation.take())
    }

    /// Register a contact with `target`.
    ///
    /// First contact per target per flight only. A hit with no pierce
    /// budget left retires the flight; the caller applies the damage, then
    /// releases.
    pub fn register_hit(&mut self, h: ProjectileHandle, target: TargetId) -> HitOutcome {
        let Some(slot) = self.slot_mut(h) else {
            return HitOutcome::Stale;
        };
        if !slot.hit.insert(target) {
            return HitOutcome::AlreadyHit;
        }
        if slot.pierce_left == 0 {
            HitOutcome::Hit { retire: true }
        } else {
            slot.pierce_left -= 1;
            HitOutcome::Hit { retire: false }
        }
    }

    /// Release a flight back to the free list.
    ///
    /// Idempotent: releasing twice, or through a stale handle, is a logged
    /// no-op. Cancels the pending deadline and releases any reservation the
    /// flight still holds.
    pub fn release(&mut self, h: ProjectileHandle, coord: &mut TargetingCoordinator) -> bool {
        let Some(slot) = self.slots.get_mut(h.index as usize) else {
            warn!(index = h.index, "release of out-of-range handle ignored");
            return false;
        };
        if !slot.active || slot.serial != h.serial {
            debug!(index = h.index, "double release ignored");
            return false;
        }
        if let Some(id) = slot.reservation.take() {
            coord.consume_reservation(id);
        }
        slot.active = false;
        slot.serial = slot.serial.wrapping_add(1);
        slot.hit.clear();
        slot.expires_at = None;
        slot.explode_on_expiry = None;
        slot.motion = Motion::Linear;
        self.free.push(h.index);
        true
    }

    /// Force-release every active flight (weapon teardown)
    pub fn release_all(&mut self, coord: &mut TargetingCoordinator) {
        for h in self.active_handles() {
            self.release(h, coord);
        }
    }

    /// Handles of every active flight, in slot order
    pub fn active_handles(&self) -> Vec<ProjectileHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(i, s)| ProjectileHandle { index: i as u32, serial: s.serial })
            .collect()
    }

    /// Advance every flight one tick.
    ///
    /// Scripted motion advances here; max-travel overruns auto-release;
    /// expiry, hop-arrival and ballistic landing are reported for the
    /// owning controller to resolve.
    pub fn update(
        &mut self,
        delta_ms: TimeMs,
        now: TimeMs,
        owner_position: Vec2,
        coord: &mut TargetingCoordinator,
    ) -> Vec<PoolEvent> {
        let dt = delta_ms as f32 / 1000.0;
        let mut events = Vec::new();
        let mut overrun = Vec::new();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            let handle = ProjectileHandle { index: index as u32, serial: slot.serial };

            match &mut slot.motion {
                Motion::Linear => {
                    slot.velocity = slot.velocity + slot.acceleration * dt;
                    let step = slot.velocity * dt;
                    slot.position = slot.position + step;
                    slot.traveled += step.length();
                    if slot.velocity.length() > 0.0001 {
                        slot.heading = slot.velocity.normalize();
                    }
                }
                Motion::Ballistic { launch_y } => {
                    let launch_y = *launch_y;
                    slot.velocity = slot.velocity + slot.acceleration * dt;
                    let step = slot.velocity * dt;
                    slot.position = slot.position + step;
                    slot.traveled += step.length();
                    if slot.velocity.length() > 0.0001 {
                        slot.heading = slot.velocity.normalize();
                    }
                    if slot.velocity.y > 0.0 && slot.position.y >= launch_y {
                        slot.position.y = launch_y;
                        events.push(PoolEvent::BallisticLanded(handle));
                    }
                }
                Motion::Orbit { radius, angular_velocity, phase, spin } => {
                    *phase += spin.sign() * *angular_velocity * dt;
                    let offset = Vec2::from_angle(*phase) * *radius;
                    slot.position = owner_position + offset;
                    // tangent heading
                    slot.heading = Vec2::from_angle(*phase).rotated(
                        spin.sign() * std::f32::consts::FRAC_PI_2,
                    );
                }
                Motion::Hop { from, to, elapsed_ms, duration_ms, .. } => {
                    *elapsed_ms += delta_ms as f32;
                    let t = (*elapsed_ms / duration_ms.max(1.0)).min(1.0);
                    slot.position = *from + (*to - *from) * t;
                    let dir = (*to - *from).normalize();
                    if dir != Vec2::ZERO {
                        slot.heading = dir;
                    }
                    if t >= 1.0 {
                        events.push(PoolEvent::HopArrived(handle));
                    }
                }
                Motion::CrossArm { origin, dir, extent, step_per_tick } => {
                    *extent += *step_per_tick;
                    slot.position = *origin + *dir * *extent;
                    slot.heading = *dir;
                    slot.traveled = *extent;
                }
                Motion::Anchored => {}
            }

            if let Some(max) = slot.max_distance {
                if slot.traveled >= max {
                    overrun.push(handle);
                    continue;
                }
            }
            if let Some(at) = slot.expires_at {
                if now >= at {
                    events.push(PoolEvent::Expired(handle));
                }
            }
        }

        for handle in overrun {
            self.release(handle, coord);
            events.push(PoolEvent::MaxTravel(handle));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TargetingConfig;
    use crate::core::types::{TargetId, WeaponId};
    use crate::projectile::motion::SpinDirection;

    fn coord() -> TargetingCoordinator {
        TargetingCoordinator::new(TargetingConfig::default())
    }

    fn fire_linear(pool: &mut ProjectilePool, now: TimeMs) -> ProjectileHandle {
        let h = pool.acquire().expect("pool exhausted");
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0);
        params.lifetime_ms = Some(1000);
        pool.fire(h, params, now);
        h
    }

    #[test]
    fn test_acquire_up_to_capacity_then_none() {
        let mut pool = ProjectilePool::new(3);
        for _ in 0..3 {
            assert!(pool.acquire().is_some());
        }
        assert!(pool.acquire().is_none());
        assert_eq!(pool.active_count(), 3);
        assert!(pool.active_count() <= pool.capacity());
    }

    #[test]
    fn test_release_recycles_slot() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = fire_linear(&mut pool, 0);
        assert!(pool.release(h, &mut c));
        assert_eq!(pool.active_count(), 0);
        assert!(pool.acquire().is_some());
    }

    #[test]
    fn test_double_release_is_idempotent() {
        let mut pool = ProjectilePool::new(4);
        let mut c = coord();
        let h = fire_linear(&mut pool, 0);
        assert!(pool.release(h, &mut c));
        assert!(!pool.release(h, &mut c));
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.free.len(), 1);
    }

    #[test]
    fn test_stale_handle_is_rejected_after_recycle() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let old = fire_linear(&mut pool, 0);
        pool.release(old, &mut c);
        let fresh = fire_linear(&mut pool, 0);
        assert_eq!(old.index, fresh.index);
        assert!(pool.get(old).is_none());
        assert_eq!(pool.register_hit(old, TargetId::new()), HitOutcome::Stale);
        assert!(pool.get(fresh).is_some());
    }

    #[test]
    fn test_release_frees_held_reservation() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let t = TargetId::new();
        let h = fire_linear(&mut pool, 0);
        let r = c.reserve(WeaponId(1), t, 500, 8.0);
        pool.set_reservation(h, r);
        pool.release(h, &mut c);
        assert!(c.is_empty());
    }

    #[test]
    fn test_pierce_budget_retires_flight() {
        let mut pool = ProjectilePool::new(1);
        let h = pool.acquire().unwrap();
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0);
        params.pierce = 1;
        pool.fire(h, params, 0);

        let a = TargetId::new();
        let b = TargetId::new();
        assert_eq!(pool.register_hit(h, a), HitOutcome::Hit { retire: false });
        assert_eq!(pool.register_hit(h, a), HitOutcome::AlreadyHit);
        assert_eq!(pool.register_hit(h, b), HitOutcome::Hit { retire: true });
    }

    #[test]
    fn test_refire_replaces_deadline_and_hits() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0);
        params.lifetime_ms = Some(100);
        pool.fire(h, params.clone(), 0);
        let t = TargetId::new();
        pool.register_hit(h, t);

        // re-fire at t=90 with a fresh lifetime; old deadline must not fire
        params.lifetime_ms = Some(500);
        pool.fire(h, params, 90);
        let events = pool.update(10, 100, Vec2::ZERO, &mut c);
        assert!(events.is_empty());
        assert!(!pool.get(h).unwrap().has_hit(t));

        let events = pool.update(10, 590, Vec2::ZERO, &mut c);
        assert_eq!(events, vec![PoolEvent::Expired(h)]);
    }

    #[test]
    fn test_linear_motion_advances_and_aligns_heading() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        pool.fire(
            h,
            FireParams::linear(Vec2::ZERO, Vec2::new(0.0, 1.0), 200.0),
            0,
        );
        pool.update(500, 500, Vec2::ZERO, &mut c);
        let p = pool.get(h).unwrap();
        assert!((p.position.y - 100.0).abs() < 1e-3);
        assert_eq!(p.heading, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_max_travel_auto_releases() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::new(1.0, 0.0), 100.0);
        params.max_distance = Some(50.0);
        pool.fire(h, params, 0);

        let events = pool.update(1000, 1000, Vec2::ZERO, &mut c);
        assert_eq!(events, vec![PoolEvent::MaxTravel(h)]);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_orbit_tracks_owner_and_phase() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::ZERO, 0.0);
        params.motion = Motion::Orbit {
            radius: 50.0,
            angular_velocity: std::f32::consts::PI, // half turn per second
            phase: 0.0,
            spin: SpinDirection::Clockwise,
        };
        pool.fire(h, params, 0);

        let owner = Vec2::new(100.0, 100.0);
        pool.update(1000, 1000, owner, &mut c);
        let p = pool.get(h).unwrap();
        // half a turn from phase 0: offset flips to -radius on x
        assert!((p.position.x - (owner.x - 50.0)).abs() < 0.5);
        assert!((p.position.y - owner.y).abs() < 0.5);
    }

    #[test]
    fn test_orbit_refire_preserves_phase() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        let orbit = Motion::Orbit {
            radius: 50.0,
            angular_velocity: 1.0,
            phase: 0.0,
            spin: SpinDirection::Clockwise,
        };
        let mut params = FireParams::linear(Vec2::ZERO, Vec2::ZERO, 0.0);
        params.motion = orbit.clone();
        pool.fire(h, params.clone(), 0);
        pool.update(500, 500, Vec2::ZERO, &mut c);

        pool.fire(h, params, 500);
        match &pool.get(h).unwrap().motion {
            Motion::Orbit { phase, .. } => assert!((phase - 0.5).abs() < 1e-3),
            m => panic!("unexpected motion {:?}", m),
        }
    }

    #[test]
    fn test_ballistic_lands_at_launch_height() {
        let mut pool = ProjectilePool::new(1);
        let mut c = coord();
        let h = pool.acquire().unwrap();
        let mut params = FireParams::linear(
            Vec2::new(0.0, 100.0),
            Vec2::new(0.6, -0.8), // up and forward (+y is down)
            100.0,
        );
        params.acceleration = Vec2::new(0.0, 200.0);
        params.motion = Motion::Ballistic { launch_y: 100.0 };
        pool.fire(h, params, 0);

        let mut landed = false;
        let mut now = 0;
        for _ in 0..200 {
            now += 16;
            let events = pool.update(16, now, Vec2::ZERO, &mut c);
            if events
                .iter()
                .any(|e| matches!(e, PoolEvent::BallisticLanded(_)))
            {
                landed = true;
                break;
            }
        }
        assert!(landed);
        let p = pool.get(h).unwrap();
        assert!((p.position.y - 100.0).abs() < 1e-3);
        assert!(p.position.x > 0.0);
    }

    #[test]
    fn test_release_all_clears_everything() {
        let mut pool = ProjectilePool::new(8);
        let mut c = coord();
        for _ in 0..5 {
            fire_linear(&mut pool, 0);
        }
        let t = TargetId::new();
        let handles = pool.active_handles();
        let r = c.reserve(WeaponId(3), t, 500, 4.0);
        pool.set_reservation(handles[0], r);

        pool.release_all(&mut c);
        assert_eq!(pool.active_count(), 0);
        assert!(c.is_empty());
    }
}
