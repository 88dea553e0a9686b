//! Per-weapon firing controller
//!
//! Owns the weapon's projectile pool and drives the idle -> warmup ->
//! firing -> cooldown cycle. Archetype routines are dispatched by an
//! exhaustive match so every declared kind has a firing path.
//!
//! Cadence pause rule: for target-dependent modes the cooldown and warmup
//! budgets only tick down while a valid target is in range; self/facing
//! modes always advance.

use crate::combat::damage::roll_damage;
use crate::combat::{CombatContext, TargetSnapshot};
use crate::core::types::{TargetId, TimeMs, Vec2, WeaponId};
use crate::projectile::{
    ExplosionSpec, FireParams, HitOutcome, Motion, PoolEvent, ProjectileHandle, ProjectilePool,
    SpinDirection,
};
use crate::targeting::coordinator::TargetingCoordinator;
use crate::targeting::selection::{candidates_in_range, select_target};
use crate::weapon::archetype::{ArchetypeSpec, StrikeTiming, TargetingMode};
use crate::weapon::events::{SkipReason, WeaponEvent};
use crate::weapon::instance::WeaponInstance;
use ordered_float::OrderedFloat;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Controller firing phase
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Idle,
    Warmup { remaining_ms: f32 },
    Firing,
    Cooldown { remaining_ms: f32 },
}

/// A staggered sub-shot queued within one activation
#[derive(Debug, Clone, Copy)]
struct PendingShot {
    due_at: TimeMs,
    angle_rad: f32,
}

/// Resolved aim for one activation
struct Aim {
    direction: Vec2,
    target: Option<TargetSnapshot>,
}

/// One equipped weapon's firing state machine plus its private pool
#[derive(Debug)]
pub struct WeaponController {
    id: WeaponId,
    pub instance: WeaponInstance,
    pool: ProjectilePool,
    phase: Phase,
    pending_shots: Vec<PendingShot>,
    orbiters: Vec<ProjectileHandle>,
}

impl WeaponController {
    pub fn new(id: WeaponId, instance: WeaponInstance) -> Self {
        let pool = ProjectilePool::new(instance.definition.pool_capacity);
        Self {
            id,
            instance,
            pool,
            phase: Phase::Idle,
            pending_shots: Vec::new(),
            orbiters: Vec::new(),
        }
    }

    pub fn id(&self) -> WeaponId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.instance.definition.key
    }

    pub fn pool(&self) -> &ProjectilePool {
        &self.pool
    }

    /// Force-release every flight and reservation owned by this weapon
    pub fn teardown(&mut self, coord: &mut TargetingCoordinator) {
        self.pool.release_all(coord);
        coord.release_by_weapon(self.id);
        self.orbiters.clear();
        self.pending_shots.clear();
        self.phase = Phase::Idle;
    }

    /// Advance one simulation tick
    pub fn update(
        &mut self,
        delta_ms: TimeMs,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let pool_events = self.pool.update(delta_ms, now, ctx.owner.position(), coord);
        for ev in pool_events {
            self.handle_pool_event(ev, now, ctx, coord, rng, events);
        }

        self.detect_contacts(now, ctx, coord, rng, events);

        let def = self.instance.definition.clone();
        let timers_advance = !def.targeting.requires_target()
            || !candidates_in_range(ctx.owner.position(), def.range, coord.config(), ctx.targets)
                .is_empty();

        match self.phase {
            Phase::Cooldown { remaining_ms } => {
                if timers_advance {
                    let left = remaining_ms - delta_ms as f32;
                    self.phase = if left <= 0.0 {
                        Phase::Idle
                    } else {
                        Phase::Cooldown { remaining_ms: left }
                    };
                }
            }
            Phase::Idle => {
                if timers_advance {
                    let warmup = self.instance.resolved().warmup_ms;
                    if warmup > 0.0 {
                        self.phase = Phase::Warmup { remaining_ms: warmup };
                    } else {
                        self.begin_firing(now, ctx, coord, rng, events);
                    }
                }
            }
            Phase::Warmup { remaining_ms } => {
                if timers_advance {
                    let left = remaining_ms - delta_ms as f32;
                    if left <= 0.0 {
                        self.begin_firing(now, ctx, coord, rng, events);
                    } else {
                        self.phase = Phase::Warmup { remaining_ms: left };
                    }
                }
            }
            Phase::Firing => {}
        }

        if self.phase == Phase::Firing {
            self.spawn_due_pending(now, ctx, rng, events);
            if self.pending_shots.is_empty() {
                events.push(WeaponEvent::FireEnded { key: self.key().to_string() });
                self.phase = Phase::Cooldown {
                    remaining_ms: self.instance.resolved().delay_ms,
                };
            }
        }
    }

    fn begin_firing(
        &mut self,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        if !ctx.owner.can_fire() {
            events.push(WeaponEvent::FireSkipped {
                key: self.key().to_string(),
                reason: SkipReason::OwnerGated,
            });
            self.phase = Phase::Idle;
            return;
        }
        if self.fire_activation(now, ctx, coord, rng, events) {
            if self.pending_shots.is_empty() {
                events.push(WeaponEvent::FireEnded { key: self.key().to_string() });
                self.phase = Phase::Cooldown {
                    remaining_ms: self.instance.resolved().delay_ms,
                };
            } else {
                self.phase = Phase::Firing;
            }
        } else {
            // target vanished between the range check and the shot
            self.phase = Phase::Idle;
        }
    }

    /// Flight time estimate to a target at `distance`, for reservations
    fn eta_ms(&self, distance: f32) -> TimeMs {
        let cfg = self.instance.resolved();
        match &self.instance.definition.archetype {
            ArchetypeSpec::Ballistic { launch_angle_deg, launch_speed, gravity } => {
                let t = 2.0 * launch_speed * launch_angle_deg.to_radians().sin() / gravity;
                (t * 1000.0) as TimeMs
            }
            ArchetypeSpec::Strike { impact_delay_ms, .. } => *impact_delay_ms,
            ArchetypeSpec::Slash { hit_delay_ms, .. } => *hit_delay_ms,
            ArchetypeSpec::ChainThrow { per_hop_duration_ms, .. } => *per_hop_duration_ms,
            ArchetypeSpec::Chain { .. } => 0,
            _ => {
                if cfg.speed > 0.0 {
                    (distance / cfg.speed * 1000.0) as TimeMs
                } else {
                    0
                }
            }
        }
    }

    fn acquire_aim(
        &self,
        now: TimeMs,
        ctx: &CombatContext,
        coord: &TargetingCoordinator,
    ) -> Option<Aim> {
        let def = &self.instance.definition;
        let owner_pos = ctx.owner.position();
        match def.targeting {
            TargetingMode::Nearest => {
                let candidate = select_target(
                    owner_pos,
                    def.range,
                    now,
                    self.instance.resolved().damage_base,
                    |d| self.eta_ms(d),
                    coord.config(),
                    coord,
                    ctx.targets,
                )?;
                let dir = (candidate.snapshot.position - owner_pos).normalize();
                Some(Aim {
                    direction: if dir == Vec2::ZERO { Vec2::new(1.0, 0.0) } else { dir },
                    target: Some(candidate.snapshot),
                })
            }
            TargetingMode::SelfAnchored | TargetingMode::Facing => {
                let dir = ctx.owner.facing_direction().normalize();
                Some(Aim {
                    direction: if dir == Vec2::ZERO { Vec2::new(1.0, 0.0) } else { dir },
                    target: None,
                })
            }
        }
    }

    /// Execute one firing activation. Returns false when a required target
    /// disappeared; the cadence is not consumed in that case.
    fn fire_activation(
        &mut self,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let archetype = self.instance.definition.archetype.clone();
        match archetype {
            ArchetypeSpec::Projectile { .. } => {
                self.fire_straight_salvo(now, ctx, coord, rng, events)
            }
            ArchetypeSpec::Slash { hit_delay_ms, .. } => {
                self.fire_slash(hit_delay_ms, now, ctx, rng, events)
            }
            ArchetypeSpec::Chain { hop_range, falloff_per_hop, .. } => {
                self.fire_chain(hop_range, falloff_per_hop, now, ctx, coord, rng, events)
            }
            ArchetypeSpec::ChainThrow { per_hop_duration_ms, .. } => {
                self.fire_chain_throw(per_hop_duration_ms, now, ctx, coord, rng, events)
            }
            ArchetypeSpec::Cluster { stagger_ms, angles_deg, .. } => {
                self.fire_cluster(stagger_ms, &angles_deg, now, ctx, rng, events)
            }
            ArchetypeSpec::Ballistic { launch_angle_deg, launch_speed, gravity } => self
                .fire_ballistic(
                    launch_angle_deg,
                    launch_speed,
                    gravity,
                    now,
                    ctx,
                    coord,
                    rng,
                    events,
                ),
            ArchetypeSpec::Bazooka { detonate_seconds, .. } => {
                self.fire_bazooka(detonate_seconds, now, ctx, coord, rng, events)
            }
            ArchetypeSpec::Circular { radius, angular_velocity_deg, spin, .. } => {
                self.fire_circular(radius, angular_velocity_deg, spin, now, ctx, rng, events)
            }
            ArchetypeSpec::Cross { step_px_per_frame } => {
                self.fire_cross(step_px_per_frame, now, ctx, rng, events)
            }
            ArchetypeSpec::Strike { impact_delay_ms, timing, .. } => {
                self.fire_strike(impact_delay_ms, timing, now, ctx, coord, rng, events)
            }
        }
    }

    fn push_fire_started(&self, position: Vec2, events: &mut Vec<WeaponEvent>) {
        events.push(WeaponEvent::FireStarted {
            key: self.key().to_string(),
            position,
        });
    }

    fn push_skip(&self, reason: SkipReason, events: &mut Vec<WeaponEvent>) {
        debug!(key = self.key(), ?reason, "fire attempt dropped");
        events.push(WeaponEvent::FireSkipped {
            key: self.key().to_string(),
            reason,
        });
    }

    fn expiry_explosion(&self) -> Option<ExplosionSpec> {
        let cfg = self.instance.resolved();
        (cfg.aoe_radius > 0.0).then(|| ExplosionSpec {
            radius: cfg.aoe_radius,
            damage_mult: cfg.aoe_damage_mult,
        })
    }

    fn fire_straight_salvo(
        &mut self,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let spread = cfg.spread_deg.to_radians();
        for i in 0..cfg.salvo {
            let offset = if cfg.salvo > 1 && spread > 0.0 {
                -spread / 2.0 + spread * i as f32 / (cfg.salvo - 1) as f32
            } else {
                0.0
            };
            let Some(handle) = self.pool.acquire() else {
                self.push_skip(SkipReason::PoolExhausted, events);
                break;
            };
            let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
            let damage = match &aim.target {
                Some(t) => ctx.damage.resolve(roll.amount, t.id),
                None => roll.amount,
            };
            let mut params =
                FireParams::linear(owner_pos, aim.direction.rotated(offset), cfg.speed);
            params.lifetime_ms = Some(cfg.lifetime_ms as TimeMs);
            params.pierce = cfg.pierce;
            params.damage = damage;
            params.crit = roll.crit;
            params.max_distance = cfg.max_distance;
            params.explode_on_expiry = self.expiry_explosion();
            self.pool.fire(handle, params, now);

            if let Some(t) = &aim.target {
                let eta = self.eta_ms(owner_pos.distance(&t.position));
                let r = coord.reserve(self.id, t.id, now + eta, damage);
                self.pool.set_reservation(handle, r);
            }
        }
        true
    }

    fn fire_slash(
        &mut self,
        hit_delay_ms: u64,
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return true;
        };
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let mut params = FireParams::linear(owner_pos, Vec2::ZERO, 0.0);
        params.motion = Motion::Anchored;
        params.lifetime_ms = Some(hit_delay_ms);
        params.damage = roll.amount;
        params.crit = roll.crit;
        params.explode_on_expiry = Some(ExplosionSpec {
            radius: cfg.aoe_radius,
            damage_mult: cfg.aoe_damage_mult,
        });
        self.pool.fire(handle, params, now);
        true
    }

    fn fire_chain(
        &mut self,
        hop_range: f32,
        falloff_per_hop: f32,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let Some(first) = aim.target else {
            return false;
        };
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let mut visited: Vec<TargetId> = Vec::new();
        let mut current = first;
        let mut mult = 1.0;

        // max_hops enemies total per activation, no repeats
        for _ in 0..cfg.hops.max(1) {
            let effective = ctx.damage.deal(roll.amount * mult, current.id);
            events.push(WeaponEvent::Impact {
                key: self.key().to_string(),
                target: current.id,
                damage: effective,
                crit: roll.crit,
            });
            visited.push(current.id);
            mult *= 1.0 - falloff_per_hop;

            let next = nearest_excluding(current.position, hop_range, &visited, ctx);
            match next {
                Some(snapshot) => current = snapshot,
                None => break,
            }
        }
        true
    }

    fn fire_chain_throw(
        &mut self,
        per_hop_duration_ms: u64,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let Some(first) = aim.target else {
            return false;
        };
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return true;
        };
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let mut params = FireParams::linear(owner_pos, Vec2::ZERO, 0.0);
        params.motion = Motion::Hop {
            from: owner_pos,
            to: first.position,
            target: first.id,
            elapsed_ms: 0.0,
            duration_ms: per_hop_duration_ms as f32,
            hop_index: 0,
        };
        params.lifetime_ms = Some(cfg.lifetime_ms as TimeMs);
        params.pierce = u32::MAX;
        params.damage = roll.amount;
        params.crit = roll.crit;
        self.pool.fire(handle, params, now);

        let reserved = ctx.damage.resolve(roll.amount, first.id);
        let r = coord.reserve(self.id, first.id, now + per_hop_duration_ms, reserved);
        self.pool.set_reservation(handle, r);
        true
    }

    fn fire_cluster(
        &mut self,
        stagger_ms: u64,
        angles_deg: &[f32],
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let owner_pos = ctx.owner.position();
        let count = if angles_deg.is_empty() {
            self.instance.resolved().salvo
        } else {
            angles_deg.len() as u32
        };
        self.push_fire_started(owner_pos, events);

        for i in 0..count {
            let angle = match angles_deg.get(i as usize) {
                Some(deg) => deg.to_radians(),
                None => i as f32 * std::f32::consts::TAU / count as f32,
            };
            let due_at = now + i as u64 * stagger_ms;
            if due_at <= now {
                self.spawn_sub_shot(angle, now, ctx, rng, events);
            } else {
                self.pending_shots.push(PendingShot { due_at, angle_rad: angle });
            }
        }
        true
    }

    fn spawn_due_pending(
        &mut self,
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let due: Vec<PendingShot> = {
            let (ready, waiting): (Vec<_>, Vec<_>) =
                self.pending_shots.drain(..).partition(|p| p.due_at <= now);
            self.pending_shots = waiting;
            ready
        };
        for shot in due {
            self.spawn_sub_shot(shot.angle_rad, now, ctx, rng, events);
        }
    }

    /// Undirected straight sub-shot at an absolute angle (cluster rings)
    fn spawn_sub_shot(
        &mut self,
        angle_rad: f32,
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let origin = ctx.owner.position();
        self.spawn_sub_shot_at(origin, angle_rad, self.expiry_explosion(), now, rng, events);
    }

    fn spawn_sub_shot_at(
        &mut self,
        origin: Vec2,
        angle_rad: f32,
        explosion: Option<ExplosionSpec>,
        now: TimeMs,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let cfg = self.instance.resolved().clone();
        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return;
        };
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let mut params = FireParams::linear(origin, Vec2::from_angle(angle_rad), cfg.speed);
        params.lifetime_ms = Some(cfg.lifetime_ms as TimeMs);
        params.pierce = cfg.pierce;
        params.damage = roll.amount;
        params.crit = roll.crit;
        params.max_distance = cfg.max_distance;
        params.explode_on_expiry = explosion;
        self.pool.fire(handle, params, now);
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_ballistic(
        &mut self,
        launch_angle_deg: f32,
        launch_speed: f32,
        gravity: f32,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return true;
        };
        let angle = launch_angle_deg.to_radians();
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let damage = match &aim.target {
            Some(t) => ctx.damage.resolve(roll.amount, t.id),
            None => roll.amount,
        };
        // horizontal component along the aim, vertical up (-y), gravity down
        let mut params = FireParams::linear(owner_pos, aim.direction, 0.0);
        params.motion = Motion::Ballistic { launch_y: owner_pos.y };
        params.acceleration = Vec2::new(0.0, gravity);
        params.lifetime_ms = Some(cfg.lifetime_ms as TimeMs);
        params.damage = damage;
        params.crit = roll.crit;
        params.explode_on_expiry = self.expiry_explosion();
        self.pool.fire(handle, params, now);
        if let Some(p) = self.pool.get_mut(handle) {
            p.velocity = aim.direction * (angle.cos() * launch_speed)
                + Vec2::new(0.0, -angle.sin() * launch_speed);
        }

        if let Some(t) = &aim.target {
            let eta = self.eta_ms(owner_pos.distance(&t.position));
            let r = coord.reserve(self.id, t.id, now + eta, damage);
            self.pool.set_reservation(handle, r);
        }
        true
    }

    fn fire_bazooka(
        &mut self,
        detonate_seconds: f32,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return true;
        };
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let damage = match &aim.target {
            Some(t) => ctx.damage.resolve(roll.amount, t.id),
            None => roll.amount,
        };
        let fuse_ms = (detonate_seconds * 1000.0) as TimeMs;
        let mut params = FireParams::linear(owner_pos, aim.direction, cfg.speed);
        params.lifetime_ms = Some(fuse_ms.min(cfg.lifetime_ms as TimeMs));
        params.pierce = 0;
        params.damage = damage;
        params.crit = roll.crit;
        params.explode_on_expiry = self.expiry_explosion();
        self.pool.fire(handle, params, now);

        if let Some(t) = &aim.target {
            let eta = self.eta_ms(owner_pos.distance(&t.position)).min(fuse_ms);
            let r = coord.reserve(self.id, t.id, now + eta, damage);
            self.pool.set_reservation(handle, r);
        }
        true
    }

    fn fire_circular(
        &mut self,
        radius: f32,
        angular_velocity_deg: f32,
        spin: SpinDirection,
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        self.push_fire_started(owner_pos, events);

        // drop handles invalidated by a teardown or external release
        self.orbiters.retain(|h| self.pool.get(*h).is_some());

        let count = cfg.orbit_count.max(1);
        while self.orbiters.len() < count as usize {
            match self.pool.acquire() {
                Some(h) => self.orbiters.push(h),
                None => {
                    self.push_skip(SkipReason::PoolExhausted, events);
                    break;
                }
            }
        }

        // re-firing resets each orbiter's hit-set for the new activation
        // window while the pool preserves its phase
        let orbiters = self.orbiters.clone();
        let n = orbiters.len().max(1);
        for (i, handle) in orbiters.into_iter().enumerate() {
            let phase = i as f32 * std::f32::consts::TAU / n as f32;
            let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
            let mut params = FireParams::linear(
                owner_pos + Vec2::from_angle(phase) * radius,
                Vec2::ZERO,
                0.0,
            );
            params.motion = Motion::Orbit {
                radius,
                angular_velocity: angular_velocity_deg.to_radians(),
                phase,
                spin,
            };
            params.lifetime_ms = None;
            params.pierce = u32::MAX;
            params.damage = roll.amount;
            params.crit = roll.crit;
            self.pool.fire(handle, params, now);
        }
        true
    }

    fn fire_cross(
        &mut self,
        step_px_per_frame: f32,
        now: TimeMs,
        ctx: &mut CombatContext,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let owner_pos = ctx.owner.position();
        let cfg = self.instance.resolved().clone();
        let range = self.instance.definition.range;
        self.push_fire_started(owner_pos, events);

        let arms = [
            Vec2::new(1.0, 0.0),
            Vec2::new(-1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(0.0, -1.0),
        ];
        for dir in arms {
            let Some(handle) = self.pool.acquire() else {
                self.push_skip(SkipReason::PoolExhausted, events);
                break;
            };
            let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
            let mut params = FireParams::linear(owner_pos, dir, 0.0);
            params.motion = Motion::CrossArm {
                origin: owner_pos,
                dir,
                extent: 0.0,
                step_per_tick: step_px_per_frame,
            };
            params.max_distance = Some(range);
            params.pierce = u32::MAX;
            params.damage = roll.amount;
            params.crit = roll.crit;
            self.pool.fire(handle, params, now);
        }
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn fire_strike(
        &mut self,
        impact_delay_ms: u64,
        timing: StrikeTiming,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) -> bool {
        let Some(aim) = self.acquire_aim(now, ctx, coord) else {
            return false;
        };
        let Some(target) = aim.target else {
            return false;
        };
        let cfg = self.instance.resolved().clone();
        if timing == StrikeTiming::Impact {
            self.push_fire_started(target.position, events);
        }

        let Some(handle) = self.pool.acquire() else {
            self.push_skip(SkipReason::PoolExhausted, events);
            return true;
        };
        let roll = roll_damage(cfg.damage_base, cfg.crit, rng);
        let damage = ctx.damage.resolve(roll.amount, target.id);
        let mut params = FireParams::linear(target.position, Vec2::ZERO, 0.0);
        params.motion = Motion::Anchored;
        params.lifetime_ms = Some(impact_delay_ms);
        params.damage = damage;
        params.crit = roll.crit;
        params.explode_on_expiry = Some(ExplosionSpec {
            radius: cfg.aoe_radius,
            damage_mult: cfg.aoe_damage_mult,
        });
        self.pool.fire(handle, params, now);

        let r = coord.reserve(self.id, target.id, now + impact_delay_ms, damage);
        self.pool.set_reservation(handle, r);
        true
    }

    fn handle_pool_event(
        &mut self,
        event: PoolEvent,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        match event {
            PoolEvent::Expired(handle) => {
                let Some(slot) = self.pool.get(handle) else {
                    return;
                };
                let position = slot.position;
                let damage = slot.damage;
                let crit = slot.crit;
                let explosion = slot.explode_on_expiry;

                if let ArchetypeSpec::Strike { timing: StrikeTiming::Animation, .. } =
                    self.instance.definition.archetype
                {
                    self.push_fire_started(position, events);
                }
                if let Some(r) = self.pool.take_reservation(handle) {
                    coord.consume_reservation(r);
                }
                if let Some(ex) = explosion {
                    self.apply_explosion(position, damage, crit, ex, ctx, events);
                    // only the shell itself detonates; its secondaries
                    // carry no explosion payload and never cascade
                    if matches!(
                        self.instance.definition.archetype,
                        ArchetypeSpec::Bazooka { .. }
                    ) {
                        self.spawn_detonation_cluster(position, now, rng, events);
                    }
                }
                self.pool.release(handle, coord);
            }
            PoolEvent::MaxTravel(_) => {}
            PoolEvent::HopArrived(handle) => {
                self.handle_hop_arrival(handle, ctx, coord, events);
            }
            PoolEvent::BallisticLanded(handle) => {
                let Some(slot) = self.pool.get(handle) else {
                    return;
                };
                let position = slot.position;
                let damage = slot.damage;
                let crit = slot.crit;
                if let Some(ex) = slot.explode_on_expiry {
                    self.apply_explosion(position, damage, crit, ex, ctx, events);
                }
                self.pool.release(handle, coord);
            }
        }
    }

    /// Secondary ring spawned by a bazooka detonation
    fn spawn_detonation_cluster(
        &mut self,
        position: Vec2,
        now: TimeMs,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let count = self.instance.resolved().salvo.max(1);
        for i in 0..count {
            let angle = i as f32 * std::f32::consts::TAU / count as f32;
            self.spawn_sub_shot_at(position, angle, None, now, rng, events);
        }
    }

    fn handle_hop_arrival(
        &mut self,
        handle: ProjectileHandle,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        events: &mut Vec<WeaponEvent>,
    ) {
        let ArchetypeSpec::ChainThrow { hop_range, falloff_per_hop, per_hop_duration_ms, .. } =
            self.instance.definition.archetype
        else {
            debug!(key = self.key(), "hop arrival on non-chain flight ignored");
            return;
        };
        let Some(slot) = self.pool.get(handle) else {
            return;
        };
        let Motion::Hop { target, hop_index, .. } = slot.motion else {
            return;
        };
        let position = slot.position;
        let damage = slot.damage;
        let crit = slot.crit;

        if let Some(r) = self.pool.take_reservation(handle) {
            coord.consume_reservation(r);
        }

        self.pool.register_hit(handle, target);
        if ctx.targets.is_active(target) {
            let mult = (1.0 - falloff_per_hop).powi(hop_index as i32);
            let effective = ctx.damage.deal(damage * mult, target);
            events.push(WeaponEvent::Impact {
                key: self.key().to_string(),
                target,
                damage: effective,
                crit,
            });
        }

        let hops_total = self.instance.resolved().hops.max(1);
        if hop_index + 1 >= hops_total {
            self.pool.release(handle, coord);
            return;
        }

        let next = {
            let slot = match self.pool.get(handle) {
                Some(s) => s,
                None => return,
            };
            let mut candidates: Vec<TargetSnapshot> = ctx
                .targets
                .active_targets()
                .into_iter()
                .filter(|t| {
                    !slot.has_hit(t.id) && position.distance(&t.position) <= hop_range
                })
                .collect();
            candidates
                .sort_by_key(|t| (OrderedFloat(position.distance(&t.position)), t.id));
            candidates.first().copied()
        };

        match next {
            Some(snapshot) => {
                if let Some(slot) = self.pool.get_mut(handle) {
                    slot.motion = Motion::Hop {
                        from: position,
                        to: snapshot.position,
                        target: snapshot.id,
                        elapsed_ms: 0.0,
                        duration_ms: per_hop_duration_ms as f32,
                        hop_index: hop_index + 1,
                    };
                }
            }
            None => {
                self.pool.release(handle, coord);
            }
        }
    }

    /// Contact detection for moving flights
    fn detect_contacts(
        &mut self,
        now: TimeMs,
        ctx: &mut CombatContext,
        coord: &mut TargetingCoordinator,
        rng: &mut ChaCha8Rng,
        events: &mut Vec<WeaponEvent>,
    ) {
        let hit_radius = self.instance.resolved().hit_radius;
        let is_bazooka =
            matches!(self.instance.definition.archetype, ArchetypeSpec::Bazooka { .. });

        for handle in self.pool.active_handles() {
            let Some(slot) = self.pool.get(handle) else {
                continue;
            };
            // hops damage on arrival, anchored effects on expiry
            if matches!(slot.motion, Motion::Hop { .. } | Motion::Anchored) {
                continue;
            }
            let position = slot.position;
            let damage = slot.damage;
            let crit = slot.crit;

            let mut contacts: Vec<TargetSnapshot> = ctx
                .targets
                .active_targets()
                .into_iter()
                .filter(|t| {
                    position.distance(&t.position) <= hit_radius + t.radius
                        && !self.pool.get(handle).map_or(true, |s| s.has_hit(t.id))
                })
                .collect();
            contacts.sort_by_key(|t| (OrderedFloat(position.distance(&t.position)), t.id));

            for target in contacts {
                match self.pool.register_hit(handle, target.id) {
                    HitOutcome::Hit { retire } => {
                        if let Some(r) = self.pool.take_reservation(handle) {
                            coord.consume_reservation(r);
                        }
                        let effective = ctx.damage.deal(damage, target.id);
                        events.push(WeaponEvent::Impact {
                            key: self.key().to_string(),
                            target: target.id,
                            damage: effective,
                            crit,
                        });
                        if retire {
                            let shell_payload =
                                self.pool.get(handle).and_then(|s| s.explode_on_expiry);
                            if is_bazooka {
                                if let Some(ex) = shell_payload {
                                    self.apply_explosion(position, damage, crit, ex, ctx, events);
                                    self.spawn_detonation_cluster(position, now, rng, events);
                                }
                            }
                            self.pool.release(handle, coord);
                            break;
                        }
                    }
                    HitOutcome::AlreadyHit | HitOutcome::Stale => {}
                }
            }
        }
    }

    /// Area damage applied at a point, deterministic target order
    fn apply_explosion(
        &self,
        position: Vec2,
        damage: f32,
        crit: bool,
        explosion: ExplosionSpec,
        ctx: &mut CombatContext,
        events: &mut Vec<WeaponEvent>,
    ) {
        let mut affected: Vec<TargetSnapshot> = ctx
            .targets
            .active_targets()
            .into_iter()
            .filter(|t| position.distance(&t.position) <= explosion.radius + t.radius)
            .collect();
        affected.sort_by_key(|t| (OrderedFloat(position.distance(&t.position)), t.id));

        for target in affected {
            let effective = ctx.damage.deal(damage * explosion.damage_mult, target.id);
            events.push(WeaponEvent::Impact {
                key: self.key().to_string(),
                target: target.id,
                damage: effective,
                crit,
            });
        }
    }
}

/// Nearest active target to `origin` within `range`, excluding `visited`
fn nearest_excluding(
    origin: Vec2,
    range: f32,
    visited: &[TargetId],
    ctx: &CombatContext,
) -> Option<TargetSnapshot> {
    let mut candidates: Vec<TargetSnapshot> = ctx
        .targets
        .active_targets()
        .into_iter()
        .filter(|t| !visited.contains(&t.id) && origin.distance(&t.position) <= range)
        .collect();
    candidates.sort_by_key(|t| (OrderedFloat(origin.distance(&t.position)), t.id));
    candidates.first().copied()
}
