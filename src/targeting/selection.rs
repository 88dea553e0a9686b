//! Candidate scoring and target selection
//!
//! The coordinator supplies prediction primitives; this module owns the
//! policy. Scoring is an explicit linear function so it can be tuned and
//! tested in isolation:
//!
//! `score = kill_shot_bonus * lethal - overkill_penalty * already_dead
//!          - distance / range`
//!
//! where `lethal` means our expected damage finishes the target and
//! `already_dead` means the ledger predicts the target at or below zero HP
//! before our shot lands. With every candidate predicted dead, the penalty
//! term is uniform and selection degrades to raw nearest-distance, which is
//! exactly the required fallback.

use crate::combat::{TargetRegistry, TargetSnapshot};
use crate::core::config::TargetingConfig;
use crate::core::types::{TimeMs, Vec2};
use crate::targeting::coordinator::TargetingCoordinator;
use ordered_float::OrderedFloat;

/// A scored selection candidate
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub snapshot: TargetSnapshot,
    pub distance: f32,
    pub predicted_hp: f32,
    pub score: f32,
}

/// Nearest active targets within `range`, deterministically ordered by
/// (distance, id) and capped at the configured candidate pool size
pub fn candidates_in_range(
    origin: Vec2,
    range: f32,
    cfg: &TargetingConfig,
    targets: &dyn TargetRegistry,
) -> Vec<TargetSnapshot> {
    let mut in_range: Vec<(f32, TargetSnapshot)> = targets
        .active_targets()
        .into_iter()
        .filter_map(|t| {
            let d = origin.distance(&t.position);
            (d <= range).then_some((d, t))
        })
        .collect();
    in_range.sort_by_key(|(d, t)| (OrderedFloat(*d), t.id));
    in_range.truncate(cfg.candidate_pool_size);
    in_range.into_iter().map(|(_, t)| t).collect()
}

/// Score one candidate for the anti-overkill ranking
pub fn score_candidate(
    cfg: &TargetingConfig,
    distance: f32,
    range: f32,
    predicted_hp: f32,
    expected_damage: f32,
) -> f32 {
    let already_dead = predicted_hp <= 0.0;
    let lethal = !already_dead && expected_damage >= predicted_hp;
    let mut score = -distance / range.max(1.0);
    if lethal {
        score += cfg.kill_shot_bonus;
    }
    if already_dead {
        score -= cfg.overkill_penalty;
    }
    score
}

/// Pick the best target for a shot of `expected_damage` whose flight time
/// from a candidate at distance `d` is `eta_ms(d)`.
///
/// Prefers candidates the ledger does not already predict dead; when every
/// candidate is predicted dead, falls back to the nearest one.
pub fn select_target(
    origin: Vec2,
    range: f32,
    now: TimeMs,
    expected_damage: f32,
    eta_ms: impl Fn(f32) -> TimeMs,
    cfg: &TargetingConfig,
    coord: &TargetingCoordinator,
    targets: &dyn TargetRegistry,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for snapshot in candidates_in_range(origin, range, cfg, targets) {
        let distance = origin.distance(&snapshot.position);
        let impact_at = now + eta_ms(distance);
        let predicted_hp = coord.predicted_hp_at_impact(
            snapshot.id,
            snapshot.hp,
            impact_at,
            cfg.eta_tolerance_ms,
        );
        let candidate = Candidate {
            snapshot,
            distance,
            predicted_hp,
            score: score_candidate(cfg, distance, range, predicted_hp, expected_damage),
        };
        let better = match &best {
            None => true,
            Some(b) => {
                (
                    OrderedFloat(candidate.score),
                    std::cmp::Reverse(OrderedFloat(candidate.distance)),
                    std::cmp::Reverse(candidate.snapshot.id),
                ) > (
                    OrderedFloat(b.score),
                    std::cmp::Reverse(OrderedFloat(b.distance)),
                    std::cmp::Reverse(b.snapshot.id),
                )
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}
