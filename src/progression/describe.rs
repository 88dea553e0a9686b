//! Upgrade summaries for the level-up UI
//!
//! Diffs the accumulated specs of two levels and renders only the fields
//! that actually change. Output is deterministic: fixed path order, fixed
//! number formatting, zero deltas suppressed.

use crate::progression::level_spec::LevelTable;
use crate::progression::modifiers::{level_modifiers, Modifier, ModifierOp, StatPath};

/// One rendered line of an upgrade summary
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeLine {
    pub path: StatPath,
    pub text: String,
}

fn fmt_value(v: f32) -> String {
    // one decimal, trimmed when integral
    let rounded = (v * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{:.1}", rounded)
    }
}

fn fmt_signed(v: f32) -> String {
    if v >= 0.0 {
        format!("+{}", fmt_value(v))
    } else {
        format!("-{}", fmt_value(-v))
    }
}

fn find(mods: &[Modifier], path: StatPath, op: ModifierOp) -> Option<f32> {
    mods.iter().find(|m| m.path == path && m.op == op).map(|m| m.value)
}

/// Render the stat changes between `current` and `next` level.
///
/// Multiplies render as relative percentages ("Damage +20%"), adds as flat
/// deltas ("Pierce +1"); crit chance adds render in percentage points.
pub fn describe_level_upgrade(levels: &LevelTable, current: u32, next: u32) -> Vec<UpgradeLine> {
    let cur = level_modifiers(levels, current);
    let new = level_modifiers(levels, next);

    let mut lines = Vec::new();
    for path in StatPath::ALL {
        let add_delta = find(&new, path, ModifierOp::Add).unwrap_or(0.0)
            - find(&cur, path, ModifierOp::Add).unwrap_or(0.0);
        if add_delta != 0.0 {
            let text = if path == StatPath::CritChance {
                format!("{} {}%", path.label(), fmt_signed(add_delta * 100.0))
            } else {
                format!("{} {}", path.label(), fmt_signed(add_delta))
            };
            lines.push(UpgradeLine { path, text });
        }

        let mult_cur = find(&cur, path, ModifierOp::Multiply).unwrap_or(1.0);
        let mult_new = find(&new, path, ModifierOp::Multiply).unwrap_or(1.0);
        if mult_cur != mult_new && mult_cur != 0.0 {
            let pct = (mult_new / mult_cur - 1.0) * 100.0;
            lines.push(UpgradeLine {
                path,
                text: format!("{} {}%", path.label(), fmt_signed(pct)),
            });
        }
    }
    lines
}
