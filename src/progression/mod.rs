//! Stat modifier pipeline driven by the upgrade-level system

pub mod describe;
pub mod level_spec;
pub mod modifiers;

pub use describe::{describe_level_upgrade, UpgradeLine};
pub use level_spec::{accumulate_level_spec, LevelDelta, LevelTable};
pub use modifiers::{apply_to, level_modifiers, Modifier, ModifierOp, StatPath};
