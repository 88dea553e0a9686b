//! Per-equip weapon state: level and layered modifiers
//!
//! Four layers compose in a fixed order - base, instance-custom,
//! level-derived, global - and the result is cached as a resolved config
//! until the next recompose.

use crate::progression::modifiers::{level_modifiers, Modifier};
use crate::weapon::definition::{resolve_config, ResolvedConfig, WeaponDefinition};
use std::sync::Arc;

/// One equipped weapon's mutable state
#[derive(Debug, Clone)]
pub struct WeaponInstance {
    pub definition: Arc<WeaponDefinition>,
    level: u32,
    /// Definition-supplied layer (usually empty; base stats live in the
    /// definition itself)
    pub base_modifiers: Vec<Modifier>,
    /// Per-instance custom layer, replaced wholesale by the manager
    pub custom_modifiers: Vec<Modifier>,
    /// Derived from the level delta table; recomputed on upgrade
    level_modifiers: Vec<Modifier>,
    resolved: ResolvedConfig,
}

impl WeaponInstance {
    pub fn new(definition: Arc<WeaponDefinition>, level: u32, custom: Vec<Modifier>) -> Self {
        let level = level.clamp(1, definition.max_level());
        let level_mods = level_modifiers(&definition.levels, level);
        let resolved = resolve_config(&definition, &[]);
        let mut instance = Self {
            definition,
            level,
            base_modifiers: Vec::new(),
            custom_modifiers: custom,
            level_modifiers: level_mods,
            resolved,
        };
        instance.recompose(&[]);
        instance
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// Raise the level by one (clamped). Returns the new level.
    pub fn raise_level(&mut self) -> u32 {
        self.level = (self.level + 1).min(self.definition.max_level());
        self.level_modifiers = level_modifiers(&self.definition.levels, self.level);
        self.level
    }

    /// The full composed list: base + custom + level + global
    pub fn composed(&self, global: &[Modifier]) -> Vec<Modifier> {
        let mut all = Vec::with_capacity(
            self.base_modifiers.len()
                + self.custom_modifiers.len()
                + self.level_modifiers.len()
                + global.len(),
        );
        all.extend_from_slice(&self.base_modifiers);
        all.extend_from_slice(&self.custom_modifiers);
        all.extend_from_slice(&self.level_modifiers);
        all.extend_from_slice(global);
        all
    }

    /// Recompute the cached resolved config under the given global layer
    pub fn recompose(&mut self, global: &[Modifier]) {
        let composed = self.composed(global);
        self.resolved = resolve_config(&self.definition, &composed);
    }
}
