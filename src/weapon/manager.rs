//! Weapon manager: loadout ownership and the per-tick driver
//!
//! The manager owns the definition table handle, the shared targeting
//! coordinator, every controller+pool pair, the global modifier layer and
//! the per-run rng. The scene calls `update(delta_ms, ctx)` once per
//! simulation tick and consumes the returned events.

use crate::combat::CombatContext;
use crate::core::config::TargetingConfig;
use crate::core::error::{Result, WeaponError};
use crate::core::types::{TargetId, TimeMs, WeaponId};
use crate::progression::describe::{describe_level_upgrade, UpgradeLine};
use crate::progression::modifiers::Modifier;
use crate::targeting::coordinator::TargetingCoordinator;
use crate::weapon::controller::WeaponController;
use crate::weapon::definition::DefinitionTable;
use crate::weapon::events::WeaponEvent;
use crate::weapon::instance::WeaponInstance;
use ahash::AHashSet;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{info, warn};

/// Options for `add_weapon`
#[derive(Debug, Clone, Default)]
pub struct AddWeaponOpts {
    /// Starting level; 0/1 both mean level 1 (clamped to the table's max)
    pub level: u32,
    /// Initial per-instance custom modifier layer
    pub custom_modifiers: Vec<Modifier>,
}

/// Owns the equipped loadout and drives it each tick
pub struct WeaponManager {
    table: Arc<DefinitionTable>,
    coordinator: TargetingCoordinator,
    controllers: Vec<WeaponController>,
    global_modifiers: Vec<Modifier>,
    /// None means every table key is allowed
    allowed_keys: Option<AHashSet<String>>,
    now_ms: TimeMs,
    next_weapon_id: u32,
    rng: ChaCha8Rng,
    pending_events: Vec<WeaponEvent>,
}

impl WeaponManager {
    pub fn new(table: Arc<DefinitionTable>, cfg: TargetingConfig, seed: u64) -> Self {
        Self {
            table,
            coordinator: TargetingCoordinator::new(cfg),
            controllers: Vec::new(),
            global_modifiers: Vec::new(),
            allowed_keys: None,
            now_ms: 0,
            next_weapon_id: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            pending_events: Vec::new(),
        }
    }

    /// Restrict equippable keys (loadout rules). Replaces any prior list.
    pub fn set_allowed_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_keys = Some(keys.into_iter().map(Into::into).collect());
    }

    pub fn allow_all_keys(&mut self) {
        self.allowed_keys = None;
    }

    pub fn now(&self) -> TimeMs {
        self.now_ms
    }

    pub fn coordinator(&self) -> &TargetingCoordinator {
        &self.coordinator
    }

    pub fn weapon_keys(&self) -> Vec<&str> {
        self.controllers.iter().map(|c| c.key()).collect()
    }

    pub fn level_of(&self, key: &str) -> Option<u32> {
        self.controller(key).map(|c| c.instance.level())
    }

    pub fn controller(&self, key: &str) -> Option<&WeaponController> {
        self.controllers.iter().find(|c| c.key() == key)
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.controllers.iter().position(|c| c.key() == key)
    }

    fn check_allowed(&self, key: &str) -> Result<()> {
        if let Some(allowed) = &self.allowed_keys {
            if !allowed.contains(key) {
                return Err(WeaponError::NotAllowed(key.to_string()));
            }
        }
        Ok(())
    }

    /// Equip a weapon. Rejections leave the current loadout untouched.
    pub fn add_weapon(&mut self, key: &str, opts: AddWeaponOpts) -> Result<()> {
        let definition = self
            .table
            .get(key)
            .ok_or_else(|| WeaponError::UnknownKey(key.to_string()))?;
        if self.index_of(key).is_some() {
            return Err(WeaponError::AlreadyEquipped(key.to_string()));
        }
        self.check_allowed(key)?;

        let mut instance =
            WeaponInstance::new(definition, opts.level.max(1), opts.custom_modifiers);
        instance.recompose(&self.global_modifiers);

        let id = WeaponId(self.next_weapon_id);
        self.next_weapon_id += 1;
        let controller = WeaponController::new(id, instance);
        info!(key, level = controller.instance.level(), "weapon equipped");
        self.pending_events.push(WeaponEvent::WeaponAdded {
            key: key.to_string(),
            level: controller.instance.level(),
        });
        self.controllers.push(controller);
        Ok(())
    }

    /// Unequip a weapon, force-releasing its flights and reservations
    pub fn remove_weapon(&mut self, key: &str) -> Result<()> {
        let index = self
            .index_of(key)
            .ok_or_else(|| WeaponError::NotEquipped(key.to_string()))?;
        let mut controller = self.controllers.remove(index);
        controller.teardown(&mut self.coordinator);
        info!(key, "weapon removed");
        self.pending_events
            .push(WeaponEvent::WeaponRemoved { key: key.to_string() });
        Ok(())
    }

    /// Diff the loadout against `keys`: remove extras, add missing.
    ///
    /// Duplicates are collapsed. Every key is validated before anything
    /// changes, so a rejected key leaves the prior loadout untouched.
    /// Idempotent on an unchanged set.
    pub fn set_loadout(&mut self, keys: &[&str]) -> Result<()> {
        let mut wanted: Vec<&str> = Vec::new();
        for &key in keys {
            if !wanted.contains(&key) {
                wanted.push(key);
            }
        }
        for key in &wanted {
            if !self.table.contains(key) {
                return Err(WeaponError::UnknownKey(key.to_string()));
            }
            self.check_allowed(key)?;
        }

        let current: Vec<String> =
            self.controllers.iter().map(|c| c.key().to_string()).collect();
        for key in &current {
            if !wanted.iter().any(|w| *w == key.as_str()) {
                self.remove_weapon(key)?;
            }
        }
        for key in wanted {
            if self.index_of(key).is_none() {
                self.add_weapon(key, AddWeaponOpts::default())?;
            }
        }
        Ok(())
    }

    /// Raise a weapon's level by one (clamped) and recompose its config
    pub fn upgrade_weapon(&mut self, key: &str) -> Result<u32> {
        let index = self
            .index_of(key)
            .ok_or_else(|| WeaponError::NotEquipped(key.to_string()))?;
        let controller = &mut self.controllers[index];
        let level = controller.instance.raise_level();
        controller.instance.recompose(&self.global_modifiers);
        self.pending_events.push(WeaponEvent::WeaponUpgraded {
            key: key.to_string(),
            level,
        });
        Ok(level)
    }

    /// Summary of the stat changes the next level would bring
    pub fn describe_upgrade(&self, key: &str) -> Result<Vec<UpgradeLine>> {
        let controller = self
            .controller(key)
            .ok_or_else(|| WeaponError::NotEquipped(key.to_string()))?;
        let level = controller.instance.level();
        let next = (level + 1).min(controller.instance.definition.max_level());
        Ok(describe_level_upgrade(
            &controller.instance.definition.levels,
            level,
            next,
        ))
    }

    /// Append a modifier applied to every current and future weapon
    pub fn apply_global_modifier(&mut self, modifier: Modifier) {
        self.global_modifiers.push(modifier);
        for controller in &mut self.controllers {
            controller.instance.recompose(&self.global_modifiers);
        }
    }

    /// Replace one weapon's custom modifier layer
    pub fn set_modifiers_for_weapon(&mut self, key: &str, modifiers: Vec<Modifier>) -> Result<()> {
        let index = self
            .index_of(key)
            .ok_or_else(|| WeaponError::NotEquipped(key.to_string()))?;
        let controller = &mut self.controllers[index];
        controller.instance.custom_modifiers = modifiers;
        controller.instance.recompose(&self.global_modifiers);
        Ok(())
    }

    /// Drop all predictions against a dead target
    pub fn clear_for_enemy(&mut self, target: TargetId) {
        self.coordinator.clear_for_enemy(target);
    }

    /// Advance the whole engine one simulation tick.
    ///
    /// The internal clock accumulates externally supplied deltas only;
    /// not calling (or a zero delta) freezes every timer uniformly.
    pub fn update(&mut self, delta_ms: TimeMs, ctx: &mut CombatContext) -> Vec<WeaponEvent> {
        self.now_ms += delta_ms;
        let now = self.now_ms;
        let mut events = std::mem::take(&mut self.pending_events);

        self.coordinator.prune(now, ctx.targets);
        for controller in &mut self.controllers {
            controller.update(
                delta_ms,
                now,
                ctx,
                &mut self.coordinator,
                &mut self.rng,
                &mut events,
            );
        }
        events
    }

    /// Tear down every weapon, leaving no reservations or pooled flights
    pub fn destroy(&mut self) {
        for controller in &mut self.controllers {
            controller.teardown(&mut self.coordinator);
            self.pending_events.push(WeaponEvent::WeaponRemoved {
                key: controller.key().to_string(),
            });
        }
        self.controllers.clear();
        if !self.coordinator.is_empty() {
            warn!(left = self.coordinator.len(), "reservations survived destroy");
        }
    }
}
