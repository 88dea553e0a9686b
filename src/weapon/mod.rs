//! Weapon definitions, controllers and the owning manager

pub mod archetype;
pub mod controller;
pub mod definition;
pub mod events;
pub mod instance;
pub mod manager;

pub use archetype::{ArchetypeSpec, StrikeTiming, TargetingMode};
pub use controller::WeaponController;
pub use definition::{
    resolve_config, AoeSpec, CadenceSpec, DefinitionTable, ProjectileSpec, ResolvedConfig,
    WeaponDefinition,
};
pub use events::{SkipReason, WeaponEvent};
pub use instance::WeaponInstance;
pub use manager::{AddWeaponOpts, WeaponManager};
