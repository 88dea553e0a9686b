//! Pooled projectile lifecycles and scripted motion

pub mod motion;
pub mod pool;

pub use motion::{ExplosionSpec, FireParams, Motion, SpinDirection};
pub use pool::{HitOutcome, PoolEvent, Projectile, ProjectileHandle, ProjectilePool};
