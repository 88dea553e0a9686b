//! Hailfire - Real-Time Weapon Firing & Targeting Engine

pub mod combat;
pub mod core;
pub mod progression;
pub mod projectile;
pub mod targeting;
pub mod weapon;
