//! Physics module
//!
//! Projectile motion and hit tests, built without an external physics
//! library.
//!
//! # Unit System
//!
//! **1 unit = 1 meter**, times in seconds, velocities in units/second.
//!
//! # Submodules
//!
//! - [`types`] - Core mathematical types re-exported from glam
//! - [`kinematics`] - Projectile state, linear motion and self-expiry
//! - [`collision`] - Two-phase sphere-vs-sphere hit tests

pub mod collision;
pub mod kinematics;
pub mod types;

pub use collision::{SphereContact, sphere_broad_phase, sphere_hit, sphere_narrow_phase};
pub use kinematics::{
    ExpiryReason, PARKED_POSITION, Projectile, ProjectileKind, ProjectileState,
};
pub use types::Vec3;
