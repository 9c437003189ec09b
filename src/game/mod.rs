//! Game Module
//!
//! Projectile pools, the collision index, configuration and the manager
//! that ties them together.

pub mod config;
pub mod systems;
pub mod types;

pub use config::{ArenaConfig, ConfigError, FactionConfig, VolleyConfig};
pub use systems::{
    CollisionIndex, CollisionPassStats, CollisionResult, ManagerStats, PoolStats, ProjectileManager,
    ProjectilePool, ProjectileSample, SpawnParams,
};
pub use types::{CollisionTarget, HealthTarget, ProjectileHandle, TargetRef, target_ref};
