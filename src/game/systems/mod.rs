//! Game systems: self-contained modules that own state and logic.

pub mod collision_system;
pub mod projectile_pool;
pub mod projectile_system;

pub use collision_system::{CollisionIndex, CollisionPassStats, CollisionResult, ProjectileSample};
pub use projectile_pool::{PoolStats, ProjectilePool};
pub use projectile_system::{ManagerStats, ProjectileManager, SpawnParams};
