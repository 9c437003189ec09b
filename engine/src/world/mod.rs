//! World Module
//!
//! World-space helpers shared by the projectile systems: the uniform
//! spatial grid used for locality queries and the arena bounds that
//! retire projectiles leaving the play area.

pub mod bounds;
pub mod grid;

pub use bounds::ArenaBounds;
pub use grid::{DEFAULT_CELL_SIZE, GridCell, SpatialGrid};
