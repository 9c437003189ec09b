//! Volley Engine Library
//!
//! Pooled projectile lifecycle and hit detection for an arcade combat
//! loop. Three factions fire short-lived projectiles; every tick the
//! engine moves them, retires the ones that expire or leave the arena,
//! checks the rest against registered targets and reports the hits.
//!
//! # Modules
//!
//! - [`faction`] - Faction tag and the enmity table
//! - [`physics`] - Projectile kinematics and sphere hit tests
//! - [`world`] - Spatial grid and arena bounds
//! - [`render`] - GPU instance records and the transient effects layer
//! - [`game`] - Pools, collision index, configuration and the manager
//!
//! # Example
//!
//! ```ignore
//! use std::{cell::RefCell, rc::Rc};
//! use glam::Vec3;
//! use volley_engine::faction::Faction;
//! use volley_engine::game::{ProjectileManager, TargetRef};
//!
//! let mut manager = ProjectileManager::default();
//! let boss: TargetRef = Rc::new(RefCell::new(my_boss));
//! manager.register_target(&boss);
//!
//! manager.spawn_projectile(Faction::Player, Vec3::ZERO, Vec3::Z, Some(40.0), Some(10.0));
//! for hit in manager.update(1.0 / 60.0, camera_position) {
//!     score += hit.damage;
//! }
//! ```

pub mod faction;
pub mod physics;
pub mod render;
pub mod world;

// Game-specific modules (located in src/game/ directory)
#[path = "../../src/game/mod.rs"]
pub mod game;

pub use faction::Faction;
pub use physics::{Projectile, ProjectileKind};
pub use world::{ArenaBounds, SpatialGrid};
