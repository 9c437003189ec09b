//! Config Module
//!
//! Centralized configuration for projectile caps, faction defaults,
//! effects and arena bounds.

pub mod arena_config;
pub mod projectile_config;

pub use arena_config::ArenaConfig;
pub use projectile_config::{ConfigError, FactionConfig, VolleyConfig};
