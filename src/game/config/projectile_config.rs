//! Projectile Configuration
//!
//! Every cap, pool size and per-faction default the projectile systems
//! use. Values are fixed for the lifetime of a manager: they are read at
//! construction and never tuned at runtime.
//!
//! Configs can be loaded from JSON; missing fields fall back to
//! [`VolleyConfig::default`].

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::arena_config::ArenaConfig;
use crate::faction::Faction;
use crate::physics::ProjectileKind;
use crate::render::EffectsConfig;

/// Errors produced while loading or validating a [`VolleyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pool sizes and launch defaults for one faction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactionConfig {
    /// Instances created up front
    pub initial_pool_size: usize,
    /// Hard cap on instances, and so on simultaneously active projectiles
    pub max_pool_size: usize,
    /// Launch speed when the caller gives none (units/second)
    pub default_speed: f32,
    /// Damage when the caller gives none
    pub default_damage: f32,
    /// Seconds before a projectile expires
    pub time_to_live: f32,
    /// Maximum distance from the spawn point
    pub max_travel_distance: f32,
    /// Collision sphere radius
    pub radius: f32,
    /// Default archetype
    pub kind: ProjectileKind,
    /// Tint for projectiles and their effects (linear RGB, HDR allowed)
    pub color: Vec3,
    /// Intensity of muzzle flash and glow on spawn
    pub muzzle_intensity: f32,
}

/// Top-level configuration for a projectile manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolleyConfig {
    /// Global cap on simultaneously active projectiles
    pub max_projectiles: usize,
    pub player: FactionConfig,
    pub boss: FactionConfig,
    pub minion: FactionConfig,
    /// Projectile-vs-target tests allowed per tick before deferring
    pub max_collision_checks_per_frame: usize,
    /// Cell edge of the target locality grid
    pub grid_cell_size: f32,
    /// Active fraction of `max_projectiles` above which emergency cleanup runs
    pub emergency_threshold: f32,
    /// Fraction of active projectiles released by emergency cleanup
    pub emergency_release_fraction: f32,
    /// Run emergency cleanup automatically at the start of every update
    pub auto_emergency_cleanup: bool,
    /// Active fraction at or above which spawn flashes/glows are skipped
    pub effects_shed_ratio: f32,
    /// Intensity of impact bursts
    pub impact_intensity: f32,
    pub effects: EffectsConfig,
    pub arena: ArenaConfig,
}

impl Default for VolleyConfig {
    fn default() -> Self {
        Self {
            max_projectiles: 120,
            player: FactionConfig {
                initial_pool_size: 30,
                max_pool_size: 50,
                default_speed: 40.0,
                default_damage: 10.0,
                time_to_live: 3.0,
                max_travel_distance: 150.0,
                radius: 0.2,
                kind: ProjectileKind::Bullet,
                color: Vec3::new(0.3, 0.8, 1.0),
                muzzle_intensity: 1.0,
            },
            boss: FactionConfig {
                initial_pool_size: 20,
                max_pool_size: 50,
                default_speed: 25.0,
                default_damage: 20.0,
                time_to_live: 5.0,
                max_travel_distance: 200.0,
                radius: 0.5,
                kind: ProjectileKind::Torpedo,
                color: Vec3::new(1.0, 0.25, 0.15),
                muzzle_intensity: 1.4,
            },
            minion: FactionConfig {
                initial_pool_size: 15,
                max_pool_size: 50,
                default_speed: 20.0,
                default_damage: 5.0,
                time_to_live: 4.0,
                max_travel_distance: 120.0,
                radius: 0.25,
                kind: ProjectileKind::Bullet,
                color: Vec3::new(0.9, 0.5, 1.0),
                muzzle_intensity: 0.8,
            },
            max_collision_checks_per_frame: 1000,
            grid_cell_size: 10.0,
            emergency_threshold: 0.8,
            emergency_release_fraction: 0.3,
            auto_emergency_cleanup: false,
            effects_shed_ratio: 0.9,
            impact_intensity: 1.0,
            effects: EffectsConfig::default(),
            arena: ArenaConfig::default(),
        }
    }
}

impl VolleyConfig {
    /// Settings for one faction.
    pub fn faction(&self, faction: Faction) -> &FactionConfig {
        match faction {
            Faction::Player => &self.player,
            Faction::Boss => &self.boss,
            Faction::Minion => &self.minion,
        }
    }

    /// Mutable settings for one faction.
    pub fn faction_mut(&mut self, faction: Faction) -> &mut FactionConfig {
        match faction {
            Faction::Player => &mut self.player,
            Faction::Boss => &mut self.boss,
            Faction::Minion => &mut self.minion,
        }
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: VolleyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the manager cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_projectiles == 0 {
            return Err(invalid("max_projectiles must be at least 1"));
        }
        for faction in Faction::ALL {
            let fc = self.faction(faction);
            if fc.max_pool_size == 0 {
                return Err(invalid(format!("{faction}.max_pool_size must be at least 1")));
            }
            if fc.initial_pool_size > fc.max_pool_size {
                return Err(invalid(format!(
                    "{faction}.initial_pool_size ({}) exceeds max_pool_size ({})",
                    fc.initial_pool_size, fc.max_pool_size
                )));
            }
            if !(fc.default_speed.is_finite() && fc.default_speed >= 0.0) {
                return Err(invalid(format!("{faction}.default_speed must be finite and >= 0")));
            }
            if !(fc.default_damage.is_finite() && fc.default_damage >= 0.0) {
                return Err(invalid(format!("{faction}.default_damage must be finite and >= 0")));
            }
            if !(fc.time_to_live > 0.0) {
                return Err(invalid(format!("{faction}.time_to_live must be > 0")));
            }
            if !(fc.max_travel_distance > 0.0) {
                return Err(invalid(format!("{faction}.max_travel_distance must be > 0")));
            }
            if !(fc.radius.is_finite() && fc.radius >= 0.0) {
                return Err(invalid(format!("{faction}.radius must be finite and >= 0")));
            }
        }
        if self.max_collision_checks_per_frame == 0 {
            return Err(invalid("max_collision_checks_per_frame must be at least 1"));
        }
        if !(self.grid_cell_size.is_finite() && self.grid_cell_size > 0.0) {
            return Err(invalid("grid_cell_size must be finite and > 0"));
        }
        for (name, ratio) in [
            ("emergency_threshold", self.emergency_threshold),
            ("emergency_release_fraction", self.emergency_release_fraction),
            ("effects_shed_ratio", self.effects_shed_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(invalid(format!("{name} must be in (0, 1]")));
            }
        }
        if !(self.arena.out_of_bounds_margin >= 0.0) {
            return Err(invalid("arena.out_of_bounds_margin must be >= 0"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        VolleyConfig::default().validate().unwrap();
    }

    #[test]
    fn test_reference_pool_sizes() {
        let config = VolleyConfig::default();
        assert_eq!((config.player.initial_pool_size, config.player.max_pool_size), (30, 50));
        assert_eq!((config.boss.initial_pool_size, config.boss.max_pool_size), (20, 50));
        assert_eq!((config.minion.initial_pool_size, config.minion.max_pool_size), (15, 50));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VolleyConfig::from_json_str(r#"{ "max_projectiles": 10 }"#).unwrap();
        assert_eq!(config.max_projectiles, 10);
        assert_eq!(config.player, VolleyConfig::default().player);
    }

    #[test]
    fn test_initial_above_max_rejected() {
        let mut config = VolleyConfig::default();
        config.boss.initial_pool_size = 60;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("boss.initial_pool_size"));
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let err = VolleyConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_ratio_out_of_range_rejected() {
        let mut config = VolleyConfig::default();
        config.emergency_release_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_config() {
        let config = VolleyConfig::default();
        let json = config.to_json_pretty().unwrap();
        assert_eq!(VolleyConfig::from_json_str(&json).unwrap(), config);
    }
}
