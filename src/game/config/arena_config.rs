//! Arena Configuration
//!
//! Bounds outside of which projectiles are retired early.

use serde::{Deserialize, Serialize};

use crate::world::ArenaBounds;

/// Projectile-relevant arena layout.
///
/// `Default` leaves the arena unbounded; projectiles then only expire
/// through lifetime, travel distance or hits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Play area, `None` for unbounded
    pub bounds: Option<ArenaBounds>,
    /// Outward slack before a projectile counts as out of bounds (meters)
    pub out_of_bounds_margin: f32,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bounds: None,
            out_of_bounds_margin: 5.0,
        }
    }
}

impl ArenaConfig {
    /// Circular arena of `radius` around the origin.
    pub fn circular(radius: f32) -> Self {
        Self {
            bounds: Some(ArenaBounds::circular(radius)),
            ..Default::default()
        }
    }
}
