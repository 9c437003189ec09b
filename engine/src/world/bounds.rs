//! Arena bounds
//!
//! Projectiles that leave the arena are retired without waiting for
//! their lifetime to run out. Arenas are either a circle on the XZ plane
//! or an axis-aligned box; both are tested with a small outward margin so
//! shots grazing the edge are not culled early.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Playable region for projectiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ArenaBounds {
    /// Circle on the XZ plane; height is unbounded.
    Circular { center: Vec3, radius: f32 },
    /// Axis-aligned box, inclusive on all faces.
    Box { min: Vec3, max: Vec3 },
}

impl ArenaBounds {
    /// Circle of `radius` around the world origin.
    pub fn circular(radius: f32) -> Self {
        ArenaBounds::Circular {
            center: Vec3::ZERO,
            radius: radius.max(0.0),
        }
    }

    /// Box spanning `a` to `b`; corners may be given in any order.
    pub fn aabb(a: Vec3, b: Vec3) -> Self {
        ArenaBounds::Box {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Whether `position` lies inside the bounds grown outward by `margin`.
    pub fn contains(&self, position: Vec3, margin: f32) -> bool {
        let margin = margin.max(0.0);
        match *self {
            ArenaBounds::Circular { center, radius } => {
                let dx = position.x - center.x;
                let dz = position.z - center.z;
                let limit = radius + margin;
                dx * dx + dz * dz <= limit * limit
            }
            ArenaBounds::Box { min, max } => {
                let grow = Vec3::splat(margin);
                position.cmpge(min - grow).all() && position.cmple(max + grow).all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_ignores_height() {
        let bounds = ArenaBounds::circular(50.0);
        assert!(bounds.contains(Vec3::new(0.0, 500.0, 49.0), 0.0));
        assert!(!bounds.contains(Vec3::new(0.0, 0.0, 51.0), 0.0));
    }

    #[test]
    fn test_circular_margin() {
        let bounds = ArenaBounds::circular(50.0);
        assert!(bounds.contains(Vec3::new(52.0, 0.0, 0.0), 5.0));
        assert!(!bounds.contains(Vec3::new(56.0, 0.0, 0.0), 5.0));
    }

    #[test]
    fn test_box_corners_any_order() {
        let bounds = ArenaBounds::aabb(Vec3::new(10.0, 10.0, 10.0), Vec3::new(-10.0, 0.0, -10.0));
        assert!(bounds.contains(Vec3::new(0.0, 5.0, 0.0), 0.0));
        assert!(bounds.contains(Vec3::new(10.0, 10.0, 10.0), 0.0));
        assert!(!bounds.contains(Vec3::new(0.0, -1.0, 0.0), 0.0));
        assert!(bounds.contains(Vec3::new(0.0, -1.0, 0.0), 2.0));
    }

    #[test]
    fn test_serde_shape_tag() {
        let json = r#"{"shape":"circular","center":[0.0,0.0,0.0],"radius":80.0}"#;
        let bounds: ArenaBounds = serde_json::from_str(json).unwrap();
        assert_eq!(bounds, ArenaBounds::circular(80.0));
    }
}
