//! Sphere-vs-sphere hit tests
//!
//! Collision is discrete and per-tick. The test is split into a broad
//! phase that only compares squared distances and a narrow phase that
//! confirms survivors with the exact distance. For spheres the two agree;
//! other shapes can supply a tighter narrow phase without touching the
//! broad phase.

use glam::Vec3;

/// A confirmed sphere contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereContact {
    /// Distance between the two centers
    pub distance: f32,
    /// Penetration depth (zero when exactly touching)
    pub depth: f32,
    /// Point on the target surface closest to the projectile center
    pub point: Vec3,
}

/// Cheap rejection test. Touching counts as overlapping.
#[inline]
pub fn sphere_broad_phase(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_squared(b) <= reach * reach
}

/// Exact confirmation for a pair that passed [`sphere_broad_phase`].
///
/// `a` is the projectile, `b` the target.
pub fn sphere_narrow_phase(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> Option<SphereContact> {
    let reach = radius_a + radius_b;
    if a.distance_squared(b) > reach * reach {
        return None;
    }

    let distance = a.distance(b);
    let toward_a = (a - b).normalize_or_zero();
    Some(SphereContact {
        distance,
        depth: (reach - distance).max(0.0),
        point: b + toward_a * radius_b,
    })
}

/// Broad phase followed by narrow phase.
#[inline]
pub fn sphere_hit(a: Vec3, radius_a: f32, b: Vec3, radius_b: f32) -> Option<SphereContact> {
    if !sphere_broad_phase(a, radius_a, b, radius_b) {
        return None;
    }
    sphere_narrow_phase(a, radius_a, b, radius_b)
}
