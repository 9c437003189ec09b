//! Projectile kinematics
//!
//! Linear motion with an optional constant acceleration, plus the two
//! self-expiry rules every projectile carries: time to live and maximum
//! travel distance from its spawn point.
//!
//! # Example
//!
//! ```ignore
//! use volley_engine::faction::Faction;
//! use volley_engine::physics::kinematics::{Projectile, ProjectileState};
//! use glam::Vec3;
//!
//! let mut p = Projectile::parked(Faction::Player);
//! p.launch(Vec3::ZERO, Vec3::Z * 40.0, 0.0);
//! assert_eq!(p.advance(0.1, 0.1), ProjectileState::Flying);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::faction::Faction;

/// Off-stage position a released projectile is teleported to.
pub const PARKED_POSITION: Vec3 = Vec3::new(0.0, -10_000.0, 0.0);

/// Visual/behavioral archetype. Purely descriptive: every kind moves
/// and collides under the same rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    #[default]
    Bullet,
    Torpedo,
    Beam,
    Missile,
}

impl ProjectileKind {
    /// Numeric id written into GPU instance records.
    pub fn as_u32(self) -> u32 {
        match self {
            ProjectileKind::Bullet => 0,
            ProjectileKind::Torpedo => 1,
            ProjectileKind::Beam => 2,
            ProjectileKind::Missile => 3,
        }
    }
}

/// Why a projectile stopped flying on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// Age exceeded `time_to_live`.
    Lifetime,
    /// Distance from `travel_origin` exceeded `max_travel_distance`.
    Distance,
}

/// Result of advancing a projectile by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectileState {
    /// Still in flight.
    #[default]
    Flying,
    /// Self-expired this step and must be released.
    Expired(ExpiryReason),
    /// Was not active to begin with.
    Inactive,
}

/// Gameplay state of one pooled projectile.
///
/// All times are simulated seconds taken from the owning manager's clock.
/// Clock readings are `f64` so ages stay exact over long sessions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Current position in world space
    pub position: Vec3,
    /// Current velocity (units/second)
    pub velocity: Vec3,
    /// Constant acceleration applied every step (zero for straight shots)
    pub acceleration: Vec3,
    /// Damage applied to the first target hit
    pub damage: f32,
    /// Faction that fired this projectile
    pub owner: Faction,
    /// Clock time at spawn
    pub spawn_time: f64,
    /// Monotonic spawn counter, breaks ties between same-tick spawns
    pub spawn_sequence: u64,
    /// Seconds the projectile may stay active
    pub time_to_live: f32,
    /// Spawn point used for the travel distance cap
    pub travel_origin: Vec3,
    /// Maximum straight-line distance from `travel_origin`
    pub max_travel_distance: f32,
    /// Collision sphere radius
    pub radius: f32,
    /// Archetype used by the renderer
    pub kind: ProjectileKind,
    /// True only while the projectile is in the active set
    pub is_active: bool,
}

impl Projectile {
    /// A freshly constructed, inactive projectile parked off-stage.
    pub fn parked(owner: Faction) -> Self {
        Self {
            position: PARKED_POSITION,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            damage: 0.0,
            owner,
            spawn_time: 0.0,
            spawn_sequence: 0,
            time_to_live: 0.0,
            travel_origin: PARKED_POSITION,
            max_travel_distance: 0.0,
            radius: 0.0,
            kind: ProjectileKind::default(),
            is_active: false,
        }
    }

    /// Place the projectile at `origin` with `velocity` and mark it active.
    ///
    /// The remaining launch parameters (damage, lifetime, radius, ...)
    /// are set by the caller before or after this call.
    pub fn launch(&mut self, origin: Vec3, velocity: Vec3, now: f64) {
        self.position = origin;
        self.travel_origin = origin;
        self.velocity = velocity;
        self.spawn_time = now;
        self.is_active = true;
    }

    /// Restore the freshly-constructed state, keeping only the owner.
    pub fn reset(&mut self) {
        *self = Self::parked(self.owner);
    }

    /// Seconds since spawn.
    #[inline]
    pub fn age(&self, now: f64) -> f32 {
        (now - self.spawn_time) as f32
    }

    /// Straight-line distance from the spawn point.
    #[inline]
    pub fn travel_distance(&self) -> f32 {
        self.position.distance(self.travel_origin)
    }

    /// Advance one step of `dt` seconds; `now` is the clock after the step.
    ///
    /// Semi-implicit Euler: velocity is updated first, then position.
    /// Lifetime is checked before distance.
    pub fn advance(&mut self, dt: f32, now: f64) -> ProjectileState {
        if !self.is_active {
            return ProjectileState::Inactive;
        }

        self.velocity += self.acceleration * dt;
        self.position += self.velocity * dt;

        if self.age(now) > self.time_to_live {
            return ProjectileState::Expired(ExpiryReason::Lifetime);
        }
        if self.travel_distance() > self.max_travel_distance {
            return ProjectileState::Expired(ExpiryReason::Distance);
        }

        ProjectileState::Flying
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launched(velocity: Vec3) -> Projectile {
        let mut p = Projectile::parked(Faction::Player);
        p.time_to_live = 10.0;
        p.max_travel_distance = 1000.0;
        p.launch(Vec3::ZERO, velocity, 0.0);
        p
    }

    #[test]
    fn test_parked_is_inactive() {
        let p = Projectile::parked(Faction::Boss);
        assert!(!p.is_active);
        assert_eq!(p.position, PARKED_POSITION);
        assert_eq!(p.velocity, Vec3::ZERO);
        assert_eq!(p.owner, Faction::Boss);
    }

    #[test]
    fn test_linear_motion() {
        let mut p = launched(Vec3::new(0.0, 0.0, 40.0));
        assert_eq!(p.advance(0.5, 0.5), ProjectileState::Flying);
        assert!((p.position.z - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_acceleration_is_applied_before_position() {
        let mut p = launched(Vec3::ZERO);
        p.acceleration = Vec3::new(0.0, 0.0, 10.0);
        p.advance(1.0, 1.0);
        assert!((p.velocity.z - 10.0).abs() < 1e-5);
        assert!((p.position.z - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_lifetime_expiry() {
        let mut p = launched(Vec3::X);
        p.time_to_live = 1.0;
        assert_eq!(p.advance(0.5, 0.5), ProjectileState::Flying);
        assert_eq!(p.advance(0.5, 1.0), ProjectileState::Flying);
        assert_eq!(
            p.advance(0.5, 1.5),
            ProjectileState::Expired(ExpiryReason::Lifetime)
        );
    }

    #[test]
    fn test_distance_expiry_measured_from_origin() {
        let mut p = launched(Vec3::new(100.0, 0.0, 0.0));
        p.max_travel_distance = 10.0;
        assert_eq!(
            p.advance(1.0, 1.0),
            ProjectileState::Expired(ExpiryReason::Distance)
        );
        assert!((p.travel_distance() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_inactive_does_not_move() {
        let mut p = Projectile::parked(Faction::Minion);
        assert_eq!(p.advance(1.0, 1.0), ProjectileState::Inactive);
        assert_eq!(p.position, PARKED_POSITION);
    }

    #[test]
    fn test_reset_matches_fresh() {
        let mut p = launched(Vec3::new(1.0, 2.0, 3.0));
        p.damage = 12.0;
        p.kind = ProjectileKind::Missile;
        p.reset();
        assert_eq!(p, Projectile::parked(Faction::Player));
    }
}
