//! Shared Types Module
//!
//! Handles for pooled projectiles and the target interface the collision
//! index works against.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::faction::Faction;

// ============================================================================
// PROJECTILE HANDLES
// ============================================================================

/// Reference to one pooled projectile.
///
/// The generation changes every time the slot is released, so a handle
/// kept past its projectile's release no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileHandle {
    pub faction: Faction,
    pub slot: u32,
    pub generation: u32,
}

// ============================================================================
// COLLISION TARGETS
// ============================================================================

/// A damageable actor, approximated by a sphere.
///
/// Targets are owned by game code and shared with the collision index by
/// reference; the index never keeps one alive.
pub trait CollisionTarget {
    /// Current sphere center.
    fn position(&self) -> Vec3;

    /// Sphere radius.
    fn bounding_radius(&self) -> f32;

    /// Faction bucket this target is registered under.
    fn faction(&self) -> Faction;

    /// Apply `amount` damage. Returns `true` when the target was destroyed.
    fn take_damage(&mut self, _amount: f32) -> bool {
        false
    }
}

/// Shared handle to a target, as registered with the collision index.
pub type TargetRef = Rc<RefCell<dyn CollisionTarget>>;

/// Wrap a concrete target into a [`TargetRef`].
pub fn target_ref<T: CollisionTarget + 'static>(target: T) -> TargetRef {
    Rc::new(RefCell::new(target))
}

/// Plain health-pool target.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthTarget {
    pub position: Vec3,
    pub radius: f32,
    pub faction: Faction,
    pub health: f32,
    /// Number of hits taken
    pub hits: u32,
    /// Total damage taken, including overkill
    pub damage_taken: f32,
}

impl HealthTarget {
    pub fn new(faction: Faction, position: Vec3, radius: f32, health: f32) -> Self {
        Self {
            position,
            radius,
            faction,
            health,
            hits: 0,
            damage_taken: 0.0,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0.0
    }
}

impl CollisionTarget for HealthTarget {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn bounding_radius(&self) -> f32 {
        self.radius
    }

    fn faction(&self) -> Faction {
        self.faction
    }

    fn take_damage(&mut self, amount: f32) -> bool {
        self.hits += 1;
        self.damage_taken += amount;
        self.health -= amount;
        self.is_destroyed()
    }
}
