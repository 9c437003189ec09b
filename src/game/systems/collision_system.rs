//! Collision system: faction-partitioned target registry and per-tick hit detection.
//!
//! Targets are registered by shared reference into one bucket per
//! faction, in registration order. Every tick, active projectiles are
//! tested against the buckets their faction is hostile to; a projectile
//! hits at most one target, the first one in bucket order that overlaps
//! it. A secondary uniform grid answers locality queries outside the
//! main pass. Pure game logic with **no** GPU dependencies.
//!
//! ## Budget fairness
//! The per-tick pair-test budget is shared by all factions. Projectiles
//! deferred by one pass are tested first in the next, in the order they
//! were skipped, and the faction that leads each pass rotates, so a flood of one faction's shots can
//! delay the others by a few ticks but never starve them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use glam::Vec3;

use crate::faction::{FACTION_COUNT, Faction};
use crate::game::types::{CollisionTarget, ProjectileHandle, TargetRef};
use crate::physics::sphere_hit;
use crate::world::SpatialGrid;

/// Buckets smaller than this are never compacted.
const MIN_COMPACT_LEN: usize = 16;

/// Identity of a registered target (its allocation address).
///
/// The index holds a `Weak` to every registered target, which keeps the
/// allocation reserved, so an address cannot be reused while registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TargetKey(usize);

impl TargetKey {
    fn of(target: &TargetRef) -> Self {
        TargetKey(Rc::as_ptr(target) as *const () as usize)
    }
}

#[derive(Clone)]
struct RegisteredTarget {
    key: TargetKey,
    target: Weak<RefCell<dyn CollisionTarget>>,
}

/// Per-tick snapshot of a live target.
struct LiveTarget {
    target: TargetRef,
    position: Vec3,
    radius: f32,
}

/// What the collision pass needs to know about one active projectile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileSample {
    pub handle: ProjectileHandle,
    pub position: Vec3,
    pub radius: f32,
    pub damage: f32,
}

/// One projectile-target hit.
#[derive(Clone)]
pub struct CollisionResult {
    /// Projectile that hit (released by the manager before this is returned)
    pub projectile: ProjectileHandle,
    /// Target that was hit
    pub target: TargetRef,
    /// Faction bucket of the target
    pub target_faction: Faction,
    /// Projectile position at the moment of the hit
    pub position: Vec3,
    /// Closest point on the target sphere
    pub contact_point: Vec3,
    /// Damage carried by the projectile
    pub damage: f32,
    /// Whether the target reported itself destroyed when damage was applied
    pub target_destroyed: bool,
}

impl CollisionResult {
    /// Faction that fired the projectile.
    pub fn projectile_faction(&self) -> Faction {
        self.projectile.faction
    }
}

impl std::fmt::Debug for CollisionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionResult")
            .field("projectile", &self.projectile)
            .field("target_faction", &self.target_faction)
            .field("position", &self.position)
            .field("damage", &self.damage)
            .field("target_destroyed", &self.target_destroyed)
            .finish_non_exhaustive()
    }
}

/// Counters from the most recent collision pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionPassStats {
    /// Projectile-vs-target pair tests performed
    pub checks: usize,
    /// Projectiles skipped because the per-tick budget ran out
    pub deferred: usize,
    /// Hits reported
    pub hits: usize,
}

/// Registry of damageable targets plus the per-tick hit test.
pub struct CollisionIndex {
    buckets: [Vec<Option<RegisteredTarget>>; FACTION_COUNT],
    tombstones: [usize; FACTION_COUNT],
    lookup: HashMap<TargetKey, (Faction, usize)>,
    grid: SpatialGrid<TargetKey>,
    max_target_radius: f32,
    max_checks_per_frame: usize,
    live: [Vec<LiveTarget>; FACTION_COUNT],
    dead: Vec<TargetKey>,
    /// Projectiles the last pass ran out of budget for, in skip order
    carried: Vec<ProjectileHandle>,
    /// Faction tested first in the next pass
    lead: usize,
    order: Vec<usize>,
    last_pass: CollisionPassStats,
}

impl CollisionIndex {
    /// Create an empty index.
    ///
    /// `cell_size` sizes the locality grid; `max_checks_per_frame` bounds
    /// the pair tests one [`Self::check_collisions`] call may perform.
    pub fn new(cell_size: f32, max_checks_per_frame: usize) -> Self {
        Self {
            buckets: Default::default(),
            tombstones: [0; FACTION_COUNT],
            lookup: HashMap::new(),
            grid: SpatialGrid::new(cell_size),
            max_target_radius: 0.0,
            max_checks_per_frame: max_checks_per_frame.max(1),
            live: Default::default(),
            dead: Vec::new(),
            carried: Vec::new(),
            lead: 0,
            order: Vec::new(),
            last_pass: CollisionPassStats::default(),
        }
    }

    /// Register `target` under its faction. Registering an already
    /// registered target is a no-op and returns `false`.
    pub fn register_target(&mut self, target: &TargetRef) -> bool {
        let key = TargetKey::of(target);
        if self.lookup.contains_key(&key) {
            tracing::debug!("target already registered, ignoring");
            return false;
        }

        let Ok(t) = target.try_borrow() else {
            tracing::warn!("cannot register a target that is mutably borrowed");
            return false;
        };
        let faction = t.faction();
        let position = t.position();
        self.max_target_radius = self.max_target_radius.max(t.bounding_radius());
        drop(t);

        let bucket = &mut self.buckets[faction.index()];
        bucket.push(Some(RegisteredTarget {
            key,
            target: Rc::downgrade(target),
        }));
        self.lookup.insert(key, (faction, bucket.len() - 1));
        self.grid.insert(key, position);
        true
    }

    /// Unregister `target`. Returns `false` if it was not registered.
    pub fn unregister_target(&mut self, target: &TargetRef) -> bool {
        self.remove_key(TargetKey::of(target))
    }

    fn remove_key(&mut self, key: TargetKey) -> bool {
        let Some((faction, slot)) = self.lookup.remove(&key) else {
            return false;
        };
        let f = faction.index();
        self.buckets[f][slot] = None;
        self.tombstones[f] += 1;
        self.grid.remove(key);
        self.maybe_compact(faction);
        true
    }

    /// Drop tombstones once they make up half of a bucket, keeping order.
    fn maybe_compact(&mut self, faction: Faction) {
        let f = faction.index();
        let len = self.buckets[f].len();
        if self.tombstones[f] == len {
            self.buckets[f].clear();
            self.tombstones[f] = 0;
            return;
        }
        if len < MIN_COMPACT_LEN || self.tombstones[f] * 2 < len {
            return;
        }

        self.buckets[f].retain(Option::is_some);
        self.tombstones[f] = 0;
        for (slot, entry) in self.buckets[f].iter().enumerate() {
            if let Some(entry) = entry {
                self.lookup.insert(entry.key, (faction, slot));
            }
        }
    }

    /// Whether `target` is registered.
    pub fn contains(&self, target: &TargetRef) -> bool {
        self.lookup.contains_key(&TargetKey::of(target))
    }

    /// Number of registered targets across all factions.
    pub fn target_count(&self) -> usize {
        self.lookup.len()
    }

    /// Number of registered targets in one faction bucket.
    pub fn target_count_for(&self, faction: Faction) -> usize {
        let f = faction.index();
        self.buckets[f].len() - self.tombstones[f]
    }

    /// Unregister everything.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.tombstones = [0; FACTION_COUNT];
        self.lookup.clear();
        self.grid.clear();
        self.carried.clear();
        self.max_target_radius = 0.0;
    }

    /// Test `projectiles` against the targets their owners are hostile to.
    ///
    /// Each projectile yields at most one result. Once the per-tick check
    /// budget is spent the remaining projectiles are skipped; skipped
    /// projectiles are tested first on the next call. Returned results
    /// have `target_destroyed == false`; damage is applied by the caller.
    pub fn check_collisions(&mut self, projectiles: &[ProjectileSample]) -> Vec<CollisionResult> {
        self.last_pass = CollisionPassStats::default();
        if projectiles.is_empty() || self.lookup.is_empty() {
            self.carried.clear();
            return Vec::new();
        }

        self.snapshot_live_targets();
        let order = self.pass_order(projectiles);

        let mut results = Vec::new();
        let mut checks = 0usize;
        let mut deferred = 0usize;

        for &i in &order {
            let sample = &projectiles[i];
            if checks >= self.max_checks_per_frame {
                deferred += 1;
                self.carried.push(sample.handle);
                continue;
            }

            'targets: for target_faction in sample.handle.faction.hostile_factions() {
                for live in &self.live[target_faction.index()] {
                    checks += 1;
                    let Some(contact) =
                        sphere_hit(sample.position, sample.radius, live.position, live.radius)
                    else {
                        continue;
                    };
                    results.push(CollisionResult {
                        projectile: sample.handle,
                        target: Rc::clone(&live.target),
                        target_faction: *target_faction,
                        position: sample.position,
                        contact_point: contact.point,
                        damage: sample.damage,
                        target_destroyed: false,
                    });
                    break 'targets;
                }
            }
        }
        self.order = order;

        for live in &mut self.live {
            live.clear();
        }
        self.prune_dead();

        self.last_pass = CollisionPassStats {
            checks,
            deferred,
            hits: results.len(),
        };
        if deferred > 0 {
            tracing::debug!(checks, deferred, "collision budget exhausted, deferring projectiles");
        }
        results
    }

    /// Indices into `projectiles` in test order: last pass's deferred
    /// projectiles first, in the order they were skipped, then the rest
    /// by faction starting from the rotating lead. Factions with no live
    /// hostile target are left out.
    fn pass_order(&mut self, projectiles: &[ProjectileSample]) -> Vec<usize> {
        let lead = self.lead;
        self.lead = (self.lead + 1) % FACTION_COUNT;

        let armed = Faction::ALL.map(|faction| {
            faction
                .hostile_factions()
                .iter()
                .any(|h| !self.live[h.index()].is_empty())
        });

        let mut order = std::mem::take(&mut self.order);
        order.clear();
        let mut queued = vec![false; projectiles.len()];

        if !self.carried.is_empty() {
            let slots: HashMap<ProjectileHandle, usize> = projectiles
                .iter()
                .enumerate()
                .map(|(i, s)| (s.handle, i))
                .collect();
            for handle in self.carried.drain(..) {
                let Some(&i) = slots.get(&handle) else {
                    continue;
                };
                if armed[handle.faction.index()] && !queued[i] {
                    queued[i] = true;
                    order.push(i);
                }
            }
        }

        for step in 0..FACTION_COUNT {
            let faction = Faction::ALL[(lead + step) % FACTION_COUNT];
            if !armed[faction.index()] {
                continue;
            }
            order.extend(
                (0..projectiles.len())
                    .filter(|&i| !queued[i] && projectiles[i].handle.faction == faction),
            );
        }
        order
    }

    /// Copy position/radius of every live target in bucket order.
    fn snapshot_live_targets(&mut self) {
        for (f, bucket) in self.buckets.iter().enumerate() {
            let live = &mut self.live[f];
            live.clear();
            for entry in bucket.iter().flatten() {
                let Some(target) = entry.target.upgrade() else {
                    self.dead.push(entry.key);
                    continue;
                };
                let Ok(t) = target.try_borrow() else {
                    continue;
                };
                let (position, radius) = (t.position(), t.bounding_radius());
                drop(t);
                live.push(LiveTarget {
                    target,
                    position,
                    radius,
                });
            }
        }
    }

    /// Forget targets whose owners dropped them without unregistering.
    fn prune_dead(&mut self) {
        while let Some(key) = self.dead.pop() {
            if self.remove_key(key) {
                tracing::debug!("pruned dropped collision target");
            }
        }
    }

    /// Registered targets whose sphere overlaps the query sphere.
    ///
    /// Candidates come from the grid buckets recorded at registration (or
    /// the last refresh), then are filtered by their live position. A
    /// target that has moved far from its recorded cell can be missed
    /// until it is refreshed.
    pub fn targets_in_radius(&self, center: Vec3, radius: f32) -> Vec<TargetRef> {
        let mut keys = Vec::new();
        self.grid
            .query_radius_into(center, radius + self.max_target_radius, &mut keys);

        keys.into_iter()
            .filter_map(|key| self.resolve(key))
            .filter(|target| {
                target.try_borrow().is_ok_and(|t| {
                    let reach = radius + t.bounding_radius();
                    t.position().distance_squared(center) <= reach * reach
                })
            })
            .collect()
    }

    fn resolve(&self, key: TargetKey) -> Option<TargetRef> {
        let &(faction, slot) = self.lookup.get(&key)?;
        self.buckets[faction.index()][slot].as_ref()?.target.upgrade()
    }

    /// Re-bucket one target at its current position.
    pub fn refresh_target(&mut self, target: &TargetRef) -> bool {
        let key = TargetKey::of(target);
        if !self.lookup.contains_key(&key) {
            return false;
        }
        let Ok(t) = target.try_borrow() else {
            return false;
        };
        let (position, radius) = (t.position(), t.bounding_radius());
        drop(t);
        self.max_target_radius = self.max_target_radius.max(radius);
        self.grid.insert(key, position);
        true
    }

    /// Re-bucket every registered target at its current position.
    pub fn refresh_grid(&mut self) {
        let live: Vec<(TargetKey, TargetRef)> = self
            .buckets
            .iter()
            .flat_map(|bucket| bucket.iter().flatten())
            .filter_map(|entry| entry.target.upgrade().map(|t| (entry.key, t)))
            .collect();
        for (key, target) in live {
            let Ok(t) = target.try_borrow() else {
                continue;
            };
            let (position, radius) = (t.position(), t.bounding_radius());
            drop(t);
            self.max_target_radius = self.max_target_radius.max(radius);
            self.grid.insert(key, position);
        }
    }

    /// Counters from the last [`Self::check_collisions`] call.
    pub fn last_pass(&self) -> CollisionPassStats {
        self.last_pass
    }

    /// Pair-test budget per tick.
    pub fn max_checks_per_frame(&self) -> usize {
        self.max_checks_per_frame
    }
}
