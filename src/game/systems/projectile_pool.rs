//! Per-faction projectile pool.
//!
//! A fixed-capacity store of projectile slots split into a free list and
//! an in-use set. Slots are created lazily up to `max_size` and never
//! destroyed afterwards; releasing a projectile only resets its gameplay
//! state, so the visual resource id bound to a slot stays valid for the
//! pool's whole lifetime.

use serde::Serialize;

use crate::faction::Faction;
use crate::game::types::ProjectileHandle;
use crate::physics::{ExpiryReason, Projectile, ProjectileState};

/// Occupancy snapshot of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub faction: Faction,
    /// Slots waiting on the free list
    pub free: usize,
    /// Slots currently handed out
    pub in_use: usize,
    /// Slots ever created (`free + in_use`)
    pub created: usize,
    /// Hard cap on `created`
    pub max_size: usize,
}

#[derive(Debug, Clone)]
struct PoolSlot {
    projectile: Projectile,
    generation: u32,
    visual_id: u32,
}

/// Free-list pool for one faction.
#[derive(Debug, Clone)]
pub struct ProjectilePool {
    faction: Faction,
    slots: Vec<PoolSlot>,
    free: Vec<u32>,
    in_use: usize,
    max_size: usize,
    visual_base: u32,
}

impl ProjectilePool {
    /// Create a pool with `initial_size` prewarmed slots and room for `max_size`.
    ///
    /// Visual ids are `visual_base..visual_base + max_size`, so pools sharing
    /// one renderer-side buffer can be given disjoint ranges.
    pub fn new(faction: Faction, initial_size: usize, max_size: usize, visual_base: u32) -> Self {
        let initial_size = initial_size.min(max_size);
        let mut pool = Self {
            faction,
            slots: Vec::with_capacity(max_size),
            free: Vec::with_capacity(max_size),
            in_use: 0,
            max_size,
            visual_base,
        };
        for _ in 0..initial_size {
            pool.create_slot();
        }
        // Pop order hands out the lowest slot first.
        pool.free.reverse();
        pool
    }

    fn create_slot(&mut self) -> u32 {
        let index = self.slots.len() as u32;
        self.slots.push(PoolSlot {
            projectile: Projectile::parked(self.faction),
            generation: 0,
            visual_id: self.visual_base + index,
        });
        self.free.push(index);
        index
    }

    /// Faction served by this pool.
    pub fn faction(&self) -> Faction {
        self.faction
    }

    /// Take a projectile slot, creating one if the free list is empty.
    ///
    /// Returns `None` once `max_size` slots are in use; callers treat that
    /// as backpressure.
    pub fn acquire(&mut self) -> Option<ProjectileHandle> {
        if self.free.is_empty() {
            if self.slots.len() >= self.max_size {
                return None;
            }
            self.create_slot();
        }
        let index = self.free.pop()?;

        let slot = &mut self.slots[index as usize];
        slot.projectile.is_active = true;
        self.in_use += 1;

        Some(ProjectileHandle {
            faction: self.faction,
            slot: index,
            generation: slot.generation,
        })
    }

    fn slot_index(&self, handle: ProjectileHandle) -> Option<usize> {
        if handle.faction != self.faction {
            return None;
        }
        let index = handle.slot as usize;
        let slot = self.slots.get(index)?;
        (slot.generation == handle.generation && slot.projectile.is_active).then_some(index)
    }

    /// Return a projectile to the free list.
    ///
    /// Releasing a stale handle (already released, or the slot has moved
    /// on to a newer projectile) is a no-op that returns `false`.
    pub fn release(&mut self, handle: ProjectileHandle) -> bool {
        let Some(index) = self.slot_index(handle) else {
            tracing::debug!(
                faction = %self.faction,
                slot = handle.slot,
                generation = handle.generation,
                "ignoring release of inactive projectile handle"
            );
            return false;
        };

        let slot = &mut self.slots[index];
        slot.projectile.reset();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        self.in_use -= 1;
        true
    }

    /// Release every in-use projectile. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let handles = self.active_handles();
        handles.into_iter().filter(|&h| self.release(h)).count()
    }

    /// Whether `handle` still refers to an active projectile.
    pub fn is_active(&self, handle: ProjectileHandle) -> bool {
        self.slot_index(handle).is_some()
    }

    /// Active projectile behind `handle`.
    pub fn get(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        self.slot_index(handle).map(|i| &self.slots[i].projectile)
    }

    /// Mutable active projectile behind `handle`.
    pub fn get_mut(&mut self, handle: ProjectileHandle) -> Option<&mut Projectile> {
        self.slot_index(handle).map(|i| &mut self.slots[i].projectile)
    }

    /// Stable visual resource id of the slot behind `handle`.
    pub fn visual_id(&self, handle: ProjectileHandle) -> Option<u32> {
        self.slot_index(handle).map(|i| self.slots[i].visual_id)
    }

    /// Iterate active projectiles with their handles.
    pub fn iter_active(&self) -> impl Iterator<Item = (ProjectileHandle, &Projectile)> + '_ {
        let faction = self.faction;
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.projectile.is_active)
            .map(move |(i, slot)| {
                (
                    ProjectileHandle {
                        faction,
                        slot: i as u32,
                        generation: slot.generation,
                    },
                    &slot.projectile,
                )
            })
    }

    /// Iterate active projectiles with their visual ids.
    pub fn iter_active_visuals(&self) -> impl Iterator<Item = (u32, &Projectile)> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.projectile.is_active)
            .map(|slot| (slot.visual_id, &slot.projectile))
    }

    /// Handles of every active projectile.
    pub fn active_handles(&self) -> Vec<ProjectileHandle> {
        self.iter_active().map(|(handle, _)| handle).collect()
    }

    /// Advance every active projectile and collect the ones that expired.
    ///
    /// Expired projectiles are left active; the caller releases them so
    /// release bookkeeping stays in one place.
    pub fn advance_all(
        &mut self,
        dt: f32,
        now: f64,
        expired: &mut Vec<(ProjectileHandle, ExpiryReason)>,
    ) {
        let faction = self.faction;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if let ProjectileState::Expired(reason) = slot.projectile.advance(dt, now) {
                let handle = ProjectileHandle {
                    faction,
                    slot: i as u32,
                    generation: slot.generation,
                };
                expired.push((handle, reason));
            }
        }
    }

    /// Number of active projectiles.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of slots on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Slots ever created.
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    /// Hard cap on slots.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Occupancy snapshot.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            faction: self.faction,
            free: self.free.len(),
            in_use: self.in_use,
            created: self.slots.len(),
            max_size: self.max_size,
        }
    }
}
