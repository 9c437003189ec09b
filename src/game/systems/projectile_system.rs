//! Projectile lifecycle management system.
//!
//! [`ProjectileManager`] composes one [`ProjectilePool`] per faction, the
//! [`CollisionIndex`] and the [`EffectsLayer`] behind faction-aware spawn
//! calls and a single per-tick [`ProjectileManager::update`]. It owns no
//! GPU state; renderers read [`ProjectileManager::projectile_instances`]
//! and the effect batches.
//!
//! Every tick runs in a fixed order:
//!
//! 1. advance kinematics and release self-expired projectiles
//! 2. release projectiles outside the arena bounds
//! 3. test the remaining projectiles against registered targets
//! 4. apply damage, spawn impact effects, release the projectiles that hit
//! 5. advance the effects layer
//!
//! A projectile that hits in step 4 is released before `update` returns,
//! so it can neither move again nor produce a second hit.

use glam::Vec3;
use serde::Serialize;

use super::collision_system::{CollisionIndex, CollisionResult, ProjectileSample};
use super::projectile_pool::{PoolStats, ProjectilePool};
use crate::faction::{FACTION_COUNT, Faction};
use crate::game::config::{ConfigError, VolleyConfig};
use crate::game::types::{ProjectileHandle, TargetRef};
use crate::physics::{ExpiryReason, Projectile, ProjectileKind};
use crate::render::{EffectsLayer, ProjectileInstance, pack_color};
use crate::world::ArenaBounds;

/// Launch parameters for [`ProjectileManager::spawn_with`].
///
/// Every `None` falls back to the faction's configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpawnParams {
    pub speed: Option<f32>,
    pub damage: Option<f32>,
    pub time_to_live: Option<f32>,
    pub max_travel_distance: Option<f32>,
    pub radius: Option<f32>,
    pub kind: Option<ProjectileKind>,
    /// Constant acceleration (zero for straight shots)
    pub acceleration: Vec3,
}

/// Diagnostic snapshot of a manager. Not meant for control flow.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    /// Simulated seconds since construction
    pub elapsed: f64,
    /// Number of `update` calls
    pub frames: u64,
    pub active_total: usize,
    pub max_projectiles: usize,
    pub pools: [PoolStats; FACTION_COUNT],
    pub registered_targets: usize,
    pub collision_checks_last_frame: usize,
    pub collisions_last_frame: usize,
    pub deferred_last_frame: usize,
    pub spawned_total: u64,
    pub refused_spawns: u64,
    pub expired_lifetime: u64,
    pub expired_distance: u64,
    pub out_of_bounds: u64,
    pub hits_total: u64,
    pub emergency_released: u64,
    pub effects_alive: usize,
    pub effects_evicted: u64,
    pub effect_draw_calls: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    spawned: u64,
    refused: u64,
    expired_lifetime: u64,
    expired_distance: u64,
    out_of_bounds: u64,
    hits: u64,
    emergency_released: u64,
}

/// Facade over pools, collision index and effects.
pub struct ProjectileManager {
    config: VolleyConfig,
    pools: [ProjectilePool; FACTION_COUNT],
    index: CollisionIndex,
    effects: EffectsLayer,
    bounds: Option<ArenaBounds>,
    clock: f64,
    frames: u64,
    next_sequence: u64,
    counters: Counters,
    // Per-tick scratch, kept to avoid reallocating every frame.
    expired: Vec<(ProjectileHandle, ExpiryReason)>,
    doomed: Vec<ProjectileHandle>,
    samples: Vec<ProjectileSample>,
}

impl Default for ProjectileManager {
    fn default() -> Self {
        Self::build(VolleyConfig::default())
    }
}

impl ProjectileManager {
    /// Validate `config` and build a manager from it.
    pub fn new(config: VolleyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: VolleyConfig) -> Self {
        let mut visual_base = 0u32;
        let pools = Faction::ALL.map(|faction| {
            let fc = config.faction(faction);
            let pool = ProjectilePool::new(
                faction,
                fc.initial_pool_size,
                fc.max_pool_size,
                visual_base,
            );
            visual_base += fc.max_pool_size as u32;
            pool
        });

        tracing::debug!(
            max_projectiles = config.max_projectiles,
            player = config.player.max_pool_size,
            boss = config.boss.max_pool_size,
            minion = config.minion.max_pool_size,
            "projectile manager created"
        );

        Self {
            pools,
            index: CollisionIndex::new(config.grid_cell_size, config.max_collision_checks_per_frame),
            effects: EffectsLayer::new(config.effects),
            bounds: config.arena.bounds,
            clock: 0.0,
            frames: 0,
            next_sequence: 0,
            counters: Counters::default(),
            expired: Vec::new(),
            doomed: Vec::new(),
            samples: Vec::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Spawn a projectile with optional speed and damage overrides.
    ///
    /// Returns `None` without side effects when the global or faction cap
    /// is reached, or when `direction` has no length.
    pub fn spawn_projectile(
        &mut self,
        faction: Faction,
        origin: Vec3,
        direction: Vec3,
        speed: Option<f32>,
        damage: Option<f32>,
    ) -> Option<ProjectileHandle> {
        let params = SpawnParams {
            speed,
            damage,
            ..Default::default()
        };
        self.spawn_with(faction, origin, direction, params)
    }

    /// Spawn a player projectile with the faction defaults.
    pub fn spawn_player_projectile(&mut self, origin: Vec3, direction: Vec3) -> Option<ProjectileHandle> {
        self.spawn_projectile(Faction::Player, origin, direction, None, None)
    }

    /// Spawn a boss projectile with the faction defaults.
    pub fn spawn_boss_projectile(&mut self, origin: Vec3, direction: Vec3) -> Option<ProjectileHandle> {
        self.spawn_projectile(Faction::Boss, origin, direction, None, None)
    }

    /// Spawn a minion projectile with the faction defaults.
    pub fn spawn_minion_projectile(&mut self, origin: Vec3, direction: Vec3) -> Option<ProjectileHandle> {
        self.spawn_projectile(Faction::Minion, origin, direction, None, None)
    }

    /// Spawn a projectile with full control over its launch parameters.
    pub fn spawn_with(
        &mut self,
        faction: Faction,
        origin: Vec3,
        direction: Vec3,
        params: SpawnParams,
    ) -> Option<ProjectileHandle> {
        let active = self.active_count();
        if active >= self.config.max_projectiles {
            return self.refuse(faction, "global projectile cap reached");
        }
        let pool = &self.pools[faction.index()];
        if pool.in_use() >= pool.max_size() {
            return self.refuse(faction, "faction projectile cap reached");
        }
        let Some(heading) = direction.try_normalize() else {
            tracing::warn!(%faction, ?direction, "refusing spawn with zero-length direction");
            return self.refuse(faction, "zero-length direction");
        };

        let fc = *self.config.faction(faction);
        let speed = params.speed.unwrap_or(fc.default_speed).max(0.0);
        let damage = params.damage.unwrap_or(fc.default_damage).max(0.0);

        let handle = self.pools[faction.index()].acquire()?;
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let now = self.clock;
        let projectile = self.pools[faction.index()].get_mut(handle)?;
        projectile.damage = damage;
        projectile.acceleration = params.acceleration;
        projectile.time_to_live = finite_or(params.time_to_live, fc.time_to_live).max(0.0);
        projectile.max_travel_distance =
            finite_or(params.max_travel_distance, fc.max_travel_distance).max(0.0);
        projectile.radius = params.radius.unwrap_or(fc.radius).max(0.0);
        projectile.kind = params.kind.unwrap_or(fc.kind);
        projectile.spawn_sequence = sequence;
        projectile.launch(origin, heading * speed, now);

        self.counters.spawned += 1;

        // Cosmetic only; dropped first under load.
        let ratio = active as f32 / self.config.max_projectiles as f32;
        if ratio < self.config.effects_shed_ratio {
            self.effects
                .create_muzzle_flash(origin, fc.color, fc.muzzle_intensity);
            self.effects
                .create_projectile_glow(origin, fc.color, fc.muzzle_intensity);
        }

        tracing::trace!(%faction, slot = handle.slot, speed, damage, "projectile spawned");
        Some(handle)
    }

    fn refuse(&mut self, faction: Faction, reason: &'static str) -> Option<ProjectileHandle> {
        self.counters.refused += 1;
        tracing::debug!(%faction, reason, "spawn refused");
        None
    }

    // ------------------------------------------------------------------
    // Per-tick update
    // ------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds and return this tick's hits.
    ///
    /// `viewpoint` is used to sort effect batches back-to-front. Damage is
    /// applied through [`crate::game::CollisionTarget::take_damage`]; a
    /// panicking target aborts the remaining hits of this tick.
    pub fn update(&mut self, dt: f32, viewpoint: Vec3) -> Vec<CollisionResult> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if self.config.auto_emergency_cleanup {
            self.emergency_cleanup();
        }

        self.clock += f64::from(dt);
        self.frames += 1;

        self.advance_projectiles(dt);
        self.cull_out_of_bounds();

        self.samples.clear();
        for pool in &self.pools {
            self.samples
                .extend(pool.iter_active().map(|(handle, p)| ProjectileSample {
                    handle,
                    position: p.position,
                    radius: p.radius,
                    damage: p.damage,
                }));
        }
        let mut results = self.index.check_collisions(&self.samples);

        for result in &mut results {
            self.resolve_hit(result);
        }
        self.counters.hits += results.len() as u64;

        let positions = self
            .pools
            .iter()
            .flat_map(|pool| pool.iter_active().map(|(_, p)| p.position));
        self.effects.update_light(dt, positions);
        self.effects.update(dt, viewpoint);

        results
    }

    fn advance_projectiles(&mut self, dt: f32) {
        let now = self.clock;
        let mut expired = std::mem::take(&mut self.expired);
        expired.clear();
        for pool in &mut self.pools {
            pool.advance_all(dt, now, &mut expired);
        }
        for &(handle, reason) in &expired {
            match reason {
                ExpiryReason::Lifetime => self.counters.expired_lifetime += 1,
                ExpiryReason::Distance => self.counters.expired_distance += 1,
            }
            self.pools[handle.faction.index()].release(handle);
        }
        self.expired = expired;
    }

    fn cull_out_of_bounds(&mut self) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let margin = self.config.arena.out_of_bounds_margin;

        let mut doomed = std::mem::take(&mut self.doomed);
        doomed.clear();
        for pool in &self.pools {
            doomed.extend(
                pool.iter_active()
                    .filter(|(_, p)| !bounds.contains(p.position, margin))
                    .map(|(handle, _)| handle),
            );
        }
        for &handle in &doomed {
            self.pools[handle.faction.index()].release(handle);
        }
        self.counters.out_of_bounds += doomed.len() as u64;
        self.doomed = doomed;
    }

    fn resolve_hit(&mut self, result: &mut CollisionResult) {
        match result.target.try_borrow_mut() {
            Ok(mut target) => result.target_destroyed = target.take_damage(result.damage),
            Err(_) => tracing::warn!(
                faction = %result.target_faction,
                damage = result.damage,
                "target is borrowed elsewhere, skipping damage"
            ),
        }
        if result.target_destroyed {
            tracing::debug!(faction = %result.target_faction, "target destroyed");
        }

        let color = self.config.faction(result.projectile.faction).color;
        self.effects
            .create_impact_effect(result.position, color, self.config.impact_intensity);
        self.pools[result.projectile.faction.index()].release(result.projectile);
    }

    // ------------------------------------------------------------------
    // Load shedding
    // ------------------------------------------------------------------

    /// Release the oldest projectiles when the manager is close to its cap.
    ///
    /// Does nothing unless the active count exceeds `emergency_threshold`
    /// of `max_projectiles`. Otherwise releases `emergency_release_fraction`
    /// of the active projectiles (rounded up), oldest spawn first. Returns
    /// how many were released.
    pub fn emergency_cleanup(&mut self) -> usize {
        let active = self.active_count();
        let threshold = self.config.emergency_threshold * self.config.max_projectiles as f32;
        if active == 0 || active as f32 <= threshold {
            return 0;
        }

        let count = release_count(active, self.config.emergency_release_fraction);

        let mut oldest: Vec<(f64, u64, ProjectileHandle)> = self
            .pools
            .iter()
            .flat_map(|pool| pool.iter_active())
            .map(|(handle, p)| (p.spawn_time, p.spawn_sequence, handle))
            .collect();
        oldest.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let released = oldest
            .into_iter()
            .take(count)
            .filter(|&(_, _, handle)| self.pools[handle.faction.index()].release(handle))
            .count();

        self.counters.emergency_released += released as u64;
        tracing::info!(
            active,
            released,
            max_projectiles = self.config.max_projectiles,
            "emergency projectile cleanup"
        );
        released
    }

    // ------------------------------------------------------------------
    // Handles
    // ------------------------------------------------------------------

    /// Release one projectile early. Stale handles are a no-op.
    pub fn release_projectile(&mut self, handle: ProjectileHandle) -> bool {
        self.pools[handle.faction.index()].release(handle)
    }

    /// Active projectile behind `handle`.
    pub fn projectile(&self, handle: ProjectileHandle) -> Option<&Projectile> {
        self.pools[handle.faction.index()].get(handle)
    }

    /// Whether `handle` still refers to an active projectile.
    pub fn is_active(&self, handle: ProjectileHandle) -> bool {
        self.pools[handle.faction.index()].is_active(handle)
    }

    /// Release every projectile and drop every effect. Targets stay registered.
    pub fn clear_all(&mut self) -> usize {
        let released: usize = self.pools.iter_mut().map(ProjectilePool::release_all).sum();
        self.effects.clear();
        tracing::debug!(released, "cleared all projectiles");
        released
    }

    // ------------------------------------------------------------------
    // Targets
    // ------------------------------------------------------------------

    /// Register a damageable target. Duplicate registration is a no-op.
    pub fn register_target(&mut self, target: &TargetRef) -> bool {
        self.index.register_target(target)
    }

    /// Unregister a target. Returns `false` if it was not registered.
    pub fn unregister_target(&mut self, target: &TargetRef) -> bool {
        self.index.unregister_target(target)
    }

    /// Registered targets overlapping the sphere at `center`.
    pub fn targets_in_radius(&self, center: Vec3, radius: f32) -> Vec<TargetRef> {
        self.index.targets_in_radius(center, radius)
    }

    /// Re-bucket every registered target at its current position.
    pub fn refresh_targets(&mut self) {
        self.index.refresh_grid();
    }

    pub fn collision_index(&self) -> &CollisionIndex {
        &self.index
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    /// Retire projectiles that leave `bounds` (plus the configured margin).
    pub fn set_arena_bounds(&mut self, bounds: ArenaBounds) {
        tracing::debug!(?bounds, "arena bounds set");
        self.bounds = Some(bounds);
    }

    /// Stop culling projectiles by position.
    pub fn clear_arena_bounds(&mut self) {
        self.bounds = None;
    }

    pub fn arena_bounds(&self) -> Option<ArenaBounds> {
        self.bounds
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// One instance record per active projectile.
    pub fn projectile_instances(&self) -> Vec<ProjectileInstance> {
        let mut out = Vec::with_capacity(self.active_count());
        self.write_projectile_instances(&mut out);
        out
    }

    /// Append one instance record per active projectile to `out`.
    pub fn write_projectile_instances(&self, out: &mut Vec<ProjectileInstance>) {
        for pool in &self.pools {
            let faction = pool.faction();
            let tint = pack_color(self.config.faction(faction).color.to_array());
            out.extend(pool.iter_active_visuals().map(|(visual_id, p)| ProjectileInstance {
                position: p.position.to_array(),
                radius: p.radius,
                direction: p.velocity.normalize_or_zero().to_array(),
                kind: p.kind.as_u32(),
                tint,
                visual_id,
                faction: faction.index() as u32,
                _pad0: 0,
            }));
        }
    }

    pub fn effects(&self) -> &EffectsLayer {
        &self.effects
    }

    pub fn effects_mut(&mut self) -> &mut EffectsLayer {
        &mut self.effects
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Active projectiles across all factions.
    pub fn active_count(&self) -> usize {
        self.pools.iter().map(ProjectilePool::in_use).sum()
    }

    /// Active projectiles of one faction.
    pub fn active_count_for(&self, faction: Faction) -> usize {
        self.pools[faction.index()].in_use()
    }

    pub fn pool(&self, faction: Faction) -> &ProjectilePool {
        &self.pools[faction.index()]
    }

    /// Simulated seconds since construction.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn config(&self) -> &VolleyConfig {
        &self.config
    }

    pub fn stats(&self) -> ManagerStats {
        let pass = self.index.last_pass();
        ManagerStats {
            elapsed: self.clock,
            frames: self.frames,
            active_total: self.active_count(),
            max_projectiles: self.config.max_projectiles,
            pools: [
                self.pools[0].stats(),
                self.pools[1].stats(),
                self.pools[2].stats(),
            ],
            registered_targets: self.index.target_count(),
            collision_checks_last_frame: pass.checks,
            collisions_last_frame: pass.hits,
            deferred_last_frame: pass.deferred,
            spawned_total: self.counters.spawned,
            refused_spawns: self.counters.refused,
            expired_lifetime: self.counters.expired_lifetime,
            expired_distance: self.counters.expired_distance,
            out_of_bounds: self.counters.out_of_bounds,
            hits_total: self.counters.hits,
            emergency_released: self.counters.emergency_released,
            effects_alive: self.effects.total_alive(),
            effects_evicted: self.effects.evicted_total(),
            effect_draw_calls: self.effects.draw_call_count(),
        }
    }
}

/// `value` when it is a finite number, `fallback` otherwise.
fn finite_or(value: Option<f32>, fallback: f32) -> f32 {
    value.filter(|v| v.is_finite()).unwrap_or(fallback)
}

/// `ceil(active * fraction)`, at least one, at most `active`.
fn release_count(active: usize, fraction: f32) -> usize {
    // 0.3f32 is slightly above 0.3; keep 10 * 0.3 at 3 rather than 4.
    let exact = active as f32 * fraction - 1e-3;
    (exact.ceil().max(1.0) as usize).min(active)
}
