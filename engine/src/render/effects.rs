//! Transient Combat Effects
//!
//! Muzzle flashes, projectile glows and impact bursts. Effects carry no
//! gameplay state: once created they are driven purely by their age and
//! disappear on their own. Each effect type lives in its own fixed-size
//! ring, so creating an effect never allocates and a full ring simply
//! evicts its oldest entry.
//!
//! After every [`EffectsLayer::update`] the live effects are republished
//! as one [`EffectBatch`] per type, ready for a single instanced draw each.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::instancing::{
    EffectInstance, create_instance_buffer, effect_instance_layout, write_instances,
};

/// Angular speed of the glow pulse (radians per second).
const GLOW_PULSE_RATE: f32 = 18.0;
/// Relative size swing of the glow pulse.
const GLOW_PULSE_AMPLITUDE: f32 = 0.15;
/// How much an impact grows over its lifetime (1.0 = doubles).
const IMPACT_EXPANSION: f32 = 1.5;

/// Effect archetype. Each one has its own ring and batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    MuzzleFlash,
    ProjectileGlow,
    Impact,
}

impl EffectKind {
    /// All kinds in batch order.
    pub const ALL: [EffectKind; 3] = [
        EffectKind::MuzzleFlash,
        EffectKind::ProjectileGlow,
        EffectKind::Impact,
    ];

    /// Stable index into per-kind arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            EffectKind::MuzzleFlash => 0,
            EffectKind::ProjectileGlow => 1,
            EffectKind::Impact => 2,
        }
    }

    /// Scale multiplier and opacity multiplier at normalized age `t`.
    ///
    /// `t` is clamped to `[0, 1]`; `age` is in seconds and only drives the
    /// glow pulse.
    pub fn ease(self, t: f32, age: f32) -> (f32, f32) {
        let t = t.clamp(0.0, 1.0);
        match self {
            EffectKind::MuzzleFlash => (1.0 - t, 1.0 - t),
            EffectKind::ProjectileGlow => {
                let pulse = 1.0 + GLOW_PULSE_AMPLITUDE * (age * GLOW_PULSE_RATE).sin();
                (pulse, 1.0 - t * t)
            }
            EffectKind::Impact => {
                let fade = 1.0 - t;
                (1.0 + t * IMPACT_EXPANSION, fade * fade)
            }
        }
    }
}

/// Per-kind tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectKindConfig {
    /// Ring capacity (maximum simultaneously live effects of this kind)
    pub capacity: usize,
    /// Seconds an effect stays visible
    pub lifetime: f32,
    /// Billboard size at full intensity
    pub base_scale: f32,
}

/// Configuration for the whole effects layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub muzzle_flash: EffectKindConfig,
    pub projectile_glow: EffectKindConfig,
    pub impact: EffectKindConfig,
    /// Recenter the shared light on active projectiles
    pub dynamic_light: bool,
    /// Seconds between shared light recenters
    pub light_update_interval: f32,
    /// Shared light intensity while projectiles are in flight
    pub light_intensity: f32,
    /// Shared light influence radius
    pub light_radius: f32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            muzzle_flash: EffectKindConfig {
                capacity: 64,
                lifetime: 0.08,
                base_scale: 0.8,
            },
            projectile_glow: EffectKindConfig {
                capacity: 128,
                lifetime: 0.25,
                base_scale: 0.5,
            },
            impact: EffectKindConfig {
                capacity: 64,
                lifetime: 0.35,
                base_scale: 1.2,
            },
            dynamic_light: true,
            light_update_interval: 0.1,
            light_intensity: 2.0,
            light_radius: 25.0,
        }
    }
}

impl EffectsConfig {
    /// Tuning for one kind.
    pub fn kind(&self, kind: EffectKind) -> &EffectKindConfig {
        match kind {
            EffectKind::MuzzleFlash => &self.muzzle_flash,
            EffectKind::ProjectileGlow => &self.projectile_glow,
            EffectKind::Impact => &self.impact,
        }
    }
}

/// One transient effect slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Effect {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Current billboard size after easing
    pub scale: f32,
    /// Current alpha after easing
    pub opacity: f32,
    pub lifetime: f32,
    pub spawn_time: f64,
    base_scale: f32,
    alive: bool,
}

impl Effect {
    const DEAD: Effect = Effect {
        position: Vec3::ZERO,
        color: Vec3::ZERO,
        intensity: 0.0,
        scale: 0.0,
        opacity: 0.0,
        lifetime: 0.0,
        spawn_time: 0.0,
        base_scale: 0.0,
        alive: false,
    };

    /// Whether the slot currently holds a visible effect.
    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    fn to_instance(self) -> EffectInstance {
        EffectInstance {
            position: self.position.to_array(),
            scale: self.scale,
            color: self.color.to_array(),
            opacity: self.opacity,
        }
    }
}

/// Fixed-capacity ring; writing into a live slot evicts it.
#[derive(Debug, Clone)]
struct EffectRing {
    slots: Vec<Effect>,
    next: usize,
    live: usize,
}

impl EffectRing {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Effect::DEAD; capacity],
            next: 0,
            live: 0,
        }
    }

    /// Returns true when a live effect was evicted.
    fn push(&mut self, effect: Effect) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let slot = &mut self.slots[self.next];
        let evicted = slot.alive;
        if !evicted {
            self.live += 1;
        }
        *slot = effect;
        self.next = (self.next + 1) % self.slots.len();
        evicted
    }

    fn clear(&mut self) {
        self.slots.fill(Effect::DEAD);
        self.next = 0;
        self.live = 0;
    }
}

/// All live instances of one effect kind.
#[derive(Debug, Clone)]
pub struct EffectBatch {
    pub kind: EffectKind,
    /// Sorted back-to-front relative to the last viewpoint
    pub instances: Vec<EffectInstance>,
}

/// The single light shared by all projectiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub radius: f32,
    pub enabled: bool,
}

/// Owner of every transient effect.
pub struct EffectsLayer {
    config: EffectsConfig,
    rings: [EffectRing; 3],
    batches: [EffectBatch; 3],
    time: f64,
    light: SharedLight,
    light_timer: f32,
    evicted: u64,
}

impl EffectsLayer {
    /// Create a layer with one ring per kind, sized from `config`.
    pub fn new(config: EffectsConfig) -> Self {
        let ring = |kind: EffectKind| EffectRing::new(config.kind(kind).capacity);
        let batch = |kind: EffectKind| EffectBatch {
            kind,
            instances: Vec::with_capacity(config.kind(kind).capacity),
        };
        Self {
            rings: EffectKind::ALL.map(ring),
            batches: EffectKind::ALL.map(batch),
            time: 0.0,
            light: SharedLight {
                position: Vec3::ZERO,
                color: Vec3::new(1.0, 0.85, 0.6),
                intensity: 0.0,
                radius: config.light_radius,
                enabled: false,
            },
            light_timer: 0.0,
            evicted: 0,
            config,
        }
    }

    fn spawn(&mut self, kind: EffectKind, position: Vec3, color: Vec3, intensity: f32) {
        let tuning = *self.config.kind(kind);
        let intensity = intensity.max(0.0);
        let effect = Effect {
            position,
            color,
            intensity,
            scale: tuning.base_scale * intensity,
            opacity: intensity,
            lifetime: tuning.lifetime,
            spawn_time: self.time,
            base_scale: tuning.base_scale * intensity,
            alive: true,
        };
        if self.rings[kind.index()].push(effect) {
            self.evicted += 1;
        }
    }

    /// Short flash at a muzzle. Shrinks and fades linearly.
    pub fn create_muzzle_flash(&mut self, position: Vec3, color: Vec3, intensity: f32) {
        self.spawn(EffectKind::MuzzleFlash, position, color, intensity);
    }

    /// Pulsing glow at a projectile's launch point.
    pub fn create_projectile_glow(&mut self, position: Vec3, color: Vec3, intensity: f32) {
        self.spawn(EffectKind::ProjectileGlow, position, color, intensity);
    }

    /// Expanding burst where a projectile hit something.
    pub fn create_impact_effect(&mut self, position: Vec3, color: Vec3, intensity: f32) {
        self.spawn(EffectKind::Impact, position, color, intensity);
    }

    /// Advance every effect by `dt`, cull expired ones and rebuild the batches.
    pub fn update(&mut self, dt: f32, viewpoint: Vec3) {
        self.time += f64::from(dt.max(0.0));
        let now = self.time;

        for (ring, batch) in self.rings.iter_mut().zip(self.batches.iter_mut()) {
            let kind = batch.kind;
            batch.instances.clear();

            for effect in ring.slots.iter_mut().filter(|e| e.alive) {
                let age = (now - effect.spawn_time) as f32;
                if age > effect.lifetime {
                    effect.alive = false;
                    ring.live -= 1;
                    continue;
                }

                let t = if effect.lifetime > 0.0 {
                    age / effect.lifetime
                } else {
                    1.0
                };
                let (scale, opacity) = kind.ease(t, age);
                effect.scale = effect.base_scale * scale;
                effect.opacity = effect.intensity * opacity;
                batch.instances.push(effect.to_instance());
            }

            batch.instances.sort_unstable_by(|a, b| {
                let da = Vec3::from_array(a.position).distance_squared(viewpoint);
                let db = Vec3::from_array(b.position).distance_squared(viewpoint);
                db.total_cmp(&da)
            });
        }
    }

    /// Recenter the shared light on the centroid of `positions`, at most
    /// once per `light_update_interval`.
    pub fn update_light<I>(&mut self, dt: f32, positions: I)
    where
        I: IntoIterator<Item = Vec3>,
    {
        if !self.config.dynamic_light {
            return;
        }
        self.light_timer += dt.max(0.0);
        if self.light_timer < self.config.light_update_interval {
            return;
        }
        self.light_timer = 0.0;

        let (sum, count) = positions
            .into_iter()
            .fold((Vec3::ZERO, 0u32), |(sum, n), p| (sum + p, n + 1));
        if count == 0 {
            self.light.enabled = false;
            self.light.intensity = 0.0;
        } else {
            self.light.position = sum / count as f32;
            self.light.enabled = true;
            self.light.intensity = self.config.light_intensity;
        }
    }

    /// Batch for one kind, as of the last update.
    pub fn batch(&self, kind: EffectKind) -> &EffectBatch {
        &self.batches[kind.index()]
    }

    /// All batches in [`EffectKind::ALL`] order.
    pub fn batches(&self) -> &[EffectBatch] {
        &self.batches
    }

    /// One instanced draw per non-empty batch.
    pub fn draw_call_count(&self) -> usize {
        self.batches.iter().filter(|b| !b.instances.is_empty()).count()
    }

    /// Live effects of one kind.
    pub fn alive_count(&self, kind: EffectKind) -> usize {
        self.rings[kind.index()].live
    }

    /// Live effects of every kind.
    pub fn total_alive(&self) -> usize {
        self.rings.iter().map(|r| r.live).sum()
    }

    /// Ring capacity for one kind.
    pub fn capacity(&self, kind: EffectKind) -> usize {
        self.rings[kind.index()].slots.len()
    }

    /// Live effects overwritten because their ring was full.
    pub fn evicted_total(&self) -> u64 {
        self.evicted
    }

    /// The shared projectile light.
    pub fn light(&self) -> &SharedLight {
        &self.light
    }

    /// Layer configuration.
    pub fn config(&self) -> &EffectsConfig {
        &self.config
    }

    /// Iterate live effects of one kind.
    pub fn iter(&self, kind: EffectKind) -> impl Iterator<Item = &Effect> {
        self.rings[kind.index()].slots.iter().filter(|e| e.alive)
    }

    /// Drop every effect and empty the batches.
    pub fn clear(&mut self) {
        for ring in &mut self.rings {
            ring.clear();
        }
        for batch in &mut self.batches {
            batch.instances.clear();
        }
        self.light.enabled = false;
        self.light.intensity = 0.0;
    }
}

/// GPU-side instance buffers, one per effect kind.
pub struct EffectGpuBuffers {
    buffers: [wgpu::Buffer; 3],
    capacities: [usize; 3],
    counts: [u32; 3],
}

impl EffectGpuBuffers {
    /// Allocate buffers large enough for every ring of `config`.
    pub fn new(device: &wgpu::Device, config: &EffectsConfig) -> Self {
        let capacities = EffectKind::ALL.map(|kind| config.kind(kind).capacity);
        let labels = ["Muzzle Flash Instances", "Projectile Glow Instances", "Impact Instances"];
        let buffers = [0, 1, 2]
            .map(|i| create_instance_buffer::<EffectInstance>(device, capacities[i], Some(labels[i])));
        Self {
            buffers,
            capacities,
            counts: [0; 3],
        }
    }

    /// Copy the current batches of `layer` to the GPU.
    pub fn upload(&mut self, queue: &wgpu::Queue, layer: &EffectsLayer) {
        for kind in EffectKind::ALL {
            let i = kind.index();
            let written = write_instances(
                queue,
                &self.buffers[i],
                &layer.batch(kind).instances,
                self.capacities[i],
            );
            self.counts[i] = written as u32;
        }
    }

    /// Draw every non-empty batch with one instanced call each.
    ///
    /// The caller binds the pipeline (built with [`effect_instance_layout`]
    /// at slot 1) and any camera bind groups; slot 0 is left to the quad mesh.
    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        for i in 0..3 {
            if self.counts[i] == 0 {
                continue;
            }
            render_pass.set_vertex_buffer(1, self.buffers[i].slice(..));
            render_pass.draw(0..6, 0..self.counts[i]);
        }
    }

    /// Instance buffer for one kind.
    pub fn buffer(&self, kind: EffectKind) -> &wgpu::Buffer {
        &self.buffers[kind.index()]
    }

    /// Vertex layout the effect pipeline must use for the instance slot.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        effect_instance_layout()
    }
}
