//! Render Module
//!
//! Renderer-facing data for projectiles and effects. Nothing here owns a
//! window or a pipeline; the owning application draws the published
//! instance batches however it likes.

pub mod effects;
pub mod instancing;

pub use effects::{
    Effect, EffectBatch, EffectGpuBuffers, EffectKind, EffectKindConfig, EffectsConfig,
    EffectsLayer, SharedLight,
};
pub use instancing::{
    EffectInstance, ProjectileInstance, create_instance_buffer, create_instance_buffer_init,
    effect_instance_layout, pack_color, pack_rgba, projectile_instance_layout, unpack_rgba,
    write_instances,
};
