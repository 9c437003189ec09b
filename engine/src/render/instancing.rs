//! GPU Instance Records for Projectiles and Effects
//!
//! The simulation never draws anything itself. It publishes flat,
//! `Pod` instance records that a renderer can copy straight into a
//! vertex buffer and draw with one instanced call per batch.

use wgpu::util::DeviceExt;

/// GPU instance data for one transient effect billboard.
///
/// Layout (32 bytes total):
/// - position: vec3<f32> (12 bytes) - World position
/// - scale:    f32       (4 bytes)  - Billboard size after easing
/// - color:    vec3<f32> (12 bytes) - RGB color (HDR allowed)
/// - opacity:  f32       (4 bytes)  - Alpha after easing
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct EffectInstance {
    pub position: [f32; 3],
    pub scale: f32,
    pub color: [f32; 3],
    pub opacity: f32,
}

static_assertions::assert_eq_size!(EffectInstance, [u8; 32]);

/// GPU instance data for one live projectile.
///
/// Layout (48 bytes total):
/// - position:  vec3<f32> (12 bytes) - World position
/// - radius:    f32       (4 bytes)  - Collision radius, used as draw scale
/// - direction: vec3<f32> (12 bytes) - Normalized heading (zero when at rest)
/// - kind:      u32       (4 bytes)  - ProjectileKind id
/// - tint:      u32       (4 bytes)  - Packed RGBA (0xRRGGBBAA)
/// - visual_id: u32       (4 bytes)  - Stable id of the pooled visual slot
/// - faction:   u32       (4 bytes)  - Faction index
/// - _pad0:     u32       (4 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ProjectileInstance {
    pub position: [f32; 3],
    pub radius: f32,
    pub direction: [f32; 3],
    pub kind: u32,
    pub tint: u32,
    pub visual_id: u32,
    pub faction: u32,
    pub _pad0: u32,
}

static_assertions::assert_eq_size!(ProjectileInstance, [u8; 48]);

/// Pack RGBA color components into a single u32 value.
/// Format: 0xRRGGBBAA
#[inline]
pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((r as u32) << 24) | ((g as u32) << 16) | ((b as u32) << 8) | (a as u32)
}

/// Unpack a u32 color value into RGBA components.
#[inline]
pub fn unpack_rgba(packed: u32) -> (u8, u8, u8, u8) {
    let r = ((packed >> 24) & 0xFF) as u8;
    let g = ((packed >> 16) & 0xFF) as u8;
    let b = ((packed >> 8) & 0xFF) as u8;
    let a = (packed & 0xFF) as u8;
    (r, g, b, a)
}

/// Pack a linear `[0, 1]` RGB color (values above 1 are clamped) with full alpha.
pub fn pack_color(color: [f32; 3]) -> u32 {
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    pack_rgba(to_u8(color[0]), to_u8(color[1]), to_u8(color[2]), 0xFF)
}

/// Create an empty instance buffer for `capacity` records of `T`.
pub fn create_instance_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    capacity: usize,
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label,
        size: (capacity.max(1) * std::mem::size_of::<T>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Create an instance buffer initialized with `instances`.
pub fn create_instance_buffer_init<T: bytemuck::Pod>(
    device: &wgpu::Device,
    instances: &[T],
    label: Option<&str>,
) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label,
        contents: bytemuck::cast_slice(instances),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    })
}

/// Write `instances` to the start of `buffer`, truncated to `capacity` records.
///
/// Returns the number of records written.
pub fn write_instances<T: bytemuck::Pod>(
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    instances: &[T],
    capacity: usize,
) -> usize {
    let count = instances.len().min(capacity);
    if count > 0 {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&instances[..count]));
    }
    count
}

// Location 0 is the per-vertex quad/mesh position in slot 0.
const EFFECT_ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
    1 => Float32x3,
    2 => Float32,
    3 => Float32x3,
    4 => Float32
];

const PROJECTILE_ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
    1 => Float32x3,
    2 => Float32,
    3 => Float32x3,
    4 => Uint32,
    5 => Uint32,
    6 => Uint32,
    7 => Uint32
];

/// Vertex buffer layout for [`EffectInstance`].
pub fn effect_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<EffectInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &EFFECT_ATTRIBUTES,
    }
}

/// Vertex buffer layout for [`ProjectileInstance`]. `_pad0` is not bound.
pub fn projectile_instance_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<ProjectileInstance>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &PROJECTILE_ATTRIBUTES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_rgba() {
        let packed = pack_rgba(255, 128, 64, 200);
        assert_eq!(unpack_rgba(packed), (255, 128, 64, 200));
    }

    #[test]
    fn test_pack_color_clamps_hdr() {
        assert_eq!(pack_color([2.0, 0.0, 1.0]), 0xFF00FFFF);
    }

    #[test]
    fn test_effect_layout_offsets() {
        let layout = effect_instance_layout();
        assert_eq!(layout.array_stride, 32);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 28]);
    }

    #[test]
    fn test_projectile_layout_offsets() {
        let layout = projectile_instance_layout();
        assert_eq!(layout.array_stride, 48);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 16, 28, 32, 36, 40]);
    }

    #[test]
    fn test_instances_are_pod() {
        let instance = EffectInstance {
            position: [1.0, 2.0, 3.0],
            scale: 0.5,
            color: [1.0, 0.5, 0.0],
            opacity: 0.25,
        };
        let bytes = bytemuck::bytes_of(&instance);
        assert_eq!(bytes.len(), 32);
        let back: &EffectInstance = bytemuck::from_bytes(bytes);
        assert_eq!(*back, instance);
    }
}
