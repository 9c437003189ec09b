//! Physics type re-exports from glam

pub use glam::Vec3;
