//! Lights
//!
//! Lights are plain POD blocks, shaped exactly as the shaders read them from
//! the storage buffers: two vec4s per light, with range/intensity packed
//! into the fourth components.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Point light. `position_range.w` is the cutoff range.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLight {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl PointLight {
    #[must_use]
    pub fn new(position: Vec3, range: f32, color: Vec3, intensity: f32) -> Self {
        Self {
            position_range: [position.x, position.y, position.z, range],
            color_intensity: [color.x, color.y, color.z, intensity],
        }
    }

    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::new(
            self.position_range[0],
            self.position_range[1],
            self.position_range[2],
        )
    }
}

/// Directional light. Direction points from the light toward the scene.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DirectionalLight {
    pub direction: [f32; 4],
    pub color_intensity: [f32; 4],
}

impl DirectionalLight {
    #[must_use]
    pub fn new(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        let direction = direction.normalize_or_zero();
        Self {
            direction: [direction.x, direction.y, direction.z, 0.0],
            color_intensity: [color.x, color.y, color.z, intensity],
        }
    }
}
