//! Directional light collaborator.

use glam::{Vec3, Vec4};

/// Single directional light with change tracking.
///
/// Packed for the kernel as `vec4(direction, intensity)`.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    direction: Vec3,
    intensity: f32,
    changed: bool,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::NEG_Y,
            intensity: 1.0,
            changed: true,
        }
    }
}

impl DirectionalLight {
    /// Light shining along `direction` (normalized on the way in).
    pub fn new(direction: Vec3, intensity: f32) -> Self {
        Self {
            direction: direction.normalize(),
            intensity,
            changed: true,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = direction.normalize();
        self.changed = true;
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
        self.changed = true;
    }

    /// Kernel encoding: xyz = forward direction, w = intensity.
    pub fn encode(&self) -> Vec4 {
        self.direction.extend(self.intensity)
    }

    /// True if the light changed since the previous query; clears the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}
