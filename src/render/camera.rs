//! Render camera collaborator.

use glam::{Mat4, Vec3};

const OPENGL_TO_WGPU_MATRIX: Mat4 = Mat4::from_cols_array(&[
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
]);

/// Perspective camera with change tracking.
///
/// The controller queries [`Camera::take_changed`] once per frame; any
/// transform or lens edit since the previous query invalidates accumulated
/// samples even when no scene object moved.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera-to-world transform.
    transform: Mat4,
    /// Vertical field of view in radians.
    fov_y: f32,
    near: f32,
    far: f32,
    changed: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            fov_y: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            changed: true,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the camera at `eye` looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.set_transform(Mat4::look_at_rh(eye, target, up).inverse());
    }

    /// Replace the camera-to-world transform.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.changed = true;
    }

    /// Change the vertical field of view (radians).
    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y;
        self.changed = true;
    }

    pub fn camera_to_world(&self) -> Mat4 {
        self.transform
    }

    pub fn world_to_camera(&self) -> Mat4 {
        self.transform.inverse()
    }

    /// Projection matrix in wgpu depth convention (0..1, no Y flip).
    pub fn projection(&self, aspect: f32) -> Mat4 {
        OPENGL_TO_WGPU_MATRIX * Mat4::perspective_rh(self.fov_y, aspect, self.near, self.far)
    }

    /// Inverse projection, fed to the kernel for ray generation.
    pub fn inverse_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect).inverse()
    }

    /// True if the camera changed since the previous query; clears the flag.
    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }
}
