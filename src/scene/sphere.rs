//! Sphere scene objects and their GPU transfer record.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::Material;

/// Per-sphere geometry record in kernel layout (48 bytes, matches the
/// `Spheres` storage buffer element on the GPU side).
///
/// Metallic surfaces are encoded with a black albedo; the host-side
/// [`Material`] tag is authoritative.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SphereData {
    pub position: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 4],
    pub specular: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<SphereData>() == 48);

/// A sphere in the scene: geometry, material, and change tracking.
///
/// Mutation goes through the setters; [`Sphere::is_dirty`] reports whether
/// anything observable changed since the last [`Sphere::clear_dirty`]. The
/// serialized record is memoized and recomputed only after a mutation
/// invalidates it.
#[derive(Debug, Clone)]
pub struct Sphere {
    position: Vec3,
    radius: f32,
    material: Material,

    // Change tracking: transform edits raise a flag, material edits are
    // detected by comparison against the baseline recorded at clear_dirty.
    transform_dirty: bool,
    baseline_material: Material,

    cached: SphereData,
    cache_valid: bool,
}

impl Sphere {
    /// Create a sphere. Freshly created spheres report dirty until the
    /// owning scene acknowledges them.
    pub fn new(position: Vec3, radius: f32, material: Material) -> Self {
        Self {
            position,
            radius,
            material,
            transform_dirty: true,
            baseline_material: material,
            cached: SphereData::zeroed(),
            cache_valid: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn material(&self) -> Material {
        self.material
    }

    /// Replace all geometric and material state atomically.
    pub fn set_values(&mut self, position: Vec3, radius: f32, material: Material) {
        self.position = position;
        self.radius = radius;
        self.material = material;
        self.transform_dirty = true;
        self.cache_valid = false;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.transform_dirty = true;
        self.cache_valid = false;
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
        self.transform_dirty = true;
        self.cache_valid = false;
    }

    pub fn set_material(&mut self, material: Material) {
        self.material = material;
        self.cache_valid = false;
    }

    /// True if the transform was touched or the material differs from the
    /// baseline recorded at the last [`Sphere::clear_dirty`].
    pub fn is_dirty(&self) -> bool {
        self.transform_dirty || self.material != self.baseline_material
    }

    /// Record the current state as the new baseline. Idempotent.
    pub fn clear_dirty(&mut self) {
        self.transform_dirty = false;
        self.baseline_material = self.material;
    }

    /// The kernel-layout record for this sphere, recomputed only when a
    /// mutation has invalidated the cache.
    pub fn data(&mut self) -> SphereData {
        if !self.cache_valid {
            let albedo = self.material.albedo();
            let specular = self.material.specular();
            self.cached = SphereData {
                position: self.position.to_array(),
                radius: self.radius,
                albedo: [albedo.x, albedo.y, albedo.z, 1.0],
                specular: [specular.x, specular.y, specular.z, 1.0],
            };
            self.cache_valid = true;
        }
        self.cached
    }
}
