//! Procedural sphere placement: rejection-sampled circle packing.
//!
//! Spheres are scattered over a disk in the ground plane, resting tangent to
//! it (center height = radius). A candidate position is accepted only if the
//! new sphere overlaps none of the spheres placed so far; after a bounded
//! number of failed attempts the slot is skipped. Skipping is best-effort
//! policy, not an error — callers that need an exact count check the length
//! of the result.

use glam::{Vec2, Vec3};
use rand::Rng;
use tracing::debug;

use crate::error::{Error, Result};

use super::material::{hsv_to_rgb, Material};
use super::sphere::Sphere;

/// Metallic-vs-dielectric split for generated materials.
const METALLIC_PROBABILITY: f64 = 0.5;

/// Placement parameters. Validated with [`PlacementConfig::validate`];
/// out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlacementConfig {
    /// Smallest sphere radius drawn. Must be positive.
    pub min_radius: f32,
    /// Largest sphere radius drawn. Must be >= `min_radius`.
    pub max_radius: f32,
    /// Specular tint factor for dielectric surfaces, in `[0, 1]`.
    pub specular_factor: f32,
    /// Upper bound on the number of spheres produced.
    pub max_spheres: usize,
    /// Radius of the placement disk in the ground plane. Must be positive.
    pub placement_radius: f32,
    /// Position draws per sphere before its slot is skipped. Must be >= 1.
    pub max_attempts: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_radius: 0.3,
            max_radius: 1.2,
            specular_factor: 0.04,
            max_spheres: 100,
            placement_radius: 10.0,
            max_attempts: 10,
        }
    }
}

impl PlacementConfig {
    /// Check every invariant, reporting the first violation.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_radius > 0.0) {
            return Err(Error::config(format!(
                "minimum radius must be positive, got {}",
                self.min_radius
            )));
        }
        if self.min_radius > self.max_radius {
            return Err(Error::config(format!(
                "minimum radius {} exceeds maximum radius {}",
                self.min_radius, self.max_radius
            )));
        }
        if !(0.0..=1.0).contains(&self.specular_factor) {
            return Err(Error::config(format!(
                "specular factor must lie in [0, 1], got {}",
                self.specular_factor
            )));
        }
        if !(self.placement_radius > 0.0) {
            return Err(Error::config(format!(
                "placement radius must be positive, got {}",
                self.placement_radius
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::config("placement attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Scatter up to `config.max_spheres` non-overlapping spheres over the
/// placement disk. Deterministic for a given `rng` stream.
pub fn scatter_spheres<R: Rng>(config: &PlacementConfig, rng: &mut R) -> Result<Vec<Sphere>> {
    config.validate()?;

    let mut spheres: Vec<Sphere> = Vec::with_capacity(config.max_spheres);

    for _ in 0..config.max_spheres {
        let radius = rng.gen_range(config.min_radius..=config.max_radius);

        let mut position = None;
        for _ in 0..config.max_attempts {
            let p = point_in_unit_disk(rng) * config.placement_radius;
            let candidate = Vec3::new(p.x, radius, p.y);
            if fits(&spheres, candidate, radius) {
                position = Some(candidate);
                break;
            }
        }
        let Some(position) = position else {
            continue;
        };

        let color = hsv_to_rgb(rng.gen(), rng.gen(), rng.gen());
        let material = if rng.gen_bool(METALLIC_PROBABILITY) {
            Material::Metallic { specular: color }
        } else {
            Material::Dielectric {
                albedo: color,
                specular: color * config.specular_factor,
            }
        };

        spheres.push(Sphere::new(position, radius, material));
    }

    debug!(
        placed = spheres.len(),
        requested = config.max_spheres,
        "sphere placement finished"
    );
    Ok(spheres)
}

/// Overlap test against everything placed so far in this run.
fn fits(placed: &[Sphere], position: Vec3, radius: f32) -> bool {
    placed
        .iter()
        .all(|s| position.distance(s.position()) >= radius + s.radius())
}

/// Uniform point in the unit disk via rejection sampling on the unit square.
fn point_in_unit_disk<R: Rng>(rng: &mut R) -> Vec2 {
    loop {
        let p = Vec2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}
