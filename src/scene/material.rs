//! Surface materials for spheres.
//!
//! The kernel's wire format carries an albedo/specular color pair per sphere,
//! with a black albedo meaning "metallic". Host code uses an explicit tag
//! instead; the convention only reappears at serialization time in
//! [`Sphere::data`](super::Sphere::data).

use glam::Vec3;

/// Surface material of a sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Colored diffuse surface with a (usually faint) specular tint.
    Dielectric { albedo: Vec3, specular: Vec3 },
    /// Mirror-like surface; the color lives entirely in the specular term.
    Metallic { specular: Vec3 },
}

impl Material {
    /// Diffuse reflectance. Black for metals.
    pub fn albedo(&self) -> Vec3 {
        match *self {
            Material::Dielectric { albedo, .. } => albedo,
            Material::Metallic { .. } => Vec3::ZERO,
        }
    }

    /// Specular reflectance.
    pub fn specular(&self) -> Vec3 {
        match *self {
            Material::Dielectric { specular, .. } => specular,
            Material::Metallic { specular } => specular,
        }
    }

    /// Representative display color: the albedo for dielectrics, the
    /// specular color for metals.
    pub fn surface_color(&self) -> Vec3 {
        match *self {
            Material::Dielectric { albedo, .. } => albedo,
            Material::Metallic { specular } => specular,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Dielectric {
            albedo: Vec3::splat(0.8),
            specular: Vec3::splat(0.05),
        }
    }
}

/// Convert an HSV triple (all components in `[0, 1]`) to linear RGB.
///
/// Hue wraps; saturation and value are used as-is.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let h = (h.fract() + 1.0).fract() * 6.0;
    let i = h.floor();
    let f = h - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match i as u32 % 6 {
        0 => Vec3::new(v, t, p),
        1 => Vec3::new(q, v, p),
        2 => Vec3::new(p, v, t),
        3 => Vec3::new(p, q, v),
        4 => Vec3::new(t, p, v),
        _ => Vec3::new(v, p, q),
    }
}
