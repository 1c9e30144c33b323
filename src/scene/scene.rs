//! Scene aggregator: owns the sphere collection and its dirty state.

use rand::Rng;

use crate::error::Result;

use super::placement::{scatter_spheres, PlacementConfig};
use super::sphere::Sphere;

/// Owns an ordered collection of [`Sphere`]s.
///
/// Order carries no meaning but is stable, so geometry uploads are
/// reproducible. The scene is the only place that clears dirty flags; the
/// controller calls [`Scene::clear_all_dirty`] in the same frame step that
/// observed [`Scene::is_dirty`] returning true.
#[derive(Debug, Default)]
pub struct Scene {
    spheres: Vec<Sphere>,
}

impl Scene {
    /// An empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scene from pre-existing spheres.
    pub fn from_spheres(spheres: Vec<Sphere>) -> Self {
        Self { spheres }
    }

    /// Populate a fresh scene procedurally. The result may hold fewer than
    /// `config.max_spheres` spheres if placement attempts run out.
    pub fn generate<R: Rng>(config: &PlacementConfig, rng: &mut R) -> Result<Self> {
        Ok(Self::from_spheres(scatter_spheres(config, rng)?))
    }

    pub fn push(&mut self, sphere: Sphere) {
        self.spheres.push(sphere);
    }

    /// Remove all spheres.
    pub fn clear(&mut self) {
        self.spheres.clear();
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn sphere_mut(&mut self, index: usize) -> Option<&mut Sphere> {
        self.spheres.get_mut(index)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sphere> + '_ {
        self.spheres.iter_mut()
    }

    /// True if any sphere changed since its last acknowledgement.
    /// Short-circuits on the first dirty member.
    pub fn is_dirty(&self) -> bool {
        self.spheres.iter().any(Sphere::is_dirty)
    }

    /// Acknowledge every sphere's current state.
    pub fn clear_all_dirty(&mut self) {
        for sphere in &mut self.spheres {
            sphere.clear_dirty();
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::Material;

    fn sphere_at(x: f32) -> Sphere {
        Sphere::new(Vec3::new(x, 1.0, 0.0), 1.0, Material::default())
    }

    #[test]
    fn test_empty_scene_is_clean() {
        assert!(!Scene::new().is_dirty());
    }

    #[test]
    fn test_dirty_is_or_over_members() {
        let mut scene = Scene::from_spheres(vec![sphere_at(0.0), sphere_at(3.0)]);
        assert!(scene.is_dirty());
        scene.clear_all_dirty();
        assert!(!scene.is_dirty());

        scene.sphere_mut(1).unwrap().set_radius(0.5);
        assert!(scene.is_dirty());
        scene.clear_all_dirty();
        assert!(!scene.is_dirty());
    }

    #[test]
    fn test_pushed_sphere_marks_scene_dirty() {
        let mut scene = Scene::new();
        scene.clear_all_dirty();
        scene.push(sphere_at(0.0));
        assert!(scene.is_dirty());
    }
}
