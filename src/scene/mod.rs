//! Scene model: spheres, materials, the owning aggregator, and procedural
//! placement.
//!
//! - [`Sphere`] / [`SphereData`] - scene object and its GPU transfer record
//! - [`Material`] - tagged dielectric/metallic surface description
//! - [`Scene`] - owns the collection, aggregates dirty state
//! - [`PlacementConfig`] / [`scatter_spheres`] - non-overlap packing

mod material;
mod placement;
#[allow(clippy::module_inception)]
mod scene;
mod sphere;

pub use material::{hsv_to_rgb, Material};
pub use placement::{scatter_spheres, PlacementConfig};
pub use scene::Scene;
pub use sphere::{Sphere, SphereData};
