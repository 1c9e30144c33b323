//! # Lucent
//!
//! Host-side driver for a progressive GPU path tracer. The GPU kernel itself
//! is an opaque compute backend; this crate owns everything around it: a
//! dirty-tracked scene of spheres, procedural non-overlap placement, and the
//! accumulation controller that converges noisy single-sample frames into a
//! clean image.
//!
//! ## Modules
//!
//! - [`scene`] - spheres, materials, the owning aggregator, placement
//! - [`render`] - backend contract, camera/light collaborators, films, and
//!   the [`Raytracer`](render::Raytracer) controller
//! - [`gpu`] - `wgpu` backend adapter (feature `gpu`, on by default)
//! - [`error`] - error types
//!
//! ## Example
//!
//! ```
//! use lucent::prelude::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let scene = Scene::generate(&PlacementConfig::default(), &mut rng).unwrap();
//! assert!(scene.spheres().len() <= 100);
//! ```
//!
//! Each frame the driver loop hands the controller the scene, camera, light,
//! current surface size, and an RNG; the controller re-uploads geometry and
//! resets accumulation exactly when something visible changed.

pub mod error;
pub mod render;
pub mod scene;

// wgpu backend adapter (optional, enabled with "gpu" feature)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export commonly used types
pub use error::{Error, Result};
pub use render::{Camera, ComputeBackend, DirectionalLight, Extent, Film, FrameOutcome, Raytracer};
pub use scene::{Material, PlacementConfig, Scene, Sphere};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::render::{
        Camera, ComputeBackend, DirectionalLight, Extent, Film, FrameOutcome, Raytracer,
    };
    pub use crate::scene::{
        scatter_spheres, Material, PlacementConfig, Scene, Sphere, SphereData,
    };
}
