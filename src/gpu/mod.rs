//! `wgpu`-backed compute backend (feature `gpu`).
//!
//! The host owns the device and queue (and the WGSL kernel source); this
//! module adapts them to the [`ComputeBackend`](crate::render::ComputeBackend)
//! contract the controller drives.
//!
//! ```ignore
//! let mut backend = WgpuBackend::new(device, queue);
//! backend.register_kernel(&KernelDesc {
//!     name: "TraceRays",
//!     source: TRACE_RAYS_WGSL,
//!     entry_point: "main",
//!     params_binding: Some(0),
//!     bindings: &[
//!         ("Result", SlotBinding::StorageTexture { binding: 1 }),
//!         ("Spheres", SlotBinding::StorageBuffer { binding: 2 }),
//!         ("SkyboxTexture", SlotBinding::SampledTexture { binding: 3, sampler_binding: 4 }),
//!         ("CameraToWorld", SlotBinding::Uniform { offset: 0, size: 64 }),
//!         ("CameraInverseProjection", SlotBinding::Uniform { offset: 64, size: 64 }),
//!         ("DirectionalLight", SlotBinding::Uniform { offset: 128, size: 16 }),
//!         ("PixelOffset", SlotBinding::Uniform { offset: 144, size: 16 }),
//!         ("Sample", SlotBinding::Uniform { offset: 160, size: 4 }),
//!     ],
//! })?;
//! let tracer = Raytracer::new(backend, &mut scene, extent, None)?;
//! ```

mod backend;

pub use backend::{KernelDesc, SlotBinding, WgpuBackend};
