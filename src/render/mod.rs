//! Rendering host: backend contract, collaborators, and the accumulation
//! controller.
//!
//! ## Per-frame flow
//! ```text
//! surface size ──┐
//! scene dirty? ──┼─► Raytracer::render_frame ─► dispatch ─► readback ─► blend
//! camera/light ──┘         (resets sample_index when anything changed)
//! ```

mod backend;
mod camera;
mod film;
mod light;
mod tracer;

pub use backend::{
    slots, BufferId, ComputeBackend, Extent, KernelId, SlotId, TextureId, GROUP_SIZE,
    KERNEL_TRACE_RAYS,
};
pub use camera::Camera;
pub use film::Film;
pub use light::DirectionalLight;
pub use tracer::{FrameOutcome, Raytracer};
