//! The compute backend contract.
//!
//! The controller drives an opaque compute kernel through this trait: named
//! kernels and parameter slots are resolved once at setup, resources are
//! created and bound explicitly, and a dispatch covers the output in 8x8
//! work-group tiles. Implementations decide what a kernel actually is — a
//! WGSL module on a `wgpu` device (see the `gpu` module) or an in-memory
//! stand-in for tests.

use glam::{Mat4, Vec4};

use crate::error::Result;
use crate::render::film::Film;

/// Kernel entry point expected by the controller.
pub const KERNEL_TRACE_RAYS: &str = "TraceRays";

/// Stable slot names, resolved once at controller setup.
pub mod slots {
    pub const RESULT: &str = "Result";
    pub const CAMERA_TO_WORLD: &str = "CameraToWorld";
    pub const CAMERA_INVERSE_PROJECTION: &str = "CameraInverseProjection";
    pub const SKYBOX_TEXTURE: &str = "SkyboxTexture";
    pub const PIXEL_OFFSET: &str = "PixelOffset";
    pub const DIRECTIONAL_LIGHT: &str = "DirectionalLight";
    pub const SPHERES: &str = "Spheres";
    pub const SAMPLE: &str = "Sample";
}

/// Work-group tile edge; dispatches cover the output in 8x8 blocks.
pub const GROUP_SIZE: u32 = 8;

/// Opaque kernel handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId(pub u32);

/// Opaque parameter-slot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u32);

/// Opaque buffer handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Opaque texture handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Output dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Work-group counts covering this extent in [`GROUP_SIZE`] tiles.
    pub fn group_counts(&self) -> (u32, u32) {
        (
            self.width.div_ceil(GROUP_SIZE),
            self.height.div_ceil(GROUP_SIZE),
        )
    }
}

/// Narrow boundary between the controller and the compute implementation.
///
/// Ordering contract: work enqueued by [`ComputeBackend::dispatch`] must be
/// complete (or guaranteed ordered) by the time a subsequent
/// [`ComputeBackend::read_texture`] on the dispatch target returns. The
/// controller relies on this for the dispatch-then-blend sequence; it is not
/// advisory.
pub trait ComputeBackend {
    /// Resolve a kernel by stable name.
    fn kernel(&mut self, name: &str) -> Result<KernelId>;

    /// Resolve a parameter slot by stable name.
    fn slot(&mut self, name: &str) -> Result<SlotId>;

    /// Allocate an RGBA32F texture of the given extent.
    fn create_texture(&mut self, extent: Extent) -> Result<TextureId>;

    /// Release a texture. Releasing an already-released handle is a no-op.
    fn release_texture(&mut self, texture: TextureId);

    /// Allocate a storage buffer initialized with `contents`.
    fn create_buffer(&mut self, contents: &[u8]) -> Result<BufferId>;

    /// Release a buffer. Releasing an already-released handle is a no-op.
    fn release_buffer(&mut self, buffer: BufferId);

    /// Bind a buffer to a kernel slot.
    fn set_buffer(&mut self, kernel: KernelId, slot: SlotId, buffer: BufferId) -> Result<()>;

    /// Bind a texture to a kernel slot.
    fn set_texture(&mut self, kernel: KernelId, slot: SlotId, texture: TextureId) -> Result<()>;

    /// Set a matrix parameter.
    fn set_matrix(&mut self, slot: SlotId, value: Mat4) -> Result<()>;

    /// Set a vector parameter.
    fn set_vector(&mut self, slot: SlotId, value: Vec4) -> Result<()>;

    /// Set a float parameter.
    fn set_float(&mut self, slot: SlotId, value: f32) -> Result<()>;

    /// Set an integer parameter.
    fn set_int(&mut self, slot: SlotId, value: i32) -> Result<()>;

    /// Execute a kernel over the addressed work-group grid.
    fn dispatch(&mut self, kernel: KernelId, groups_x: u32, groups_y: u32, groups_z: u32)
        -> Result<()>;

    /// Copy a texture's contents into `out`, resizing it to the texture's
    /// extent if necessary.
    fn read_texture(&mut self, texture: TextureId, out: &mut Film) -> Result<()>;
}
