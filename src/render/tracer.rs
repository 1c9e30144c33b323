//! Progressive path-tracing controller.
//!
//! Owns the accumulation state machine and every backend resource:
//!
//! ```text
//! new() ──► Ready ──render_frame()──► Rendering ──► Ready ...
//!             │ resize / scene dirty / view change => sample_index = 0
//!             └──release() / shutdown() ──► resources returned
//! ```
//!
//! Each frame: resize check, geometry re-upload on scene dirt, accumulation
//! reset on camera/light movement, per-frame parameter assembly, one 8x8-tiled
//! dispatch into the raw frame, then an unbiased running-mean blend into the
//! accumulation film.

use bytemuck::Zeroable;
use glam::Vec4;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::Result;
use crate::scene::{Scene, SphereData};

use super::backend::{
    slots, BufferId, ComputeBackend, Extent, KernelId, SlotId, TextureId, KERNEL_TRACE_RAYS,
};
use super::camera::Camera;
use super::film::Film;
use super::light::DirectionalLight;

/// Result of one frame step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was dispatched and blended; `samples` is the number of
    /// samples accumulated so far for the current view.
    Rendered { samples: u32 },
    /// The backend refused the dispatch or readback; state is unchanged and
    /// the next frame retries.
    Skipped,
}

/// Parameter slots resolved once at setup.
#[derive(Debug, Clone, Copy)]
struct ResolvedSlots {
    result: SlotId,
    camera_to_world: SlotId,
    camera_inverse: SlotId,
    skybox: SlotId,
    pixel_offset: SlotId,
    light: SlotId,
    spheres: SlotId,
    sample: SlotId,
}

/// Progressive renderer driving a [`ComputeBackend`].
///
/// Exclusively owns the geometry buffer and output texture once allocated;
/// the scene and placer never touch backend resources.
pub struct Raytracer<B: ComputeBackend> {
    backend: B,
    kernel: KernelId,
    slots: ResolvedSlots,
    extent: Extent,
    target: Option<TextureId>,
    geometry: Option<BufferId>,
    raw: Film,
    accum: Film,
    sample_index: u32,
}

impl<B: ComputeBackend> Raytracer<B> {
    /// Set up the controller: resolve kernel and slots, allocate the output
    /// texture and films, bind the optional skybox, and upload the initial
    /// geometry.
    pub fn new(
        mut backend: B,
        scene: &mut Scene,
        extent: Extent,
        skybox: Option<TextureId>,
    ) -> Result<Self> {
        let kernel = backend.kernel(KERNEL_TRACE_RAYS)?;
        let resolved = ResolvedSlots {
            result: backend.slot(slots::RESULT)?,
            camera_to_world: backend.slot(slots::CAMERA_TO_WORLD)?,
            camera_inverse: backend.slot(slots::CAMERA_INVERSE_PROJECTION)?,
            skybox: backend.slot(slots::SKYBOX_TEXTURE)?,
            pixel_offset: backend.slot(slots::PIXEL_OFFSET)?,
            light: backend.slot(slots::DIRECTIONAL_LIGHT)?,
            spheres: backend.slot(slots::SPHERES)?,
            sample: backend.slot(slots::SAMPLE)?,
        };

        let target = backend.create_texture(extent)?;
        backend.set_texture(kernel, resolved.result, target)?;
        if let Some(skybox) = skybox {
            backend.set_texture(kernel, resolved.skybox, skybox)?;
        }

        let records = serialize_scene(scene);
        let geometry = backend.create_buffer(bytemuck::cast_slice(&records))?;
        backend.set_buffer(kernel, resolved.spheres, geometry)?;
        scene.clear_all_dirty();

        Ok(Self {
            backend,
            kernel,
            slots: resolved,
            extent,
            target: Some(target),
            geometry: Some(geometry),
            raw: Film::new(extent),
            accum: Film::new(extent),
            sample_index: 0,
        })
    }

    /// Advance one frame.
    ///
    /// Allocation failures are fatal for the frame and propagate with no
    /// partial state committed. A failed dispatch or readback is logged and
    /// reported as [`FrameOutcome::Skipped`] with the controller untouched;
    /// a dirty-clear before a failed dispatch deliberately does not re-upload
    /// geometry on the retry.
    pub fn render_frame<R: Rng>(
        &mut self,
        scene: &mut Scene,
        camera: &mut Camera,
        light: &mut DirectionalLight,
        surface: Extent,
        rng: &mut R,
    ) -> Result<FrameOutcome> {
        // 1. Output size is authoritative; a mismatch rebuilds both films
        //    and the backend target before anything is dispatched.
        if surface != self.extent {
            let target = self.backend.create_texture(surface)?;
            self.backend.set_texture(self.kernel, self.slots.result, target)?;
            if let Some(old) = self.target.replace(target) {
                self.backend.release_texture(old);
            }
            self.extent = surface;
            self.raw.resize(surface);
            self.accum.resize(surface);
            self.sample_index = 0;
            debug!(width = surface.width, height = surface.height, "output resized");
        }

        // 2. Scene changes rebuild the whole geometry buffer. Dirty flags are
        //    cleared in the same step that observed them.
        if scene.is_dirty() {
            let records = serialize_scene(scene);
            let buffer = self.backend.create_buffer(bytemuck::cast_slice(&records))?;
            self.backend.set_buffer(self.kernel, self.slots.spheres, buffer)?;
            if let Some(old) = self.geometry.replace(buffer) {
                self.backend.release_buffer(old);
            }
            self.sample_index = 0;
            scene.clear_all_dirty();
            debug!(spheres = scene.len(), "geometry buffer rebuilt");
        }

        // 3. A view or lighting change invalidates accumulated samples even
        //    though no object moved. Both flags are consumed every frame.
        if camera.take_changed() | light.take_changed() {
            self.sample_index = 0;
        }

        // 4. Per-frame parameters.
        let aspect = surface.width as f32 / surface.height as f32;
        let jitter = Vec4::new(rng.gen::<f32>(), rng.gen::<f32>(), 0.0, 0.0);
        self.backend.set_vector(self.slots.pixel_offset, jitter)?;
        self.backend
            .set_matrix(self.slots.camera_to_world, camera.camera_to_world())?;
        self.backend
            .set_matrix(self.slots.camera_inverse, camera.inverse_projection(aspect))?;
        self.backend.set_vector(self.slots.light, light.encode())?;
        self.backend
            .set_int(self.slots.sample, self.sample_index as i32)?;

        // 5. Dispatch, 6. blend, 7. advance. A backend failure between here
        //    and the blend leaves sample_index and both films untouched.
        let (groups_x, groups_y) = surface.group_counts();
        if let Err(err) = self.backend.dispatch(self.kernel, groups_x, groups_y, 1) {
            warn!(error = %err, "dispatch failed, frame skipped");
            return Ok(FrameOutcome::Skipped);
        }

        let Some(target) = self.target else {
            // release() was called; nothing to read back into.
            warn!("render target released, frame skipped");
            return Ok(FrameOutcome::Skipped);
        };
        if let Err(err) = self.backend.read_texture(target, &mut self.raw) {
            warn!(error = %err, "readback failed, frame skipped");
            return Ok(FrameOutcome::Skipped);
        }

        self.accum.accumulate(&self.raw, self.sample_index);
        self.sample_index += 1;
        Ok(FrameOutcome::Rendered { samples: self.sample_index })
    }

    /// The converged image: running mean of every sample since the last
    /// reset.
    pub fn converged(&self) -> &Film {
        &self.accum
    }

    /// Samples accumulated for the current view/scene state.
    pub fn sample_index(&self) -> u32 {
        self.sample_index
    }

    /// Current output extent.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Release the geometry buffer and output texture. Idempotent; called on
    /// every teardown path.
    pub fn release(&mut self) {
        if let Some(target) = self.target.take() {
            self.backend.release_texture(target);
        }
        if let Some(geometry) = self.geometry.take() {
            self.backend.release_buffer(geometry);
        }
    }

    /// Tear down and hand the backend back to the caller.
    pub fn shutdown(mut self) -> B {
        self.release();
        self.backend
    }
}

/// Flatten the scene into kernel records, padding to one zeroed element so
/// backends that reject zero-length buffers still get a valid allocation.
fn serialize_scene(scene: &mut Scene) -> Vec<SphereData> {
    let mut records: Vec<SphereData> = scene.iter_mut().map(|s| s.data()).collect();
    if records.is_empty() {
        records.push(SphereData::zeroed());
    }
    records
}
