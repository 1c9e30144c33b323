//! In-memory compute backend for exercising the controller without a GPU.
//!
//! Records every binding, parameter, and dispatch so tests can assert on the
//! exact traffic crossing the backend boundary. Frames are produced by an
//! injectable generator keyed on the dispatch index.

use std::collections::{HashMap, HashSet};

use glam::{Mat4, Vec4};
use lucent::render::{BufferId, ComputeBackend, Extent, Film, KernelId, SlotId, TextureId};
use lucent::{Error, Result};

type FrameFn = Box<dyn FnMut(u64, Extent) -> Vec<[f32; 4]>>;

pub struct TestBackend {
    slot_names: Vec<String>,
    textures: HashMap<u32, Film>,
    next_texture: u32,
    buffers: HashMap<u32, Vec<u8>>,
    next_buffer: u32,
    bound_textures: HashMap<u32, TextureId>,
    bound_buffers: HashMap<u32, BufferId>,

    pub matrices: HashMap<String, Mat4>,
    pub vectors: HashMap<String, Vec4>,
    pub ints: HashMap<String, i32>,
    pub floats: HashMap<String, f32>,

    pub texture_creates: usize,
    pub buffer_creates: usize,
    pub texture_releases: usize,
    pub buffer_releases: usize,
    pub dispatches: Vec<(u32, u32, u32)>,
    dispatch_attempts: u64,
    pub fail_dispatches: HashSet<u64>,

    frame_source: FrameFn,
}

impl Default for TestBackend {
    fn default() -> Self {
        // Deterministic, frame-dependent pseudo image: pixel i of frame k.
        Self::with_frames(|frame, extent| {
            (0..extent.pixel_count())
                .map(|i| {
                    let v = ((frame * 31 + i as u64 * 7) % 17) as f32;
                    [v, v + 0.5, v * 2.0, 1.0]
                })
                .collect()
        })
    }
}

impl TestBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frames<F>(frame_source: F) -> Self
    where
        F: FnMut(u64, Extent) -> Vec<[f32; 4]> + 'static,
    {
        Self {
            slot_names: Vec::new(),
            textures: HashMap::new(),
            next_texture: 0,
            buffers: HashMap::new(),
            next_buffer: 0,
            bound_textures: HashMap::new(),
            bound_buffers: HashMap::new(),
            matrices: HashMap::new(),
            vectors: HashMap::new(),
            ints: HashMap::new(),
            floats: HashMap::new(),
            texture_creates: 0,
            buffer_creates: 0,
            texture_releases: 0,
            buffer_releases: 0,
            dispatches: Vec::new(),
            dispatch_attempts: 0,
            fail_dispatches: HashSet::new(),
            frame_source: Box::new(frame_source),
        }
    }

    fn slot_string(&self, slot: SlotId) -> String {
        self.slot_names[slot.0 as usize].clone()
    }

    fn slot_id(&self, name: &str) -> Option<SlotId> {
        self.slot_names
            .iter()
            .position(|n| n == name)
            .map(|i| SlotId(i as u32))
    }

    /// The bytes currently bound to the `Spheres` slot.
    pub fn geometry(&self) -> &[u8] {
        let slot = self.slot_id("Spheres").expect("Spheres never bound");
        let buffer = self.bound_buffers[&slot.0];
        &self.buffers[&buffer.0]
    }

    /// Last value written to the `Sample` slot.
    pub fn sample_param(&self) -> i32 {
        self.ints["Sample"]
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }
}

impl ComputeBackend for TestBackend {
    fn kernel(&mut self, name: &str) -> Result<KernelId> {
        if name == "TraceRays" {
            Ok(KernelId(0))
        } else {
            Err(Error::KernelNotFound(name.to_string()))
        }
    }

    fn slot(&mut self, name: &str) -> Result<SlotId> {
        if let Some(id) = self.slot_id(name) {
            return Ok(id);
        }
        self.slot_names.push(name.to_string());
        Ok(SlotId(self.slot_names.len() as u32 - 1))
    }

    fn create_texture(&mut self, extent: Extent) -> Result<TextureId> {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(id.0, Film::new(extent));
        self.texture_creates += 1;
        Ok(id)
    }

    fn release_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture.0).is_some() {
            self.texture_releases += 1;
        }
    }

    fn create_buffer(&mut self, contents: &[u8]) -> Result<BufferId> {
        if contents.is_empty() {
            return Err(Error::AllocationFailed("zero-length buffer".into()));
        }
        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id.0, contents.to_vec());
        self.buffer_creates += 1;
        Ok(id)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer.0).is_some() {
            self.buffer_releases += 1;
        }
    }

    fn set_buffer(&mut self, _kernel: KernelId, slot: SlotId, buffer: BufferId) -> Result<()> {
        self.bound_buffers.insert(slot.0, buffer);
        Ok(())
    }

    fn set_texture(&mut self, _kernel: KernelId, slot: SlotId, texture: TextureId) -> Result<()> {
        self.bound_textures.insert(slot.0, texture);
        Ok(())
    }

    fn set_matrix(&mut self, slot: SlotId, value: Mat4) -> Result<()> {
        let name = self.slot_string(slot);
        self.matrices.insert(name, value);
        Ok(())
    }

    fn set_vector(&mut self, slot: SlotId, value: Vec4) -> Result<()> {
        let name = self.slot_string(slot);
        self.vectors.insert(name, value);
        Ok(())
    }

    fn set_float(&mut self, slot: SlotId, value: f32) -> Result<()> {
        let name = self.slot_string(slot);
        self.floats.insert(name, value);
        Ok(())
    }

    fn set_int(&mut self, slot: SlotId, value: i32) -> Result<()> {
        let name = self.slot_string(slot);
        self.ints.insert(name, value);
        Ok(())
    }

    fn dispatch(
        &mut self,
        _kernel: KernelId,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<()> {
        let attempt = self.dispatch_attempts;
        self.dispatch_attempts += 1;
        if self.fail_dispatches.contains(&attempt) {
            return Err(Error::DispatchFailed(format!("injected failure #{attempt}")));
        }

        let slot = self
            .slot_id("Result")
            .ok_or_else(|| Error::DispatchFailed("Result never resolved".into()))?;
        let target = self.bound_textures.get(&slot.0).copied().ok_or_else(|| {
            Error::DispatchFailed("Result texture unbound".into())
        })?;
        let film = self
            .textures
            .get_mut(&target.0)
            .ok_or_else(|| Error::DispatchFailed("Result texture released".into()))?;

        let pixels = (self.frame_source)(attempt, film.extent());
        film.pixels_mut().copy_from_slice(&pixels);
        self.dispatches.push((groups_x, groups_y, groups_z));
        Ok(())
    }

    fn read_texture(&mut self, texture: TextureId, out: &mut Film) -> Result<()> {
        let film = self
            .textures
            .get(&texture.0)
            .ok_or_else(|| Error::ReadbackFailed(format!("texture #{} released", texture.0)))?;
        if out.extent() != film.extent() {
            out.resize(film.extent());
        }
        out.pixels_mut().copy_from_slice(film.pixels());
        Ok(())
    }
}
