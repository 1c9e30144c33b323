//! `wgpu` implementation of the compute backend contract.
//!
//! The kernel's WGSL lives with the host application, not here; the adapter
//! is told at registration time how the stable slot names map onto bindings:
//! storage texture, sampled texture, storage buffer, or a field inside one
//! shared params uniform buffer. Scalar/vector/matrix slots are staged
//! CPU-side and flushed with one `write_buffer` per dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::error::{Error, Result};
use crate::render::{BufferId, ComputeBackend, Extent, Film, KernelId, SlotId, TextureId};

const BYTES_PER_PIXEL: u32 = 16; // rgba32float

/// How a slot name surfaces in the kernel's bind group (group 0).
#[derive(Debug, Clone, Copy)]
pub enum SlotBinding {
    /// Write-only `rgba32float` storage texture (the dispatch target).
    StorageTexture { binding: u32 },
    /// Filterable sampled texture plus its sampler binding.
    SampledTexture { binding: u32, sampler_binding: u32 },
    /// Read-only storage buffer.
    StorageBuffer { binding: u32 },
    /// Byte range inside the shared params uniform buffer.
    Uniform { offset: u32, size: u32 },
}

/// Registration record for one compute kernel.
pub struct KernelDesc<'a> {
    /// Stable kernel name the controller resolves (`TraceRays`).
    pub name: &'a str,
    /// WGSL source for the module.
    pub source: &'a str,
    /// Entry point inside the module.
    pub entry_point: &'a str,
    /// Binding index of the params uniform buffer, if any slot is
    /// [`SlotBinding::Uniform`].
    pub params_binding: Option<u32>,
    /// Slot-name-to-binding table.
    pub bindings: &'a [(&'a str, SlotBinding)],
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Texture(TextureId),
    Buffer(BufferId),
}

struct ParamsBlock {
    binding: u32,
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
    dirty: bool,
    /// Slot -> (offset, size) into `staging`.
    fields: HashMap<SlotId, (u32, u32)>,
}

struct Kernel {
    name: String,
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    /// Resource slots: slot -> binding description.
    resources: HashMap<SlotId, SlotBinding>,
    /// Currently bound resource per binding index.
    bound: HashMap<u32, Bound>,
    params: Option<ParamsBlock>,
    /// Rebuilt lazily after any binding change.
    bind_group: Option<wgpu::BindGroup>,
}

struct TextureEntry {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    extent: Extent,
}

/// Backend adapter over a host-supplied device and queue.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    sampler: wgpu::Sampler,
    kernels: Vec<Kernel>,
    slot_names: Vec<String>,
    textures: Vec<Option<TextureEntry>>,
    buffers: Vec<Option<wgpu::Buffer>>,
}

impl WgpuBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lucent_sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            device,
            queue,
            sampler,
            kernels: Vec::new(),
            slot_names: Vec::new(),
            textures: Vec::new(),
            buffers: Vec::new(),
        }
    }

    /// Compile and register a kernel. Every slot name in the binding table
    /// becomes resolvable through [`ComputeBackend::slot`].
    pub fn register_kernel(&mut self, desc: &KernelDesc<'_>) -> Result<KernelId> {
        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.name),
            source: wgpu::ShaderSource::Wgsl(desc.source.to_string().into()),
        });

        let mut entries = Vec::new();
        let mut resource_table = HashMap::new();
        let mut fields = HashMap::new();
        let mut params_size = 0u32;

        for &(slot_name, binding) in desc.bindings {
            let slot = self.intern_slot(slot_name);
            match binding {
                SlotBinding::StorageTexture { binding: index } => {
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: index,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::StorageTexture {
                            access: wgpu::StorageTextureAccess::WriteOnly,
                            format: wgpu::TextureFormat::Rgba32Float,
                            view_dimension: wgpu::TextureViewDimension::D2,
                        },
                        count: None,
                    });
                    resource_table.insert(slot, binding);
                }
                SlotBinding::SampledTexture { binding: index, sampler_binding } => {
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: index,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    });
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: sampler_binding,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    });
                    resource_table.insert(slot, binding);
                }
                SlotBinding::StorageBuffer { binding: index } => {
                    entries.push(wgpu::BindGroupLayoutEntry {
                        binding: index,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    });
                    resource_table.insert(slot, binding);
                }
                SlotBinding::Uniform { offset, size } => {
                    fields.insert(slot, (offset, size));
                    params_size = params_size.max(offset + size);
                }
            }
        }

        let params = match (desc.params_binding, params_size) {
            (Some(binding), size) if size > 0 => {
                let padded = (size + 15) & !15;
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                });
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("lucent_params"),
                    size: padded as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                Some(ParamsBlock {
                    binding,
                    buffer,
                    staging: vec![0u8; padded as usize],
                    dirty: true,
                    fields,
                })
            }
            (None, size) if size > 0 => {
                return Err(Error::config(format!(
                    "kernel {} declares uniform slots but no params binding",
                    desc.name
                )));
            }
            _ => None,
        };

        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(desc.name),
                entries: &entries,
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(desc.name),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(desc.name),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(desc.entry_point),
                compilation_options: Default::default(),
                cache: None,
            });

        self.kernels.push(Kernel {
            name: desc.name.to_string(),
            pipeline,
            layout,
            resources: resource_table,
            bound: HashMap::new(),
            params,
            bind_group: None,
        });
        Ok(KernelId(self.kernels.len() as u32 - 1))
    }

    /// Upload film contents into a texture (e.g. a skybox image decoded by
    /// the host). Outside the controller contract.
    pub fn write_texture(&mut self, texture: TextureId, film: &Film) -> Result<()> {
        let entry = self.texture_entry(texture)?;
        if film.extent() != entry.extent {
            return Err(Error::alloc(format!(
                "texture upload size mismatch: texture {}x{}, film {}x{}",
                entry.extent.width,
                entry.extent.height,
                film.width(),
                film.height()
            )));
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            film.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(entry.extent.width * BYTES_PER_PIXEL),
                rows_per_image: Some(entry.extent.height),
            },
            wgpu::Extent3d {
                width: entry.extent.width,
                height: entry.extent.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn intern_slot(&mut self, name: &str) -> SlotId {
        if let Some(i) = self.slot_names.iter().position(|n| n == name) {
            return SlotId(i as u32);
        }
        self.slot_names.push(name.to_string());
        SlotId(self.slot_names.len() as u32 - 1)
    }

    fn kernel_entry(&mut self, kernel: KernelId) -> Result<&mut Kernel> {
        self.kernels
            .get_mut(kernel.0 as usize)
            .ok_or_else(|| Error::KernelNotFound(format!("#{}", kernel.0)))
    }

    fn texture_entry(&self, texture: TextureId) -> Result<&TextureEntry> {
        self.textures
            .get(texture.0 as usize)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::alloc(format!("texture #{} released or unknown", texture.0)))
    }

    fn set_uniform_bytes(&mut self, slot: SlotId, bytes: &[u8]) -> Result<()> {
        let mut written = false;
        for kernel in &mut self.kernels {
            if let Some(params) = &mut kernel.params {
                if let Some(&(offset, size)) = params.fields.get(&slot) {
                    if size as usize != bytes.len() {
                        return Err(Error::config(format!(
                            "uniform slot size mismatch: declared {size}, got {}",
                            bytes.len()
                        )));
                    }
                    let offset = offset as usize;
                    params.staging[offset..offset + bytes.len()].copy_from_slice(bytes);
                    params.dirty = true;
                    written = true;
                }
            }
        }
        if written {
            Ok(())
        } else {
            Err(Error::SlotNotFound(self.slot_name(slot)))
        }
    }

    fn slot_name(&self, slot: SlotId) -> String {
        self.slot_names
            .get(slot.0 as usize)
            .cloned()
            .unwrap_or_else(|| format!("#{}", slot.0))
    }

    fn bind_resource(&mut self, kernel: KernelId, slot: SlotId, bound: Bound) -> Result<()> {
        let name = self.slot_name(slot);
        let entry = self.kernel_entry(kernel)?;
        let Some(&binding) = entry.resources.get(&slot) else {
            return Err(Error::SlotNotFound(name));
        };
        let index = match binding {
            SlotBinding::StorageTexture { binding }
            | SlotBinding::SampledTexture { binding, .. }
            | SlotBinding::StorageBuffer { binding } => binding,
            SlotBinding::Uniform { .. } => unreachable!("uniforms are not in the resource table"),
        };
        entry.bound.insert(index, bound);
        entry.bind_group = None;
        Ok(())
    }

    fn ensure_bind_group(&mut self, kernel: KernelId) -> Result<()> {
        let Self {
            device,
            sampler,
            kernels,
            textures,
            buffers,
            ..
        } = self;
        let entry = kernels
            .get_mut(kernel.0 as usize)
            .ok_or_else(|| Error::KernelNotFound(format!("#{}", kernel.0)))?;
        if entry.bind_group.is_some() {
            return Ok(());
        }

        let mut group_entries = Vec::new();
        for &binding in entry.resources.values() {
            match binding {
                SlotBinding::StorageTexture { binding: index }
                | SlotBinding::SampledTexture { binding: index, .. } => {
                    let Some(&Bound::Texture(id)) = entry.bound.get(&index) else {
                        return Err(Error::DispatchFailed(format!(
                            "kernel {}: texture binding {index} unbound",
                            entry.name
                        )));
                    };
                    let tex = textures
                        .get(id.0 as usize)
                        .and_then(Option::as_ref)
                        .ok_or_else(|| {
                            Error::DispatchFailed(format!("texture #{} released", id.0))
                        })?;
                    group_entries.push(wgpu::BindGroupEntry {
                        binding: index,
                        resource: wgpu::BindingResource::TextureView(&tex.view),
                    });
                }
                SlotBinding::StorageBuffer { binding: index } => {
                    let Some(&Bound::Buffer(id)) = entry.bound.get(&index) else {
                        return Err(Error::DispatchFailed(format!(
                            "kernel {}: buffer binding {index} unbound",
                            entry.name
                        )));
                    };
                    let buf = buffers
                        .get(id.0 as usize)
                        .and_then(Option::as_ref)
                        .ok_or_else(|| {
                            Error::DispatchFailed(format!("buffer #{} released", id.0))
                        })?;
                    group_entries.push(wgpu::BindGroupEntry {
                        binding: index,
                        resource: buf.as_entire_binding(),
                    });
                }
                SlotBinding::Uniform { .. } => {}
            }
            if let SlotBinding::SampledTexture { sampler_binding, .. } = binding {
                group_entries.push(wgpu::BindGroupEntry {
                    binding: sampler_binding,
                    resource: wgpu::BindingResource::Sampler(sampler),
                });
            }
        }
        if let Some(params) = &entry.params {
            group_entries.push(wgpu::BindGroupEntry {
                binding: params.binding,
                resource: params.buffer.as_entire_binding(),
            });
        }

        entry.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(entry.name.as_str()),
            layout: &entry.layout,
            entries: &group_entries,
        }));
        Ok(())
    }
}

impl ComputeBackend for WgpuBackend {
    fn kernel(&mut self, name: &str) -> Result<KernelId> {
        self.kernels
            .iter()
            .position(|k| k.name == name)
            .map(|i| KernelId(i as u32))
            .ok_or_else(|| Error::KernelNotFound(name.to_string()))
    }

    fn slot(&mut self, name: &str) -> Result<SlotId> {
        self.slot_names
            .iter()
            .position(|n| n == name)
            .map(|i| SlotId(i as u32))
            .ok_or_else(|| Error::SlotNotFound(name.to_string()))
    }

    fn create_texture(&mut self, extent: Extent) -> Result<TextureId> {
        if extent.width == 0 || extent.height == 0 {
            return Err(Error::alloc(format!(
                "degenerate texture extent {}x{}",
                extent.width, extent.height
            )));
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("lucent_texture"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.textures.push(Some(TextureEntry { texture, view, extent }));
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn release_texture(&mut self, texture: TextureId) {
        if let Some(slot) = self.textures.get_mut(texture.0 as usize) {
            *slot = None;
        }
    }

    fn create_buffer(&mut self, contents: &[u8]) -> Result<BufferId> {
        if contents.is_empty() {
            return Err(Error::alloc("zero-length buffer"));
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("lucent_storage"),
                contents,
                usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            });
        self.buffers.push(Some(buffer));
        Ok(BufferId(self.buffers.len() as u32 - 1))
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        if let Some(slot) = self.buffers.get_mut(buffer.0 as usize) {
            *slot = None;
        }
    }

    fn set_buffer(&mut self, kernel: KernelId, slot: SlotId, buffer: BufferId) -> Result<()> {
        self.bind_resource(kernel, slot, Bound::Buffer(buffer))
    }

    fn set_texture(&mut self, kernel: KernelId, slot: SlotId, texture: TextureId) -> Result<()> {
        self.bind_resource(kernel, slot, Bound::Texture(texture))
    }

    fn set_matrix(&mut self, slot: SlotId, value: Mat4) -> Result<()> {
        self.set_uniform_bytes(slot, bytemuck::bytes_of(&value.to_cols_array_2d()))
    }

    fn set_vector(&mut self, slot: SlotId, value: Vec4) -> Result<()> {
        self.set_uniform_bytes(slot, bytemuck::bytes_of(&value.to_array()))
    }

    fn set_float(&mut self, slot: SlotId, value: f32) -> Result<()> {
        self.set_uniform_bytes(slot, bytemuck::bytes_of(&value))
    }

    fn set_int(&mut self, slot: SlotId, value: i32) -> Result<()> {
        self.set_uniform_bytes(slot, bytemuck::bytes_of(&value))
    }

    fn dispatch(
        &mut self,
        kernel: KernelId,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<()> {
        self.ensure_bind_group(kernel)?;

        // Flush staged params before the pass reads them.
        {
            let Self { queue, kernels, .. } = self;
            let entry = kernels
                .get_mut(kernel.0 as usize)
                .ok_or_else(|| Error::KernelNotFound(format!("#{}", kernel.0)))?;
            if let Some(params) = &mut entry.params {
                if params.dirty {
                    queue.write_buffer(&params.buffer, 0, &params.staging);
                    params.dirty = false;
                }
            }
        }

        let entry = &self.kernels[kernel.0 as usize];
        let bind_group = entry
            .bind_group
            .as_ref()
            .ok_or_else(|| Error::DispatchFailed("bind group missing".into()))?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lucent_dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(entry.name.as_str()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&entry.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, groups_z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_texture(&mut self, texture: TextureId, out: &mut Film) -> Result<()> {
        let entry = self.texture_entry(texture)?;
        let extent = entry.extent;
        // bytes_per_row must be aligned to COPY_BYTES_PER_ROW_ALIGNMENT (256)
        let unpadded = extent.width * BYTES_PER_PIXEL;
        let padded = (unpadded + 255) & !255;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lucent_readback"),
            size: padded as u64 * extent.height as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lucent_readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &entry.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(extent.height),
                },
            },
            wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| Error::ReadbackFailed(format!("device poll: {e:?}")))?;

        if out.extent() != extent {
            out.resize(extent);
        }
        {
            let data = slice.get_mapped_range();
            let dst = out.as_bytes_mut();
            for row in 0..extent.height as usize {
                let src_start = row * padded as usize;
                let dst_start = row * unpadded as usize;
                dst[dst_start..dst_start + unpadded as usize]
                    .copy_from_slice(&data[src_start..src_start + unpadded as usize]);
            }
        }
        staging.unmap();
        Ok(())
    }
}
