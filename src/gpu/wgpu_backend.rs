//! wgpu Backend
//!
//! The real [`GpuBackend`]. Objects live in id-keyed registries; the logical
//! id a caller holds never changes, even when a capacity reload swaps the
//! physical `wgpu::Buffer` underneath. Frames render into an offscreen
//! color+depth target. Pipelines and bind group layouts are cached, keyed by
//! program and binding arity.

use rustc_hash::FxHashMap;

use super::{BufferKind, DrawCall, GpuBackend, GpuContext, GpuId, NULL_ID, PixelFormat};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Vertex layout shared by every pipeline: position, normal, uv.
const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x2,
];

struct PendingDraw {
    program: GpuId,
    vertex_buffer: GpuId,
    index_buffer: GpuId,
    index_count: u32,
    uniform_buffers: Vec<GpuId>,
    storage_buffers: Vec<GpuId>,
    textures: Vec<GpuId>,
}

struct WgpuTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Cache key for pipelines: program plus binding arity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: GpuId,
    uniforms: usize,
    storages: usize,
    textures: usize,
}

/// wgpu implementation of the GPU binding layer.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    next_id: GpuId,
    buffers: FxHashMap<GpuId, wgpu::Buffer>,
    buffer_kinds: FxHashMap<GpuId, BufferKind>,
    textures: FxHashMap<GpuId, WgpuTexture>,
    programs: FxHashMap<GpuId, wgpu::ShaderModule>,

    // Layouts keyed by (arity, group role); pipelines keyed by PipelineKey.
    uniform_layouts: FxHashMap<usize, wgpu::BindGroupLayout>,
    storage_layouts: FxHashMap<usize, wgpu::BindGroupLayout>,
    texture_layouts: FxHashMap<usize, wgpu::BindGroupLayout>,
    pipelines: FxHashMap<PipelineKey, wgpu::RenderPipeline>,

    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,

    clear_color: [f32; 4],
    pending: Vec<PendingDraw>,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(context: GpuContext, width: u32, height: u32) -> Self {
        let (color_view, depth_view) =
            Self::create_targets(&context.device, width.max(1), height.max(1));
        Self {
            device: context.device,
            queue: context.queue,
            next_id: 0,
            buffers: FxHashMap::default(),
            buffer_kinds: FxHashMap::default(),
            textures: FxHashMap::default(),
            programs: FxHashMap::default(),
            uniform_layouts: FxHashMap::default(),
            storage_layouts: FxHashMap::default(),
            texture_layouts: FxHashMap::default(),
            pipelines: FxHashMap::default(),
            color_view,
            depth_view,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            pending: Vec::new(),
        }
    }

    fn create_targets(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::TextureView, wgpu::TextureView) {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        (
            color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth.create_view(&wgpu::TextureViewDescriptor::default()),
        )
    }

    fn next_id(&mut self) -> GpuId {
        self.next_id += 1;
        self.next_id
    }

    fn buffer_usage(kind: BufferKind) -> wgpu::BufferUsages {
        let base = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
            BufferKind::Uniform => wgpu::BufferUsages::UNIFORM,
            BufferKind::Storage => wgpu::BufferUsages::STORAGE,
        };
        base | wgpu::BufferUsages::COPY_DST
    }

    fn buffer_layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
        wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }
    }

    fn uniform_layout(&mut self, count: usize) -> &wgpu::BindGroupLayout {
        let device = &self.device;
        self.uniform_layouts.entry(count).or_insert_with(|| {
            let entries: Vec<_> = (0..count)
                .map(|i| {
                    Self::buffer_layout_entry(i as u32, wgpu::BufferBindingType::Uniform)
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Uniform Group"),
                entries: &entries,
            })
        })
    }

    fn storage_layout(&mut self, count: usize) -> &wgpu::BindGroupLayout {
        let device = &self.device;
        self.storage_layouts.entry(count).or_insert_with(|| {
            let entries: Vec<_> = (0..count)
                .map(|i| {
                    Self::buffer_layout_entry(
                        i as u32,
                        wgpu::BufferBindingType::Storage { read_only: true },
                    )
                })
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Storage Group"),
                entries: &entries,
            })
        })
    }

    fn texture_layout(&mut self, count: usize) -> &wgpu::BindGroupLayout {
        let device = &self.device;
        self.texture_layouts.entry(count).or_insert_with(|| {
            let mut entries = Vec::with_capacity(count * 2);
            for i in 0..count {
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: (i * 2) as u32,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                });
                entries.push(wgpu::BindGroupLayoutEntry {
                    binding: (i * 2 + 1) as u32,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                });
            }
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Group"),
                entries: &entries,
            })
        })
    }

    fn ensure_pipeline(&mut self, key: PipelineKey) {
        if self.pipelines.contains_key(&key) {
            return;
        }
        let Some(module) = self.programs.get(&key.program) else {
            return;
        };

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: 32,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &VERTEX_ATTRIBUTES,
        };

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Ember Pipeline Layout"),
                bind_group_layouts: &[
                    &self.uniform_layouts[&key.uniforms],
                    &self.storage_layouts[&key.storages],
                    &self.texture_layouts[&key.textures],
                ],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Ember Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[vertex_layout],
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let _ = self.pipelines.insert(key, pipeline);
    }

    fn buffer_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        ids: &[GpuId],
    ) -> Option<wgpu::BindGroup> {
        let mut entries = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let buffer = self.buffers.get(id)?;
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            });
        }
        Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        }))
    }

    fn texture_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        ids: &[GpuId],
    ) -> Option<wgpu::BindGroup> {
        let mut entries = Vec::with_capacity(ids.len() * 2);
        for (i, id) in ids.iter().enumerate() {
            let texture = self.textures.get(id)?;
            entries.push(wgpu::BindGroupEntry {
                binding: (i * 2) as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: (i * 2 + 1) as u32,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }
        Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        }))
    }
}

struct ResolvedDraw {
    key: PipelineKey,
    vertex_buffer: GpuId,
    index_buffer: GpuId,
    index_count: u32,
    groups: [wgpu::BindGroup; 3],
}

impl GpuBackend for WgpuBackend {
    fn create_buffer(&mut self, kind: BufferKind, size: u64, label: &str) -> GpuId {
        // wgpu zero-initializes new buffers, which keeps the capacity tail
        // well-defined for mirrored collections.
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: Self::buffer_usage(kind),
            mapped_at_creation: false,
        });
        let id = self.next_id();
        let _ = self.buffers.insert(id, buffer);
        let _ = self.buffer_kinds.insert(id, kind);
        id
    }

    fn reallocate_buffer(&mut self, buffer: GpuId, data: &[u8]) {
        let Some(kind) = self.buffer_kinds.get(&buffer).copied() else {
            log::warn!("reallocate_buffer: unknown buffer {buffer}");
            return;
        };
        let label = format!("Buffer {buffer}");
        let replacement = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: data.len() as u64,
            usage: Self::buffer_usage(kind),
            mapped_at_creation: false,
        });
        if !data.is_empty() {
            self.queue.write_buffer(&replacement, 0, data);
        }
        // Same logical id, new physical object.
        let _ = self.buffers.insert(buffer, replacement);
    }

    fn write_buffer(&mut self, buffer: GpuId, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if let Some(buf) = self.buffers.get(&buffer) {
            self.queue.write_buffer(buf, offset, data);
        } else {
            log::warn!("write_buffer: unknown buffer {buffer}");
        }
    }

    fn destroy_buffer(&mut self, buffer: GpuId) {
        if let Some(buf) = self.buffers.remove(&buffer) {
            buf.destroy();
        }
        let _ = self.buffer_kinds.remove(&buffer);
    }

    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: &[u8],
        label: &str,
    ) -> GpuId {
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let format = match format {
            PixelFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
            PixelFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let id = self.next_id();
        let _ = self.textures.insert(id, WgpuTexture { view, sampler });
        id
    }

    fn destroy_texture(&mut self, texture: GpuId) {
        let _ = self.textures.remove(&texture);
    }

    fn create_program(&mut self, source: &str, label: &str) -> GpuId {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("Shader compilation failed for '{label}': {error}");
            return NULL_ID;
        }
        let id = self.next_id();
        let _ = self.programs.insert(id, module);
        id
    }

    fn destroy_program(&mut self, program: GpuId) {
        let _ = self.programs.remove(&program);
        self.pipelines.retain(|key, _| key.program != program);
    }

    fn begin_frame(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
        self.pending.clear();
    }

    fn draw(&mut self, call: &DrawCall<'_>) {
        self.pending.push(PendingDraw {
            program: call.program,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
            index_count: call.index_count,
            uniform_buffers: call.uniform_buffers.to_vec(),
            storage_buffers: call.storage_buffers.to_vec(),
            textures: call.textures.to_vec(),
        });
    }

    fn end_frame(&mut self) {
        let pending = std::mem::take(&mut self.pending);

        // Resolve phase: create any missing layouts/pipelines and build bind
        // groups before the pass borrows everything immutably.
        let mut resolved = Vec::with_capacity(pending.len());
        for call in &pending {
            let key = PipelineKey {
                program: call.program,
                uniforms: call.uniform_buffers.len(),
                storages: call.storage_buffers.len(),
                textures: call.textures.len(),
            };
            let _ = self.uniform_layout(key.uniforms);
            let _ = self.storage_layout(key.storages);
            let _ = self.texture_layout(key.textures);
            self.ensure_pipeline(key);
            if !self.pipelines.contains_key(&key) {
                log::warn!("draw dropped: program {} has no pipeline", call.program);
                continue;
            }
            let Some(uniforms) = self
                .buffer_bind_group(&self.uniform_layouts[&key.uniforms], &call.uniform_buffers)
            else {
                log::warn!("draw dropped: dead uniform buffer");
                continue;
            };
            let Some(storages) = self
                .buffer_bind_group(&self.storage_layouts[&key.storages], &call.storage_buffers)
            else {
                log::warn!("draw dropped: dead storage buffer");
                continue;
            };
            let Some(textures) =
                self.texture_bind_group(&self.texture_layouts[&key.textures], &call.textures)
            else {
                log::warn!("draw dropped: dead texture");
                continue;
            };
            if !self.buffers.contains_key(&call.vertex_buffer)
                || !self.buffers.contains_key(&call.index_buffer)
            {
                log::warn!("draw dropped: dead geometry buffer");
                continue;
            }
            resolved.push(ResolvedDraw {
                key,
                vertex_buffer: call.vertex_buffer,
                index_buffer: call.index_buffer,
                index_count: call.index_count,
                groups: [uniforms, storages, textures],
            });
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Ember Frame"),
            });
        {
            let [r, g, b, a] = self.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Forward Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for call in &resolved {
                pass.set_pipeline(&self.pipelines[&call.key]);
                for (i, group) in call.groups.iter().enumerate() {
                    pass.set_bind_group(i as u32, group, &[]);
                }
                pass.set_vertex_buffer(0, self.buffers[&call.vertex_buffer].slice(..));
                pass.set_index_buffer(
                    self.buffers[&call.index_buffer].slice(..),
                    wgpu::IndexFormat::Uint32,
                );
                pass.draw_indexed(0..call.index_count, 0, 0..1);
            }
        }
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}
