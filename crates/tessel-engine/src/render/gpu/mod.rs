//! wgpu implementation of [`RenderBackend`].
//!
//! [`WgpuBackend`] persists across frames and owns every GPU resource
//! (pipelines, growable batch buffers, registered textures, instanced meshes).
//! Per frame it is borrowed as a [`WgpuFrame`], which binds it to a device
//! context and a colour target. Each submission records its own encoder and
//! submits immediately, so `queue.write_buffer` calls stay ordered with the
//! draws that read them.

mod pipeline;

pub use pipeline::PALETTE_SIZE;

use wgpu::util::DeviceExt;

use crate::coords::Mat4;
use crate::paint::Color;
use crate::render::backend::{BatchSubmission, MeshSlot, RenderBackend, TextureId};
use crate::render::vertex::{InstanceData, MeshVertex, Vertex};
use crate::render::{RenderCtx, RenderTarget};

use pipeline::{Globals, GLOBALS_SIZE};

struct GpuMesh {
    vbo: wgpu::Buffer,
    ibo: wgpu::Buffer,
    index_count: u32,
    instance_vbo: wgpu::Buffer,
    max_instances: u32,
}

/// Persistent GPU state for the batch renderer.
pub struct WgpuBackend {
    pipeline_format: Option<wgpu::TextureFormat>,
    batch_pipeline: Option<wgpu::RenderPipeline>,
    instanced_pipeline: Option<wgpu::RenderPipeline>,

    globals_layout: Option<wgpu::BindGroupLayout>,
    texture_layout: Option<wgpu::BindGroupLayout>,
    globals_ubo: Option<wgpu::Buffer>,
    globals_bind_group: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,

    /// Bound for segments without text.
    placeholder_texture: Option<wgpu::BindGroup>,
    textures: Vec<Option<wgpu::BindGroup>>,

    vertex_vbo: Option<wgpu::Buffer>,
    vertex_capacity: usize,
    index_ibo: Option<wgpu::Buffer>,
    index_capacity: usize,

    meshes: Vec<Option<GpuMesh>>,
    palette: [[f32; 4]; PALETTE_SIZE],
}

impl Default for WgpuBackend {
    fn default() -> Self {
        Self {
            pipeline_format: None,
            batch_pipeline: None,
            instanced_pipeline: None,
            globals_layout: None,
            texture_layout: None,
            globals_ubo: None,
            globals_bind_group: None,
            sampler: None,
            placeholder_texture: None,
            textures: Vec::new(),
            vertex_vbo: None,
            vertex_capacity: 0,
            index_ibo: None,
            index_capacity: 0,
            meshes: Vec::new(),
            palette: [Color::WHITE.to_array(); PALETTE_SIZE],
        }
    }
}

impl WgpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the backend to this frame's device and colour target.
    pub fn frame<'a>(
        &'a mut self,
        ctx: &'a RenderCtx<'a>,
        target: &'a RenderTarget<'a>,
    ) -> WgpuFrame<'a> {
        WgpuFrame { backend: self, ctx, target }
    }

    /// Registers a sampled texture (e.g. an MSDF glyph atlas) for text segments.
    pub fn register_texture(&mut self, ctx: &RenderCtx<'_>, view: &wgpu::TextureView) -> TextureId {
        self.ensure_layouts(ctx);
        self.ensure_sampler(ctx);

        let (Some(layout), Some(sampler)) = (self.texture_layout.as_ref(), self.sampler.as_ref()) else {
            return TextureId(u32::MAX);
        };
        let bind_group = texture_bind_group(ctx.device, layout, sampler, view);

        let slot = match self.textures.iter().position(Option::is_none) {
            Some(free) => {
                self.textures[free] = Some(bind_group);
                free
            }
            None => {
                self.textures.push(Some(bind_group));
                self.textures.len() - 1
            }
        };
        log::debug!("registered texture {slot}");
        TextureId(slot as u32)
    }

    pub fn release_texture(&mut self, id: TextureId) {
        if let Some(entry) = self.textures.get_mut(id.0 as usize) {
            *entry = None;
        }
    }

    /// Sets the surface-material colours tiles blend between.
    ///
    /// Entry `i` is the colour of surface ID `i`; missing entries stay white.
    pub fn set_surface_palette(&mut self, colors: &[Color]) {
        if colors.len() > PALETTE_SIZE {
            log::warn!("surface palette has {} entries; using the first {PALETTE_SIZE}", colors.len());
        }
        for (slot, color) in self.palette.iter_mut().zip(colors) {
            *slot = color.to_array();
        }
    }

    // ── lazy-init helpers ──────────────────────────────────────────────────

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals_layout.is_none() {
            self.globals_layout = Some(pipeline::globals_layout(ctx.device));
        }
        if self.texture_layout.is_none() {
            self.texture_layout = Some(pipeline::texture_layout(ctx.device));
        }
    }

    fn ensure_pipelines(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.batch_pipeline.is_some() {
            return;
        }
        let (Some(globals), Some(texture)) = (self.globals_layout.as_ref(), self.texture_layout.as_ref()) else {
            return;
        };

        self.batch_pipeline =
            Some(pipeline::batch_pipeline(ctx.device, ctx.surface_format, globals, texture));
        self.instanced_pipeline =
            Some(pipeline::instanced_pipeline(ctx.device, ctx.surface_format, globals));
        self.pipeline_format = Some(ctx.surface_format);
        log::debug!("built batch pipelines for {:?}", ctx.surface_format);
    }

    fn ensure_globals(&mut self, ctx: &RenderCtx<'_>) {
        if self.globals_bind_group.is_some() {
            return;
        }
        let Some(layout) = self.globals_layout.as_ref() else { return; };

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessel globals ubo"),
            size: GLOBALS_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tessel globals bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        self.globals_ubo = Some(ubo);
        self.globals_bind_group = Some(bind_group);
    }

    fn ensure_sampler(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_some() {
            return;
        }
        self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tessel atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }));
    }

    /// 1×1 white texture bound when a segment has no atlas.
    fn ensure_placeholder_texture(&mut self, ctx: &RenderCtx<'_>) {
        if self.placeholder_texture.is_some() {
            return;
        }
        let (Some(layout), Some(sampler)) = (self.texture_layout.as_ref(), self.sampler.as_ref()) else {
            return;
        };

        let size = wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tessel placeholder texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255, 255, 255, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.placeholder_texture = Some(texture_bind_group(ctx.device, layout, sampler, &view));
    }

    fn ensure_batch_capacity(&mut self, ctx: &RenderCtx<'_>, vertices: usize, indices: usize) {
        if vertices > self.vertex_capacity || self.vertex_vbo.is_none() {
            let cap = vertices.next_power_of_two().max(1024);
            log::debug!("growing batch vertex buffer to {cap} vertices");
            self.vertex_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tessel batch vbo"),
                size: (cap * std::mem::size_of::<Vertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.vertex_capacity = cap;
        }
        if indices > self.index_capacity || self.index_ibo.is_none() {
            let cap = indices.next_power_of_two().max(1536);
            log::debug!("growing batch index buffer to {cap} indices");
            self.index_ibo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("tessel batch ibo"),
                size: (cap * std::mem::size_of::<u32>()) as u64,
                usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.index_capacity = cap;
        }
    }

    fn prepare(&mut self, ctx: &RenderCtx<'_>) {
        self.ensure_layouts(ctx);
        self.ensure_sampler(ctx);
        self.ensure_pipelines(ctx);
        self.ensure_globals(ctx);
        self.ensure_placeholder_texture(ctx);
    }

    fn write_globals(&self, ctx: &RenderCtx<'_>, projection: &Mat4) {
        let Some(ubo) = self.globals_ubo.as_ref() else { return; };
        let globals = Globals {
            projection: projection.to_cols_array(),
            palette: self.palette,
        };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&globals));
    }
}

fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("tessel texture bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn load_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    view: &wgpu::TextureView,
    label: &str,
) -> wgpu::RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Load,
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

// ── per-frame view ─────────────────────────────────────────────────────────

/// [`WgpuBackend`] bound to one frame's device context and colour target.
pub struct WgpuFrame<'a> {
    backend: &'a mut WgpuBackend,
    ctx: &'a RenderCtx<'a>,
    target: &'a RenderTarget<'a>,
}

impl WgpuFrame<'_> {
    /// Clears the target to `color` (premultiplied).
    pub fn clear(&mut self, color: Color) {
        let mut encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessel clear encoder"),
        });
        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tessel clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: color.r as f64,
                            g: color.g as f64,
                            b: color.b as f64,
                            a: color.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl RenderBackend for WgpuFrame<'_> {
    fn draw_batch(&mut self, batch: &BatchSubmission<'_>) {
        let ctx = self.ctx;
        let backend = &mut *self.backend;

        backend.prepare(ctx);
        backend.ensure_batch_capacity(ctx, batch.vertices.len(), batch.indices.len());
        backend.write_globals(ctx, &batch.projection);

        let Some(pipeline)   = backend.batch_pipeline.as_ref()     else { return; };
        let Some(globals)    = backend.globals_bind_group.as_ref() else { return; };
        let Some(fallback)   = backend.placeholder_texture.as_ref() else { return; };
        let Some(vbo)        = backend.vertex_vbo.as_ref()         else { return; };
        let Some(ibo)        = backend.index_ibo.as_ref()          else { return; };

        ctx.queue.write_buffer(vbo, 0, bytemuck::cast_slice(batch.vertices));
        ctx.queue.write_buffer(ibo, 0, bytemuck::cast_slice(batch.indices));

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessel batch encoder"),
        });
        {
            let mut rpass = load_pass(&mut encoder, self.target.color_view, "tessel batch pass");
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, globals, &[]);
            rpass.set_vertex_buffer(0, vbo.slice(..));
            rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);

            for segment in batch.segments {
                let texture = segment
                    .texture
                    .and_then(|id| backend.textures.get(id.0 as usize))
                    .and_then(Option::as_ref);
                if segment.texture.is_some() && texture.is_none() {
                    log::warn!("segment references unregistered texture {:?}", segment.texture);
                }
                rpass.set_bind_group(1, texture.unwrap_or(fallback), &[]);
                let start = segment.first_index;
                rpass.draw_indexed(start..start + segment.index_count, 0, 0..1);
            }
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_instanced_mesh(
        &mut self,
        vertices: &[MeshVertex],
        indices: &[u16],
        max_instances: u32,
    ) -> Option<MeshSlot> {
        let device = self.ctx.device;

        let vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel mesh vbo"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tessel mesh ibo"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_vbo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tessel mesh instance vbo"),
            size: max_instances as u64 * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mesh = GpuMesh {
            vbo,
            ibo,
            index_count: indices.len() as u32,
            instance_vbo,
            max_instances,
        };

        let meshes = &mut self.backend.meshes;
        let slot = match meshes.iter().position(Option::is_none) {
            Some(free) => {
                meshes[free] = Some(mesh);
                free
            }
            None => {
                meshes.push(Some(mesh));
                meshes.len() - 1
            }
        };
        Some(MeshSlot(slot as u32))
    }

    fn draw_instanced(&mut self, slot: MeshSlot, instances: &[InstanceData], projection: &Mat4) {
        let ctx = self.ctx;
        let backend = &mut *self.backend;

        backend.prepare(ctx);
        backend.write_globals(ctx, projection);

        let Some(mesh) = backend.meshes.get(slot.0 as usize).and_then(Option::as_ref) else {
            log::warn!("draw on released instanced mesh {slot:?}");
            return;
        };
        let Some(pipeline) = backend.instanced_pipeline.as_ref()  else { return; };
        let Some(globals)  = backend.globals_bind_group.as_ref()  else { return; };

        let count = instances.len().min(mesh.max_instances as usize);
        if count == 0 {
            return;
        }
        let bytes = (count * std::mem::size_of::<InstanceData>()) as u64;
        ctx.queue.write_buffer(&mesh.instance_vbo, 0, bytemuck::cast_slice(&instances[..count]));

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessel instanced encoder"),
        });
        {
            let mut rpass = load_pass(&mut encoder, self.target.color_view, "tessel instanced pass");
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, globals, &[]);
            rpass.set_vertex_buffer(0, mesh.vbo.slice(..));
            rpass.set_vertex_buffer(1, mesh.instance_vbo.slice(..bytes));
            rpass.set_index_buffer(mesh.ibo.slice(..), wgpu::IndexFormat::Uint16);
            rpass.draw_indexed(0..mesh.index_count, 0, 0..count as u32);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }

    fn release_instanced_mesh(&mut self, slot: MeshSlot) {
        if let Some(entry) = self.backend.meshes.get_mut(slot.0 as usize) {
            if let Some(mesh) = entry.take() {
                mesh.vbo.destroy();
                mesh.ibo.destroy();
                mesh.instance_vbo.destroy();
            }
        }
    }
}
