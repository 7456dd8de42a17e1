use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::geometry::FillRule;
use crate::render::{DrawStream, GradientRamp, GradientShading, RampKey, Shading, RAMP_WIDTH};

use super::common::{
    clear_color, cover_stencil, depth_stencil, premul_alpha_blend, push_cover, push_fan, winding_stencil,
    CoverShading, CoverVertex, StencilVertex, ViewportUniform, MODE_LINEAR, MODE_RADIAL, STENCIL_FORMAT,
};
use super::{RenderCtx, RenderTarget};

/// Path renderer for draw streams (stencil-then-cover).
///
/// Vertex data is uploaded once per stream; resubmitting the same
/// `Arc<DrawStream>` only replays the recorded draws. Gradient ramps live in
/// one texture atlas, a row per ramp.
#[derive(Default)]
pub struct PathRenderer {
    pipeline_format: Option<wgpu::TextureFormat>,
    nonzero_pipeline: Option<wgpu::RenderPipeline>,
    evenodd_pipeline: Option<wgpu::RenderPipeline>,
    cover_pipeline: Option<wgpu::RenderPipeline>,

    bind_group_layout: Option<wgpu::BindGroupLayout>,
    bind_group: Option<wgpu::BindGroup>,
    bind_group_generation: u64,
    viewport_ubo: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,

    // ramp atlas
    ramps: RampSlots,
    ramp_texture: Option<wgpu::Texture>,
    ramp_view: Option<wgpu::TextureView>,
    atlas_generation: u64,

    stencil_view: Option<wgpu::TextureView>,
    stencil_size: (u32, u32),

    fan_vbo: Option<wgpu::Buffer>,
    fan_capacity: usize,
    cover_vbo: Option<wgpu::Buffer>,
    cover_capacity: usize,

    uploaded: Option<Arc<DrawStream>>,
    draws: Vec<PassDraw>,

    warned_ramp_overflow: bool,
}

#[derive(Debug, Clone)]
struct PassDraw {
    fan: Range<u32>,
    cover: Range<u32>,
    rule: FillRule,
}

impl PathRenderer {
    pub fn new(ramp_rows: u32) -> Self {
        Self {
            ramps: RampSlots::new(ramp_rows),
            ..Self::default()
        }
    }

    /// Drops every GPU resource; they are rebuilt on the next `render`.
    pub fn reset(&mut self) {
        *self = Self::new(self.ramps.rows);
    }

    /// Clears `target` to the stream's background and draws every pass.
    pub fn render(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, stream: &Arc<DrawStream>) {
        self.ensure_pipeline(ctx);
        self.ensure_ramp_atlas(ctx);
        self.ensure_bindings(ctx);
        self.ensure_stencil(ctx);

        // Mutating methods must happen before borrowing pipelines/buffers immutably.
        if !self.uploaded.as_ref().is_some_and(|s| Arc::ptr_eq(s, stream)) {
            self.upload(ctx, stream);
        }
        self.write_viewport_uniform(ctx);

        let Some(stencil_view) = self.stencil_view.as_ref() else { return };
        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("pictor path pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color(stream.clear)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: stencil_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Discard,
                }),
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if self.draws.is_empty() {
            return;
        }
        let Some(nonzero) = self.nonzero_pipeline.as_ref() else { return };
        let Some(evenodd) = self.evenodd_pipeline.as_ref() else { return };
        let Some(cover) = self.cover_pipeline.as_ref() else { return };
        let Some(bind_group) = self.bind_group.as_ref() else { return };
        let Some(fan_vbo) = self.fan_vbo.as_ref() else { return };
        let Some(cover_vbo) = self.cover_vbo.as_ref() else { return };

        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_stencil_reference(0);
        for draw in &self.draws {
            rpass.set_pipeline(match draw.rule {
                FillRule::NonZero => nonzero,
                FillRule::EvenOdd => evenodd,
            });
            rpass.set_vertex_buffer(0, fan_vbo.slice(..));
            rpass.draw(draw.fan.clone(), 0..1);

            rpass.set_pipeline(cover);
            rpass.set_vertex_buffer(0, cover_vbo.slice(..));
            rpass.draw(draw.cover.clone(), 0..1);
        }
    }

    fn upload(&mut self, ctx: &RenderCtx<'_>, stream: &Arc<DrawStream>) {
        self.admit_ramps(ctx, stream);

        let mut fan: Vec<StencilVertex> = Vec::new();
        let mut covers: Vec<CoverVertex> = Vec::new();
        self.draws.clear();

        for (_, pass) in stream.passes() {
            let opacity = pass.resolved.opacity;
            let shading = match &pass.resolved.shading {
                Shading::Solid(color) => CoverShading::solid(*color, opacity),
                Shading::Linear(g) => self.gradient_shading(g, MODE_LINEAR, opacity),
                Shading::Radial(g) => self.gradient_shading(g, MODE_RADIAL, opacity),
            };
            let (f0, c0) = (fan.len() as u32, covers.len() as u32);
            push_fan(&mut fan, &pass.path);
            if fan.len() as u32 == f0 {
                continue;
            }
            push_cover(&mut covers, pass.path.bounds, &shading);
            self.draws.push(PassDraw {
                fan: f0..fan.len() as u32,
                cover: c0..covers.len() as u32,
                rule: pass.fill_rule,
            });
        }

        if !fan.is_empty() {
            self.ensure_vertex_capacity(ctx, fan.len(), covers.len());
            if let (Some(fan_vbo), Some(cover_vbo)) = (self.fan_vbo.as_ref(), self.cover_vbo.as_ref()) {
                ctx.queue.write_buffer(fan_vbo, 0, bytemuck::cast_slice(&fan));
                ctx.queue.write_buffer(cover_vbo, 0, bytemuck::cast_slice(&covers));
            }
        }
        log::trace!(
            "uploaded stream r{}: {} passes, {} fan vertices",
            stream.revision,
            self.draws.len(),
            fan.len()
        );
        self.uploaded = Some(Arc::clone(stream));
    }

    fn gradient_shading(&mut self, g: &GradientShading, mode: f32, opacity: f32) -> CoverShading {
        match self.ramps.row(g.ramp.key) {
            Some(row) => CoverShading {
                color: [0.0; 4],
                mode,
                ramp_v: self.ramps.v(row),
                opacity,
                from_device: g.from_device,
            },
            None => {
                if !self.warned_ramp_overflow {
                    log::warn!("gradient ramp atlas full; drawing overflow gradients with their first stop");
                    self.warned_ramp_overflow = true;
                }
                let color = g.ramp.stops.first().map_or(crate::paint::Color::TRANSPARENT, |s| s.color);
                CoverShading::solid(color, opacity)
            }
        }
    }

    fn admit_ramps(&mut self, ctx: &RenderCtx<'_>, stream: &DrawStream) {
        let mut needed: Vec<&Arc<GradientRamp>> = Vec::new();
        for (_, pass) in stream.passes() {
            if let Shading::Linear(g) | Shading::Radial(g) = &pass.resolved.shading {
                if !needed.iter().any(|r| r.key == g.ramp.key) {
                    needed.push(&g.ramp);
                }
            }
        }
        let keys: Vec<RampKey> = needed.iter().map(|r| r.key).collect();
        let Some(texture) = self.ramp_texture.as_ref() else { return };
        for (key, row) in self.ramps.admit(&keys) {
            let Some(ramp) = needed.iter().find(|r| r.key == key) else { continue };
            ctx.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d { x: 0, y: row, z: 0 },
                    aspect: wgpu::TextureAspect::All,
                },
                ramp.as_bytes(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(RAMP_WIDTH as u32 * 4),
                    rows_per_image: Some(1),
                },
                wgpu::Extent3d {
                    width: RAMP_WIDTH as u32,
                    height: 1,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.cover_pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pictor path shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/path.wgsl").into()),
        });

        let bgl = ctx.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pictor path bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: ViewportUniform::min_binding_size(),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pictor path pipeline layout"),
            bind_group_layouts: &[&bgl],
            immediate_size: 0,
        });

        let build = |label: &str, stencil: wgpu::StencilState, cover: bool| {
            let (vs, fs, buffers, blend, write_mask) = if cover {
                ("vs_cover", "fs_cover", [CoverVertex::layout()], Some(premul_alpha_blend()), wgpu::ColorWrites::ALL)
            } else {
                ("vs_stencil", "fs_stencil", [StencilVertex::layout()], None, wgpu::ColorWrites::empty())
            };
            ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some(vs),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.surface_format,
                        blend,
                        write_mask,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(depth_stencil(stencil)),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        };

        self.nonzero_pipeline = Some(build("pictor stencil nonzero", winding_stencil(FillRule::NonZero), false));
        self.evenodd_pipeline = Some(build("pictor stencil evenodd", winding_stencil(FillRule::EvenOdd), false));
        self.cover_pipeline = Some(build("pictor cover", cover_stencil(), true));
        self.pipeline_format = Some(ctx.surface_format);
        self.bind_group_layout = Some(bgl);

        self.bind_group = None;
        self.viewport_ubo = None;
    }

    fn ensure_ramp_atlas(&mut self, ctx: &RenderCtx<'_>) {
        if self.ramp_texture.is_none() {
            let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("pictor ramp atlas"),
                size: wgpu::Extent3d {
                    width: RAMP_WIDTH as u32,
                    height: self.ramps.rows,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.ramp_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            self.ramp_texture = Some(texture);
            self.ramps.clear();
            self.atlas_generation += 1;
        }
        if self.sampler.is_none() {
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("pictor ramp sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            }));
        }
    }

    fn ensure_bindings(&mut self, ctx: &RenderCtx<'_>) {
        if self.bind_group_generation == self.atlas_generation
            && self.bind_group.is_some()
            && self.viewport_ubo.is_some()
        {
            return;
        }
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(ramp_view) = self.ramp_view.as_ref() else { return };
        let Some(sampler) = self.sampler.as_ref() else { return };

        let viewport_ubo = ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pictor path viewport ubo"),
            contents: bytemuck::bytes_of(&ViewportUniform::of(ctx.size)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pictor path bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(ramp_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.viewport_ubo = Some(viewport_ubo);
        self.bind_group = Some(bind_group);
        self.bind_group_generation = self.atlas_generation;
    }

    fn ensure_stencil(&mut self, ctx: &RenderCtx<'_>) {
        let size = (ctx.size.0.max(1), ctx.size.1.max(1));
        if self.stencil_view.is_some() && self.stencil_size == size {
            return;
        }
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("pictor stencil"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: STENCIL_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        self.stencil_view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.stencil_size = size;
    }

    fn write_viewport_uniform(&mut self, ctx: &RenderCtx<'_>) {
        let Some(ubo) = self.viewport_ubo.as_ref() else { return };
        ctx.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&ViewportUniform::of(ctx.size)));
    }

    fn ensure_vertex_capacity(&mut self, ctx: &RenderCtx<'_>, fan: usize, cover: usize) {
        if fan > self.fan_capacity || self.fan_vbo.is_none() {
            let cap = fan.next_power_of_two().max(64);
            self.fan_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("pictor fan vbo"),
                size: (cap * std::mem::size_of::<StencilVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.fan_capacity = cap;
        }
        if cover > self.cover_capacity || self.cover_vbo.is_none() {
            let cap = cover.next_power_of_two().max(64);
            self.cover_vbo = Some(ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("pictor cover vbo"),
                size: (cap * std::mem::size_of::<CoverVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            self.cover_capacity = cap;
        }
    }
}

/// Row assignment in the ramp atlas.
#[derive(Debug, Default)]
struct RampSlots {
    rows: u32,
    slots: HashMap<RampKey, u32>,
}

impl RampSlots {
    fn new(rows: u32) -> Self {
        Self {
            rows: rows.max(1),
            slots: HashMap::new(),
        }
    }

    fn row(&self, key: RampKey) -> Option<u32> {
        self.slots.get(&key).copied()
    }

    /// Texture v coordinate of a row's center.
    fn v(&self, row: u32) -> f32 {
        (row as f32 + 0.5) / self.rows as f32
    }

    fn clear(&mut self) {
        self.slots.clear();
    }

    /// Makes `keys` resident and returns the rows that need uploading.
    ///
    /// When the missing keys do not fit next to the resident ones the atlas
    /// starts over; keys beyond capacity stay unassigned.
    fn admit(&mut self, keys: &[RampKey]) -> Vec<(RampKey, u32)> {
        let missing: Vec<RampKey> = keys.iter().copied().filter(|k| !self.slots.contains_key(k)).collect();
        if missing.is_empty() {
            return Vec::new();
        }
        let to_upload = if self.slots.len() + missing.len() > self.rows as usize {
            log::debug!("ramp atlas full ({} rows); resetting", self.rows);
            self.slots.clear();
            keys.to_vec()
        } else {
            missing
        };
        let mut uploads = Vec::new();
        for key in to_upload {
            let row = self.slots.len() as u32;
            if row >= self.rows {
                break;
            }
            self.slots.insert(key, row);
            uploads.push((key, row));
        }
        uploads
    }
}
