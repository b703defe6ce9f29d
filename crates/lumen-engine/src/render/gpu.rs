use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::coords::{PixelSize, Rect};
use crate::device::readback::{create_texture, write_rgba, TEXTURE_FORMAT};
use crate::device::{
    BackendError, CurrentGuard, ResourceToken, SyncPoint, Texture, TextureStorage, WgpuDevice,
};
use crate::scene::DrawCmd;

use super::{RenderBackend, RenderPass};

// ── uniforms and vertices ─────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct ViewportUniform {
    viewport: [f32; 2],
    _pad: [f32; 2], // 16-byte alignment
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    corner: [f32; 2], // 0..1
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { corner: [0.0, 0.0] },
    QuadVertex { corner: [1.0, 0.0] },
    QuadVertex { corner: [1.0, 1.0] },
    QuadVertex { corner: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

const MODE_SHAPE: f32 = 0.0;
const MODE_FRAME: f32 = 1.0;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadInstance {
    origin: [f32; 2],
    size: [f32; 2],
    color: [f32; 4],
    border_color: [f32; 4],
    params: [f32; 4], // radius, border width, mode, opacity
}

impl QuadInstance {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x2, // origin
        2 => Float32x2, // size
        3 => Float32x4, // color
        4 => Float32x4, // border color
        5 => Float32x4  // params
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

/// Converts a pixel clip rect into scissor arguments clamped to the target.
///
/// `None` means the clip has no area and the draw is skipped.
fn clip_to_scissor(clip: Option<Rect>, size: PixelSize) -> Option<(u32, u32, u32, u32)> {
    match clip {
        None => Some((0, 0, size.width, size.height)),
        Some(r) => {
            let (x0, y0, x1, y1) = r.pixel_span(size.width, size.height)?;
            Some((x0, y0, x1 - x0, y1 - y0))
        }
    }
}

// ── backend ───────────────────────────────────────────────────────────────

/// wgpu backend: one instanced pipeline, one offscreen texture per pass.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    max_dimension: u32,

    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    viewport_ubo: wgpu::Buffer,
    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    /// Bound when the pass has no frame.
    blank_view: wgpu::TextureView,

    instance_vbo: Option<wgpu::Buffer>,
    instance_capacity: usize,

    sync_seq: u64,
    _token: ResourceToken,
}

impl WgpuBackend {
    pub fn new(cx: &CurrentGuard, dev: &WgpuDevice) -> Result<Self, BackendError> {
        let device = dev.device().clone();
        let queue = dev.queue().clone();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("lumen overlay shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/overlay.wgsl").into()),
        });

        let viewport_size = std::num::NonZeroU64::new(std::mem::size_of::<ViewportUniform>() as u64);
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen overlay bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: viewport_size,
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen overlay pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lumen overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout(), QuadInstance::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TEXTURE_FORMAT,
                    blend: Some(premul_alpha_blend()),
                    write_mask: wgpu::ColorWrites::ALL,
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
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lumen quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let blank = create_texture(
            &device,
            "lumen blank frame",
            PixelSize::new(1, 1),
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        );
        write_rgba(&queue, &blank, PixelSize::new(1, 1), &[0, 0, 0, 0]);
        let blank_view = blank.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            max_dimension: dev.max_texture_dimension(),
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            viewport_ubo,
            quad_vbo,
            quad_ibo,
            blank_view,
            instance_vbo: None,
            instance_capacity: 0,
            sync_seq: 0,
            _token: cx.tracker().acquire("wgpu overlay pipeline"),
        })
    }

    fn ensure_instance_capacity(&mut self, required: usize) {
        if required <= self.instance_capacity && self.instance_vbo.is_some() {
            return;
        }
        let new_cap = required.next_power_of_two().max(64);
        self.instance_vbo = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen instance vbo"),
            size: (new_cap * std::mem::size_of::<QuadInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.instance_capacity = new_cap;
    }

    /// View of the frame to sample, uploading host texels when needed.
    fn frame_view(&self, frame: Option<&Texture>) -> wgpu::TextureView {
        match frame.map(|f| (f, f.storage())) {
            Some((_, TextureStorage::Wgpu(t))) => t.create_view(&wgpu::TextureViewDescriptor::default()),
            Some((f, TextureStorage::Host(px))) => {
                let staged = create_texture(
                    &self.device,
                    "lumen staged frame",
                    f.size(),
                    wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                );
                write_rgba(&self.queue, &staged, f.size(), px);
                staged.create_view(&wgpu::TextureViewDescriptor::default())
            }
            None => self.blank_view.clone(),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn render(&mut self, cx: &CurrentGuard, pass: RenderPass<'_>) -> Result<Texture, BackendError> {
        let RenderPass { draw_list, frame, size, clear } = pass;
        BackendError::check_size(size, self.max_dimension)?;

        let mut instances: Vec<(QuadInstance, Option<Rect>)> = Vec::new();
        for item in draw_list.iter_in_paint_order() {
            let instance = match &item.cmd {
                DrawCmd::Quad(q) => {
                    if q.rect.is_empty() {
                        continue;
                    }
                    let (bw, bc) = match q.border {
                        Some(b) => (b.width.max(0.0), b.color.to_array()),
                        None => (0.0, [0.0; 4]),
                    };
                    QuadInstance {
                        origin: q.rect.origin.to_array(),
                        size: q.rect.size.to_array(),
                        color: q.color.to_array(),
                        border_color: bc,
                        params: [q.radius, bw, MODE_SHAPE, 1.0],
                    }
                }
                DrawCmd::Frame(f) => {
                    if f.rect.is_empty() || frame.is_none() {
                        continue;
                    }
                    QuadInstance {
                        origin: f.rect.origin.to_array(),
                        size: f.rect.size.to_array(),
                        color: [0.0; 4],
                        border_color: [0.0; 4],
                        params: [0.0, 0.0, MODE_FRAME, f.opacity.clamp(0.0, 1.0)],
                    }
                }
            };
            instances.push((instance, item.clip_rect));
        }

        let output = create_texture(
            &self.device,
            "lumen render target",
            size,
            wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
        );
        let output_view = output.create_view(&wgpu::TextureViewDescriptor::default());

        self.queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                viewport: [size.width as f32, size.height as f32],
                _pad: [0.0; 2],
            }),
        );
        if !instances.is_empty() {
            self.ensure_instance_capacity(instances.len());
        }

        let frame_view = self.frame_view(frame);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen overlay bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.viewport_ubo.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&frame_view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen overlay encoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("lumen overlay pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: clear.r as f64,
                            g: clear.g as f64,
                            b: clear.b as f64,
                            a: clear.a as f64,
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

            if let Some(instance_vbo) = self.instance_vbo.as_ref().filter(|_| !instances.is_empty()) {
                let raw: Vec<QuadInstance> = instances.iter().map(|(inst, _)| *inst).collect();
                self.queue.write_buffer(instance_vbo, 0, bytemuck::cast_slice(&raw));

                rpass.set_pipeline(&self.pipeline);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
                rpass.set_vertex_buffer(1, instance_vbo.slice(..));
                rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);

                // One instanced draw per run of items sharing a clip rect.
                let mut i = 0usize;
                while i < instances.len() {
                    let clip = instances[i].1;
                    let mut j = i + 1;
                    while j < instances.len() && instances[j].1 == clip {
                        j += 1;
                    }
                    if let Some((sx, sy, sw, sh)) = clip_to_scissor(clip, size) {
                        rpass.set_scissor_rect(sx, sy, sw, sh);
                        rpass.draw_indexed(0..6, 0, i as u32..j as u32);
                    }
                    i = j;
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));

        Ok(Texture::new(size, TextureStorage::Wgpu(output), cx.tracker().acquire("texture")))
    }

    fn sync_point(&mut self, _cx: &CurrentGuard) -> SyncPoint {
        // An empty submission lands after every pass recorded so far.
        let index = self.queue.submit(std::iter::empty());
        self.sync_seq += 1;
        SyncPoint::wgpu(self.sync_seq, self.device.clone(), index)
    }
}
