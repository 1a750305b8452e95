use wgpu::util::DeviceExt;

use crate::backend::{
    ClearColor, DrawDest, FilterMode, FrameAcquire, FrameTextureDesc, GpuBackend, QuadUniforms,
    QuadVertex,
};
use crate::camera::CameraFrame;
use crate::coords::FrameSize;
use crate::error::ResourceError;
use crate::render::QuadShader;

use super::{Gpu, SurfaceErrorAction};

/// Format of the camera texture. Camera pixels arrive sRGB-encoded.
const FRAME_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Format of offscreen targets handed to frame consumers.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const QUAD_ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2, // pos
    1 => Float32x2  // uv
];

fn quad_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &QUAD_ATTRS,
    }
}

/// Bind group layouts of `quad.wgsl`: uniforms at group 0, camera texture and
/// sampler at group 1.
pub(super) struct QuadLayouts {
    uniforms: wgpu::BindGroupLayout,
    frame: wgpu::BindGroupLayout,
}

impl QuadLayouts {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let uniforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camview quad uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<QuadUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("camview frame texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        Self { uniforms, frame }
    }
}

/// Camera texture with its sampler and bind group.
pub struct WgpuFrameTexture {
    desc: FrameTextureDesc,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    size: FrameSize,
}

impl WgpuFrameTexture {
    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

/// Pipeline and uniforms for one destination.
///
/// Each destination owns its uniform buffer, so queue writes for the
/// offscreen and surface draws of one frame never overwrite each other.
struct QuadPass {
    pipeline: wgpu::RenderPipeline,
    ubo: wgpu::Buffer,
    uniforms: wgpu::BindGroup,
}

/// Quad mesh plus one pass per destination format.
pub struct WgpuQuadProgram {
    surface: QuadPass,
    offscreen: QuadPass,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Color texture the pipeline renders the aspect-corrected frame into.
pub struct WgpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: FrameSize,
}

impl WgpuTarget {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        OFFSCREEN_FORMAT
    }
}

fn extent(size: FrameSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width,
        height: size.height,
        depth_or_array_layers: 1,
    }
}

fn filter_mode(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn wgpu_color(c: ClearColor) -> wgpu::Color {
    wgpu::Color {
        r: c.r as f64,
        g: c.g as f64,
        b: c.b as f64,
        a: c.a as f64,
    }
}

impl Gpu {
    fn check_size(&self, what: &'static str, size: FrameSize) -> Result<(), ResourceError> {
        if !size.is_valid() {
            return Err(ResourceError::EmptyAllocation { what, size });
        }
        let limit = self.max_texture_dimension();
        if size.width > limit || size.height > limit {
            return Err(ResourceError::TooLarge { what, size, limit });
        }
        Ok(())
    }

    fn build_frame_texture(&self, desc: FrameTextureDesc, size: FrameSize) -> WgpuFrameTexture {
        let texture = self.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("camview frame texture"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FRAME_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let filter = filter_mode(desc.filter);
        let sampler = self.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("camview frame sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camview frame bind group"),
            layout: &self.layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        WgpuFrameTexture {
            desc,
            texture,
            bind_group,
            size,
        }
    }

    fn quad_pass(
        &self,
        module: &wgpu::ShaderModule,
        layout: &wgpu::PipelineLayout,
        format: wgpu::TextureFormat,
        label: &str,
    ) -> QuadPass {
        let ubo = self.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<QuadUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniforms = self.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layouts.uniforms,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.as_entire_binding(),
            }],
        });

        let pipeline = self.device().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),

            vertex: wgpu::VertexState {
                module,
                entry_point: Some(QuadShader::VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[quad_vertex_layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some(QuadShader::FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
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

        QuadPass {
            pipeline,
            ubo,
            uniforms,
        }
    }
}

impl GpuBackend for Gpu {
    type FrameTexture = WgpuFrameTexture;
    type QuadProgram = WgpuQuadProgram;
    type Target = WgpuTarget;

    fn create_frame_texture(
        &mut self,
        desc: &FrameTextureDesc,
    ) -> Result<WgpuFrameTexture, ResourceError> {
        self.check_size("frame texture", desc.size)?;
        Ok(self.build_frame_texture(*desc, desc.size))
    }

    fn upload_frame(
        &mut self,
        texture: &mut WgpuFrameTexture,
        frame: &CameraFrame,
    ) -> Result<(), ResourceError> {
        crate::backend::check_row_stride(frame)?;

        let size = frame.size();
        if size != texture.size {
            self.check_size("frame texture", size)?;
            log::debug!("camera frame size {} -> {}; reallocating texture", texture.size, size);
            let fresh = self.build_frame_texture(texture.desc, size);
            let old = std::mem::replace(texture, fresh);
            old.texture.destroy();
        }

        self.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.bytes_per_row()),
                rows_per_image: Some(size.height),
            },
            extent(size),
        );
        Ok(())
    }

    fn destroy_frame_texture(&mut self, texture: WgpuFrameTexture) {
        texture.texture.destroy();
    }

    fn create_quad_program(
        &mut self,
        shader: &QuadShader,
        vertices: &[QuadVertex],
        indices: &[u16],
    ) -> Result<WgpuQuadProgram, ResourceError> {
        let module = self
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(shader.label()),
                source: wgpu::ShaderSource::Wgsl(shader.wgsl().into()),
            });

        let layout = self
            .device()
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("camview quad pipeline layout"),
                bind_group_layouts: &[&self.layouts.uniforms, &self.layouts.frame],
                immediate_size: 0,
            });

        let surface = self.quad_pass(
            &module,
            &layout,
            self.surface_format(),
            "camview quad (surface)",
        );
        let offscreen = self.quad_pass(&module, &layout, OFFSCREEN_FORMAT, "camview quad (offscreen)");

        let vertex_buffer = self
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("camview quad vbo"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("camview quad ibo"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Ok(WgpuQuadProgram {
            surface,
            offscreen,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        })
    }

    fn destroy_quad_program(&mut self, program: WgpuQuadProgram) {
        program.surface.ubo.destroy();
        program.offscreen.ubo.destroy();
        program.vertex_buffer.destroy();
        program.index_buffer.destroy();
    }

    fn create_target(&mut self, size: FrameSize) -> Result<WgpuTarget, ResourceError> {
        self.check_size("offscreen target", size)?;

        let texture = self.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("camview offscreen target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuTarget {
            texture,
            view,
            size,
        })
    }

    fn destroy_target(&mut self, target: WgpuTarget) {
        target.texture.destroy();
    }

    fn begin_frame(&mut self) -> Result<FrameAcquire, ResourceError> {
        if self.frame.is_some() {
            log::warn!("begin_frame with a frame still in flight; submitting it first");
            self.end_frame();
        }
        let size = self.size();
        if size.width == 0 || size.height == 0 {
            return Ok(FrameAcquire::Skip);
        }

        match self.acquire() {
            Ok(frame) => {
                self.frame = Some(frame);
                Ok(FrameAcquire::Ready)
            }
            Err(err) => {
                let message = err.to_string();
                match self.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(ResourceError::SurfaceLost(message)),
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => {
                        Ok(FrameAcquire::Skip)
                    }
                }
            }
        }
    }

    fn clear(&mut self, dest: DrawDest<'_, WgpuTarget>, color: ClearColor) {
        let Some(frame) = self.frame.as_mut() else {
            log::trace!("clear outside a frame ignored");
            return;
        };
        let view = match dest {
            DrawDest::Surface => &frame.view,
            DrawDest::Offscreen(t) => &t.view,
        };

        let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("camview clear"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu_color(color)),
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

    fn draw_quad(
        &mut self,
        dest: DrawDest<'_, WgpuTarget>,
        program: &WgpuQuadProgram,
        texture: &WgpuFrameTexture,
        uniforms: &QuadUniforms,
    ) {
        let pass = match dest {
            DrawDest::Surface => &program.surface,
            DrawDest::Offscreen(_) => &program.offscreen,
        };
        let Some(frame) = self.frame.as_mut() else {
            log::trace!("draw outside a frame ignored");
            return;
        };
        self.queue.write_buffer(&pass.ubo, 0, bytemuck::bytes_of(uniforms));

        let view = match dest {
            DrawDest::Surface => &frame.view,
            DrawDest::Offscreen(t) => &t.view,
        };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("camview quad pass"),
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
        });

        rpass.set_pipeline(&pass.pipeline);
        rpass.set_bind_group(0, &pass.uniforms, &[]);
        rpass.set_bind_group(1, &texture.bind_group, &[]);
        rpass.set_vertex_buffer(0, program.vertex_buffer.slice(..));
        rpass.set_index_buffer(program.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..program.index_count, 0, 0..1);
    }

    fn end_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.submit(frame);
        }
    }
}
