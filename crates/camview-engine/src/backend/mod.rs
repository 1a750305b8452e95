//! Render-thread GPU seam.
//!
//! The compositing components ([`crate::texture`], [`crate::render`],
//! [`crate::pipeline`]) own GPU resources but never talk to a graphics API
//! directly. They go through [`GpuBackend`], which is implemented by:
//! - [`crate::device::Gpu`]: wgpu, bound to a window surface
//! - [`headless::HeadlessBackend`]: no GPU; records commands and tracks live
//!   resources for tests
//!
//! A backend is single-thread-affine. Only the render thread holds `&mut B`.

pub mod headless;

use bytemuck::{Pod, Zeroable};

use crate::camera::CameraFrame;
use crate::coords::FrameSize;
use crate::error::ResourceError;
use crate::render::QuadShader;

/// Texel filtering for the camera texture.
///
/// The preview is almost always scaled, so `Linear` is the default; `Nearest`
/// keeps individual sensor pixels visible.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

/// Creation parameters for a camera frame texture. Camera textures have no
/// mips and always clamp at the edges.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameTextureDesc {
    /// Initial allocation. Uploads of another size reallocate.
    pub size: FrameSize,
    pub filter: FilterMode,
}

impl FrameTextureDesc {
    pub fn camera(size: FrameSize, filter: FilterMode) -> Self {
        Self { size, filter }
    }
}

/// Where a pass renders.
#[derive(Debug)]
pub enum DrawDest<'a, T> {
    /// The presentation surface of the current frame.
    Surface,
    Offscreen(&'a T),
}

impl<T> Clone for DrawDest<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DrawDest<'_, T> {}

/// Linear RGBA clear color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Result of acquiring the next presentable frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameAcquire {
    Ready,
    /// Transient surface condition; skip this tick.
    Skip,
}

/// Quad vertex: NDC position + texture coordinate.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

/// Uniform block of the quad shader (`QuadUniforms` in `quad.wgsl`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadUniforms {
    pub tex_matrix: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

/// Rejects frames whose row stride is not a whole number of RGBA8 texels.
pub(crate) fn check_row_stride(frame: &CameraFrame) -> Result<(), ResourceError> {
    if frame.bytes_per_row() % CameraFrame::BYTES_PER_PIXEL != 0 {
        return Err(ResourceError::Upload(format!(
            "row stride {} is not a multiple of {} bytes",
            frame.bytes_per_row(),
            CameraFrame::BYTES_PER_PIXEL
        )));
    }
    Ok(())
}

/// GPU operations needed by the preview pipeline.
///
/// Resources are returned by value and handed back to `destroy_*` exactly
/// once; the components guarantee this, so implementations may release
/// eagerly there.
pub trait GpuBackend {
    type FrameTexture;
    type QuadProgram;
    type Target;

    fn create_frame_texture(
        &mut self,
        desc: &FrameTextureDesc,
    ) -> Result<Self::FrameTexture, ResourceError>;

    /// Copies `frame` into `texture`, reallocating when the size changed.
    fn upload_frame(
        &mut self,
        texture: &mut Self::FrameTexture,
        frame: &CameraFrame,
    ) -> Result<(), ResourceError>;

    fn destroy_frame_texture(&mut self, texture: Self::FrameTexture);

    /// Builds the quad program. `shader` has already been validated.
    fn create_quad_program(
        &mut self,
        shader: &QuadShader,
        vertices: &[QuadVertex],
        indices: &[u16],
    ) -> Result<Self::QuadProgram, ResourceError>;

    fn destroy_quad_program(&mut self, program: Self::QuadProgram);

    fn create_target(&mut self, size: FrameSize) -> Result<Self::Target, ResourceError>;

    fn destroy_target(&mut self, target: Self::Target);

    /// Acquires the surface image for this tick.
    fn begin_frame(&mut self) -> Result<FrameAcquire, ResourceError>;

    fn clear(&mut self, dest: DrawDest<'_, Self::Target>, color: ClearColor);

    fn draw_quad(
        &mut self,
        dest: DrawDest<'_, Self::Target>,
        program: &Self::QuadProgram,
        texture: &Self::FrameTexture,
        uniforms: &QuadUniforms,
    );

    /// Submits recorded work and presents. No-op without a frame in flight.
    fn end_frame(&mut self);
}
