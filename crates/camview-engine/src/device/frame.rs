/// The surface image acquired for one render tick, plus its encoder.
///
/// Held by [`super::Gpu`] between `begin_frame` and `end_frame`. Holding the
/// surface texture prevents acquisition of subsequent frames.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
