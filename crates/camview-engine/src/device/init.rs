/// How the preview window's device and surface are set up.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Camera frames are sRGB-encoded; an sRGB surface shows them unchanged.
    pub srgb_surface: bool,

    pub present_mode: wgpu::PresentMode,

    /// Falls back to the first mode the surface supports.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// A preview runs for a long time on laptops; integrated GPUs are enough.
    pub power_preference: wgpu::PowerPreference,

    /// Caps the edge of the camera texture and offscreen target below what
    /// the adapter allows. `None` uses the adapter limit.
    pub max_texture_edge: Option<u32>,

    /// Frames queued ahead of presentation. Lower trades throughput for
    /// camera-to-screen latency.
    pub frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            srgb_surface: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::LowPower,
            max_texture_edge: None,
            frame_latency: 2,
        }
    }
}

impl GpuInit {
    /// Device limits: downlevel defaults raised to the adapter's texture
    /// resolution, then capped by `max_texture_edge`.
    pub(super) fn device_limits(&self, adapter: wgpu::Limits) -> wgpu::Limits {
        let mut limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter);
        if let Some(edge) = self.max_texture_edge {
            limits.max_texture_dimension_2d = limits.max_texture_dimension_2d.min(edge);
        }
        limits
    }
}
