use crate::backend::{ClearColor, FilterMode};
use crate::coords::OrientationPolicy;
use crate::render::QuadShader;

/// Preview pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Color the surface and offscreen target are cleared to before drawing.
    pub clear_color: ClearColor,

    /// How the orientation fed to the projector is chosen.
    pub orientation: OrientationPolicy,

    /// Program used to draw the camera quad.
    pub shader: QuadShader,

    /// Sampling of the camera texture.
    pub frame_filter: FilterMode,
}
