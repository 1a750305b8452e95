//! Camera quad rendering.
//!
//! Renderers own their GPU resources and issue work through
//! [`crate::backend::GpuBackend`].
//!
//! Convention:
//! - the quad spans NDC `[-1, 1]²` with UVs `[0, 1]²` (`v = 0` at the bottom)
//! - the vertex shader applies the aspect-fit projection to positions and the
//!   per-frame texture transform to UVs

mod offscreen;
mod quad;
mod shader;

pub use offscreen::OffscreenTarget;
pub use quad::{QuadRenderer, QUAD_FAN_INDICES, QUAD_VERTICES};
pub use shader::QuadShader;
