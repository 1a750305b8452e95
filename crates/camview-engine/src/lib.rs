//! Camera preview compositing engine.
//!
//! Takes frames from a camera collaborator, uploads them to a GPU texture,
//! and draws them aspect-corrected onto a window surface and, when a
//! [`pipeline::FrameConsumer`] is attached, into an offscreen target handed to
//! that consumer.
//!
//! - [`pipeline::PreviewPipeline`]: lifecycle state machine tying it together
//! - [`projection::AspectFitProjector`]: never-stretch quad transform
//! - [`texture::ExternalFrameTexture`]: camera frames to GPU texture
//! - [`render`]: quad renderer, offscreen target, WGSL shader
//! - [`backend::GpuBackend`]: GPU seam, implemented by [`device::Gpu`] (wgpu)
//!   and [`backend::headless::HeadlessBackend`] (tests)
//! - [`window::Runtime`]: winit host

pub mod backend;
pub mod camera;
pub mod coords;
pub mod device;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod projection;
pub mod render;
pub mod texture;
pub mod time;
pub mod window;
