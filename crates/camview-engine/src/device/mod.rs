//! wgpu device and window surface.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - implementing [`crate::backend::GpuBackend`] on top of them

mod backend;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use backend::{WgpuFrameTexture, WgpuQuadProgram, WgpuTarget, OFFSCREEN_FORMAT};
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
