//! Preview pipeline: lifecycle state machine tying the camera texture, quad
//! renderer, offscreen target and optional consumer together.

mod config;
mod consumer;
mod preview;
mod state;


pub use config::PipelineConfig;
pub use consumer::{ConsumerSlot, FrameConsumer, OffscreenFrame};
pub use preview::{FrameOutcome, PreviewPipeline, SurfaceContext};
pub use state::PipelineState;
