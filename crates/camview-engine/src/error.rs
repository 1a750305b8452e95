//! Error types for the preview pipeline.
//!
//! Each component reports the narrowest error it can produce; the pipeline
//! unifies them in [`PipelineError`]. Runtime and application boundaries wrap
//! these in `anyhow` with context.

use thiserror::Error;

use crate::coords::FrameSize;
use crate::pipeline::PipelineState;

/// Invalid sizes handed to the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("viewport size {0} has a zero dimension")]
    ZeroViewport(FrameSize),

    #[error("camera preview size {0} has a zero dimension")]
    ZeroCamera(FrameSize),
}

/// GPU resource creation or use failed.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("shader `{label}` failed to compile:\n{message}")]
    ShaderCompile { label: String, message: String },

    #[error("shader `{label}` has no entry point named `{entry}`")]
    MissingEntryPoint { label: String, entry: &'static str },

    #[error("{what} of size {size} exceeds the device limit of {limit}px")]
    TooLarge {
        what: &'static str,
        size: FrameSize,
        limit: u32,
    },

    #[error("{what} cannot have size {size}")]
    EmptyAllocation { what: &'static str, size: FrameSize },

    #[error("{0} was used after it was released")]
    Released(&'static str),

    #[error("frame upload rejected: {0}")]
    Upload(String),

    #[error("presentation surface is unrecoverable: {0}")]
    SurfaceLost(String),
}

/// The camera collaborator failed. Never retried by the pipeline.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera failed to open: {0}")]
    Open(String),

    #[error("camera failed to close: {0}")]
    Close(String),

    #[error("camera delivered a malformed frame: {0}")]
    MalformedFrame(String),

    #[error("camera I/O error")]
    Io(#[from] std::io::Error),
}

/// Any failure surfaced by [`crate::pipeline::PreviewPipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("`{operation}` is not allowed while the pipeline is {state}")]
    Lifecycle {
        operation: &'static str,
        state: PipelineState,
    },

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("frame consumer failed during `{stage}`")]
    Consumer {
        stage: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub(crate) fn consumer(stage: &'static str, source: anyhow::Error) -> Self {
        Self::Consumer { stage, source }
    }

    /// True for out-of-order lifecycle calls (programmer errors).
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(self, Self::Lifecycle { .. })
    }
}
