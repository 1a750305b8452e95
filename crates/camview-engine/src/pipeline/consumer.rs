use crate::backend::GpuBackend;
use crate::coords::FrameSize;
use crate::time::FrameTime;

/// The aspect-corrected camera frame handed to the consumer each tick.
pub struct OffscreenFrame<'a, B: GpuBackend> {
    /// Rendered at the camera resolution.
    pub target: &'a B::Target,
    pub size: FrameSize,
    pub time: FrameTime,
    /// False when no new camera frame arrived since the previous tick.
    pub updated: bool,
}

/// Downstream stage (encoder, filter, ...) fed from the offscreen target.
///
/// Mirrors the pipeline lifecycle: each call follows the pipeline's own step,
/// except `dispose`, which comes first. All calls happen on the render thread.
pub trait FrameConsumer<B: GpuBackend> {
    fn create(&mut self, gpu: &mut B) -> anyhow::Result<()>;

    /// `viewport` is the on-screen size, `camera` the current preview size.
    fn resize(&mut self, viewport: FrameSize, camera: FrameSize) -> anyhow::Result<()> {
        let _ = (viewport, camera);
        Ok(())
    }

    fn render(&mut self, gpu: &mut B, frame: &OffscreenFrame<'_, B>) -> anyhow::Result<()>;

    fn pause(&mut self) {}

    fn resume(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn dispose(&mut self, gpu: &mut B);
}

/// Optional consumer. Every pipeline step matches on it explicitly.
pub enum ConsumerSlot<B: GpuBackend> {
    Detached,
    Attached(Box<dyn FrameConsumer<B>>),
}

impl<B: GpuBackend> ConsumerSlot<B> {
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached(_))
    }

    pub fn as_mut(&mut self) -> Option<&mut (dyn FrameConsumer<B> + 'static)> {
        match self {
            Self::Detached => None,
            Self::Attached(c) => Some(c.as_mut()),
        }
    }
}

impl<B: GpuBackend> Default for ConsumerSlot<B> {
    fn default() -> Self {
        Self::Detached
    }
}
