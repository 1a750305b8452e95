use crate::backend::GpuBackend;
use crate::coords::FrameSize;
use crate::error::ResourceError;

/// Offscreen render target sized to the camera resolution.
///
/// Attachments are immutable once created, so a size change always destroys
/// the old target and creates a new one.
pub struct OffscreenTarget<B: GpuBackend> {
    target: Option<(B::Target, FrameSize)>,
}

impl<B: GpuBackend> Default for OffscreenTarget<B> {
    fn default() -> Self {
        Self { target: None }
    }
}

impl<B: GpuBackend> OffscreenTarget<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)creates the target at `size`.
    pub fn create(&mut self, gpu: &mut B, size: FrameSize) -> Result<(), ResourceError> {
        self.destroy(gpu);
        let target = gpu.create_target(size)?;
        log::debug!("offscreen target created at {size}");
        self.target = Some((target, size));
        Ok(())
    }

    /// Recreates the target if it is missing or not `size`. Returns whether it did.
    pub fn ensure_size(&mut self, gpu: &mut B, size: FrameSize) -> Result<bool, ResourceError> {
        if self.size() == Some(size) {
            return Ok(false);
        }
        self.create(gpu, size)?;
        Ok(true)
    }

    /// Idempotent.
    pub fn destroy(&mut self, gpu: &mut B) {
        if let Some((target, size)) = self.target.take() {
            gpu.destroy_target(target);
            log::debug!("offscreen target {size} destroyed");
        }
    }

    pub fn target(&self) -> Option<&B::Target> {
        self.target.as_ref().map(|(t, _)| t)
    }

    pub fn size(&self) -> Option<FrameSize> {
        self.target.as_ref().map(|(_, s)| *s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{Command, HeadlessBackend};

    #[test]
    fn resize_recreates_instead_of_reusing() {
        let mut gpu = HeadlessBackend::new();
        let mut offscreen = OffscreenTarget::new();
        offscreen.create(&mut gpu, FrameSize::new(1280, 720)).unwrap();
        let first = offscreen.target().unwrap().id();

        assert!(!offscreen.ensure_size(&mut gpu, FrameSize::new(1280, 720)).unwrap());
        assert!(offscreen.ensure_size(&mut gpu, FrameSize::new(1920, 1080)).unwrap());

        let second = offscreen.target().unwrap().id();
        assert_ne!(first, second);
        assert_eq!(gpu.live_targets(), 1);
        assert!(gpu.commands().contains(&Command::DestroyTarget(first)));
    }

    #[test]
    fn failed_create_leaves_no_target() {
        let mut gpu = HeadlessBackend::new().with_max_dimension(1024);
        let mut offscreen = OffscreenTarget::new();
        offscreen.create(&mut gpu, FrameSize::new(640, 480)).unwrap();
        assert!(offscreen.create(&mut gpu, FrameSize::new(4096, 2160)).is_err());
        assert!(offscreen.target().is_none());
        assert!(gpu.is_empty());
    }

    #[test]
    fn destroy_twice_is_a_no_op() {
        let mut gpu = HeadlessBackend::new();
        let mut offscreen = OffscreenTarget::new();
        offscreen.create(&mut gpu, FrameSize::new(16, 16)).unwrap();
        offscreen.destroy(&mut gpu);
        offscreen.destroy(&mut gpu);
        assert!(gpu.is_empty());
    }
}
