use std::sync::Arc;

use crate::backend::{DrawDest, FrameAcquire, GpuBackend};
use crate::camera::{CameraControl, FrameSignal, RedrawRequest};
use crate::coords::FrameSize;
use crate::error::{ConfigError, PipelineError, ResourceError};
use crate::projection::{AspectFit, AspectFitProjector, ProjectionMatrix};
use crate::render::{OffscreenTarget, QuadRenderer};
use crate::texture::ExternalFrameTexture;
use crate::time::FrameClock;

use super::{ConsumerSlot, FrameConsumer, OffscreenFrame, PipelineConfig, PipelineState};

/// What the host supplies when its surface comes up.
pub struct SurfaceContext<'a, B> {
    /// Render-thread GPU context.
    pub gpu: &'a mut B,
    /// Initial drawable size in physical pixels.
    pub viewport: FrameSize,
    /// Invoked (from any thread) when a camera frame is ready.
    pub redraw: Arc<dyn RedrawRequest>,
}

/// Result of one render tick.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// A frame was drawn and presented. `updated` is false when the camera had
    /// not delivered a new frame and the previous one was redrawn.
    Presented { updated: bool },
    /// The surface was not ready; nothing was drawn.
    Skipped,
}

/// Camera preview compositor.
///
/// Owns the camera collaborator, the camera texture, the quad renderer, the
/// optional offscreen target and the optional consumer, and drives them
/// through the lifecycle in lockstep. Every method except
/// [`Self::frame_signal`] must be called on the render thread.
pub struct PreviewPipeline<B: GpuBackend, C: CameraControl> {
    state: PipelineState,
    config: PipelineConfig,
    camera: C,
    frame_texture: ExternalFrameTexture<B>,
    quad: QuadRenderer<B>,
    offscreen: OffscreenTarget<B>,
    consumer: ConsumerSlot<B>,
    signal: FrameSignal,
    viewport: FrameSize,
    camera_size: FrameSize,
    /// (viewport, camera) pair the consumer was last told about.
    consumer_sizes: (FrameSize, FrameSize),
    fit: Option<AspectFit>,
    clock: FrameClock,
}

impl<B: GpuBackend, C: CameraControl> PreviewPipeline<B, C> {
    pub fn new(camera: C, config: PipelineConfig) -> Self {
        Self {
            state: PipelineState::Created,
            frame_texture: ExternalFrameTexture::with_filter(config.frame_filter),
            config,
            camera,
            quad: QuadRenderer::new(),
            offscreen: OffscreenTarget::new(),
            consumer: ConsumerSlot::Detached,
            signal: FrameSignal::new(),
            viewport: FrameSize::default(),
            camera_size: FrameSize::default(),
            consumer_sizes: (FrameSize::default(), FrameSize::default()),
            fit: None,
            clock: FrameClock::new(),
        }
    }

    pub fn with_consumer(mut self, consumer: Box<dyn FrameConsumer<B>>) -> Self {
        self.consumer = ConsumerSlot::Attached(consumer);
        self
    }

    /// Attaches (or replaces) the consumer. Only possible before `create`.
    pub fn set_consumer(&mut self, consumer: Box<dyn FrameConsumer<B>>) -> Result<(), PipelineError> {
        self.expect_state("set_consumer", &[PipelineState::Created])?;
        self.consumer = ConsumerSlot::Attached(consumer);
        Ok(())
    }

    pub fn has_consumer(&self) -> bool {
        self.consumer.is_attached()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Handle the camera side uses to report frame arrival.
    pub fn frame_signal(&self) -> FrameSignal {
        self.signal.clone()
    }

    /// Current quad transform; identity before `create`.
    pub fn projection(&self) -> ProjectionMatrix {
        self.fit.map(|f| f.matrix).unwrap_or_default()
    }

    pub fn aspect_fit(&self) -> Option<&AspectFit> {
        self.fit.as_ref()
    }

    pub fn viewport(&self) -> FrameSize {
        self.viewport
    }

    pub fn camera_size(&self) -> FrameSize {
        self.camera_size
    }

    pub fn offscreen_size(&self) -> Option<FrameSize> {
        self.offscreen.size()
    }

    pub fn camera(&self) -> &C {
        &self.camera
    }

    /// Brings the pipeline up on a freshly created surface.
    ///
    /// On failure everything built so far is released and the pipeline stays
    /// `Created`, so `create` may be retried.
    pub fn create(&mut self, ctx: SurfaceContext<'_, B>) -> Result<(), PipelineError> {
        self.expect_state("create", &[PipelineState::Created])?;

        let SurfaceContext { gpu, viewport, redraw } = ctx;
        if !viewport.is_valid() {
            return Err(ConfigError::ZeroViewport(viewport).into());
        }
        if !self.signal.bind(redraw) {
            log::debug!("frame signal already bound; keeping the first redraw target");
        }

        if let Err(e) = self.bring_up(gpu, viewport) {
            self.roll_back(gpu);
            return Err(e);
        }

        self.state = PipelineState::Running;
        self.clock.reset();
        self.signal.arm();
        log::debug!(
            "pipeline created: viewport={} camera={} consumer={}",
            self.viewport,
            self.camera_size,
            self.consumer.is_attached()
        );
        Ok(())
    }

    /// Re-derives the projection for a new surface size.
    ///
    /// While `Paused` the camera is closed: the viewport is recorded against
    /// the last known camera size and the consumer hears about it on resume.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), PipelineError> {
        self.expect_state("resize", &[PipelineState::Running, PipelineState::Paused])?;

        let viewport = FrameSize::new(width, height);
        if self.state == PipelineState::Paused {
            self.derive_projection(viewport, self.camera_size)?;
            log::debug!("viewport {viewport} recorded while paused");
            return Ok(());
        }

        let camera_size = self.camera.preview_size();
        self.derive_projection(viewport, camera_size)?;
        log::debug!("pipeline resized: viewport={viewport} camera={camera_size}");
        self.report_sizes()
    }

    /// Releases the camera. GPU programs and the offscreen target survive.
    ///
    /// The pipeline is `Paused` afterwards even if the camera reports a close
    /// error; that error is returned after the transition completes.
    pub fn pause(&mut self, gpu: &mut B) -> Result<(), PipelineError> {
        self.expect_state("pause", &[PipelineState::Running])?;

        self.signal.disarm();
        let closed = self.frame_texture.close(gpu, &mut self.camera);
        self.state = PipelineState::Paused;

        if let Some(consumer) = self.consumer.as_mut() {
            consumer.pause();
        }
        log::debug!("pipeline paused");
        closed.map_err(Into::into)
    }

    /// Reopens the camera on a fresh texture and re-derives the projection.
    ///
    /// On failure the camera is closed again and the pipeline stays `Paused`.
    pub fn resume(&mut self, gpu: &mut B) -> Result<(), PipelineError> {
        self.expect_state("resume", &[PipelineState::Paused])?;

        if let Err(e) = self.reopen(gpu) {
            if let Err(close_err) = self.frame_texture.close(gpu, &mut self.camera) {
                log::warn!("closing camera after failed resume: {close_err}");
            }
            return Err(e);
        }

        self.state = PipelineState::Running;
        self.clock.reset();
        self.signal.arm();
        log::debug!("pipeline resumed: camera={}", self.camera_size);
        Ok(())
    }

    /// Draws one tick: camera texture to the offscreen target (when a
    /// consumer is attached) and to the surface, then feeds the consumer.
    pub fn render(&mut self, gpu: &mut B) -> Result<FrameOutcome, PipelineError> {
        self.expect_state("render", &[PipelineState::Running])?;

        self.signal.take_pending();
        if gpu.begin_frame()? == FrameAcquire::Skip {
            log::trace!("surface not ready; frame skipped");
            return Ok(FrameOutcome::Skipped);
        }

        let outcome = self.draw_frame(gpu);
        gpu.end_frame();
        outcome
    }

    /// Releases consumer, camera texture, quad renderer and offscreen target,
    /// in that order. Terminal and idempotent; errors are logged, not returned.
    pub fn dispose(&mut self, gpu: &mut B) {
        if self.state.is_terminal() {
            log::debug!("dispose on a disposed pipeline ignored");
            return;
        }
        let started = self.state != PipelineState::Created;

        self.signal.disarm();
        if let ConsumerSlot::Attached(consumer) = &mut self.consumer {
            if started {
                consumer.dispose(gpu);
            }
        }
        self.consumer = ConsumerSlot::Detached;

        if let Err(e) = self.frame_texture.close(gpu, &mut self.camera) {
            log::warn!("camera close failed during dispose: {e}");
        }
        self.quad.dispose(gpu);
        self.offscreen.destroy(gpu);

        self.state = PipelineState::Disposed;
        log::debug!("pipeline disposed");
    }

    fn expect_state(
        &self,
        operation: &'static str,
        allowed: &[PipelineState],
    ) -> Result<(), PipelineError> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        log::error!("lifecycle violation: `{operation}` called while {}", self.state);
        Err(PipelineError::Lifecycle {
            operation,
            state: self.state,
        })
    }

    /// Replaces the projection only when the new one is valid.
    fn derive_projection(&mut self, viewport: FrameSize, camera: FrameSize) -> Result<(), ConfigError> {
        let orientation = self.config.orientation.resolve(viewport);
        let fit = AspectFitProjector::compute(camera, viewport, orientation)?;
        self.fit = Some(fit);
        self.viewport = viewport;
        self.camera_size = camera;
        Ok(())
    }

    fn bring_up(&mut self, gpu: &mut B, viewport: FrameSize) -> Result<(), PipelineError> {
        self.quad.init(gpu, &self.config.shader)?;
        self.frame_texture.open(gpu, &mut self.camera, &self.signal)?;

        let camera_size = self.camera.preview_size();
        self.derive_projection(viewport, camera_size)?;

        if let ConsumerSlot::Attached(consumer) = &mut self.consumer {
            self.offscreen.create(gpu, camera_size)?;
            consumer
                .create(gpu)
                .map_err(|e| PipelineError::consumer("create", e))?;
        }
        self.consumer_sizes = (viewport, camera_size);
        Ok(())
    }

    fn roll_back(&mut self, gpu: &mut B) {
        if let Err(e) = self.frame_texture.close(gpu, &mut self.camera) {
            log::warn!("closing camera after failed create: {e}");
        }
        self.quad.dispose(gpu);
        self.offscreen.destroy(gpu);
        self.fit = None;
    }

    fn reopen(&mut self, gpu: &mut B) -> Result<(), PipelineError> {
        self.frame_texture.open(gpu, &mut self.camera, &self.signal)?;

        let camera_size = self.camera.preview_size();
        self.derive_projection(self.viewport, camera_size)?;

        if let ConsumerSlot::Attached(consumer) = &mut self.consumer {
            if self.offscreen.ensure_size(gpu, camera_size)? {
                log::debug!("camera resolution is now {camera_size}; offscreen target recreated");
            }
            consumer
                .resume()
                .map_err(|e| PipelineError::consumer("resume", e))?;
        }
        if self.consumer_sizes != (self.viewport, camera_size) {
            self.report_sizes()?;
        }
        Ok(())
    }

    /// Hands the current (viewport, camera) pair to the consumer.
    fn report_sizes(&mut self) -> Result<(), PipelineError> {
        self.consumer_sizes = (self.viewport, self.camera_size);
        match self.consumer.as_mut() {
            Some(consumer) => consumer
                .resize(self.viewport, self.camera_size)
                .map_err(|e| PipelineError::consumer("resize", e)),
            None => Ok(()),
        }
    }

    fn draw_frame(&mut self, gpu: &mut B) -> Result<FrameOutcome, PipelineError> {
        let clear = self.config.clear_color;
        let projection = self.projection();
        let camera_size = self.camera_size;

        gpu.clear(DrawDest::Surface, clear);

        let bound = self.frame_texture.bind_for_render(gpu)?;
        let (texture, tex_transform, updated) = (bound.texture, bound.tex_transform, bound.updated);
        let time = self.clock.tick();

        match &mut self.consumer {
            ConsumerSlot::Detached => {
                self.quad
                    .draw(gpu, DrawDest::Surface, texture, &tex_transform, &projection)?;
            }
            ConsumerSlot::Attached(consumer) => {
                self.offscreen.ensure_size(gpu, camera_size)?;
                let target = self
                    .offscreen
                    .target()
                    .ok_or(ResourceError::Released("offscreen target"))?;

                gpu.clear(DrawDest::Offscreen(target), clear);
                self.quad
                    .draw(gpu, DrawDest::Offscreen(target), texture, &tex_transform, &projection)?;
                self.quad
                    .draw(gpu, DrawDest::Surface, texture, &tex_transform, &projection)?;

                let frame = OffscreenFrame {
                    target,
                    size: camera_size,
                    time,
                    updated,
                };
                consumer
                    .render(gpu, &frame)
                    .map_err(|e| PipelineError::consumer("render", e))?;
            }
        }

        Ok(FrameOutcome::Presented { updated })
    }
}

impl<B: GpuBackend, C: CameraControl> Drop for PreviewPipeline<B, C> {
    fn drop(&mut self) {
        if self.frame_texture.is_open() {
            log::warn!("preview pipeline dropped while {} without dispose; closing camera", self.state);
            if let Err(e) = self.camera.close() {
                log::warn!("camera close failed on drop: {e}");
            }
        }
    }
}
