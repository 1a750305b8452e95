use std::sync::Arc;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::camera::CameraControl;
use crate::coords::FrameSize;
use crate::device::{Gpu, GpuInit};
use crate::error::{PipelineError, ResourceError};
use crate::pipeline::{PipelineState, PreviewPipeline, SurfaceContext};

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// Space toggles pause/resume, Escape closes the window.
    pub keyboard_controls: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "camview".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            keyboard_controls: true,
        }
    }
}

/// Entry point for the runtime.
///
/// Hosts one preview pipeline in one window. Rendering is event driven: the
/// loop sleeps (`ControlFlow::Wait`) until the camera's frame signal requests
/// a redraw, or the window needs one.
pub struct Runtime;

impl Runtime {
    pub fn run<C>(config: RuntimeConfig, gpu_init: GpuInit, pipeline: PreviewPipeline<Gpu, C>) -> Result<()>
    where
        C: CameraControl + 'static,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = PreviewHost::new(config, gpu_init, pipeline);

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        match host.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct PreviewHost<C: CameraControl> {
    config: RuntimeConfig,
    gpu_init: GpuInit,
    pipeline: PreviewPipeline<Gpu, C>,
    gpu: Option<Gpu>,
    fatal: Option<anyhow::Error>,
}

impl<C: CameraControl> PreviewHost<C> {
    fn new(config: RuntimeConfig, gpu_init: GpuInit, pipeline: PreviewPipeline<Gpu, C>) -> Self {
        Self {
            config,
            gpu_init,
            pipeline,
            gpu: None,
            fatal: None,
        }
    }

    fn create_gpu(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        pollster::block_on(Gpu::new(window, self.gpu_init.clone()))
            .context("GPU initialization failed for window")
    }

    /// Brings the pipeline up (first resume) or back (later resumes).
    fn start(&mut self) -> Result<(), PipelineError> {
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        match self.pipeline.state() {
            PipelineState::Created => {
                let redraw = gpu.window().clone();
                let viewport = FrameSize::from(gpu.size());
                self.pipeline.create(SurfaceContext {
                    gpu: &mut *gpu,
                    viewport,
                    redraw,
                })?;
            }
            PipelineState::Paused => {
                self.pipeline.resume(gpu)?;
                sync_viewport(&mut self.pipeline, gpu);
            }
            PipelineState::Running | PipelineState::Disposed => return Ok(()),
        }

        gpu.window().request_redraw();
        Ok(())
    }

    fn toggle_pause(&mut self) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        let result = match self.pipeline.state() {
            PipelineState::Running => self.pipeline.pause(gpu),
            PipelineState::Paused => self.pipeline.resume(gpu).map(|()| {
                sync_viewport(&mut self.pipeline, gpu);
            }),
            _ => Ok(()),
        };
        if let Err(e) = result {
            log::warn!("pause/resume toggle failed: {e:#}");
        }
        gpu.window().request_redraw();
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        gpu.resize(size);

        // Minimized windows report 0x0; the pipeline keeps its projection.
        if size.width == 0 || size.height == 0 {
            return;
        }
        // Paused pipelines record the size and apply it on resume.
        if matches!(self.pipeline.state(), PipelineState::Running | PipelineState::Paused) {
            if let Err(e) = self.pipeline.resize(size.width, size.height) {
                log::warn!("pipeline resize to {}x{} failed: {e:#}", size.width, size.height);
            }
        }
        gpu.window().request_redraw();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        if self.pipeline.state() != PipelineState::Running {
            return;
        }

        match self.pipeline.render(gpu) {
            Ok(_) => {}
            Err(e @ PipelineError::Resource(ResourceError::SurfaceLost(_))) => {
                self.fail(event_loop, e.into());
            }
            Err(e) => log::warn!("frame failed: {e:#}"),
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.as_mut() {
            self.pipeline.dispose(gpu);
        }
        self.gpu = None;
        event_loop.exit();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.fatal.get_or_insert(err);
        self.shutdown(event_loop);
    }
}

/// Applies a surface size the pipeline has not seen, e.g. one changed while
/// suspended without a `Resized` event.
fn sync_viewport<C: CameraControl>(pipeline: &mut PreviewPipeline<Gpu, C>, gpu: &Gpu) {
    let size = FrameSize::from(gpu.size());
    if !size.is_valid() || size == pipeline.viewport() {
        return;
    }
    if let Err(e) = pipeline.resize(size.width, size.height) {
        log::warn!("pipeline resize to {size} after resume failed: {e:#}");
    }
}

impl<C: CameraControl> ApplicationHandler for PreviewHost<C> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_none() {
            match self.create_gpu(event_loop) {
                Ok(gpu) => self.gpu = Some(gpu),
                Err(e) => {
                    self.fail(event_loop, e);
                    return;
                }
            }
        }

        if let Err(e) = self.start() {
            self.fail(event_loop, anyhow::Error::new(e).context("failed to start preview"));
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else { return };
        if self.pipeline.state() == PipelineState::Running {
            if let Err(e) = self.pipeline.pause(gpu) {
                log::warn!("pause on suspend: {e:#}");
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(new_size) => self.resize(new_size),

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(size) = self.gpu.as_ref().map(|g| g.window().inner_size()) {
                    self.resize(size);
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } if self.config.keyboard_controls => match code {
                KeyCode::Space => self.toggle_pause(),
                KeyCode::Escape => self.shutdown(event_loop),
                _ => {}
            },

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = self.gpu.as_mut() {
            self.pipeline.dispose(gpu);
        }
    }
}
