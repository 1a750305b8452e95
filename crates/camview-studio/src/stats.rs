use std::time::{Duration, Instant};

use camview_engine::coords::FrameSize;
use camview_engine::device::Gpu;
use camview_engine::pipeline::{FrameConsumer, OffscreenFrame};

/// How often the frame rate is reported.
const REPORT_EVERY: Duration = Duration::from_secs(2);

/// Consumer that only watches: logs lifecycle events and the effective
/// preview and camera frame rates.
pub struct FrameStats {
    window_start: Instant,
    presented: u32,
    fresh: u32,
    total: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            presented: 0,
            fresh: 0,
            total: 0,
        }
    }

    fn restart_window(&mut self) {
        self.window_start = Instant::now();
        self.presented = 0;
        self.fresh = 0;
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameConsumer<Gpu> for FrameStats {
    fn create(&mut self, gpu: &mut Gpu) -> anyhow::Result<()> {
        log::info!(
            "frame stats attached (adapter \"{}\")",
            gpu.adapter_info().name
        );
        self.restart_window();
        Ok(())
    }

    fn resize(&mut self, viewport: FrameSize, camera: FrameSize) -> anyhow::Result<()> {
        log::info!("viewport {viewport}, camera {camera}");
        Ok(())
    }

    fn render(&mut self, _gpu: &mut Gpu, frame: &OffscreenFrame<'_, Gpu>) -> anyhow::Result<()> {
        self.presented += 1;
        self.total += 1;
        if frame.updated {
            self.fresh += 1;
        }

        let elapsed = frame.time.now.saturating_duration_since(self.window_start);
        if elapsed >= REPORT_EVERY {
            let secs = elapsed.as_secs_f32();
            log::info!(
                "preview {:.1} fps, camera {:.1} fps, offscreen {} ({:?}), frame #{}",
                self.presented as f32 / secs,
                self.fresh as f32 / secs,
                frame.size,
                frame.target.format(),
                frame.time.frame_index
            );
            self.restart_window();
        }
        Ok(())
    }

    fn pause(&mut self) {
        log::info!("preview paused after {} frames", self.total);
    }

    fn resume(&mut self) -> anyhow::Result<()> {
        log::info!("preview resumed");
        self.restart_window();
        Ok(())
    }

    fn dispose(&mut self, _gpu: &mut Gpu) {
        log::info!("frame stats detached after {} frames", self.total);
    }
}
