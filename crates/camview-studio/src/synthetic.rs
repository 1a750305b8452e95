use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use camview_engine::camera::{CameraControl, CameraFrame, FrameSink};
use camview_engine::coords::FrameSize;
use camview_engine::error::CameraError;

/// SMPTE-style bar colors, left to right.
const BARS: [[u8; 4]; 8] = [
    [235, 235, 235, 255],
    [235, 235, 16, 255],
    [16, 235, 235, 255],
    [16, 235, 16, 255],
    [235, 16, 235, 255],
    [235, 16, 16, 255],
    [16, 16, 235, 255],
    [16, 16, 16, 255],
];

/// Pixels the bars scroll per frame.
const SCROLL_STEP: u64 = 4;

struct Producer {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Camera stand-in that streams scrolling color bars from its own thread.
pub struct SyntheticCamera {
    size: FrameSize,
    period: Duration,
    producer: Option<Producer>,
}

impl SyntheticCamera {
    pub fn new(size: FrameSize, fps: u32) -> Self {
        Self {
            size,
            period: Duration::from_secs(1) / fps.max(1),
            producer: None,
        }
    }
}

impl CameraControl for SyntheticCamera {
    fn preview_size(&self) -> FrameSize {
        self.size
    }

    fn open(&mut self, sink: FrameSink) -> Result<(), CameraError> {
        self.close()?;

        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new()
            .name("synthetic-camera".into())
            .spawn({
                let stop = stop.clone();
                let (size, period) = (self.size, self.period);
                move || produce(size, period, &sink, &stop)
            })?;

        self.producer = Some(Producer { stop, handle });
        log::info!("synthetic camera streaming {} every {:?}", self.size, self.period);
        Ok(())
    }

    fn close(&mut self) -> Result<(), CameraError> {
        let Some(producer) = self.producer.take() else {
            return Ok(());
        };
        producer.stop.store(true, Ordering::Release);
        producer
            .handle
            .join()
            .map_err(|_| CameraError::Close("synthetic camera thread panicked".into()))?;
        log::info!("synthetic camera stopped");
        Ok(())
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{e}");
        }
    }
}

fn produce(size: FrameSize, period: Duration, sink: &FrameSink, stop: &AtomicBool) {
    let mut sequence = 0u64;
    let mut deadline = Instant::now();

    while !stop.load(Ordering::Acquire) && sink.is_attached() {
        let frame = match CameraFrame::rgba8(size, color_bars(size, sequence * SCROLL_STEP)) {
            Ok(f) => f.with_sequence(sequence),
            Err(e) => {
                log::error!("synthetic camera cannot build frames: {e}");
                return;
            }
        };
        sink.submit(frame);
        sequence += 1;

        deadline += period;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            deadline = now;
        }
    }
    log::debug!("synthetic camera produced {sequence} frames");
}

/// Eight vertical bars shifted left by `offset` pixels, top-down RGBA8.
fn color_bars(size: FrameSize, offset: u64) -> Vec<u8> {
    let width = size.width as usize;
    let bar_width = (width / BARS.len()).max(1);

    let row: Vec<u8> = (0..width)
        .flat_map(|x| {
            let shifted = (x as u64 + offset) % width as u64;
            let bar = (shifted as usize / bar_width).min(BARS.len() - 1);
            BARS[bar]
        })
        .collect();

    row.repeat(size.height as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_fill_the_frame() {
        let size = FrameSize::new(64, 3);
        let pixels = color_bars(size, 0);
        assert_eq!(pixels.len(), 64 * 3 * 4);
        assert_eq!(&pixels[0..4], &BARS[0]);
        assert_eq!(&pixels[63 * 4..64 * 4], &BARS[7]);
        // Every row is identical.
        assert_eq!(&pixels[0..256], &pixels[256..512]);
    }

    #[test]
    fn bars_scroll_with_offset() {
        let size = FrameSize::new(64, 1);
        let shifted = color_bars(size, 8);
        assert_eq!(&shifted[0..4], &BARS[1]);
        assert_eq!(color_bars(size, 64), color_bars(size, 0));
    }

    #[test]
    fn frames_are_valid_camera_frames() {
        let size = FrameSize::new(30, 7);
        assert!(CameraFrame::rgba8(size, color_bars(size, 3)).is_ok());
    }

    #[test]
    fn closing_an_unopened_camera_is_a_no_op() {
        let mut camera = SyntheticCamera::new(FrameSize::new(16, 16), 30);
        assert!(camera.close().is_ok());
        assert_eq!(camera.preview_size(), FrameSize::new(16, 16));
    }
}
