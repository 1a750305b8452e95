//! Camera preview demo: a synthetic camera composited into a window, with a
//! statistics consumer on the offscreen output.
//!
//! Space pauses/resumes the preview, Escape quits. `RUST_LOG=debug` shows the
//! pipeline lifecycle and projection diagnostics.

mod stats;
mod synthetic;

use anyhow::Result;
use camview_engine::coords::FrameSize;
use camview_engine::device::GpuInit;
use camview_engine::logging::{init_logging, LoggingConfig};
use camview_engine::pipeline::{PipelineConfig, PreviewPipeline};
use camview_engine::window::{Runtime, RuntimeConfig};

use stats::FrameStats;
use synthetic::SyntheticCamera;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let camera = SyntheticCamera::new(FrameSize::new(1280, 720), 30);
    let pipeline = PreviewPipeline::new(camera, PipelineConfig::default())
        .with_consumer(Box::new(FrameStats::new()));

    Runtime::run(
        RuntimeConfig {
            title: "camview studio".to_string(),
            ..RuntimeConfig::default()
        },
        GpuInit::default(),
        pipeline,
    )
}
