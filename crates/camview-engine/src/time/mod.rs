//! Render tick timing.
//!
//! One [`FrameClock`] per pipeline, ticked once per presented frame. The
//! resulting [`FrameTime`] is handed to the frame consumer.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
