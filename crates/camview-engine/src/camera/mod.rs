//! Camera boundary.
//!
//! The camera itself is an external collaborator ([`CameraControl`]). This
//! module defines what crosses the boundary:
//! - [`CameraFrame`]: pixels plus the per-frame [`TexTransform`]
//! - [`FrameSink`]: the producer-side handle, a capacity-1 mailbox
//! - [`FrameSignal`]: the lock-free frame-ready notification that asks the
//!   host ([`RedrawRequest`]) to schedule a render tick

mod control;
mod frame;
mod signal;
mod sink;

pub use control::CameraControl;
pub use frame::{CameraFrame, TexTransform};
pub use signal::{FrameSignal, RedrawRequest};
pub use sink::FrameSink;

pub(crate) use sink::{session, FrameReceiver};
