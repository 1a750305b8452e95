use crate::coords::FrameSize;
use crate::error::CameraError;

use super::sink::FrameSink;

/// Camera device collaborator.
///
/// The pipeline never negotiates formats: it hands the camera a sink, then
/// reads back whatever preview size the camera reports. Calls are made on the
/// render thread and are expected to block until the device has settled.
pub trait CameraControl {
    /// Current preview resolution, landscape-native.
    fn preview_size(&self) -> FrameSize;

    /// Starts streaming into `sink`. Frames may be submitted from any thread.
    fn open(&mut self, sink: FrameSink) -> Result<(), CameraError>;

    /// Stops streaming and releases the device.
    fn close(&mut self) -> Result<(), CameraError>;
}

impl<C: CameraControl + ?Sized> CameraControl for Box<C> {
    fn preview_size(&self) -> FrameSize {
        (**self).preview_size()
    }

    fn open(&mut self, sink: FrameSink) -> Result<(), CameraError> {
        (**self).open(sink)
    }

    fn close(&mut self) -> Result<(), CameraError> {
        (**self).close()
    }
}
