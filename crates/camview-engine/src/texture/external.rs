use crate::backend::{FilterMode, FrameTextureDesc, GpuBackend};
use crate::camera::{self, CameraControl, FrameReceiver, FrameSignal, TexTransform};
use crate::error::{CameraError, ConfigError, PipelineError, ResourceError};

/// One open camera session: the texture and the mailbox feeding it.
struct Session<T> {
    texture: T,
    receiver: FrameReceiver,
}

/// GPU texture fed by the camera.
///
/// Lives for one camera open/close cycle. Reopening always builds a new
/// texture and a new mailbox; sinks handed out by an earlier `open` go dead.
///
/// Threading: frames arrive on the camera's thread through
/// [`crate::camera::FrameSink`], which only stores the frame and notifies the
/// [`FrameSignal`]. All texture work happens in [`Self::bind_for_render`] on
/// the render thread.
pub struct ExternalFrameTexture<B: GpuBackend> {
    session: Option<Session<B::FrameTexture>>,
    filter: FilterMode,
    tex_transform: TexTransform,
    uploads: u64,
}

/// The texture to sample this tick and how to sample it.
pub struct BoundFrame<'a, T> {
    pub texture: &'a T,
    pub tex_transform: TexTransform,
    /// True when a new frame was uploaded by this bind.
    pub updated: bool,
}

impl<B: GpuBackend> Default for ExternalFrameTexture<B> {
    fn default() -> Self {
        Self {
            session: None,
            filter: FilterMode::default(),
            tex_transform: TexTransform::IDENTITY,
            uploads: 0,
        }
    }
}

impl<B: GpuBackend> ExternalFrameTexture<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(filter: FilterMode) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Starts the camera streaming and allocates a texture at the size it
    /// reports once open.
    ///
    /// An already open session is closed first. If the camera reports a zero
    /// size or the texture cannot be allocated, the camera is closed again and
    /// the error returned.
    pub fn open<C: CameraControl + ?Sized>(
        &mut self,
        gpu: &mut B,
        camera: &mut C,
        signal: &FrameSignal,
    ) -> Result<(), PipelineError> {
        if self.is_open() {
            log::debug!("frame texture re-opened; closing previous session");
            if let Err(e) = self.close(gpu, camera) {
                log::warn!("closing previous camera session failed: {e}");
            }
        }

        let (sink, receiver) = camera::session(signal.clone());
        if let Err(e) = camera.open(sink) {
            receiver.detach();
            return Err(e.into());
        }

        let size = camera.preview_size();
        let texture = if size.is_valid() {
            gpu.create_frame_texture(&FrameTextureDesc::camera(size, self.filter))
                .map_err(PipelineError::from)
        } else {
            Err(ConfigError::ZeroCamera(size).into())
        };
        let texture = match texture {
            Ok(texture) => texture,
            Err(e) => {
                receiver.detach();
                if let Err(close_err) = camera.close() {
                    log::warn!("closing camera after failed texture setup: {close_err}");
                }
                return Err(e);
            }
        };

        self.session = Some(Session { texture, receiver });
        self.tex_transform = TexTransform::IDENTITY;
        self.uploads = 0;
        log::debug!("camera opened at {size}; frame texture allocated");
        Ok(())
    }

    /// Pulls the latest frame into the texture and returns what to draw.
    ///
    /// Render thread only. Performs at most one upload per call; if no frame
    /// arrived since the previous call the previous contents and transform
    /// are kept.
    pub fn bind_for_render<'a>(
        &'a mut self,
        gpu: &mut B,
    ) -> Result<BoundFrame<'a, B::FrameTexture>, ResourceError> {
        let session = self
            .session
            .as_mut()
            .ok_or(ResourceError::Released("frame texture"))?;

        let mut updated = false;
        if let Some(frame) = session.receiver.take_latest() {
            gpu.upload_frame(&mut session.texture, &frame)?;
            self.tex_transform = frame.tex_transform();
            self.uploads += 1;
            updated = true;
            log::trace!(
                "uploaded frame #{} ({}), {} dropped so far",
                frame.sequence(),
                frame.size(),
                session.receiver.dropped()
            );
        }

        Ok(BoundFrame {
            texture: &session.texture,
            tex_transform: self.tex_transform,
            updated,
        })
    }

    /// Detaches the mailbox, releases the texture and closes the camera.
    ///
    /// Idempotent: closing a closed texture does not touch the camera. GPU
    /// resources are released even when the camera reports an error.
    pub fn close<C: CameraControl + ?Sized>(
        &mut self,
        gpu: &mut B,
        camera: &mut C,
    ) -> Result<(), CameraError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        session.receiver.detach();
        gpu.destroy_frame_texture(session.texture);

        let result = camera.close();
        log::debug!("camera closed after {} uploads", self.uploads);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::{Command, HeadlessBackend};
    use crate::camera::{CameraFrame, FrameSink};
    use crate::coords::FrameSize;

    struct StubCamera {
        size: FrameSize,
        /// Reports 0x0 until streaming, like devices that negotiate on open.
        size_known_after_open: bool,
        sink: Option<FrameSink>,
        opens: usize,
        closes: usize,
        fail_open: bool,
    }

    impl Default for StubCamera {
        fn default() -> Self {
            Self {
                size: FrameSize::new(4, 2),
                size_known_after_open: false,
                sink: None,
                opens: 0,
                closes: 0,
                fail_open: false,
            }
        }
    }

    impl CameraControl for StubCamera {
        fn preview_size(&self) -> FrameSize {
            if self.size_known_after_open && self.sink.is_none() {
                return FrameSize::default();
            }
            self.size
        }

        fn open(&mut self, sink: FrameSink) -> Result<(), CameraError> {
            if self.fail_open {
                return Err(CameraError::Open("device busy".into()));
            }
            self.opens += 1;
            self.sink = Some(sink);
            Ok(())
        }

        fn close(&mut self) -> Result<(), CameraError> {
            self.closes += 1;
            self.sink = None;
            Ok(())
        }
    }

    fn frame(seq: u64) -> CameraFrame {
        CameraFrame::rgba8(FrameSize::new(4, 2), vec![0u8; 32])
            .unwrap()
            .with_sequence(seq)
    }

    #[test]
    fn bind_uploads_only_the_latest_frame() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera::default();
        let signal = FrameSignal::new();
        let mut tex = ExternalFrameTexture::new();
        tex.open(&mut gpu, &mut camera, &signal).unwrap();

        let sink = camera.sink.clone().unwrap();
        sink.submit(frame(1));
        sink.submit(frame(2));

        let bound = tex.bind_for_render(&mut gpu).unwrap();
        assert!(bound.updated);
        assert_eq!(bound.texture.last_sequence(), Some(2));
        assert_eq!(bound.tex_transform, TexTransform::vertical_flip());

        let bound = tex.bind_for_render(&mut gpu).unwrap();
        assert!(!bound.updated);
        assert_eq!(bound.tex_transform, TexTransform::vertical_flip());

        let uploads = gpu
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::Upload { .. }))
            .count();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn reopen_closes_previous_session() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera::default();
        let signal = FrameSignal::new();
        let mut tex = ExternalFrameTexture::new();

        tex.open(&mut gpu, &mut camera, &signal).unwrap();
        let old_sink = camera.sink.clone().unwrap();
        tex.open(&mut gpu, &mut camera, &signal).unwrap();

        assert_eq!(camera.opens, 2);
        assert_eq!(camera.closes, 1);
        assert_eq!(gpu.live_textures(), 1);
        assert!(!old_sink.submit(frame(9)));
    }

    #[test]
    fn close_is_idempotent() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera::default();
        let mut tex = ExternalFrameTexture::new();
        tex.open(&mut gpu, &mut camera, &FrameSignal::new()).unwrap();

        tex.close(&mut gpu, &mut camera).unwrap();
        tex.close(&mut gpu, &mut camera).unwrap();
        assert_eq!(camera.closes, 1);
        assert!(gpu.is_empty());
    }

    #[test]
    fn failed_open_releases_texture() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera {
            fail_open: true,
            ..Default::default()
        };
        let mut tex = ExternalFrameTexture::new();
        let err = tex
            .open(&mut gpu, &mut camera, &FrameSignal::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Camera(CameraError::Open(_))));
        assert!(!tex.is_open());
        assert!(gpu.is_empty());
    }

    #[test]
    fn texture_is_sized_from_the_opened_camera() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera {
            size_known_after_open: true,
            ..Default::default()
        };
        let mut tex = ExternalFrameTexture::with_filter(FilterMode::Nearest);
        tex.open(&mut gpu, &mut camera, &FrameSignal::new()).unwrap();

        assert_eq!(
            gpu.commands(),
            &[Command::CreateTexture {
                id: 1,
                desc: FrameTextureDesc::camera(FrameSize::new(4, 2), FilterMode::Nearest),
            }]
        );
    }

    #[test]
    fn zero_camera_size_closes_camera_again() {
        let mut gpu = HeadlessBackend::new();
        let mut camera = StubCamera {
            size: FrameSize::new(0, 720),
            ..Default::default()
        };
        let mut tex = ExternalFrameTexture::new();
        let err = tex
            .open(&mut gpu, &mut camera, &FrameSignal::new())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Config(ConfigError::ZeroCamera(_))));
        assert_eq!((camera.opens, camera.closes), (1, 1));
        assert!(!tex.is_open());
        assert!(gpu.is_empty());
    }

    #[test]
    fn oversized_camera_closes_camera_again() {
        let mut gpu = HeadlessBackend::new().with_max_dimension(2);
        let mut camera = StubCamera::default();
        let mut tex = ExternalFrameTexture::new();
        let err = tex
            .open(&mut gpu, &mut camera, &FrameSignal::new())
            .unwrap_err();

        assert!(matches!(err, PipelineError::Resource(ResourceError::TooLarge { .. })));
        assert_eq!(camera.closes, 1);
        assert!(camera.sink.is_none());
    }

    #[test]
    fn bind_without_session_fails() {
        let mut gpu = HeadlessBackend::new();
        let mut tex: ExternalFrameTexture<HeadlessBackend> = ExternalFrameTexture::new();
        assert!(matches!(
            tex.bind_for_render(&mut gpu),
            Err(ResourceError::Released("frame texture"))
        ));
    }
}
