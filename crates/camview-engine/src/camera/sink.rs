use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::frame::CameraFrame;
use super::signal::FrameSignal;

/// Single-slot frame store shared by one camera session and the render thread.
#[derive(Default)]
struct Mailbox {
    latest: Mutex<Option<CameraFrame>>,
    detached: AtomicBool,
    dropped: AtomicU64,
}

/// Camera-side handle for delivering frames.
///
/// Handed to [`super::CameraControl::open`]. Cheap to clone and usable from
/// any thread. A submitted frame replaces any frame the render thread has not
/// consumed yet; once the session is closed, submissions are discarded.
#[derive(Clone)]
pub struct FrameSink {
    mailbox: Arc<Mailbox>,
    signal: FrameSignal,
}

impl FrameSink {
    /// Publishes `frame` as the latest frame and signals frame-ready.
    ///
    /// Returns `false` when the session was closed and the frame was discarded.
    pub fn submit(&self, frame: CameraFrame) -> bool {
        if self.mailbox.detached.load(Ordering::Acquire) {
            return false;
        }

        let stale = self
            .mailbox
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(frame);

        if stale.is_some() {
            self.mailbox.dropped.fetch_add(1, Ordering::Relaxed);
        }

        self.signal.notify();
        true
    }

    /// False once the render side closed this session.
    pub fn is_attached(&self) -> bool {
        !self.mailbox.detached.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}

/// Render-side end of a session's mailbox.
pub(crate) struct FrameReceiver {
    mailbox: Arc<Mailbox>,
}

impl FrameReceiver {
    /// Takes the most recent frame, if one arrived since the last call.
    pub(crate) fn take_latest(&self) -> Option<CameraFrame> {
        self.mailbox
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Frames overwritten before the render thread consumed them.
    pub(crate) fn dropped(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }

    /// Ends the session: pending and future frames are discarded.
    pub(crate) fn detach(&self) {
        self.mailbox.detached.store(true, Ordering::Release);
        self.take_latest();
    }
}

/// Creates a fresh session mailbox.
pub(crate) fn session(signal: FrameSignal) -> (FrameSink, FrameReceiver) {
    let mailbox = Arc::new(Mailbox::default());
    (
        FrameSink {
            mailbox: mailbox.clone(),
            signal,
        },
        FrameReceiver { mailbox },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::FrameSize;

    fn frame(seq: u64) -> CameraFrame {
        CameraFrame::rgba8(FrameSize::new(1, 1), vec![0u8; 4])
            .unwrap()
            .with_sequence(seq)
    }

    #[test]
    fn latest_frame_wins() {
        let signal = FrameSignal::new();
        let (sink, rx) = session(signal.clone());
        assert!(sink.submit(frame(1)));
        assert!(sink.submit(frame(2)));
        assert!(sink.submit(frame(3)));

        assert_eq!(rx.take_latest().map(|f| f.sequence()), Some(3));
        assert!(rx.take_latest().is_none());
        assert_eq!(rx.dropped(), 2);
        assert!(signal.is_pending());
    }

    #[test]
    fn detached_session_discards_frames() {
        let (sink, rx) = session(FrameSignal::new());
        sink.submit(frame(1));
        rx.detach();
        assert!(!sink.is_attached());
        assert!(!sink.submit(frame(2)));
        assert!(rx.take_latest().is_none());
    }

    #[test]
    fn sessions_are_independent() {
        let signal = FrameSignal::new();
        let (old_sink, old_rx) = session(signal.clone());
        old_rx.detach();
        let (new_sink, new_rx) = session(signal);
        assert!(!old_sink.submit(frame(1)));
        assert!(new_sink.submit(frame(2)));
        assert_eq!(new_rx.take_latest().map(|f| f.sequence()), Some(2));
    }
}
