use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Host primitive that schedules a redraw on the render thread.
///
/// Must be callable from any thread and must not render synchronously.
pub trait RedrawRequest: Send + Sync {
    fn request_redraw(&self);
}

impl RedrawRequest for winit::window::Window {
    fn request_redraw(&self) {
        winit::window::Window::request_redraw(self);
    }
}

/// Cross-thread "a new frame is available" notification.
///
/// A single dirty flag: any number of notifications between two render ticks
/// collapse into one. Notifying never touches GPU state; it only asks the host
/// for a redraw, and only while the pipeline is running. Notifications that
/// arrive before the pipeline is created (or while it is paused) are absorbed.
#[derive(Clone, Default)]
pub struct FrameSignal {
    shared: Arc<SignalShared>,
}

#[derive(Default)]
struct SignalShared {
    pending: AtomicBool,
    armed: AtomicBool,
    notifications: AtomicU64,
    redraw: OnceLock<Arc<dyn RedrawRequest>>,
}

impl FrameSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a frame as available and requests a redraw when armed.
    pub fn notify(&self) {
        self.shared.notifications.fetch_add(1, Ordering::Relaxed);
        let was_pending = self.shared.pending.swap(true, Ordering::AcqRel);

        if was_pending || !self.shared.armed.load(Ordering::Acquire) {
            return;
        }
        if let Some(redraw) = self.shared.redraw.get() {
            redraw.request_redraw();
        }
    }

    /// True when a frame arrived since the last render tick.
    pub fn is_pending(&self) -> bool {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Total notifications received, including absorbed ones.
    pub fn notifications(&self) -> u64 {
        self.shared.notifications.load(Ordering::Relaxed)
    }

    /// Binds the host's redraw primitive. The first binding wins.
    pub(crate) fn bind(&self, redraw: Arc<dyn RedrawRequest>) -> bool {
        self.shared.redraw.set(redraw).is_ok()
    }

    /// Starts forwarding notifications. A frame absorbed while disarmed is
    /// forwarded immediately, since no later notification will.
    pub(crate) fn arm(&self) {
        self.shared.armed.store(true, Ordering::Release);
        if self.is_pending() {
            if let Some(redraw) = self.shared.redraw.get() {
                redraw.request_redraw();
            }
        }
    }

    pub(crate) fn disarm(&self) {
        self.shared.armed.store(false, Ordering::Release);
    }

    /// Clears the dirty flag, returning its previous value.
    pub(crate) fn take_pending(&self) -> bool {
        self.shared.pending.swap(false, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for FrameSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSignal")
            .field("pending", &self.is_pending())
            .field("armed", &self.shared.armed.load(Ordering::Relaxed))
            .field("bound", &self.shared.redraw.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Default)]
    struct CountingRedraw(AtomicUsize);

    impl RedrawRequest for CountingRedraw {
        fn request_redraw(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bound_signal() -> (FrameSignal, Arc<CountingRedraw>) {
        let redraw = Arc::new(CountingRedraw::default());
        let signal = FrameSignal::new();
        assert!(signal.bind(redraw.clone()));
        (signal, redraw)
    }

    #[test]
    fn unbound_signal_absorbs_notifications() {
        let signal = FrameSignal::new();
        signal.notify();
        signal.arm();
        signal.notify();
        assert!(signal.is_pending());
        assert_eq!(signal.notifications(), 2);
    }

    #[test]
    fn disarmed_signal_does_not_request_redraw() {
        let (signal, redraw) = bound_signal();
        signal.notify();
        assert_eq!(redraw.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn notifications_coalesce_until_taken() {
        let (signal, redraw) = bound_signal();
        signal.arm();
        signal.notify();
        signal.notify();
        signal.notify();
        assert_eq!(redraw.0.load(Ordering::SeqCst), 1);

        assert!(signal.take_pending());
        assert!(!signal.take_pending());

        signal.notify();
        assert_eq!(redraw.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arming_forwards_absorbed_frame() {
        let (signal, redraw) = bound_signal();
        signal.notify();
        signal.arm();
        assert_eq!(redraw.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn first_binding_wins() {
        let (signal, _) = bound_signal();
        assert!(!signal.bind(Arc::new(CountingRedraw::default())));
    }

    #[test]
    fn notify_from_other_threads() {
        let (signal, redraw) = bound_signal();
        signal.arm();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = signal.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        s.notify();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(signal.notifications(), 400);
        assert!(redraw.0.load(Ordering::SeqCst) >= 1);
        assert!(signal.take_pending());
    }
}
