/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next tick.
    Reconfigured,
    /// Transient error; skip the current tick.
    SkipFrame,
    /// Fatal error (commonly OOM).
    Fatal,
}
