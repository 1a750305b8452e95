//! Size and orientation types shared by the projector, the pipeline and the host.
//!
//! All sizes are physical pixels. Camera sizes are reported landscape-native.

mod size;

pub use size::{FrameSize, Orientation, OrientationPolicy};
