//! Camera-fed GPU texture.

mod external;

pub use external::{BoundFrame, ExternalFrameTexture};
