//! Aspect-ratio correction for camera frames.
//!
//! The projector maps a camera frame onto a viewport with a center-crop policy:
//! the viewport is filled completely, the camera aspect ratio is preserved and
//! whichever camera dimension overflows is cropped symmetrically.

mod aspect_fit;

pub use aspect_fit::{AspectFit, AspectFitProjector, CenterCrop, CropAxis, ProjectionMatrix};
