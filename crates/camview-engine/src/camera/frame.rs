use std::sync::Arc;

use glam::{Mat4, Vec3};

use crate::coords::FrameSize;
use crate::error::CameraError;

/// Maps quad UVs into the sampled frame's texture space.
///
/// Supplied by the camera with every frame so that source-specific cropping,
/// rotation or row order is corrected at sample time.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TexTransform(Mat4);

impl TexTransform {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    pub fn from_mat4(m: Mat4) -> Self {
        Self(m)
    }

    /// `v' = 1 - v`. Frames whose first row is the top of the image need this,
    /// since quad UVs have `v = 0` at the bottom edge.
    pub fn vertical_flip() -> Self {
        Self(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)) * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0)))
    }

    #[inline]
    pub fn as_mat4(&self) -> &Mat4 {
        &self.0
    }

    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.0.to_cols_array_2d()
    }
}

impl Default for TexTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// One camera image in RGBA8 (sRGB) layout.
///
/// Pixel storage is shared so the producer can hand the same buffer to several
/// sinks without copying.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    size: FrameSize,
    bytes_per_row: u32,
    pixels: Arc<[u8]>,
    tex_transform: TexTransform,
    sequence: u64,
}

impl CameraFrame {
    pub const BYTES_PER_PIXEL: u32 = 4;

    /// Wraps tightly packed, top-down RGBA8 rows.
    pub fn rgba8(size: FrameSize, pixels: impl Into<Arc<[u8]>>) -> Result<Self, CameraError> {
        let bytes_per_row = size.width.saturating_mul(Self::BYTES_PER_PIXEL);
        Self::rgba8_strided(size, bytes_per_row, pixels)
    }

    /// Wraps top-down RGBA8 rows that are `bytes_per_row` apart.
    pub fn rgba8_strided(
        size: FrameSize,
        bytes_per_row: u32,
        pixels: impl Into<Arc<[u8]>>,
    ) -> Result<Self, CameraError> {
        let pixels = pixels.into();

        if !size.is_valid() {
            return Err(CameraError::MalformedFrame(format!("frame size {size} is empty")));
        }
        let min_row = size.width as u64 * Self::BYTES_PER_PIXEL as u64;
        if (bytes_per_row as u64) < min_row {
            return Err(CameraError::MalformedFrame(format!(
                "row stride {bytes_per_row} is shorter than {min_row} bytes"
            )));
        }
        let needed = bytes_per_row as u64 * (size.height as u64 - 1) + min_row;
        if (pixels.len() as u64) < needed {
            return Err(CameraError::MalformedFrame(format!(
                "{} bytes supplied for a {size} frame, {needed} needed",
                pixels.len()
            )));
        }

        Ok(Self {
            size,
            bytes_per_row,
            pixels,
            tex_transform: TexTransform::vertical_flip(),
            sequence: 0,
        })
    }

    /// Replaces the default (row-order) transform.
    pub fn with_tex_transform(mut self, transform: TexTransform) -> Self {
        self.tex_transform = transform;
        self
    }

    /// Producer-assigned sequence number, for diagnostics.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn tex_transform(&self) -> TexTransform {
        self.tex_transform
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;

    #[test]
    fn packed_frame_accepts_exact_length() {
        let f = CameraFrame::rgba8(FrameSize::new(2, 2), vec![0u8; 16]).unwrap();
        assert_eq!(f.bytes_per_row(), 8);
        assert_eq!(f.pixels().len(), 16);
    }

    #[test]
    fn short_buffer_is_malformed() {
        let err = CameraFrame::rgba8(FrameSize::new(2, 2), vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, CameraError::MalformedFrame(_)));
    }

    #[test]
    fn strided_last_row_may_omit_padding() {
        // two rows of 8 bytes, stride 12: 12 + 8
        assert!(CameraFrame::rgba8_strided(FrameSize::new(2, 2), 12, vec![0u8; 20]).is_ok());
        assert!(CameraFrame::rgba8_strided(FrameSize::new(2, 2), 4, vec![0u8; 64]).is_err());
    }

    #[test]
    fn empty_frame_is_malformed() {
        assert!(CameraFrame::rgba8(FrameSize::new(0, 4), Vec::new()).is_err());
    }

    #[test]
    fn vertical_flip_maps_bottom_to_top() {
        let m = *TexTransform::vertical_flip().as_mat4();
        let uv = m * Vec4::new(0.25, 0.0, 0.0, 1.0);
        assert!((uv.x - 0.25).abs() < 1e-6);
        assert!((uv.y - 1.0).abs() < 1e-6);
        let uv = m * Vec4::new(1.0, 1.0, 0.0, 1.0);
        assert!(uv.y.abs() < 1e-6);
    }
}
