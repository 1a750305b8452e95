use glam::{Mat4, Vec3};

use crate::coords::{FrameSize, Orientation};
use crate::error::ConfigError;

/// Vertex transform applied to the full-screen quad.
///
/// Always derived from scratch by [`AspectFitProjector::compute`]; never
/// updated incrementally.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionMatrix(Mat4);

impl ProjectionMatrix {
    pub const IDENTITY: Self = Self(Mat4::IDENTITY);

    #[inline]
    pub fn as_mat4(&self) -> &Mat4 {
        &self.0
    }

    #[inline]
    pub fn to_cols_array_2d(&self) -> [[f32; 4]; 4] {
        self.0.to_cols_array_2d()
    }

    /// Horizontal and vertical scale applied to quad positions.
    #[inline]
    pub fn scale_xy(&self) -> (f32, f32) {
        (self.0.x_axis.x, self.0.y_axis.y)
    }
}

impl Default for ProjectionMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Which camera dimension overflows the viewport and gets cropped.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CropAxis {
    /// Camera is relatively wider than the viewport; left/right are cropped.
    Horizontal,
    /// Camera is relatively taller (or equal); top/bottom are cropped.
    Vertical,
}

/// Center-crop parameters derived alongside the matrix.
///
/// `dx`/`dy` are the centering offsets in viewport pixels. They are reported
/// for diagnostics only: the matrix scales and never translates, so the crop
/// stays centered because the quad is symmetric around the origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CenterCrop {
    /// Camera size after orientation was applied.
    pub oriented_camera: FrameSize,
    pub overflow: CropAxis,
    pub scale: f32,
    pub dx: f32,
    pub dy: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AspectFit {
    pub matrix: ProjectionMatrix,
    pub crop: CenterCrop,
}

/// Derives the quad transform that center-crops a camera frame into a viewport.
pub struct AspectFitProjector;

impl AspectFitProjector {
    /// Computes the projection for `camera` shown in `viewport`.
    ///
    /// In portrait the camera size is transposed first. Fails instead of
    /// producing a non-finite scale when either size has a zero dimension.
    pub fn compute(
        camera: FrameSize,
        viewport: FrameSize,
        orientation: Orientation,
    ) -> Result<AspectFit, ConfigError> {
        if !viewport.is_valid() {
            return Err(ConfigError::ZeroViewport(viewport));
        }
        if !camera.is_valid() {
            return Err(ConfigError::ZeroCamera(camera));
        }

        let oriented = match orientation {
            Orientation::Landscape => camera,
            Orientation::Portrait => camera.transposed(),
        };

        let cw = oriented.width as f32;
        let ch = oriented.height as f32;
        let vw = viewport.width as f32;
        let vh = viewport.height as f32;

        // 1. texel density 1:1 with the viewport
        let normalize = Mat4::from_scale(Vec3::new(cw / vw, ch / vh, 0.0));

        // 2. center crop
        let (overflow, scale, dx, dy) = if cw * vh > vw * ch {
            let scale = vh / ch;
            (CropAxis::Horizontal, scale, (vw - cw * scale) * 0.5, 0.0)
        } else {
            let scale = vw / cw;
            (CropAxis::Vertical, scale, 0.0, (vh - ch * scale) * 0.5)
        };

        log::debug!(
            "aspect fit: viewport={viewport} camera={oriented} scale={scale} dx={} dy={}",
            dx / cw,
            dy / ch,
        );

        let matrix = normalize * Mat4::from_scale(Vec3::new(scale, scale, 0.0));

        Ok(AspectFit {
            matrix: ProjectionMatrix(matrix),
            crop: CenterCrop {
                oriented_camera: oriented,
                overflow,
                scale,
                dx,
                dy,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn fit(camera: (u32, u32), viewport: (u32, u32), orientation: Orientation) -> AspectFit {
        AspectFitProjector::compute(
            FrameSize::new(camera.0, camera.1),
            FrameSize::new(viewport.0, viewport.1),
            orientation,
        )
        .unwrap()
    }

    /// Aspect ratio of the quad as it lands on the viewport, in pixels.
    fn rendered_aspect(fit: &AspectFit, viewport: (u32, u32)) -> f32 {
        let (sx, sy) = fit.matrix.scale_xy();
        (sx * viewport.0 as f32) / (sy * viewport.1 as f32)
    }

    #[test]
    fn never_stretches() {
        let cameras = [(1280, 720), (1920, 1080), (640, 480), (3, 7), (4000, 3000)];
        let viewports = [(1080, 1080), (1920, 1080), (720, 1280), (1, 999), (801, 600)];
        for camera in cameras {
            for viewport in viewports {
                let f = fit(camera, viewport, Orientation::Landscape);
                let expected = camera.0 as f32 / camera.1 as f32;
                let got = rendered_aspect(&f, viewport);
                assert!(
                    (got - expected).abs() / expected < EPS,
                    "camera {camera:?} viewport {viewport:?}: {got} != {expected}"
                );
            }
        }
    }

    #[test]
    fn fills_viewport_on_both_axes() {
        let f = fit((1280, 720), (1080, 1080), Orientation::Landscape);
        let (sx, sy) = f.matrix.scale_xy();
        assert!(sx >= 1.0 - EPS && sy >= 1.0 - EPS);
        assert!((sy - 1.0).abs() < EPS, "cropped axis must fit exactly");
    }

    #[test]
    fn identical_inputs_give_bit_identical_matrices() {
        let a = fit((1920, 1080), (1000, 700), Orientation::Landscape);
        let b = fit((1920, 1080), (1000, 700), Orientation::Landscape);
        assert_eq!(
            a.matrix.as_mat4().to_cols_array().map(f32::to_bits),
            b.matrix.as_mat4().to_cols_array().map(f32::to_bits),
        );
    }

    #[test]
    fn portrait_transposes_camera_before_scaling() {
        let f = fit((1920, 1080), (1080, 1920), Orientation::Portrait);
        assert_eq!(f.crop.oriented_camera, FrameSize::new(1080, 1920));
        // Same aspect on both sides: no crop, identity scale.
        let (sx, sy) = f.matrix.scale_xy();
        assert!((sx - 1.0).abs() < EPS && (sy - 1.0).abs() < EPS);
        assert_eq!(f.crop.dx, 0.0);
        assert_eq!(f.crop.dy, 0.0);
    }

    #[test]
    fn wide_camera_in_square_viewport_crops_horizontally() {
        let f = fit((1280, 720), (1080, 1080), Orientation::Landscape);
        assert_eq!(f.crop.overflow, CropAxis::Horizontal);
        assert!((f.crop.scale - 1.5).abs() < EPS);
        // (1080 - 1280 * 1.5) * 0.5
        assert!((f.crop.dx - -420.0).abs() < EPS);
        assert_eq!(f.crop.dy, 0.0);
    }

    #[test]
    fn tall_camera_crops_vertically() {
        let f = fit((720, 1280), (1080, 1080), Orientation::Landscape);
        assert_eq!(f.crop.overflow, CropAxis::Vertical);
        assert!((f.crop.scale - 1.5).abs() < EPS);
        assert!((f.crop.dy - -420.0).abs() < EPS);
    }

    #[test]
    fn crop_offset_is_reported_but_not_applied() {
        let f = fit((1280, 720), (1080, 1080), Orientation::Landscape);
        assert!(f.crop.dx != 0.0);
        let m = f.matrix.as_mat4();
        assert_eq!(m.w_axis.x, 0.0);
        assert_eq!(m.w_axis.y, 0.0);
        assert_eq!(m.w_axis.w, 1.0);
    }

    #[test]
    fn zero_viewport_is_rejected() {
        let err = AspectFitProjector::compute(
            FrameSize::new(1280, 720),
            FrameSize::new(0, 1080),
            Orientation::Landscape,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroViewport(FrameSize::new(0, 1080)));
    }

    #[test]
    fn zero_camera_is_rejected() {
        let err = AspectFitProjector::compute(
            FrameSize::new(1280, 0),
            FrameSize::new(1080, 1080),
            Orientation::Portrait,
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroCamera(FrameSize::new(1280, 0)));
    }

    #[test]
    fn matrix_is_always_finite() {
        let f = fit((1, 100_000), (100_000, 1), Orientation::Landscape);
        assert!(f.matrix.as_mat4().is_finite());
    }
}
