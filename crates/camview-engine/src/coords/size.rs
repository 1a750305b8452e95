use std::fmt;

use winit::dpi::PhysicalSize;

/// Integer size in physical pixels.
///
/// Used both for camera capture resolutions and for viewport sizes. A size is
/// only usable for projection when both dimensions are non-zero; see
/// [`FrameSize::is_valid`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Width and height swapped.
    #[inline]
    pub const fn transposed(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<PhysicalSize<u32>> for FrameSize {
    fn from(size: PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Display orientation used to interpret the camera sensor size.
///
/// Camera sensors are landscape-native: in portrait the reported preview size
/// has to be transposed before it is compared against the viewport.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Orientation of a viewport. Square viewports count as landscape.
    pub fn of(viewport: FrameSize) -> Self {
        if viewport.width >= viewport.height {
            Self::Landscape
        } else {
            Self::Portrait
        }
    }
}

/// How the pipeline picks the [`Orientation`] passed to the projector.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum OrientationPolicy {
    /// Derive it from the current viewport on every recomputation.
    #[default]
    FollowViewport,
    /// Always use the given orientation (e.g. a device locked to portrait).
    Fixed(Orientation),
}

impl OrientationPolicy {
    pub fn resolve(self, viewport: FrameSize) -> Orientation {
        match self {
            Self::FollowViewport => Orientation::of(viewport),
            Self::Fixed(o) => o,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_dimension_is_invalid() {
        assert!(!FrameSize::new(0, 720).is_valid());
        assert!(!FrameSize::new(1280, 0).is_valid());
        assert!(FrameSize::new(1, 1).is_valid());
    }

    #[test]
    fn transposed_swaps_dimensions() {
        assert_eq!(FrameSize::new(1920, 1080).transposed(), FrameSize::new(1080, 1920));
    }

    #[test]
    fn square_viewport_is_landscape() {
        assert_eq!(Orientation::of(FrameSize::new(1080, 1080)), Orientation::Landscape);
        assert_eq!(Orientation::of(FrameSize::new(1080, 1920)), Orientation::Portrait);
    }

    #[test]
    fn fixed_policy_ignores_viewport() {
        let policy = OrientationPolicy::Fixed(Orientation::Portrait);
        assert_eq!(policy.resolve(FrameSize::new(1920, 1080)), Orientation::Portrait);
    }

    #[test]
    fn displays_as_width_by_height() {
        assert_eq!(FrameSize::new(1280, 720).to_string(), "1280x720");
    }
}
