use super::Mat4;

/// Viewport size in logical pixels plus the physical-to-logical scale factor.
///
/// All CPU geometry lives in logical pixels. Physical dimensions are only
/// needed when sizing render targets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 0.0, height: 0.0, scale_factor: 1.0 }
    }
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height, scale_factor: 1.0 }
    }

    #[inline]
    pub const fn with_scale_factor(width: f32, height: f32, scale_factor: f32) -> Self {
        Self { width, height, scale_factor }
    }

    /// Builds a viewport from physical pixel dimensions.
    pub fn from_physical(width: u32, height: u32, scale_factor: f32) -> Self {
        let scale = if scale_factor > 0.0 && scale_factor.is_finite() { scale_factor } else { 1.0 };
        Self { width: width as f32 / scale, height: height as f32 / scale, scale_factor: scale }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// Physical pixel dimensions (rounded, at least 1×1).
    pub fn physical_size(self) -> (u32, u32) {
        let w = (self.width * self.scale_factor).round().max(1.0) as u32;
        let h = (self.height * self.scale_factor).round().max(1.0) as u32;
        (w, h)
    }

    /// Orthographic projection mapping logical pixels (top-left origin, +Y down) to NDC.
    pub fn orthographic(self) -> Mat4 {
        Mat4::orthographic(0.0, self.width.max(1.0), self.height.max(1.0), 0.0)
    }
}
