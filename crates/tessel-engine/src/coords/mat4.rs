use core::ops::Mul;

use super::Vec2;

/// Column-major 4×4 matrix.
///
/// Only the 2D affine part is used on the CPU (`transform_point`); the full
/// matrix is uploaded as-is for projections. Layout matches WGSL `mat4x4<f32>`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    #[inline]
    pub const fn from_cols(cols: [[f32; 4]; 4]) -> Self {
        Self { cols }
    }

    pub const fn translation(x: f32, y: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[3][0] = x;
        m.cols[3][1] = y;
        m
    }

    pub const fn scale(sx: f32, sy: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.cols[0][0] = sx;
        m.cols[1][1] = sy;
        m
    }

    /// Rotation about +Z by `radians` (clockwise on screen, since +Y points down).
    pub fn rotation_z(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let mut m = Self::IDENTITY;
        m.cols[0][0] = c;
        m.cols[0][1] = s;
        m.cols[1][0] = -s;
        m.cols[1][1] = c;
        m
    }

    /// Orthographic projection with a 0..1 depth range.
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32) -> Self {
        let rml = right - left;
        let tmb = top - bottom;
        let mut m = Self::IDENTITY;
        m.cols[0][0] = 2.0 / rml;
        m.cols[1][1] = 2.0 / tmb;
        m.cols[3][0] = -(right + left) / rml;
        m.cols[3][1] = -(top + bottom) / tmb;
        m
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Applies the 2D affine part of the matrix to a point (z = 0, w = 1).
    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        let c = &self.cols;
        Vec2::new(
            c[0][0] * p.x + c[1][0] * p.y + c[3][0],
            c[0][1] * p.x + c[1][1] * p.y + c[3][1],
        )
    }

    #[inline]
    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.cols
    }
}

impl Mul for Mat4 {
    type Output = Mat4;

    fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f32; 4]; 4];
        for (c, col) in out.iter_mut().enumerate() {
            for (r, v) in col.iter_mut().enumerate() {
                *v = (0..4).map(|k| self.cols[k][r] * rhs.cols[c][k]).sum();
            }
        }
        Mat4 { cols: out }
    }
}
