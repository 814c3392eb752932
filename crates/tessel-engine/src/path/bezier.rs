//! Adaptive Bezier flattening.
//!
//! Curves are split at `t = 0.5` (De Casteljau) until every interior control
//! point lies within `tolerance` of the chord, or `max_depth` is reached.
//! Output excludes the curve's start point and includes every segment end,
//! so consecutive curves can be appended to one polyline without duplicates.

use crate::coords::Vec2;

/// Recursion cap for [`flatten_cubic`] / [`flatten_quadratic`].
///
/// Bounds the output at `2^16` points per curve and keeps recursion shallow.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

/// Below this chord length the chord is treated as a point.
const DEGENERATE_CHORD: f32 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CubicBezier {
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
}

impl CubicBezier {
    #[inline]
    pub const fn new(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// De Casteljau split at `t = 0.5`.
    pub fn split(&self) -> (CubicBezier, CubicBezier) {
        let p01 = self.p0.midpoint(self.p1);
        let p12 = self.p1.midpoint(self.p2);
        let p23 = self.p2.midpoint(self.p3);
        let p012 = p01.midpoint(p12);
        let p123 = p12.midpoint(p23);
        let mid = p012.midpoint(p123);
        (
            CubicBezier::new(self.p0, p01, p012, mid),
            CubicBezier::new(mid, p123, p23, self.p3),
        )
    }

    fn is_flat(&self, tolerance: f32) -> bool {
        distance_to_chord(self.p1, self.p0, self.p3) <= tolerance
            && distance_to_chord(self.p2, self.p0, self.p3) <= tolerance
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadraticBezier {
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
}

impl QuadraticBezier {
    #[inline]
    pub const fn new(p0: Vec2, p1: Vec2, p2: Vec2) -> Self {
        Self { p0, p1, p2 }
    }

    /// De Casteljau split at `t = 0.5`.
    pub fn split(&self) -> (QuadraticBezier, QuadraticBezier) {
        let p01 = self.p0.midpoint(self.p1);
        let p12 = self.p1.midpoint(self.p2);
        let mid = p01.midpoint(p12);
        (QuadraticBezier::new(self.p0, p01, mid), QuadraticBezier::new(mid, p12, self.p2))
    }

    fn is_flat(&self, tolerance: f32) -> bool {
        distance_to_chord(self.p1, self.p0, self.p2) <= tolerance
    }
}

/// Flattens a cubic curve into a polyline (start point excluded).
pub fn flatten_cubic(curve: &CubicBezier, tolerance: f32, max_depth: u32) -> Vec<Vec2> {
    let mut out = Vec::new();
    flatten_cubic_into(curve, tolerance, max_depth, &mut out);
    out
}

/// Like [`flatten_cubic`] but appends to `out`.
pub fn flatten_cubic_into(curve: &CubicBezier, tolerance: f32, max_depth: u32, out: &mut Vec<Vec2>) {
    cubic_recursive(curve, tolerance, max_depth, 0, out);
}

/// Flattens a quadratic curve into a polyline (start point excluded).
pub fn flatten_quadratic(curve: &QuadraticBezier, tolerance: f32, max_depth: u32) -> Vec<Vec2> {
    let mut out = Vec::new();
    flatten_quadratic_into(curve, tolerance, max_depth, &mut out);
    out
}

/// Like [`flatten_quadratic`] but appends to `out`.
pub fn flatten_quadratic_into(
    curve: &QuadraticBezier,
    tolerance: f32,
    max_depth: u32,
    out: &mut Vec<Vec2>,
) {
    quadratic_recursive(curve, tolerance, max_depth, 0, out);
}

fn cubic_recursive(curve: &CubicBezier, tolerance: f32, max_depth: u32, depth: u32, out: &mut Vec<Vec2>) {
    if depth >= max_depth || curve.is_flat(tolerance) {
        out.push(curve.p3);
        return;
    }
    let (left, right) = curve.split();
    cubic_recursive(&left, tolerance, max_depth, depth + 1, out);
    cubic_recursive(&right, tolerance, max_depth, depth + 1, out);
}

fn quadratic_recursive(
    curve: &QuadraticBezier,
    tolerance: f32,
    max_depth: u32,
    depth: u32,
    out: &mut Vec<Vec2>,
) {
    if depth >= max_depth || curve.is_flat(tolerance) {
        out.push(curve.p2);
        return;
    }
    let (left, right) = curve.split();
    quadratic_recursive(&left, tolerance, max_depth, depth + 1, out);
    quadratic_recursive(&right, tolerance, max_depth, depth + 1, out);
}

/// Perpendicular distance from `p` to the infinite line through `a`→`b`.
///
/// Falls back to the Euclidean distance to `a` when the chord has no length.
#[inline]
fn distance_to_chord(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let chord = b - a;
    let len = chord.length();
    if len < DEGENERATE_CHORD {
        return p.distance(a);
    }
    chord.cross(p - a).abs() / len
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 { Vec2::new(x, y) }

    // ── degenerate input ──────────────────────────────────────────────────

    #[test]
    fn collinear_cubic_yields_single_point() {
        let c = CubicBezier::new(v(0.0, 0.0), v(10.0, 10.0), v(20.0, 20.0), v(30.0, 30.0));
        for tol in [1e-4, 0.01, 0.25, 5.0] {
            assert_eq!(flatten_cubic(&c, tol, DEFAULT_MAX_DEPTH), vec![v(30.0, 30.0)]);
        }
    }

    #[test]
    fn collinear_controls_outside_chord_still_flat() {
        let c = CubicBezier::new(v(0.0, 0.0), v(-5.0, 0.0), v(15.0, 0.0), v(10.0, 0.0));
        assert_eq!(flatten_cubic(&c, 0.1, DEFAULT_MAX_DEPTH).len(), 1);
    }

    #[test]
    fn collinear_quadratic_yields_single_point() {
        let q = QuadraticBezier::new(v(0.0, 0.0), v(5.0, 0.0), v(10.0, 0.0));
        assert_eq!(flatten_quadratic(&q, 0.01, DEFAULT_MAX_DEPTH), vec![v(10.0, 0.0)]);
    }

    #[test]
    fn zero_length_chord_uses_point_distance() {
        // Closed loop: start == end, controls far away → must subdivide.
        let c = CubicBezier::new(v(0.0, 0.0), v(10.0, 10.0), v(-10.0, 10.0), v(0.0, 0.0));
        let pts = flatten_cubic(&c, 0.1, DEFAULT_MAX_DEPTH);
        assert!(pts.len() > 4);
        assert_eq!(*pts.last().unwrap(), v(0.0, 0.0));
    }

    // ── subdivision ───────────────────────────────────────────────────────

    #[test]
    fn output_excludes_start_and_ends_at_endpoint() {
        let c = CubicBezier::new(v(0.0, 0.0), v(0.0, 50.0), v(100.0, 50.0), v(100.0, 0.0));
        let pts = flatten_cubic(&c, 0.25, DEFAULT_MAX_DEPTH);
        assert_ne!(pts[0], v(0.0, 0.0));
        assert_eq!(*pts.last().unwrap(), v(100.0, 0.0));
    }

    #[test]
    fn tighter_tolerance_produces_more_points() {
        let c = CubicBezier::new(v(0.0, 0.0), v(0.0, 50.0), v(100.0, 50.0), v(100.0, 0.0));
        let coarse = flatten_cubic(&c, 2.0, DEFAULT_MAX_DEPTH).len();
        let fine = flatten_cubic(&c, 0.01, DEFAULT_MAX_DEPTH).len();
        assert!(fine > coarse);
    }

    #[test]
    fn max_depth_bounds_output() {
        let c = CubicBezier::new(v(0.0, 0.0), v(0.0, 500.0), v(500.0, 500.0), v(500.0, 0.0));
        assert_eq!(flatten_cubic(&c, 0.0, 3).len(), 8);
        assert_eq!(flatten_cubic(&c, 0.0, 0).len(), 1);
    }

    #[test]
    fn into_variant_appends() {
        let q = QuadraticBezier::new(v(0.0, 0.0), v(50.0, 100.0), v(100.0, 0.0));
        let mut out = vec![v(-1.0, -1.0)];
        flatten_quadratic_into(&q, 0.5, DEFAULT_MAX_DEPTH, &mut out);
        assert_eq!(out[0], v(-1.0, -1.0));
        assert_eq!(*out.last().unwrap(), v(100.0, 0.0));
    }
}
