//! Ear-clipping triangulation of simple polygons.
//!
//! Winding is normalized to counter-clockwise (positive shoelace area) before
//! clipping, so the convexity test is a single sign check. Remaining vertices
//! live in a flat index vector; the point-in-triangle scan needs random access.
//!
//! Geometry predicates run in `f64`: icon-scale polygons (radius 2–3 px with
//! hundreds of vertices) produce cross products near `1e-5`, which leaves too
//! little headroom in `f32` against the `1e-6` epsilon.

use std::fmt;

use crate::coords::Vec2;
use crate::paint::Color;

use super::{TessellatedMesh, VectorPath};

/// Guards near-collinear and near-zero-area comparisons.
const EPSILON: f64 = 1e-6;

/// Per-call tessellation options.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TessellateOptions {
    /// When set, every output vertex carries this colour.
    pub color: Option<Color>,
}

impl TessellateOptions {
    #[inline]
    pub fn with_color(color: Color) -> Self {
        Self { color: Some(color) }
    }
}

/// Error returned by [`tessellate`]. The caller is expected to skip the shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TessellateError {
    /// Fewer than three vertices.
    TooFewVertices(usize),
    /// More vertices than a `u16` index can address.
    TooManyVertices(usize),
    /// A full scan found no ear; the polygon is self-intersecting or degenerate.
    NoEarFound { remaining: usize },
}

impl fmt::Display for TessellateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TessellateError::TooFewVertices(n) => {
                write!(f, "polygon has {n} vertices; at least 3 are required")
            }
            TessellateError::TooManyVertices(n) => {
                write!(f, "polygon has {n} vertices; at most {} fit u16 indices", u16::MAX as usize + 1)
            }
            TessellateError::NoEarFound { remaining } => {
                write!(f, "no ear found with {remaining} vertices left (self-intersecting or degenerate polygon)")
            }
        }
    }
}

impl std::error::Error for TessellateError {}

/// Triangulates one simple polygon.
///
/// On success the mesh holds the (possibly reversed) input points and exactly
/// `3 * (n - 2)` indices.
pub fn tessellate(path: &VectorPath, options: &TessellateOptions) -> Result<TessellatedMesh, TessellateError> {
    let n = path.points.len();
    if n < 3 {
        return Err(TessellateError::TooFewVertices(n));
    }
    if n > u16::MAX as usize + 1 {
        return Err(TessellateError::TooManyVertices(n));
    }

    let mut positions = path.points.clone();
    if signed_area(&positions) < 0.0 {
        positions.reverse();
    }

    let pts: Vec<(f64, f64)> = positions.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let mut remaining: Vec<u16> = (0..n).map(|i| i as u16).collect();
    let mut indices: Vec<u16> = Vec::with_capacity(3 * (n - 2));

    while remaining.len() > 3 {
        let Some(ear) = find_ear(&pts, &remaining) else {
            return Err(TessellateError::NoEarFound { remaining: remaining.len() });
        };
        let m = remaining.len();
        let prev = remaining[(ear + m - 1) % m];
        let next = remaining[(ear + 1) % m];
        indices.extend_from_slice(&[prev, remaining[ear], next]);
        remaining.remove(ear);
    }
    indices.extend_from_slice(&remaining);

    let colors = options.color.map(|c| vec![c; positions.len()]);
    Ok(TessellatedMesh { positions, indices, colors })
}

/// Shoelace signed area. Positive for counter-clockwise in a +Y-up frame.
pub fn signed_area(points: &[Vec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
    }
    twice * 0.5
}

/// Position in `remaining` of the first ear, scanning from the start.
fn find_ear(pts: &[(f64, f64)], remaining: &[u16]) -> Option<usize> {
    let m = remaining.len();
    (0..m).find(|&i| {
        let ia = remaining[(i + m - 1) % m] as usize;
        let ib = remaining[i] as usize;
        let ic = remaining[(i + 1) % m] as usize;
        let (a, b, c) = (pts[ia], pts[ib], pts[ic]);

        if cross(a, b, c) <= EPSILON {
            return false;
        }
        !remaining.iter().any(|&j| {
            let j = j as usize;
            j != ia && j != ib && j != ic && point_in_triangle(pts[j], a, b, c)
        })
    })
}

/// `(b - a) × (c - b)`; positive when `a → b → c` turns counter-clockwise.
#[inline]
fn cross(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - b.1) - (b.1 - a.1) * (c.0 - b.0)
}

/// Barycentric containment, boundary inclusive. Degenerate triangles contain nothing.
fn point_in_triangle(p: (f64, f64), a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let v0 = (c.0 - a.0, c.1 - a.1);
    let v1 = (b.0 - a.0, b.1 - a.1);
    let v2 = (p.0 - a.0, p.1 - a.1);

    let dot00 = v0.0 * v0.0 + v0.1 * v0.1;
    let dot01 = v0.0 * v1.0 + v0.1 * v1.1;
    let dot02 = v0.0 * v2.0 + v0.1 * v2.1;
    let dot11 = v1.0 * v1.0 + v1.1 * v1.1;
    let dot12 = v1.0 * v2.0 + v1.1 * v2.1;

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() < EPSILON * EPSILON {
        return false;
    }
    let inv = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv;
    let v = (dot00 * dot12 - dot01 * dot02) * inv;
    u >= 0.0 && v >= 0.0 && u + v <= 1.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn v(x: f32, y: f32) -> Vec2 { Vec2::new(x, y) }

    fn closed(points: Vec<Vec2>) -> VectorPath {
        VectorPath::new(points, true)
    }

    fn ellipse(n: usize, rx: f32, ry: f32) -> VectorPath {
        let pts = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32 * std::f32::consts::TAU;
                v(rx * t.cos(), ry * t.sin())
            })
            .collect();
        closed(pts)
    }

    /// Triangles as sorted position triples, independent of vertex labelling.
    fn triangle_set(mesh: &TessellatedMesh) -> BTreeSet<[(u32, u32); 3]> {
        mesh.indices
            .chunks(3)
            .map(|t| {
                let mut tri = [0usize, 1, 2].map(|k| {
                    let p = mesh.positions[t[k] as usize];
                    (p.x.to_bits(), p.y.to_bits())
                });
                tri.sort();
                tri
            })
            .collect()
    }

    fn assert_valid(mesh: &TessellatedMesh, n: usize) {
        assert_eq!(mesh.triangle_count(), n - 2);
        assert_eq!(mesh.indices.len(), 3 * (n - 2));
        assert!(mesh.indices.iter().all(|&i| (i as usize) < n));
    }

    // ── basic shapes ──────────────────────────────────────────────────────

    #[test]
    fn unit_square_two_triangles() {
        let sq = closed(vec![v(0.0, 0.0), v(100.0, 0.0), v(100.0, 100.0), v(0.0, 100.0)]);
        let mesh = tessellate(&sq, &TessellateOptions::default()).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.colors.is_none());
    }

    #[test]
    fn triangle_passes_through() {
        let tri = closed(vec![v(0.0, 0.0), v(10.0, 0.0), v(0.0, 10.0)]);
        let mesh = tessellate(&tri, &TessellateOptions::default()).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn concave_polygon() {
        // Arrow / chevron shape with one reflex vertex.
        let pts = vec![
            v(0.0, 0.0), v(10.0, 5.0), v(0.0, 10.0), v(4.0, 5.0),
        ];
        let mesh = tessellate(&closed(pts), &TessellateOptions::default()).unwrap();
        assert_valid(&mesh, 4);
    }

    #[test]
    fn l_shape() {
        let pts = vec![
            v(0.0, 0.0), v(20.0, 0.0), v(20.0, 10.0),
            v(10.0, 10.0), v(10.0, 20.0), v(0.0, 20.0),
        ];
        let mesh = tessellate(&closed(pts), &TessellateOptions::default()).unwrap();
        assert_valid(&mesh, 6);
        // Total triangle area equals polygon area (no overlap, no gaps).
        let area: f64 = mesh
            .indices
            .chunks(3)
            .map(|t| signed_area(&[mesh.positions[t[0] as usize], mesh.positions[t[1] as usize], mesh.positions[t[2] as usize]]).abs())
            .sum();
        assert!((area - 300.0).abs() < 1e-3);
    }

    #[test]
    fn colour_option_fills_per_vertex_colours() {
        let red = Color::from_straight(1.0, 0.0, 0.0, 1.0);
        let sq = closed(vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)]);
        let mesh = tessellate(&sq, &TessellateOptions::with_color(red)).unwrap();
        assert_eq!(mesh.colors.as_deref(), Some(&[red; 4][..]));
    }

    // ── winding ───────────────────────────────────────────────────────────

    #[test]
    fn clockwise_and_counter_clockwise_agree() {
        let ccw = vec![
            v(0.0, 0.0), v(20.0, 0.0), v(20.0, 10.0),
            v(10.0, 10.0), v(10.0, 20.0), v(0.0, 20.0),
        ];
        let mut cw = ccw.clone();
        cw.reverse();
        assert!(signed_area(&cw) < 0.0);

        let a = tessellate(&closed(ccw), &TessellateOptions::default()).unwrap();
        let b = tessellate(&closed(cw), &TessellateOptions::default()).unwrap();
        assert_eq!(triangle_set(&a), triangle_set(&b));
    }

    // ── circles and ellipses ──────────────────────────────────────────────

    #[test]
    fn regular_polygons_always_succeed() {
        for n in [3usize, 8, 32, 64, 100, 128, 255, 256] {
            for (rx, ry) in [(100.0, 100.0), (2.0, 2.0), (3.0, 0.5), (2.5, 10.0)] {
                let mesh = tessellate(&ellipse(n, rx, ry), &TessellateOptions::default())
                    .unwrap_or_else(|e| panic!("n={n} rx={rx} ry={ry}: {e}"));
                assert_valid(&mesh, n);
            }
        }
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn too_few_vertices() {
        let err = tessellate(&closed(vec![v(0.0, 0.0), v(1.0, 1.0)]), &TessellateOptions::default());
        assert_eq!(err, Err(TessellateError::TooFewVertices(2)));
    }

    #[test]
    fn self_intersecting_fails_without_looping() {
        // Bow-tie: edges cross at (5, 5).
        let pts = vec![v(0.0, 0.0), v(10.0, 10.0), v(10.0, 0.0), v(0.0, 10.0), v(5.0, -5.0)];
        let res = tessellate(&closed(pts), &TessellateOptions::default());
        // Either a clean failure or a valid-length result; never a hang.
        if let Ok(mesh) = res {
            assert_valid(&mesh, 5);
        }
    }

    #[test]
    fn collinear_points_report_no_ear() {
        let pts = vec![v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0), v(3.0, 0.0)];
        let res = tessellate(&closed(pts), &TessellateOptions::default());
        assert_eq!(res, Err(TessellateError::NoEarFound { remaining: 4 }));
    }
}
