//! SVG → polygon loader.
//!
//! Only solid fills are honoured. Gradients degrade to opaque white (logged
//! once per document) so icons still render as silhouettes; pattern fills and
//! stroke-only shapes are skipped.

use std::path::Path;

use anyhow::{Context, Result};
use resvg::usvg;
use usvg::tiny_skia_path::{self, PathSegment};

use crate::coords::Vec2;
use crate::paint::Color;

use super::bezier::{
    flatten_cubic_into, flatten_quadratic_into, CubicBezier, QuadraticBezier, DEFAULT_MAX_DEPTH,
};
use super::VectorPath;

/// Points closer than this (per axis) are the same vertex.
const CLOSE_EPSILON: f32 = 0.01;

/// One filled shape: every sub-path shares the fill colour.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorShape {
    pub paths: Vec<VectorPath>,
    pub fill: Color,
}

/// Parsed vector document in document units (usually pixels).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorImage {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<VectorShape>,
}

impl VectorImage {
    /// Total number of polygon paths across all shapes.
    pub fn path_count(&self) -> usize {
        self.shapes.iter().map(|s| s.paths.len()).sum()
    }
}

/// Reads and parses an SVG file, flattening curves to within `curve_tolerance`.
pub fn load_vector_image(path: &Path, curve_tolerance: f32) -> Result<VectorImage> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read vector image {}", path.display()))?;
    parse_vector_image(&data, curve_tolerance)
        .with_context(|| format!("failed to load vector image {}", path.display()))
}

/// Parses SVG bytes already in memory.
pub fn parse_vector_image(data: &[u8], curve_tolerance: f32) -> Result<VectorImage> {
    anyhow::ensure!(
        curve_tolerance > 0.0 && curve_tolerance.is_finite(),
        "curve tolerance must be positive and finite, got {curve_tolerance}"
    );

    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .context("unparsable SVG document")?;

    let mut loader = Loader {
        tolerance: curve_tolerance,
        shapes: Vec::new(),
        warned_gradient: false,
    };
    loader.visit_group(tree.root(), 1.0);

    let size = tree.size();
    log::debug!(
        "loaded vector image {}x{}: {} shapes",
        size.width(),
        size.height(),
        loader.shapes.len()
    );

    Ok(VectorImage { width: size.width(), height: size.height(), shapes: loader.shapes })
}

struct Loader {
    tolerance: f32,
    shapes: Vec<VectorShape>,
    warned_gradient: bool,
}

impl Loader {
    fn visit_group(&mut self, group: &usvg::Group, parent_opacity: f32) {
        let opacity = parent_opacity * group.opacity().get();
        for node in group.children() {
            match node {
                usvg::Node::Group(g) => self.visit_group(g, opacity),
                usvg::Node::Path(p) => self.visit_path(p, opacity),
                usvg::Node::Text(t) => self.visit_group(t.flattened(), opacity),
                usvg::Node::Image(_) => log::debug!("skipping embedded raster image"),
            }
        }
    }

    fn visit_path(&mut self, path: &usvg::Path, opacity: f32) {
        if !path.is_visible() {
            return;
        }
        let Some(fill) = path.fill() else {
            log::debug!("skipping stroke-only path {:?}", path.id());
            return;
        };
        let Some(color) = self.resolve_fill(fill, opacity) else { return };
        if color.is_transparent() {
            return;
        }

        let paths = self.flatten(path.data(), path.abs_transform());
        if paths.is_empty() {
            return;
        }
        self.shapes.push(VectorShape { paths, fill: color });
    }

    fn resolve_fill(&mut self, fill: &usvg::Fill, opacity: f32) -> Option<Color> {
        match fill.paint() {
            usvg::Paint::Color(c) => Some(Color::from_straight(
                c.red as f32 / 255.0,
                c.green as f32 / 255.0,
                c.blue as f32 / 255.0,
                fill.opacity().get() * opacity,
            )),
            usvg::Paint::LinearGradient(_) | usvg::Paint::RadialGradient(_) => {
                if !self.warned_gradient {
                    log::info!("gradient fills are not supported; rendering them as opaque white");
                    self.warned_gradient = true;
                }
                Some(Color::WHITE)
            }
            usvg::Paint::Pattern(_) => {
                log::warn!("skipping shape with unsupported pattern fill");
                None
            }
        }
    }

    /// Splits path data into sub-paths, flattening each curve segment in place.
    fn flatten(&self, data: &tiny_skia_path::Path, ts: usvg::Transform) -> Vec<VectorPath> {
        let map = |p: tiny_skia_path::Point| {
            Vec2::new(ts.sx * p.x + ts.kx * p.y + ts.tx, ts.ky * p.x + ts.sy * p.y + ts.ty)
        };

        let mut out = Vec::new();
        let mut current: Vec<Vec2> = Vec::new();
        let mut pen = Vec2::zero();

        for segment in data.segments() {
            match segment {
                PathSegment::MoveTo(p) => {
                    finish_subpath(&mut out, &mut current, false);
                    pen = map(p);
                    current.push(pen);
                }
                PathSegment::LineTo(p) => {
                    pen = map(p);
                    current.push(pen);
                }
                PathSegment::QuadTo(p1, p) => {
                    let curve = QuadraticBezier::new(pen, map(p1), map(p));
                    flatten_quadratic_into(&curve, self.tolerance, DEFAULT_MAX_DEPTH, &mut current);
                    pen = curve.p2;
                }
                PathSegment::CubicTo(p1, p2, p) => {
                    let curve = CubicBezier::new(pen, map(p1), map(p2), map(p));
                    flatten_cubic_into(&curve, self.tolerance, DEFAULT_MAX_DEPTH, &mut current);
                    pen = curve.p3;
                }
                PathSegment::Close => {
                    if let Some(&start) = current.first() {
                        pen = start;
                    }
                    finish_subpath(&mut out, &mut current, true);
                }
            }
        }
        finish_subpath(&mut out, &mut current, false);
        out
    }
}

/// Moves `current` into `out` as a finished sub-path.
///
/// Consecutive near-duplicate vertices collapse into one, closed sub-paths
/// lose a trailing vertex that duplicates the first one, and anything left
/// with fewer than 3 vertices is dropped.
fn finish_subpath(out: &mut Vec<VectorPath>, current: &mut Vec<Vec2>, closed: bool) {
    if current.is_empty() {
        return;
    }
    let mut points = std::mem::take(current);
    points.dedup_by(|next, prev| near(*next, *prev));
    if closed && points.len() >= 2 && near(points[0], points[points.len() - 1]) {
        points.pop();
    }
    if points.len() < 3 {
        log::debug!("discarding sub-path with {} vertices", points.len());
        return;
    }
    out.push(VectorPath::new(points, closed));
}

#[inline]
fn near(a: Vec2, b: Vec2) -> bool {
    (a.x - b.x).abs() < CLOSE_EPSILON && (a.y - b.y).abs() < CLOSE_EPSILON
}
