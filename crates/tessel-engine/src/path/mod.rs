//! Vector artwork: curve flattening, SVG loading, triangulation, caching.
//!
//! Flow: [`svg::load_vector_image`] → [`VectorPath`] per sub-path →
//! [`tessellate::tessellate`] → [`TessellatedMesh`] → batch or instanced registry.
//! [`ArtworkCache`] memoizes the whole chain per `(path, tolerance)`.

pub mod bezier;
mod cache;
pub mod svg;
pub mod tessellate;

pub use cache::{Artwork, ArtworkCache};
pub use svg::{load_vector_image, parse_vector_image, VectorImage, VectorShape};
pub use tessellate::{tessellate, TessellateError, TessellateOptions};

use crate::coords::Vec2;
use crate::paint::Color;

/// Ordered polygon outline produced by the loader and consumed by the tessellator.
///
/// Closed paths never repeat their first point at the end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorPath {
    pub points: Vec<Vec2>,
    pub closed: bool,
}

impl VectorPath {
    #[inline]
    pub fn new(points: Vec<Vec2>, closed: bool) -> Self {
        Self { points, closed }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Triangle mesh built from one polygon.
///
/// Deterministic for a given path and tolerance, so it may be cached across frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TessellatedMesh {
    pub positions: Vec<Vec2>,
    pub indices: Vec<u16>,
    /// Optional per-vertex colours; same length as `positions` when present.
    pub colors: Option<Vec<Color>>,
}

impl TessellatedMesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Colour of vertex `i`, falling back to `default` when the mesh is uncoloured.
    #[inline]
    pub fn color_at(&self, i: usize, default: Color) -> Color {
        self.colors
            .as_ref()
            .and_then(|c| c.get(i).copied())
            .unwrap_or(default)
    }
}
