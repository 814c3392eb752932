//! Primitive descriptions accepted by [`Batch`](super::Batch).

use crate::coords::{Rect, Vec2};
use crate::paint::Color;

/// Where a border sits relative to the nominal shape edge.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum BorderPosition {
    /// Entirely inside the bounds; the quad is not expanded.
    #[default]
    Inside,
    /// Straddles the edge; the quad grows by half the width.
    Center,
    /// Entirely outside the bounds; the quad grows by the full width.
    Outside,
}

impl BorderPosition {
    /// Distance the border extends past the nominal edge.
    #[inline]
    pub fn extent(self, width: f32) -> f32 {
        match self {
            BorderPosition::Inside => 0.0,
            BorderPosition::Center => width * 0.5,
            BorderPosition::Outside => width,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Border {
    pub color: Color,
    pub width: f32,
    pub position: BorderPosition,
}

impl Border {
    #[inline]
    pub fn new(color: Color, width: f32, position: BorderPosition) -> Self {
        Self { color, width, position }
    }

    #[inline]
    pub fn inside(color: Color, width: f32) -> Self {
        Self::new(color, width, BorderPosition::Inside)
    }

    /// Borders that would draw nothing.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && !self.color.is_transparent()
    }
}

/// Filled, optionally bordered and rounded rectangle, shaded by a per-pixel SDF.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapeQuad {
    pub rect: Rect,
    pub fill: Color,
    pub border: Option<Border>,
    pub corner_radius: f32,
}

impl ShapeQuad {
    #[inline]
    pub fn filled(rect: Rect, fill: Color) -> Self {
        Self { rect, fill, border: None, corner_radius: 0.0 }
    }

    #[inline]
    pub fn with_border(mut self, border: Border) -> Self {
        self.border = Some(border);
        self
    }

    #[inline]
    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = radius;
        self
    }
}

/// One laid-out glyph against an MSDF atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlyphQuad {
    /// Top-left corner in logical pixels.
    pub position: Vec2,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub color: Color,
}

/// Surface IDs of the eight neighbouring tiles. `0` means "no neighbour".
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TileNeighbors {
    /// North, east, south, west.
    pub cardinal: [u8; 4],
    /// North-east, south-east, south-west, north-west.
    pub diagonal: [u8; 4],
}

/// Ground tile blended toward neighbouring materials at its seams.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TileQuad {
    pub rect: Rect,
    /// Integer tile coordinate in the world grid; clamped to ±32767 per axis when packed.
    pub world: (i32, i32),
    /// Palette index of this tile's material.
    pub surface: u8,
    pub neighbors: TileNeighbors,
    pub tint: Color,
}
