use crate::coords::{Mat4, Rect, Vec2};
use crate::paint::Color;
use crate::path::TessellatedMesh;

use super::backend::{BatchSubmission, DrawSegment, RenderBackend, TextureId};
use super::primitives::{GlyphQuad, ShapeQuad, TileQuad};
use super::stats::FrameStats;
use super::vertex::{
    pack_surface_ids, pack_world_coord, Vertex, KIND_FLAT, KIND_TEXT, KIND_TILE, NOTHING_VISIBLE,
    UNCLIPPED,
};

/// Index pattern of every quad: (0,1,2),(0,2,3) over TL, TR, BR, BL.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Initial buffer sizes. Buffers grow on demand and keep their capacity across frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub initial_vertex_capacity: usize,
    pub initial_index_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            initial_vertex_capacity: 4096,
            initial_index_capacity: 6144,
        }
    }
}

/// CPU-side accumulator for one frame's geometry.
///
/// Every primitive kind appends to the same vertex/index buffers using the
/// uber [`Vertex`]. The current transform is baked into positions and the
/// current clip bounds are stamped onto each vertex as it is added, so state
/// changes never force a flush. Only a text atlas change splits the batch
/// into another draw segment.
pub struct Batch {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,

    segments: Vec<DrawSegment>,
    segment_start: u32,
    segment_texture: Option<TextureId>,

    transform: Mat4,
    transform_is_identity: bool,
    clip: [f32; 4],
    projection: Mat4,

    stats: FrameStats,
    last_stats: FrameStats,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl Batch {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            vertices: Vec::with_capacity(config.initial_vertex_capacity),
            indices: Vec::with_capacity(config.initial_index_capacity),
            segments: Vec::new(),
            segment_start: 0,
            segment_texture: None,
            transform: Mat4::IDENTITY,
            transform_is_identity: true,
            clip: UNCLIPPED,
            projection: Mat4::IDENTITY,
            stats: FrameStats::default(),
            last_stats: FrameStats::default(),
        }
    }

    // ── frame lifecycle ────────────────────────────────────────────────────

    /// Starts a frame: discards unflushed geometry and resets state and counters.
    pub fn begin_frame(&mut self) {
        if !self.indices.is_empty() {
            log::debug!(
                "discarding {} unflushed vertices from the previous frame",
                self.vertices.len()
            );
        }
        self.clear_geometry();
        self.set_transform(Mat4::IDENTITY);
        self.clip = UNCLIPPED;
        self.stats.reset();
    }

    /// Flushes remaining geometry and returns this frame's counters.
    pub fn end_frame<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> FrameStats {
        self.flush(backend);
        self.last_stats = self.stats;
        self.last_stats
    }

    /// Counters of the last completed frame.
    #[inline]
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Counters accumulated so far in the current frame.
    #[inline]
    pub fn frame_stats(&self) -> FrameStats {
        self.stats
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut FrameStats {
        &mut self.stats
    }

    /// Submits everything accumulated so far, one draw call per segment.
    pub fn flush<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        if self.indices.is_empty() {
            self.clear_geometry();
            return;
        }
        self.close_segment();

        backend.draw_batch(&BatchSubmission {
            vertices: &self.vertices,
            indices: &self.indices,
            segments: &self.segments,
            projection: self.projection,
        });
        self.stats
            .record_batch(self.segments.len(), self.vertices.len(), self.indices.len());

        self.clear_geometry();
    }

    // ── state ──────────────────────────────────────────────────────────────

    /// Transform baked into positions of everything added from now on.
    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
        self.transform_is_identity = transform.is_identity();
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Clip rectangle stamped onto everything added from now on.
    ///
    /// `None` disables clipping; an empty rectangle hides everything.
    pub fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = match clip {
            None => UNCLIPPED,
            Some(r) if r.is_empty() => NOTHING_VISIBLE,
            Some(r) => r.to_bounds(),
        };
    }

    #[inline]
    pub fn clip_bounds(&self) -> [f32; 4] {
        self.clip
    }

    /// Projection used by subsequent flushes.
    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = projection;
    }

    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Vertices waiting for the next flush.
    #[inline]
    pub fn pending_vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn pending_indices(&self) -> &[u32] {
        &self.indices
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    // ── primitives ─────────────────────────────────────────────────────────

    /// Appends an SDF-shaded rectangle with optional rounded corners and border.
    ///
    /// The quad grows to cover the border's extent past the nominal bounds;
    /// `shape` then describes the outer edge and the border band lies `width`
    /// inside it.
    pub fn add_quad(&mut self, quad: &ShapeQuad) {
        let rect = quad.rect.normalized();
        if rect.is_empty() || !rect.is_finite() {
            return;
        }

        let (border_color, border_width, extent) = match quad.border {
            Some(b) if b.width > 0.0 => (b.color, b.width, b.position.extent(b.width)),
            _ => (Color::transparent(), 0.0, 0.0),
        };

        let outer = rect.expand(extent);
        let half = outer.size * 0.5;
        let radius = if quad.corner_radius > 0.0 {
            (quad.corner_radius + extent).min(half.x.min(half.y))
        } else {
            0.0
        };

        let center = outer.center();
        let (min, max) = (outer.min(), outer.max());
        let corners = [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)];
        let shape = [half.x, half.y, radius, border_width];

        let base = self.vertices.len() as u32;
        for corner in corners {
            let v = Vertex {
                position: self.bake(corner),
                local: (corner - center).to_array(),
                color: quad.fill.to_array(),
                border: border_color.to_array(),
                shape,
                clip: self.clip,
                adjacency: [0; 4],
            };
            self.vertices.push(v);
        }
        self.push_quad_indices(base);
    }

    /// Appends flat-coloured triangles.
    ///
    /// Index lists that are not whole triangles or that reference missing
    /// vertices are rejected with a warning.
    pub fn add_triangles(&mut self, positions: &[Vec2], indices: &[u32], color: Color) {
        if !self.validate_triangles(positions.len(), indices.len(), indices.iter().copied()) {
            return;
        }
        let base = self.vertices.len() as u32;
        for &p in positions {
            let v = self.flat_vertex(p, color);
            self.vertices.push(v);
        }
        self.indices.extend(indices.iter().map(|&i| base + i));
    }

    /// Appends a tessellated mesh; per-vertex colours (white if absent) are multiplied by `tint`.
    pub fn add_mesh(&mut self, mesh: &TessellatedMesh, tint: Color) {
        if mesh.is_empty() {
            return;
        }
        let indices = mesh.indices.iter().map(|&i| i as u32);
        if !self.validate_triangles(mesh.positions.len(), mesh.indices.len(), indices) {
            return;
        }
        let base = self.vertices.len() as u32;
        for (i, &p) in mesh.positions.iter().enumerate() {
            let v = self.flat_vertex(p, mesh.color_at(i, Color::WHITE).modulate(tint));
            self.vertices.push(v);
        }
        self.indices.extend(mesh.indices.iter().map(|&i| base + i as u32));
    }

    /// Appends one MSDF glyph quad sampled from `atlas`.
    pub fn add_text_quad(&mut self, glyph: &GlyphQuad, atlas: TextureId, sdf_pixel_range: f32) {
        if glyph.size.x <= 0.0 || glyph.size.y <= 0.0 {
            return;
        }
        self.bind_texture(atlas);

        let min = glyph.position;
        let max = glyph.position + glyph.size;
        let corners = [
            (min, glyph.uv_min),
            (Vec2::new(max.x, min.y), Vec2::new(glyph.uv_max.x, glyph.uv_min.y)),
            (max, glyph.uv_max),
            (Vec2::new(min.x, max.y), Vec2::new(glyph.uv_min.x, glyph.uv_max.y)),
        ];

        let base = self.vertices.len() as u32;
        for (corner, uv) in corners {
            let v = Vertex {
                position: self.bake(corner),
                local: uv.to_array(),
                color: glyph.color.to_array(),
                border: [0.0; 4],
                shape: [KIND_TEXT, sdf_pixel_range, 0.0, 0.0],
                clip: self.clip,
                adjacency: [0; 4],
            };
            self.vertices.push(v);
        }
        self.push_quad_indices(base);
    }

    /// Appends a ground tile carrying its world coordinate and neighbour materials.
    pub fn add_tile_quad(&mut self, tile: &TileQuad) {
        let rect = tile.rect.normalized();
        if rect.is_empty() {
            return;
        }
        let adjacency = [
            pack_world_coord(tile.world.0, tile.world.1),
            pack_surface_ids(tile.neighbors.cardinal),
            pack_surface_ids(tile.neighbors.diagonal),
            tile.surface as u32,
        ];

        let (min, max) = (rect.min(), rect.max());
        let corners = [
            (min, [0.0, 0.0]),
            (Vec2::new(max.x, min.y), [1.0, 0.0]),
            (max, [1.0, 1.0]),
            (Vec2::new(min.x, max.y), [0.0, 1.0]),
        ];

        let base = self.vertices.len() as u32;
        for (corner, uv) in corners {
            let v = Vertex {
                position: self.bake(corner),
                local: uv,
                color: tile.tint.to_array(),
                border: [0.0; 4],
                shape: [KIND_TILE, 0.0, 0.0, 0.0],
                clip: self.clip,
                adjacency,
            };
            self.vertices.push(v);
        }
        self.push_quad_indices(base);
    }

    // ── private helpers ────────────────────────────────────────────────────

    #[inline]
    fn bake(&self, p: Vec2) -> [f32; 2] {
        if self.transform_is_identity {
            p.to_array()
        } else {
            self.transform.transform_point(p).to_array()
        }
    }

    #[inline]
    fn flat_vertex(&self, p: Vec2, color: Color) -> Vertex {
        Vertex {
            position: self.bake(p),
            local: [0.0; 2],
            color: color.to_array(),
            border: [0.0; 4],
            shape: [KIND_FLAT, 0.0, 0.0, 0.0],
            clip: self.clip,
            adjacency: [0; 4],
        }
    }

    #[inline]
    fn push_quad_indices(&mut self, base: u32) {
        self.indices.extend(QUAD_INDICES.iter().map(|&i| base + i));
    }

    fn validate_triangles(
        &self,
        vertex_count: usize,
        index_count: usize,
        mut indices: impl Iterator<Item = u32>,
    ) -> bool {
        if index_count % 3 != 0 {
            log::warn!("skipping triangle list: {index_count} indices is not a multiple of 3");
            return false;
        }
        if let Some(bad) = indices.find(|&i| i as usize >= vertex_count) {
            log::warn!("skipping triangle list: index {bad} out of range for {vertex_count} vertices");
            return false;
        }
        true
    }

    /// Text with a different atlas than the open segment starts a new segment.
    fn bind_texture(&mut self, texture: TextureId) {
        match self.segment_texture {
            None => self.segment_texture = Some(texture),
            Some(current) if current == texture => {}
            Some(_) => {
                self.close_segment();
                self.segment_texture = Some(texture);
            }
        }
    }

    fn close_segment(&mut self) {
        let end = self.indices.len() as u32;
        if end > self.segment_start {
            self.segments.push(DrawSegment {
                first_index: self.segment_start,
                index_count: end - self.segment_start,
                texture: self.segment_texture,
            });
        }
        self.segment_start = end;
    }

    fn clear_geometry(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.segments.clear();
        self.segment_start = 0;
        self.segment_texture = None;
    }
}
