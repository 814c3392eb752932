//! Immediate-mode drawing facade.
//!
//! [`Canvas`] owns the batch, the clip and transform stacks, and the optional
//! glyph provider. Every draw call resolves the current state and forwards to
//! the [`Batch`]; nothing touches the GPU until a flush.

mod clip;
mod text;
mod transform;

pub use clip::{ClipEntry, ClipShape, ClipStack};
pub use text::GlyphProvider;
pub use transform::TransformStack;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::coords::{Mat4, Rect, Vec2, Viewport};
use crate::paint::Color;
use crate::path::{Artwork, ArtworkCache, TessellatedMesh};
use crate::render::{
    Batch, BatchConfig, Border, BorderPosition, FrameStats, GlyphQuad, InstanceData,
    InstancedMeshHandle, RenderBackend, ShapeQuad, TileQuad, QUAD_INDICES,
};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasConfig {
    pub batch: BatchConfig,
    /// Triangle-fan segments per circle (at least 3).
    pub circle_segments: u32,
    /// Flattening tolerance for artwork loaded through [`Canvas::load_artwork`].
    pub curve_tolerance: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            batch: BatchConfig::default(),
            circle_segments: 64,
            curve_tolerance: 0.25,
        }
    }
}

/// Drawing session over one [`Batch`].
///
/// Call [`begin_frame`](Self::begin_frame), issue draw calls, then
/// [`end_frame`](Self::end_frame) with a backend to submit.
pub struct Canvas {
    config: CanvasConfig,
    batch: Batch,
    clips: ClipStack,
    transforms: TransformStack,

    viewport: Viewport,
    projection_override: Option<Mat4>,

    glyphs: Option<Box<dyn GlyphProvider>>,
    warned_missing_glyphs: bool,

    // scratch
    glyph_quads: Vec<GlyphQuad>,
    fan_points: Vec<Vec2>,
    fan_indices: Vec<u32>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Canvas {
    pub fn new(config: CanvasConfig) -> Self {
        Self {
            config,
            batch: Batch::new(config.batch),
            clips: ClipStack::new(),
            transforms: TransformStack::new(),
            viewport: Viewport::default(),
            projection_override: None,
            glyphs: None,
            warned_missing_glyphs: false,
            glyph_quads: Vec::new(),
            fan_points: Vec::new(),
            fan_indices: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    #[inline]
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    // ── frame lifecycle ───────────────────────────────────────────────────

    /// Starts a frame: clears geometry, stacks and per-frame counters.
    pub fn begin_frame(&mut self, viewport: Viewport) {
        if !viewport.is_valid() {
            log::debug!("begin_frame with degenerate viewport {viewport:?}");
        }
        self.viewport = viewport;
        self.batch.begin_frame();
        self.clips.clear();
        self.transforms.clear();
        self.batch.set_projection(self.projection());
        self.warned_missing_glyphs = false;
    }

    /// Flushes remaining geometry and returns the frame's counters.
    pub fn end_frame<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> FrameStats {
        if !self.clips.is_empty() || self.transforms.depth() > 0 {
            log::warn!(
                "frame ended with {} clip(s) and {} transform(s) still pushed",
                self.clips.depth(),
                self.transforms.depth()
            );
        }
        self.batch.end_frame(backend)
    }

    /// Submits everything drawn so far.
    pub fn flush<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) {
        self.batch.flush(backend);
    }

    #[inline]
    pub fn last_frame_stats(&self) -> FrameStats {
        self.batch.last_frame_stats()
    }

    /// Replaces the viewport's orthographic projection, e.g. with a DPI-aware one.
    pub fn set_projection_override(&mut self, projection: Option<Mat4>) {
        self.projection_override = projection;
        self.batch.set_projection(self.projection());
    }

    /// Projection used for submission: the override if set, else the viewport's orthographic.
    pub fn projection(&self) -> Mat4 {
        self.projection_override
            .unwrap_or_else(|| self.viewport.orthographic())
    }

    pub fn set_glyph_provider(&mut self, provider: Box<dyn GlyphProvider>) {
        self.glyphs = Some(provider);
    }

    pub fn clear_glyph_provider(&mut self) -> Option<Box<dyn GlyphProvider>> {
        self.glyphs.take()
    }

    // ── clip / transform ──────────────────────────────────────────────────

    /// Pushes a clip region intersected with the current one; returns the effective bounds.
    pub fn push_clip(&mut self, shape: ClipShape) -> Rect {
        let bounds = self.clips.push(shape);
        self.batch.set_clip(Some(bounds));
        bounds
    }

    pub fn pop_clip(&mut self) {
        if self.clips.pop().is_none() {
            log::warn!("pop_clip without a matching push_clip");
            return;
        }
        self.batch.set_clip(self.clips.current());
    }

    #[inline]
    pub fn clip_bounds(&self) -> Option<Rect> {
        self.clips.current()
    }

    /// Composes `transform` onto the current one for everything drawn until the matching pop.
    pub fn push_transform(&mut self, transform: Mat4) {
        let current = self.transforms.push(transform);
        self.batch.set_transform(current);
    }

    pub fn pop_transform(&mut self) {
        if self.transforms.pop().is_none() {
            log::warn!("pop_transform without a matching push_transform");
            return;
        }
        self.batch.set_transform(self.transforms.current());
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        self.transforms.current()
    }

    // ── shapes ────────────────────────────────────────────────────────────

    pub fn draw_rect(&mut self, rect: Rect, fill: Color, border: Option<Border>) {
        self.batch.add_quad(&ShapeQuad { rect, fill, border, corner_radius: 0.0 });
    }

    /// Pass `radius = 0.0` for sharp corners.
    pub fn draw_rounded_rect(&mut self, rect: Rect, radius: f32, fill: Color, border: Option<Border>) {
        self.batch.add_quad(&ShapeQuad { rect, fill, border, corner_radius: radius.max(0.0) });
    }

    /// Circle as a triangle fan; the border is one line quad per fan segment.
    pub fn draw_circle(&mut self, center: Vec2, radius: f32, fill: Color, border: Option<Border>) {
        if radius <= 0.0 || !radius.is_finite() {
            return;
        }
        let segments = self.config.circle_segments.max(3);

        if !fill.is_transparent() {
            self.fan_points.clear();
            self.fan_indices.clear();
            self.fan_points.push(center);
            self.fan_points
                .extend((0..segments).map(|i| rim_point(center, radius, i, segments)));
            for i in 0..segments {
                self.fan_indices
                    .extend_from_slice(&[0, 1 + i, 1 + (i + 1) % segments]);
            }
            self.batch.add_triangles(&self.fan_points, &self.fan_indices, fill);
        }

        if let Some(border) = border.filter(Border::is_visible) {
            let ring = match border.position {
                BorderPosition::Inside => (radius - border.width * 0.5).max(0.0),
                BorderPosition::Center => radius,
                BorderPosition::Outside => radius + border.width * 0.5,
            };
            for i in 0..segments {
                let a = rim_point(center, ring, i, segments);
                let b = rim_point(center, ring, i + 1, segments);
                self.draw_line(a, b, border.width, border.color);
            }
        }
    }

    /// Straight segment drawn as one oriented quad `width` wide.
    pub fn draw_line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        let dir = to - from;
        let len = dir.length();
        if len <= f32::EPSILON || width <= 0.0 {
            return;
        }
        let n = dir.perp() * (width * 0.5 / len);
        let corners = [from + n, to + n, to - n, from - n];
        self.batch.add_triangles(&corners, &QUAD_INDICES, color);
    }

    pub fn draw_triangles(&mut self, positions: &[Vec2], indices: &[u32], color: Color) {
        self.batch.add_triangles(positions, indices, color);
    }

    pub fn draw_mesh(&mut self, mesh: &TessellatedMesh, tint: Color) {
        self.batch.add_mesh(mesh, tint);
    }

    pub fn draw_tile(&mut self, tile: &TileQuad) {
        self.batch.add_tile_quad(tile);
    }

    // ── text ──────────────────────────────────────────────────────────────

    /// Draws `text` through the glyph provider.
    ///
    /// Without a provider nothing is drawn; a warning is logged once per frame.
    pub fn draw_text(&mut self, text: &str, origin: Vec2, scale: f32, color: Color) {
        let Some(glyphs) = self.glyphs.as_deref() else {
            if !self.warned_missing_glyphs {
                log::warn!("draw_text without a glyph provider; text is skipped");
                self.warned_missing_glyphs = true;
            }
            return;
        };

        self.glyph_quads.clear();
        glyphs.layout(text, origin, scale, color, &mut self.glyph_quads);
        let atlas = glyphs.atlas();
        let range = glyphs.sdf_pixel_range();
        for glyph in &self.glyph_quads {
            self.batch.add_text_quad(glyph, atlas, range);
        }
    }

    // ── artwork ───────────────────────────────────────────────────────────

    /// Loads artwork through `cache` at the configured curve tolerance.
    pub fn load_artwork(&self, cache: &mut ArtworkCache, path: &Path) -> Result<Arc<Artwork>> {
        cache.get_or_load(path, self.config.curve_tolerance)
    }

    /// Draws every mesh of `art` with its top-left at `origin`, uniformly scaled.
    pub fn draw_artwork(&mut self, art: &Artwork, origin: Vec2, scale: f32, tint: Color) {
        self.push_transform(Mat4::translation(origin.x, origin.y) * Mat4::scale(scale, scale));
        for mesh in &art.meshes {
            self.batch.add_mesh(mesh, tint);
        }
        self.pop_transform();
    }

    // ── instancing ────────────────────────────────────────────────────────

    pub fn upload_instanced_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        mesh: &TessellatedMesh,
        max_instances: u32,
    ) -> InstancedMeshHandle {
        self.batch.upload_instanced_mesh(backend, mesh, max_instances)
    }

    /// Flushes pending geometry, then draws all instances in capacity-sized chunks.
    pub fn draw_instanced<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        handle: &InstancedMeshHandle,
        instances: &[InstanceData],
    ) {
        self.batch.draw_instanced(backend, handle, instances);
    }

    pub fn release_instanced_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        handle: InstancedMeshHandle,
    ) {
        self.batch.release_instanced_mesh(backend, handle);
    }
}

#[inline]
fn rim_point(center: Vec2, radius: f32, i: u32, segments: u32) -> Vec2 {
    let angle = (i % segments) as f32 / segments as f32 * std::f32::consts::TAU;
    let (s, c) = angle.sin_cos();
    Vec2::new(center.x + c * radius, center.y + s * radius)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::recording::RecordingBackend;
    use crate::render::vertex::{KIND_FLAT, NOTHING_VISIBLE, UNCLIPPED};
    use crate::render::TextureId;

    /// Fixed-advance provider: one 8×10 quad per non-space character.
    struct FixedGlyphs;

    impl GlyphProvider for FixedGlyphs {
        fn layout(&self, text: &str, origin: Vec2, scale: f32, color: Color, out: &mut Vec<GlyphQuad>) {
            for (i, ch) in text.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                out.push(GlyphQuad {
                    position: Vec2::new(origin.x + i as f32 * 8.0 * scale, origin.y),
                    size: Vec2::new(8.0 * scale, 10.0 * scale),
                    uv_min: Vec2::new(0.0, 0.0),
                    uv_max: Vec2::new(0.1, 0.1),
                    color,
                });
            }
        }

        fn atlas(&self) -> TextureId {
            TextureId(3)
        }

        fn sdf_pixel_range(&self) -> f32 {
            4.0
        }
    }

    fn canvas() -> Canvas {
        let mut canvas = Canvas::default();
        canvas.begin_frame(Viewport::new(800.0, 600.0));
        canvas
    }

    fn unit() -> Rect {
        Rect::new(0.0, 0.0, 10.0, 10.0)
    }

    // ── clip ──────────────────────────────────────────────────────────────

    #[test]
    fn clip_outside_parent_hides_everything_beneath() {
        let mut c = canvas();
        c.push_clip(ClipShape::Rect(Rect::new(0.0, 0.0, 100.0, 100.0)));
        c.draw_rect(unit(), Color::WHITE, None);
        let child = c.push_clip(ClipShape::Rect(Rect::new(500.0, 500.0, 50.0, 50.0)));
        c.draw_rect(unit(), Color::WHITE, None);
        c.pop_clip();
        c.draw_rect(unit(), Color::WHITE, None);
        c.pop_clip();
        c.draw_rect(unit(), Color::WHITE, None);

        assert!(child.is_empty());
        let v = c.batch().pending_vertices();
        assert_eq!(v[0].clip, [0.0, 0.0, 100.0, 100.0]);
        assert!(v[4..8].iter().all(|v| v.clip == NOTHING_VISIBLE));
        assert_eq!(v[8].clip, [0.0, 0.0, 100.0, 100.0]);
        assert_eq!(v[12].clip, UNCLIPPED);
    }

    #[test]
    fn circle_clip_uses_bounding_box() {
        let mut c = canvas();
        let bounds = c.push_clip(ClipShape::Circle { center: Vec2::new(50.0, 50.0), radius: 10.0 });
        assert_eq!(bounds, Rect::new(40.0, 40.0, 20.0, 20.0));
        assert_eq!(c.clip_bounds(), Some(bounds));
    }

    // ── transform ─────────────────────────────────────────────────────────

    #[test]
    fn transform_applies_only_to_later_draws() {
        const N: usize = 3;
        let mut c = canvas();
        let mut backend = RecordingBackend::new();
        for _ in 0..N {
            c.draw_rect(unit(), Color::WHITE, None);
        }
        c.push_transform(Mat4::translation(200.0, 0.0));
        for _ in 0..N {
            c.draw_rect(unit(), Color::WHITE, None);
        }
        c.pop_transform();
        c.flush(&mut backend);

        assert_eq!(backend.batches.len(), 1);
        let v = &backend.batches[0].vertices;
        assert_eq!(v.len(), 2 * N * 4);
        assert!(v[..N * 4].iter().all(|v| v.position[0] <= 10.0));
        assert!(v[N * 4..].iter().all(|v| v.position[0] >= 200.0));
    }

    #[test]
    fn unbalanced_pops_are_ignored() {
        let mut c = canvas();
        c.pop_clip();
        c.pop_transform();
        assert_eq!(c.clip_bounds(), None);
        assert!(c.transform().is_identity());
    }

    // ── shapes ────────────────────────────────────────────────────────────

    #[test]
    fn circle_fill_is_one_fan() {
        let mut c = canvas();
        c.draw_circle(Vec2::new(50.0, 50.0), 20.0, Color::WHITE, None);

        let v = c.batch().pending_vertices();
        assert_eq!(v.len(), 65);
        assert_eq!(c.batch().pending_indices().len(), 64 * 3);
        assert_eq!(v[0].position, [50.0, 50.0]);
        assert!(v.iter().all(|v| v.kind() == KIND_FLAT));
        for p in &v[1..] {
            let d = Vec2::new(p.position[0] - 50.0, p.position[1] - 50.0).length();
            assert!((d - 20.0).abs() < 1e-3);
        }
    }

    #[test]
    fn circle_border_is_one_quad_per_segment() {
        let mut c = canvas();
        let border = Border::new(Color::BLACK, 2.0, BorderPosition::Outside);
        c.draw_circle(Vec2::new(0.0, 0.0), 10.0, Color::transparent(), Some(border));

        assert_eq!(c.batch().pending_vertices().len(), 64 * 4);
        assert_eq!(c.batch().pending_indices().len(), 64 * 6);
        // Outside: the ring centreline sits half a width beyond the radius.
        let v = c.batch().pending_vertices();
        let mid = Vec2::new(
            (v[0].position[0] + v[3].position[0]) * 0.5,
            (v[0].position[1] + v[3].position[1]) * 0.5,
        );
        assert!((mid.length() - 11.0).abs() < 1e-3);
    }

    #[test]
    fn line_is_an_oriented_quad() {
        let mut c = canvas();
        c.draw_line(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), 4.0, Color::WHITE);
        c.draw_line(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0), 4.0, Color::WHITE);

        let v = c.batch().pending_vertices();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].position, [0.0, 2.0]);
        assert_eq!(v[1].position, [10.0, 2.0]);
        assert_eq!(v[2].position, [10.0, -2.0]);
        assert_eq!(v[3].position, [0.0, -2.0]);
    }

    // ── text ──────────────────────────────────────────────────────────────

    #[test]
    fn text_without_provider_is_a_no_op() {
        let mut c = canvas();
        c.draw_text("hello", Vec2::zero(), 1.0, Color::WHITE);
        c.draw_text("again", Vec2::zero(), 1.0, Color::WHITE);
        assert!(c.batch().is_empty());
    }

    #[test]
    fn text_with_provider_emits_glyph_quads() {
        let mut c = canvas();
        let mut backend = RecordingBackend::new();
        c.set_glyph_provider(Box::new(FixedGlyphs));
        c.draw_text("ab c", Vec2::new(10.0, 20.0), 2.0, Color::WHITE);
        c.flush(&mut backend);

        let batch = &backend.batches[0];
        assert_eq!(batch.vertices.len(), 3 * 4);
        assert!(batch.vertices.iter().all(|v| v.is_text() && v.shape[1] == 4.0));
        assert_eq!(batch.segments[0].texture, Some(TextureId(3)));
        assert_eq!(batch.vertices[4].position, [26.0, 20.0]);
    }

    // ── artwork ───────────────────────────────────────────────────────────

    #[test]
    fn artwork_is_placed_and_scaled() {
        let art = Artwork {
            width: 4.0,
            height: 4.0,
            meshes: vec![TessellatedMesh {
                positions: vec![Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0), Vec2::new(0.0, 4.0)],
                indices: vec![0, 1, 2],
                colors: None,
            }],
        };
        let mut c = canvas();
        c.draw_artwork(&art, Vec2::new(100.0, 50.0), 2.0, Color::WHITE);
        c.draw_rect(unit(), Color::WHITE, None);

        let v = c.batch().pending_vertices();
        assert_eq!(v[1].position, [108.0, 50.0]);
        assert_eq!(v[2].position, [100.0, 58.0]);
        // Transform popped afterwards.
        assert_eq!(v[3].position, [0.0, 0.0]);
    }

    // ── frame ─────────────────────────────────────────────────────────────

    #[test]
    fn frame_uses_viewport_projection_unless_overridden() {
        let mut c = canvas();
        let mut backend = RecordingBackend::new();
        c.draw_rect(unit(), Color::WHITE, None);
        c.flush(&mut backend);
        assert_eq!(backend.batches[0].projection, Viewport::new(800.0, 600.0).orthographic());

        let dpi = Mat4::scale(0.5, 0.5);
        c.set_projection_override(Some(dpi));
        c.draw_rect(unit(), Color::WHITE, None);
        c.flush(&mut backend);
        assert_eq!(backend.batches[1].projection, dpi);
    }

    #[test]
    fn end_frame_reports_and_resets() {
        let mut c = canvas();
        let mut backend = RecordingBackend::new();
        c.draw_rect(unit(), Color::WHITE, None);
        c.draw_circle(Vec2::new(5.0, 5.0), 5.0, Color::WHITE, None);
        let stats = c.end_frame(&mut backend);

        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.vertices, 4 + 65);
        assert_eq!(stats.triangles, 2 + 64);
        assert_eq!(c.last_frame_stats(), stats);

        c.begin_frame(Viewport::new(800.0, 600.0));
        assert!(c.batch().is_empty());
        assert_eq!(c.last_frame_stats(), stats);
    }

    #[test]
    fn instanced_draws_go_through_the_canvas() {
        let mut c = canvas();
        let mut backend = RecordingBackend::new();
        let mesh = TessellatedMesh {
            positions: vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            indices: vec![0, 1, 2],
            colors: None,
        };
        let handle = c.upload_instanced_mesh(&mut backend, &mesh, 4);
        let instances = vec![InstanceData::new([0.0, 0.0], 0.0, 1.0, [1.0; 4]); 9];
        c.draw_instanced(&mut backend, &handle, &instances);
        c.release_instanced_mesh(&mut backend, handle);

        assert_eq!(backend.instanced_draws.len(), 3);
        assert!(backend.meshes[0].released);
        assert_eq!(c.end_frame(&mut backend).instances, 9);
    }
}
