use crate::coords::Vec2;
use crate::paint::Color;
use crate::render::{GlyphQuad, TextureId};

/// Lays out text against an externally managed MSDF atlas.
///
/// Atlas generation and shaping live outside the engine; the canvas only
/// needs quads, the atlas handle and the distance-field range.
pub trait GlyphProvider {
    /// Appends one quad per visible glyph of `text`, starting at `origin`
    /// (top-left of the first line), scaled by `scale`.
    fn layout(&self, text: &str, origin: Vec2, scale: f32, color: Color, out: &mut Vec<GlyphQuad>);

    fn atlas(&self) -> TextureId;

    /// Distance-field range the atlas was generated with, in atlas pixels.
    fn sdf_pixel_range(&self) -> f32;
}
