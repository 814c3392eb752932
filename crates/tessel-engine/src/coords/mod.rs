//! Coordinate and geometry types shared across the pipeline.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Positions are baked through a `Mat4` at add time; the GPU only applies the
//! viewport projection.

mod mat4;
mod rect;
mod vec2;
mod viewport;

pub use mat4::Mat4;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
