//! Colour model shared by every primitive kind.
//!
//! Colours are linear, premultiplied RGBA end to end: the vertex colour slot,
//! tints, and the blend state all assume premultiplied alpha.

pub mod color;

pub use color::Color;
