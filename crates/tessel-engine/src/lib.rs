//! Tessel engine crate.
//!
//! Batched 2D vector rendering: curve flattening, SVG loading, ear-clipping
//! tessellation, a single-layout batch accumulator with GPU instancing, and
//! an immediate-mode drawing facade with clip and transform stacks.

pub mod logging;
pub mod coords;
pub mod paint;
pub mod path;
pub mod render;
pub mod canvas;
