//! GPU rendering subsystem.
//!
//! [`Batch`] accumulates every primitive kind into one shared vertex/index
//! buffer and hands it to a [`RenderBackend`] on flush. [`WgpuBackend`] is the
//! production backend.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Transforms are baked into vertex positions; the projection is the only
//!   per-draw uniform.

pub mod backend;
mod batch;
mod ctx;
pub mod gpu;
mod instanced;
pub mod primitives;
mod stats;
pub mod vertex;

pub use backend::{BatchSubmission, DrawSegment, MeshSlot, RenderBackend, TextureId};
pub use batch::{Batch, BatchConfig, QUAD_INDICES};
pub use ctx::{RenderCtx, RenderTarget};
pub use gpu::{WgpuBackend, WgpuFrame};
pub use instanced::{InstancedMeshHandle, MAX_INSTANCE_CAPACITY};
pub use primitives::{Border, BorderPosition, GlyphQuad, ShapeQuad, TileNeighbors, TileQuad};
pub use stats::FrameStats;
pub use vertex::{InstanceData, MeshVertex, Vertex};
