//! Submission seam between the CPU batch engine and the GPU.
//!
//! [`Batch`](super::Batch) builds geometry without touching a device; only
//! flushes and instancing calls go through a [`RenderBackend`].

use crate::coords::Mat4;

use super::vertex::{InstanceData, MeshVertex, Vertex};

/// Externally managed texture (glyph atlas) registered with a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Backend-side storage slot of an instanced mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MeshSlot(pub u32);

/// Contiguous index range drawn with one texture binding.
///
/// `texture` is `None` when the range holds no text; the backend binds a
/// placeholder texture then.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawSegment {
    pub first_index: u32,
    pub index_count: u32,
    pub texture: Option<TextureId>,
}

/// One flushed batch: shared vertex/index buffers plus one segment per draw call.
#[derive(Debug, Copy, Clone)]
pub struct BatchSubmission<'a> {
    pub vertices: &'a [Vertex],
    pub indices: &'a [u32],
    pub segments: &'a [DrawSegment],
    pub projection: Mat4,
}

/// GPU operations the batch engine needs.
///
/// Submission is fire-and-forget: implementations must not block on GPU completion.
pub trait RenderBackend {
    /// Uploads the batch and issues one draw call per segment.
    fn draw_batch(&mut self, batch: &BatchSubmission<'_>);

    /// Allocates static mesh buffers plus an instance buffer for `max_instances`.
    ///
    /// `None` when the backend cannot allocate.
    fn create_instanced_mesh(
        &mut self,
        vertices: &[MeshVertex],
        indices: &[u16],
        max_instances: u32,
    ) -> Option<MeshSlot>;

    /// Uploads `instances` (never more than the slot's capacity) and issues one draw call.
    fn draw_instanced(&mut self, slot: MeshSlot, instances: &[InstanceData], projection: &Mat4);

    fn release_instanced_mesh(&mut self, slot: MeshSlot);
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;

    /// Owned copy of a [`BatchSubmission`].
    #[derive(Debug, Clone)]
    pub(crate) struct RecordedBatch {
        pub vertices: Vec<Vertex>,
        pub indices: Vec<u32>,
        pub segments: Vec<DrawSegment>,
        pub projection: Mat4,
    }

    #[derive(Debug, Clone)]
    pub(crate) struct RecordedMesh {
        pub vertices: Vec<MeshVertex>,
        pub indices: Vec<u16>,
        pub max_instances: u32,
        pub released: bool,
    }

    /// Backend that records everything submitted to it, in call order.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub batches: Vec<RecordedBatch>,
        pub meshes: Vec<RecordedMesh>,
        pub instanced_draws: Vec<(MeshSlot, Vec<InstanceData>)>,
        /// Every call as a short tag, for ordering assertions.
        pub calls: Vec<&'static str>,
        pub refuse_allocations: bool,
    }

    impl RecordingBackend {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn draw_call_count(&self) -> usize {
            self.batches.iter().map(|b| b.segments.len()).sum::<usize>() + self.instanced_draws.len()
        }

        pub(crate) fn all_vertices(&self) -> Vec<Vertex> {
            self.batches.iter().flat_map(|b| b.vertices.iter().copied()).collect()
        }
    }

    impl RenderBackend for RecordingBackend {
        fn draw_batch(&mut self, batch: &BatchSubmission<'_>) {
            self.calls.push("batch");
            self.batches.push(RecordedBatch {
                vertices: batch.vertices.to_vec(),
                indices: batch.indices.to_vec(),
                segments: batch.segments.to_vec(),
                projection: batch.projection,
            });
        }

        fn create_instanced_mesh(
            &mut self,
            vertices: &[MeshVertex],
            indices: &[u16],
            max_instances: u32,
        ) -> Option<MeshSlot> {
            self.calls.push("create_mesh");
            if self.refuse_allocations {
                return None;
            }
            self.meshes.push(RecordedMesh {
                vertices: vertices.to_vec(),
                indices: indices.to_vec(),
                max_instances,
                released: false,
            });
            Some(MeshSlot(self.meshes.len() as u32 - 1))
        }

        fn draw_instanced(&mut self, slot: MeshSlot, instances: &[InstanceData], _projection: &Mat4) {
            self.calls.push("instanced");
            self.instanced_draws.push((slot, instances.to_vec()));
        }

        fn release_instanced_mesh(&mut self, slot: MeshSlot) {
            self.calls.push("release_mesh");
            if let Some(mesh) = self.meshes.get_mut(slot.0 as usize) {
                mesh.released = true;
            }
        }
    }
}
