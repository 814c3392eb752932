//! Instanced mesh registry: upload a mesh once, replay it many times per frame.

use crate::paint::Color;
use crate::path::TessellatedMesh;

use super::backend::{MeshSlot, RenderBackend};
use super::batch::Batch;
use super::vertex::{InstanceData, MeshVertex};

/// Upper bound on the per-draw instance capacity of one mesh.
pub const MAX_INSTANCE_CAPACITY: u32 = 100_000;

/// Handle over a mesh uploaded for instancing.
///
/// Owned by the caller and released explicitly with
/// [`Batch::release_instanced_mesh`]. An invalid handle (rejected capacity or
/// failed allocation) is safe to draw with; it draws nothing.
#[derive(Debug, PartialEq, Eq)]
pub struct InstancedMeshHandle {
    slot: Option<MeshSlot>,
    max_instances: u32,
    vertex_count: u32,
    index_count: u32,
}

impl InstancedMeshHandle {
    fn invalid() -> Self {
        Self { slot: None, max_instances: 0, vertex_count: 0, index_count: 0 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.slot.is_some()
    }

    /// Instances issued per draw call.
    #[inline]
    pub fn max_instances(&self) -> u32 {
        self.max_instances
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl Batch {
    /// Uploads `mesh` as static buffers plus an instance buffer of `max_instances`.
    ///
    /// `max_instances` must lie in `1..=MAX_INSTANCE_CAPACITY`; anything else,
    /// or an empty mesh, returns an invalid handle without allocating.
    pub fn upload_instanced_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        mesh: &TessellatedMesh,
        max_instances: u32,
    ) -> InstancedMeshHandle {
        if max_instances == 0 || max_instances > MAX_INSTANCE_CAPACITY {
            log::warn!(
                "instanced mesh capacity {max_instances} outside 1..={MAX_INSTANCE_CAPACITY}; not uploading"
            );
            return InstancedMeshHandle::invalid();
        }
        if mesh.is_empty() {
            log::warn!("refusing to upload an empty instanced mesh");
            return InstancedMeshHandle::invalid();
        }

        let vertices: Vec<MeshVertex> = mesh
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| MeshVertex {
                position: p.to_array(),
                color: mesh.color_at(i, Color::WHITE).to_array(),
            })
            .collect();

        match backend.create_instanced_mesh(&vertices, &mesh.indices, max_instances) {
            Some(slot) => {
                log::debug!(
                    "uploaded instanced mesh {slot:?}: {} vertices, {} triangles, {max_instances} instances per draw",
                    vertices.len(),
                    mesh.triangle_count()
                );
                InstancedMeshHandle {
                    slot: Some(slot),
                    max_instances,
                    vertex_count: vertices.len() as u32,
                    index_count: mesh.indices.len() as u32,
                }
            }
            None => {
                log::warn!("backend could not allocate an instanced mesh");
                InstancedMeshHandle::invalid()
            }
        }
    }

    /// Draws every instance, one draw call per `max_instances` chunk.
    ///
    /// Pending batched geometry is flushed first so painter's order holds.
    pub fn draw_instanced<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        handle: &InstancedMeshHandle,
        instances: &[InstanceData],
    ) {
        let Some(slot) = handle.slot else {
            log::warn!("draw_instanced on an invalid mesh handle; skipping {} instances", instances.len());
            return;
        };
        if instances.is_empty() {
            return;
        }

        self.flush(backend);

        let projection = self.projection();
        for chunk in instances.chunks(handle.max_instances as usize) {
            backend.draw_instanced(slot, chunk, &projection);
            self.stats_mut().record_instanced(chunk.len(), handle.vertex_count, handle.index_count);
        }
    }

    /// Frees the mesh's GPU buffers. Invalid handles are ignored.
    pub fn release_instanced_mesh<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        handle: InstancedMeshHandle,
    ) {
        if let Some(slot) = handle.slot {
            backend.release_instanced_mesh(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Rect, Vec2};
    use crate::render::backend::recording::RecordingBackend;
    use crate::render::primitives::ShapeQuad;

    fn triangle() -> TessellatedMesh {
        TessellatedMesh {
            positions: vec![Vec2::new(0.0, -1.0), Vec2::new(1.0, 1.0), Vec2::new(-1.0, 1.0)],
            indices: vec![0, 1, 2],
            colors: None,
        }
    }

    fn instances(n: usize) -> Vec<InstanceData> {
        (0..n)
            .map(|i| InstanceData::new([i as f32, 0.0], 0.0, 1.0, [1.0; 4]))
            .collect()
    }

    // ── upload ─────────────────────────────────────────────────────────────

    #[test]
    fn valid_capacity_uploads_mesh() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 128);

        assert!(handle.is_valid());
        assert_eq!(handle.max_instances(), 128);
        assert_eq!(handle.index_count(), 3);
        assert_eq!(backend.meshes.len(), 1);
        assert_eq!(backend.meshes[0].max_instances, 128);
        assert_eq!(backend.meshes[0].vertices[0].color, [1.0; 4]);
    }

    #[test]
    fn out_of_range_capacity_yields_invalid_handle_without_allocation() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        for cap in [0, MAX_INSTANCE_CAPACITY + 1] {
            let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), cap);
            assert!(!handle.is_valid());
        }
        assert!(batch.upload_instanced_mesh(&mut backend, &triangle(), MAX_INSTANCE_CAPACITY).is_valid());
        assert_eq!(backend.meshes.len(), 1);
    }

    #[test]
    fn empty_mesh_or_failed_allocation_is_invalid() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        assert!(!batch.upload_instanced_mesh(&mut backend, &TessellatedMesh::default(), 8).is_valid());

        backend.refuse_allocations = true;
        assert!(!batch.upload_instanced_mesh(&mut backend, &triangle(), 8).is_valid());
    }

    // ── draw ───────────────────────────────────────────────────────────────

    #[test]
    fn large_counts_are_chunked_without_loss() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 100);

        let count = 1050;
        batch.draw_instanced(&mut backend, &handle, &instances(count));

        assert_eq!(backend.instanced_draws.len(), count.div_ceil(100));
        assert!(backend.instanced_draws.iter().all(|(_, chunk)| chunk.len() <= 100));

        let mut seen = vec![0u32; count];
        for (_, chunk) in &backend.instanced_draws {
            for inst in chunk {
                seen[inst.position[0] as usize] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));

        let stats = batch.frame_stats();
        assert_eq!(stats.draw_calls, 11);
        assert_eq!(stats.instances, 1050);
    }

    #[test]
    fn heavy_mesh_at_full_capacity_keeps_counting() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let mut mesh = triangle();
        mesh.indices = [0u16, 1, 2].repeat(50_000);
        let handle = batch.upload_instanced_mesh(&mut backend, &mesh, MAX_INSTANCE_CAPACITY);

        batch.draw_instanced(&mut backend, &handle, &instances(MAX_INSTANCE_CAPACITY as usize));

        let stats = batch.frame_stats();
        assert_eq!(stats.draw_calls, 1);
        assert_eq!(stats.triangles, 50_000 * 100_000);
        assert_eq!(stats.vertices, 3 * 100_000);
    }

    #[test]
    fn exact_multiple_does_not_issue_empty_draw() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 10);
        batch.draw_instanced(&mut backend, &handle, &instances(30));
        assert_eq!(backend.instanced_draws.len(), 3);
    }

    #[test]
    fn pending_batch_is_flushed_before_instances() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 10);
        batch.add_quad(&ShapeQuad::filled(Rect::new(0.0, 0.0, 4.0, 4.0), Color::WHITE));
        batch.draw_instanced(&mut backend, &handle, &instances(3));

        assert_eq!(backend.calls, vec!["create_mesh", "batch", "instanced"]);
        assert!(batch.is_empty());
    }

    #[test]
    fn invalid_handle_draws_nothing() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 0);
        batch.draw_instanced(&mut backend, &handle, &instances(5));
        assert!(backend.instanced_draws.is_empty());
    }

    #[test]
    fn release_frees_backend_slot() {
        let mut batch = Batch::default();
        let mut backend = RecordingBackend::new();
        let handle = batch.upload_instanced_mesh(&mut backend, &triangle(), 4);
        batch.release_instanced_mesh(&mut backend, handle);
        assert!(backend.meshes[0].released);
    }
}
