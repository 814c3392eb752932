/// Per-frame submission counters.
///
/// Counts submitted work, not completed work: the CPU never waits on the GPU.
/// Instanced draws count every replayed vertex and triangle. Counters are
/// 64-bit and saturate, since instance counts per frame are unbounded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: u64,
    pub vertices: u64,
    pub triangles: u64,
    pub instances: u64,
}

impl FrameStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn record_batch(&mut self, draw_calls: usize, vertices: usize, indices: usize) {
        self.draw_calls = self.draw_calls.saturating_add(draw_calls as u64);
        self.vertices = self.vertices.saturating_add(vertices as u64);
        self.triangles = self.triangles.saturating_add((indices / 3) as u64);
    }

    pub(crate) fn record_instanced(&mut self, instances: usize, mesh_vertices: u32, mesh_indices: u32) {
        let instances = instances as u64;
        self.draw_calls = self.draw_calls.saturating_add(1);
        self.instances = self.instances.saturating_add(instances);
        self.vertices = self.vertices.saturating_add(u64::from(mesh_vertices).saturating_mul(instances));
        self.triangles = self.triangles.saturating_add(u64::from(mesh_indices / 3).saturating_mul(instances));
    }
}
