//! GPU data layouts.
//!
//! Every primitive kind shares [`Vertex`]. The kind is encoded in
//! `shape[0]`: non-negative values are SDF shape half-widths, negative values
//! are the sentinels below. One pipeline and one fragment path handle shapes,
//! glyphs, tiles and flat meshes without per-draw branching.

use bytemuck::{Pod, Zeroable};

/// `shape[0]` sentinel for MSDF glyph quads (`shape[1]` = SDF pixel range).
pub const KIND_TEXT: f32 = -1.0;
/// `shape[0]` sentinel for ground tiles (adjacency slot in use).
pub const KIND_TILE: f32 = -2.0;
/// `shape[0]` sentinel for flat-coloured triangles (meshes, fans, line quads).
pub const KIND_FLAT: f32 = -3.0;

/// Clip slot value meaning "no clipping".
pub const UNCLIPPED: [f32; 4] = [0.0; 4];
/// Zero-area clip rectangle: every fragment is discarded.
pub const NOTHING_VISIBLE: [f32; 4] = [-1.0; 4];

/// Largest magnitude of a packed tile world coordinate, per axis.
pub const TILE_COORD_LIMIT: i32 = 32767;

/// Uber vertex (96 bytes):
///
///  offset  0  position   [f32; 2]   loc 0  baked logical-px position
///  offset  8  local      [f32; 2]   loc 1  shape-local coord, glyph UV, or tile UV
///  offset 16  color      [f32; 4]   loc 2  premultiplied fill
///  offset 32  border     [f32; 4]   loc 3  premultiplied border colour
///  offset 48  shape      [f32; 4]   loc 4  (half_w, half_h, radius, border_width) or sentinel
///  offset 64  clip       [f32; 4]   loc 5  (min_x, min_y, max_x, max_y); zero = unclipped
///  offset 80  adjacency  [u32; 4]   loc 6  tile: (world, cardinal ids, diagonal ids, surface)
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub local: [f32; 2],
    pub color: [f32; 4],
    pub border: [f32; 4],
    pub shape: [f32; 4],
    pub clip: [f32; 4],
    pub adjacency: [u32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2, // local
        2 => Float32x4, // color
        3 => Float32x4, // border
        4 => Float32x4, // shape
        5 => Float32x4, // clip
        6 => Uint32x4   // adjacency
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    #[inline]
    pub fn kind(&self) -> f32 {
        self.shape[0]
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.shape[0] == KIND_TEXT
    }

    #[inline]
    pub fn is_tile(&self) -> bool {
        self.shape[0] == KIND_TILE
    }
}

/// Static vertex of an instanced mesh (24 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x4  // color
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Per-instance transform and tint replayed against a static mesh.
///
///  offset  0  position  [f32; 2]   loc 2
///  offset  8  rotation  f32        loc 3  radians
///  offset 12  scale     f32        loc 4  uniform
///  offset 16  tint      [f32; 4]   loc 5  premultiplied
#[repr(C, align(16))]
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct InstanceData {
    pub position: [f32; 2],
    pub rotation: f32,
    pub scale: f32,
    pub tint: [f32; 4],
}

const _: () = assert!(std::mem::size_of::<InstanceData>() == 32);
const _: () = assert!(std::mem::align_of::<InstanceData>() == 16);

// 32 bytes of f32 fields, 16-byte aligned: no padding anywhere.
unsafe impl Zeroable for InstanceData {}
unsafe impl Pod for InstanceData {}

impl InstanceData {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        2 => Float32x2, // position
        3 => Float32,   // rotation
        4 => Float32,   // scale
        5 => Float32x4  // tint
    ];

    #[inline]
    pub fn new(position: [f32; 2], rotation: f32, scale: f32, tint: [f32; 4]) -> Self {
        Self { position, rotation, scale, tint }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}

// ── tile packing ──────────────────────────────────────────────────────────

/// Packs a tile's world coordinate into one word: `x` in the high 16 bits,
/// `y` in the low 16, each as two's complement clamped to ±32767.
#[inline]
pub fn pack_world_coord(x: i32, y: i32) -> u32 {
    let x = x.clamp(-TILE_COORD_LIMIT, TILE_COORD_LIMIT) as i16 as u16 as u32;
    let y = y.clamp(-TILE_COORD_LIMIT, TILE_COORD_LIMIT) as i16 as u16 as u32;
    (x << 16) | y
}

#[inline]
pub fn unpack_world_coord(packed: u32) -> (i32, i32) {
    ((packed >> 16) as u16 as i16 as i32, (packed & 0xFFFF) as u16 as i16 as i32)
}

/// Packs four 8-bit surface IDs, first ID in the lowest byte.
#[inline]
pub fn pack_surface_ids(ids: [u8; 4]) -> u32 {
    u32::from_le_bytes(ids)
}

#[inline]
pub fn unpack_surface_ids(packed: u32) -> [u8; 4] {
    packed.to_le_bytes()
}
