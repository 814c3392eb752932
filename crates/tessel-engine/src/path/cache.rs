use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::paint::Color;

use super::svg::{load_vector_image, VectorImage};
use super::tessellate::{tessellate, TessellateOptions};
use super::TessellatedMesh;

/// Tessellated vector artwork, ready to replay every frame.
///
/// Each mesh carries per-vertex fill colours from its source shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artwork {
    pub width: f32,
    pub height: f32,
    pub meshes: Vec<TessellatedMesh>,
}

impl Artwork {
    /// Tessellates every path of every shape. Paths that fail to triangulate
    /// are skipped with a warning; the rest of the artwork still renders.
    pub fn from_image(image: &VectorImage) -> Self {
        let mut meshes = Vec::with_capacity(image.path_count());
        for shape in &image.shapes {
            let options = TessellateOptions::with_color(shape.fill);
            for path in &shape.paths {
                match tessellate(path, &options) {
                    Ok(mesh) => meshes.push(mesh),
                    Err(err) => log::warn!("skipping vector path ({} vertices): {err}", path.len()),
                }
            }
        }
        Self { width: image.width, height: image.height, meshes }
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(TessellatedMesh::triangle_count).sum()
    }

    /// Concatenates all meshes into one coloured mesh, e.g. for instanced upload.
    ///
    /// Returns `None` when the combined vertex count does not fit `u16` indices.
    pub fn merged_mesh(&self) -> Option<TessellatedMesh> {
        let total: usize = self.meshes.iter().map(TessellatedMesh::vertex_count).sum();
        if total > u16::MAX as usize + 1 {
            return None;
        }

        let mut merged = TessellatedMesh {
            positions: Vec::with_capacity(total),
            indices: Vec::with_capacity(self.meshes.iter().map(|m| m.indices.len()).sum()),
            colors: Some(Vec::with_capacity(total)),
        };
        for mesh in &self.meshes {
            let base = merged.positions.len() as u16;
            merged.positions.extend_from_slice(&mesh.positions);
            merged.indices.extend(mesh.indices.iter().map(|&i| base + i));
            if let Some(colors) = merged.colors.as_mut() {
                colors.extend((0..mesh.vertex_count()).map(|i| mesh.color_at(i, Color::WHITE)));
            }
        }
        Some(merged)
    }
}

/// Owner-held cache of tessellated artwork keyed by `(path, tolerance)`.
///
/// Nothing is global: whoever renders icons owns the cache and decides when
/// to clear it.
#[derive(Debug, Default)]
pub struct ArtworkCache {
    entries: HashMap<(PathBuf, u32), Arc<Artwork>>,
}

impl ArtworkCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached artwork, loading and tessellating it on first use.
    ///
    /// Load failures are not cached; a later call retries the file.
    pub fn get_or_load(&mut self, path: &Path, tolerance: f32) -> Result<Arc<Artwork>> {
        let key = (path.to_path_buf(), tolerance.to_bits());
        if let Some(art) = self.entries.get(&key) {
            return Ok(Arc::clone(art));
        }

        let image = load_vector_image(path, tolerance)?;
        let art = Arc::new(Artwork::from_image(&image));
        log::debug!(
            "cached artwork {} @ {tolerance}: {} meshes, {} triangles",
            path.display(),
            art.meshes.len(),
            art.triangle_count()
        );
        self.entries.insert(key, Arc::clone(&art));
        Ok(art)
    }

    /// Inserts artwork built elsewhere (e.g. from embedded bytes) under `(path, tolerance)`.
    pub fn insert(&mut self, path: &Path, tolerance: f32, art: Artwork) -> Arc<Artwork> {
        let art = Arc::new(art);
        self.entries.insert((path.to_path_buf(), tolerance.to_bits()), Arc::clone(&art));
        art
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
