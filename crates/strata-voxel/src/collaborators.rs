//! Interfaces to the systems around the chunk store.
//!
//! Terrain generation and the mesh/light refresh pipeline live outside this
//! workspace. The store only calls them through these traits.

use glam::IVec3;

use crate::chunk::{Chunk, LightSource, SpawnedItem};
use crate::coords::{CHUNK_EDGE, CHUNK_EDGE_I32, flat_index};
use crate::voxel::VoxelRecord;

/// Fills chunks with generated terrain.
///
/// Implementations must be `Send + Sync` so population can run on a worker
/// thread over chunks that are not yet published.
pub trait TerrainGenerator: Send + Sync {
    /// Fills the voxel array of a freshly reset chunk.
    fn populate(&self, chunk: &mut Chunk);

    /// Restores a chunk's original generated contents, discarding edits
    /// along with their light sources, items and rotations.
    fn paint_chunk(&self, chunk: &mut Chunk) {
        chunk.voxels_mut().fill(VoxelRecord::EMPTY);
        chunk.clear_attachments();
        self.populate(chunk);
    }

    /// Estimated world-space Y of the terrain surface in column `(x, z)`.
    fn surface_height(&self, x: i32, z: i32) -> i32;
}

/// Notifications emitted whenever the store changes chunk content.
///
/// All methods default to no-ops.
pub trait ChunkObserver {
    /// Gameplay or a loader changed the chunk's persistent content.
    fn chunk_modified(&mut self, _coord: IVec3) {}

    /// Mesh and light for the chunk should be rebuilt.
    fn refresh_requested(&mut self, _coord: IVec3) {}

    /// A light source was reattached by a loader.
    fn light_source_attached(&mut self, _coord: IVec3, _source: &LightSource) {}

    /// An item was respawned by a loader.
    fn item_spawned(&mut self, _coord: IVec3, _item: &SpawnedItem) {}
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl ChunkObserver for NullObserver {}

/// Generator producing a flat world: one voxel type at and below `surface_y`.
#[derive(Clone, Copy, Debug)]
pub struct FlatTerrain {
    /// Highest filled world Y.
    pub surface_y: i32,
    /// Voxel used below the surface.
    pub fill: VoxelRecord,
}

impl TerrainGenerator for FlatTerrain {
    fn populate(&self, chunk: &mut Chunk) {
        let origin = chunk.position();
        let top = chunk.position().y + CHUNK_EDGE_I32 - 1;
        chunk.set_above_surface(origin.y > self.surface_y);
        if origin.y > self.surface_y {
            return;
        }
        let filled_rows = (self.surface_y.min(top) - origin.y + 1) as usize;
        let voxels = chunk.voxels_mut();
        for y in 0..filled_rows.min(CHUNK_EDGE) {
            for z in 0..CHUNK_EDGE {
                for x in 0..CHUNK_EDGE {
                    voxels[flat_index(x, y, z)] = self.fill;
                }
            }
        }
    }

    fn surface_height(&self, _x: i32, _z: i32) -> i32 {
        self.surface_y
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::VoxelTypeId;
    use crate::voxel::Rgb8;

    fn flat(surface_y: i32) -> FlatTerrain {
        FlatTerrain {
            surface_y,
            fill: VoxelRecord::new(VoxelTypeId(1), Rgb8::WHITE),
        }
    }

    #[test]
    fn test_flat_terrain_fills_up_to_surface() {
        let mut chunk = Chunk::new(IVec3::ZERO);
        flat(3).populate(&mut chunk);
        assert!(chunk.get_local(0, 3, 0).has_content());
        assert!(!chunk.get_local(0, 4, 0).has_content());
        assert!(!chunk.is_above_surface());
    }

    #[test]
    fn test_flat_terrain_above_surface_is_empty() {
        let mut chunk = Chunk::new(IVec3::new(0, 1, 0));
        flat(3).populate(&mut chunk);
        assert!(chunk.voxels().iter().all(|v| !v.has_content()));
        assert!(chunk.is_above_surface());
    }

    #[test]
    fn test_flat_terrain_below_surface_is_full() {
        let mut chunk = Chunk::new(IVec3::new(0, -2, 0));
        flat(3).populate(&mut chunk);
        assert!(chunk.voxels().iter().all(|v| v.has_content()));
    }

    #[test]
    fn test_paint_chunk_discards_edits() {
        let generator = flat(3);
        let mut chunk = Chunk::new(IVec3::ZERO);
        generator.populate(&mut chunk);
        chunk.set(flat_index(0, 10, 0), VoxelRecord::new(VoxelTypeId(2), Rgb8::WHITE));
        chunk.set_rotation(flat_index(0, 10, 0), glam::Vec3::Y);
        chunk.add_light_source(LightSource {
            voxel_index: flat_index(0, 10, 0) as u16,
            normal: glam::Vec3::Y,
            item: crate::registry::ItemTypeId(0),
        });
        generator.paint_chunk(&mut chunk);
        assert!(!chunk.get_local(0, 10, 0).has_content());
        assert!(chunk.get_local(0, 0, 0).has_content());
        assert!(chunk.light_sources().is_empty());
        assert_eq!(chunk.rotation(flat_index(0, 10, 0)), None);
    }
}
