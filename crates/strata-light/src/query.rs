//! Read-only light lookups over the chunk pool.
//!
//! Stored light is a 0–15 level per voxel. A solid voxel's own level is
//! usually 0, so a query on one borrows the level of the first open
//! neighbour. Positions in chunks that do not exist yet are estimated from
//! the terrain surface height; a query never creates or populates a chunk.

use glam::{IVec3, Vec3};
use strata_voxel::coords::{resolve, voxel_containing};
use strata_voxel::{
    Chunk, ChunkHandle, ChunkPool, DefinitionRegistry, Face, MAX_LIGHT, TerrainGenerator,
};

/// Neighbour probe order for solid voxels.
const PROBE_ORDER: [Face; 5] = [Face::PosY, Face::NegZ, Face::NegX, Face::PosZ, Face::PosX];

/// Point light queries against a borrowed pool.
pub struct LightQuery<'a> {
    pool: &'a ChunkPool,
    registry: &'a dyn DefinitionRegistry,
    generator: &'a dyn TerrainGenerator,
    global_illumination: bool,
}

impl<'a> LightQuery<'a> {
    /// Creates a query with global illumination enabled.
    pub fn new(
        pool: &'a ChunkPool,
        registry: &'a dyn DefinitionRegistry,
        generator: &'a dyn TerrainGenerator,
    ) -> Self {
        Self {
            pool,
            registry,
            generator,
            global_illumination: true,
        }
    }

    /// Enables or disables global illumination. Disabled means fully lit.
    pub fn with_global_illumination(mut self, enabled: bool) -> Self {
        self.global_illumination = enabled;
        self
    }

    /// Light at a continuous world position, in `[0, 1]`.
    pub fn get_light(&self, position: Vec3) -> f32 {
        self.light_at(voxel_containing(position))
    }

    /// Light of a world voxel, in `[0, 1]`.
    pub fn light_at(&self, world: IVec3) -> f32 {
        if !self.global_illumination {
            return 1.0;
        }

        let (coord, index) = resolve(world);
        let Some((handle, chunk)) = self.loaded(coord) else {
            return self.estimate(world);
        };

        let voxel = chunk.get(index);
        let emits = self.registry.light_intensity(voxel.type_id) > 0
            || chunk.has_light_source_at(index);
        if emits || !self.registry.is_opaque(voxel.type_id) {
            return normalize(voxel.light());
        }

        for face in PROBE_ORDER {
            if let Some(level) = self.open_neighbor_light(handle, chunk, world, face) {
                return normalize(level);
            }
        }
        normalize(voxel.light())
    }

    /// Light of the voxel adjacent to `world` across `face`, in `[0, 1]`.
    pub fn neighbor_light(&self, world: IVec3, face: Face) -> f32 {
        self.light_at(world + face.offset())
    }

    /// Raw stored level of a world voxel, if its chunk is loaded.
    pub fn stored_level(&self, world: IVec3) -> Option<u8> {
        let (coord, index) = resolve(world);
        self.loaded(coord).map(|(_, chunk)| chunk.get(index).light())
    }

    /// A live, populated chunk.
    fn loaded(&self, coord: IVec3) -> Option<(ChunkHandle, &'a Chunk)> {
        let handle = self.pool.get_existing(coord)?;
        let chunk = self.pool.get(handle)?;
        chunk.is_populated().then_some((handle, chunk))
    }

    /// Stored level of the neighbour across `face`, if that voxel is loaded
    /// and does not block light.
    fn open_neighbor_light(
        &self,
        handle: ChunkHandle,
        chunk: &'a Chunk,
        world: IVec3,
        face: Face,
    ) -> Option<u8> {
        let (coord, index) = resolve(world + face.offset());
        let neighbor = if coord == chunk.coord() {
            chunk
        } else {
            let other = self.pool.peek_neighbor(handle, face)?;
            let other = self.pool.get(other)?;
            if !other.is_populated() {
                return None;
            }
            other
        };
        let voxel = neighbor.get(index);
        (!self.registry.is_opaque(voxel.type_id)).then(|| voxel.light())
    }

    /// Fully dark below the terrain surface, fully lit at or above it.
    fn estimate(&self, world: IVec3) -> f32 {
        if world.y < self.generator.surface_height(world.x, world.z) {
            0.0
        } else {
            1.0
        }
    }
}

fn normalize(level: u8) -> f32 {
    f32::from(level.min(MAX_LIGHT)) / f32::from(MAX_LIGHT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
