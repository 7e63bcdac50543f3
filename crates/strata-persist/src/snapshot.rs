//! Decoded, registry-independent view of a save file.
//!
//! A [`WorldSnapshot`] refers to definitions only through its own name tables,
//! so it can be decoded, inspected, validated and re-encoded without touching
//! the live world. Definition indices inside records are indices into those
//! tables, exactly as stored on disk.

use std::collections::BTreeMap;

use glam::{IVec3, Vec3};
use strata_voxel::coords::origin_to_coord;
use strata_voxel::{CHUNK_VOLUME, Rgb8};

use crate::error::PersistError;

/// Player transform at save time. All zeros when there is no player.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerSnapshot {
    /// World position.
    pub position: Vec3,
    /// Body Euler rotation.
    pub body_rotation: Vec3,
    /// Camera local Euler rotation.
    pub camera_rotation: Vec3,
}

/// `repetitions` consecutive voxels starting at `start`, all identical.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelRun {
    /// Index into the snapshot's voxel name table.
    pub def_index: i16,
    /// Tint.
    pub color: Rgb8,
    /// First flat voxel index.
    pub start: i16,
    /// Run length.
    pub repetitions: i16,
    /// Raw flag byte.
    pub flags: u8,
    /// Euler rotation of a custom-render voxel.
    pub rotation: Option<Vec3>,
}

impl VoxelRun {
    /// Whether the run lies inside a chunk.
    pub fn in_range(&self) -> bool {
        self.start >= 0
            && self.repetitions > 0
            && self.start as usize + self.repetitions as usize <= CHUNK_VOLUME
    }
}

/// A light source as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSourceRecord {
    /// Flat index of the voxel the item is attached to.
    pub voxel_index: i16,
    /// Attachment normal.
    pub normal: Vec3,
    /// Index into the snapshot's item name table.
    pub item_index: i16,
}

/// A spawned item as stored on disk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedItemRecord {
    /// Index into the snapshot's item name table.
    pub item_index: i16,
    /// World position.
    pub position: Vec3,
    /// Stack size.
    pub quantity: i16,
}

/// One modified chunk.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    /// World-space voxel origin of the chunk.
    pub position: Vec3,
    /// Whether the chunk lies above the terrain surface.
    pub above_surface: bool,
    /// Non-empty voxels in flat-index order.
    pub runs: Vec<VoxelRun>,
    /// Attached light sources.
    pub light_sources: Vec<LightSourceRecord>,
    /// Items lying in the chunk.
    pub items: Vec<SpawnedItemRecord>,
}

impl ChunkRecord {
    /// Chunk coordinate of the record.
    pub fn coord(&self) -> IVec3 {
        origin_to_coord(self.position.round().as_ivec3())
    }
}

/// A tagged scene object and its opaque key/value state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneObject {
    /// Resource path the object is instantiated from.
    pub resource_path: String,
    /// Object name.
    pub name: String,
    /// World position.
    pub position: Vec3,
    /// Euler rotation.
    pub rotation: Vec3,
    /// Local scale.
    pub scale: Vec3,
    /// State produced by the object's save callback.
    pub properties: BTreeMap<String, String>,
}

/// Save/load callbacks for tagged scene objects.
pub trait SceneObjectStore {
    /// Collects every tagged object, each with its save-callback state.
    fn tagged_objects(&self) -> Vec<SceneObject>;

    /// Recreates an object and hands it its saved state.
    fn restore_object(&mut self, object: &SceneObject);
}

/// A store with no tagged objects; restored objects are discarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSceneObjects;

impl SceneObjectStore for NoSceneObjects {
    fn tagged_objects(&self) -> Vec<SceneObject> {
        Vec::new()
    }

    fn restore_object(&mut self, _object: &SceneObject) {}
}

/// Everything a save file holds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldSnapshot {
    /// Format version the snapshot was read from (or will be written as).
    pub version: u8,
    /// Chunk edge length the snapshot was produced with.
    pub chunk_edge: u8,
    /// Player transform.
    pub player: PlayerSnapshot,
    /// Voxel definition names referenced by the runs.
    pub voxel_names: Vec<String>,
    /// Item definition names referenced by light sources and items.
    pub item_names: Vec<String>,
    /// Modified chunks.
    pub chunks: Vec<ChunkRecord>,
    /// Tagged scene objects.
    pub scene_objects: Vec<SceneObject>,
}

impl WorldSnapshot {
    /// Total number of runs across all chunks.
    pub fn run_count(&self) -> usize {
        self.chunks.iter().map(|c| c.runs.len()).sum()
    }

    /// Total number of voxels covered by runs.
    pub fn voxel_count(&self) -> usize {
        self.chunks
            .iter()
            .flat_map(|c| c.runs.iter())
            .map(|r| r.repetitions.max(0) as usize)
            .sum()
    }

    /// Checks structural integrity that the restore step depends on.
    ///
    /// # Errors
    ///
    /// [`PersistError::RunOutOfRange`] for a run that does not fit its chunk.
    pub fn validate(&self) -> Result<(), PersistError> {
        for (index, chunk) in self.chunks.iter().enumerate() {
            if let Some(run) = chunk.runs.iter().find(|r| !r.in_range()) {
                return Err(PersistError::RunOutOfRange {
                    chunk: index,
                    start: run.start,
                    repetitions: run.repetitions,
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn run(start: i16, repetitions: i16) -> VoxelRun {
        VoxelRun {
            def_index: 0,
            color: Rgb8::WHITE,
            start,
            repetitions,
            flags: 0,
            rotation: None,
        }
    }

    fn record(runs: Vec<VoxelRun>) -> ChunkRecord {
        ChunkRecord {
            position: Vec3::new(-16.0, 0.0, 32.0),
            above_surface: false,
            runs,
            light_sources: Vec::new(),
            items: Vec::new(),
        }
    }

    #[test]
    fn test_record_coord_from_origin() {
        assert_eq!(record(Vec::new()).coord(), IVec3::new(-1, 0, 2));
    }

    #[test]
    fn test_validate_accepts_full_chunk_run() {
        let snapshot = WorldSnapshot {
            chunks: vec![record(vec![run(0, CHUNK_VOLUME as i16)])],
            ..Default::default()
        };
        assert!(snapshot.validate().is_ok());
        assert_eq!(snapshot.voxel_count(), CHUNK_VOLUME);
    }

    #[test]
    fn test_validate_rejects_overflowing_run() {
        let snapshot = WorldSnapshot {
            chunks: vec![record(vec![run(10, 5)]), record(vec![run(4090, 10)])],
            ..Default::default()
        };
        assert!(matches!(
            snapshot.validate(),
            Err(PersistError::RunOutOfRange { chunk: 1, start: 4090, repetitions: 10 })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_and_empty_runs() {
        for bad in [run(-1, 3), run(0, 0), run(0, -4)] {
            let snapshot = WorldSnapshot {
                chunks: vec![record(vec![bad])],
                ..Default::default()
            };
            assert!(snapshot.validate().is_err());
        }
    }
}
