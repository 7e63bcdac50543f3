//! Entry points tying capture, the current writer, the version readers and
//! restore together.

use strata_voxel::{CHUNK_EDGE, ChunkHandle, ChunkPool, DefinitionRegistry};

use crate::capture::capture;
use crate::error::PersistError;
use crate::formats::reader_for;
use crate::restore::{RestoreReport, RestoreTarget, restore};
use crate::snapshot::{PlayerSnapshot, SceneObjectStore, WorldSnapshot};
use crate::writer::write_snapshot;

/// Versioned run-length codec for modified chunks.
///
/// Loading is two-phase: [`decode`](Self::decode) parses and validates the
/// whole buffer without touching any chunk, then [`restore`](Self::restore)
/// applies it. Header, version and truncation errors therefore never mutate
/// the pool.
#[derive(Clone, Copy, Debug)]
pub struct PersistenceCodec {
    chunk_edge: u8,
}

impl Default for PersistenceCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistenceCodec {
    /// Codec for the compiled-in chunk edge.
    pub fn new() -> Self {
        Self {
            chunk_edge: CHUNK_EDGE as u8,
        }
    }

    /// Codec that writes and expects a specific edge length.
    pub fn with_chunk_edge(chunk_edge: u8) -> Self {
        Self { chunk_edge }
    }

    /// Edge length written to, and required of, save buffers.
    pub fn chunk_edge(&self) -> u8 {
        self.chunk_edge
    }

    /// Builds a snapshot of every modified chunk.
    ///
    /// # Errors
    ///
    /// [`PersistError::CountOverflow`] if a name table is too large.
    pub fn capture(
        &self,
        pool: &ChunkPool,
        registry: &dyn DefinitionRegistry,
        player: PlayerSnapshot,
        scene: &dyn SceneObjectStore,
    ) -> Result<WorldSnapshot, PersistError> {
        capture(pool, registry, player, scene, self.chunk_edge)
    }

    /// Encodes every modified chunk in the current format.
    ///
    /// # Errors
    ///
    /// [`PersistError::CountOverflow`] if any table or list is too large.
    pub fn encode(
        &self,
        pool: &ChunkPool,
        registry: &dyn DefinitionRegistry,
        player: PlayerSnapshot,
        scene: &dyn SceneObjectStore,
    ) -> Result<Vec<u8>, PersistError> {
        let snapshot = self.capture(pool, registry, player, scene)?;
        let bytes = write_snapshot(&snapshot)?;
        tracing::info!(
            "Encoded {} chunks ({} runs) into {} bytes",
            snapshot.chunks.len(),
            snapshot.run_count(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Decodes a buffer of any supported version.
    ///
    /// # Errors
    ///
    /// - [`PersistError::Truncated`] for an empty or short buffer.
    /// - [`PersistError::UnsupportedVersion`] for an unknown version byte.
    /// - [`PersistError::ChunkEdgeMismatch`] if the save's edge differs.
    /// - [`PersistError::RunOutOfRange`] if a run does not fit its chunk.
    /// - [`PersistError::TrailingBytes`] if a current-format buffer has bytes after its end.
    pub fn decode(&self, bytes: &[u8]) -> Result<WorldSnapshot, PersistError> {
        let Some(&version) = bytes.first() else {
            return Err(PersistError::Truncated {
                offset: 0,
                needed: 1,
            });
        };
        let reader = reader_for(version).ok_or(PersistError::UnsupportedVersion(version))?;
        let snapshot = reader.read(bytes, self.chunk_edge).inspect_err(|e| {
            tracing::error!("Failed to decode version {} save: {}", version, e);
        })?;
        snapshot.validate()?;
        tracing::debug!(
            "Decoded version {} save: {} chunks, {} runs",
            version,
            snapshot.chunks.len(),
            snapshot.run_count()
        );
        Ok(snapshot)
    }

    /// Applies a decoded snapshot. See [`restore`](crate::restore::restore).
    ///
    /// # Errors
    ///
    /// [`PersistError::Pool`] if the pool cannot supply a write target.
    pub fn restore(
        &self,
        snapshot: &WorldSnapshot,
        target: RestoreTarget<'_>,
        touched: &mut Vec<ChunkHandle>,
    ) -> Result<RestoreReport, PersistError> {
        restore(snapshot, target, touched)
    }

    /// Re-encodes a buffer of any supported version as the current version.
    ///
    /// # Errors
    ///
    /// Any [`decode`](Self::decode) error.
    pub fn upgrade(&self, bytes: &[u8]) -> Result<Vec<u8>, PersistError> {
        let snapshot = self.decode(bytes)?;
        write_snapshot(&snapshot)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::CURRENT_VERSION;
    use crate::formats::tests::{full_snapshot, legacy_bytes};
    use crate::snapshot::{NoSceneObjects, SceneObject};
    use glam::{IVec3, Vec3};
    use strata_voxel::{
        ChunkEvent, ChunkEventBuffer, DefinitionTable, FlatTerrain, ItemDefinition, ItemTypeId,
        LightSource, NullObserver, PoolError, RenderType, Rgb8, SpawnedItem, VoxelDefinition,
        VoxelFlags, VoxelRecord, VoxelTypeId, WorldExtents,
    };

    struct Defs {
        table: DefinitionTable,
        stone: VoxelTypeId,
        lantern: VoxelTypeId,
        fire: VoxelTypeId,
        torch: ItemTypeId,
    }

    fn defs() -> Defs {
        let mut table = DefinitionTable::new();
        let stone = table.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let lantern = table
            .register_voxel(VoxelDefinition {
                render_type: RenderType::Custom,
                opaque: false,
                ..VoxelDefinition::solid("lantern")
            })
            .unwrap();
        let fire = table
            .register_voxel(VoxelDefinition {
                is_dynamic: true,
                ..VoxelDefinition::solid("fire")
            })
            .unwrap();
        let torch = table
            .register_item(ItemDefinition {
                name: "torch".to_string(),
                light_intensity: 14,
            })
            .unwrap();
        Defs {
            table,
            stone,
            lantern,
            fire,
            torch,
        }
    }

    fn terrain() -> FlatTerrain {
        FlatTerrain {
            surface_y: -64,
            fill: VoxelRecord::EMPTY,
        }
    }

    fn pool() -> ChunkPool {
        ChunkPool::new(32, WorldExtents::default())
    }

    fn write_target(pool: &mut ChunkPool, coord: IVec3) -> ChunkHandle {
        let handle = pool.get_or_create(coord, false, &terrain()).unwrap();
        pool.get_mut(handle).unwrap().set_modified(true);
        handle
    }

    fn load(
        codec: &PersistenceCodec,
        bytes: &[u8],
        pool: &mut ChunkPool,
        registry: &DefinitionTable,
        observer: &mut dyn strata_voxel::ChunkObserver,
    ) -> Result<RestoreReport, PersistError> {
        let snapshot = codec.decode(bytes)?;
        let mut touched = Vec::new();
        codec.restore(
            &snapshot,
            RestoreTarget {
                pool,
                registry,
                generator: &terrain(),
                observer,
                scene: &mut NoSceneObjects,
            },
            &mut touched,
        )
    }

    #[test]
    fn test_adjacent_identical_ranges_encode_as_one_run() {
        let d = defs();
        let mut pool = pool();
        let handle = write_target(&mut pool, IVec3::ZERO);
        let red = VoxelRecord::new(d.stone, Rgb8::new(255, 0, 0));
        let chunk = pool.get_mut(handle).unwrap();
        chunk.voxels_mut()[0..100].fill(red);
        chunk.voxels_mut()[100..200].fill(red);

        let codec = PersistenceCodec::new();
        let bytes = codec
            .encode(&pool, &d.table, PlayerSnapshot::default(), &NoSceneObjects)
            .unwrap();
        let snapshot = codec.decode(&bytes).unwrap();
        assert_eq!(snapshot.chunks.len(), 1);
        assert_eq!(snapshot.chunks[0].runs.len(), 1);
        assert_eq!(snapshot.chunks[0].runs[0].repetitions, 200);
    }

    #[test]
    fn test_custom_rotation_survives_round_trip() {
        let d = defs();
        let mut pool = pool();
        let coord = IVec3::new(-2, 1, 3);
        let handle = write_target(&mut pool, coord);
        let rotation = Vec3::new(0.0, 37.5, -90.0);
        let chunk = pool.get_mut(handle).unwrap();
        chunk.set(777, VoxelRecord::new(d.lantern, Rgb8::WHITE));
        chunk.set_rotation(777, rotation);

        let codec = PersistenceCodec::new();
        let bytes = codec
            .encode(&pool, &d.table, PlayerSnapshot::default(), &NoSceneObjects)
            .unwrap();
        let snapshot = codec.decode(&bytes).unwrap();
        let runs = &snapshot.chunks[0].runs;
        assert_eq!(runs.len(), 1);
        assert_eq!((runs[0].start, runs[0].repetitions), (777, 1));

        let mut fresh = self::pool();
        load(&codec, &bytes, &mut fresh, &d.table, &mut NullObserver).unwrap();
        let restored = fresh.chunk_at(coord).unwrap();
        assert_eq!(restored.rotation(777), Some(rotation));
        assert_eq!(restored.get(777).type_id, d.lantern);
        assert!(!restored.get(776).has_content());
        assert!(!restored.get(778).has_content());
    }

    #[test]
    fn test_edge_mismatch_is_fatal_and_leaves_pool_untouched() {
        let d = defs();
        let mut source = pool();
        let handle = write_target(&mut source, IVec3::ZERO);
        source
            .get_mut(handle)
            .unwrap()
            .set(0, VoxelRecord::new(d.stone, Rgb8::WHITE));
        let bytes = PersistenceCodec::with_chunk_edge(32)
            .encode(&source, &d.table, PlayerSnapshot::default(), &NoSceneObjects)
            .unwrap();

        let mut target = pool();
        let existing = target.get_or_create(IVec3::ZERO, true, &terrain()).unwrap();
        let before = target.get(existing).unwrap().voxels().to_vec();

        let result = load(&PersistenceCodec::new(), &bytes, &mut target, &d.table, &mut NullObserver);
        assert!(matches!(
            result,
            Err(PersistError::ChunkEdgeMismatch { found: 32, expected: 16 })
        ));
        assert_eq!(target.live_count(), 1);
        let chunk = target.get(existing).unwrap();
        assert!(!chunk.is_modified());
        assert_eq!(chunk.voxels(), &before[..]);
    }

    #[test]
    fn test_round_trip_preserves_content_and_drops_dynamic() {
        let d = defs();
        let mut pool = pool();
        let coord = IVec3::new(4, -1, 0);
        let handle = write_target(&mut pool, coord);
        let mut flags = VoxelFlags::default();
        flags.set_rotation(3);
        flags.set_water_level(9);
        let chunk = pool.get_mut(handle).unwrap();
        chunk.set_above_surface(true);
        chunk.voxels_mut()[0..50].fill(VoxelRecord::new(d.stone, Rgb8::new(10, 20, 30)));
        chunk.voxels_mut()[50] = VoxelRecord::new(d.stone, Rgb8::WHITE).with_flags(flags);
        chunk.voxels_mut()[51..60].fill(VoxelRecord::new(d.fire, Rgb8::WHITE));
        chunk.add_light_source(LightSource {
            voxel_index: 50,
            normal: Vec3::NEG_Z,
            item: d.torch,
        });
        chunk.add_spawned_item(SpawnedItem {
            item: d.torch,
            position: Vec3::new(65.5, -10.0, 3.25),
            quantity: 4,
        });
        let original = pool.get(handle).unwrap().clone();

        let codec = PersistenceCodec::new();
        let bytes = codec
            .encode(&pool, &d.table, PlayerSnapshot::default(), &NoSceneObjects)
            .unwrap();

        let mut fresh = self::pool();
        let mut events = ChunkEventBuffer::new();
        let report = load(&codec, &bytes, &mut fresh, &d.table, &mut events).unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.clamped_voxels, 0);

        let restored = fresh.chunk_at(coord).unwrap();
        assert!(restored.is_modified());
        assert!(restored.is_populated());
        assert!(restored.is_above_surface());
        for index in 0..51 {
            assert_eq!(restored.get(index), original.get(index), "voxel {index}");
        }
        for index in 51..60 {
            assert!(!restored.get(index).has_content(), "dynamic voxel {index}");
        }
        assert_eq!(restored.light_sources(), original.light_sources());
        assert_eq!(restored.spawned_items(), original.spawned_items());

        let events: Vec<_> = events.read().cloned().collect();
        assert!(events.contains(&ChunkEvent::Modified(coord)));
        assert!(events.contains(&ChunkEvent::RefreshRequested(coord)));
        assert!(events.contains(&ChunkEvent::LightSourceAttached(coord, original.light_sources()[0])));
        assert!(events.contains(&ChunkEvent::ItemSpawned(coord, original.spawned_items()[0])));
    }

    #[test]
    fn test_empty_and_unknown_versions_are_rejected() {
        let codec = PersistenceCodec::new();
        assert!(matches!(codec.decode(&[]), Err(PersistError::Truncated { .. })));
        assert!(matches!(codec.decode(&[4, 0, 0]), Err(PersistError::UnsupportedVersion(4))));
        assert!(matches!(codec.decode(&[11]), Err(PersistError::UnsupportedVersion(11))));
    }

    #[test]
    fn test_out_of_range_run_rejected_at_decode() {
        let mut snapshot = full_snapshot();
        snapshot.chunks[0].runs[0].start = 4000;
        let bytes = write_snapshot(&snapshot).unwrap();
        assert!(matches!(
            PersistenceCodec::new().decode(&bytes),
            Err(PersistError::RunOutOfRange { chunk: 0, start: 4000, .. })
        ));
    }

    #[test]
    fn test_legacy_buffer_loads_into_pool() {
        let mut registry = DefinitionTable::new();
        let stone = registry.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let lantern = registry
            .register_voxel(VoxelDefinition {
                render_type: RenderType::Custom,
                ..VoxelDefinition::solid("lantern")
            })
            .unwrap();
        registry
            .register_item(ItemDefinition {
                name: "torch".to_string(),
                light_intensity: 14,
            })
            .unwrap();

        let bytes = legacy_bytes(7, &full_snapshot());
        let mut pool = pool();
        let report = load(&PersistenceCodec::new(), &bytes, &mut pool, &registry, &mut NullObserver)
            .unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.dropped_light_sources, 0);

        let chunk = pool.chunk_at(IVec3::new(1, 0, -2)).unwrap();
        assert_eq!(chunk.get(0).type_id, stone);
        assert_eq!(chunk.get(299).type_id, stone);
        assert!(!chunk.get(300).has_content());
        assert_eq!(chunk.get(400).type_id, lantern);
        // Version 7 predates custom rotations and flags survive as stored.
        assert_eq!(chunk.rotation(400), None);
        assert_eq!(chunk.get(0).flags.bits(), 0b0100_0001);
        assert_eq!(chunk.light_sources().len(), 1);
    }

    #[test]
    fn test_unknown_names_are_clamped_to_empty() {
        let mut registry = DefinitionTable::new();
        registry.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        // No "lantern" and no "torch".
        let bytes = write_snapshot(&full_snapshot()).unwrap();

        let mut pool = pool();
        let report = load(&PersistenceCodec::new(), &bytes, &mut pool, &registry, &mut NullObserver)
            .unwrap();
        assert_eq!(report.clamped_voxels, 1);
        assert_eq!(report.dropped_light_sources, 1);
        assert_eq!(report.dropped_items, 1);

        let chunk = pool.chunk_at(IVec3::new(1, 0, -2)).unwrap();
        assert!(!chunk.get(400).has_content());
        assert!(chunk
            .voxels()
            .iter()
            .all(|v| (v.type_id.0 as usize) < registry.voxel_count()));
    }

    #[test]
    fn test_exhausted_pool_reports_touched_chunks() {
        let d = defs();
        let mut source = pool();
        for x in 0..3 {
            let handle = write_target(&mut source, IVec3::new(x, 0, 0));
            source
                .get_mut(handle)
                .unwrap()
                .set(0, VoxelRecord::new(d.stone, Rgb8::WHITE));
        }
        let codec = PersistenceCodec::new();
        let bytes = codec
            .encode(&source, &d.table, PlayerSnapshot::default(), &NoSceneObjects)
            .unwrap();
        let snapshot = codec.decode(&bytes).unwrap();

        let mut small = ChunkPool::new(2, WorldExtents::default());
        let mut touched = Vec::new();
        let result = codec.restore(
            &snapshot,
            RestoreTarget {
                pool: &mut small,
                registry: &d.table,
                generator: &terrain(),
                observer: &mut NullObserver,
                scene: &mut NoSceneObjects,
            },
            &mut touched,
        );
        assert!(matches!(
            result,
            Err(PersistError::Pool(PoolError::Exhausted { max_chunks: 2 }))
        ));
        assert_eq!(touched.len(), 2);
    }

    #[test]
    fn test_scene_objects_reach_the_store() {
        struct Recorder(Vec<SceneObject>);
        impl SceneObjectStore for Recorder {
            fn tagged_objects(&self) -> Vec<SceneObject> {
                self.0.clone()
            }
            fn restore_object(&mut self, object: &SceneObject) {
                self.0.push(object.clone());
            }
        }

        let d = defs();
        let source = Recorder(full_snapshot().scene_objects);
        let player = PlayerSnapshot {
            position: Vec3::new(3.0, 70.0, -8.0),
            ..Default::default()
        };
        let codec = PersistenceCodec::new();
        let bytes = codec.encode(&pool(), &d.table, player, &source).unwrap();
        assert_eq!(bytes[0], CURRENT_VERSION);

        let snapshot = codec.decode(&bytes).unwrap();
        let mut sink = Recorder(Vec::new());
        let mut target = pool();
        let report = codec
            .restore(
                &snapshot,
                RestoreTarget {
                    pool: &mut target,
                    registry: &d.table,
                    generator: &terrain(),
                    observer: &mut NullObserver,
                    scene: &mut sink,
                },
                &mut Vec::new(),
            )
            .unwrap();
        assert_eq!(sink.0, source.0);
        assert_eq!(report.player, player);
    }

    #[test]
    fn test_upgrade_rewrites_legacy_as_current() {
        let bytes = legacy_bytes(9, &full_snapshot());
        let codec = PersistenceCodec::new();
        let upgraded = codec.upgrade(&bytes).unwrap();
        assert_eq!(&upgraded[..2], &[CURRENT_VERSION, 16]);
        let snapshot = codec.decode(&upgraded).unwrap();
        assert_eq!(snapshot.version, CURRENT_VERSION);
        assert_eq!(snapshot.chunks, full_snapshot().chunks);
    }
}
