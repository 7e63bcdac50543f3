//! Builds a [`WorldSnapshot`] from the modified chunks of a live pool.

use rustc_hash::FxHashMap;
use strata_voxel::{ChunkPool, DefinitionRegistry, ItemTypeId, VoxelKind, VoxelTypeId};

use crate::error::PersistError;
use crate::formats::CURRENT_VERSION;
use crate::runs::encode_runs;
use crate::snapshot::{
    ChunkRecord, LightSourceRecord, PlayerSnapshot, SceneObjectStore, SpawnedItemRecord,
    WorldSnapshot,
};

/// Dense file-local index over the definitions a save actually references.
struct NameTable {
    what: &'static str,
    indices: FxHashMap<u16, i16>,
    names: Vec<String>,
}

impl NameTable {
    fn new(what: &'static str) -> Self {
        Self {
            what,
            indices: FxHashMap::default(),
            names: Vec::new(),
        }
    }

    /// File index for a runtime id, assigning the next one on first use.
    fn index_of(&mut self, id: u16, name: &str) -> Result<i16, PersistError> {
        if let Some(&index) = self.indices.get(&id) {
            return Ok(index);
        }
        let index = i16::try_from(self.names.len()).map_err(|_| PersistError::CountOverflow {
            what: self.what,
            count: self.names.len() + 1,
        })?;
        self.indices.insert(id, index);
        self.names.push(name.to_string());
        Ok(index)
    }
}

/// Captures every modified chunk, sorted by chunk coordinate, together with
/// the player transform and the tagged scene objects.
///
/// Light is not captured. Light sources and spawned items whose item has no
/// registered name are dropped with a warning.
///
/// # Errors
///
/// [`PersistError::CountOverflow`] if a name table outgrows its `i16` index.
pub fn capture(
    pool: &ChunkPool,
    registry: &dyn DefinitionRegistry,
    player: PlayerSnapshot,
    scene: &dyn SceneObjectStore,
    chunk_edge: u8,
) -> Result<WorldSnapshot, PersistError> {
    let kinds: Vec<VoxelKind> = (0..registry.voxel_count())
        .map(|i| registry.voxel_kind(VoxelTypeId(i as u16)))
        .collect();

    let mut voxel_table = NameTable::new("voxel names");
    let mut item_table = NameTable::new("item names");

    let mut modified: Vec<_> = pool
        .iter()
        .filter(|(_, chunk)| chunk.is_modified())
        .map(|(_, chunk)| chunk)
        .collect();
    modified.sort_by_key(|chunk| {
        let c = chunk.coord();
        (c.x, c.y, c.z)
    });

    let mut item_index = |id: ItemTypeId| -> Result<Option<i16>, PersistError> {
        match registry.item_name(id) {
            Some(name) => item_table.index_of(id.0, name).map(Some),
            None => Ok(None),
        }
    };

    let mut chunks = Vec::with_capacity(modified.len());
    for chunk in modified {
        let runs = encode_runs(chunk, &kinds, |id| {
            // `kinds` only marks registered ids as saveable, so a name exists.
            let name = registry.voxel_name(id).unwrap_or_default();
            voxel_table.index_of(id.0, name)
        })?;

        let mut light_sources = Vec::with_capacity(chunk.light_sources().len());
        for light in chunk.light_sources() {
            match item_index(light.item)? {
                Some(index) => light_sources.push(LightSourceRecord {
                    voxel_index: light.voxel_index as i16,
                    normal: light.normal,
                    item_index: index,
                }),
                None => tracing::warn!(
                    "Dropping light source with unknown item {} in chunk {}",
                    light.item.0,
                    chunk.coord()
                ),
            }
        }

        let mut items = Vec::with_capacity(chunk.spawned_items().len());
        for item in chunk.spawned_items() {
            match item_index(item.item)? {
                Some(index) => items.push(SpawnedItemRecord {
                    item_index: index,
                    position: item.position,
                    quantity: item.quantity,
                }),
                None => tracing::warn!(
                    "Dropping spawned item with unknown item {} in chunk {}",
                    item.item.0,
                    chunk.coord()
                ),
            }
        }

        chunks.push(ChunkRecord {
            position: chunk.position().as_vec3(),
            above_surface: chunk.is_above_surface(),
            runs,
            light_sources,
            items,
        });
    }

    Ok(WorldSnapshot {
        version: CURRENT_VERSION,
        chunk_edge,
        player,
        voxel_names: voxel_table.names,
        item_names: item_table.names,
        chunks,
        scene_objects: scene.tagged_objects(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::NoSceneObjects;
    use glam::{IVec3, Vec3};
    use strata_voxel::{
        DefinitionTable, FlatTerrain, ItemDefinition, LightSource, Rgb8, SpawnedItem,
        VoxelDefinition, VoxelRecord, WorldExtents,
    };

    struct Fixture {
        pool: ChunkPool,
        registry: DefinitionTable,
        dirt: VoxelTypeId,
        stone: VoxelTypeId,
        torch: ItemTypeId,
    }

    fn fixture() -> Fixture {
        let mut registry = DefinitionTable::new();
        let dirt = registry.register_voxel(VoxelDefinition::solid("dirt")).unwrap();
        let stone = registry.register_voxel(VoxelDefinition::solid("stone")).unwrap();
        let torch = registry
            .register_item(ItemDefinition {
                name: "torch".to_string(),
                light_intensity: 14,
            })
            .unwrap();
        Fixture {
            pool: ChunkPool::new(16, WorldExtents::default()),
            registry,
            dirt,
            stone,
            torch,
        }
    }

    fn terrain() -> FlatTerrain {
        FlatTerrain {
            surface_y: -64,
            fill: VoxelRecord::EMPTY,
        }
    }

    fn edit(f: &mut Fixture, coord: IVec3, index: usize, id: VoxelTypeId) {
        let handle = f
            .pool
            .get_or_create(coord, false, &terrain())
            .unwrap();
        f.pool
            .get_mut(handle)
            .unwrap()
            .set(index, VoxelRecord::new(id, Rgb8::WHITE));
    }

    #[test]
    fn test_only_modified_chunks_are_captured() {
        let mut f = fixture();
        let stone = f.stone;
        f.pool
            .get_or_create(IVec3::new(5, 0, 0), true, &terrain())
            .unwrap();
        edit(&mut f, IVec3::ZERO, 0, stone);

        let snapshot = capture(&f.pool, &f.registry, PlayerSnapshot::default(), &NoSceneObjects, 16)
            .unwrap();
        assert_eq!(snapshot.chunks.len(), 1);
        assert_eq!(snapshot.chunks[0].position, Vec3::ZERO);
    }

    #[test]
    fn test_name_table_holds_referenced_definitions_only() {
        let mut f = fixture();
        let stone = f.stone;
        edit(&mut f, IVec3::ZERO, 0, stone);

        let snapshot = capture(&f.pool, &f.registry, PlayerSnapshot::default(), &NoSceneObjects, 16)
            .unwrap();
        assert_eq!(snapshot.voxel_names, vec!["stone".to_string()]);
        assert_eq!(snapshot.chunks[0].runs[0].def_index, 0);
        assert!(snapshot.item_names.is_empty());
    }

    #[test]
    fn test_chunks_sorted_by_coordinate() {
        let mut f = fixture();
        let (stone, dirt) = (f.stone, f.dirt);
        edit(&mut f, IVec3::new(2, 0, 0), 0, stone);
        edit(&mut f, IVec3::new(-1, 3, 0), 0, dirt);
        edit(&mut f, IVec3::new(-1, 0, 7), 0, stone);

        let snapshot = capture(&f.pool, &f.registry, PlayerSnapshot::default(), &NoSceneObjects, 16)
            .unwrap();
        let coords: Vec<IVec3> = snapshot.chunks.iter().map(|c| c.coord()).collect();
        assert_eq!(
            coords,
            vec![IVec3::new(-1, 0, 7), IVec3::new(-1, 3, 0), IVec3::new(2, 0, 0)]
        );
    }

    #[test]
    fn test_unknown_items_are_dropped() {
        let mut f = fixture();
        let (stone, torch) = (f.stone, f.torch);
        edit(&mut f, IVec3::ZERO, 3, stone);
        let chunk = f.pool.chunk_at_mut(IVec3::ZERO).unwrap();
        chunk.add_light_source(LightSource {
            voxel_index: 3,
            normal: Vec3::Y,
            item: torch,
        });
        chunk.add_light_source(LightSource {
            voxel_index: 3,
            normal: Vec3::X,
            item: ItemTypeId(99),
        });
        chunk.add_spawned_item(SpawnedItem {
            item: ItemTypeId(77),
            position: Vec3::ONE,
            quantity: 1,
        });

        let snapshot = capture(&f.pool, &f.registry, PlayerSnapshot::default(), &NoSceneObjects, 16)
            .unwrap();
        let record = &snapshot.chunks[0];
        assert_eq!(record.light_sources.len(), 1);
        assert_eq!(record.light_sources[0].item_index, 0);
        assert!(record.items.is_empty());
        assert_eq!(snapshot.item_names, vec!["torch".to_string()]);
    }
}
