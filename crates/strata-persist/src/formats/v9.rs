//! Version 9: adds spawned items per chunk and the tagged scene object
//! trailer. Last version without an explicit chunk edge.

use std::collections::BTreeMap;

use strata_voxel::Rgb8;

use super::{FormatReader, require_legacy_edge};
use crate::error::PersistError;
use crate::snapshot::{
    ChunkRecord, LightSourceRecord, PlayerSnapshot, SceneObject, SpawnedItemRecord, VoxelRun,
    WorldSnapshot,
};
use crate::wire::ByteReader;

/// Position, surface flag and three counts.
const MIN_CHUNK_SIZE: usize = 19;
const MIN_RUN_SIZE: usize = 11;
const LIGHT_SIZE: usize = 16;
const ITEM_SIZE: usize = 16;
/// Two empty strings, three vectors and a property count.
const MIN_OBJECT_SIZE: usize = 40;

pub(super) struct V9Reader;

impl FormatReader for V9Reader {
    fn version(&self) -> u8 {
        9
    }

    fn read(&self, bytes: &[u8], running_edge: u8) -> Result<WorldSnapshot, PersistError> {
        require_legacy_edge(running_edge)?;
        let mut r = ByteReader::new(bytes);
        let version = r.u8()?;

        let player = PlayerSnapshot {
            position: r.vec3()?,
            body_rotation: r.vec3()?,
            camera_rotation: r.vec3()?,
        };

        let voxel_count = r.count_i16()?;
        let mut voxel_names = Vec::with_capacity(r.capacity_hint(voxel_count, 1));
        for _ in 0..voxel_count {
            voxel_names.push(r.string()?);
        }
        let item_count = r.count_i16()?;
        let mut item_names = Vec::with_capacity(r.capacity_hint(item_count, 1));
        for _ in 0..item_count {
            item_names.push(r.string()?);
        }

        let chunk_count = r.count_i32()?;
        let mut chunks = Vec::with_capacity(r.capacity_hint(chunk_count, MIN_CHUNK_SIZE));
        for _ in 0..chunk_count {
            let position = r.vec3()?;
            let above_surface = r.bool()?;

            let run_count = r.count_i16()?;
            let mut runs = Vec::with_capacity(r.capacity_hint(run_count, MIN_RUN_SIZE));
            for _ in 0..run_count {
                let mut run = VoxelRun {
                    def_index: r.i16()?,
                    color: Rgb8::new(r.u8()?, r.u8()?, r.u8()?),
                    start: r.i16()?,
                    repetitions: r.i16()?,
                    flags: r.u8()?,
                    rotation: None,
                };
                if r.bool()? {
                    run.rotation = Some(r.vec3()?);
                }
                runs.push(run);
            }

            let light_count = r.count_i16()?;
            let mut light_sources = Vec::with_capacity(r.capacity_hint(light_count, LIGHT_SIZE));
            for _ in 0..light_count {
                light_sources.push(LightSourceRecord {
                    voxel_index: r.i16()?,
                    normal: r.vec3()?,
                    item_index: r.i16()?,
                });
            }

            let spawned_count = r.count_i16()?;
            let mut items = Vec::with_capacity(r.capacity_hint(spawned_count, ITEM_SIZE));
            for _ in 0..spawned_count {
                items.push(SpawnedItemRecord {
                    item_index: r.i16()?,
                    position: r.vec3()?,
                    quantity: r.i16()?,
                });
            }

            chunks.push(ChunkRecord {
                position,
                above_surface,
                runs,
                light_sources,
                items,
            });
        }

        let object_count = r.count_i16()?;
        let mut scene_objects = Vec::with_capacity(r.capacity_hint(object_count, MIN_OBJECT_SIZE));
        for _ in 0..object_count {
            let resource_path = r.string()?;
            let name = r.string()?;
            let position = r.vec3()?;
            let rotation = r.vec3()?;
            let scale = r.vec3()?;
            let property_count = r.count_i16()?;
            let mut properties = BTreeMap::new();
            for _ in 0..property_count {
                let key = r.string()?;
                properties.insert(key, r.string()?);
            }
            scene_objects.push(SceneObject {
                resource_path,
                name,
                position,
                rotation,
                scale,
                properties,
            });
        }

        Ok(WorldSnapshot {
            version,
            chunk_edge: running_edge,
            player,
            voxel_names,
            item_names,
            chunks,
            scene_objects,
        })
    }
}
