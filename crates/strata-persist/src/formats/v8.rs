//! Version 8: adds the camera rotation, the above-surface flag and
//! per-run custom rotations.

use strata_voxel::Rgb8;

use super::{FormatReader, require_legacy_edge};
use crate::error::PersistError;
use crate::snapshot::{ChunkRecord, LightSourceRecord, PlayerSnapshot, VoxelRun, WorldSnapshot};
use crate::wire::ByteReader;

/// Position (12) + surface flag (1) + run count (2) + light count (2).
const MIN_CHUNK_SIZE: usize = 17;
const MIN_RUN_SIZE: usize = 11;
const LIGHT_SIZE: usize = 16;

pub(super) struct V8Reader;

impl FormatReader for V8Reader {
    fn version(&self) -> u8 {
        8
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

            chunks.push(ChunkRecord {
                position,
                above_surface,
                runs,
                light_sources,
                items: Vec::new(),
            });
        }

        Ok(WorldSnapshot {
            version,
            chunk_edge: running_edge,
            player,
            voxel_names,
            item_names,
            chunks,
            scene_objects: Vec::new(),
        })
    }
}
