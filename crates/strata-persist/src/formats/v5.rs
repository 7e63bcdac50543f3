//! Version 5: player transform, voxel name table, chunk runs without flags.

use strata_voxel::Rgb8;

use super::{FormatReader, require_legacy_edge};
use crate::error::PersistError;
use crate::snapshot::{ChunkRecord, PlayerSnapshot, VoxelRun, WorldSnapshot};
use crate::wire::ByteReader;

/// Position (12) + run count (2).
const MIN_CHUNK_SIZE: usize = 14;
/// Definition, rgb, start, repetitions.
const RUN_SIZE: usize = 9;

pub(super) struct V5Reader;

impl FormatReader for V5Reader {
    fn version(&self) -> u8 {
        5
    }

    fn read(&self, bytes: &[u8], running_edge: u8) -> Result<WorldSnapshot, PersistError> {
        require_legacy_edge(running_edge)?;
        let mut r = ByteReader::new(bytes);
        let version = r.u8()?;

        let player = PlayerSnapshot {
            position: r.vec3()?,
            body_rotation: r.vec3()?,
            ..Default::default()
        };

        let name_count = r.count_i16()?;
        let mut voxel_names = Vec::with_capacity(r.capacity_hint(name_count, 1));
        for _ in 0..name_count {
            voxel_names.push(r.string()?);
        }

        let chunk_count = r.count_i32()?;
        let mut chunks = Vec::with_capacity(r.capacity_hint(chunk_count, MIN_CHUNK_SIZE));
        for _ in 0..chunk_count {
            let position = r.vec3()?;
            let run_count = r.count_i16()?;
            let mut runs = Vec::with_capacity(r.capacity_hint(run_count, RUN_SIZE));
            for _ in 0..run_count {
                runs.push(VoxelRun {
                    def_index: r.i16()?,
                    color: Rgb8::new(r.u8()?, r.u8()?, r.u8()?),
                    start: r.i16()?,
                    repetitions: r.i16()?,
                    flags: 0,
                    rotation: None,
                });
            }
            chunks.push(ChunkRecord {
                position,
                above_surface: false,
                runs,
                light_sources: Vec::new(),
                items: Vec::new(),
            });
        }

        Ok(WorldSnapshot {
            version,
            chunk_edge: running_edge,
            player,
            voxel_names,
            item_names: Vec::new(),
            chunks,
            scene_objects: Vec::new(),
        })
    }
}
