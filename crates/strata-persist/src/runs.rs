//! Run-length coding of a chunk's voxel array.
//!
//! Runs walk voxels in flat-index (Y-major) order. Consecutive standard
//! voxels with the same definition, tint and flags merge into one run; light
//! is derived state and does not break a run. Empty and dynamic voxels are
//! never emitted, and custom-render voxels always get a run of their own
//! because each carries an independent rotation.

use strata_voxel::{
    CHUNK_VOLUME, Chunk, VoxelFlags, VoxelKind, VoxelRecord, VoxelTypeId,
};

use crate::error::PersistError;
use crate::snapshot::VoxelRun;

/// Encodes a chunk's voxels.
///
/// `kinds[i]` classifies runtime definition `i`; indices past the end are
/// treated as [`VoxelKind::Dynamic`]. `table_index` maps a runtime
/// definition to its index in the file's name table, assigning new indices
/// on first use.
pub fn encode_runs(
    chunk: &Chunk,
    kinds: &[VoxelKind],
    mut table_index: impl FnMut(VoxelTypeId) -> Result<i16, PersistError>,
) -> Result<Vec<VoxelRun>, PersistError> {
    let mut runs = Vec::new();
    // Open run and the voxel it repeats.
    let mut open: Option<(VoxelRun, VoxelRecord)> = None;

    for (index, voxel) in chunk.voxels().iter().enumerate() {
        let kind = if voxel.has_content() {
            kinds
                .get(voxel.type_id.0 as usize)
                .copied()
                .unwrap_or(VoxelKind::Dynamic)
        } else {
            VoxelKind::Dynamic
        };

        if kind == VoxelKind::Standard
            && let Some((run, prev)) = open.as_mut()
            && prev.same_content(voxel)
            && run.repetitions < i16::MAX
        {
            run.repetitions += 1;
            continue;
        }

        if let Some((run, _)) = open.take() {
            runs.push(run);
        }

        match kind {
            VoxelKind::Dynamic => {}
            VoxelKind::Standard => {
                let run = new_run(voxel, index, table_index(voxel.type_id)?, None);
                open = Some((run, *voxel));
            }
            VoxelKind::Custom => {
                let rotation = chunk.rotation(index);
                runs.push(new_run(voxel, index, table_index(voxel.type_id)?, rotation));
            }
        }
    }

    if let Some((run, _)) = open {
        runs.push(run);
    }
    Ok(runs)
}

fn new_run(voxel: &VoxelRecord, index: usize, def_index: i16, rotation: Option<glam::Vec3>) -> VoxelRun {
    VoxelRun {
        def_index,
        color: voxel.color,
        start: index as i16,
        repetitions: 1,
        flags: voxel.flags.bits(),
        rotation,
    }
}

/// Writes runs into a chunk whose voxels are all empty.
///
/// `resolved[i]` is the runtime definition for file table index `i`. Runs
/// whose index is outside the table, or resolves to nothing, become empty
/// voxels. Returns how many voxels were clamped that way. Runs must already
/// be range-checked (see [`WorldSnapshot::validate`](crate::WorldSnapshot::validate)).
pub fn expand_runs(runs: &[VoxelRun], resolved: &[VoxelTypeId], chunk: &mut Chunk) -> usize {
    let mut clamped = 0;
    for run in runs {
        let start = run.start as usize;
        let end = (start + run.repetitions as usize).min(CHUNK_VOLUME);
        let type_id = usize::try_from(run.def_index)
            .ok()
            .and_then(|i| resolved.get(i).copied())
            .unwrap_or(VoxelTypeId::EMPTY);

        if type_id == VoxelTypeId::EMPTY {
            clamped += end - start;
            continue;
        }

        let voxel = VoxelRecord::new(type_id, run.color).with_flags(VoxelFlags(run.flags));
        chunk.voxels_mut()[start..end].fill(voxel);
        if let Some(rotation) = run.rotation {
            chunk.set_rotation(start, rotation);
        }
    }
    clamped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
