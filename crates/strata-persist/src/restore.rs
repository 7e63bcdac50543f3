//! Applies a decoded [`WorldSnapshot`] to a live pool.
//!
//! Each chunk record gets an unpopulated write target from the pool, which is
//! reset, filled from its runs and marked modified, populated and fully
//! dirty. Names are resolved against the live registry; anything that no
//! longer resolves becomes empty instead of failing the load.

use strata_voxel::{
    ALL_DIRTY, CHUNK_VOLUME, ChunkHandle, ChunkObserver, ChunkPool, DefinitionRegistry,
    ItemTypeId, LightSource, PoolError, SpawnedItem, TerrainGenerator, VoxelRecord, VoxelTypeId,
};

use crate::error::PersistError;
use crate::runs::expand_runs;
use crate::snapshot::{PlayerSnapshot, SceneObjectStore, WorldSnapshot};

/// Summary of an applied snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RestoreReport {
    /// Chunks written.
    pub chunks: usize,
    /// Voxels written from runs.
    pub voxels: usize,
    /// Voxels cleared because their definition no longer resolves.
    pub clamped_voxels: usize,
    /// Light sources dropped for a bad index or unknown item.
    pub dropped_light_sources: usize,
    /// Spawned items dropped for an unknown item.
    pub dropped_items: usize,
    /// Scene objects handed to the store.
    pub scene_objects: usize,
    /// Player transform stored in the snapshot.
    pub player: PlayerSnapshot,
}

/// Collaborators a restore writes through.
pub struct RestoreTarget<'a> {
    /// Chunk storage receiving the voxels.
    pub pool: &'a mut ChunkPool,
    /// Live definitions names are resolved against.
    pub registry: &'a dyn DefinitionRegistry,
    /// Passed to the pool when a write target is created.
    pub generator: &'a dyn TerrainGenerator,
    /// Notified for every restored chunk and attachment.
    pub observer: &'a mut dyn ChunkObserver,
    /// Receives tagged scene objects.
    pub scene: &'a mut dyn SceneObjectStore,
}

/// Writes a validated snapshot into the pool.
///
/// Every chunk handle written to is appended to `touched`, even when the
/// restore fails part-way, so a caller can roll those chunks back. All
/// touched chunks are pinned while the restore runs and unpinned before
/// returning on every path.
///
/// # Errors
///
/// [`PersistError::Pool`] if the pool cannot supply a write target.
pub fn restore(
    snapshot: &WorldSnapshot,
    target: RestoreTarget<'_>,
    touched: &mut Vec<ChunkHandle>,
) -> Result<RestoreReport, PersistError> {
    let first_touched = touched.len();
    let RestoreTarget {
        pool,
        registry,
        generator,
        observer,
        scene,
    } = target;

    let result = restore_chunks(snapshot, pool, registry, generator, observer, touched);
    for &handle in &touched[first_touched..] {
        pool.unpin(handle);
    }
    let mut report = result?;

    for object in &snapshot.scene_objects {
        scene.restore_object(object);
    }
    report.scene_objects = snapshot.scene_objects.len();
    report.player = snapshot.player;

    tracing::info!(
        "Restored {} chunks ({} voxels, {} clamped), {} scene objects",
        report.chunks,
        report.voxels,
        report.clamped_voxels,
        report.scene_objects
    );
    Ok(report)
}

fn restore_chunks(
    snapshot: &WorldSnapshot,
    pool: &mut ChunkPool,
    registry: &dyn DefinitionRegistry,
    generator: &dyn TerrainGenerator,
    observer: &mut dyn ChunkObserver,
    touched: &mut Vec<ChunkHandle>,
) -> Result<RestoreReport, PersistError> {
    let voxel_ids: Vec<VoxelTypeId> = snapshot
        .voxel_names
        .iter()
        .map(|name| {
            registry.resolve_voxel(name).unwrap_or_else(|| {
                tracing::warn!("Unknown voxel definition '{}', loading as empty", name);
                VoxelTypeId::EMPTY
            })
        })
        .collect();
    let item_ids: Vec<Option<ItemTypeId>> = snapshot
        .item_names
        .iter()
        .map(|name| {
            let id = registry.resolve_item(name);
            if id.is_none() {
                tracing::warn!("Unknown item definition '{}', dropping its attachments", name);
            }
            id
        })
        .collect();
    let item_id = |index: i16| {
        usize::try_from(index)
            .ok()
            .and_then(|i| item_ids.get(i).copied().flatten())
    };

    let mut report = RestoreReport::default();
    let first_touched = touched.len();

    for record in &snapshot.chunks {
        let coord = record.coord();
        let handle = pool.get_or_create(coord, false, generator).inspect_err(|e| {
            tracing::error!("Cannot obtain write target for chunk {}: {}", coord, e);
        })?;
        pool.pin(handle)?;
        touched.push(handle);

        let chunk = pool
            .get_mut(handle)
            .ok_or(PoolError::StaleHandle(handle.slot()))?;
        chunk.reset(coord);
        chunk.set_populated(true);
        chunk.set_modified(true);
        chunk.set_above_surface(record.above_surface);
        chunk.mark_dirty(ALL_DIRTY);

        report.clamped_voxels += expand_runs(&record.runs, &voxel_ids, chunk);
        report.voxels += record.runs.iter().map(|r| r.repetitions as usize).sum::<usize>();

        for light in &record.light_sources {
            let index = usize::try_from(light.voxel_index).ok().filter(|&i| i < CHUNK_VOLUME);
            match (index, item_id(light.item_index)) {
                (Some(index), Some(item)) => {
                    let source = LightSource {
                        voxel_index: index as u16,
                        normal: light.normal,
                        item,
                    };
                    chunk.add_light_source(source);
                    observer.light_source_attached(coord, &source);
                }
                _ => {
                    report.dropped_light_sources += 1;
                    tracing::warn!(
                        "Dropping light source at voxel {} in chunk {}",
                        light.voxel_index,
                        coord
                    );
                }
            }
        }

        for item in &record.items {
            match item_id(item.item_index) {
                Some(id) => {
                    let spawned = SpawnedItem {
                        item: id,
                        position: item.position,
                        quantity: item.quantity,
                    };
                    chunk.add_spawned_item(spawned);
                    observer.item_spawned(coord, &spawned);
                }
                None => report.dropped_items += 1,
            }
        }

        observer.chunk_modified(coord);
        observer.refresh_requested(coord);
        report.chunks += 1;
        tracing::debug!("Restored chunk {} ({} runs)", coord, record.runs.len());
    }

    // Nothing outside `[0, voxel_count)` may survive a load.
    for &handle in &touched[first_touched..] {
        let Some(chunk) = pool.get_mut(handle) else {
            continue;
        };
        for voxel in chunk.voxels_mut() {
            if voxel.has_content() && !registry.is_valid_voxel(voxel.type_id) {
                *voxel = VoxelRecord::EMPTY;
                report.clamped_voxels += 1;
            }
        }
    }

    if report.clamped_voxels > 0 {
        tracing::warn!("Cleared {} voxels with unresolvable definitions", report.clamped_voxels);
    }
    Ok(report)
}
