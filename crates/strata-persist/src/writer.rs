//! Serializes a [`WorldSnapshot`] in the current layout.

use crate::error::PersistError;
use crate::formats::CURRENT_VERSION;
use crate::snapshot::WorldSnapshot;
use crate::wire::ByteWriter;

/// Rough bytes per run, used to pre-size the output buffer.
const RUN_SIZE_HINT: usize = 12;

/// Writes `snapshot` as a current-version buffer.
///
/// The snapshot's `version` field is ignored; the output always carries
/// [`CURRENT_VERSION`] and the snapshot's chunk edge.
///
/// # Errors
///
/// [`PersistError::CountOverflow`] if a table or list exceeds its count field.
pub fn write_snapshot(snapshot: &WorldSnapshot) -> Result<Vec<u8>, PersistError> {
    let mut w = ByteWriter::with_capacity(64 + snapshot.run_count() * RUN_SIZE_HINT);
    w.u8(CURRENT_VERSION);
    w.u8(snapshot.chunk_edge);

    w.vec3(snapshot.player.position);
    w.vec3(snapshot.player.body_rotation);
    w.vec3(snapshot.player.camera_rotation);

    w.count_i16("voxel names", snapshot.voxel_names.len())?;
    for name in &snapshot.voxel_names {
        w.string(name);
    }
    w.count_i16("item names", snapshot.item_names.len())?;
    for name in &snapshot.item_names {
        w.string(name);
    }

    w.count_i32("chunks", snapshot.chunks.len())?;
    for chunk in &snapshot.chunks {
        w.vec3(chunk.position);
        w.bool(chunk.above_surface);

        w.count_i16("runs", chunk.runs.len())?;
        for run in &chunk.runs {
            w.i16(run.def_index);
            w.u8(run.color.r);
            w.u8(run.color.g);
            w.u8(run.color.b);
            w.i16(run.start);
            w.i16(run.repetitions);
            w.u8(run.flags);
            match run.rotation {
                Some(rotation) => {
                    w.bool(true);
                    w.vec3(rotation);
                }
                None => w.bool(false),
            }
        }

        w.count_i16("light sources", chunk.light_sources.len())?;
        for light in &chunk.light_sources {
            w.i16(light.voxel_index);
            w.vec3(light.normal);
            w.i16(light.item_index);
        }

        w.count_i16("spawned items", chunk.items.len())?;
        for item in &chunk.items {
            w.i16(item.item_index);
            w.vec3(item.position);
            w.i16(item.quantity);
        }
    }

    w.count_i16("scene objects", snapshot.scene_objects.len())?;
    for object in &snapshot.scene_objects {
        w.string(&object.resource_path);
        w.string(&object.name);
        w.vec3(object.position);
        w.vec3(object.rotation);
        w.vec3(object.scale);
        w.count_i16("object properties", object.properties.len())?;
        for (key, value) in &object.properties {
            w.string(key);
            w.string(value);
        }
    }

    Ok(w.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
