//! Per-version save readers.
//!
//! Every supported version has its own self-contained [`FormatReader`]. The
//! leading version byte alone selects the reader from [`READERS`]; adding a
//! version means adding a module and a table entry, never editing an older
//! reader. Only [`CURRENT_VERSION`] is ever written.

mod v10;
mod v5;
mod v6;
mod v7;
mod v8;
mod v9;

use crate::error::PersistError;
use crate::snapshot::WorldSnapshot;

/// Version produced by the writer.
pub const CURRENT_VERSION: u8 = 10;

/// Chunk edge implied by versions that predate the edge-length byte.
pub const LEGACY_CHUNK_EDGE: u8 = 16;

/// Decodes one historical layout into a [`WorldSnapshot`].
pub trait FormatReader: Sync {
    /// Version byte this reader handles.
    fn version(&self) -> u8;

    /// Parses a full buffer, starting at its version byte.
    ///
    /// `running_edge` is the chunk edge of the running configuration; a
    /// save produced with another edge is rejected with
    /// [`PersistError::ChunkEdgeMismatch`].
    fn read(&self, bytes: &[u8], running_edge: u8) -> Result<WorldSnapshot, PersistError>;
}

/// Lookup table of every readable version.
pub static READERS: [&dyn FormatReader; 6] = [
    &v5::V5Reader,
    &v6::V6Reader,
    &v7::V7Reader,
    &v8::V8Reader,
    &v9::V9Reader,
    &v10::V10Reader,
];

/// Reader for a version byte, if supported.
pub fn reader_for(version: u8) -> Option<&'static dyn FormatReader> {
    READERS.iter().copied().find(|r| r.version() == version)
}

/// Versions the decoder accepts, oldest first.
pub fn supported_versions() -> impl Iterator<Item = u8> {
    READERS.iter().map(|r| r.version())
}

/// Rejects a legacy load when the running edge is not the historical one.
fn require_legacy_edge(running_edge: u8) -> Result<(), PersistError> {
    if running_edge != LEGACY_CHUNK_EDGE {
        return Err(PersistError::ChunkEdgeMismatch {
            found: LEGACY_CHUNK_EDGE,
            expected: running_edge,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;

    use glam::Vec3;
    use strata_voxel::Rgb8;

    use super::*;
    use crate::snapshot::{
        ChunkRecord, LightSourceRecord, PlayerSnapshot, SceneObject, SpawnedItemRecord, VoxelRun,
    };
    use crate::wire::ByteWriter;
    use crate::writer::write_snapshot;

    /// Writes a snapshot in any historical layout, dropping fields the
    /// version does not carry.
    pub(crate) fn legacy_bytes(version: u8, snapshot: &WorldSnapshot) -> Vec<u8> {
        assert!((5..CURRENT_VERSION).contains(&version));
        let mut w = ByteWriter::new();
        w.u8(version);
        w.vec3(snapshot.player.position);
        w.vec3(snapshot.player.body_rotation);
        if version >= 8 {
            w.vec3(snapshot.player.camera_rotation);
        }
        w.i16(snapshot.voxel_names.len() as i16);
        for name in &snapshot.voxel_names {
            w.string(name);
        }
        if version >= 7 {
            w.i16(snapshot.item_names.len() as i16);
            for name in &snapshot.item_names {
                w.string(name);
            }
        }
        w.i32(snapshot.chunks.len() as i32);
        for chunk in &snapshot.chunks {
            w.vec3(chunk.position);
            if version >= 8 {
                w.bool(chunk.above_surface);
            }
            w.i16(chunk.runs.len() as i16);
            for run in &chunk.runs {
                w.i16(run.def_index);
                w.u8(run.color.r);
                w.u8(run.color.g);
                w.u8(run.color.b);
                w.i16(run.start);
                w.i16(run.repetitions);
                if version >= 6 {
                    w.u8(run.flags);
                }
                if version >= 8 {
                    w.bool(run.rotation.is_some());
                    if let Some(rotation) = run.rotation {
                        w.vec3(rotation);
                    }
                }
            }
            if version >= 7 {
                w.i16(chunk.light_sources.len() as i16);
                for light in &chunk.light_sources {
                    w.i16(light.voxel_index);
                    w.vec3(light.normal);
                    w.i16(light.item_index);
                }
            }
            if version >= 9 {
                w.i16(chunk.items.len() as i16);
                for item in &chunk.items {
                    w.i16(item.item_index);
                    w.vec3(item.position);
                    w.i16(item.quantity);
                }
            }
        }
        if version >= 9 {
            w.i16(snapshot.scene_objects.len() as i16);
            for object in &snapshot.scene_objects {
                w.string(&object.resource_path);
                w.string(&object.name);
                w.vec3(object.position);
                w.vec3(object.rotation);
                w.vec3(object.scale);
                w.i16(object.properties.len() as i16);
                for (key, value) in &object.properties {
                    w.string(key);
                    w.string(value);
                }
            }
        }
        w.into_inner()
    }

    /// A snapshot exercising every field of the current layout.
    pub(crate) fn full_snapshot() -> WorldSnapshot {
        let mut properties = BTreeMap::new();
        properties.insert("open".to_string(), "true".to_string());
        properties.insert("owner".to_string(), "mira".to_string());
        WorldSnapshot {
            version: CURRENT_VERSION,
            chunk_edge: 16,
            player: PlayerSnapshot {
                position: Vec3::new(1.5, 20.0, -3.0),
                body_rotation: Vec3::new(0.0, 45.0, 0.0),
                camera_rotation: Vec3::new(-10.0, 0.0, 0.0),
            },
            voxel_names: vec!["stone".to_string(), "lantern".to_string()],
            item_names: vec!["torch".to_string()],
            chunks: vec![ChunkRecord {
                position: Vec3::new(16.0, 0.0, -32.0),
                above_surface: true,
                runs: vec![
                    VoxelRun {
                        def_index: 0,
                        color: Rgb8::new(200, 10, 10),
                        start: 0,
                        repetitions: 300,
                        flags: 0b0100_0001,
                        rotation: None,
                    },
                    VoxelRun {
                        def_index: 1,
                        color: Rgb8::WHITE,
                        start: 400,
                        repetitions: 1,
                        flags: 0,
                        rotation: Some(Vec3::new(0.0, 90.0, 0.0)),
                    },
                ],
                light_sources: vec![LightSourceRecord {
                    voxel_index: 299,
                    normal: Vec3::Y,
                    item_index: 0,
                }],
                items: vec![SpawnedItemRecord {
                    item_index: 0,
                    position: Vec3::new(18.5, 3.0, -30.25),
                    quantity: 12,
                }],
            }],
            scene_objects: vec![SceneObject {
                resource_path: "props/chest".to_string(),
                name: "Chest (1)".to_string(),
                position: Vec3::new(5.0, 1.0, 5.0),
                rotation: Vec3::ZERO,
                scale: Vec3::ONE,
                properties,
            }],
        }
    }

    /// The subset of `full` a version can represent.
    pub(crate) fn as_version(version: u8, full: &WorldSnapshot) -> WorldSnapshot {
        let mut s = full.clone();
        s.version = version;
        s.chunk_edge = LEGACY_CHUNK_EDGE;
        if version < 8 {
            s.player.camera_rotation = Vec3::ZERO;
        }
        if version < 7 {
            s.item_names.clear();
        }
        for chunk in &mut s.chunks {
            if version < 6 {
                chunk.runs.iter_mut().for_each(|r| r.flags = 0);
            }
            if version < 7 {
                chunk.light_sources.clear();
            }
            if version < 8 {
                chunk.above_surface = false;
                chunk.runs.iter_mut().for_each(|r| r.rotation = None);
            }
            if version < 9 {
                chunk.items.clear();
            }
        }
        if version < 9 {
            s.scene_objects.clear();
        }
        s
    }

    #[test]
    fn test_every_version_has_a_reader() {
        let versions: Vec<u8> = supported_versions().collect();
        assert_eq!(versions, vec![5, 6, 7, 8, 9, 10]);
        assert!(reader_for(4).is_none());
        assert!(reader_for(11).is_none());
    }

    #[test]
    fn test_legacy_versions_decode_at_default_edge() {
        let full = full_snapshot();
        for version in 5..CURRENT_VERSION {
            let bytes = legacy_bytes(version, &full);
            let reader = reader_for(version).expect("reader registered");
            let decoded = reader
                .read(&bytes, LEGACY_CHUNK_EDGE)
                .unwrap_or_else(|e| panic!("version {version} failed: {e}"));
            assert_eq!(decoded, as_version(version, &full), "version {version}");
        }
    }

    #[test]
    fn test_legacy_versions_reject_other_edges() {
        let full = full_snapshot();
        for version in 5..CURRENT_VERSION {
            let bytes = legacy_bytes(version, &full);
            let result = reader_for(version).unwrap().read(&bytes, 32);
            assert!(matches!(
                result,
                Err(PersistError::ChunkEdgeMismatch { found: 16, expected: 32 })
            ));
        }
    }

    #[test]
    fn test_current_reader_matches_writer() {
        let full = full_snapshot();
        let bytes = write_snapshot(&full).unwrap();
        let decoded = reader_for(CURRENT_VERSION).unwrap().read(&bytes, 16).unwrap();
        assert_eq!(decoded, full);
    }

    #[test]
    fn test_current_reader_rejects_trailing_bytes() {
        let mut bytes = write_snapshot(&full_snapshot()).unwrap();
        let end = bytes.len();
        bytes.extend_from_slice(&[0, 0]);
        let result = reader_for(CURRENT_VERSION).unwrap().read(&bytes, 16);
        assert!(
            matches!(result, Err(PersistError::TrailingBytes { offset, remaining: 2 }) if offset == end),
            "{result:?}"
        );
    }

    #[test]
    fn test_truncated_buffers_fail_for_every_version() {
        let full = full_snapshot();
        for version in 5..=CURRENT_VERSION {
            let bytes = if version == CURRENT_VERSION {
                write_snapshot(&full).unwrap()
            } else {
                legacy_bytes(version, &full)
            };
            let cut = &bytes[..bytes.len() - 3];
            let result = reader_for(version).unwrap().read(cut, 16);
            assert!(
                matches!(result, Err(PersistError::Truncated { .. })),
                "version {version}: {result:?}"
            );
        }
    }
}
