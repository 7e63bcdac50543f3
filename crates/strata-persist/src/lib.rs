//! Versioned run-length persistence for modified chunks.
//!
//! Saving captures every modified chunk into a [`WorldSnapshot`] and writes it
//! in the current format. Loading decodes a buffer of any supported version
//! into a snapshot, validates it, and only then restores it into the pool.

pub mod capture;
pub mod codec;
pub mod error;
pub mod formats;
pub mod restore;
pub mod runs;
pub mod snapshot;
pub mod wire;
pub mod writer;

pub use codec::PersistenceCodec;
pub use error::PersistError;
pub use formats::{CURRENT_VERSION, FormatReader, LEGACY_CHUNK_EDGE, reader_for, supported_versions};
pub use restore::{RestoreReport, RestoreTarget};
pub use snapshot::{
    ChunkRecord, LightSourceRecord, NoSceneObjects, PlayerSnapshot, SceneObject,
    SceneObjectStore, SpawnedItemRecord, VoxelRun, WorldSnapshot,
};
pub use writer::write_snapshot;
