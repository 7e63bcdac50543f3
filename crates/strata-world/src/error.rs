//! World-level error type.

use glam::IVec3;
use strata_config::ConfigError;
use strata_persist::PersistError;
use strata_voxel::{PoolError, VoxelTypeId};
use thiserror::Error;

/// Errors returned by [`World`](crate::World) operations.
#[derive(Debug, Error)]
pub enum WorldError {
    /// Decoding, validating or restoring a save failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The chunk pool could not supply a chunk.
    #[error(transparent)]
    Pool(#[from] PoolError),
    /// Reading or writing a save file failed.
    #[error("save file i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration cannot build a world.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A write named a definition index the registry does not know.
    #[error("unknown voxel definition {0:?}")]
    UnknownVoxel(VoxelTypeId),
    /// A replace-mode load holds more distinct chunks than the pool can keep.
    #[error("save holds {chunks} chunks but the pool ceiling is {max_chunks}")]
    SaveTooLarge {
        /// Distinct chunk coordinates in the save.
        chunks: usize,
        /// Configured ceiling.
        max_chunks: usize,
    },
    /// A voxel operation addressed a chunk that is not loaded.
    #[error("chunk {0} is not loaded")]
    NotLoaded(IVec3),
}
