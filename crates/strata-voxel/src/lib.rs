//! Sparse chunked voxel storage: voxel records, chunks, the definition
//! registry contract, coordinate addressing and the bounded chunk pool.

pub mod address;
pub mod chunk;
pub mod collaborators;
pub mod coords;
pub mod events;
pub mod pool;
pub mod registry;
pub mod voxel;

pub use address::{AddressError, CachedChunkEntry, ChunkAddressSpace, WorldExtents};
pub use chunk::{
    ALL_DIRTY, Chunk, ChunkHandle, LIGHT_DIRTY, LightSource, MESH_DIRTY, SpawnedItem,
};
pub use collaborators::{ChunkObserver, FlatTerrain, NullObserver, TerrainGenerator};
pub use coords::{CHUNK_EDGE, CHUNK_EDGE_I32, CHUNK_VOLUME, Face};
pub use events::{ChunkEvent, ChunkEventBuffer};
pub use pool::{ChunkPool, PoolError};
pub use registry::{
    DefinitionRegistry, DefinitionTable, ItemDefinition, ItemTypeId, RegistryError, RenderType,
    VoxelDefinition, VoxelKind, VoxelTypeId,
};
pub use voxel::{MAX_LIGHT, Rgb8, VoxelFlags, VoxelRecord};
