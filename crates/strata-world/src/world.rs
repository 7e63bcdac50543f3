//! The world façade.
//!
//! [`World`] owns the chunk pool, the definition registry, the terrain
//! generator and the change observer, and hands them explicitly to the codec
//! and the light query. Gameplay writes, chunk discard, save and load all go
//! through it so every content change is reported to the observer.

use std::path::Path;
use std::sync::Arc;

use glam::{IVec3, Vec3};
use rustc_hash::FxHashSet;
use strata_config::Config;
use strata_light::LightQuery;
use strata_persist::{
    PersistenceCodec, PlayerSnapshot, RestoreReport, RestoreTarget, SceneObjectStore,
    WorldSnapshot,
};
use strata_voxel::coords::{chunk_coord, resolve, voxel_containing};
use strata_voxel::{
    ChunkHandle, ChunkObserver, ChunkPool, DefinitionRegistry, Face, ItemTypeId, LightSource,
    NullObserver, SpawnedItem, TerrainGenerator, VoxelRecord, WorldExtents,
};

use crate::error::WorldError;
use crate::populate::BackgroundPopulator;

/// How a load treats chunks already in the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Release every chunk first. Fails before touching the pool if the
    /// save cannot fit.
    #[default]
    Replace,
    /// Keep existing chunks. On failure every chunk the load wrote to is
    /// repainted from the generator.
    Merge,
}

/// Chunk storage plus the collaborators it needs.
pub struct World<O: ChunkObserver = NullObserver> {
    pool: ChunkPool,
    registry: Box<dyn DefinitionRegistry>,
    generator: Arc<dyn TerrainGenerator>,
    observer: O,
    codec: PersistenceCodec,
    global_illumination: bool,
}

impl<O: ChunkObserver> World<O> {
    /// Assembles a world from its parts.
    pub fn new(
        pool: ChunkPool,
        registry: Box<dyn DefinitionRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        observer: O,
    ) -> Self {
        Self {
            pool,
            registry,
            generator,
            observer,
            codec: PersistenceCodec::new(),
            global_illumination: true,
        }
    }

    /// Builds the pool and lighting settings from a config.
    ///
    /// # Errors
    ///
    /// [`WorldError::Config`] if the config fails validation.
    pub fn from_config(
        config: &Config,
        registry: Box<dyn DefinitionRegistry>,
        generator: Arc<dyn TerrainGenerator>,
        observer: O,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let [x, y, z] = config.world.extents;
        let mut pool = ChunkPool::new(config.world.max_chunks, WorldExtents::new(x, y, z));
        pool.set_anchor(IVec3::from_array(config.world.anchor));

        let mut world = Self::new(pool, registry, generator, observer);
        world.global_illumination = config.lighting.global_illumination;
        tracing::info!(
            "World ready: max {} chunks, extents {:?}",
            config.world.max_chunks,
            config.world.extents
        );
        Ok(world)
    }

    /// Replaces the codec, e.g. to save with a non-default edge byte.
    pub fn with_codec(mut self, codec: PersistenceCodec) -> Self {
        self.codec = codec;
        self
    }

    /// The chunk pool.
    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    /// Mutable chunk pool, for callers driving population themselves.
    pub fn pool_mut(&mut self) -> &mut ChunkPool {
        &mut self.pool
    }

    /// The definition registry.
    pub fn registry(&self) -> &dyn DefinitionRegistry {
        self.registry.as_ref()
    }

    /// The terrain generator.
    pub fn generator(&self) -> &Arc<dyn TerrainGenerator> {
        &self.generator
    }

    /// The change observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Mutable change observer, e.g. to swap an event buffer.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// The save codec.
    pub fn codec(&self) -> PersistenceCodec {
        self.codec
    }

    /// Moves the reclamation anchor, typically to the viewer's chunk.
    pub fn set_anchor(&mut self, anchor: IVec3) {
        self.pool.set_anchor(anchor);
    }

    /// Toggles global illumination for light queries.
    pub fn set_global_illumination(&mut self, enabled: bool) {
        self.global_illumination = enabled;
    }

    // -- Voxel access ------------------------------------------------------

    /// Chunk containing a world voxel position, creating it if needed.
    ///
    /// # Errors
    ///
    /// [`WorldError::Pool`] for out-of-bounds positions or an exhausted pool.
    pub fn chunk_for(&mut self, world: IVec3, populate: bool) -> Result<ChunkHandle, WorldError> {
        let handle = self
            .pool
            .get_or_create(chunk_coord(world), populate, self.generator.as_ref())?;
        Ok(handle)
    }

    /// Voxel at a world position, if its chunk is loaded and populated.
    /// Never creates a chunk.
    pub fn get_voxel(&self, world: IVec3) -> Option<VoxelRecord> {
        let (coord, index) = resolve(world);
        self.pool
            .chunk_at(coord)
            .filter(|chunk| chunk.is_populated())
            .map(|chunk| chunk.get(index))
    }

    /// Gameplay write of one voxel.
    ///
    /// Populates the chunk first if needed, marks it modified, drops light
    /// sources attached to a voxel that becomes empty, and requests a refresh
    /// of the chunk and of every loaded neighbor sharing the touched face.
    ///
    /// # Errors
    ///
    /// [`WorldError::UnknownVoxel`] for an unregistered definition, or
    /// [`WorldError::Pool`] if no chunk can be supplied.
    pub fn set_voxel(&mut self, world: IVec3, voxel: VoxelRecord) -> Result<(), WorldError> {
        if !self.registry.is_valid_voxel(voxel.type_id) {
            return Err(WorldError::UnknownVoxel(voxel.type_id));
        }
        let (coord, index) = resolve(world);
        let handle = self.pool.get_or_create(coord, true, self.generator.as_ref())?;
        let chunk = self
            .pool
            .get_mut(handle)
            .ok_or(WorldError::NotLoaded(coord))?;
        chunk.set(index, voxel);
        if !voxel.has_content() {
            let removed = chunk.remove_light_sources_at(index as u16);
            if removed > 0 {
                tracing::debug!("Dropped {} light sources with voxel {}", removed, world);
            }
        }

        self.observer.chunk_modified(coord);
        self.observer.refresh_requested(coord);
        for face in Face::ALL {
            let across = chunk_coord(world + face.offset());
            if across != coord && self.pool.get_existing(across).is_some() {
                self.observer.refresh_requested(across);
            }
        }
        Ok(())
    }

    /// Attaches a light-emitting item to a face of a voxel.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotLoaded`] if the voxel's chunk is not loaded and
    /// populated.
    pub fn attach_light_source(
        &mut self,
        world: IVec3,
        normal: Vec3,
        item: ItemTypeId,
    ) -> Result<(), WorldError> {
        let (coord, index) = resolve(world);
        let chunk = self
            .pool
            .chunk_at_mut(coord)
            .filter(|chunk| chunk.is_populated())
            .ok_or(WorldError::NotLoaded(coord))?;
        let source = LightSource {
            voxel_index: index as u16,
            normal,
            item,
        };
        chunk.add_light_source(source);
        chunk.set_modified(true);
        self.observer.light_source_attached(coord, &source);
        self.observer.chunk_modified(coord);
        self.observer.refresh_requested(coord);
        Ok(())
    }

    /// Drops an item stack into the chunk containing `position`.
    ///
    /// # Errors
    ///
    /// [`WorldError::NotLoaded`] if that chunk is not loaded and populated.
    pub fn spawn_item(
        &mut self,
        position: Vec3,
        item: ItemTypeId,
        quantity: i16,
    ) -> Result<(), WorldError> {
        let coord = chunk_coord(voxel_containing(position));
        let chunk = self
            .pool
            .chunk_at_mut(coord)
            .filter(|chunk| chunk.is_populated())
            .ok_or(WorldError::NotLoaded(coord))?;
        let spawned = SpawnedItem {
            item,
            position,
            quantity,
        };
        chunk.add_spawned_item(spawned);
        chunk.set_modified(true);
        self.observer.item_spawned(coord, &spawned);
        self.observer.chunk_modified(coord);
        Ok(())
    }

    // -- Chunk lifecycle ---------------------------------------------------

    /// Throws away a chunk's edits by repainting it from the generator. The
    /// chunk becomes reclaimable again. Returns `false` if it is not loaded.
    ///
    /// # Errors
    ///
    /// [`WorldError::Pool`] if the handle went stale.
    pub fn discard_chunk(&mut self, coord: IVec3) -> Result<bool, WorldError> {
        let Some(handle) = self.pool.get_existing(coord) else {
            return Ok(false);
        };
        self.pool.repaint(handle, self.generator.as_ref())?;
        self.observer.refresh_requested(coord);
        tracing::debug!("Discarded edits in chunk {}", coord);
        Ok(true)
    }

    /// Releases a chunk whatever its modified flag. Returns `false` if it is
    /// not loaded.
    ///
    /// # Errors
    ///
    /// [`WorldError::Pool`] if the handle went stale.
    pub fn unload_chunk(&mut self, coord: IVec3) -> Result<bool, WorldError> {
        let Some(handle) = self.pool.get_existing(coord) else {
            return Ok(false);
        };
        self.pool.release(handle)?;
        tracing::debug!("Unloaded chunk {}", coord);
        Ok(true)
    }

    // -- Light ---------------------------------------------------------------

    /// Light query over the current pool.
    pub fn light_query(&self) -> LightQuery<'_> {
        LightQuery::new(&self.pool, self.registry.as_ref(), self.generator.as_ref())
            .with_global_illumination(self.global_illumination)
    }

    /// Light at a continuous world position, in `[0, 1]`.
    pub fn light(&self, position: Vec3) -> f32 {
        self.light_query().get_light(position)
    }

    // -- Persistence -----------------------------------------------------------

    /// Encodes every modified chunk.
    ///
    /// # Errors
    ///
    /// [`WorldError::Persist`] if a table or list overflows the format.
    pub fn save(
        &self,
        player: PlayerSnapshot,
        scene: &dyn SceneObjectStore,
    ) -> Result<Vec<u8>, WorldError> {
        let bytes = self
            .codec
            .encode(&self.pool, self.registry.as_ref(), player, scene)?;
        Ok(bytes)
    }

    /// Saves to `path` through a temporary file in the same directory, so an
    /// interrupted save never truncates the previous file.
    ///
    /// # Errors
    ///
    /// [`WorldError::Io`] on filesystem failures, or any
    /// [`save`](Self::save) error.
    pub fn save_to_file(
        &self,
        path: &Path,
        player: PlayerSnapshot,
        scene: &dyn SceneObjectStore,
    ) -> Result<(), WorldError> {
        let bytes = self.save(player, scene)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp_path = path.with_file_name(temp_name);
        std::fs::write(&temp_path, &bytes)?;
        std::fs::rename(&temp_path, path)?;
        tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Decodes and applies a save buffer.
    ///
    /// Nothing is mutated unless the whole buffer decodes and validates.
    /// See [`LoadMode`] for how existing chunks are treated.
    ///
    /// # Errors
    ///
    /// - [`WorldError::Persist`] for malformed, unsupported or mismatched
    ///   buffers, or if the pool runs out of slots while applying.
    /// - [`WorldError::SaveTooLarge`] / [`WorldError::Pool`] if a replace
    ///   load cannot fit, reported before the pool is cleared.
    pub fn load(
        &mut self,
        bytes: &[u8],
        mode: LoadMode,
        scene: &mut dyn SceneObjectStore,
    ) -> Result<RestoreReport, WorldError> {
        let snapshot = self.codec.decode(bytes)?;
        if mode == LoadMode::Replace {
            self.preflight_replace(&snapshot)?;
            let released: Vec<IVec3> = self.pool.iter().map(|(_, chunk)| chunk.coord()).collect();
            self.pool.clear();
            for coord in released {
                self.observer.refresh_requested(coord);
            }
        }
        self.apply(&snapshot, scene)
    }

    /// Reads and applies a save file.
    ///
    /// # Errors
    ///
    /// [`WorldError::Io`] if the file cannot be read, or any
    /// [`load`](Self::load) error.
    pub fn load_from_file(
        &mut self,
        path: &Path,
        mode: LoadMode,
        scene: &mut dyn SceneObjectStore,
    ) -> Result<RestoreReport, WorldError> {
        let bytes = std::fs::read(path)?;
        tracing::info!("Loading {} ({} bytes)", path.display(), bytes.len());
        self.load(&bytes, mode, scene)
    }

    /// Checks that a replace load can complete before anything is cleared.
    fn preflight_replace(&self, snapshot: &WorldSnapshot) -> Result<(), WorldError> {
        let mut coords = FxHashSet::default();
        for record in &snapshot.chunks {
            let coord = record.coord();
            self.pool
                .address_space()
                .key(coord)
                .map_err(strata_voxel::PoolError::from)?;
            coords.insert(coord);
        }
        if coords.len() > self.pool.max_chunks() {
            tracing::error!(
                "Save holds {} chunks, pool ceiling is {}",
                coords.len(),
                self.pool.max_chunks()
            );
            return Err(WorldError::SaveTooLarge {
                chunks: coords.len(),
                max_chunks: self.pool.max_chunks(),
            });
        }
        Ok(())
    }

    /// Restores a snapshot, repainting every touched chunk on failure.
    fn apply(
        &mut self,
        snapshot: &WorldSnapshot,
        scene: &mut dyn SceneObjectStore,
    ) -> Result<RestoreReport, WorldError> {
        let mut touched = Vec::new();
        let target = RestoreTarget {
            pool: &mut self.pool,
            registry: self.registry.as_ref(),
            generator: self.generator.as_ref(),
            observer: &mut self.observer,
            scene,
        };
        match self.codec.restore(snapshot, target, &mut touched) {
            Ok(report) => Ok(report),
            Err(err) => {
                self.roll_back(&touched);
                Err(err.into())
            }
        }
    }

    /// Returns chunks written by a failed load to their generated contents.
    fn roll_back(&mut self, touched: &[ChunkHandle]) {
        let mut seen = FxHashSet::default();
        let mut repainted = 0usize;
        for &handle in touched {
            if !seen.insert(handle) {
                continue;
            }
            let Some(coord) = self.pool.get(handle).map(|chunk| chunk.coord()) else {
                continue;
            };
            if self.pool.repaint(handle, self.generator.as_ref()).is_ok() {
                self.observer.refresh_requested(coord);
                repainted += 1;
            }
        }
        tracing::warn!("Load failed, repainted {} touched chunks", repainted);
    }

    // -- Background population ---------------------------------------------------

    /// Queues background population of a chunk unless it is already loaded
    /// and populated. Returns whether a request was queued.
    pub fn request_population(&self, coord: IVec3, populator: &mut BackgroundPopulator) -> bool {
        if self
            .pool
            .chunk_at(coord)
            .is_some_and(|chunk| chunk.is_populated())
        {
            return false;
        }
        populator.submit(coord).is_ok()
    }

    /// Publishes every finished background chunk into the pool and returns
    /// how many were adopted.
    ///
    /// # Errors
    ///
    /// [`WorldError::Pool`] if a slot cannot be supplied; results not yet
    /// published are recycled.
    pub fn publish_populated(
        &mut self,
        populator: &mut BackgroundPopulator,
    ) -> Result<usize, WorldError> {
        let mut adopted = 0;
        let mut results = populator.drain_results().into_iter();
        while let Some(mut done) = results.next() {
            match self.pool.adopt(done.coord, &mut done.chunk) {
                Ok(_) => {
                    self.observer.refresh_requested(done.coord);
                    populator.recycle(done.chunk);
                    adopted += 1;
                }
                Err(err) => {
                    populator.recycle(done.chunk);
                    for rest in results {
                        populator.recycle(rest.chunk);
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(adopted)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
