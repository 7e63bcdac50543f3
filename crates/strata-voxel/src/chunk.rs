//! Dense chunk storage: a fixed-length voxel array plus per-chunk metadata.
//!
//! A [`Chunk`] is allocated once per pool slot and reused in place: reclaiming
//! a slot calls [`Chunk::reset`], which clears contents without touching the
//! voxel allocation.

use glam::{IVec3, Vec3};
use rustc_hash::FxHashMap;

use crate::coords::{CHUNK_EDGE, CHUNK_VOLUME, Face, chunk_origin, flat_index, origin_to_coord};
use crate::registry::ItemTypeId;
use crate::voxel::VoxelRecord;

/// Dirty-flag bit: chunk mesh needs rebuilding.
pub const MESH_DIRTY: u8 = 0b0000_0001;
/// Dirty-flag bit: chunk light needs recomputing.
pub const LIGHT_DIRTY: u8 = 0b0000_0010;

/// All derived-state flags.
pub const ALL_DIRTY: u8 = MESH_DIRTY | LIGHT_DIRTY;

/// Generation-checked reference to a pool slot.
///
/// Handles never own a chunk. A handle whose slot has since been reclaimed is
/// rejected by the pool because the slot generation no longer matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ChunkHandle {
    /// Index of the backing pool slot.
    pub fn slot(self) -> usize {
        self.slot as usize
    }
}

/// A torch-like attachment on one voxel face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
    /// Flat index of the voxel the item is attached to.
    pub voxel_index: u16,
    /// Face normal the item is attached on.
    pub normal: Vec3,
    /// Attached item definition.
    pub item: ItemTypeId,
}

/// An item lying in the world inside this chunk.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedItem {
    /// Item definition.
    pub item: ItemTypeId,
    /// World position.
    pub position: Vec3,
    /// Stack size.
    pub quantity: i16,
}

/// A cube of `CHUNK_EDGE³` voxels with population, modification and
/// derived-state tracking.
#[derive(Clone, Debug)]
pub struct Chunk {
    /// World-space voxel origin (`coord * CHUNK_EDGE`).
    position: IVec3,
    voxels: Box<[VoxelRecord]>,
    is_populated: bool,
    modified: bool,
    is_above_surface: bool,
    light_sources: Vec<LightSource>,
    spawned_items: Vec<SpawnedItem>,
    /// Per-voxel transforms of custom-render voxels, keyed by flat index.
    rotations: FxHashMap<u16, Vec3>,
    neighbors: [Option<ChunkHandle>; 6],
    dirty: u8,
    /// Monotonically increasing counter, bumped on each gameplay mutation.
    version: u64,
}

impl Chunk {
    /// Allocates an empty, unpopulated chunk at the given chunk coordinate.
    pub fn new(coord: IVec3) -> Self {
        Self {
            position: chunk_origin(coord),
            voxels: vec![VoxelRecord::EMPTY; CHUNK_VOLUME].into_boxed_slice(),
            is_populated: false,
            modified: false,
            is_above_surface: false,
            light_sources: Vec::new(),
            spawned_items: Vec::new(),
            rotations: FxHashMap::default(),
            neighbors: [None; 6],
            dirty: 0,
            version: 0,
        }
    }

    /// Reinitializes the chunk in place for a new coordinate.
    ///
    /// Keeps every allocation; all voxels become empty.
    pub fn reset(&mut self, coord: IVec3) {
        self.position = chunk_origin(coord);
        self.voxels.fill(VoxelRecord::EMPTY);
        self.is_populated = false;
        self.modified = false;
        self.is_above_surface = false;
        self.light_sources.clear();
        self.spawned_items.clear();
        self.rotations.clear();
        self.neighbors = [None; 6];
        self.dirty = 0;
        self.version = 0;
    }

    /// World-space voxel origin.
    pub fn position(&self) -> IVec3 {
        self.position
    }

    /// Chunk coordinate (origin divided by the edge length).
    pub fn coord(&self) -> IVec3 {
        origin_to_coord(self.position)
    }

    /// Voxel at a flat index. Out-of-range reads return the empty voxel.
    pub fn get(&self, index: usize) -> VoxelRecord {
        match self.voxels.get(index) {
            Some(voxel) => *voxel,
            None => {
                tracing::warn!("Chunk::get out of bounds: {}", index);
                VoxelRecord::EMPTY
            }
        }
    }

    /// Voxel at chunk-local coordinates.
    pub fn get_local(&self, x: usize, y: usize, z: usize) -> VoxelRecord {
        if x >= CHUNK_EDGE || y >= CHUNK_EDGE || z >= CHUNK_EDGE {
            tracing::warn!("Chunk::get_local out of bounds: ({}, {}, {})", x, y, z);
            return VoxelRecord::EMPTY;
        }
        self.voxels[flat_index(x, y, z)]
    }

    /// Gameplay mutation: writes a voxel, marks the chunk modified and its
    /// derived state dirty.
    ///
    /// No-op with a warning log if the index is out of range.
    pub fn set(&mut self, index: usize, voxel: VoxelRecord) {
        let Some(slot) = self.voxels.get_mut(index) else {
            tracing::warn!("Chunk::set out of bounds: {}", index);
            return;
        };
        if slot.type_id != voxel.type_id {
            self.rotations.remove(&(index as u16));
        }
        *slot = voxel;
        self.modified = true;
        self.dirty |= ALL_DIRTY;
        self.version += 1;
    }

    /// Raw voxel array.
    pub fn voxels(&self) -> &[VoxelRecord] {
        &self.voxels
    }

    /// Raw mutable voxel array for generators and loaders.
    ///
    /// Callers manage the population, modification and dirty flags themselves.
    pub fn voxels_mut(&mut self) -> &mut [VoxelRecord] {
        &mut self.voxels
    }

    /// Whether the terrain generator has filled this chunk at least once.
    pub fn is_populated(&self) -> bool {
        self.is_populated
    }

    /// Sets the populated flag.
    pub fn set_populated(&mut self, populated: bool) {
        self.is_populated = populated;
    }

    /// Whether gameplay changed the chunk since population.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Sets the modified flag.
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Whether the chunk lies above the terrain surface.
    pub fn is_above_surface(&self) -> bool {
        self.is_above_surface
    }

    /// Sets the above-surface flag.
    pub fn set_above_surface(&mut self, above: bool) {
        self.is_above_surface = above;
    }

    /// Attached light sources.
    pub fn light_sources(&self) -> &[LightSource] {
        &self.light_sources
    }

    /// Attaches a light source.
    pub fn add_light_source(&mut self, source: LightSource) {
        self.light_sources.push(source);
        self.dirty |= LIGHT_DIRTY;
    }

    /// Detaches every light source on a voxel. Returns how many were removed.
    pub fn remove_light_sources_at(&mut self, voxel_index: u16) -> usize {
        let before = self.light_sources.len();
        self.light_sources.retain(|s| s.voxel_index != voxel_index);
        let removed = before - self.light_sources.len();
        if removed > 0 {
            self.dirty |= LIGHT_DIRTY;
        }
        removed
    }

    /// Whether a light source is attached to the voxel.
    pub fn has_light_source_at(&self, voxel_index: usize) -> bool {
        self.light_sources
            .iter()
            .any(|s| s.voxel_index as usize == voxel_index)
    }

    /// Items lying in this chunk.
    pub fn spawned_items(&self) -> &[SpawnedItem] {
        &self.spawned_items
    }

    /// Records an item lying in this chunk.
    pub fn add_spawned_item(&mut self, item: SpawnedItem) {
        self.spawned_items.push(item);
    }

    /// Removes all item records.
    pub fn clear_spawned_items(&mut self) {
        self.spawned_items.clear();
    }

    /// Drops every light source, spawned item and custom rotation, leaving
    /// only the voxel array. Used before repainting generated contents.
    pub fn clear_attachments(&mut self) {
        if !self.light_sources.is_empty() {
            self.dirty |= LIGHT_DIRTY;
        }
        if !self.rotations.is_empty() {
            self.dirty |= MESH_DIRTY;
        }
        self.light_sources.clear();
        self.spawned_items.clear();
        self.rotations.clear();
    }

    /// Euler rotation of a custom-render voxel, if one was set.
    pub fn rotation(&self, voxel_index: usize) -> Option<Vec3> {
        self.rotations.get(&(voxel_index as u16)).copied()
    }

    /// Sets the Euler rotation of a custom-render voxel.
    pub fn set_rotation(&mut self, voxel_index: usize, euler: Vec3) {
        if voxel_index < CHUNK_VOLUME {
            self.rotations.insert(voxel_index as u16, euler);
            self.dirty |= MESH_DIRTY;
        }
    }

    /// Cached neighbor handle on a face.
    pub fn neighbor(&self, face: Face) -> Option<ChunkHandle> {
        self.neighbors[face.index()]
    }

    pub(crate) fn set_neighbor(&mut self, face: Face, handle: Option<ChunkHandle>) {
        self.neighbors[face.index()] = handle;
    }

    /// Drops every cached neighbor link.
    pub fn clear_neighbors(&mut self) {
        self.neighbors = [None; 6];
    }

    /// Returns the current dirty flags.
    pub fn dirty_flags(&self) -> u8 {
        self.dirty
    }

    /// Returns `true` if the specified dirty flag (or combination) is set.
    pub fn is_dirty(&self, flag: u8) -> bool {
        self.dirty & flag == flag
    }

    /// Marks specific dirty flags.
    pub fn mark_dirty(&mut self, flags: u8) {
        self.dirty |= flags;
    }

    /// Clears the specified dirty flag bits.
    pub fn clear_dirty(&mut self, flags: u8) {
        self.dirty &= !flags;
    }

    /// Returns the mutation counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Exchanges voxel contents and attachments with another chunk.
    ///
    /// Positions, neighbor links and flags other than `is_populated` stay
    /// with their owner. Used to publish chunks populated off-thread.
    pub fn swap_contents(&mut self, other: &mut Chunk) {
        std::mem::swap(&mut self.voxels, &mut other.voxels);
        std::mem::swap(&mut self.rotations, &mut other.rotations);
        std::mem::swap(&mut self.light_sources, &mut other.light_sources);
        std::mem::swap(&mut self.spawned_items, &mut other.spawned_items);
        std::mem::swap(&mut self.is_populated, &mut other.is_populated);
        std::mem::swap(&mut self.is_above_surface, &mut other.is_above_surface);
        self.dirty |= ALL_DIRTY;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
