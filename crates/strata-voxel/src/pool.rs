//! Bounded chunk storage with slot reuse.
//!
//! The [`ChunkPool`] is the single owner of chunk memory. It never holds more
//! than `max_chunks` live slots: once the ceiling is reached, requesting a new
//! coordinate reclaims the unmodified chunk farthest from the distance anchor
//! and reinitializes its slot in place. The pool also owns the
//! [`ChunkAddressSpace`] so the two can never disagree about which chunks are
//! live.

use glam::IVec3;
use thiserror::Error;

use crate::address::{AddressError, CachedChunkEntry, ChunkAddressSpace, WorldExtents};
use crate::chunk::{ALL_DIRTY, Chunk, ChunkHandle};
use crate::collaborators::TerrainGenerator;
use crate::coords::Face;

/// Errors raised by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Every live chunk is modified or pinned, so no slot can be reclaimed.
    ///
    /// The ceiling is too low for the configured view distance.
    #[error("chunk pool exhausted: all {max_chunks} slots hold modified or pinned chunks")]
    Exhausted {
        /// Configured ceiling.
        max_chunks: usize,
    },
    /// The coordinate cannot be addressed.
    #[error(transparent)]
    Address(#[from] AddressError),
    /// The handle refers to a slot that has since been reclaimed.
    #[error("stale chunk handle for slot {0}")]
    StaleHandle(usize),
}

/// One pre-allocated chunk plus its lifecycle state.
struct ChunkSlot {
    chunk: Chunk,
    /// Chunk coordinate if live, `None` if in the free list.
    coord: Option<IVec3>,
    /// Bumped every time the slot is released.
    generation: u32,
    /// Source or target of an in-flight write; never reclaimed.
    pinned: bool,
}

impl ChunkSlot {
    fn handle(&self, slot: usize) -> ChunkHandle {
        ChunkHandle {
            slot: slot as u32,
            generation: self.generation,
        }
    }

    fn is_reclaimable(&self) -> bool {
        self.coord.is_some() && !self.pinned && !self.chunk.is_modified()
    }
}

/// Owner of all chunk storage, bounded by `max_chunks`.
pub struct ChunkPool {
    max_chunks: usize,
    slots: Vec<ChunkSlot>,
    /// Released slot indices ready for reuse.
    free: Vec<usize>,
    address_space: ChunkAddressSpace,
    /// Reclamation prefers chunks far from this chunk coordinate.
    anchor: IVec3,
}

impl ChunkPool {
    /// Creates an empty pool. Slot storage for `max_chunks` is reserved up
    /// front and chunks are allocated on first use, never past the ceiling.
    pub fn new(max_chunks: usize, extents: WorldExtents) -> Self {
        let max_chunks = max_chunks.max(1);
        Self {
            max_chunks,
            slots: Vec::with_capacity(max_chunks),
            free: Vec::new(),
            address_space: ChunkAddressSpace::with_capacity(extents, max_chunks),
            anchor: IVec3::ZERO,
        }
    }

    /// Configured ceiling.
    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Number of live chunks.
    pub fn live_count(&self) -> usize {
        self.address_space.len()
    }

    /// Number of chunk allocations made so far (≤ `max_chunks`).
    pub fn allocated_slots(&self) -> usize {
        self.slots.len()
    }

    /// The coordinate index.
    pub fn address_space(&self) -> &ChunkAddressSpace {
        &self.address_space
    }

    /// Current distance anchor (chunk coordinate).
    pub fn anchor(&self) -> IVec3 {
        self.anchor
    }

    /// Moves the distance anchor, typically to the viewer's chunk.
    pub fn set_anchor(&mut self, anchor: IVec3) {
        self.anchor = anchor;
    }

    /// Handle of a live chunk, if any.
    pub fn get_existing(&self, coord: IVec3) -> Option<ChunkHandle> {
        self.address_space.lookup(coord).map(|entry| entry.handle)
    }

    /// Returns the chunk at `coord`, creating it if needed.
    ///
    /// With `populate == false` a new chunk is structurally valid but empty
    /// and unpopulated, suitable as a loader's write target. With
    /// `populate == true` an unpopulated chunk (new or existing) is filled by
    /// the generator; the handle of an existing chunk is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`PoolError::Address`] for out-of-bounds coordinates and
    /// [`PoolError::Exhausted`] when the ceiling is reached and nothing can
    /// be reclaimed.
    pub fn get_or_create(
        &mut self,
        coord: IVec3,
        populate: bool,
        generator: &dyn TerrainGenerator,
    ) -> Result<ChunkHandle, PoolError> {
        let handle = match self.get_existing(coord) {
            Some(handle) => handle,
            None => self.acquire_slot(coord)?,
        };

        if populate {
            let chunk = &mut self.slots[handle.slot()].chunk;
            if !chunk.is_populated() {
                generator.populate(chunk);
                chunk.set_populated(true);
                chunk.mark_dirty(ALL_DIRTY);
                tracing::trace!("Populated chunk {}", coord);
            }
        }

        Ok(handle)
    }

    /// Reclaims the unmodified, unpinned chunk farthest from the anchor and
    /// returns its former coordinate.
    ///
    /// # Errors
    ///
    /// [`PoolError::Exhausted`] if no live chunk qualifies.
    pub fn reclaim_farthest(&mut self) -> Result<IVec3, PoolError> {
        let anchor = self.anchor;
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_reclaimable())
            .filter_map(|(index, slot)| slot.coord.map(|c| (index, c)))
            .max_by_key(|(index, coord)| (distance_sq(*coord, anchor), std::cmp::Reverse(*index)));

        let Some((index, coord)) = victim else {
            tracing::error!(
                "Chunk pool exhausted: {} live chunks, none reclaimable",
                self.live_count()
            );
            return Err(PoolError::Exhausted {
                max_chunks: self.max_chunks,
            });
        };

        self.release_slot(index);
        tracing::debug!("Reclaimed chunk {} (slot {})", coord, index);
        Ok(coord)
    }

    /// Explicitly unloads a chunk regardless of its modified flag.
    ///
    /// # Errors
    ///
    /// [`PoolError::StaleHandle`] if the handle is no longer live.
    pub fn release(&mut self, handle: ChunkHandle) -> Result<(), PoolError> {
        self.check(handle)?;
        self.release_slot(handle.slot());
        Ok(())
    }

    /// Releases every live chunk. Allocations are kept for reuse.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].coord.is_some() {
                self.release_slot(index);
            }
        }
        self.address_space.clear();
    }

    /// Publishes contents populated outside the pool.
    ///
    /// The detached chunk's storage is swapped into the slot for `coord`, so
    /// no voxel memory is allocated; afterwards `detached` holds the slot's
    /// previous (empty) storage and can be reused. A chunk that is already
    /// populated is left untouched.
    ///
    /// # Errors
    ///
    /// Same conditions as [`get_or_create`](Self::get_or_create).
    pub fn adopt(&mut self, coord: IVec3, detached: &mut Chunk) -> Result<ChunkHandle, PoolError> {
        let handle = match self.get_existing(coord) {
            Some(handle) => handle,
            None => self.acquire_slot(coord)?,
        };
        let chunk = &mut self.slots[handle.slot()].chunk;
        if chunk.is_populated() {
            tracing::debug!("Chunk {} already populated, dropping detached result", coord);
            return Ok(handle);
        }
        chunk.swap_contents(detached);
        chunk.set_populated(true);
        Ok(handle)
    }

    /// Repaints a chunk with generated contents and clears its modified flag,
    /// making it reclaimable again.
    ///
    /// # Errors
    ///
    /// [`PoolError::StaleHandle`] if the handle is no longer live.
    pub fn repaint(
        &mut self,
        handle: ChunkHandle,
        generator: &dyn TerrainGenerator,
    ) -> Result<(), PoolError> {
        self.check(handle)?;
        let chunk = &mut self.slots[handle.slot()].chunk;
        // Generators may override `paint_chunk`; attachments go regardless.
        chunk.clear_attachments();
        generator.paint_chunk(chunk);
        chunk.set_populated(true);
        chunk.set_modified(false);
        chunk.mark_dirty(ALL_DIRTY);
        Ok(())
    }

    /// Protects a chunk from reclamation while it is written.
    pub fn pin(&mut self, handle: ChunkHandle) -> Result<(), PoolError> {
        self.check(handle)?;
        self.slots[handle.slot()].pinned = true;
        Ok(())
    }

    /// Undoes [`pin`](Self::pin). Stale handles are ignored.
    pub fn unpin(&mut self, handle: ChunkHandle) {
        if self.check(handle).is_ok() {
            self.slots[handle.slot()].pinned = false;
        }
    }

    /// Immutable access to a live chunk.
    pub fn get(&self, handle: ChunkHandle) -> Option<&Chunk> {
        self.check(handle).ok()?;
        Some(&self.slots[handle.slot()].chunk)
    }

    /// Mutable access to a live chunk.
    pub fn get_mut(&mut self, handle: ChunkHandle) -> Option<&mut Chunk> {
        self.check(handle).ok()?;
        Some(&mut self.slots[handle.slot()].chunk)
    }

    /// Immutable access by coordinate.
    pub fn chunk_at(&self, coord: IVec3) -> Option<&Chunk> {
        self.get_existing(coord).and_then(|h| self.get(h))
    }

    /// Mutable access by coordinate.
    pub fn chunk_at_mut(&mut self, coord: IVec3) -> Option<&mut Chunk> {
        let handle = self.get_existing(coord)?;
        self.get_mut(handle)
    }

    /// Face-adjacent chunk, resolving and caching the link on both sides.
    pub fn neighbor(&mut self, handle: ChunkHandle, face: Face) -> Option<ChunkHandle> {
        self.check(handle).ok()?;
        let chunk = &self.slots[handle.slot()].chunk;
        if let Some(cached) = chunk.neighbor(face)
            && self.check(cached).is_ok()
        {
            return Some(cached);
        }
        let other = self.get_existing(chunk.coord() + face.offset())?;
        self.slots[handle.slot()].chunk.set_neighbor(face, Some(other));
        self.slots[other.slot()]
            .chunk
            .set_neighbor(face.opposite(), Some(handle));
        Some(other)
    }

    /// Face-adjacent chunk without caching; usable through a shared borrow.
    pub fn peek_neighbor(&self, handle: ChunkHandle, face: Face) -> Option<ChunkHandle> {
        let chunk = self.get(handle)?;
        chunk
            .neighbor(face)
            .filter(|&cached| self.check(cached).is_ok())
            .or_else(|| self.get_existing(chunk.coord() + face.offset()))
    }

    /// Iterates over live `(handle, chunk)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ChunkHandle, &Chunk)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.coord.is_some())
            .map(|(index, slot)| (slot.handle(index), &slot.chunk))
    }

    /// Handles of every live chunk with the modified flag set.
    pub fn modified_handles(&self) -> Vec<ChunkHandle> {
        self.iter()
            .filter(|(_, chunk)| chunk.is_modified())
            .map(|(handle, _)| handle)
            .collect()
    }

    fn check(&self, handle: ChunkHandle) -> Result<(), PoolError> {
        match self.slots.get(handle.slot()) {
            Some(slot) if slot.generation == handle.generation && slot.coord.is_some() => Ok(()),
            _ => Err(PoolError::StaleHandle(handle.slot())),
        }
    }

    /// Obtains a reset slot for `coord` and publishes it in the address space.
    fn acquire_slot(&mut self, coord: IVec3) -> Result<ChunkHandle, PoolError> {
        // Reject before reclaiming anything.
        self.address_space.key(coord)?;

        let index = if let Some(index) = self.free.pop() {
            index
        } else if self.slots.len() < self.max_chunks {
            self.slots.push(ChunkSlot {
                chunk: Chunk::new(coord),
                coord: None,
                generation: 0,
                pinned: false,
            });
            self.slots.len() - 1
        } else {
            self.reclaim_farthest()?;
            self.free.pop().ok_or(PoolError::Exhausted {
                max_chunks: self.max_chunks,
            })?
        };

        let slot = &mut self.slots[index];
        slot.chunk.reset(coord);
        slot.coord = Some(coord);
        slot.pinned = false;
        let handle = slot.handle(index);
        self.address_space
            .insert(coord, CachedChunkEntry::new(handle))?;
        Ok(handle)
    }

    /// Unpublishes a slot, invalidates outstanding handles and neighbor links.
    fn release_slot(&mut self, index: usize) {
        let Some(coord) = self.slots[index].coord.take() else {
            return;
        };
        for face in Face::ALL {
            if let Some(other) = self.slots[index].chunk.neighbor(face)
                && let Some(other_slot) = self.slots.get_mut(other.slot())
                && other_slot.generation == other.generation
            {
                other_slot.chunk.set_neighbor(face.opposite(), None);
            }
        }
        let slot = &mut self.slots[index];
        slot.chunk.clear_neighbors();
        slot.generation = slot.generation.wrapping_add(1);
        slot.pinned = false;
        // Coordinates of live slots always passed the bounds check.
        let _ = self.address_space.remove(coord);
        self.free.push(index);
    }
}

/// Squared Euclidean distance between two chunk coordinates.
fn distance_sq(a: IVec3, b: IVec3) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    let dz = (a.z - b.z) as i64;
    dx * dx + dy * dy + dz * dz
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
