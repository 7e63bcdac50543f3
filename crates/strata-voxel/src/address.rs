//! Chunk coordinate → pool slot index.
//!
//! The [`ChunkAddressSpace`] maps an integer chunk coordinate to a direct
//! address inside fixed world extents, then stores entries in an
//! [`FxHashMap`](rustc_hash::FxHashMap) keyed by that address. The address
//! is collision-free within the declared extents, so lookup is O(1) amortized
//! over an effectively unbounded coordinate space while memory grows only with
//! the number of live chunks.

use glam::IVec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chunk::ChunkHandle;

/// Half-extents of the addressable world in chunk units.
///
/// A coordinate is in bounds when `-W <= c < W` on every axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldExtents {
    /// Half-extent on X.
    pub x: i32,
    /// Half-extent on Y.
    pub y: i32,
    /// Half-extent on Z.
    pub z: i32,
}

impl WorldExtents {
    /// Creates extents; each axis is raised to at least 1.
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: x.max(1),
            y: y.max(1),
            z: z.max(1),
        }
    }

    /// Whether a chunk coordinate lies within the extents.
    pub fn contains(&self, coord: IVec3) -> bool {
        (-self.x..self.x).contains(&coord.x)
            && (-self.y..self.y).contains(&coord.y)
            && (-self.z..self.z).contains(&coord.z)
    }

    /// Number of distinct addresses, or `None` if the extents span more
    /// coordinates than a `u64` key can hold.
    pub fn span_volume(&self) -> Option<u64> {
        let [sx, sy, sz] = self.spans();
        sx.checked_mul(sy)?.checked_mul(sz)
    }

    /// Whether every in-bounds coordinate has a distinct key.
    pub fn is_addressable(&self) -> bool {
        self.span_volume().is_some()
    }

    /// Direct address of an in-bounds coordinate:
    /// `Sz·Sy·(cx+Wx) + Sz·(cy+Wy) + (cz+Wz)` with `S = 2W`.
    ///
    /// `None` for out-of-bounds coordinates and for keys past `u64::MAX`,
    /// which only oversized extents can produce.
    pub fn address(&self, coord: IVec3) -> Option<u64> {
        if !self.contains(coord) {
            return None;
        }
        let [_, span_y, span_z] = self.spans();
        let ox = (coord.x as i64 + self.x as i64) as u64;
        let oy = (coord.y as i64 + self.y as i64) as u64;
        let oz = (coord.z as i64 + self.z as i64) as u64;
        span_z
            .checked_mul(span_y)?
            .checked_mul(ox)?
            .checked_add(span_z.checked_mul(oy)?)?
            .checked_add(oz)
    }

    fn spans(&self) -> [u64; 3] {
        [
            2 * self.x as u64,
            2 * self.y as u64,
            2 * self.z as u64,
        ]
    }

    /// As an [`IVec3`], for error reporting.
    pub fn as_ivec3(&self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl Default for WorldExtents {
    fn default() -> Self {
        Self::new(1024, 64, 1024)
    }
}

/// Value stored per live chunk coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedChunkEntry {
    /// Generation-checked reference to the chunk.
    pub handle: ChunkHandle,
    /// Backing slot in the pool.
    pub slot_index: usize,
}

impl CachedChunkEntry {
    /// Entry for a handle.
    pub fn new(handle: ChunkHandle) -> Self {
        Self {
            handle,
            slot_index: handle.slot(),
        }
    }
}

/// Errors raised by address-space mutation.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The coordinate lies outside the declared world extents.
    #[error("chunk coordinate {coord} is outside world extents ±{extents}")]
    OutOfWorldBounds {
        /// Offending coordinate.
        coord: IVec3,
        /// Declared half-extents.
        extents: IVec3,
    },
    /// The coordinate is in bounds but its key does not fit in a `u64`.
    #[error("chunk coordinate {coord} has no key: extents ±{extents} are too large")]
    KeyOverflow {
        /// Offending coordinate.
        coord: IVec3,
        /// Declared half-extents.
        extents: IVec3,
    },
}

/// Non-owning index from chunk coordinate to pool slot.
pub struct ChunkAddressSpace {
    extents: WorldExtents,
    entries: FxHashMap<u64, CachedChunkEntry>,
}

impl ChunkAddressSpace {
    /// Creates an empty address space.
    pub fn new(extents: WorldExtents) -> Self {
        Self {
            extents,
            entries: FxHashMap::default(),
        }
    }

    /// Creates an empty address space sized for `capacity` chunks.
    pub fn with_capacity(extents: WorldExtents, capacity: usize) -> Self {
        let mut entries = FxHashMap::default();
        entries.reserve(capacity);
        Self { extents, entries }
    }

    /// Declared extents.
    pub fn extents(&self) -> WorldExtents {
        self.extents
    }

    /// Address of a coordinate.
    ///
    /// # Errors
    ///
    /// [`AddressError::OutOfWorldBounds`] if the coordinate is outside the extents.
    pub fn key(&self, coord: IVec3) -> Result<u64, AddressError> {
        let extents = self.extents.as_ivec3();
        if !self.extents.contains(coord) {
            return Err(AddressError::OutOfWorldBounds { coord, extents });
        }
        self.extents
            .address(coord)
            .ok_or(AddressError::KeyOverflow { coord, extents })
    }

    /// Looks up a chunk. Out-of-bounds coordinates are simply not found.
    pub fn lookup(&self, coord: IVec3) -> Option<CachedChunkEntry> {
        let key = self.extents.address(coord)?;
        self.entries.get(&key).copied()
    }

    /// Inserts or replaces the entry for a coordinate, returning the old one.
    ///
    /// # Errors
    ///
    /// [`AddressError::OutOfWorldBounds`] if the coordinate is outside the extents.
    pub fn insert(
        &mut self,
        coord: IVec3,
        entry: CachedChunkEntry,
    ) -> Result<Option<CachedChunkEntry>, AddressError> {
        let key = self.key(coord)?;
        Ok(self.entries.insert(key, entry))
    }

    /// Removes and returns the entry for a coordinate.
    ///
    /// # Errors
    ///
    /// [`AddressError::OutOfWorldBounds`] if the coordinate is outside the extents.
    pub fn remove(&mut self, coord: IVec3) -> Result<Option<CachedChunkEntry>, AddressError> {
        let key = self.key(coord)?;
        Ok(self.entries.remove(&key))
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no chunk is addressed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry, keeping the table's capacity.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
