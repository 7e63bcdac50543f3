//! Chunk change event buffering.
//!
//! [`ChunkEventBuffer`] is a [`ChunkObserver`] that records every notification
//! so downstream systems (meshing, lighting, entity spawning) can drain them
//! once per frame. Events are double-buffered: events written in the current
//! frame are readable in the current and next frame.

use glam::IVec3;

use crate::chunk::{LightSource, SpawnedItem};
use crate::collaborators::ChunkObserver;

/// A single recorded notification.
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkEvent {
    /// Persistent content changed.
    Modified(IVec3),
    /// Mesh/light rebuild requested.
    RefreshRequested(IVec3),
    /// A loader reattached a light source.
    LightSourceAttached(IVec3, LightSource),
    /// A loader respawned an item.
    ItemSpawned(IVec3, SpawnedItem),
}

/// Double-buffered event storage.
///
/// Call [`swap`](ChunkEventBuffer::swap) once per frame.
#[derive(Debug, Default)]
pub struct ChunkEventBuffer {
    /// Events from the previous frame (readable).
    prev: Vec<ChunkEvent>,
    /// Events from the current frame (being written).
    current: Vec<ChunkEvent>,
}

impl ChunkEventBuffer {
    /// Creates a new empty event buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event.
    pub fn send(&mut self, event: ChunkEvent) {
        self.current.push(event);
    }

    /// Returns all readable events (previous + current frame).
    pub fn read(&self) -> impl Iterator<Item = &ChunkEvent> {
        self.prev.iter().chain(self.current.iter())
    }

    /// Coordinates with a pending refresh request, deduplicated, in request order.
    pub fn refresh_targets(&self) -> Vec<IVec3> {
        let mut targets = Vec::new();
        for event in self.read() {
            if let ChunkEvent::RefreshRequested(coord) = event
                && !targets.contains(coord)
            {
                targets.push(*coord);
            }
        }
        targets
    }

    /// Returns the number of readable events.
    pub fn len(&self) -> usize {
        self.prev.len() + self.current.len()
    }

    /// Returns `true` if there are no readable events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the frame: previous events are dropped, current becomes previous.
    pub fn swap(&mut self) {
        self.prev.clear();
        std::mem::swap(&mut self.prev, &mut self.current);
    }

    /// Clears both buffers.
    pub fn clear(&mut self) {
        self.prev.clear();
        self.current.clear();
    }
}

impl ChunkObserver for ChunkEventBuffer {
    fn chunk_modified(&mut self, coord: IVec3) {
        self.send(ChunkEvent::Modified(coord));
    }

    fn refresh_requested(&mut self, coord: IVec3) {
        self.send(ChunkEvent::RefreshRequested(coord));
    }

    fn light_source_attached(&mut self, coord: IVec3, source: &LightSource) {
        self.send(ChunkEvent::LightSourceAttached(coord, *source));
    }

    fn item_spawned(&mut self, coord: IVec3, item: &SpawnedItem) {
        self.send(ChunkEvent::ItemSpawned(coord, *item));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_survive_one_swap() {
        let mut buffer = ChunkEventBuffer::new();
        buffer.chunk_modified(IVec3::ZERO);
        assert_eq!(buffer.len(), 1);

        buffer.swap();
        assert_eq!(buffer.len(), 1);

        buffer.swap();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_refresh_targets_deduplicated() {
        let mut buffer = ChunkEventBuffer::new();
        buffer.refresh_requested(IVec3::X);
        buffer.chunk_modified(IVec3::X);
        buffer.refresh_requested(IVec3::X);
        buffer.refresh_requested(IVec3::Y);
        assert_eq!(buffer.refresh_targets(), vec![IVec3::X, IVec3::Y]);
    }

    #[test]
    fn test_clear_empties_both_frames() {
        let mut buffer = ChunkEventBuffer::new();
        buffer.chunk_modified(IVec3::ZERO);
        buffer.swap();
        buffer.refresh_requested(IVec3::ZERO);
        buffer.clear();
        assert!(buffer.is_empty());
    }
}
