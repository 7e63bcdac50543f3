//! Background chunk population.
//!
//! Terrain generation runs on one worker thread over detached [`Chunk`]
//! buffers that are not reachable from the address space. The main thread
//! drains finished chunks and publishes them with
//! [`ChunkPool::adopt`](strata_voxel::ChunkPool::adopt), which swaps storage
//! into a pool slot. The buffer handed back by `adopt` is recycled for the
//! next request, so steady-state population does not allocate voxel memory.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, unbounded};
use glam::IVec3;
use rustc_hash::FxHashMap;
use strata_voxel::{Chunk, TerrainGenerator};

/// A generated chunk ready to be published.
#[derive(Debug)]
pub struct PopulatedChunk {
    /// Chunk coordinate the buffer was populated for.
    pub coord: IVec3,
    /// Populated, detached chunk.
    pub chunk: Chunk,
    /// Generation time in microseconds (for profiling).
    pub generation_time_us: u64,
}

/// A request travelling to the worker, carrying the buffer to fill.
struct PopulationTask {
    coord: IVec3,
    buffer: Chunk,
    cancelled: Arc<AtomicBool>,
}

/// A result travelling back, tagged with the request's cancellation flag so
/// results of superseded requests can be told apart.
struct WorkerResult {
    populated: PopulatedChunk,
    cancelled: Arc<AtomicBool>,
}

/// Runs a [`TerrainGenerator`] on a dedicated worker thread.
pub struct BackgroundPopulator {
    task_sender: Option<Sender<PopulationTask>>,
    result_receiver: Receiver<WorkerResult>,
    /// Cancellation flag of the live request per coordinate.
    pending: FxHashMap<IVec3, Arc<AtomicBool>>,
    /// Buffers returned by [`recycle`](Self::recycle).
    spare: Vec<Chunk>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundPopulator {
    /// Spawns the worker. At most `queue_capacity` requests wait at once.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn new(
        generator: Arc<dyn TerrainGenerator>,
        queue_capacity: usize,
    ) -> std::io::Result<Self> {
        let (task_sender, task_receiver) = bounded::<PopulationTask>(queue_capacity.max(1));
        let (result_sender, result_receiver) = unbounded::<WorkerResult>();

        let worker = std::thread::Builder::new()
            .name("chunk-populate-worker".into())
            .spawn(move || {
                while let Ok(task) = task_receiver.recv() {
                    let PopulationTask {
                        coord,
                        mut buffer,
                        cancelled,
                    } = task;
                    if cancelled.load(Ordering::Relaxed) {
                        continue;
                    }

                    let start = Instant::now();
                    buffer.reset(coord);
                    generator.populate(&mut buffer);
                    buffer.set_populated(true);
                    let elapsed = start.elapsed().as_micros() as u64;

                    if cancelled.load(Ordering::Relaxed) {
                        continue;
                    }
                    let result = WorkerResult {
                        populated: PopulatedChunk {
                            coord,
                            chunk: buffer,
                            generation_time_us: elapsed,
                        },
                        cancelled,
                    };
                    if result_sender.send(result).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            task_sender: Some(task_sender),
            result_receiver,
            pending: FxHashMap::default(),
            spare: Vec::new(),
            worker: Some(worker),
        })
    }

    /// Queues population of `coord`.
    ///
    /// Returns `Err(coord)` if a request for it is already pending or the
    /// queue is full.
    pub fn submit(&mut self, coord: IVec3) -> Result<(), IVec3> {
        if self.pending.contains_key(&coord) {
            return Err(coord);
        }
        let Some(sender) = &self.task_sender else {
            return Err(coord);
        };

        let buffer = self.spare.pop().unwrap_or_else(|| Chunk::new(coord));
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = PopulationTask {
            coord,
            buffer,
            cancelled: Arc::clone(&cancelled),
        };
        match sender.try_send(task) {
            Ok(()) => {
                self.pending.insert(coord, cancelled);
                Ok(())
            }
            Err(TrySendError::Full(task) | TrySendError::Disconnected(task)) => {
                self.spare.push(task.buffer);
                tracing::debug!("Population queue rejected chunk {}", coord);
                Err(coord)
            }
        }
    }

    /// Cancels a pending request. No-op if none is pending.
    pub fn cancel(&mut self, coord: IVec3) {
        if let Some(cancelled) = self.pending.remove(&coord) {
            cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Collects every finished request. Call once per tick on the main
    /// thread. Results of cancelled requests are recycled, not returned.
    pub fn drain_results(&mut self) -> Vec<PopulatedChunk> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_receiver.try_recv() {
            let coord = result.populated.coord;
            let live = self
                .pending
                .get(&coord)
                .is_some_and(|flag| Arc::ptr_eq(flag, &result.cancelled));
            if live {
                self.pending.remove(&coord);
                results.push(result.populated);
            } else {
                self.spare.push(result.populated.chunk);
            }
        }
        results
    }

    /// Returns a buffer for reuse by later requests.
    pub fn recycle(&mut self, chunk: Chunk) {
        self.spare.push(chunk);
    }

    /// Whether a request for `coord` is queued or running.
    pub fn is_pending(&self, coord: IVec3) -> bool {
        self.pending.contains_key(&coord)
    }

    /// Number of requests not yet drained.
    pub fn in_flight_count(&self) -> usize {
        self.pending.len()
    }

    /// Number of buffers waiting for reuse.
    pub fn spare_buffers(&self) -> usize {
        self.spare.len()
    }
}

impl Drop for BackgroundPopulator {
    fn drop(&mut self) {
        for cancelled in self.pending.values() {
            cancelled.store(true, Ordering::Relaxed);
        }
        // Closing the queue ends the worker loop.
        self.task_sender.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("Chunk population worker panicked");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
