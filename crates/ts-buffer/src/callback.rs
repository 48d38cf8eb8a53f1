//! Chunk lifecycle notification.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ts_core::events::{ChunkEvent, ChunkEventKind, EventBus};

use crate::chunk::SampleChunk;

/// Receives chunk lifecycle notifications.
///
/// Both methods are invoked synchronously on the thread driving the chunk,
/// exactly once per chunk and event. Implementations must be safe to share
/// across threads (`Send + Sync`).
pub trait ChunkCallback: Send + Sync {
    /// A chunk's write access was finalized and writing moved to its successor.
    fn on_chunk_finished(&self, _chunk: &SampleChunk) {}

    /// A chunk was released and its backing file removed.
    fn on_chunk_deleted(&self, _chunk: &SampleChunk) {}
}

/// Ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl ChunkCallback for NoopCallback {}

/// Tracks how many bytes finished chunks occupy on disk.
#[derive(Debug, Default)]
pub struct StorageUsage {
    bytes: AtomicU64,
}

impl StorageUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for chunks that already existed when the buffer was rebuilt.
    pub fn add_existing(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes currently held by finished chunks.
    pub fn total_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl ChunkCallback for StorageUsage {
    fn on_chunk_finished(&self, chunk: &SampleChunk) {
        self.bytes.fetch_add(chunk.size(), Ordering::Relaxed);
    }

    fn on_chunk_deleted(&self, chunk: &SampleChunk) {
        let size = chunk.size();
        let _ = self
            .bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(size))
            });
    }
}

/// Publishes lifecycle notifications on an [`EventBus`].
pub struct EventCallback {
    bus: Arc<EventBus>,
}

impl EventCallback {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    fn publish(&self, kind: ChunkEventKind, chunk: &SampleChunk) {
        self.bus.publish(ChunkEvent::new(
            kind,
            chunk.id(),
            chunk.path().to_path_buf(),
            chunk.start_position_us(),
            chunk.size(),
        ));
    }
}

impl ChunkCallback for EventCallback {
    fn on_chunk_finished(&self, chunk: &SampleChunk) {
        self.publish(ChunkEventKind::Finished, chunk);
    }

    fn on_chunk_deleted(&self, chunk: &SampleChunk) {
        self.publish(ChunkEventKind::Deleted, chunk);
    }
}

/// Fans a notification out to several callbacks in order.
pub struct CallbackSet {
    callbacks: Vec<Arc<dyn ChunkCallback>>,
}

impl CallbackSet {
    pub fn new(callbacks: Vec<Arc<dyn ChunkCallback>>) -> Self {
        Self { callbacks }
    }
}

impl ChunkCallback for CallbackSet {
    fn on_chunk_finished(&self, chunk: &SampleChunk) {
        for cb in &self.callbacks {
            cb.on_chunk_finished(chunk);
        }
    }

    fn on_chunk_deleted(&self, chunk: &SampleChunk) {
        for cb in &self.callbacks {
            cb.on_chunk_deleted(chunk);
        }
    }
}
