//! Helpers shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;
use ts_core::{BufferConfig, ChunkId};

use crate::callback::ChunkCallback;
use crate::chunk::SampleChunk;
use crate::factory::SampleChunkCreator;
use crate::pool::HeapPool;
use crate::sample::{Sample, SampleFlags};

/// Counts notifications and remembers which chunks they were for.
#[derive(Default)]
pub struct CountingCallback {
    pub finished: AtomicUsize,
    pub deleted: AtomicUsize,
    pub finished_ids: Mutex<Vec<ChunkId>>,
}

impl CountingCallback {
    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn deleted(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }
}

impl ChunkCallback for CountingCallback {
    fn on_chunk_finished(&self, chunk: &SampleChunk) {
        self.finished.fetch_add(1, Ordering::SeqCst);
        self.finished_ids.lock().push(chunk.id());
    }

    fn on_chunk_deleted(&self, _chunk: &SampleChunk) {
        self.deleted.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub creator: SampleChunkCreator,
    pub callback: Arc<CountingCallback>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
            creator: SampleChunkCreator::new(BufferConfig::default()),
            callback: Arc::new(CountingCallback::default()),
        }
    }

    pub fn chunk(&self, name: &str, start_position_us: i64) -> Arc<SampleChunk> {
        self.creator.create_new(
            Arc::new(HeapPool),
            self.dir.path().join(name),
            start_position_us,
            self.callback.clone(),
        )
    }

    pub fn load(
        &self,
        name: &str,
        start_position_us: i64,
        prev: Option<&Arc<SampleChunk>>,
    ) -> Arc<SampleChunk> {
        self.creator
            .load_existing(
                Arc::new(HeapPool),
                self.dir.path(),
                name,
                start_position_us,
                self.callback.clone(),
                prev,
            )
            .expect("failed to load chunk")
    }
}

pub fn sample(flags: SampleFlags, timestamp_us: i64, len: usize) -> Sample {
    let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_add(timestamp_us as u8)).collect();
    Sample::new(flags, timestamp_us, &payload[..])
}
