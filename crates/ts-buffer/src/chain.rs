//! Owning container for a time-ordered run of chunks.
//!
//! Cursors only hold weak references; the chain is what keeps chunks alive.
//! It enforces ordering and performs releases, but deciding *when* to add or
//! evict a chunk is left to its owner.

use std::collections::VecDeque;
use std::sync::Arc;

use ts_core::{Error, Result};

use crate::chunk::SampleChunk;

#[derive(Debug, Default)]
pub struct ChunkChain {
    chunks: VecDeque<Arc<SampleChunk>>,
}

impl ChunkChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the newest chunk. Start positions must strictly increase.
    pub fn push(&mut self, chunk: Arc<SampleChunk>) -> Result<()> {
        if let Some(last) = self.chunks.back() {
            if last.start_position_us() >= chunk.start_position_us() {
                return Err(Error::invariant(format!(
                    "chunk starting at {}us cannot follow a chunk starting at {}us",
                    chunk.start_position_us(),
                    last.start_position_us()
                )));
            }
        }
        self.chunks.push_back(chunk);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn first(&self) -> Option<&Arc<SampleChunk>> {
        self.chunks.front()
    }

    pub fn last(&self) -> Option<&Arc<SampleChunk>> {
        self.chunks.back()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<SampleChunk>> {
        self.chunks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SampleChunk>> {
        self.chunks.iter()
    }

    /// Bytes currently known to be stored across the chain.
    pub fn total_size(&self) -> u64 {
        self.chunks.iter().map(|c| c.size()).sum()
    }

    /// The chunk whose time range contains `position_us`: the last one
    /// starting at or before it. Positions before the oldest chunk map to
    /// the oldest chunk.
    pub fn find_by_position(&self, position_us: i64) -> Option<&Arc<SampleChunk>> {
        let idx = self
            .chunks
            .partition_point(|c| c.start_position_us() <= position_us);
        self.chunks.get(idx.saturating_sub(1))
    }

    /// Remove and release the oldest chunk.
    pub fn release_oldest(&mut self, delete: bool) -> Option<Arc<SampleChunk>> {
        let chunk = self.chunks.pop_front()?;
        chunk.release(delete);
        Some(chunk)
    }

    /// Release every chunk, oldest first.
    pub fn release_all(&mut self, delete: bool) {
        while self.release_oldest(delete).is_some() {}
    }
}
