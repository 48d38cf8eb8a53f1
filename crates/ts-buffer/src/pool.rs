//! Destination buffers for sample reads.

use std::collections::VecDeque;

use bytes::BytesMut;
use parking_lot::Mutex;

/// Supplies reusable buffers that receive payload bytes on read.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait SampleBufferPool: Send + Sync {
    /// Return an empty buffer whose capacity is at least `size` bytes.
    fn acquire(&self, size: usize) -> BytesMut;
}

/// Allocates a fresh buffer on every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapPool;

impl SampleBufferPool for HeapPool {
    fn acquire(&self, size: usize) -> BytesMut {
        BytesMut::with_capacity(size)
    }
}

/// Keeps a bounded stash of returned buffers and hands them out again.
#[derive(Debug)]
pub struct RecyclingPool {
    free: Mutex<VecDeque<BytesMut>>,
    max_pooled: usize,
}

impl RecyclingPool {
    /// Create a pool retaining at most `max_pooled` idle buffers.
    pub fn new(max_pooled: usize) -> Self {
        Self {
            free: Mutex::new(VecDeque::with_capacity(max_pooled)),
            max_pooled,
        }
    }

    /// Hand a buffer back once the caller is done with its sample.
    pub fn recycle(&self, mut buf: BytesMut) {
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_pooled {
            free.push_back(buf);
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

impl SampleBufferPool for RecyclingPool {
    fn acquire(&self, size: usize) -> BytesMut {
        let mut free = self.free.lock();
        if let Some(pos) = free.iter().position(|b| b.capacity() >= size) {
            if let Some(buf) = free.remove(pos) {
                return buf;
            }
        }
        drop(free);
        BytesMut::with_capacity(size)
    }
}
