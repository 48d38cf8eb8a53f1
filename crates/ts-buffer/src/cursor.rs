//! Read and write positions over a chain of chunks.
//!
//! A [`ChunkCursor`] drives either the single write role or one read role.
//! It refers to its current chunk weakly: the chain owner decides when a
//! chunk goes away, and a cursor left pointing at a released chunk fails
//! loudly instead of keeping the file alive.

use std::sync::{Arc, Weak};

use ts_core::{Error, Result};

use crate::chunk::SampleChunk;
use crate::sample::Sample;

/// A chunk plus a byte offset inside it.
#[derive(Debug, Default)]
pub struct ChunkCursor {
    chunk: Option<Weak<SampleChunk>>,
    offset: u64,
}

impl ChunkCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a read cursor has run off the end of the chain (or was
    /// never opened).
    pub fn is_read_finished(&self) -> bool {
        self.chunk.is_none()
    }

    /// The chunk the next operation applies to.
    pub fn chunk(&self) -> Option<Arc<SampleChunk>> {
        self.chunk.as_ref().and_then(Weak::upgrade)
    }

    /// Byte offset of the next operation inside the current chunk.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Start position of the current chunk, or 0 without one.
    pub fn start_position_us(&self) -> i64 {
        self.chunk().map_or(0, |c| c.start_position_us())
    }

    pub(crate) fn is_on(&self, chunk: &SampleChunk) -> bool {
        self.chunk
            .as_ref()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), chunk))
    }

    pub(crate) fn advance_to(&mut self, offset: u64) {
        self.offset = offset;
    }

    fn current(&self) -> Result<Option<Arc<SampleChunk>>> {
        match self.chunk.as_ref() {
            None => Ok(None),
            Some(weak) => weak
                .upgrade()
                .map(Some)
                .ok_or_else(|| Error::invariant("cursor refers to a released chunk")),
        }
    }

    fn reset(&mut self, chunk: Option<&Arc<SampleChunk>>, offset: u64) {
        self.chunk = chunk.map(Arc::downgrade);
        self.offset = offset;
    }

    /// Position the cursor for reading `chunk` from `offset`, giving up read
    /// access to whatever chunk it held before.
    pub fn open_read(&mut self, chunk: &Arc<SampleChunk>, offset: u64) -> Result<()> {
        if let Some(prev) = self.chunk() {
            prev.close_read()?;
            self.reset(None, 0);
        }
        chunk.open_read()?;
        self.reset(Some(chunk), offset);
        tracing::debug!(chunk = %chunk.id(), offset, "opened read cursor");
        Ok(())
    }

    /// Position the cursor at the start of `chunk` for writing. A chunk held
    /// before is finalized without a successor.
    pub fn open_write(&mut self, chunk: &Arc<SampleChunk>) -> Result<()> {
        if let Some(prev) = self.chunk() {
            prev.close_write(None)?;
        }
        chunk.open_write()?;
        self.reset(Some(chunk), 0);
        Ok(())
    }

    /// Read the next sample, following forward links across finished chunks.
    ///
    /// Returns `Ok(None)` both at the live edge and at the end of the chain;
    /// [`is_read_finished`](Self::is_read_finished) tells them apart.
    pub fn read(&mut self) -> Result<Option<Sample>> {
        let mut chunk = match self.current()? {
            Some(chunk) => chunk,
            None => return Ok(None),
        };

        while chunk.is_read_finished(self.offset) {
            let next = chunk.successor()?;
            if next.as_ref().is_some_and(|n| !n.is_ready_for_read()) {
                // linked, but the writer has not opened it yet
                return Ok(None);
            }
            chunk.close_read()?;
            // detached until the successor is open, so a failure below
            // cannot close `chunk` a second time
            self.reset(None, 0);
            if let Some(next) = &next {
                next.open_read()?;
            }
            self.reset(next.as_ref(), 0);
            match next {
                Some(next) => {
                    tracing::debug!(from = %chunk.id(), to = %next.id(), "read cursor advanced");
                    chunk = next;
                }
                None => {
                    tracing::debug!(chunk = %chunk.id(), "read cursor reached end of chain");
                    return Ok(None);
                }
            }
        }

        match chunk.read(self) {
            Err(Error::ReadPastEnd {
                offset,
                write_offset,
            }) => {
                // writer finished between the exhaustion check and the read
                tracing::warn!(offset, write_offset, "tried to read sample over end of stream");
                Ok(None)
            }
            other => other,
        }
    }

    /// Write `sample`. When `next` is given, the current chunk is finalized
    /// and linked to it first, and the sample lands at the start of `next`.
    pub fn write(&mut self, sample: &Sample, next: Option<&Arc<SampleChunk>>) -> Result<()> {
        let mut chunk = self
            .current()?
            .ok_or_else(|| Error::invariant("write requested without a current chunk"))?;

        if let Some(next) = next {
            if chunk.has_successor() {
                return Err(Error::invariant(format!(
                    "requested rollover of chunk {} which already has a successor",
                    chunk.id()
                )));
            }
            if !chunk.activity().is_writing() {
                return Err(Error::invariant(format!(
                    "cursor does not hold write access to chunk {}",
                    chunk.id()
                )));
            }
            chunk.close_write(Some(next))?;
            chunk.notify_finished();
            next.open_write()?;
            self.reset(Some(next), 0);
            chunk = Arc::clone(next);
        }

        chunk.write(sample, self)
    }

    /// Finalize the current chunk without a successor, ending the recording.
    pub fn close_write(&mut self) -> Result<()> {
        if let Some(chunk) = self.current()? {
            chunk.close_write(None)?;
        }
        Ok(())
    }

    /// Give up read access and detach from the chain.
    pub fn close_read(&mut self) -> Result<()> {
        if let Some(chunk) = self.chunk() {
            chunk.close_read()?;
        }
        self.reset(None, 0);
        Ok(())
    }

    /// Release `chunk` on behalf of its chain owner.
    pub fn release(chunk: &SampleChunk, delete: bool) {
        chunk.release(delete);
    }
}
