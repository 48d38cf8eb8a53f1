//! One file segment of the buffered stream.
//!
//! A [`SampleChunk`] owns a single backing file holding a contiguous run of
//! time-ordered sample records. The file handle is opened lazily by the
//! first role that needs it and dropped as soon as neither a reader nor the
//! writer holds the chunk open.
//!
//! The writer publishes `write_offset` with release ordering after the
//! record bytes are on disk; readers load it with acquire ordering, so a
//! reader never observes an offset covering a partially written record.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use ts_core::{ChunkId, Error, Result};

use crate::callback::ChunkCallback;
use crate::cursor::ChunkCursor;
use crate::pool::SampleBufferPool;
use crate::sample::{Sample, SampleHeader, SAMPLE_HEADER_LENGTH};
use crate::state::Activity;

/// Mutable I/O state, guarded by the chunk's mutex.
struct ChunkIo {
    activity: Activity,
    readers: usize,
    file: Option<File>,
    released: bool,
    deleted: bool,
}

/// A file-backed run of samples linked forward to the chunk after it.
pub struct SampleChunk {
    id: ChunkId,
    path: PathBuf,
    start_position_us: i64,
    created_at_ms: i64,
    max_sample_size: u32,
    sync_on_finish: bool,
    pool: Arc<dyn SampleBufferPool>,
    callback: Arc<dyn ChunkCallback>,
    write_offset: AtomicU64,
    write_finished: AtomicBool,
    size_known: AtomicBool,
    next: RwLock<Option<Weak<SampleChunk>>>,
    io: Mutex<ChunkIo>,
}

/// Construction parameters shared by both kinds of chunk.
pub(crate) struct ChunkParams {
    pub pool: Arc<dyn SampleBufferPool>,
    pub callback: Arc<dyn ChunkCallback>,
    pub path: PathBuf,
    pub start_position_us: i64,
    pub max_sample_size: u32,
    pub sync_on_finish: bool,
}

impl SampleChunk {
    /// An empty chunk that accepts writes.
    pub(crate) fn writable(params: ChunkParams, created_at_ms: i64) -> Self {
        Self::build(params, created_at_ms, false)
    }

    /// A finished, read-only chunk backed by a file already on disk. Its size
    /// is recovered on the first read-open, not here.
    pub(crate) fn existing(params: ChunkParams) -> Self {
        let created_at_ms = params.start_position_us / 1000;
        Self::build(params, created_at_ms, true)
    }

    fn build(params: ChunkParams, created_at_ms: i64, finished: bool) -> Self {
        Self {
            id: ChunkId::new(),
            path: params.path,
            start_position_us: params.start_position_us,
            created_at_ms,
            max_sample_size: params.max_sample_size,
            sync_on_finish: params.sync_on_finish,
            pool: params.pool,
            callback: params.callback,
            write_offset: AtomicU64::new(0),
            write_finished: AtomicBool::new(finished),
            size_known: AtomicBool::new(!finished),
            next: RwLock::new(None),
            io: Mutex::new(ChunkIo {
                activity: Activity::Idle,
                readers: 0,
                file: None,
                released: false,
                deleted: false,
            }),
        }
    }

    pub fn id(&self) -> ChunkId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream time of the first sample in this chunk.
    pub fn start_position_us(&self) -> i64 {
        self.start_position_us
    }

    /// Wall-clock creation time in milliseconds since the Unix epoch.
    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// Bytes written so far. For a reconstructed chunk this stays 0 until
    /// its first read-open.
    pub fn size(&self) -> u64 {
        self.write_offset.load(Ordering::Acquire)
    }

    pub fn is_write_finished(&self) -> bool {
        self.write_finished.load(Ordering::Acquire)
    }

    /// Whether `size()` reflects the file contents.
    pub fn is_size_known(&self) -> bool {
        self.size_known.load(Ordering::Acquire)
    }

    pub fn activity(&self) -> Activity {
        self.io.lock().activity
    }

    /// Number of read cursors currently holding this chunk open.
    pub fn reader_count(&self) -> usize {
        self.io.lock().readers
    }

    pub fn is_released(&self) -> bool {
        self.io.lock().released
    }

    /// The chunk following this one in time, if linked and still alive.
    pub fn next(&self) -> Option<Arc<SampleChunk>> {
        self.next.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn has_successor(&self) -> bool {
        self.next.read().is_some()
    }

    /// Like [`next`](Self::next), but a link whose target was already
    /// dropped by the chain owner is reported instead of read as "no link".
    pub(crate) fn successor(&self) -> Result<Option<Arc<SampleChunk>>> {
        match self.next.read().as_ref() {
            None => Ok(None),
            Some(weak) => weak.upgrade().map(Some).ok_or_else(|| {
                Error::invariant(format!("successor of chunk {} was released", self.id))
            }),
        }
    }

    pub(crate) fn link_next(&self, next: &Arc<SampleChunk>) -> Result<()> {
        let mut link = self.next.write();
        if link.is_some() {
            return Err(Error::invariant(format!(
                "chunk {} already has a successor",
                self.id
            )));
        }
        *link = Some(Arc::downgrade(next));
        Ok(())
    }

    pub(crate) fn notify_finished(&self) {
        self.callback.on_chunk_finished(self);
    }

    /// A successor may only be entered once the writer has opened it (or it
    /// is finished); before that its file may not even exist yet.
    pub(crate) fn is_ready_for_read(&self) -> bool {
        self.is_write_finished() || self.activity().is_writing()
    }

    /// Exhausted for a reader sitting at `offset`: nothing more will ever be
    /// written here.
    pub(crate) fn is_read_finished(&self, offset: u64) -> bool {
        // finished must be observed before the offset it makes final
        self.is_write_finished() && offset == self.size()
    }

    fn ensure_live(&self, io: &ChunkIo) -> Result<()> {
        if io.released {
            return Err(Error::invariant(format!(
                "chunk {} has been released",
                self.id
            )));
        }
        Ok(())
    }

    fn close_file_if_idle(&self, io: &mut ChunkIo) {
        if io.activity.is_idle() && io.file.take().is_some() {
            tracing::trace!(chunk = %self.id, "closed chunk file");
        }
    }

    /// Activate read access, recovering the size of a reconstructed chunk on
    /// the first call. Every call must be paired with [`close_read`](Self::close_read).
    pub(crate) fn open_read(&self) -> Result<()> {
        let mut io = self.io.lock();
        self.ensure_live(&io)?;

        if io.file.is_none() {
            io.file = Some(File::open(&self.path)?);
        }
        if !self.is_size_known() {
            if let Some(file) = io.file.as_ref() {
                let len = file.metadata()?.len();
                self.write_offset.store(len, Ordering::Release);
                self.size_known.store(true, Ordering::Release);
                tracing::debug!(chunk = %self.id, size = len, "recovered chunk size");
            }
        }

        io.readers += 1;
        io.activity = io.activity.on_open_read();
        Ok(())
    }

    pub(crate) fn close_read(&self) -> Result<()> {
        let mut io = self.io.lock();
        if io.readers == 0 {
            return Ok(());
        }
        io.readers -= 1;
        if io.readers == 0 {
            io.activity = io.activity.on_close_read();
            self.close_file_if_idle(&mut io);
        }
        Ok(())
    }

    /// Activate write access. Rejected once writing has finished or while a
    /// reader holds the chunk.
    pub(crate) fn open_write(&self) -> Result<()> {
        if self.is_write_finished() {
            return Err(Error::invariant(format!(
                "chunk {} opened for write though write is already finished",
                self.id
            )));
        }

        let mut io = self.io.lock();
        self.ensure_live(&io)?;
        if io.activity.is_writing() {
            return Ok(());
        }

        let activity = io.activity.on_open_write()?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;
        io.file = Some(file);
        io.activity = activity;
        tracing::debug!(chunk = %self.id, path = %self.path.display(), "opened chunk for write");
        Ok(())
    }

    /// End writing for good, recording `next` as the forward link.
    pub(crate) fn close_write(&self, next: Option<&Arc<SampleChunk>>) -> Result<()> {
        let mut io = self.io.lock();
        if !io.activity.is_writing() {
            return Ok(());
        }

        if self.sync_on_finish {
            if let Some(file) = io.file.as_ref() {
                file.sync_all()?;
            }
        }
        if let Some(next) = next {
            self.link_next(next)?;
        }
        io.activity = io.activity.on_close_write();
        self.write_finished.store(true, Ordering::Release);
        self.close_file_if_idle(&mut io);

        tracing::debug!(
            chunk = %self.id,
            size = self.size(),
            linked = next.is_some(),
            "finished writing chunk"
        );
        Ok(())
    }

    /// Read the sample at the cursor's offset and advance the cursor past it.
    ///
    /// Returns `Ok(None)` at the live edge of a chunk still being written.
    pub fn read(&self, cursor: &mut ChunkCursor) -> Result<Option<Sample>> {
        if !cursor.is_on(self) {
            return Err(Error::invariant(format!(
                "read requested for wrong chunk {}",
                self.id
            )));
        }
        let offset = cursor.offset();

        let mut io = self.io.lock();
        self.ensure_live(&io)?;
        if !io.activity.is_reading() {
            return Err(Error::invariant(format!(
                "chunk {} is not open for read",
                self.id
            )));
        }

        let finished = self.is_write_finished();
        let write_offset = self.size();
        if offset >= write_offset {
            if finished {
                return Err(Error::ReadPastEnd {
                    offset,
                    write_offset,
                });
            }
            if offset != write_offset {
                tracing::error!(
                    chunk = %self.id,
                    offset,
                    write_offset,
                    "reader is ahead of the writer"
                );
            }
            return Ok(None);
        }
        if write_offset - offset < SAMPLE_HEADER_LENGTH {
            return Err(Error::corrupt(offset, "truncated record header"));
        }

        let max_sample_size = self.max_sample_size;
        let Some(file) = io.file.as_mut() else {
            return Err(Error::invariant(format!("chunk {} has no open file", self.id)));
        };

        file.seek(SeekFrom::Start(offset))?;
        let mut raw = [0u8; SAMPLE_HEADER_LENGTH as usize];
        file.read_exact(&mut raw)?;
        let header = SampleHeader::decode(&raw, offset)?;

        if header.size > max_sample_size {
            return Err(Error::corrupt(
                offset,
                format!("sample size {} exceeds limit {max_sample_size}", header.size),
            ));
        }
        if header.record_len() > write_offset - offset {
            return Err(Error::corrupt(
                offset,
                format!(
                    "payload of {} bytes extends past write offset {write_offset}",
                    header.size
                ),
            ));
        }

        let size = header.size as usize;
        let mut data = self.pool.acquire(size);
        data.clear();
        data.resize(size, 0);
        file.read_exact(&mut data[..])?;
        drop(io);

        cursor.advance_to(offset + header.record_len());
        Ok(Some(Sample {
            flags: header.flags,
            timestamp_us: header.timestamp_us,
            data,
        }))
    }

    /// Append `sample` at the write offset. The cursor must sit exactly on
    /// that offset, and the payload may not exceed the configured maximum
    /// sample size.
    pub fn write(&self, sample: &Sample, cursor: &mut ChunkCursor) -> Result<()> {
        let write_offset = self.size();
        if !cursor.is_on(self) || cursor.offset() != write_offset {
            return Err(Error::invariant(format!(
                "write requested for chunk {} at offset {} but its write offset is {}",
                self.id,
                cursor.offset(),
                write_offset
            )));
        }
        if self.has_successor() {
            return Err(Error::invariant(format!(
                "write requested for chunk {} which already has a successor",
                self.id
            )));
        }

        let header = SampleHeader::for_sample(sample)?;
        // anything above the read limit could never be read back
        if header.size > self.max_sample_size {
            return Err(Error::PayloadTooLarge {
                size: sample.size(),
            });
        }

        let mut io = self.io.lock();
        self.ensure_live(&io)?;
        if !io.activity.is_writing() {
            return Err(Error::invariant(format!(
                "chunk {} is not open for write",
                self.id
            )));
        }
        let Some(file) = io.file.as_mut() else {
            return Err(Error::invariant(format!("chunk {} has no open file", self.id)));
        };

        file.seek(SeekFrom::Start(write_offset))?;
        file.write_all(&header.encode())?;
        file.write_all(&sample.data)?;

        let new_offset = write_offset + header.record_len();
        self.write_offset.store(new_offset, Ordering::Release);
        drop(io);

        cursor.advance_to(new_offset);
        Ok(())
    }

    /// Take the chunk out of service for good.
    ///
    /// Closes any open handle and, if `delete` is set, removes the backing
    /// file and fires the deletion notification once. Cleanup failures are
    /// logged and swallowed since the chunk will not be used again.
    pub fn release(&self, delete: bool) {
        let mut io = self.io.lock();
        if !io.released {
            io.released = true;
            io.activity = Activity::Idle;
            io.readers = 0;
            io.file = None;
            self.write_finished.store(true, Ordering::Release);
        }
        if !delete || io.deleted {
            return;
        }
        io.deleted = true;
        drop(io);

        if !self.is_size_known() {
            // the deletion notifier reports how much storage was freed
            if let Ok(meta) = std::fs::metadata(&self.path) {
                self.write_offset.store(meta.len(), Ordering::Release);
                self.size_known.store(true, Ordering::Release);
            }
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    chunk = %self.id,
                    path = %self.path.display(),
                    error = %e,
                    "failed to delete chunk file"
                );
            }
        }
        tracing::debug!(chunk = %self.id, size = self.size(), "deleted chunk");
        self.callback.on_chunk_deleted(self);
    }
}

impl fmt::Debug for SampleChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleChunk")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("start_position_us", &self.start_position_us)
            .field("size", &self.size())
            .field("write_finished", &self.is_write_finished())
            .field("has_successor", &self.has_successor())
            .finish()
    }
}
