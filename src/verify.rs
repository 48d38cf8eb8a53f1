//! Replays a recorded chain of chunk files through the storage engine.
//!
//! Files are spliced together oldest first, exactly the way a buffer is
//! rebuilt after a restart, and then read back with a single cursor that
//! crosses every chunk boundary. Within each chunk timestamps must never go
//! backwards.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use ts_buffer::{
    ChunkCallback, ChunkCursor, NoopCallback, RecyclingPool, SampleBufferPool, SampleChunk,
    SampleChunkCreator, SampleHeader, SAMPLE_HEADER_LENGTH,
};
use ts_core::BufferConfig;

#[derive(Debug, Clone, Serialize)]
pub struct ChunkSummary {
    pub path: PathBuf,
    pub start_position_us: i64,
    pub samples: usize,
    pub bytes: u64,
    pub first_timestamp_us: Option<i64>,
    pub last_timestamp_us: Option<i64>,
}

/// A sample whose timestamp is earlier than the one before it in the same
/// chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: PathBuf,
    pub index: usize,
    pub previous_us: i64,
    pub timestamp_us: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub chunks: Vec<ChunkSummary>,
    pub samples: usize,
    pub key_frames: usize,
    pub total_bytes: u64,
    pub violations: Vec<Violation>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Timestamp of the first record in `path`, or `None` for a file holding no
/// complete header.
pub fn first_timestamp(path: &Path) -> Result<Option<i64>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open chunk file: {:?}", path))?;
    let mut buf = [0u8; SAMPLE_HEADER_LENGTH as usize];
    match file.read_exact(&mut buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    }
    let header = SampleHeader::decode(&buf, 0)?;
    Ok(Some(header.timestamp_us))
}

/// Rebuild a chain from `files` (oldest first) and read it end to end.
pub fn verify_files(files: &[PathBuf], config: &BufferConfig) -> Result<VerifyReport> {
    anyhow::ensure!(!files.is_empty(), "No chunk files given");

    let creator = SampleChunkCreator::new(config.clone());
    let pool = Arc::new(RecyclingPool::new(config.max_pooled_buffers));
    let callback: Arc<dyn ChunkCallback> = Arc::new(NoopCallback);

    let mut chunks: Vec<Arc<SampleChunk>> = Vec::with_capacity(files.len());
    for path in files {
        let prev = chunks.last();
        // empty chunks carry no position of their own; slot them right
        // after their predecessor
        let start = match first_timestamp(path)? {
            Some(ts) => ts,
            None => prev.map_or(0, |p| p.start_position_us().saturating_add(1)),
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .with_context(|| format!("Not a chunk file name: {:?}", path))?;

        let chunk = creator
            .load_existing(
                pool.clone() as Arc<dyn SampleBufferPool>,
                dir,
                filename,
                start,
                callback.clone(),
                prev,
            )
            .with_context(|| {
                format!("Failed to load {:?}; files must be given oldest first", path)
            })?;
        chunks.push(chunk);
    }

    let mut summaries: Vec<ChunkSummary> = chunks
        .iter()
        .map(|c| ChunkSummary {
            path: c.path().to_path_buf(),
            start_position_us: c.start_position_us(),
            samples: 0,
            bytes: 0,
            first_timestamp_us: None,
            last_timestamp_us: None,
        })
        .collect();
    let mut violations = Vec::new();
    let mut key_frames = 0;
    let mut current = 0usize;

    let mut cursor = ChunkCursor::new();
    cursor.open_read(&chunks[0], 0)?;
    while let Some(sample) = cursor.read().context("Failed to read chunk chain")? {
        if let Some(on) = cursor.chunk() {
            while current + 1 < chunks.len() && !Arc::ptr_eq(&chunks[current], &on) {
                current += 1;
            }
        }

        let summary = &mut summaries[current];
        if let Some(previous_us) = summary.last_timestamp_us {
            if sample.timestamp_us < previous_us {
                tracing::warn!(
                    path = %summary.path.display(),
                    index = summary.samples,
                    previous_us,
                    timestamp_us = sample.timestamp_us,
                    "timestamp went backwards"
                );
                violations.push(Violation {
                    path: summary.path.clone(),
                    index: summary.samples,
                    previous_us,
                    timestamp_us: sample.timestamp_us,
                });
            }
        }
        summary.first_timestamp_us.get_or_insert(sample.timestamp_us);
        summary.last_timestamp_us = Some(sample.timestamp_us);
        summary.samples += 1;
        if sample.flags.is_key_frame() {
            key_frames += 1;
        }

        pool.recycle(sample.data);
    }

    for (summary, chunk) in summaries.iter_mut().zip(&chunks) {
        summary.bytes = chunk.size();
    }

    Ok(VerifyReport {
        samples: summaries.iter().map(|s| s.samples).sum(),
        total_bytes: summaries.iter().map(|s| s.bytes).sum(),
        chunks: summaries,
        key_frames,
        violations,
    })
}
