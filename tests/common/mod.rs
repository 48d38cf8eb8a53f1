//! Shared helpers for CLI tests: record chunk files through the real
//! storage engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ts_buffer::{
    ChunkCursor, HeapPool, NoopCallback, Sample, SampleChunk, SampleChunkCreator, SampleFlags,
};

pub const FRAME_US: i64 = 40_000;

/// Write one chunk file holding a frame per timestamp. The first frame is a
/// key frame.
pub fn write_chunk(dir: &Path, name: &str, timestamps: &[i64]) -> PathBuf {
    let path = dir.join(name);
    let chunk = new_chunk(&path, timestamps.first().copied().unwrap_or(0));
    let mut writer = ChunkCursor::new();
    writer.open_write(&chunk).unwrap();
    for (i, ts) in timestamps.iter().enumerate() {
        writer.write(&frame(i == 0, *ts), None).unwrap();
    }
    writer.close_write().unwrap();
    path
}

/// Record `total` frames, rolling over to a new file every `per_chunk`.
pub fn record_chain(dir: &Path, total: i64, per_chunk: i64) -> Vec<PathBuf> {
    let mut files = Vec::new();
    // cursors only hold weak references; keep every chunk alive until done
    let mut chunks = Vec::new();
    let mut writer = ChunkCursor::new();
    for i in 0..total {
        let ts = i * FRAME_US;
        if i % per_chunk == 0 {
            let path = dir.join(format!("{ts:012}.chunk"));
            let chunk = new_chunk(&path, ts);
            if i == 0 {
                writer.open_write(&chunk).unwrap();
                writer.write(&frame(true, ts), None).unwrap();
            } else {
                writer.write(&frame(true, ts), Some(&chunk)).unwrap();
            }
            files.push(path);
            chunks.push(chunk);
        } else {
            writer.write(&frame(false, ts), None).unwrap();
        }
    }
    writer.close_write().unwrap();
    files
}

fn new_chunk(path: &Path, start: i64) -> Arc<SampleChunk> {
    SampleChunkCreator::default().create_new(
        Arc::new(HeapPool),
        path,
        start,
        Arc::new(NoopCallback),
    )
}

fn frame(key: bool, ts: i64) -> Sample {
    let flags = if key {
        SampleFlags::KEY_FRAME
    } else {
        SampleFlags::NONE
    };
    Sample::new(flags, ts, &[0xA5u8; 12][..])
}
