//! Chunk construction.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use ts_core::{BufferConfig, Error, Result};

use crate::callback::ChunkCallback;
use crate::chunk::{ChunkParams, SampleChunk};
use crate::pool::SampleBufferPool;

/// Builds chunks configured from a shared [`BufferConfig`].
#[derive(Debug, Clone, Default)]
pub struct SampleChunkCreator {
    config: BufferConfig,
}

impl SampleChunkCreator {
    pub fn new(config: BufferConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    fn params(
        &self,
        pool: Arc<dyn SampleBufferPool>,
        path: PathBuf,
        start_position_us: i64,
        callback: Arc<dyn ChunkCallback>,
    ) -> ChunkParams {
        ChunkParams {
            pool,
            callback,
            path,
            start_position_us,
            max_sample_size: self.config.effective_max_sample_size(),
            sync_on_finish: self.config.sync_on_finish,
        }
    }

    /// A brand-new, empty chunk for the writer. The file is created on the
    /// first write-open.
    pub fn create_new(
        &self,
        pool: Arc<dyn SampleBufferPool>,
        file: impl Into<PathBuf>,
        start_position_us: i64,
        callback: Arc<dyn ChunkCallback>,
    ) -> Arc<SampleChunk> {
        let params = self.params(pool, file.into(), start_position_us, callback);
        let chunk = Arc::new(SampleChunk::writable(params, Utc::now().timestamp_millis()));
        tracing::debug!(
            chunk = %chunk.id(),
            path = %chunk.path().display(),
            start_position_us,
            "created chunk"
        );
        chunk
    }

    /// Rebuild a finished, read-only chunk from `dir/filename` and splice it
    /// after `prev`.
    ///
    /// Chains are rebuilt oldest first, so `prev` must start strictly earlier
    /// and must not have a successor yet. The file is not touched here.
    pub fn load_existing(
        &self,
        pool: Arc<dyn SampleBufferPool>,
        dir: &Path,
        filename: &str,
        start_position_us: i64,
        callback: Arc<dyn ChunkCallback>,
        prev: Option<&Arc<SampleChunk>>,
    ) -> Result<Arc<SampleChunk>> {
        if let Some(prev) = prev {
            if prev.start_position_us() >= start_position_us {
                return Err(Error::invariant(format!(
                    "chunk {filename} starting at {start_position_us}us cannot follow a chunk \
                     starting at {}us",
                    prev.start_position_us()
                )));
            }
        }

        let params = self.params(pool, dir.join(filename), start_position_us, callback);
        let chunk = Arc::new(SampleChunk::existing(params));
        if let Some(prev) = prev {
            prev.link_next(&chunk)?;
        }

        tracing::trace!(chunk = %chunk.id(), filename, start_position_us, "loaded chunk");
        Ok(chunk)
    }
}
