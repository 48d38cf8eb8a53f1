//! ts-buffer: chunked on-disk storage for a live elementary stream.
//!
//! Samples are appended to a forward-linked chain of file segments
//! ("chunks") so a player can pause, rewind and resume while recording
//! continues at the live edge.
//!
//! # Modules
//!
//! - [`sample`] - Samples, decode flags and the 16-byte record header
//! - [`chunk`] - One file segment with byte-level read/write primitives
//! - [`state`] - The per-chunk activity state machine
//! - [`cursor`] - Read and write positions that cross chunk boundaries
//! - [`factory`] - Creating new chunks and reloading existing ones
//! - [`chain`] - Owning, time-ordered container of chunks
//! - [`callback`] - Chunk lifecycle notifications
//! - [`pool`] - Destination buffers for reads
//!
//! # Concurrency
//!
//! One writer cursor and any number of reader cursors may share a chain.
//! A reader may follow the writer on the live chunk; the writer publishes
//! its offset only after a record is fully written. Readers sharing a chunk
//! keep their own offsets; the chunk serializes their file access.

pub mod callback;
pub mod chain;
pub mod chunk;
pub mod cursor;
pub mod factory;
pub mod pool;
pub mod sample;
pub mod state;

pub use callback::{CallbackSet, ChunkCallback, EventCallback, NoopCallback, StorageUsage};
pub use chain::ChunkChain;
pub use chunk::SampleChunk;
pub use cursor::ChunkCursor;
pub use factory::SampleChunkCreator;
pub use pool::{HeapPool, RecyclingPool, SampleBufferPool};
pub use sample::{Sample, SampleFlags, SampleHeader, SAMPLE_HEADER_LENGTH};
pub use state::Activity;
pub use ts_core::{BufferConfig, Error, Result};

#[cfg(test)]
mod testutil;
