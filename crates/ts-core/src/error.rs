//! Unified error type for the timeshift buffer.
//!
//! Failures fall into three groups: I/O faults from the backing files,
//! invariant violations caused by cursor or chain bookkeeping bugs, and
//! malformed on-disk records. Reaching the live write edge is not an error
//! and never shows up here.

/// Unified error type covering all failure modes of the sample buffer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation on a chunk file failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An operation was requested against the wrong chunk, at the wrong
    /// offset, or in an illegal activity state.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// A read was requested at or beyond the end of a finished chunk.
    #[error("Read past end of finished chunk: offset {offset}, write offset {write_offset}")]
    ReadPastEnd {
        /// Cursor offset at the time of the read.
        offset: u64,
        /// Final write offset of the chunk.
        write_offset: u64,
    },

    /// A record header or payload on disk is malformed.
    #[error("Corrupt record at offset {offset}: {reason}")]
    CorruptRecord {
        /// Byte offset of the record header.
        offset: u64,
        /// Human-readable description of the problem.
        reason: String,
    },

    /// The sample payload does not fit the 32-bit size field.
    #[error("Payload too large: {size} bytes")]
    PayloadTooLarge {
        /// Payload length in bytes.
        size: usize,
    },

    /// Configuration could not be parsed or is invalid.
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Convenience constructor for [`Error::Invariant`].
    pub fn invariant(msg: impl Into<String>) -> Self {
        Error::Invariant(msg.into())
    }

    /// Convenience constructor for [`Error::CorruptRecord`].
    pub fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Whether this error signals a caller bookkeeping bug rather than an
    /// environmental failure.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Error::Invariant(_) | Error::ReadPastEnd { .. })
    }

    /// Nothing at this layer is retried internally; callers decide.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
