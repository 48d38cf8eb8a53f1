//! Timestamped media samples and their fixed 16-byte record header.
//!
//! A chunk file is a plain sequence of records:
//!
//! ```text
//! +-----------+-----------+------------------+-----------------+
//! | size: i32 | flags:i32 | timestamp_us:i64 | payload (size)  |
//! +-----------+-----------+------------------+-----------------+
//! ```
//!
//! All integers are big-endian. There is no padding between records and no
//! file-level header or trailer.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use bytes::BytesMut;
use ts_core::{Error, Result};

/// Length of the record header preceding every payload.
pub const SAMPLE_HEADER_LENGTH: u64 = 16;

// On-disk flag bits. These values are part of the file format.
const STORED_KEY_FRAME: u32 = 1;
const STORED_DECODE_ONLY: u32 = 1 << 31;
const STORED_ENCRYPTED: u32 = 1 << 30;

/// Per-sample decode flags.
///
/// The in-memory representation is independent from the stored bit layout;
/// use [`SampleFlags::to_stored`] and [`SampleFlags::from_stored`] to cross
/// the file boundary.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SampleFlags(u8);

impl SampleFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The sample holds a key frame.
    pub const KEY_FRAME: Self = Self(1);
    /// The sample must be decoded but not rendered.
    pub const DECODE_ONLY: Self = Self(1 << 1);
    /// The sample is at least partially encrypted.
    pub const ENCRYPTED: Self = Self(1 << 2);

    /// Whether every flag in `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Set the flags in `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_key_frame(self) -> bool {
        self.contains(Self::KEY_FRAME)
    }

    pub fn is_decode_only(self) -> bool {
        self.contains(Self::DECODE_ONLY)
    }

    pub fn is_encrypted(self) -> bool {
        self.contains(Self::ENCRYPTED)
    }

    /// Encode into the on-disk bit layout.
    pub fn to_stored(self) -> u32 {
        let mut stored = 0;
        if self.is_key_frame() {
            stored |= STORED_KEY_FRAME;
        }
        if self.is_decode_only() {
            stored |= STORED_DECODE_ONLY;
        }
        if self.is_encrypted() {
            stored |= STORED_ENCRYPTED;
        }
        stored
    }

    /// Decode from the on-disk bit layout. Reserved bits are ignored.
    pub fn from_stored(stored: u32) -> Self {
        let mut flags = Self::NONE;
        if stored & STORED_KEY_FRAME == STORED_KEY_FRAME {
            flags.insert(Self::KEY_FRAME);
        }
        if stored & STORED_DECODE_ONLY == STORED_DECODE_ONLY {
            flags.insert(Self::DECODE_ONLY);
        }
        if stored & STORED_ENCRYPTED == STORED_ENCRYPTED {
            flags.insert(Self::ENCRYPTED);
        }
        flags
    }
}

impl BitOr for SampleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SampleFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.insert(rhs);
    }
}

impl fmt::Debug for SampleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.is_key_frame() {
            names.push("KEY_FRAME");
        }
        if self.is_decode_only() {
            names.push("DECODE_ONLY");
        }
        if self.is_encrypted() {
            names.push("ENCRYPTED");
        }
        if names.is_empty() {
            write!(f, "SampleFlags(NONE)")
        } else {
            write!(f, "SampleFlags({})", names.join(" | "))
        }
    }
}

/// One timestamped media sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Decode flags.
    pub flags: SampleFlags,
    /// Presentation time in microseconds.
    pub timestamp_us: i64,
    /// Encoded payload.
    pub data: BytesMut,
}

impl Sample {
    /// Create a sample from its parts.
    pub fn new(flags: SampleFlags, timestamp_us: i64, data: impl Into<BytesMut>) -> Self {
        Self {
            flags,
            timestamp_us,
            data: data.into(),
        }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Bytes this sample occupies on disk, header included.
    pub fn record_len(&self) -> u64 {
        SAMPLE_HEADER_LENGTH + self.data.len() as u64
    }
}

/// The fixed header in front of every stored payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleHeader {
    pub size: u32,
    pub flags: SampleFlags,
    pub timestamp_us: i64,
}

impl SampleHeader {
    /// Build the header for `sample`, rejecting payloads the size field
    /// cannot represent.
    pub fn for_sample(sample: &Sample) -> Result<Self> {
        let size = i32::try_from(sample.size()).map_err(|_| Error::PayloadTooLarge {
            size: sample.size(),
        })?;
        Ok(Self {
            size: size as u32,
            flags: sample.flags,
            timestamp_us: sample.timestamp_us,
        })
    }

    /// Serialize to the on-disk layout.
    pub fn encode(&self) -> [u8; SAMPLE_HEADER_LENGTH as usize] {
        let mut buf = [0u8; SAMPLE_HEADER_LENGTH as usize];
        buf[0..4].copy_from_slice(&self.size.to_be_bytes());
        buf[4..8].copy_from_slice(&self.flags.to_stored().to_be_bytes());
        buf[8..16].copy_from_slice(&self.timestamp_us.to_be_bytes());
        buf
    }

    /// Parse the on-disk layout. `offset` is only used for error reporting.
    pub fn decode(buf: &[u8; SAMPLE_HEADER_LENGTH as usize], offset: u64) -> Result<Self> {
        let size = i32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if size < 0 {
            return Err(Error::corrupt(offset, format!("negative sample size {size}")));
        }
        let stored_flags = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let timestamp_us = i64::from_be_bytes([
            buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
        ]);

        Ok(Self {
            size: size as u32,
            flags: SampleFlags::from_stored(stored_flags),
            timestamp_us,
        })
    }

    /// Bytes the whole record occupies on disk.
    pub fn record_len(&self) -> u64 {
        SAMPLE_HEADER_LENGTH + u64::from(self.size)
    }
}
