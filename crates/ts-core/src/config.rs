//! Buffer configuration types.
//!
//! [`BufferConfig`] carries the tunables of the chunk engine. Every field
//! defaults sensibly so a completely empty `{}` document is valid.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::Error;

/// Default upper bound for a single sample payload (16 MiB).
pub const DEFAULT_MAX_SAMPLE_SIZE: u32 = 16 * 1024 * 1024;

/// Tunables for chunk storage and buffer pooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Largest payload size accepted when decoding a record header.
    pub max_sample_size: u32,
    /// Flush chunk data to stable storage when its write access is finalized.
    pub sync_on_finish: bool,
    /// How many returned buffers the recycling pool keeps around.
    pub max_pooled_buffers: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            max_sample_size: DEFAULT_MAX_SAMPLE_SIZE,
            sync_on_finish: false,
            max_pooled_buffers: 64,
        }
    }
}

impl BufferConfig {
    /// Deserialize a `BufferConfig` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("parse error: {e}")))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_sample_size == 0 {
            warnings.push("max_sample_size is 0; every non-empty sample will be rejected".into());
        }
        if self.max_sample_size > i32::MAX as u32 {
            warnings.push(format!(
                "max_sample_size {} exceeds the on-disk size field; clamped to {}",
                self.max_sample_size,
                i32::MAX
            ));
        }

        warnings
    }

    /// The effective sample size bound, never larger than the size field allows.
    pub fn effective_max_sample_size(&self) -> u32 {
        self.max_sample_size.min(i32::MAX as u32)
    }
}
