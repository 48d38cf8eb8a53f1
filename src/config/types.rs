use serde::{Deserialize, Serialize};
use ts_core::BufferConfig;

/// Top-level `timeshift.toml` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub buffer: BufferConfig,
}
