//! ts-core: shared types, errors, configuration, and chunk lifecycle events.
//!
//! This crate is the foundational dependency for the other timeshift crates,
//! providing the unified error type, buffer configuration, typed chunk
//! identifiers, and a broadcast bus for chunk lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use config::BufferConfig;
pub use error::{Error, Result};
pub use ids::ChunkId;
