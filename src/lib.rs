//! Timeshift - operator tooling for time-shift buffer chunk files
//!
//! This library crate exposes the CLI's building blocks for integration testing.

pub mod config;
pub mod inspect;
pub mod verify;
