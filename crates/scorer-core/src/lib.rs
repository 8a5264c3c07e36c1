//! Core types for the sweep scorer.
//!
//! Sample parsing, per-channel aggregation, score derivation, configuration
//! and the shared error type. Nothing here performs I/O beyond the settings
//! file.

pub mod channel;
pub mod error;
pub mod sample;
pub mod score;
pub mod settings;

pub use channel::Channel;
pub use error::{Result, ScorerError};
pub use sample::StreamAggregate;
