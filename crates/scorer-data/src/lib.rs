//! Data ingestion layer for the sweep scorer.
//!
//! Turns the two growing sweep files into ordered line-event streams that the
//! scoring session consumes, with support for a graceful stop at end-of-file.

pub mod stream;
pub mod tail;

pub use scorer_core as core;
pub use stream::{line_stream, LineFeed, LineStream, StreamEvent};
pub use tail::{FileTail, TailConfig};
