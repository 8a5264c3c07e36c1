use std::path::PathBuf;
use thiserror::Error;

use crate::channel::Channel;

/// All errors produced by the sweep scorer.
#[derive(Error, Debug)]
pub enum ScorerError {
    /// A sweep file could not be opened when tailing started.
    #[error("Cannot open {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tailer for one channel hit an I/O fault while following its file.
    #[error("Failed to read {channel} sweep file: {source}")]
    StreamRead {
        channel: Channel,
        #[source]
        source: std::io::Error,
    },

    /// The session was aborted by an external cancel request.
    #[error("Scoring canceled")]
    Cancelled,

    /// The scoreboard could not be reached at all.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The scoreboard answered with a non-success status.
    #[error("Communication error: {status} ({body})")]
    Scoreboard { status: u16, body: String },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScorerError {
    /// `true` for the controlled abort raised by a cancel signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScorerError::Cancelled)
    }
}

/// Convenience alias used throughout the scorer crates.
pub type Result<T> = std::result::Result<T, ScorerError>;
