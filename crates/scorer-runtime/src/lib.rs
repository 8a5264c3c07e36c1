//! Runtime orchestration layer for the sweep scorer.
//!
//! Runs the scoring session against the two sweep streams, reports to the
//! scoreboard, and bridges process signals into session requests.

pub mod scoreboard;
pub mod session;
pub mod signals;

pub use scorer_core as core;
pub use scorer_data as data;
pub use scoreboard::{Contestant, HttpScoreboard, OfflineScoreboard, ScoreId, Scoreboard};
pub use session::{ScoringSession, SessionReport, SessionSignal};
