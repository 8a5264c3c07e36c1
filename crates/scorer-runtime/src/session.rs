//! The scoring session event loop.
//!
//! [`ScoringSession`] owns both channel aggregates and multiplexes four event
//! sources on a single task: the outer stream, the inner stream, a one-second
//! reporting tick and a one-shot [`SessionSignal`]. No locks are needed since
//! nothing else ever touches the aggregates.
//!
//! Lifecycle: `Running` until both streams have ended, then `Finalizing`
//! while the final score is submitted, then `Done`. A cancel signal or a
//! stream I/O fault ends the session as `Cancelled` with an error instead.

use std::sync::Arc;
use std::time::Duration;

use scorer_core::score::{score_aggregates, score_breakdown};
use scorer_core::{Channel, Result, ScorerError, StreamAggregate};
use scorer_data::{LineStream, StreamEvent};
use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::scoreboard::{ScoreId, Scoreboard};

/// Interval between best-effort progress reports.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

// ── Public types ──────────────────────────────────────────────────────────────

/// External request delivered to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Stop following the files at end-of-file, then finalize.
    Finish,
    /// Abort immediately without a final score.
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Running,
    Finalizing,
    Done,
    Cancelled,
}

/// Summary of a session that reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    /// The score submitted with `finalize = true`.
    pub final_score: f64,
    pub outer_samples: u64,
    pub inner_samples: u64,
    /// Periodic updates the scoreboard accepted.
    pub updates_sent: u64,
}

// ── ChannelState ──────────────────────────────────────────────────────────────

/// One input stream together with its running aggregate.
struct ChannelState {
    channel: Channel,
    stream: LineStream,
    aggregate: StreamAggregate,
    closed: bool,
}

impl ChannelState {
    fn new(stream: LineStream) -> Self {
        Self {
            channel: stream.channel(),
            stream,
            aggregate: StreamAggregate::new(),
            closed: false,
        }
    }

    /// Fold one stream event into the channel.
    ///
    /// Returns `true` only for the event that closes the channel, so the
    /// completion notice is logged once however many `End`s arrive.
    fn apply(&mut self, event: StreamEvent) -> Result<bool> {
        match event {
            StreamEvent::Line(line) => {
                if !self.aggregate.ingest(&line) {
                    trace!(channel = %self.channel, "ignoring line without bucket data");
                }
                Ok(false)
            }
            StreamEvent::End if self.closed => Ok(false),
            StreamEvent::End => {
                self.closed = true;
                info!(
                    channel = %self.channel,
                    count = self.aggregate.count(),
                    "Parsing {} sweep file complete",
                    self.channel
                );
                Ok(true)
            }
            StreamEvent::Failed(source) => Err(ScorerError::StreamRead {
                channel: self.channel,
                source,
            }),
        }
    }
}

// ── ScoringSession ────────────────────────────────────────────────────────────

pub struct ScoringSession {
    scoreboard: Arc<dyn Scoreboard>,
    score_id: ScoreId,
    outer: ChannelState,
    inner: ChannelState,
    /// `None` once a signal has been consumed or its sender is gone.
    signals: Option<oneshot::Receiver<SessionSignal>>,
    state: SessionState,
    updates_sent: u64,
}

impl ScoringSession {
    /// Create a session for an already-started scoring run.
    pub fn new(
        scoreboard: Arc<dyn Scoreboard>,
        score_id: ScoreId,
        outer: LineStream,
        inner: LineStream,
        signals: oneshot::Receiver<SessionSignal>,
    ) -> Self {
        Self {
            scoreboard,
            score_id,
            outer: ChannelState::new(outer),
            inner: ChannelState::new(inner),
            signals: Some(signals),
            state: SessionState::Running,
            updates_sent: 0,
        }
    }

    /// Drive the session to completion.
    ///
    /// Returns the report once the final score has been accepted. On error
    /// the caller is responsible for cancelling the score on the scoreboard.
    pub async fn run(mut self) -> Result<SessionReport> {
        info!(score_id = %self.score_id, "scoring session running");

        match self.event_loop().await {
            Ok(()) => self.finalize().await,
            Err(e) => {
                self.transition(SessionState::Cancelled);
                Err(e)
            }
        }
    }

    async fn event_loop(&mut self) -> Result<()> {
        let mut ticker = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !(self.outer.closed && self.inner.closed) {
            tokio::select! {
                event = self.outer.stream.next_event(), if !self.outer.closed => {
                    self.outer.apply(event)?;
                }
                event = self.inner.stream.next_event(), if !self.inner.closed => {
                    self.inner.apply(event)?;
                }
                signal = next_signal(&mut self.signals), if self.signals.is_some() => {
                    self.on_signal(signal)?;
                }
                _ = ticker.tick() => {
                    self.report_progress().await;
                }
            }
        }
        Ok(())
    }

    fn on_signal(&mut self, signal: Option<SessionSignal>) -> Result<()> {
        self.signals = None;
        match signal {
            Some(SessionSignal::Cancel) => {
                warn!(score_id = %self.score_id, "scoring cancelled");
                Err(ScorerError::Cancelled)
            }
            Some(SessionSignal::Finish) => {
                info!("finish requested; draining sweep files");
                self.outer.stream.stop_at_eof();
                self.inner.stream.stop_at_eof();
                Ok(())
            }
            None => {
                debug!("signal source dropped; running until both sweep files end");
                Ok(())
            }
        }
    }

    /// Push the current score as a non-final update.
    ///
    /// Skipped until both channels have samples. A failed update is logged
    /// and the session carries on.
    async fn report_progress(&mut self) {
        let Some(score) = score_aggregates(&self.outer.aggregate, &self.inner.aggregate) else {
            debug!(
                outer = self.outer.aggregate.count(),
                inner = self.inner.aggregate.count(),
                "waiting for samples on both channels"
            );
            return;
        };

        info!(score, "Current Score: {score:.6}");
        match self.scoreboard.update(&self.score_id, score, false).await {
            Ok(()) => self.updates_sent += 1,
            Err(e) => warn!(error = %e, score, "periodic score update failed"),
        }
    }

    async fn finalize(mut self) -> Result<SessionReport> {
        self.transition(SessionState::Finalizing);

        let outer = &self.outer.aggregate;
        let inner = &self.inner.aggregate;
        if outer.is_empty() || inner.is_empty() {
            warn!(
                outer = outer.count(),
                inner = inner.count(),
                "finalizing without samples on both channels"
            );
        } else {
            let breakdown = score_breakdown(outer.sum(), inner.sum(), outer.count(), inner.count());
            debug!(
                min = breakdown.min,
                max = breakdown.max,
                overlap = breakdown.overlap,
                outer_avg = ?outer.averages(),
                inner_avg = ?inner.averages(),
                "final score breakdown"
            );
        }
        // With no overlapping buckets the score is 0.0 by definition.
        let score = score_aggregates(outer, inner).unwrap_or(0.0);

        info!(score, finalize = true, "Current Score: {score:.6}");
        if let Err(e) = self.scoreboard.update(&self.score_id, score, true).await {
            self.transition(SessionState::Cancelled);
            return Err(e);
        }
        self.transition(SessionState::Done);

        Ok(SessionReport {
            final_score: score,
            outer_samples: self.outer.aggregate.count(),
            inner_samples: self.inner.aggregate.count(),
            updates_sent: self.updates_sent,
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state change");
        self.state = next;
    }
}

/// Wait for the one-shot signal; `None` when its sender was dropped.
async fn next_signal(rx: &mut Option<oneshot::Receiver<SessionSignal>>) -> Option<SessionSignal> {
    match rx {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
