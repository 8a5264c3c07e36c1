//! Line-event channel between a sweep producer and the scoring session.
//!
//! A [`LineFeed`] pushes [`StreamEvent`]s for one [`Channel`]; the matching
//! [`LineStream`] receives them in order and can ask the producer to stop
//! once it reaches end-of-file.

use scorer_core::Channel;
use tokio::sync::{mpsc, watch};

/// Default number of undelivered events buffered per channel.
pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

// ── StreamEvent ───────────────────────────────────────────────────────────────

/// One event delivered by a sweep source.
#[derive(Debug)]
pub enum StreamEvent {
    /// A complete line, without its line terminator.
    Line(String),
    /// The source will deliver nothing further.
    End,
    /// The source hit an I/O fault and stopped.
    Failed(std::io::Error),
}

/// Create a connected producer/consumer pair for `channel`.
pub fn line_stream(channel: Channel, capacity: usize) -> (LineFeed, LineStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (stop_tx, stop_rx) = watch::channel(false);
    (
        LineFeed {
            channel,
            tx,
            stop: stop_rx,
        },
        LineStream {
            channel,
            rx,
            stop: stop_tx,
        },
    )
}

// ── LineStream ────────────────────────────────────────────────────────────────

/// Consumer half, owned by the scoring session.
#[derive(Debug)]
pub struct LineStream {
    channel: Channel,
    rx: mpsc::Receiver<StreamEvent>,
    stop: watch::Sender<bool>,
}

impl LineStream {
    /// Wait for the next event.
    ///
    /// A producer that went away without sending [`StreamEvent::End`] is
    /// reported as `End`. Cancel-safe.
    pub async fn next_event(&mut self) -> StreamEvent {
        self.rx.recv().await.unwrap_or(StreamEvent::End)
    }

    /// Ask the producer to finish once it has drained what is on disk.
    ///
    /// Already-queued events are still delivered. Calling this more than once
    /// has no further effect.
    pub fn stop_at_eof(&self) {
        self.stop.send_replace(true);
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

// ── LineFeed ──────────────────────────────────────────────────────────────────

/// Producer half, driven by a file tailer or a test.
#[derive(Debug)]
pub struct LineFeed {
    channel: Channel,
    tx: mpsc::Sender<StreamEvent>,
    stop: watch::Receiver<bool>,
}

impl LineFeed {
    /// Queue one line. Returns `false` once the consumer has been dropped.
    pub async fn send_line(&self, line: impl Into<String>) -> bool {
        self.tx.send(StreamEvent::Line(line.into())).await.is_ok()
    }

    /// Signal end-of-stream and release the feed.
    pub async fn end(self) {
        let _ = self.tx.send(StreamEvent::End).await;
    }

    /// Report a fatal I/O fault and release the feed.
    pub async fn fail(self, err: std::io::Error) {
        let _ = self.tx.send(StreamEvent::Failed(err)).await;
    }

    /// `true` once the consumer asked for a stop at end-of-file.
    pub fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolve when a stop has been requested or the consumer is gone.
    pub async fn wait_for_stop(&mut self) {
        let _ = self.stop.wait_for(|stop| *stop).await;
    }

    /// `true` when the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
