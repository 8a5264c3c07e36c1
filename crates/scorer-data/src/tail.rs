//! Follow a growing sweep file and publish its lines as [`StreamEvent`]s.
//!
//! The tailer opens the file up front, then polls for appended data. A file
//! that is replaced (new inode) or truncated under the tailer is reopened from
//! the start. Once the consumer calls [`LineStream::stop_at_eof`], the tailer
//! drains whatever is currently readable, emits `End` and exits.
//!
//! [`StreamEvent`]: crate::stream::StreamEvent

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use scorer_core::{Channel, Result, ScorerError};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::stream::{line_stream, LineFeed, LineStream, DEFAULT_STREAM_CAPACITY};

/// Default interval between checks for new data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ── TailConfig ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TailConfig {
    /// How long to sleep at end-of-file before looking again.
    pub poll_interval: Duration,
    /// Events buffered before the tailer waits for the consumer.
    pub capacity: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl TailConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

// ── FileTail ──────────────────────────────────────────────────────────────────

/// Background follower for one sweep file.
pub struct FileTail {
    path: PathBuf,
    reader: BufReader<File>,
    identity: Option<(u64, u64)>,
    offset: u64,
    pending: Vec<u8>,
    feed: LineFeed,
    config: TailConfig,
}

/// Outcome of draining the readable part of the file.
enum Drain {
    AtEof,
    ConsumerGone,
}

impl FileTail {
    /// Open `path` and start following it on a tokio task.
    ///
    /// Fails with [`ScorerError::FileOpen`] when the file cannot be opened;
    /// every later fault is delivered through the returned stream.
    pub async fn spawn(
        path: impl AsRef<Path>,
        channel: Channel,
        config: TailConfig,
    ) -> Result<LineStream> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|source| ScorerError::FileOpen {
                path: path.clone(),
                source,
            })?;
        let meta = file
            .metadata()
            .await
            .map_err(|source| ScorerError::FileOpen {
                path: path.clone(),
                source,
            })?;

        let (feed, stream) = line_stream(channel, config.capacity);
        let tail = FileTail {
            identity: file_identity(&meta),
            reader: BufReader::new(file),
            path,
            offset: 0,
            pending: Vec::new(),
            feed,
            config,
        };

        debug!(channel = %channel, path = %tail.path.display(), "tailing sweep file");
        tokio::spawn(tail.run());

        Ok(stream)
    }

    async fn run(mut self) {
        loop {
            match self.drain().await {
                Ok(Drain::AtEof) => {}
                Ok(Drain::ConsumerGone) => return,
                Err(e) => {
                    self.feed.fail(e).await;
                    return;
                }
            }

            if self.feed.stop_requested() {
                self.finish().await;
                return;
            }
            if self.feed.is_closed() {
                return;
            }

            if let Err(e) = self.reopen_if_rotated().await {
                self.feed.fail(e).await;
                return;
            }

            let poll = self.config.poll_interval;
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = self.feed.wait_for_stop() => {}
            }
        }
    }

    /// Publish every complete line currently readable.
    ///
    /// A trailing fragment without a newline stays in `pending` until the
    /// rest of the line is written.
    async fn drain(&mut self) -> io::Result<Drain> {
        loop {
            let read = self.reader.read_until(b'\n', &mut self.pending).await?;
            if read == 0 {
                return Ok(Drain::AtEof);
            }
            self.offset += read as u64;

            if self.pending.last() != Some(&b'\n') {
                continue;
            }
            let line = take_line(&mut self.pending);
            if !self.feed.send_line(line).await {
                return Ok(Drain::ConsumerGone);
            }
        }
    }

    /// Flush any unterminated fragment and close the stream.
    async fn finish(mut self) {
        if !self.pending.is_empty() {
            let line = take_line(&mut self.pending);
            if !self.feed.send_line(line).await {
                return;
            }
        }
        debug!(channel = %self.feed.channel(), "stopped at end of file");
        self.feed.end().await;
    }

    /// Start over on a fresh handle when the path now names another file or
    /// the file shrank below what was already read.
    async fn reopen_if_rotated(&mut self) -> io::Result<()> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            // Mid-rotation: the new file has not been created yet.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        let replaced = file_identity(&meta) != self.identity;
        let truncated = meta.len() < self.offset;
        if !replaced && !truncated {
            return Ok(());
        }

        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        let meta = file.metadata().await?;

        info!(
            channel = %self.feed.channel(),
            path = %self.path.display(),
            replaced,
            truncated,
            "sweep file rotated; reopening"
        );

        self.identity = file_identity(&meta);
        self.reader = BufReader::new(file);
        self.offset = 0;
        self.pending.clear();
        Ok(())
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Drain `buf` into a `String`, dropping a trailing `\n` or `\r\n`.
fn take_line(buf: &mut Vec<u8>) -> String {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    line
}

#[cfg(unix)]
fn file_identity(meta: &Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn file_identity(_meta: &Metadata) -> Option<(u64, u64)> {
    None
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamEvent;
    use std::io::Write;
    use tempfile::TempDir;

    fn fast() -> TailConfig {
        TailConfig::default().with_poll_interval(Duration::from_millis(10))
    }

    async fn next(stream: &mut LineStream) -> StreamEvent {
        tokio::time::timeout(Duration::from_secs(5), stream.next_event())
            .await
            .expect("timed out waiting for stream event")
    }

    async fn expect_line(stream: &mut LineStream, expected: &str) {
        match next(stream).await {
            StreamEvent::Line(line) => assert_eq!(line, expected),
            other => panic!("expected line {expected:?}, got {other:?}"),
        }
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(path)
            .expect("open for append");
        file.write_all(text.as_bytes()).expect("append");
    }

    // ── take_line ─────────────────────────────────────────────────────────

    #[test]
    fn test_take_line_strips_terminators() {
        let mut buf = b"a,b\r\n".to_vec();
        assert_eq!(take_line(&mut buf), "a,b");
        assert!(buf.is_empty());

        let mut buf = b"a,b\n".to_vec();
        assert_eq!(take_line(&mut buf), "a,b");

        let mut buf = b"partial".to_vec();
        assert_eq!(take_line(&mut buf), "partial");
    }

    // ── spawn ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_file_fails_up_front() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.csv");
        let err = FileTail::spawn(&path, Channel::Outer, fast())
            .await
            .expect_err("missing file must fail");
        assert!(matches!(err, ScorerError::FileOpen { .. }));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[tokio::test]
    async fn test_follows_existing_and_appended_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("outer.csv");
        std::fs::write(&path, "one\r\ntwo\n").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Outer, fast()).await.unwrap();
        expect_line(&mut stream, "one").await;
        expect_line(&mut stream, "two").await;

        append(&path, "three\n");
        expect_line(&mut stream, "three").await;

        stream.stop_at_eof();
        assert!(matches!(next(&mut stream).await, StreamEvent::End));
    }

    #[tokio::test]
    async fn test_partial_line_waits_for_newline() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inner.csv");
        std::fs::write(&path, "a,b,c").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Inner, fast()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        append(&path, ",d\n");
        expect_line(&mut stream, "a,b,c,d").await;
    }

    #[tokio::test]
    async fn test_stop_flushes_partial_line() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inner.csv");
        std::fs::write(&path, "done\ntail-without-newline").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Inner, fast()).await.unwrap();
        expect_line(&mut stream, "done").await;

        stream.stop_at_eof();
        expect_line(&mut stream, "tail-without-newline").await;
        assert!(matches!(next(&mut stream).await, StreamEvent::End));
    }

    #[tokio::test]
    async fn test_stop_before_reading_still_drains_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("outer.csv");
        std::fs::write(&path, "x\ny\n").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Outer, fast()).await.unwrap();
        stream.stop_at_eof();

        expect_line(&mut stream, "x").await;
        expect_line(&mut stream, "y").await;
        assert!(matches!(next(&mut stream).await, StreamEvent::End));
    }

    #[tokio::test]
    async fn test_truncated_file_is_reread_from_start() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("outer.csv");
        std::fs::write(&path, "old line that is fairly long\n").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Outer, fast()).await.unwrap();
        expect_line(&mut stream, "old line that is fairly long").await;

        std::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        append(&path, "new\n");

        expect_line(&mut stream, "new").await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_replaced_file_is_reopened() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("outer.csv");
        std::fs::write(&path, "first generation\n").unwrap();

        let mut stream = FileTail::spawn(&path, Channel::Outer, fast()).await.unwrap();
        expect_line(&mut stream, "first generation").await;

        std::fs::rename(&path, tmp.path().join("outer.csv.1")).unwrap();
        std::fs::write(&path, "second generation\n").unwrap();

        expect_line(&mut stream, "second generation").await;
    }
}
