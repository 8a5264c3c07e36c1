//! End-to-end scoring against real sweep files followed by the tailer.

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scorer_core::{Channel, Result};
use scorer_data::{FileTail, TailConfig};
use scorer_runtime::{Contestant, ScoreId, Scoreboard, ScoringSession, SessionSignal};
use tempfile::TempDir;
use tokio::sync::oneshot;

#[derive(Default)]
struct RecordingScoreboard {
    updates: Mutex<Vec<(f64, bool)>>,
}

impl RecordingScoreboard {
    fn finals(&self) -> Vec<f64> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, finalize)| *finalize)
            .map(|(score, _)| *score)
            .collect()
    }
}

#[async_trait]
impl Scoreboard for RecordingScoreboard {
    async fn start(&self, _contestant: &Contestant) -> Result<ScoreId> {
        Ok(ScoreId("it".to_string()))
    }

    async fn update(&self, _id: &ScoreId, score: f64, finalize: bool) -> Result<()> {
        self.updates.lock().unwrap().push((score, finalize));
        Ok(())
    }

    async fn cancel(&self, _id: &ScoreId) -> Result<()> {
        Ok(())
    }
}

fn append(path: &Path, text: &str) {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(path)
        .expect("open for append");
    file.write_all(text.as_bytes()).expect("append");
}

fn config() -> TailConfig {
    TailConfig::default().with_poll_interval(Duration::from_millis(10))
}

#[tokio::test]
async fn test_finish_scores_everything_written() {
    let tmp = TempDir::new().unwrap();
    let outer_path = tmp.path().join("outer.csv");
    let inner_path = tmp.path().join("inner.csv");
    std::fs::write(
        &outer_path,
        "2024-05-01, 10:00:00, 88000000, 108000000, 1000000, 10, 10, 20\n",
    )
    .unwrap();
    std::fs::write(&inner_path, "2024-05-01, 10:00:00, 88000000\n").unwrap();

    let outer = FileTail::spawn(&outer_path, Channel::Outer, config())
        .await
        .unwrap();
    let inner = FileTail::spawn(&inner_path, Channel::Inner, config())
        .await
        .unwrap();

    let board = Arc::new(RecordingScoreboard::default());
    let id = board
        .start(&Contestant::new("Ada", "open", None))
        .await
        .unwrap();
    let (signal, signals) = oneshot::channel();
    let session = ScoringSession::new(board.clone(), id, outer, inner, signals);
    let task = tokio::spawn(session.run());

    append(&outer_path, "2024-05-01, 10:00:01, 88000000, 108000000, 1000000, 10, 30, 40\n");
    append(&inner_path, "2024-05-01, 10:00:01, 88000000, 108000000, 1000000, 10, 0, 0\n");
    tokio::time::sleep(Duration::from_millis(200)).await;

    signal.send(SessionSignal::Finish).unwrap();
    let report = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("session did not finish")
        .unwrap()
        .expect("session failed");

    assert_eq!(report.outer_samples, 2);
    assert_eq!(report.inner_samples, 1);
    assert_eq!(report.final_score, 50.0);
    assert_eq!(board.finals(), vec![50.0]);
}

#[tokio::test]
async fn test_cancel_stops_following_files() {
    let tmp = TempDir::new().unwrap();
    let outer_path = tmp.path().join("outer.csv");
    let inner_path = tmp.path().join("inner.csv");
    std::fs::write(&outer_path, "a,b,c,d,e,f,1\n").unwrap();
    std::fs::write(&inner_path, "a,b,c,d,e,f,1\n").unwrap();

    let outer = FileTail::spawn(&outer_path, Channel::Outer, config())
        .await
        .unwrap();
    let inner = FileTail::spawn(&inner_path, Channel::Inner, config())
        .await
        .unwrap();

    let board = Arc::new(RecordingScoreboard::default());
    let (signal, signals) = oneshot::channel();
    let session = ScoringSession::new(
        board.clone(),
        ScoreId("it".to_string()),
        outer,
        inner,
        signals,
    );
    let task = tokio::spawn(session.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    signal.send(SessionSignal::Cancel).unwrap();

    let err = tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .expect("session did not stop")
        .unwrap()
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(board.finals().is_empty());
}
