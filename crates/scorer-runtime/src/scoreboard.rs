//! Remote scoring authority.
//!
//! [`Scoreboard`] is the capability the session reports through.
//! [`HttpScoreboard`] talks to the real service; [`OfflineScoreboard`] only
//! logs, for dry runs against recorded sweep files.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use scorer_core::{Result, ScorerError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Per-request timeout for scoreboard calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Public types ──────────────────────────────────────────────────────────────

/// Opaque id correlating every update of one scoring run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreId(pub String);

impl ScoreId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The contestant a scoring run is registered for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contestant {
    pub name: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contestant {
    pub fn new(name: impl Into<String>, class: impl Into<String>, email: Option<&str>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            email: email.filter(|e| !e.is_empty()).map(str::to_string),
        }
    }
}

/// Start, update and cancel operations against a scoring authority.
#[async_trait]
pub trait Scoreboard: Send + Sync {
    /// Register a new scoring run.
    async fn start(&self, contestant: &Contestant) -> Result<ScoreId>;

    /// Report the current score; `finalize` commits it as the final result.
    async fn update(&self, id: &ScoreId, score: f64, finalize: bool) -> Result<()>;

    /// Discard an unfinished scoring run.
    async fn cancel(&self, id: &ScoreId) -> Result<()>;
}

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateScoreResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct UpdateScoreRequest {
    score: f64,
    finalize: bool,
}

// ── HttpScoreboard ────────────────────────────────────────────────────────────

/// JSON-over-HTTP scoreboard client authenticated with a bearer key.
pub struct HttpScoreboard {
    client: Client,
    base_url: String,
    key: String,
}

impl HttpScoreboard {
    pub fn new(base_url: &str, key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ScorerError::Http(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    fn score_url(&self, id: &ScoreId) -> String {
        format!("{}/admin/score/{}", self.base_url, id)
    }

    /// Send one request and return the response body.
    ///
    /// Any status outside `200..400` is reported as
    /// [`ScorerError::Scoreboard`] together with the body text.
    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<String> {
        let mut req = self
            .client
            .request(method.clone(), url)
            .bearer_auth(&self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ScorerError::Http(e.to_string()))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ScorerError::Http(e.to_string()))?;

        debug!(%method, url, status = status.as_u16(), "scoreboard response");

        if status.as_u16() < 200 || status.as_u16() >= 400 {
            return Err(ScorerError::Scoreboard {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

#[async_trait]
impl Scoreboard for HttpScoreboard {
    async fn start(&self, contestant: &Contestant) -> Result<ScoreId> {
        let url = format!("{}/admin/score", self.base_url);
        let body = self.request(Method::POST, &url, Some(contestant)).await?;
        let resp: CreateScoreResponse = serde_json::from_str(&body)?;

        info!("Scoring started for {} in {}", contestant.name, contestant.class);
        info!(score_id = %resp.id, "Score ID: {}", resp.id);
        Ok(ScoreId(resp.id))
    }

    async fn update(&self, id: &ScoreId, score: f64, finalize: bool) -> Result<()> {
        let body = UpdateScoreRequest { score, finalize };
        self.request(Method::POST, &self.score_url(id), Some(&body))
            .await?;
        Ok(())
    }

    async fn cancel(&self, id: &ScoreId) -> Result<()> {
        info!(score_id = %id, "Canceling scoring for {}", id);
        self.request::<()>(Method::DELETE, &self.score_url(id), None)
            .await?;
        Ok(())
    }
}

// ── OfflineScoreboard ─────────────────────────────────────────────────────────

/// Scoreboard stand-in that never touches the network.
#[derive(Debug, Default)]
pub struct OfflineScoreboard;

impl OfflineScoreboard {
    pub const SCORE_ID: &'static str = "offline";
}

#[async_trait]
impl Scoreboard for OfflineScoreboard {
    async fn start(&self, contestant: &Contestant) -> Result<ScoreId> {
        info!(
            "Scoring started offline for {} in {}",
            contestant.name, contestant.class
        );
        Ok(ScoreId(Self::SCORE_ID.to_string()))
    }

    async fn update(&self, id: &ScoreId, score: f64, finalize: bool) -> Result<()> {
        debug!(score_id = %id, score, finalize, "offline score update");
        Ok(())
    }

    async fn cancel(&self, id: &ScoreId) -> Result<()> {
        info!(score_id = %id, "Canceling offline scoring");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
