//! Client for the Mozilla HTTP Observatory scan API.

use async_trait::async_trait;
use fedidex_common::{AppError, AppResult};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Scan lifecycle states reported by the observatory API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObservatoryState {
    Pending,
    Starting,
    Running,
    Finished,
    Aborted,
    Failed,
    /// States this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl ObservatoryState {
    /// Whether the scan produced a final grade.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// One scan report. Grade and score are only meaningful once the state
/// is [`ObservatoryState::Finished`].
#[derive(Debug, Clone, Deserialize)]
pub struct ObservatoryReport {
    pub state: ObservatoryState,
    pub grade: Option<String>,
    pub score: Option<i32>,
}

/// Contract for requesting a security scan of one host.
#[async_trait]
pub trait Observatory: Send + Sync {
    /// Request (or poll) a scan for `host` and return its current report.
    async fn analyze(&self, host: &str) -> AppResult<ObservatoryReport>;
}

/// HTTP client against the observatory's `analyze` endpoint.
#[derive(Clone)]
pub struct ObservatoryClient {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl ObservatoryClient {
    /// Create a client for the given API base URL (no trailing slash).
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: format!("fedidex/{} (+https://fedidex.example)", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[async_trait]
impl Observatory for ObservatoryClient {
    async fn analyze(&self, host: &str) -> AppResult<ObservatoryReport> {
        let url = format!("{}/analyze?host={host}", self.base_url);

        debug!(host = %host, "Requesting observatory scan");

        let response = self
            .client
            .post(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("observatory request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "observatory returned {status} for {host}"
            )));
        }

        let report = response
            .json::<ObservatoryReport>()
            .await
            .map_err(|e| AppError::Upstream(format!("undecodable observatory response: {e}")))?;

        debug!(host = %host, state = ?report.state, "Observatory scan state");

        Ok(report)
    }
}
