//! Claude usage API client and utilization types.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://claude.ai";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One rolling rate-limit window (5h or 7d).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    /// 0-100 percentage.
    pub utilization: f64,
    /// ISO 8601 timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resets_at: Option<String>,
}

/// Quota utilization snapshot for one account. Fetched fresh per scan,
/// never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub five_hour: Option<UsageWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seven_day: Option<UsageWindow>,
}

impl UsageInfo {
    /// Highest utilization across the present windows; 0.0 when empty.
    pub fn max_utilization(&self) -> f64 {
        let mut max: f64 = 0.0;
        if let Some(window) = &self.five_hour {
            max = max.max(window.utilization);
        }
        if let Some(window) = &self.seven_day {
            max = max.max(window.utilization);
        }
        max
    }
}

/// Fetches quota utilization for an account. Mocked in scanner tests.
#[async_trait]
pub trait UsageChecker: Send + Sync {
    async fn fetch_usage(&self, org_id: &str, session_cookie: &str) -> Result<UsageInfo>;
}

/// Usage client backed by the Claude web API.
#[derive(Debug)]
pub struct HttpUsageClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpUsageClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point at a non-default host (test servers).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building usage API client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl UsageChecker for HttpUsageClient {
    async fn fetch_usage(&self, org_id: &str, session_cookie: &str) -> Result<UsageInfo> {
        let url = format!("{}/api/organizations/{org_id}/usage", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Cookie", format!("sessionKey={session_cookie}"))
            .header(
                "User-Agent",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
            )
            .header("Accept", "application/json")
            .send()
            .await
            .context("fetching usage")?;

        let status = response.status();
        if !status.is_success() {
            bail!("usage API returned {}", status.as_u16());
        }

        response
            .json::<UsageInfo>()
            .await
            .context("decoding usage response")
    }
}
