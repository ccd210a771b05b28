//! HTTP client for the partner projections API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{ParlayerError, Result};
use crate::feed::ProjectionFeed;
use crate::models::{ProjectionBatch, RawEnvelope};

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2.1 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:122.0) Gecko/20100101 Firefox/122.0",
];

/// Fetches projections over HTTP with retry and exponential backoff.
pub struct HttpFeed {
    http: Client,
    url: String,
    max_attempts: u32,
    base_delay: Duration,
    next_agent: AtomicUsize,
}

impl HttpFeed {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            max_attempts: 1,
            base_delay: Duration::ZERO,
            next_agent: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.feed_timeout))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                Client::new()
            });

        Self {
            http,
            url: config.feed_url.clone(),
            max_attempts: config.feed_retries.max(1),
            base_delay: Duration::from_millis(config.feed_retry_delay_ms),
            next_agent: AtomicUsize::new(0),
        }
    }

    fn user_agent(&self) -> &'static str {
        let i = self.next_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[i % USER_AGENTS.len()]
    }

    /// Delay before the retry following `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    async fn get_with_retry(&self) -> Result<Value> {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let response = self
                .http
                .get(&self.url)
                .header(header::USER_AGENT, self.user_agent())
                .header(header::ACCEPT, "application/json")
                .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::PRAGMA, "no-cache")
                .send()
                .await;

            let wait = match response {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .map(Duration::from_secs);
                    if attempt >= self.max_attempts {
                        return Err(ParlayerError::Feed(format!(
                            "rate limited after {} attempts",
                            attempt
                        )));
                    }
                    let wait = retry_after.unwrap_or_else(|| self.backoff(attempt));
                    warn!(attempt, wait_ms = wait.as_millis() as u64, "Feed rate limited");
                    wait
                }
                Ok(response) if !response.status().is_success() => {
                    let status = response.status();
                    if attempt >= self.max_attempts {
                        return Err(ParlayerError::Feed(format!("feed returned status {}", status)));
                    }
                    let wait = self.backoff(attempt);
                    warn!(attempt, %status, wait_ms = wait.as_millis() as u64, "Feed request failed");
                    wait
                }
                Ok(response) => return Ok(response.json::<Value>().await?),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(err.into());
                    }
                    let wait = self.backoff(attempt);
                    warn!(attempt, error = %err, wait_ms = wait.as_millis() as u64, "Feed request failed");
                    wait
                }
            };

            sleep(wait).await;
        }
    }
}

#[async_trait]
impl ProjectionFeed for HttpFeed {
    async fn fetch(&self) -> Result<ProjectionBatch> {
        debug!(url = %self.url, "Fetching projections");
        let body = self.get_with_retry().await?;
        let batch = RawEnvelope::from_json(body)
            .map_err(|e| ParlayerError::Feed(format!("unexpected feed payload: {}", e)))?
            .into_batch();

        info!(
            projections = batch.data.len(),
            included = batch.included.len(),
            skipped = batch.skipped,
            "Fetched projections"
        );
        Ok(batch)
    }
}
