//! HTTP access to the government open data feeds
//!
//! Every tool that needs remote XML goes through [`FeedClient`], which applies
//! the configured timeout, user agent and retry policy.


use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use ureq::Agent;
use url::Url;

use crate::config::FeedConfig;

/// Failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error {0}")]
    Status(u16),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Failed to read response body: {0}")]
    Body(String),
    #[error("Request failed: {0}")]
    Other(String),
}

impl FetchError {
    /// Timeouts, connection failures, 5xx and 429 are worth another attempt
    #[inline]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Body(_) | Self::Other(_) => false,
        }
    }
}

impl From<ureq::Error> for FetchError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(code) => Self::Status(code),
            ureq::Error::Timeout(_) => Self::Timeout(error.to_string()),
            ureq::Error::Io(e) => Self::Connection(e.to_string()),
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                Self::Connection(error.to_string())
            }
            other => Self::Other(other.to_string()),
        }
    }
}

/// Blocking HTTP agent wrapped for use from async tool handlers
#[derive(Debug, Clone)]
pub struct FeedClient {
    agent: Agent,
    config: FeedConfig,
}

impl FeedClient {
    #[inline]
    pub fn new(config: FeedConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self { agent, config }
    }

    /// Fetch an XML document as text, retrying transient failures
    #[inline]
    pub async fn fetch_xml(&self, url: &str) -> Result<String> {
        validate_url(url)?;

        let mut attempt = 0;

        loop {
            let agent = self.agent.clone();
            let target = url.to_string();
            let outcome = tokio::task::spawn_blocking(move || try_get(&agent, &target))
                .await
                .context("Fetch task panicked")?;

            match outcome {
                Ok(body) => {
                    debug!("Fetched {} bytes from {} (attempt {})", body.len(), url, attempt + 1);
                    return Ok(body);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    warn!("Retryable error for {}: {}", url, e);
                    attempt += 1;
                    debug!("Retrying request to {} (attempt {})", url, attempt + 1);
                    tokio::time::sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                }
                Err(e) => {
                    error!("Failed to fetch {} after {} attempt(s): {}", url, attempt + 1, e);
                    return Err(anyhow::Error::from(e))
                        .with_context(|| format!("Failed to fetch {}", url));
                }
            }
        }
    }
}

impl Default for FeedClient {
    #[inline]
    fn default() -> Self {
        Self::new(FeedConfig::default())
    }
}

/// Single GET without retry logic
fn try_get(agent: &Agent, url: &str) -> Result<String, FetchError> {
    debug!("Making HTTP GET request to: {}", url);

    let mut response = agent.get(url).call()?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| FetchError::Body(e.to_string()))
}

/// Validate that a feed URL is http(s) and has a host
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}
