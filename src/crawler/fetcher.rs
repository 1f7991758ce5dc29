//! HTTP fetch collaborator
//!
//! The scheduler core only sees the [`Fetcher`] trait; this module
//! provides the reqwest-backed implementation. There is deliberately no
//! retry logic here: a failed fetch is counted as a failed job at its
//! level, and callers wanting retries wrap the trait.

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Typed fetch failures, counted per level by the scheduler
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

/// Fetch collaborator interface
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the target and returns its body as text
    async fn fetch(&self, target: &str) -> Result<String, FetchError>;
}

/// Reqwest-backed fetcher with a browser-like header set
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.7"),
        );
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, target: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol(format!("HTTP {}", status.as_u16())));
        }

        response.text().await.map_err(classify_error)
    }
}

/// Maps reqwest errors onto the crate's fetch taxonomy
fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::ConnectionRefused
    } else if e.is_status() || e.is_redirect() {
        FetchError::Protocol(e.to_string())
    } else {
        FetchError::Other(e.to_string())
    }
}
