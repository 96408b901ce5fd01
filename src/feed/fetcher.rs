use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;

use crate::domain::Feed;
use crate::feed::normalize::normalize;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and shaping one source feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the fetch timeout
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Body could not be parsed as RSS or Atom
    #[error("parse error: {0}")]
    Parse(String),
}

/// Capability for turning a source URL into a normalized feed.
///
/// The crawler consumes this trait only; transport concerns live in the
/// implementation.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source_url: &str) -> Result<Feed, FetchError>;
}

/// HTTP implementation of [`FeedFetcher`]: reqwest GET, size-limited body
/// read, `feed-rs` parse, then normalization.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_response_bytes: usize,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: FETCH_TIMEOUT,
            max_response_bytes: MAX_FEED_SIZE,
        }
    }

    /// Overrides the timeout and response size limit.
    pub fn with_limits(mut self, timeout: Duration, max_response_bytes: usize) -> Self {
        self.timeout = timeout;
        self.max_response_bytes = max_response_bytes;
        self
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source_url: &str) -> Result<Feed, FetchError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(source_url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_response_bytes).await?;

        let raw = feed_rs::parser::parse(&bytes[..]).map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(normalize(source_url, raw))
    }
}

/// Reads the response body in chunks, failing as soon as the size limit is
/// exceeded rather than buffering an unbounded payload.
async fn read_limited_bytes(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
