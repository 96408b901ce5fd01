//! Social sharing: a stateless wrapper around a third-party posting API.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SocialError {
    #[error("unsupported share medium: {0}")]
    UnsupportedMedium(String),
    #[error("share request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("posting API returned status {0}")]
    Api(u16),
}

/// Where a share is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Twitter,
}

impl FromStr for Medium {
    type Err = SocialError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "twitter" => Ok(Medium::Twitter),
            other => Err(SocialError::UnsupportedMedium(other.to_string())),
        }
    }
}

/// Capability for publishing a short text post.
#[async_trait]
pub trait Poster: Send + Sync {
    async fn post(&self, text: &str) -> Result<(), SocialError>;
}

/// Bearer-token JSON poster for an HTTP publishing API.
pub struct HttpPoster {
    client: reqwest::Client,
    endpoint: String,
    token: SecretString,
}

impl HttpPoster {
    pub fn new(client: reqwest::Client, endpoint: String, token: SecretString) -> Self {
        Self {
            client,
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl Poster for HttpPoster {
    async fn post(&self, text: &str) -> Result<(), SocialError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .json(&json!({ "text": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SocialError::Api(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Formats and publishes article shares.
pub struct SocialService {
    poster: Arc<dyn Poster>,
}

impl SocialService {
    pub fn new(poster: Arc<dyn Poster>) -> Self {
        Self { poster }
    }

    pub async fn share(&self, article_link: &str, medium: Medium) -> Result<(), SocialError> {
        match medium {
            Medium::Twitter => {
                let text = format!("This is an interesting read: {article_link}");
                self.poster.post(&text).await
            }
        }
    }
}
