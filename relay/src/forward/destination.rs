//! Validation of the configured forward destination.

use reqwest::header::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::Config;

/// Server-side forwarding settings that are missing or unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardConfigError {
    #[error("FORWARD_URL is not set")]
    MissingUrl,

    #[error("FORWARD_URL is not a valid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("FORWARD_URL must use https, got {0}")]
    InsecureScheme(String),

    #[error("FORWARD_BEARER_TOKEN is not set")]
    MissingCredential,

    #[error("FORWARD_BEARER_TOKEN is not a valid header value")]
    InvalidCredential,

    #[error("FORWARD_SHARED_SECRET is not a valid header value")]
    InvalidSharedSecret,
}

/// A destination that passed validation and may be contacted.
#[derive(Debug, Clone)]
pub struct Destination {
    url: Url,
    bearer_token: String,
    shared_secret: Option<String>,
}

impl Destination {
    /// Validate the configured destination without touching the network.
    pub fn resolve(config: &Config) -> Result<Self, ForwardConfigError> {
        let raw = config
            .forward_url
            .as_deref()
            .ok_or(ForwardConfigError::MissingUrl)?;

        let url = Url::parse(raw.trim())?;

        if url.scheme() != "https" {
            return Err(ForwardConfigError::InsecureScheme(url.scheme().to_string()));
        }

        let bearer_token = config
            .forward_bearer_token
            .clone()
            .ok_or(ForwardConfigError::MissingCredential)?;

        // Values from mounted secret files often carry a trailing newline
        if HeaderValue::from_str(&format!("Bearer {}", bearer_token)).is_err() {
            return Err(ForwardConfigError::InvalidCredential);
        }

        let shared_secret = config.forward_shared_secret.clone();
        if let Some(secret) = &shared_secret {
            if HeaderValue::from_str(secret).is_err() {
                return Err(ForwardConfigError::InvalidSharedSecret);
            }
        }

        Ok(Self {
            url,
            bearer_token,
            shared_secret,
        })
    }

    /// Build a destination without the https check, for local mock servers.
    #[cfg(test)]
    pub(crate) fn insecure_for_tests(url: &str, bearer_token: &str, shared_secret: Option<&str>) -> Self {
        Self {
            url: Url::parse(url).unwrap(),
            bearer_token: bearer_token.to_string(),
            shared_secret: shared_secret.map(str::to_string),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    pub fn shared_secret(&self) -> Option<&str> {
        self.shared_secret.as_deref()
    }
}
