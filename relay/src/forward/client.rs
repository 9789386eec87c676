//! HTTP client that posts verified payloads downstream.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, redirect, Client, Response};
use serde_json::json;
use tracing::{error, info, warn};

use super::destination::Destination;
use super::outcome::{ForwardOutcome, NetworkErrorKind};
use super::{Delivery, Downstream, REQUEST_ID_HEADER, SHARED_SECRET_HEADER, SIGNATURE_HEADER};
use crate::Config;

/// Maximum number of characters of a rejected response body kept for logs.
pub const BODY_PREVIEW_CHARS: usize = 500;

/// Upper bound on bytes read from a rejected response body.
const PREVIEW_READ_LIMIT: usize = BODY_PREVIEW_CHARS * 4;

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Forwards deliveries to the destination described by the shared config.
///
/// The destination is validated on every call so that a misconfigured
/// deployment answers each delivery with a configuration error.
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    config: Arc<Config>,
    timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder with its own connection pool.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        let timeout = Duration::from_millis(config.forward_timeout_ms);

        Ok(Self {
            client,
            config,
            timeout,
        })
    }

    /// Post one delivery to an already validated destination.
    pub async fn deliver(&self, destination: &Destination, delivery: &Delivery<'_>) -> ForwardOutcome {
        let (body, content_type) = if self.config.ping_mode {
            (ping_body(delivery), DEFAULT_CONTENT_TYPE)
        } else {
            (
                delivery.payload.to_vec(),
                delivery.content_type.unwrap_or(DEFAULT_CONTENT_TYPE),
            )
        };

        info!(
            request_id = %delivery.request_id,
            host = destination.url().host_str().unwrap_or_default(),
            body_length = body.len(),
            ping_mode = self.config.ping_mode,
            timeout_seconds = self.timeout.as_secs_f64(),
            "forward_starting"
        );

        let mut request = self
            .client
            .post(destination.url().clone())
            .timeout(self.timeout)
            .bearer_auth(destination.bearer_token())
            .header(header::CONTENT_TYPE, content_type)
            .header(SIGNATURE_HEADER, delivery.signature)
            .header(REQUEST_ID_HEADER, delivery.request_id);

        if let Some(secret) = destination.shared_secret() {
            request = request.header(SHARED_SECRET_HEADER, secret);
        }

        match request.body(body).send().await {
            Ok(resp) => classify_response(delivery.request_id, resp).await,
            Err(e) => {
                let classification = NetworkErrorKind::classify(&e);
                error!(
                    request_id = %delivery.request_id,
                    code = classification.code(),
                    error = %e,
                    "forward_network_error"
                );
                ForwardOutcome::NetworkError {
                    classification,
                    detail: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl Downstream for Forwarder {
    async fn forward(&self, delivery: Delivery<'_>) -> ForwardOutcome {
        match Destination::resolve(&self.config) {
            Ok(destination) => self.deliver(&destination, &delivery).await,
            Err(reason) => {
                error!(
                    request_id = %delivery.request_id,
                    reason = %reason,
                    "forward_configuration_error"
                );
                ForwardOutcome::ConfigurationError { reason }
            }
        }
    }
}

async fn classify_response(request_id: &str, resp: Response) -> ForwardOutcome {
    let status = resp.status().as_u16();

    if resp.status().is_success() {
        info!(request_id = %request_id, status_code = status, "forward_complete");
        return ForwardOutcome::Success { status };
    }

    // Read for diagnostics only; the body never leaves this process
    let preview = read_preview(resp).await;

    warn!(
        request_id = %request_id,
        status_code = status,
        body_preview = %preview,
        "forward_rejected"
    );

    ForwardOutcome::DownstreamRejected { status }
}

/// Read at most `PREVIEW_READ_LIMIT` bytes of the body, then drop the response.
async fn read_preview(mut resp: Response) -> String {
    let mut buf: Vec<u8> = Vec::new();

    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = PREVIEW_READ_LIMIT - buf.len();
                buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if buf.len() >= PREVIEW_READ_LIMIT {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) if buf.is_empty() => return format!("<unreadable: {}>", e),
            Err(_) => break,
        }
    }

    body_preview(&String::from_utf8_lossy(&buf))
}

fn body_preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Synthetic body sent instead of the real payload in ping mode.
fn ping_body(delivery: &Delivery<'_>) -> Vec<u8> {
    json!({
        "ping": true,
        "request_id": delivery.request_id,
        "event_type": delivery.summary.event_type,
        "event_id": delivery.summary.id,
    })
    .to_string()
    .into_bytes()
}
