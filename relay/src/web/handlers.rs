//! Webhook endpoint handlers.
//!
//! Each delivery runs through:
//! 1. Read the raw body once
//! 2. Require the `stripe-signature` header and a configured secret
//! 3. Verify the signature
//! 4. Forward the untouched body downstream, exactly once
//! 5. Report the downstream result back to Stripe
//!
//! Stripe retries any non-2xx, so nothing here retries on its own.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::event::EventSummary;
use crate::forward::{Delivery, Downstream, ForwardOutcome, Forwarder, SIGNATURE_HEADER};
use crate::verify::verify_stripe_signature;
use crate::web::error::{ErrorBody, WebhookError};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub downstream: Arc<dyn Downstream>,
}

impl AppState {
    /// Build state that forwards through a real HTTP client.
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let forwarder = Forwarder::new(config.clone())?;
        Ok(Self::with_downstream(config, Arc::new(forwarder)))
    }

    pub fn with_downstream(config: Arc<Config>, downstream: Arc<dyn Downstream>) -> Self {
        Self { config, downstream }
    }
}

/// Success body, also used by the health check.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub ok: bool,
}

impl Ack {
    fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check endpoint.
pub async fn health() -> Json<Ack> {
    Ack::ok()
}

// =============================================================================
// Stripe Webhook
// =============================================================================

/// Stripe webhook endpoint.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Ack>, WebhookError> {
    let request_id = Uuid::new_v4().to_string();

    let payload = body.map_err(|e| {
        error!(request_id = %request_id, error = %e, "stripe_webhook_body_unreadable");
        WebhookError::BodyUnreadable
    })?;

    info!(
        request_id = %request_id,
        body_length = payload.len(),
        has_signature = headers.contains_key(SIGNATURE_HEADER),
        "stripe_webhook_received"
    );

    let signature = match headers.get(SIGNATURE_HEADER) {
        Some(value) => value.to_str().map_err(|_| {
            warn!(request_id = %request_id, "stripe_signature_not_visible_ascii");
            WebhookError::InvalidSignature
        })?,
        None => {
            warn!(request_id = %request_id, "stripe_signature_missing");
            return Err(WebhookError::MissingSignature);
        }
    };

    let secret = state.config.signing_secret().ok_or_else(|| {
        error!(request_id = %request_id, "stripe_webhook_secret_not_configured");
        WebhookError::SecretNotConfigured
    })?;

    let verification = verify_stripe_signature(&payload, signature, secret);
    if !verification.valid {
        warn!(request_id = %request_id, "stripe_signature_invalid");
        return Err(WebhookError::InvalidSignature);
    }

    let summary = EventSummary::from_payload(&payload);
    info!(
        request_id = %request_id,
        event_type = ?summary.event_type,
        event_id = ?summary.id,
        signed_at = ?verification.timestamp,
        "stripe_webhook_verified"
    );

    let delivery = Delivery {
        request_id: &request_id,
        payload: &payload,
        signature,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        summary: &summary,
    };

    let outcome = state.downstream.forward(delivery).await;

    info!(
        request_id = %request_id,
        outcome = outcome.label(),
        "stripe_webhook_forwarded"
    );

    match outcome {
        ForwardOutcome::Success { .. } => Ok(Ack::ok()),
        ForwardOutcome::DownstreamRejected { status } => {
            Err(WebhookError::DownstreamRejected { status })
        }
        ForwardOutcome::NetworkError { classification, .. } => {
            Err(WebhookError::Network { classification })
        }
        ForwardOutcome::ConfigurationError { reason } => Err(WebhookError::ForwardConfig(reason)),
    }
}

/// Any method other than POST on the webhook route.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST")],
        Json(ErrorBody::new("Method not allowed")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::expected_signature;
    use crate::web::router;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, Router};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tower::ServiceExt;

    const SECRET: &str = "whsec_test";
    const BODY: &str = r#"{"type":"x","id":"evt_1"}"#;
    const PATH: &str = "/api/stripe/webhook";

    /// Fixed downstream response for a stub.
    #[derive(Clone, Copy)]
    enum Reply {
        Accept,
        Reject(u16),
        Panic,
    }

    struct StubDownstream {
        reply: Reply,
        received: Mutex<Vec<(Vec<u8>, String, Option<String>)>>,
    }

    impl StubDownstream {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                received: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Downstream for StubDownstream {
        async fn forward(&self, delivery: Delivery<'_>) -> ForwardOutcome {
            self.received
                .lock()
                .unwrap()
                .push((
                    delivery.payload.to_vec(),
                    delivery.signature.to_string(),
                    delivery.content_type.map(str::to_string),
                ));

            match self.reply {
                Reply::Accept => ForwardOutcome::Success { status: 200 },
                Reply::Reject(status) => ForwardOutcome::DownstreamRejected { status },
                Reply::Panic => panic!("downstream exploded"),
            }
        }
    }

    fn config() -> Config {
        Config {
            stripe_webhook_secret: Some(SECRET.to_string()),
            ..Config::default()
        }
    }

    fn app_with(config: Config, downstream: Arc<dyn Downstream>) -> Router {
        router(AppState::with_downstream(Arc::new(config), downstream))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn signature_for(body: &str, timestamp: i64) -> String {
        let sig = expected_signature(SECRET.as_bytes(), timestamp, body.as_bytes()).unwrap();
        format!("t={},v1={}", timestamp, sig)
    }

    fn signed_request(body: &str, signature: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(PATH)
            .header("content-type", "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("handler should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        let json = serde_json::from_slice(&bytes).expect("response should be JSON");
        (status, json)
    }

    #[tokio::test]
    async fn test_valid_delivery_is_forwarded_verbatim() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(config(), stub.clone());
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"ok": true}));

        let received = stub.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, BODY.as_bytes());
        assert_eq!(received[0].1, signature);
        assert_eq!(received[0].2.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_delivery_without_content_type() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(config(), stub.clone());
        let signature = signature_for(BODY, now());
        let request = Request::builder()
            .method("POST")
            .uri(PATH)
            .header(SIGNATURE_HEADER, signature.as_str())
            .body(Body::from(BODY))
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"ok": true}));
        let received = stub.received.lock().unwrap();
        assert_eq!(received[0].0, BODY.as_bytes());
        assert_eq!(received[0].2, None);
    }

    #[tokio::test]
    async fn test_silent_downstream_times_out_as_bad_gateway() {
        // Accepts connections but never completes the TLS handshake
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let holder = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = Config {
            forward_url: Some(format!("https://{}/hook", addr)),
            forward_bearer_token: Some("tok".to_string()),
            forward_timeout_ms: 200,
            ..config()
        };
        let app = router(AppState::new(config).unwrap());
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["details"]["name"], "NetworkError");
        assert_eq!(json["details"]["code"], "timeout");
        holder.abort();
    }

    #[tokio::test]
    async fn test_flipped_byte_is_invalid_signature() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(config(), stub.clone());
        let signature = signature_for(BODY, now());
        let tampered = BODY.replace("evt_1", "evt_2");

        let (status, json) = send(app, signed_request(&tampered, &signature)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Invalid signature"}));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_timestamp_is_invalid_signature() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(config(), stub.clone());
        let signature = signature_for(BODY, now() - 301);

        let (status, _) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_header() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(config(), stub.clone());
        let request = Request::builder()
            .method("POST")
            .uri(PATH)
            .body(Body::from(BODY))
            .unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({"error": "Missing stripe-signature header"}));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_is_method_not_allowed() {
        let app = app_with(config(), StubDownstream::new(Reply::Accept));
        let request = Request::builder().uri(PATH).body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, json!({"error": "Method not allowed"}));
    }

    #[tokio::test]
    async fn test_secret_not_configured() {
        let stub = StubDownstream::new(Reply::Accept);
        let app = app_with(Config::default(), stub.clone());
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Webhook secret not configured"}));
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_downstream_rejection_is_bad_gateway() {
        let app = app_with(config(), StubDownstream::new(Reply::Reject(503)));
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "Downstream rejected webhook");
        assert_eq!(json["details"]["name"], "DownstreamRejected");
        assert_eq!(json["details"]["code"], "503");
    }

    #[tokio::test]
    async fn test_unreachable_downstream_is_bad_gateway() {
        let config = Config {
            forward_url: Some("https://127.0.0.1:1/hook".to_string()),
            forward_bearer_token: Some("tok".to_string()),
            forward_timeout_ms: 2_000,
            ..config()
        };
        let app = router(AppState::new(config).unwrap());
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "Failed to forward webhook");
        assert_eq!(json["details"]["name"], "NetworkError");
    }

    #[tokio::test]
    async fn test_missing_forward_url_is_configuration_error() {
        let app = router(AppState::new(config()).unwrap());
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Forward destination not configured"}));
    }

    #[tokio::test]
    async fn test_panic_becomes_generic_error() {
        let app = app_with(config(), StubDownstream::new(Reply::Panic));
        let signature = signature_for(BODY, now());

        let (status, json) = send(app, signed_request(BODY, &signature)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal server error"}));
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(config(), StubDownstream::new(Reply::Accept));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, json) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"ok": true}));
    }
}
