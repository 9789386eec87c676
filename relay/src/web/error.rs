//! Mapping of webhook failures to HTTP responses.
//!
//! Response bodies are `{"error": "..."}`, with a `details` object for
//! gateway failures. Secrets, transport internals and downstream bodies never
//! appear here; they go to the log stream only.

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::forward::{ForwardConfigError, NetworkErrorKind};

/// Every way a delivery can fail before a 2xx is returned.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("request body could not be read")]
    BodyUnreadable,

    #[error("Missing stripe-signature header")]
    MissingSignature,

    #[error("Webhook secret not configured")]
    SecretNotConfigured,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("downstream responded with status {status}")]
    DownstreamRejected { status: u16 },

    #[error("{}", .classification.description())]
    Network { classification: NetworkErrorKind },

    #[error(transparent)]
    ForwardConfig(#[from] ForwardConfigError),

    #[error("internal error")]
    Internal,
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Diagnostic detail for gateway-class failures.
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub name: &'static str,
    pub message: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(error: &'static str) -> Self {
        Self {
            error,
            details: None,
        }
    }
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::DownstreamRejected { .. } | WebhookError::Network { .. } => {
                StatusCode::BAD_GATEWAY
            }
            WebhookError::BodyUnreadable
            | WebhookError::SecretNotConfigured
            | WebhookError::ForwardConfig(_)
            | WebhookError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            WebhookError::MissingSignature => ErrorBody::new("Missing stripe-signature header"),
            WebhookError::InvalidSignature => ErrorBody::new("Invalid signature"),
            WebhookError::SecretNotConfigured => ErrorBody::new("Webhook secret not configured"),
            WebhookError::ForwardConfig(_) => ErrorBody::new("Forward destination not configured"),
            WebhookError::DownstreamRejected { status } => ErrorBody {
                error: "Downstream rejected webhook",
                details: Some(ErrorDetails {
                    name: "DownstreamRejected",
                    message: self.to_string(),
                    code: status.to_string(),
                }),
            },
            WebhookError::Network { classification } => ErrorBody {
                error: "Failed to forward webhook",
                details: Some(ErrorDetails {
                    name: "NetworkError",
                    message: classification.description().to_string(),
                    code: classification.code().to_string(),
                }),
            },
            WebhookError::BodyUnreadable | WebhookError::Internal => {
                ErrorBody::new("Internal server error")
            }
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

/// Turn a panic inside request handling into a generic 500.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    error!(panic = %detail, "request_handler_panicked");

    WebhookError::Internal.into_response()
}
