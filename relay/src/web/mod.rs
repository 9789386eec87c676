//! Web server module for handling inbound Stripe webhooks.
//!
//! This module provides a thin web server that:
//! - Verifies the `stripe-signature` of each delivery
//! - Forwards the raw payload to one downstream endpoint
//! - Mirrors the downstream result back to Stripe

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub use error::{handle_panic, ErrorBody, ErrorDetails, WebhookError};
pub use handlers::{health, method_not_allowed, stripe_webhook, Ack, AppState};

/// Build the router for the configured webhook and health paths.
pub fn router(state: AppState) -> Router {
    let webhook_path = state.config.webhook_path.clone();
    let health_path = state.config.health_path.clone();

    Router::new()
        .route(&health_path, get(health))
        .route(
            &webhook_path,
            post(stripe_webhook).fallback(method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
