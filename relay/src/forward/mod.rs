//! Forwarding of verified payloads to the single downstream endpoint.
//!
//! ## Flow
//!
//! ```text
//! Delivery → Destination::resolve() → POST (bounded by timeout) → ForwardOutcome
//! ```
//!
//! Exactly one attempt is made per delivery. Retries belong to the sender.

pub mod client;
pub mod destination;
pub mod outcome;

use async_trait::async_trait;

use crate::event::EventSummary;

pub use client::{Forwarder, BODY_PREVIEW_CHARS};
pub use destination::{Destination, ForwardConfigError};
pub use outcome::{ForwardOutcome, NetworkErrorKind};

/// Header carrying the optional shared secret to the downstream.
pub const SHARED_SECRET_HEADER: &str = "x-relay-secret";

/// Header carrying the per-delivery request id.
pub const REQUEST_ID_HEADER: &str = "x-relay-request-id";

/// Header carrying Stripe's signature, inbound and outbound.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// A verified delivery ready to be forwarded.
#[derive(Debug, Clone, Copy)]
pub struct Delivery<'a> {
    /// Id assigned to the inbound request
    pub request_id: &'a str,
    /// Raw body exactly as received
    pub payload: &'a [u8],
    /// Original `stripe-signature` header, forwarded verbatim
    pub signature: &'a str,
    /// Inbound content type, if any
    pub content_type: Option<&'a str>,
    /// Introspected event fields, used by ping mode
    pub summary: &'a EventSummary,
}

/// Something that can accept a verified delivery.
///
/// Implementations never return errors: every failure is a `ForwardOutcome`.
#[async_trait]
pub trait Downstream: Send + Sync {
    async fn forward(&self, delivery: Delivery<'_>) -> ForwardOutcome;
}
