//! Stripe Relay - signature-verifying webhook relay.
//!
//! Receives Stripe webhook deliveries, authenticates them against the
//! endpoint signing secret and forwards the byte-identical payload to a
//! single internal endpoint. The downstream result is mirrored back to
//! Stripe so its retry policy governs delivery.
//!
//! ## Architecture
//!
//! ```text
//! Stripe → web (handler) → verify → forward → downstream
//!                              ↘ event (logging only)
//! ```

pub mod config;
pub mod event;
pub mod forward;
pub mod verify;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use event::EventSummary;
pub use forward::{Delivery, Downstream, ForwardOutcome, Forwarder};
pub use verify::{verify_stripe_signature, VerificationOutcome};
pub use web::{router, AppState};
