//! Stripe webhook authentication.
//!
//! Verification runs in two stages:
//! - `header`: parse the `stripe-signature` header into candidates
//! - `signature`: recompute HMAC-SHA256 per candidate and compare in constant time
//!
//! Verification is total: malformed input yields an invalid outcome, never an error.

pub mod header;
pub mod signature;

pub use header::{parse_signature_header, SignatureCandidate};
pub use signature::{
    expected_signature, verify_stripe_signature, verify_stripe_signature_at,
    VerificationOutcome, SIGNATURE_TOLERANCE_SECS,
};
