//! Stripe webhook signature verification.
//!
//! Stripe signs each delivery with HMAC-SHA256 over `"<timestamp>.<raw body>"`.
//! Reference: https://docs.stripe.com/webhooks#verify-manually

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::header::{parse_signature_header, SignatureCandidate};

type HmacSha256 = Hmac<Sha256>;

/// Maximum distance in seconds between the header timestamp and now, in either direction.
pub const SIGNATURE_TOLERANCE_SECS: u64 = 300;

/// Result of verifying one delivery.
///
/// Never reveals which candidate matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub valid: bool,
    /// Timestamp of the accepted signature, only set when `valid`
    pub timestamp: Option<i64>,
}

impl VerificationOutcome {
    fn invalid() -> Self {
        Self {
            valid: false,
            timestamp: None,
        }
    }

    fn accepted(timestamp: i64) -> Self {
        Self {
            valid: true,
            timestamp: Some(timestamp),
        }
    }
}

/// Verify a Stripe webhook signature against the current clock.
///
/// # Arguments
///
/// * `payload` - The raw request body, exactly as received
/// * `header` - The `stripe-signature` header value
/// * `secret` - The endpoint signing secret, used as-is as the HMAC key
pub fn verify_stripe_signature(payload: &[u8], header: &str, secret: &[u8]) -> VerificationOutcome {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    verify_stripe_signature_at(payload, header, secret, i64::try_from(now).unwrap_or(i64::MAX))
}

/// Verify a Stripe webhook signature against an explicit clock value.
///
/// Every candidate is tried in header order; the first one inside the
/// tolerance window whose digest matches makes the delivery valid.
pub fn verify_stripe_signature_at(
    payload: &[u8],
    header: &str,
    secret: &[u8],
    now: i64,
) -> VerificationOutcome {
    let candidates = parse_signature_header(header);

    if candidates.is_empty() {
        warn!(header_length = header.len(), "stripe_signature_no_candidates");
        return VerificationOutcome::invalid();
    }

    for candidate in &candidates {
        if candidate_matches(payload, secret, candidate, now) {
            return VerificationOutcome::accepted(candidate.timestamp);
        }
    }

    warn!(
        candidate_count = candidates.len(),
        "stripe_signature_mismatch"
    );

    VerificationOutcome::invalid()
}

fn candidate_matches(
    payload: &[u8],
    secret: &[u8],
    candidate: &SignatureCandidate,
    now: i64,
) -> bool {
    // Verify timestamp is within tolerance (prevents replay attacks)
    let age = now.abs_diff(candidate.timestamp);
    if age > SIGNATURE_TOLERANCE_SECS {
        debug!(
            webhook_time = candidate.timestamp,
            current_time = now,
            age_seconds = age,
            max_age_seconds = SIGNATURE_TOLERANCE_SECS,
            "stripe_signature_outside_tolerance"
        );
        return false;
    }

    let expected = match expected_signature(secret, candidate.timestamp, payload) {
        Some(sig) => sig,
        None => return false,
    };

    let provided = candidate.signature_hex.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }

    // Constant-time comparison to prevent timing attacks
    expected.as_bytes().ct_eq(provided).into()
}

/// Compute the hex digest Stripe would send for `payload` signed at `timestamp`.
///
/// The signed message is the decimal timestamp, a literal `.`, then the raw
/// payload bytes.
pub fn expected_signature(secret: &[u8], timestamp: i64, payload: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(m) => m,
        Err(_) => {
            warn!("stripe_signature_invalid_key");
            return None;
        }
    };

    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    Some(hex::encode(mac.finalize().into_bytes()))
}
