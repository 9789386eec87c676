//! Parser for the `stripe-signature` header.
//!
//! Format: `t=<unix-seconds>,v1=<hex>[,v1=<hex>...]`. Segments may appear in any
//! order and carry whitespace around the commas. Unknown schemes (`v0=`, future
//! versions) are ignored.

/// One signature value to check, paired with the header timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCandidate {
    /// Unix seconds from the header's `t=` field
    pub timestamp: i64,
    /// Hex digest from a `v1=` field, exactly as sent
    pub signature_hex: String,
}

/// Parse a signature header into candidates, in header order.
///
/// Returns an empty set when there is no `t=` field, when the first `t=` field
/// is not an integer, or when there is no `v1=` field.
pub fn parse_signature_header(header: &str) -> Vec<SignatureCandidate> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for segment in header.split(',').map(str::trim) {
        if let Some(value) = segment.strip_prefix("t=") {
            // First timestamp wins
            if timestamp.is_none() {
                timestamp = Some(value);
            }
        } else if let Some(value) = segment.strip_prefix("v1=") {
            signatures.push(value);
        }
    }

    let timestamp = match timestamp.and_then(|t| t.parse::<i64>().ok()) {
        Some(t) => t,
        None => return Vec::new(),
    };

    signatures
        .into_iter()
        .map(|sig| SignatureCandidate {
            timestamp,
            signature_hex: sig.to_string(),
        })
        .collect()
}
