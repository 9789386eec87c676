//! Best-effort event introspection for logging.
//!
//! Nothing here participates in authentication or forwarding decisions.

use serde::Serialize;
use serde_json::Value;

/// The `type` and `id` of a Stripe event, when they can be read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl EventSummary {
    /// Pull `type` and `id` out of a JSON payload.
    ///
    /// Any parse failure, or a field that is not a string, yields `None` for
    /// that field.
    pub fn from_payload(payload: &[u8]) -> Self {
        let value: Value = match serde_json::from_slice(payload) {
            Ok(v) => v,
            Err(_) => return Self::default(),
        };

        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

        Self {
            event_type: field("type"),
            id: field("id"),
        }
    }
}
