//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup. Secrets and the forward destination
//! are optional here: a missing value is reported per request as a
//! configuration error instead of aborting the process.

use std::env;
use tracing::warn;

/// Default bounded wait for the downstream response.
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 10_000;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Route that receives Stripe deliveries
    pub webhook_path: String,

    /// Liveness route
    pub health_path: String,

    /// Stripe endpoint signing secret, used as raw bytes
    pub stripe_webhook_secret: Option<String>,

    // =========================================================================
    // Forward Destination
    // =========================================================================

    /// Downstream URL that receives verified payloads (https only)
    pub forward_url: Option<String>,

    /// Bearer credential presented to the downstream
    pub forward_bearer_token: Option<String>,

    /// Optional value sent in the `x-relay-secret` header
    pub forward_shared_secret: Option<String>,

    /// Downstream request timeout in milliseconds
    pub forward_timeout_ms: u64,

    /// Replace forwarded bodies with a synthetic ping payload
    pub ping_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            webhook_path: "/api/stripe/webhook".to_string(),
            health_path: "/health".to_string(),
            stripe_webhook_secret: None,
            forward_url: None,
            forward_bearer_token: None,
            forward_shared_secret: None,
            forward_timeout_ms: DEFAULT_FORWARD_TIMEOUT_MS,
            ping_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_number("PORT", defaults.port),

            webhook_path: non_empty("WEBHOOK_PATH").unwrap_or(defaults.webhook_path),

            health_path: non_empty("HEALTH_PATH").unwrap_or(defaults.health_path),

            stripe_webhook_secret: non_empty("STRIPE_WEBHOOK_SECRET"),

            forward_url: non_empty("FORWARD_URL"),

            forward_bearer_token: non_empty("FORWARD_BEARER_TOKEN"),

            forward_shared_secret: non_empty("FORWARD_SHARED_SECRET"),

            forward_timeout_ms: parse_number("FORWARD_TIMEOUT_MS", defaults.forward_timeout_ms),

            ping_mode: parse_flag("FORWARD_PING_MODE", defaults.ping_mode),
        }
    }

    /// The verification secret as raw key bytes, if configured.
    pub fn signing_secret(&self) -> Option<&[u8]> {
        self.stripe_webhook_secret.as_deref().map(str::as_bytes)
    }
}

/// Read a variable, treating empty and whitespace-only values as unset.
fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_number<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

/// Parse a boolean flag such as `true`, `1`, `yes` or `off`.
fn parse_flag(name: &str, default: bool) -> bool {
    let raw = match non_empty(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(env_var = name, value = %raw, "Invalid flag value, using default");
            default
        }
    }
}
