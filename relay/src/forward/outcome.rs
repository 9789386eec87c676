//! Result of a single forward attempt.

use std::error::Error as StdError;
use std::io;

use super::destination::ForwardConfigError;

/// What happened to one forward attempt. Exactly one variant per attempt.
#[derive(Debug)]
pub enum ForwardOutcome {
    /// Downstream answered 2xx
    Success { status: u16 },
    /// Downstream answered outside 2xx
    DownstreamRejected { status: u16 },
    /// Destination settings unusable; no request was sent
    ConfigurationError { reason: ForwardConfigError },
    /// No usable response was received
    NetworkError {
        classification: NetworkErrorKind,
        /// Transport error text, for internal logs only
        detail: String,
    },
}

impl ForwardOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ForwardOutcome::Success { .. })
    }

    /// Short label used in log fields.
    pub fn label(&self) -> &'static str {
        match self {
            ForwardOutcome::Success { .. } => "success",
            ForwardOutcome::DownstreamRejected { .. } => "downstream_rejected",
            ForwardOutcome::ConfigurationError { .. } => "configuration_error",
            ForwardOutcome::NetworkError { .. } => "network_error",
        }
    }
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    Dns,
    ConnectionRefused,
    ConnectionReset,
    Tls,
    Connect,
    Other,
}

impl NetworkErrorKind {
    /// Classify a `reqwest` error by walking its source chain.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return NetworkErrorKind::Timeout;
        }

        let mut messages = Vec::new();
        let mut source: Option<&(dyn StdError + 'static)> = err.source();

        while let Some(cause) = source {
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => return NetworkErrorKind::ConnectionRefused,
                    io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                        return NetworkErrorKind::ConnectionReset
                    }
                    io::ErrorKind::TimedOut => return NetworkErrorKind::Timeout,
                    _ => {}
                }
            }
            messages.push(cause.to_string().to_lowercase());
            source = cause.source();
        }

        let text = messages.join(": ");

        if text.contains("dns error") || text.contains("failed to lookup address") {
            NetworkErrorKind::Dns
        } else if text.contains("connection refused") {
            NetworkErrorKind::ConnectionRefused
        } else if text.contains("connection reset") {
            NetworkErrorKind::ConnectionReset
        } else if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            NetworkErrorKind::Tls
        } else if err.is_connect() {
            NetworkErrorKind::Connect
        } else {
            NetworkErrorKind::Other
        }
    }

    /// Stable reason code reported to the sender.
    pub fn code(&self) -> &'static str {
        match self {
            NetworkErrorKind::Timeout => "timeout",
            NetworkErrorKind::Dns => "ENOTFOUND",
            NetworkErrorKind::ConnectionRefused => "ECONNREFUSED",
            NetworkErrorKind::ConnectionReset => "ECONNRESET",
            NetworkErrorKind::Tls => "TLS_HANDSHAKE",
            NetworkErrorKind::Connect => "ECONNECT",
            NetworkErrorKind::Other => "UNKNOWN",
        }
    }

    /// Human-readable description without transport internals.
    pub fn description(&self) -> &'static str {
        match self {
            NetworkErrorKind::Timeout => "downstream did not respond in time",
            NetworkErrorKind::Dns => "downstream host could not be resolved",
            NetworkErrorKind::ConnectionRefused => "downstream refused the connection",
            NetworkErrorKind::ConnectionReset => "connection to downstream was reset",
            NetworkErrorKind::Tls => "TLS handshake with downstream failed",
            NetworkErrorKind::Connect => "could not connect to downstream",
            NetworkErrorKind::Other => "request to downstream failed",
        }
    }
}
