//! Error types for retry policies and coordinated actions.

use std::time::Duration;

use thiserror::Error;

/// Invalid retry policy parameters.
#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("base delay must be non-zero")]
    ZeroBaseDelay,
    #[error("backoff multiplier must be a finite number greater than 1, got {0}")]
    Multiplier(f64),
    #[error("max delay {max_delay:?} is below base delay {base_delay:?}")]
    CeilingBelowBase {
        max_delay: Duration,
        base_delay: Duration,
    },
    #[error("jitter must be in [0, 1), got {0}")]
    Jitter(f64),
    #[error("attempt timeout must be non-zero")]
    ZeroTimeout,
}

/// A single attempt exceeded the policy's attempt timeout.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("attempt timed out after {}ms", .after.as_millis())]
pub struct AttemptTimeout {
    pub after: Duration,
}

/// Structured failure of a remote write or refresh.
///
/// Transports that have no error type of their own can report through this
/// so the default classifier can tell throttling from validation failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// Server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// Connection refused/reset, DNS failure, broken pipe.
    #[error("connection failed: {0}")]
    Connection(String),
    /// Transport-level read/connect timeout.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The coordinator's own per-attempt timeout fired.
    #[error(transparent)]
    AttemptTimedOut(#[from] AttemptTimeout),
    /// Anything without a recognizable transient signal.
    #[error("{0}")]
    Other(String),
}

impl ActionError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ActionError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status code, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ActionError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
