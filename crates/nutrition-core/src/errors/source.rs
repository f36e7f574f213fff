// ABOUTME: Adapter-level error type shared by remote food APIs and the local food database
// ABOUTME: Classifies failures as retryable (timeouts, network, 429, 5xx) or terminal
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

/// Failure raised by a single food source
///
/// The compiler catches every variant, logs it at warning level and treats the
/// lookup as "no match". Only retryable variants count toward tripping a
/// circuit breaker.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Circuit breaker is open; no I/O was attempted
    #[error("{source_name} circuit is open, retry in {retry_after_secs}s")]
    CircuitOpen {
        /// Source whose breaker rejected the call
        source_name: String,
        /// Seconds until the breaker allows a recovery probe
        retry_after_secs: u64,
    },

    /// A single attempt exceeded its timeout
    #[error("{source_name} request timed out after {timeout_ms}ms")]
    Timeout {
        /// Source that timed out
        source_name: String,
        /// Per-attempt timeout that elapsed
        timeout_ms: u64,
    },

    /// Connection-level failure before an HTTP status was received
    #[error("{source_name} network error: {message}")]
    Network {
        /// Source that failed
        source_name: String,
        /// Transport error description
        message: String,
    },

    /// Non-success HTTP status
    #[error("{source_name} returned HTTP {status}")]
    Http {
        /// Source that failed
        source_name: String,
        /// HTTP status code
        status: u16,
        /// Server-supplied `Retry-After` delay, when present
        retry_after: Option<Duration>,
    },

    /// The API answered successfully but reported an application error
    #[error("{source_name} API error {code}: {message}")]
    Api {
        /// Source that failed
        source_name: String,
        /// Application-level error code
        code: i64,
        /// Application-level error message
        message: String,
    },

    /// Response body could not be parsed
    #[error("{source_name} response could not be decoded: {message}")]
    Decode {
        /// Source that failed
        source_name: String,
        /// Parser error description
        message: String,
    },

    /// Requested food or recipe does not exist
    #[error("{source_name} has no record {id}")]
    NotFound {
        /// Source that was queried
        source_name: String,
        /// Identifier that was requested
        id: String,
    },

    /// Local database failure
    #[error("local database error: {0}")]
    Database(String),

    /// Caller supplied an unusable query or identifier
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// All retry attempts failed
    #[error("{source_name} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Source that failed
        source_name: String,
        /// Number of attempts made
        attempts: u32,
        /// Last error observed
        last_error: Box<SourceError>,
    },
}

impl SourceError {
    /// Whether this failure is transient and worth another attempt
    ///
    /// Timeouts, network errors, HTTP 429 and HTTP 5xx are retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::RetriesExhausted { last_error, .. } => last_error.is_retryable(),
            Self::CircuitOpen { .. }
            | Self::Api { .. }
            | Self::Decode { .. }
            | Self::NotFound { .. }
            | Self::Database(_)
            | Self::InvalidInput(_) => false,
        }
    }

    /// Server-supplied retry delay carried by this error, if any
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Create a decode error
    #[must_use]
    pub fn decode(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(source_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            source_name: source_name.into(),
            id: id.into(),
        }
    }

    /// Convert a `reqwest` transport error, classifying timeouts separately
    #[cfg(feature = "provider-errors")]
    #[must_use]
    pub fn from_reqwest(source_name: &str, error: &reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                source_name: source_name.to_owned(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if error.is_decode() {
            Self::decode(source_name, error.to_string())
        } else if let Some(status) = error.status() {
            Self::Http {
                source_name: source_name.to_owned(),
                status: status.as_u16(),
                retry_after: None,
            }
        } else {
            Self::Network {
                source_name: source_name.to_owned(),
                message: error.to_string(),
            }
        }
    }
}

#[cfg(feature = "database-errors")]
impl From<sqlx::Error> for SourceError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> SourceError {
        SourceError::Http {
            source_name: "usda".to_owned(),
            status,
            retry_after: None,
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(http(429).is_retryable());
        assert!(http(503).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(SourceError::Timeout {
            source_name: "usda".to_owned(),
            timeout_ms: 100
        }
        .is_retryable());
        assert!(!SourceError::Database("locked".to_owned()).is_retryable());
        assert!(!SourceError::CircuitOpen {
            source_name: "usda".to_owned(),
            retry_after_secs: 3
        }
        .is_retryable());
    }

    #[test]
    fn test_retry_after_only_on_http() {
        let error = SourceError::Http {
            source_name: "fatsecret".to_owned(),
            status: 429,
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(error.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(http(500).retry_after(), None);
    }
}
