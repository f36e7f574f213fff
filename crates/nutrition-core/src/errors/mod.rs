// ABOUTME: Unified error handling with standard error codes for the nutrition pipeline
// ABOUTME: Defines AppError, ErrorCode and re-exports the source and pipeline taxonomies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Two layers of errors flow through the pipeline:
//!
//! - [`SourceError`]: raised by a single food source (remote API, local database).
//!   The compiler never lets these escape; they are logged and treated as "no match".
//! - [`PipelineError`]: routing signals between strategies plus the single fatal
//!   error, output schema validation.
//!
//! [`AppError`] is the carrier used at the crate edges (configuration, the binary,
//! downstream callers) and can be built from either layer.

/// Routing-level errors raised between compiler strategies
pub mod pipeline;
/// Adapter-level errors raised by food sources
pub mod source;

pub use pipeline::PipelineError;
pub use source::SourceError;

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

/// Standard error codes used throughout the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (3000-3999)
    /// Caller supplied malformed input
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 3000,
    /// A numeric value is outside its accepted range
    #[serde(rename = "VALUE_OUT_OF_RANGE")]
    ValueOutOfRange = 3003,

    // Resource Management (4000-4999)
    /// Requested record does not exist
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound = 4000,

    // External Services (5000-5999)
    /// External service returned an error
    #[serde(rename = "EXTERNAL_SERVICE_ERROR")]
    ExternalServiceError = 5000,
    /// External service is unreachable or its circuit is open
    #[serde(rename = "EXTERNAL_SERVICE_UNAVAILABLE")]
    ExternalServiceUnavailable = 5001,
    /// External service rate limit exceeded
    #[serde(rename = "EXTERNAL_RATE_LIMITED")]
    ExternalRateLimited = 5003,

    // Configuration (6000-6999)
    /// Configuration could not be loaded
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 6000,
    /// Configuration was loaded but failed validation
    #[serde(rename = "CONFIG_INVALID")]
    ConfigInvalid = 6002,

    // Internal Errors (9000-9999)
    /// Unexpected internal failure
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    /// Local food database failure
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
    /// Serialization or deserialization failure
    #[serde(rename = "SERIALIZATION_ERROR")]
    SerializationError = 9003,
    /// Compiled output violated its schema contract
    #[serde(rename = "SCHEMA_VALIDATION_FAILED")]
    SchemaValidation = 9004,
}

impl ErrorCode {
    /// Get the HTTP status code a downstream API layer should use for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput | Self::ValueOutOfRange => 400,
            Self::ResourceNotFound => 404,
            Self::ExternalRateLimited => 429,
            Self::ExternalServiceError => 502,
            Self::ExternalServiceUnavailable => 503,
            Self::ConfigError
            | Self::ConfigInvalid
            | Self::InternalError
            | Self::DatabaseError
            | Self::SerializationError
            | Self::SchemaValidation => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidInput => "The provided input is invalid",
            Self::ValueOutOfRange => "The provided value is outside the acceptable range",
            Self::ResourceNotFound => "The requested resource was not found",
            Self::ExternalServiceError => "An external service encountered an error",
            Self::ExternalServiceUnavailable => "An external service is currently unavailable",
            Self::ExternalRateLimited => "External service rate limit exceeded",
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal error occurred",
            Self::DatabaseError => "Database operation failed",
            Self::SerializationError => "Data serialization/deserialization failed",
            Self::SchemaValidation => "Compiled output failed schema validation",
        }
    }
}

/// Unified error type for the pipeline edges
#[derive(Debug, thiserror::Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Invalid input
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Resource not found
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database error
    #[must_use]
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Configuration validation error
    #[must_use]
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// External service error
    #[must_use]
    pub fn external_service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ExternalServiceError,
            format!("{}: {}", service.into(), message.into()),
        )
    }

    /// Compiled output schema violation
    #[must_use]
    pub fn schema_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaValidation, message)
    }

    /// Serialization error
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<SourceError> for AppError {
    fn from(error: SourceError) -> Self {
        let code = match &error {
            SourceError::CircuitOpen { .. } | SourceError::Timeout { .. } => {
                ErrorCode::ExternalServiceUnavailable
            }
            SourceError::Http { status: 429, .. } => ErrorCode::ExternalRateLimited,
            SourceError::Database(_) => ErrorCode::DatabaseError,
            SourceError::InvalidInput(_) => ErrorCode::InvalidInput,
            SourceError::NotFound { .. } => ErrorCode::ResourceNotFound,
            SourceError::Network { .. }
            | SourceError::Http { .. }
            | SourceError::Api { .. }
            | SourceError::Decode { .. }
            | SourceError::RetriesExhausted { .. } => ErrorCode::ExternalServiceError,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<PipelineError> for AppError {
    fn from(error: PipelineError) -> Self {
        let code = match &error {
            PipelineError::SchemaValidation { .. } => ErrorCode::SchemaValidation,
            PipelineError::ScaleGuardRejection { .. } => ErrorCode::ValueOutOfRange,
            PipelineError::Source(_)
            | PipelineError::NoMatch { .. }
            | PipelineError::ResolutionTimeout { .. }
            | PipelineError::InsufficientCoverage { .. } => ErrorCode::InternalError,
        };
        Self::new(code, error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error.to_string()).with_source(error)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::ExternalRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::SchemaValidation.http_status(), 500);
    }

    #[test]
    fn test_source_error_maps_to_unavailable() {
        let error = AppError::from(SourceError::CircuitOpen {
            source_name: "usda".to_owned(),
            retry_after_secs: 12,
        });
        assert_eq!(error.code, ErrorCode::ExternalServiceUnavailable);
        assert!(error.message.contains("usda"));
    }
}
