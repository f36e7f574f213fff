// ABOUTME: Structured logging setup for the pipeline and CLI using tracing-subscriber
// ABOUTME: Environment-driven level and format with noise reduction for HTTP and SQL crates
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Logging configuration with structured output

use std::env;
use std::io;

use nutrition_core::errors::{AppError, AppResult};
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default service name in structured logs
pub const SERVICE_NAME: &str = "nutrition-compiler";

/// Directives applied on top of any `RUST_LOG` value
const NOISE_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "rustls=warn",
    "sqlx=warn",
];

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` lines for log shippers
    Json,
    /// Multi-line human output
    Pretty,
    /// Single-line human output
    Compact,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`, defaulting to compact
    #[must_use]
    pub fn from_str_or_default(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Base filter directive (trace, debug, info, warn, error or a full directive)
    pub level: String,
    /// Output format
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Service name for structured logging
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
            include_location: false,
            service_name: SERVICE_NAME.into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            level: env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
            format: env::var("LOG_FORMAT")
                .map_or(LogFormat::Compact, |value| LogFormat::from_str_or_default(&value)),
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| SERVICE_NAME.into()),
        }
    }

    /// Override the base level, e.g. for a `--verbose` flag
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Build the filter: base level plus noise reduction
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse_lossy(&self.level);
        for directive in NOISE_DIRECTIVES {
            if let Ok(parsed) = directive.parse() {
                filter = filter.add_directive(parsed);
            }
        }
        filter
    }

    /// Initialize the global tracing subscriber
    ///
    /// Output goes to stderr so stdout stays clean for command output.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a global subscriber is already installed.
    pub fn init(&self) -> AppResult<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());

        let result = match self.format {
            LogFormat::Json => {
                let json_layer = fmt::layer()
                    .json()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(true)
                    .with_writer(io::stderr)
                    .with_span_events(FmtSpan::NONE);
                registry.with(json_layer).try_init()
            }
            LogFormat::Pretty => {
                let pretty_layer = fmt::layer()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_thread_names(true)
                    .with_target(true)
                    .with_writer(io::stderr);
                registry.with(pretty_layer).try_init()
            }
            LogFormat::Compact => {
                let compact_layer = fmt::layer()
                    .compact()
                    .with_file(self.include_location)
                    .with_line_number(self.include_location)
                    .with_target(false)
                    .with_writer(io::stderr);
                registry.with(compact_layer).try_init()
            }
        };
        result.map_err(|e| AppError::internal(format!("failed to install tracing subscriber: {e}")))?;

        info!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            "logging initialized"
        );
        Ok(())
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> AppResult<()> {
    LoggingConfig::from_env().init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str_or_default("loud"), LogFormat::Compact);
    }

    #[test]
    fn test_filter_keeps_noise_directives() {
        let filter = LoggingConfig::default().with_level("debug").env_filter();
        let rendered = filter.to_string();
        assert!(rendered.contains("reqwest=warn"));
        assert!(rendered.contains("debug"));
    }
}
