// ABOUTME: HTTP client construction shared by the remote food adapters
// ABOUTME: Built once by the composition root and injected, with pooled connections and timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use nutrition_core::constants::limits::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_MS};
use nutrition_core::errors::SourceError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Timeouts applied to the shared client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Build the pooled client handed to every remote adapter
///
/// # Errors
///
/// Returns [`SourceError::Network`] when the TLS backend cannot initialize.
pub fn build_client(config: &HttpClientConfig) -> Result<Client, SourceError> {
    ClientBuilder::new()
        .timeout(config.request_timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(concat!("nutrition-sources/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|error| SourceError::Network {
            source_name: "http".to_owned(),
            message: error.to_string(),
        })
}

/// Parse a delta-seconds `Retry-After` header
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success status to [`SourceError::Http`] and decode the body otherwise
///
/// # Errors
///
/// Returns `Http` for non-2xx statuses (with any Retry-After delay), or
/// `Decode` when the body is not the expected JSON.
pub async fn decode_json<T: DeserializeOwned>(
    source_name: &str,
    response: Response,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(http_error(source_name, status, response.headers()));
    }
    response
        .json::<T>()
        .await
        .map_err(|error| SourceError::decode(source_name, error.to_string()))
}

fn http_error(source_name: &str, status: StatusCode, headers: &HeaderMap) -> SourceError {
    SourceError::Http {
        source_name: source_name.to_owned(),
        status: status.as_u16(),
        retry_after: retry_after(headers),
    }
}
