// ABOUTME: Food source credentials, endpoints, timeouts and shared resilience settings
// ABOUTME: Remote adapters are enabled only when their credentials are present
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::time::Duration;

use nutrition_core::constants::{cache, limits};
use nutrition_core::errors::{AppError, AppResult};
use nutrition_sources::{
    CacheConfig, CircuitBreakerConfig, FatSecretConfig, HttpClientConfig, RetryPolicy, UsdaConfig,
};

use super::{env_or, env_string};

/// Default USDA `FoodData` Central base URL
pub const DEFAULT_USDA_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
/// Default `FatSecret` method endpoint
pub const DEFAULT_FATSECRET_API_URL: &str = "https://platform.fatsecret.com/rest/server.api";
/// Default `FatSecret` OAuth2 token endpoint
pub const DEFAULT_FATSECRET_TOKEN_URL: &str = "https://oauth.fatsecret.com/connect/token";

/// Where foods and recipes come from
#[derive(Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    /// USDA API key; USDA is disabled without it
    pub usda_api_key: Option<String>,
    /// USDA base URL
    pub usda_base_url: String,
    /// `FatSecret` OAuth2 client id
    pub fatsecret_client_id: Option<String>,
    /// `FatSecret` OAuth2 client secret
    pub fatsecret_client_secret: Option<String>,
    /// `FatSecret` method endpoint
    pub fatsecret_api_url: String,
    /// `FatSecret` token endpoint
    pub fatsecret_token_url: String,
    /// Local food database URL, e.g. `sqlite:./foods.db`
    pub local_database_url: Option<String>,
    /// Per-attempt request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// TCP connect timeout in seconds
    pub connect_timeout_secs: u64,
}

// Credentials stay out of logs
impl fmt::Debug for SourcesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcesConfig")
            .field("usda_enabled", &self.usda_enabled())
            .field("usda_base_url", &self.usda_base_url)
            .field("fatsecret_enabled", &self.fatsecret_enabled())
            .field("fatsecret_api_url", &self.fatsecret_api_url)
            .field("local_database_url", &self.local_database_url)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            usda_api_key: None,
            usda_base_url: DEFAULT_USDA_BASE_URL.to_owned(),
            fatsecret_client_id: None,
            fatsecret_client_secret: None,
            fatsecret_api_url: DEFAULT_FATSECRET_API_URL.to_owned(),
            fatsecret_token_url: DEFAULT_FATSECRET_TOKEN_URL.to_owned(),
            local_database_url: None,
            request_timeout_ms: limits::REQUEST_TIMEOUT_MS,
            connect_timeout_secs: limits::CONNECT_TIMEOUT_SECS,
        }
    }
}

impl SourcesConfig {
    /// Load source settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            usda_api_key: env_string("USDA_API_KEY"),
            usda_base_url: env_string("USDA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_USDA_BASE_URL.to_owned()),
            fatsecret_client_id: env_string("FATSECRET_CLIENT_ID"),
            fatsecret_client_secret: env_string("FATSECRET_CLIENT_SECRET"),
            fatsecret_api_url: env_string("FATSECRET_API_URL")
                .unwrap_or_else(|| DEFAULT_FATSECRET_API_URL.to_owned()),
            fatsecret_token_url: env_string("FATSECRET_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_FATSECRET_TOKEN_URL.to_owned()),
            local_database_url: env_string("DATABASE_URL"),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", limits::REQUEST_TIMEOUT_MS),
            connect_timeout_secs: env_or("CONNECT_TIMEOUT_SECS", limits::CONNECT_TIMEOUT_SECS),
        }
    }

    /// USDA credentials are present
    #[must_use]
    pub fn usda_enabled(&self) -> bool {
        self.usda_api_key.is_some()
    }

    /// Both `FatSecret` credentials are present
    #[must_use]
    pub fn fatsecret_enabled(&self) -> bool {
        self.fatsecret_client_id.is_some() && self.fatsecret_client_secret.is_some()
    }

    /// Per-attempt request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Timeouts for the shared HTTP client
    #[must_use]
    pub const fn http_client(&self) -> HttpClientConfig {
        HttpClientConfig {
            request_timeout: self.request_timeout(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    /// USDA adapter configuration, when enabled
    #[must_use]
    pub fn usda(&self) -> Option<UsdaConfig> {
        self.usda_api_key.as_ref().map(|api_key| UsdaConfig {
            api_key: api_key.clone(),
            base_url: self.usda_base_url.clone(),
        })
    }

    /// `FatSecret` adapter configuration, when enabled
    #[must_use]
    pub fn fatsecret(&self) -> Option<FatSecretConfig> {
        match (&self.fatsecret_client_id, &self.fatsecret_client_secret) {
            (Some(client_id), Some(client_secret)) => Some(FatSecretConfig {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                api_url: self.fatsecret_api_url.clone(),
                token_url: self.fatsecret_token_url.clone(),
            }),
            _ => None,
        }
    }
}

/// Remote response cache sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// Entries per cache
    pub capacity: usize,
    /// Search result lifetime in seconds
    pub search_ttl_secs: u64,
    /// Food detail lifetime in seconds
    pub detail_ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: cache::DEFAULT_CACHE_MAX_ENTRIES,
            search_ttl_secs: cache::TTL_SEARCH_SECS,
            detail_ttl_secs: cache::TTL_DETAIL_SECS,
        }
    }
}

impl CacheSettings {
    /// Load cache settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            capacity: env_or("CACHE_MAX_ENTRIES", cache::DEFAULT_CACHE_MAX_ENTRIES),
            search_ttl_secs: env_or("CACHE_TTL_SEARCH_SECS", cache::TTL_SEARCH_SECS),
            detail_ttl_secs: env_or("CACHE_TTL_DETAIL_SECS", cache::TTL_DETAIL_SECS),
        }
    }

    /// Adapter cache configuration
    #[must_use]
    pub const fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            capacity: self.capacity,
            search_ttl: Duration::from_secs(self.search_ttl_secs),
            detail_ttl: Duration::from_secs(self.detail_ttl_secs),
        }
    }
}

/// Retry policy for remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts including the first
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub initial_backoff_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: limits::RETRY_MAX_ATTEMPTS,
            initial_backoff_ms: limits::RETRY_INITIAL_BACKOFF_MS,
            max_backoff_ms: limits::RETRY_MAX_BACKOFF_MS,
        }
    }
}

impl RetrySettings {
    /// Load retry settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_attempts: env_or("RETRY_MAX_ATTEMPTS", limits::RETRY_MAX_ATTEMPTS),
            initial_backoff_ms: env_or("RETRY_INITIAL_BACKOFF_MS", limits::RETRY_INITIAL_BACKOFF_MS),
            max_backoff_ms: env_or("RETRY_MAX_BACKOFF_MS", limits::RETRY_MAX_BACKOFF_MS),
        }
    }

    /// Reject a zero attempt count or an inverted backoff range
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` error describing the problem.
    pub fn validate(&self) -> AppResult<()> {
        if self.max_attempts == 0 {
            return Err(AppError::config_invalid("RETRY_MAX_ATTEMPTS must be at least 1"));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(AppError::config_invalid(format!(
                "RETRY_INITIAL_BACKOFF_MS ({}) exceeds RETRY_MAX_BACKOFF_MS ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }

    /// Adapter retry policy with the given per-attempt timeout
    #[must_use]
    pub const fn to_policy(&self, attempt_timeout: Duration) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            attempt_timeout,
        }
    }
}

/// Circuit breaker thresholds for remote sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Seconds open before a probe
    pub recovery_secs: u64,
    /// Successful probes required to close
    pub success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: limits::BREAKER_FAILURE_THRESHOLD,
            recovery_secs: limits::BREAKER_RECOVERY_SECS,
            success_threshold: 1,
        }
    }
}

impl BreakerSettings {
    /// Load breaker settings from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", limits::BREAKER_FAILURE_THRESHOLD),
            recovery_secs: env_or("BREAKER_RECOVERY_SECS", limits::BREAKER_RECOVERY_SECS),
            success_threshold: env_or("BREAKER_SUCCESS_THRESHOLD", 1),
        }
    }

    /// Adapter breaker configuration
    #[must_use]
    pub const fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new(
            self.failure_threshold,
            Duration::from_secs(self.recovery_secs),
            self.success_threshold,
        )
    }
}
