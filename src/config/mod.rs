// ABOUTME: Environment-only configuration for the nutrition pipeline
// ABOUTME: PipelineConfig groups guard bounds, concurrency limits, sources, caches and resilience
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module
//!
//! Every setting is read from `NUTRITION_`-prefixed environment variables and
//! falls back to the defaults in `nutrition_core::constants`. There are no
//! configuration files.
//!
//! - **Guards**: scale, recalibration and correction bounds
//! - **Concurrency**: meal, ingredient and remote limits, batch cap and deadline
//! - **Sources**: remote credentials, base URLs, local database and timeouts
//! - **Cache / Retry / Breaker**: resilience settings shared by remote sources

/// Meal, ingredient and batch limits
pub mod concurrency;
/// Guard bounds for scaling, recalibration and correction
pub mod guards;
/// Source credentials and resilience settings
pub mod sources;

pub use concurrency::ConcurrencyConfig;
pub use guards::GuardConfig;
pub use sources::{BreakerSettings, CacheSettings, RetrySettings, SourcesConfig};

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use nutrition_core::errors::AppResult;
use nutrition_sources::ResilienceConfig;
use tracing::{info, warn};

/// Prefix shared by every pipeline environment variable
pub const ENV_PREFIX: &str = "NUTRITION_";

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineConfig {
    /// Scale, recalibration and correction bounds
    pub guards: GuardConfig,
    /// Worker pool sizes, batch cap and deadline
    pub concurrency: ConcurrencyConfig,
    /// Remote credentials and local database
    pub sources: SourcesConfig,
    /// Remote response caches
    pub cache: CacheSettings,
    /// Remote retry policy
    pub retry: RetrySettings,
    /// Remote circuit breakers
    pub breaker: BreakerSettings,
}

impl PipelineConfig {
    /// Load and validate configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` error when loaded bounds are inverted or
    /// limits are zero.
    pub fn from_env() -> AppResult<Self> {
        let config = Self {
            guards: GuardConfig::from_env(),
            concurrency: ConcurrencyConfig::from_env(),
            sources: SourcesConfig::from_env(),
            cache: CacheSettings::from_env(),
            retry: RetrySettings::from_env(),
            breaker: BreakerSettings::from_env(),
        };
        config.validate()?;
        info!(
            usda = config.sources.usda_enabled(),
            fatsecret = config.sources.fatsecret_enabled(),
            local_db = config.sources.local_database_url.is_some(),
            "pipeline configuration loaded"
        );
        Ok(config)
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first section's validation error.
    pub fn validate(&self) -> AppResult<()> {
        self.guards.validate()?;
        self.concurrency.validate()?;
        self.retry.validate()?;
        Ok(())
    }

    /// Resilience settings handed to every remote adapter
    #[must_use]
    pub fn resilience(&self) -> ResilienceConfig {
        ResilienceConfig {
            breaker: self.breaker.to_breaker_config(),
            retry: self.retry.to_policy(self.sources.request_timeout()),
            max_concurrency: self.concurrency.remote_limit,
        }
    }
}

/// Read `NUTRITION_{name}`, falling back to `default` when unset or unparsable
pub(crate) fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
{
    let key = format!("{ENV_PREFIX}{name}");
    match env::var(&key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, default = %default, "invalid configuration value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// Read an optional, non-empty string `NUTRITION_{name}`
pub(crate) fn env_string(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
