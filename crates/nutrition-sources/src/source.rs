// ABOUTME: Food and recipe source traits plus the resilience wrapper every remote call goes through
// ABOUTME: ResilientCaller composes a concurrency ceiling, a circuit breaker and retry with backoff
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use nutrition_core::constants::cache::{DEFAULT_CACHE_MAX_ENTRIES, TTL_DETAIL_SECS, TTL_SEARCH_SECS};
use nutrition_core::constants::limits::REMOTE_CONCURRENCY;
use nutrition_core::errors::SourceError;
use nutrition_core::models::{FoodRecord, FoodSearchHit, MatchSource, RecipeHit, RecipeRecord};
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::cache::CacheStats;
use crate::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};
use crate::retry::RetryPolicy;

/// Health snapshot of a single source
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    /// Source name
    pub name: String,
    /// Breaker state, for sources behind a breaker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaker: Option<BreakerSnapshot>,
    /// Search response cache counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_cache: Option<CacheStats>,
    /// Detail response cache counters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_cache: Option<CacheStats>,
}

impl SourceHealth {
    /// Health entry with no breaker or cache data
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breaker: None,
            search_cache: None,
            detail_cache: None,
        }
    }
}

/// Food composition source: ranked search plus detail lookup
#[async_trait]
pub trait FoodDataSource: Send + Sync {
    /// Which waterfall tier this source fills
    fn kind(&self) -> MatchSource;

    /// Name used in logs and health output
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Ranked foods matching `query`, best first
    async fn search_foods(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError>;

    /// Full record with every serving the source knows
    async fn get_food(&self, id: &str) -> Result<FoodRecord, SourceError>;

    /// Breaker and cache counters
    async fn health(&self) -> SourceHealth {
        SourceHealth::named(self.name())
    }
}

/// Recipe source used by the recipe-level compile strategy
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Name used in logs and health output
    fn name(&self) -> &'static str;

    /// Ranked recipes matching `query`, best first
    async fn search_recipes(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RecipeHit>, SourceError>;

    /// Recipe detail with per-serving nutrition
    async fn get_recipe(&self, id: &str) -> Result<RecipeRecord, SourceError>;
}

/// Resilience settings for one remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResilienceConfig {
    /// Breaker thresholds
    pub breaker: CircuitBreakerConfig,
    /// Retry and per-attempt timeout
    pub retry: RetryPolicy,
    /// Maximum in-flight calls to the source
    pub max_concurrency: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
            max_concurrency: REMOTE_CONCURRENCY,
        }
    }
}

/// Response cache sizing for one remote source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries per cache
    pub capacity: usize,
    /// Lifetime of cached search results
    pub search_ttl: Duration,
    /// Lifetime of cached detail records
    pub detail_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_MAX_ENTRIES,
            search_ttl: Duration::from_secs(TTL_SEARCH_SECS),
            detail_ttl: Duration::from_secs(TTL_DETAIL_SECS),
        }
    }
}

/// Concurrency ceiling, breaker and retry wrapped around a source's calls
///
/// The ceiling is owned by the source, so it holds no matter how many
/// resolver tasks call in at once.
#[derive(Debug)]
pub struct ResilientCaller {
    source_name: &'static str,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    permits: Semaphore,
}

impl ResilientCaller {
    /// Build the wrapper for `source_name`
    #[must_use]
    pub fn new(source_name: &'static str, config: &ResilienceConfig) -> Self {
        Self {
            source_name,
            breaker: CircuitBreaker::with_config(source_name, config.breaker),
            retry: config.retry,
            permits: Semaphore::new(config.max_concurrency.max(1)),
        }
    }

    /// Guarded source name
    #[must_use]
    pub const fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// Underlying breaker
    #[must_use]
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `operation` with a permit, retrying each attempt through the breaker
    ///
    /// Once the breaker opens mid-retry the next attempt fails with
    /// `CircuitOpen`, which is terminal, so an unhealthy source stops
    /// consuming time immediately.
    ///
    /// # Errors
    ///
    /// Returns the breaker, retry, or operation error.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SourceError::Network {
                source_name: self.source_name.to_owned(),
                message: "concurrency limiter closed".to_owned(),
            })?;
        self.retry
            .run_guarded(self.source_name, &self.breaker, operation)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::sleep;

    use super::*;
    use crate::circuit_breaker::CircuitState;

    #[tokio::test]
    async fn test_open_breaker_stops_retries() {
        let config = ResilienceConfig {
            breaker: CircuitBreakerConfig::new(1, Duration::from_secs(60), 1),
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(1),
                attempt_timeout: Duration::from_secs(1),
            },
            max_concurrency: 2,
        };
        let caller = ResilientCaller::new("usda", &config);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = caller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Network {
                    source_name: "usda".to_owned(),
                    message: "refused".to_owned(),
                })
            })
            .await;

        assert!(matches!(result, Err(SourceError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(caller.breaker().state(), CircuitState::Open);
    }

    fn hanging_config(recovery: Duration) -> ResilienceConfig {
        ResilienceConfig {
            breaker: CircuitBreakerConfig::new(2, recovery, 1),
            retry: RetryPolicy::no_retry(Duration::from_millis(20)),
            max_concurrency: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_source_trips_breaker() {
        let caller = ResilientCaller::new("usda", &hanging_config(Duration::from_secs(60)));
        let calls = AtomicU32::new(0);

        for _ in 0..2 {
            let result: Result<(), _> = caller
                .call(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_secs(5)).await;
                    Ok(())
                })
                .await;
            assert!(matches!(result, Err(SourceError::Timeout { .. })));
        }
        assert_eq!(caller.breaker().state(), CircuitState::Open);

        let result: Result<(), _> = caller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(SourceError::CircuitOpen { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_probe_reopens_then_recovers() {
        let caller = ResilientCaller::new("fatsecret", &hanging_config(Duration::ZERO));
        for _ in 0..2 {
            let _: Result<(), _> = caller
                .call(|| async {
                    Err(SourceError::Network {
                        source_name: "fatsecret".to_owned(),
                        message: "refused".to_owned(),
                    })
                })
                .await;
        }
        assert_eq!(caller.breaker().state(), CircuitState::Open);

        let probe: Result<(), _> = caller
            .call(|| async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(probe, Err(SourceError::Timeout { .. })));
        assert_eq!(caller.breaker().state(), CircuitState::Open);

        let healthy = caller.call(|| async { Ok(11) }).await;
        assert_eq!(healthy.unwrap(), 11);
        assert_eq!(caller.breaker().state(), CircuitState::Closed);
    }
}
