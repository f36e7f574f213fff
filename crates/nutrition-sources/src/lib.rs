// ABOUTME: Food composition sources: USDA, FatSecret, local SQLite search and the alias cache
// ABOUTME: Shared resilience primitives (breaker, retry, TTL-LRU cache) wrap every remote call
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! Food data sources and resilience primitives.
//!
//! Every source exposes the same two-method shape (`search_foods`,
//! `get_food`) through [`FoodDataSource`]. Remote adapters own their caches,
//! breaker and concurrency ceiling; nothing here is a process-wide singleton.

pub use nutrition_core::errors;
pub use nutrition_core::models;

/// Name-to-food shortcut that bypasses search
pub mod alias;
/// TTL cache with LRU eviction and hit/miss counters
pub mod cache;
/// Circuit breaker for source calls
pub mod circuit_breaker;
/// HTTP client construction and response decoding
pub mod http_client;
/// Local SQLite food database
pub mod local;
/// Retry with backoff and per-attempt timeouts
pub mod retry;
/// Source traits and the resilient call wrapper
pub mod source;

/// `FatSecret` Platform adapter (foods and recipes)
#[cfg(feature = "source-fatsecret")]
pub mod fatsecret;
/// USDA `FoodData` Central adapter
#[cfg(feature = "source-usda")]
pub mod usda;

pub use alias::FoodAliasCache;
pub use cache::{CacheStats, TtlCache};
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use http_client::{build_client, HttpClientConfig};
pub use local::{LocalFoodSearch, NewFood};
pub use retry::RetryPolicy;
pub use source::{
    CacheConfig, FoodDataSource, RecipeSource, ResilienceConfig, ResilientCaller, SourceHealth,
};

#[cfg(feature = "source-fatsecret")]
pub use fatsecret::{FatSecretConfig, FatSecretSource};
#[cfg(feature = "source-usda")]
pub use usda::{UsdaConfig, UsdaFoodSource};
