// ABOUTME: Concurrency, batching and resilience limits for the nutrition pipeline
// ABOUTME: Bounds total in-flight remote calls regardless of plan size
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Meals compiled concurrently within one day
pub const MEAL_CONCURRENCY: usize = 5;

/// Ingredients resolved concurrently within one batch
pub const INGREDIENT_CONCURRENCY: usize = 8;

/// In-flight requests allowed per remote source, independent of callers
pub const REMOTE_CONCURRENCY: usize = 5;

/// Unique ingredient names resolved per batch; the rest are dropped
pub const BATCH_SIZE_CAP: usize = 50;

/// Wall-clock budget for one resolver batch in milliseconds
pub const BATCH_DEADLINE_MS: u64 = 20_000;

/// Completed meals between progress notifications
pub const PROGRESS_INTERVAL: usize = 5;

/// Candidates collected per ingredient before the waterfall stops
pub const CANDIDATE_TARGET: usize = 3;

/// Results requested from each source per search
pub const SEARCH_PAGE_SIZE: usize = 10;

/// Per-attempt timeout for remote requests in milliseconds
pub const REQUEST_TIMEOUT_MS: u64 = 8_000;

/// TCP connect timeout for remote requests in seconds
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum attempts per remote request, first attempt included
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Initial retry backoff in milliseconds
pub const RETRY_INITIAL_BACKOFF_MS: u64 = 250;

/// Maximum retry backoff in milliseconds
pub const RETRY_MAX_BACKOFF_MS: u64 = 5_000;

/// Consecutive failures that open a source circuit
pub const BREAKER_FAILURE_THRESHOLD: u32 = 5;

/// Seconds an open circuit waits before probing again
pub const BREAKER_RECOVERY_SECS: u64 = 30;
