// ABOUTME: Worker pool and batch limits that keep in-flight remote calls bounded
// ABOUTME: Day fan-out is unbounded; meals, ingredients and each remote source are capped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::time::Duration;

use nutrition_core::constants::limits;
use nutrition_core::errors::{AppError, AppResult};

use super::env_or;

/// Nested concurrency limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// Meals compiled at once within a day
    pub meal_limit: usize,
    /// Ingredients resolved at once within a batch
    pub ingredient_limit: usize,
    /// In-flight requests per remote source
    pub remote_limit: usize,
    /// Unique ingredient names per resolver batch
    pub batch_cap: usize,
    /// Wall-clock budget per resolver batch in milliseconds
    pub batch_deadline_ms: u64,
    /// Completed meals between progress notifications
    pub progress_interval: usize,
    /// Candidates collected per ingredient before the waterfall stops
    pub candidate_target: usize,
    /// Results requested from each source per search
    pub search_page_size: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            meal_limit: limits::MEAL_CONCURRENCY,
            ingredient_limit: limits::INGREDIENT_CONCURRENCY,
            remote_limit: limits::REMOTE_CONCURRENCY,
            batch_cap: limits::BATCH_SIZE_CAP,
            batch_deadline_ms: limits::BATCH_DEADLINE_MS,
            progress_interval: limits::PROGRESS_INTERVAL,
            candidate_target: limits::CANDIDATE_TARGET,
            search_page_size: limits::SEARCH_PAGE_SIZE,
        }
    }
}

impl ConcurrencyConfig {
    /// Load limits from environment
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            meal_limit: env_or("MEAL_CONCURRENCY", limits::MEAL_CONCURRENCY),
            ingredient_limit: env_or("INGREDIENT_CONCURRENCY", limits::INGREDIENT_CONCURRENCY),
            remote_limit: env_or("REMOTE_CONCURRENCY", limits::REMOTE_CONCURRENCY),
            batch_cap: env_or("BATCH_SIZE_CAP", limits::BATCH_SIZE_CAP),
            batch_deadline_ms: env_or("BATCH_DEADLINE_MS", limits::BATCH_DEADLINE_MS),
            progress_interval: env_or("PROGRESS_INTERVAL", limits::PROGRESS_INTERVAL),
            candidate_target: env_or("CANDIDATE_TARGET", limits::CANDIDATE_TARGET),
            search_page_size: env_or("SEARCH_PAGE_SIZE", limits::SEARCH_PAGE_SIZE),
        }
    }

    /// Batch deadline as a duration
    #[must_use]
    pub const fn batch_deadline(&self) -> Duration {
        Duration::from_millis(self.batch_deadline_ms)
    }

    /// Reject zero limits, which would stall the worker pools
    ///
    /// # Errors
    ///
    /// Returns a `ConfigInvalid` error naming the zero limit.
    pub fn validate(&self) -> AppResult<()> {
        let limits = [
            ("MEAL_CONCURRENCY", self.meal_limit),
            ("INGREDIENT_CONCURRENCY", self.ingredient_limit),
            ("REMOTE_CONCURRENCY", self.remote_limit),
            ("BATCH_SIZE_CAP", self.batch_cap),
            ("PROGRESS_INTERVAL", self.progress_interval),
            ("CANDIDATE_TARGET", self.candidate_target),
            ("SEARCH_PAGE_SIZE", self.search_page_size),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(AppError::config_invalid(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}
