// ABOUTME: Cache-related constants for food source lookups
// ABOUTME: Capacity and TTL defaults for search and detail caches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Default maximum entries per source cache
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 1_000;

/// Search result cache TTL (1 hour)
pub const TTL_SEARCH_SECS: u64 = 3_600;

/// Food detail cache TTL (24 hours) - composition data rarely changes
pub const TTL_DETAIL_SECS: u64 = 86_400;
