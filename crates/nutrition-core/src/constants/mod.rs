// ABOUTME: Constants module with concern-separated organization
// ABOUTME: Guard bounds, concurrency limits and cache lifetimes for the nutrition pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Every value here is a default. The compiler reads the effective values from
//! `PipelineConfig`, which can override each of them from the environment.

/// Cache capacity and TTL defaults for food sources
pub mod cache;
/// Scale, recalibration and correction guard bounds
pub mod guards;
/// Concurrency, batch and resilience limits
pub mod limits;
