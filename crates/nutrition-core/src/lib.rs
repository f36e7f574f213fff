// ABOUTME: Core types and constants for the nutrition verification pipeline
// ABOUTME: Foundation crate with error taxonomy, guard constants, and meal plan models
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Nutrition Core
//!
//! Foundation crate shared by the source adapters, the algorithm crate and the
//! compiler. It is designed to change infrequently so the rest of the
//! workspace benefits from incremental compilation.
//!
//! ## Modules
//!
//! - **errors**: `AppError`, `ErrorCode`, adapter-level `SourceError` and routing-level `PipelineError`
//! - **constants**: Guard bounds, concurrency limits and cache TTLs
//! - **models**: Draft plans, food records, compiled plans and dietary profiles

/// Unified error handling with standard error codes and pipeline taxonomy
pub mod errors;

/// Pipeline constants organized by concern
pub mod constants;

/// Domain models for drafts, food records and compiled plans
pub mod models;
