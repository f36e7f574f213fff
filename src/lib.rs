// ABOUTME: Library entry point for the nutrition verification and compilation pipeline
// ABOUTME: Resolves drafted ingredients against food sources and compiles verified meal plans
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Nutrition Compiler
//!
//! Turns an AI-drafted meal plan into a compiled plan whose nutrition is
//! either verified against food composition data or explicitly tagged as an
//! estimate.
//!
//! ## Architecture
//!
//! - **Config**: environment-only settings with validated guard bounds
//! - **Resolver**: batch ingredient lookup through alias, local and remote tiers
//! - **Compiler**: per-meal strategy chain, recalibration and aggregation
//! - **Schema**: output contract check before a plan leaves the crate
//! - **Pipeline**: composition root that builds sources and runs a draft end to end
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nutrition_compiler::config::PipelineConfig;
//! use nutrition_compiler::pipeline::NutritionPipeline;
//! use nutrition_core::errors::AppResult;
//! use nutrition_core::models::MealPlanDraft;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let pipeline = NutritionPipeline::from_config(PipelineConfig::from_env()?).await?;
//!     let output = pipeline.run(&MealPlanDraft::default(), false, None).await?;
//!     println!("{} of {} meals verified", output.plan.verified_meals, output.plan.total_meals);
//!     Ok(())
//! }
//! ```

/// Meal compilation strategies and orchestration
pub mod compiler;

/// Environment configuration
pub mod config;

/// Deterministic fallback drafts
pub mod fallback_plan;

/// Structured logging setup
pub mod logging;

/// Composition root
pub mod pipeline;

/// Batch ingredient resolution
pub mod resolver;

/// Compiled plan validation
pub mod schema;

pub use compiler::{CompileProgress, NutritionCompiler};
pub use config::PipelineConfig;
pub use pipeline::{NutritionPipeline, PipelineBuilder, PipelineOutput};
pub use resolver::{BatchResolution, IngredientResolver};
