// ABOUTME: Nutrition reconciliation algorithms: units, servings, macro correction, variety, compliance
// ABOUTME: Synchronous and I/O free so every rule is unit-testable in isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! Nutrition algorithms shared by the compiler and the fallback plan generator.

// Re-export nutrition-core modules for callers that only depend on this crate
pub use nutrition_core::constants;
pub use nutrition_core::models;

/// Allergen and dietary-style audit
pub mod compliance;
/// Draft macro correction and keto swaps
pub mod macro_corrector;
/// Per-100g derivation, best-serving selection and scale guards
pub mod servings;
/// Word tokens, phrase matching and trigram similarity
pub mod text;
/// Unit conversion with food-specific densities
pub mod units;
/// Constraint-based meal selection
pub mod variety;

pub use compliance::{
    ComplianceReport, ComplianceScanner, ComplianceViolation, ScannedField, ViolationCategory,
};
pub use macro_corrector::{
    apply_keto_swaps, classify, ClassAdjustment, CorrectionBounds, CorrectionReport,
    IngredientSwap, MacroClass, MacroCorrector, MealCorrection,
};
pub use servings::{best_serving, guarded_scale, nutrition_per_100g, ScaleGuard, ServingChoice};
pub use units::{convert_to_grams, estimate_grams, ml_density_estimate, ConversionError};
pub use variety::VarietyOptimizer;
