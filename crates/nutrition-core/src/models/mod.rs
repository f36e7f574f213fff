// ABOUTME: Domain models for the nutrition verification pipeline
// ABOUTME: Re-exports draft input, food record, compiled output and dietary profile types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Data Models
//!
//! - **Input**: `MealPlanDraft` → `DraftDay` → `DraftMeal` → `DraftIngredient`
//! - **Sources**: `FoodRecord`, `Serving`, `FoodSearchHit`, `RecipeRecord`
//! - **Resolution**: `ResolvedMatch` with a per-100 g snapshot
//! - **Output**: `CompiledPlan` → `CompiledDay` → `CompiledMeal` → `CompiledIngredient`
//!
//! Amounts are normalized into `Quantity` and `NutritionFacts` at the input
//! boundary so nothing downstream handles raw strings.

mod compiled;
mod diet;
mod draft;
mod food;
mod nutrition;
mod quantity;

pub use compiled::{
    CompiledDay, CompiledIngredient, CompiledMeal, CompiledPlan, ConfidenceLevel, DailyVariance,
    MatchedFood, MealPlanCompiled, NutritionStrategy,
};
pub use diet::{Allergen, DietaryPreferences, DietaryStyle};
pub use draft::{DraftDay, DraftIngredient, DraftMeal, MealPlanDraft, MealSlot};
pub use food::{
    FoodRecord, FoodSearchHit, MatchSource, MetricUnit, RecipeHit, RecipeRecord, ResolvedMatch,
    Serving,
};
pub use nutrition::{round1, NutritionFacts};
pub use quantity::{deserialize_amount, parse_amount, Quantity, Unit};

/// Normalize a food or ingredient name for keying: lowercase, single spaces
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Chicken   BREAST "), "chicken breast");
        assert_eq!(normalize_name(""), "");
    }
}
