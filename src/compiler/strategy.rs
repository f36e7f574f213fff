// ABOUTME: Strategy trait for the ordered meal compilation chain and shared meal assembly
// ABOUTME: Each strategy either compiles a meal or returns a routing signal for the next one
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    round1, CompiledIngredient, CompiledMeal, ConfidenceLevel, DraftMeal, NutritionFacts,
    NutritionStrategy,
};

/// Result of one strategy attempt
#[derive(Debug)]
pub struct Attempt {
    /// Compiled meal, or the signal that routes to the next strategy
    pub result: Result<CompiledMeal, PipelineError>,
    /// Notes collected along the way, logged by the compiler
    pub diagnostics: Vec<String>,
}

impl Attempt {
    /// Successful attempt
    #[must_use]
    pub const fn compiled(meal: CompiledMeal, diagnostics: Vec<String>) -> Self {
        Self {
            result: Ok(meal),
            diagnostics,
        }
    }

    /// Failed attempt
    #[must_use]
    pub const fn failed(error: PipelineError, diagnostics: Vec<String>) -> Self {
        Self {
            result: Err(error),
            diagnostics,
        }
    }

    /// Strategy does not apply to this meal
    #[must_use]
    pub fn skipped(meal: &DraftMeal, reason: &str) -> Self {
        Self::failed(PipelineError::no_match(&meal.name), vec![reason.to_owned()])
    }
}

/// One step of the compile chain
#[async_trait]
pub trait MealStrategy: Send + Sync {
    /// Strategy tag written to compiled meals
    fn kind(&self) -> NutritionStrategy;

    /// Try to compile `meal`
    async fn attempt(&self, meal: &DraftMeal) -> Attempt;
}

/// Everything a strategy decides about a compiled meal
#[derive(Debug, Clone)]
pub struct MealOutcome {
    /// Unrounded meal nutrition
    pub nutrition: NutritionFacts,
    /// Confidence tag
    pub confidence: ConfidenceLevel,
    /// Strategy tag
    pub strategy: NutritionStrategy,
    /// Applied scale or recalibration factor
    pub scale_factor: Option<f64>,
    /// Compiled ingredient lines
    pub ingredients: Vec<CompiledIngredient>,
    /// Preparation steps; empty means "use the drafted or generic steps"
    pub instructions: Vec<String>,
}

/// Combine a draft meal with a strategy outcome
#[must_use]
pub fn assemble(meal: &DraftMeal, outcome: MealOutcome) -> CompiledMeal {
    let instructions = if !outcome.instructions.is_empty() {
        outcome.instructions
    } else if !meal.instructions.is_empty() {
        meal.instructions.clone()
    } else {
        super::estimate::generic_instructions(meal, &outcome.ingredients)
    };

    CompiledMeal {
        slot: meal.slot,
        name: meal.name.clone(),
        cuisine: meal.cuisine.clone(),
        primary_protein: meal.primary_protein.clone(),
        nutrition: outcome.nutrition.clamped().rounded(),
        target_nutrition: meal.target().clamped().rounded(),
        confidence_level: outcome.confidence,
        strategy: outcome.strategy,
        scale_factor: outcome.scale_factor.map(round_factor),
        ingredients: outcome.ingredients,
        instructions,
        tags: meal.tags.clone(),
    }
}

/// Round a display quantity to two decimals
#[must_use]
pub fn round_quantity(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round a gram weight to one decimal
#[must_use]
pub fn round_grams(value: f64) -> f64 {
    round1(value)
}

/// Largest shift rounding can apply to a reported factor
pub const FACTOR_ROUNDING_SLACK: f64 = 0.0005;

fn round_factor(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
