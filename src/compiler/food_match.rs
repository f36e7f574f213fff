// ABOUTME: Single-food strategy matching the meal name to one food and its closest serving
// ABOUTME: Serving factors outside the scale guard are rejected with the food and ratio logged
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use async_trait::async_trait;
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    CompiledIngredient, ConfidenceLevel, DraftMeal, MatchedFood, NutritionStrategy, Unit,
};
use nutrition_intelligence::{best_serving, ScaleGuard};
use tracing::{debug, warn};

use super::strategy::{assemble, round_grams, round_quantity, Attempt, MealOutcome, MealStrategy};
use crate::resolver::IngredientResolver;

/// Treats the whole meal as one food
pub struct FoodMatchStrategy {
    resolver: Arc<IngredientResolver>,
    guard: ScaleGuard,
}

impl FoodMatchStrategy {
    /// Create the strategy
    #[must_use]
    pub const fn new(resolver: Arc<IngredientResolver>, guard: ScaleGuard) -> Self {
        Self { resolver, guard }
    }
}

#[async_trait]
impl MealStrategy for FoodMatchStrategy {
    fn kind(&self) -> NutritionStrategy {
        NutritionStrategy::FoodMatch
    }

    async fn attempt(&self, meal: &DraftMeal) -> Attempt {
        let Some(food) = self.resolver.find_food(&meal.name).await else {
            return Attempt::failed(PipelineError::no_match(&meal.name), Vec::new());
        };
        let target_kcal = meal.target().calories;
        let Some(choice) = best_serving(&food.servings, target_kcal) else {
            debug!(meal = %meal.name, food = %food.name, "no serving with calories");
            return Attempt::failed(PipelineError::no_match(&food.name), Vec::new());
        };

        let factor = match self.guard.check(choice.factor) {
            Ok(factor) => factor,
            Err(e) => {
                warn!(
                    meal = %meal.name,
                    food = %food.name,
                    serving = %choice.serving.description,
                    serving_kcal = choice.serving.nutrition.calories,
                    target_kcal,
                    factor = choice.factor,
                    "food serving scale rejected"
                );
                return Attempt::failed(e, vec![format!("food '{}' rejected", food.name)]);
            }
        };

        let nutrition = choice.serving.nutrition.scaled(factor);
        let (quantity, unit, grams) = match choice.serving.gram_weight() {
            Some(grams) => (grams * factor, Unit::Grams, Some(round_grams(grams * factor))),
            None => (factor, Unit::Other("serving".to_owned()), None),
        };
        let ingredient = CompiledIngredient {
            name: food.name.clone(),
            quantity: round_quantity(quantity),
            unit,
            grams,
            nutrition: nutrition.clamped().rounded(),
            matched_food: Some(MatchedFood {
                id: food.id.clone(),
                description: food.name.clone(),
                source: food.source,
            }),
        };
        debug!(meal = %meal.name, food = %food.name, factor, "single food matched");

        let compiled = assemble(
            meal,
            MealOutcome {
                nutrition,
                confidence: ConfidenceLevel::Verified,
                strategy: NutritionStrategy::FoodMatch,
                scale_factor: Some(factor),
                ingredients: vec![ingredient],
                instructions: Vec::new(),
            },
        );
        Attempt::compiled(compiled, vec![format!("matched food '{}'", food.name)])
    }
}
