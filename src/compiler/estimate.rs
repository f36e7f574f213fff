// ABOUTME: Last-resort strategy that keeps the drafted estimate and tags the meal ai_estimated
// ABOUTME: Also synthesizes ingredient lines and generic steps when the draft has none
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use nutrition_core::models::{
    CompiledIngredient, CompiledMeal, ConfidenceLevel, DraftMeal, MealSlot, NutritionFacts,
    NutritionStrategy, Unit,
};
use nutrition_intelligence::estimate_grams;
use nutrition_intelligence::macro_corrector::ingredient_estimate;

use super::strategy::{assemble, round_grams, round_quantity, Attempt, MealOutcome, MealStrategy};

/// kcal per gram of protein and carbohydrate
const KCAL_PER_G_PROTEIN_CARB: f64 = 4.0;
/// kcal per gram of fat
const KCAL_PER_G_FAT: f64 = 9.0;

/// Keeps the upstream estimate verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct AiEstimateStrategy;

#[async_trait]
impl MealStrategy for AiEstimateStrategy {
    fn kind(&self) -> NutritionStrategy {
        NutritionStrategy::AiEstimate
    }

    async fn attempt(&self, meal: &DraftMeal) -> Attempt {
        Attempt::compiled(estimate_meal(meal), Vec::new())
    }
}

/// Compile a meal from its drafted estimate alone
#[must_use]
pub fn estimate_meal(meal: &DraftMeal) -> CompiledMeal {
    let ingredients = if meal.draft_ingredients.is_empty() {
        synthesized_ingredients(meal)
    } else {
        drafted_ingredients(meal)
    };
    assemble(
        meal,
        MealOutcome {
            nutrition: meal.estimated_nutrition,
            confidence: ConfidenceLevel::AiEstimated,
            strategy: NutritionStrategy::AiEstimate,
            scale_factor: None,
            ingredients,
            instructions: Vec::new(),
        },
    )
}

fn drafted_ingredients(meal: &DraftMeal) -> Vec<CompiledIngredient> {
    meal.draft_ingredients
        .iter()
        .map(|ingredient| CompiledIngredient {
            name: ingredient.name.clone(),
            quantity: round_quantity(ingredient.quantity.value),
            unit: ingredient.quantity.unit.clone(),
            grams: Some(round_grams(estimate_grams(&ingredient.name, &ingredient.quantity))),
            nutrition: ingredient_estimate(ingredient)
                .unwrap_or_default()
                .clamped()
                .rounded(),
            matched_food: None,
        })
        .collect()
}

/// Approximate protein, carb and fat lines that carry the meal's macros
fn synthesized_ingredients(meal: &DraftMeal) -> Vec<CompiledIngredient> {
    let estimate = meal.estimated_nutrition.clamped();
    let protein_name = meal
        .primary_protein
        .clone()
        .unwrap_or_else(|| "protein source".to_owned());
    let carb_name = match meal.slot {
        MealSlot::Breakfast => "oats or whole grain bread",
        MealSlot::Snack => "fruit",
        _ => "whole grains or starchy vegetables",
    };

    let lines = [
        (
            protein_name,
            NutritionFacts::new(
                estimate.protein_g * KCAL_PER_G_PROTEIN_CARB,
                estimate.protein_g,
                0.0,
                0.0,
            ),
        ),
        (
            carb_name.to_owned(),
            NutritionFacts::new(
                estimate.carbs_g * KCAL_PER_G_PROTEIN_CARB,
                0.0,
                estimate.carbs_g,
                0.0,
            )
            .with_fiber(estimate.fiber_g),
        ),
        (
            "healthy fats".to_owned(),
            NutritionFacts::new(estimate.fat_g * KCAL_PER_G_FAT, 0.0, 0.0, estimate.fat_g),
        ),
    ];

    lines
        .into_iter()
        .filter(|(_, nutrition)| nutrition.calories > 0.0)
        .map(|(name, nutrition)| CompiledIngredient {
            name,
            quantity: 1.0,
            unit: Unit::Other("serving".to_owned()),
            grams: None,
            nutrition: nutrition.rounded(),
            matched_food: None,
        })
        .collect()
}

/// Generic preparation steps built from the ingredient list
#[must_use]
pub fn generic_instructions(meal: &DraftMeal, ingredients: &[CompiledIngredient]) -> Vec<String> {
    let names: Vec<&str> = ingredients
        .iter()
        .map(|ingredient| ingredient.name.as_str())
        .collect();
    let listed = if names.is_empty() {
        "the ingredients".to_owned()
    } else {
        names.join(", ")
    };

    let mut steps = vec![format!("Gather and measure {listed}.")];
    match meal.slot {
        MealSlot::Snack => steps.push("Portion and serve.".to_owned()),
        _ => {
            match meal.cook_time_minutes {
                Some(minutes) if minutes > 0 => {
                    steps.push(format!("Cook for about {minutes} minutes until done."));
                }
                _ => steps.push("Prepare and combine the ingredients.".to_owned()),
            }
            steps.push(format!("Plate the {} and serve.", meal.name.to_lowercase()));
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_is_used_verbatim() {
        let mut meal = DraftMeal::new(
            MealSlot::Lunch,
            "Mystery Bowl",
            NutritionFacts::new(612.4, 40.04, 60.0, 20.0),
        );
        meal.primary_protein = Some("tofu".to_owned());

        let compiled = estimate_meal(&meal);
        assert_eq!(compiled.confidence_level, ConfidenceLevel::AiEstimated);
        assert_eq!(compiled.strategy, NutritionStrategy::AiEstimate);
        assert!((compiled.nutrition.calories - 612.0).abs() < f64::EPSILON);
        assert!((compiled.nutrition.protein_g - 40.0).abs() < 1e-9);
        assert!(compiled.scale_factor.is_none());
        assert_eq!(compiled.ingredients.len(), 3);
        assert_eq!(compiled.ingredients[0].name, "tofu");
        assert!(!compiled.instructions.is_empty());
    }

    #[test]
    fn test_zero_macro_lines_are_omitted() {
        let meal = DraftMeal::new(MealSlot::Snack, "Apple", NutritionFacts::new(95.0, 0.0, 25.0, 0.0));
        let compiled = estimate_meal(&meal);
        assert_eq!(compiled.ingredients.len(), 1);
        assert_eq!(compiled.ingredients[0].name, "fruit");
    }
}
