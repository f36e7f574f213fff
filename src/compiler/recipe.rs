// ABOUTME: Recipe-level strategy for drafts without ingredient lines
// ABOUTME: Scales a matched recipe's per-serving nutrition to the meal target within guard bounds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use async_trait::async_trait;
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    parse_amount, CompiledIngredient, ConfidenceLevel, DraftMeal, NutritionFacts,
    NutritionStrategy, Quantity, RecipeRecord, Unit,
};
use nutrition_intelligence::{estimate_grams, guarded_scale, ScaleGuard};
use nutrition_sources::RecipeSource;
use tracing::{debug, warn};

use super::strategy::{assemble, round_grams, round_quantity, Attempt, MealOutcome, MealStrategy};

/// Matches legacy meals to a recipe and scales it to the target
pub struct RecipeMatchStrategy {
    recipes: Option<Arc<dyn RecipeSource>>,
    guard: ScaleGuard,
    max_results: usize,
}

impl RecipeMatchStrategy {
    /// Create the strategy; without a recipe source every attempt is skipped
    #[must_use]
    pub fn new(recipes: Option<Arc<dyn RecipeSource>>, guard: ScaleGuard, max_results: usize) -> Self {
        Self {
            recipes,
            guard,
            max_results,
        }
    }

    async fn fetch(
        &self,
        source: &dyn RecipeSource,
        meal: &DraftMeal,
    ) -> Result<RecipeRecord, PipelineError> {
        let hits = source.search_recipes(&meal.name, self.max_results).await?;
        let hit = hits
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::no_match(&meal.name))?;
        Ok(source.get_recipe(&hit.id).await?)
    }
}

#[async_trait]
impl MealStrategy for RecipeMatchStrategy {
    fn kind(&self) -> NutritionStrategy {
        NutritionStrategy::RecipeMatch
    }

    async fn attempt(&self, meal: &DraftMeal) -> Attempt {
        if !meal.is_legacy() {
            return Attempt::skipped(meal, "recipe matching only applies to drafts without ingredients");
        }
        let Some(source) = &self.recipes else {
            return Attempt::skipped(meal, "no recipe source configured");
        };

        let recipe = match self.fetch(source.as_ref(), meal).await {
            Ok(recipe) => recipe,
            Err(e) => {
                if let PipelineError::Source(source_error) = &e {
                    warn!(meal = %meal.name, source = source.name(), error = %source_error, "recipe lookup failed");
                }
                return Attempt::failed(e, Vec::new());
            }
        };

        let target_kcal = meal.target().calories;
        let (factor, nutrition) = match guarded_scale(
            &recipe.name,
            target_kcal,
            &recipe.nutrition_per_serving,
            &self.guard,
        ) {
            Ok(scaled) => scaled,
            Err(e) => {
                warn!(
                    meal = %meal.name,
                    recipe = %recipe.name,
                    recipe_kcal = recipe.nutrition_per_serving.calories,
                    target_kcal,
                    error = %e,
                    "recipe scale rejected"
                );
                return Attempt::failed(e, vec![format!("recipe '{}' rejected", recipe.name)]);
            }
        };
        debug!(meal = %meal.name, recipe = %recipe.name, factor, "recipe matched");

        let portion = factor / recipe.servings.max(1.0);
        let ingredients = recipe
            .ingredients
            .iter()
            .filter_map(|line| recipe_ingredient(line, portion))
            .collect();
        let compiled = assemble(
            meal,
            MealOutcome {
                nutrition,
                confidence: ConfidenceLevel::Verified,
                strategy: NutritionStrategy::RecipeMatch,
                scale_factor: Some(factor),
                ingredients,
                instructions: recipe.instructions.clone(),
            },
        );
        Attempt::compiled(compiled, vec![format!("matched recipe '{}'", recipe.name)])
    }
}

/// Split a free-text recipe line into name and quantity
///
/// `"1 1/2 cups brown rice"` becomes `("brown rice", 1.5 cups)`. A line with
/// no leading amount is one piece; an unrecognized unit word stays in the name.
#[must_use]
pub fn parse_ingredient_line(line: &str) -> Option<(String, Quantity)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let mut amount_end = 0;
    let mut amount = None;
    for end in (1..=tokens.len().min(2)).rev() {
        if let Some(value) = parse_amount(&tokens[..end].join(" ")) {
            amount = Some(value);
            amount_end = end;
            break;
        }
    }

    // "200g chicken"
    if amount.is_none() && tokens.len() > 1 && tokens[0].starts_with(|c: char| c.is_ascii_digit()) {
        let attached = Quantity::parse(tokens[0]);
        if attached.value > 0.0 && !matches!(attached.unit, Unit::Other(_)) {
            return Some((tokens[1..].join(" "), attached));
        }
    }

    let rest = &tokens[amount_end..];
    let (unit, name_tokens) = match rest.split_first() {
        Some((first, tail)) if amount.is_some() && !tail.is_empty() => {
            match Unit::parse(first) {
                Unit::Other(_) => (Unit::Pieces, rest),
                unit => (unit, tail),
            }
        }
        _ => (Unit::Pieces, rest),
    };
    let name = name_tokens.join(" ").trim_start_matches("of ").to_owned();
    if name.is_empty() {
        return None;
    }
    Some((name, Quantity::new(amount.unwrap_or(1.0), unit)))
}

fn recipe_ingredient(line: &str, portion: f64) -> Option<CompiledIngredient> {
    let (name, quantity) = parse_ingredient_line(line)?;
    let quantity = quantity.scaled(portion);
    let grams = estimate_grams(&name, &quantity);
    Some(CompiledIngredient {
        grams: (grams > 0.0).then(|| round_grams(grams)),
        quantity: round_quantity(quantity.value),
        unit: quantity.unit,
        name,
        nutrition: NutritionFacts::default(),
        matched_food: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient_line_with_unit() {
        let (name, quantity) = parse_ingredient_line("1 1/2 cups brown rice").unwrap_or_default();
        assert_eq!(name, "brown rice");
        assert_eq!(quantity.unit, Unit::Cups);
        assert!((quantity.value - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ingredient_line_without_unit() {
        let (name, quantity) = parse_ingredient_line("2 eggs").unwrap_or_default();
        assert_eq!(name, "eggs");
        assert_eq!(quantity.unit, Unit::Pieces);

        let (name, quantity) = parse_ingredient_line("salt to taste").unwrap_or_default();
        assert_eq!(name, "salt to taste");
        assert!((quantity.value - 1.0).abs() < 1e-9);
        assert!(parse_ingredient_line("   ").is_none());
    }
}
