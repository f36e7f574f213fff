// ABOUTME: Ingredient-level strategy pricing each drafted line against resolved foods
// ABOUTME: Recalibrates resolved quantities toward the meal target within guard bounds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use async_trait::async_trait;
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    CompiledIngredient, ConfidenceLevel, DraftIngredient, DraftMeal, MatchedFood, NutritionFacts,
    NutritionStrategy, Quantity, ResolvedMatch,
};
use nutrition_intelligence::estimate_grams;
use nutrition_intelligence::macro_corrector::ingredient_estimate;
use tracing::{debug, warn};

use super::strategy::{assemble, round_grams, round_quantity, Attempt, MealOutcome, MealStrategy};
use crate::config::GuardConfig;
use crate::resolver::IngredientResolver;

/// One drafted line with its computed nutrition
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    /// Drafted ingredient name
    pub name: String,
    /// Drafted quantity, possibly recalibrated
    pub quantity: Quantity,
    /// Estimated gram weight
    pub grams: f64,
    /// Nutrition for this line
    pub nutrition: NutritionFacts,
    /// Food the line was priced against; `None` for estimated lines
    pub matched: Option<MatchedFood>,
}

impl PricedLine {
    /// Price a drafted line against its best match, or estimate it by macro class
    #[must_use]
    pub fn price(ingredient: &DraftIngredient, best: Option<&ResolvedMatch>) -> Self {
        let grams = estimate_grams(&ingredient.name, &ingredient.quantity);
        let (nutrition, matched) = match best {
            Some(food) => (
                food.per_100g.scaled(grams / 100.0),
                Some(MatchedFood {
                    id: food.id.clone(),
                    description: food.description.clone(),
                    source: food.source,
                }),
            ),
            None => (ingredient_estimate(ingredient).unwrap_or_default(), None),
        };
        Self {
            name: ingredient.name.clone(),
            quantity: ingredient.quantity.clone(),
            grams,
            nutrition: nutrition.clamped(),
            matched,
        }
    }

    /// Line was priced against a real food
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    fn compiled(self) -> CompiledIngredient {
        CompiledIngredient {
            name: self.name,
            quantity: round_quantity(self.quantity.value),
            unit: self.quantity.unit,
            grams: Some(round_grams(self.grams)),
            nutrition: self.nutrition.rounded(),
            matched_food: self.matched,
        }
    }
}

/// What recalibration did to a meal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Recalibration {
    /// Total already within tolerance of the target
    NotNeeded,
    /// Resolved lines were scaled by the factor
    Applied {
        /// Factor applied to resolved quantities
        factor: f64,
    },
    /// Required factor fell outside its bounds; nothing was scaled
    Rejected {
        /// Factor that would have been needed
        factor: f64,
    },
}

/// Scale resolved lines so the meal total lands on `target_kcal`
///
/// Estimated lines keep their quantities, so the factor is taken over the
/// resolved share: `(target - estimated) / resolved`. Nothing changes when the
/// total is within tolerance or the required factor is outside the
/// recalibration guard.
pub fn recalibrate(lines: &mut [PricedLine], target_kcal: f64, guards: &GuardConfig) -> Recalibration {
    let actual: f64 = lines.iter().map(|line| line.nutrition.calories).sum();
    if target_kcal <= 0.0 || actual <= 0.0 {
        return Recalibration::NotNeeded;
    }
    let deviation = (actual - target_kcal).abs() / target_kcal;
    if deviation <= guards.recalibration_tolerance {
        return Recalibration::NotNeeded;
    }

    let resolved: f64 = lines
        .iter()
        .filter(|line| line.is_matched())
        .map(|line| line.nutrition.calories)
        .sum();
    if resolved <= 0.0 {
        return Recalibration::NotNeeded;
    }
    let factor = (target_kcal - (actual - resolved)) / resolved;
    if !guards.recalibration_guard().contains(factor) {
        return Recalibration::Rejected { factor };
    }
    for line in lines.iter_mut().filter(|line| line.is_matched()) {
        line.quantity = line.quantity.scaled(factor);
        line.grams *= factor;
        line.nutrition = line.nutrition.scaled(factor);
    }
    Recalibration::Applied { factor }
}

/// Prices every drafted ingredient line against resolved foods
pub struct IngredientLevelStrategy {
    resolver: Arc<IngredientResolver>,
    guards: GuardConfig,
}

impl IngredientLevelStrategy {
    /// Create the strategy
    #[must_use]
    pub const fn new(resolver: Arc<IngredientResolver>, guards: GuardConfig) -> Self {
        Self { resolver, guards }
    }
}

#[async_trait]
impl MealStrategy for IngredientLevelStrategy {
    fn kind(&self) -> NutritionStrategy {
        NutritionStrategy::IngredientLevel
    }

    async fn attempt(&self, meal: &DraftMeal) -> Attempt {
        if meal.is_legacy() {
            return Attempt::skipped(meal, "draft has no ingredient lines");
        }

        let names: Vec<&str> = meal
            .draft_ingredients
            .iter()
            .map(|ingredient| ingredient.name.as_str())
            .collect();
        let resolution = self.resolver.resolve_batch(&names).await;
        let mut diagnostics = Vec::new();
        if let Some(timeout) = resolution.timeout() {
            diagnostics.push(timeout.to_string());
        }

        let mut lines: Vec<PricedLine> = meal
            .draft_ingredients
            .iter()
            .map(|ingredient| PricedLine::price(ingredient, resolution.best(&ingredient.name)))
            .collect();
        let total = lines.len();
        let matched = lines.iter().filter(|line| line.is_matched()).count();
        diagnostics.push(format!("matched {matched}/{total} ingredients"));
        if matched == 0 {
            return Attempt::failed(
                PipelineError::InsufficientCoverage { matched, total },
                diagnostics,
            );
        }

        #[allow(clippy::cast_precision_loss)]
        let ratio = matched as f64 / total as f64;
        let mut verified = ratio >= self.guards.verified_match_ratio;
        if !verified {
            debug!(meal = %meal.name, matched, total, ratio, "match ratio below verified threshold");
        }

        let target_kcal = meal.target().calories;
        let scale_factor = match recalibrate(&mut lines, target_kcal, &self.guards) {
            Recalibration::NotNeeded => None,
            Recalibration::Applied { factor } => {
                debug!(meal = %meal.name, factor, target_kcal, "recalibrated resolved quantities");
                Some(factor)
            }
            Recalibration::Rejected { factor } => {
                warn!(
                    meal = %meal.name,
                    factor,
                    min = self.guards.recalibration_min,
                    max = self.guards.recalibration_max,
                    target_kcal,
                    "recalibration factor outside bounds, keeping resolved quantities"
                );
                diagnostics.push(format!("recalibration factor {factor:.3} rejected"));
                verified = false;
                None
            }
        };

        let nutrition: NutritionFacts = lines.iter().map(|line| line.nutrition).sum();
        let compiled = assemble(
            meal,
            MealOutcome {
                nutrition,
                confidence: if verified {
                    ConfidenceLevel::Verified
                } else {
                    ConfidenceLevel::AiEstimated
                },
                strategy: NutritionStrategy::IngredientLevel,
                scale_factor,
                ingredients: lines.into_iter().map(PricedLine::compiled).collect(),
                instructions: Vec::new(),
            },
        );
        Attempt::compiled(compiled, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrition_core::models::{MatchSource, Unit};

    fn matched_line(kcal: f64) -> PricedLine {
        let food = ResolvedMatch {
            id: "1".to_owned(),
            description: "chicken breast".to_owned(),
            source: MatchSource::Local,
            per_100g: NutritionFacts::new(kcal, 20.0, 0.0, 5.0),
            data_type: None,
        };
        PricedLine::price(&DraftIngredient::new("chicken breast", 100.0, Unit::Grams), Some(&food))
    }

    #[test]
    fn test_recalibration_scales_resolved_lines() {
        let mut lines = vec![matched_line(600.0), matched_line(400.0)];
        let outcome = recalibrate(&mut lines, 700.0, &GuardConfig::default());

        assert!(matches!(outcome, Recalibration::Applied { factor } if (factor - 0.7).abs() < 1e-9));
        let total: f64 = lines.iter().map(|line| line.nutrition.calories).sum();
        assert!((total - 700.0).abs() < 1e-6);
        assert!((lines[0].quantity.value - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_recalibration_outside_bounds_changes_nothing() {
        let mut lines = vec![matched_line(3000.0)];
        let outcome = recalibrate(&mut lines, 700.0, &GuardConfig::default());
        assert!(matches!(outcome, Recalibration::Rejected { factor } if factor < 0.5));
        assert!((lines[0].nutrition.calories - 3000.0).abs() < 1e-9);
    }

    #[test]
    fn test_recalibration_lands_on_target_with_estimated_lines() {
        let estimated = PricedLine::price(&DraftIngredient::new("white rice", 100.0, Unit::Grams), None);
        let estimated_kcal = estimated.nutrition.calories;
        assert!(estimated_kcal > 0.0);
        let mut lines = vec![matched_line(1000.0), estimated];
        let target = 600.0 + estimated_kcal;

        let outcome = recalibrate(&mut lines, target, &GuardConfig::default());

        assert!(matches!(outcome, Recalibration::Applied { factor } if (factor - 0.6).abs() < 1e-9));
        let total: f64 = lines.iter().map(|line| line.nutrition.calories).sum();
        assert!((total - target).abs() < 1e-6);
        assert!((lines[1].nutrition.calories - estimated_kcal).abs() < 1e-9);
    }

    #[test]
    fn test_within_tolerance_is_left_alone() {
        let mut lines = vec![matched_line(650.0)];
        assert_eq!(
            recalibrate(&mut lines, 700.0, &GuardConfig::default()),
            Recalibration::NotNeeded
        );
    }
}
