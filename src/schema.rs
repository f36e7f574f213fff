// ABOUTME: Output contract check for compiled plans before they are handed to persistence
// ABOUTME: Collects every violation so a failed compile reports all problems at once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    CompiledDay, CompiledIngredient, CompiledMeal, CompiledPlan, ConfidenceLevel,
    NutritionStrategy,
};
use nutrition_intelligence::ScaleGuard;
use tracing::error;

use crate::compiler::strategy::FACTOR_ROUNDING_SLACK;
use crate::config::GuardConfig;

/// Validates compiled plans against the output contract
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    guards: GuardConfig,
}

impl SchemaValidator {
    /// Create a validator using the guard bounds the compiler applied
    #[must_use]
    pub const fn new(guards: GuardConfig) -> Self {
        Self { guards }
    }

    /// Check a compiled plan
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaValidation` listing every violation.
    pub fn validate(&self, plan: &CompiledPlan) -> Result<(), PipelineError> {
        let violations = self.violations(plan);
        if violations.is_empty() {
            return Ok(());
        }
        error!(count = violations.len(), first = %violations[0], "compiled plan failed schema validation");
        Err(PipelineError::SchemaValidation { violations })
    }

    /// Every contract violation in the plan
    #[must_use]
    pub fn violations(&self, plan: &CompiledPlan) -> Vec<String> {
        let mut violations = Vec::new();

        let meal_count: usize = plan.days.iter().map(|day| day.meals.len()).sum();
        if plan.total_meals != meal_count {
            violations.push(format!(
                "totalMeals is {} but the plan has {meal_count} meals",
                plan.total_meals
            ));
        }
        let verified = plan
            .days
            .iter()
            .flat_map(|day| &day.meals)
            .filter(|meal| meal.is_verified())
            .count();
        if plan.verified_meals != verified {
            violations.push(format!(
                "verifiedMeals is {} but {verified} meals are verified",
                plan.verified_meals
            ));
        }
        if !plan.weekly_averages.is_valid() {
            violations.push("weeklyAverages has negative or non-finite values".to_owned());
        }

        for day in &plan.days {
            check_day(day, &mut violations);
            for meal in &day.meals {
                self.check_meal(day.day, meal, &mut violations);
            }
        }
        violations
    }

    fn check_meal(&self, day: u32, meal: &CompiledMeal, violations: &mut Vec<String>) {
        let at = format!("day {day} meal '{}'", meal.name);
        if meal.name.trim().is_empty() {
            violations.push(format!("day {day}: meal name is empty"));
        }
        if !meal.nutrition.is_valid() {
            violations.push(format!("{at}: nutrition has negative or non-finite values"));
        }
        if !meal.target_nutrition.is_valid() {
            violations.push(format!("{at}: target has negative or non-finite values"));
        }
        for ingredient in &meal.ingredients {
            check_ingredient(&at, ingredient, violations);
        }
        if meal.confidence_level == ConfidenceLevel::Verified {
            self.check_verified(&at, meal, violations);
        }
    }

    fn check_verified(&self, at: &str, meal: &CompiledMeal, violations: &mut Vec<String>) {
        let guard = match meal.strategy {
            NutritionStrategy::AiEstimate => {
                violations.push(format!("{at}: estimated meal is tagged verified"));
                return;
            }
            NutritionStrategy::IngredientLevel => {
                let Some(factor) = meal.scale_factor else {
                    return;
                };
                if !rounded(self.guards.recalibration_guard()).contains(factor) {
                    violations.push(format!(
                        "{at}: recalibration factor {factor} outside [{}, {}]",
                        self.guards.recalibration_min, self.guards.recalibration_max
                    ));
                }
                return;
            }
            NutritionStrategy::RecipeMatch | NutritionStrategy::FoodMatch => {
                rounded(self.guards.scale_guard())
            }
        };
        match meal.scale_factor {
            Some(factor) if guard.contains(factor) => {}
            Some(factor) => violations.push(format!(
                "{at}: scale factor {factor} outside [{}, {}]",
                guard.min, guard.max
            )),
            None => violations.push(format!("{at}: verified {} meal has no scale factor", meal.strategy.as_str())),
        }
    }
}

/// Guard widened by the rounding applied to reported factors
fn rounded(guard: ScaleGuard) -> ScaleGuard {
    ScaleGuard::new(guard.min - FACTOR_ROUNDING_SLACK, guard.max + FACTOR_ROUNDING_SLACK)
}

fn check_day(day: &CompiledDay, violations: &mut Vec<String>) {
    if day.day == 0 {
        violations.push("day numbers start at 1".to_owned());
    }
    if !day.totals.is_valid() {
        violations.push(format!("day {}: totals have negative or non-finite values", day.day));
    }
    if !day.target.is_valid() {
        violations.push(format!("day {}: target has negative or non-finite values", day.day));
    }
    let variance = &day.variance;
    if ![
        variance.calories,
        variance.calories_percent,
        variance.protein_g,
        variance.carbs_g,
        variance.fat_g,
    ]
    .iter()
    .all(|value| value.is_finite())
    {
        violations.push(format!("day {}: variance is not finite", day.day));
    }
}

fn check_ingredient(at: &str, ingredient: &CompiledIngredient, violations: &mut Vec<String>) {
    if ingredient.name.trim().is_empty() {
        violations.push(format!("{at}: ingredient name is empty"));
    }
    if !(ingredient.quantity.is_finite() && ingredient.quantity >= 0.0) {
        violations.push(format!("{at}: '{}' has invalid quantity", ingredient.name));
    }
    if ingredient
        .grams
        .is_some_and(|grams| !(grams.is_finite() && grams >= 0.0))
    {
        violations.push(format!("{at}: '{}' has invalid gram weight", ingredient.name));
    }
    if !ingredient.nutrition.is_valid() {
        violations.push(format!("{at}: '{}' nutrition has negative or non-finite values", ingredient.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutrition_core::models::{DailyVariance, MealSlot, NutritionFacts};

    fn meal(strategy: NutritionStrategy, factor: Option<f64>) -> CompiledMeal {
        CompiledMeal {
            slot: MealSlot::Dinner,
            name: "Salmon bowl".to_owned(),
            cuisine: None,
            primary_protein: None,
            nutrition: NutritionFacts::new(600.0, 40.0, 50.0, 20.0),
            target_nutrition: NutritionFacts::new(600.0, 40.0, 50.0, 20.0),
            confidence_level: ConfidenceLevel::Verified,
            strategy,
            scale_factor: factor,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            tags: Vec::new(),
        }
    }

    fn plan(meals: Vec<CompiledMeal>) -> CompiledPlan {
        let verified_meals = meals.iter().filter(|meal| meal.is_verified()).count();
        let total_meals = meals.len();
        CompiledPlan {
            title: None,
            days: vec![CompiledDay {
                day: 1,
                date: None,
                meals,
                totals: NutritionFacts::default(),
                target: NutritionFacts::default(),
                variance: DailyVariance::default(),
            }],
            weekly_averages: NutritionFacts::default(),
            verified_meals,
            total_meals,
        }
    }

    #[test]
    fn test_verified_meal_needs_factor_in_bounds() {
        let validator = SchemaValidator::new(GuardConfig::default());
        assert!(validator
            .validate(&plan(vec![meal(NutritionStrategy::FoodMatch, Some(0.5))]))
            .is_ok());

        let violations = validator.violations(&plan(vec![meal(NutritionStrategy::RecipeMatch, Some(12.0))]));
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("scale factor"));
    }

    #[test]
    fn test_rounded_factor_at_overridden_bound_passes() {
        let guards = GuardConfig {
            scale_factor_min: 0.2504,
            recalibration_min: 0.5004,
            ..GuardConfig::default()
        };
        let validator = SchemaValidator::new(guards);
        let accepted = plan(vec![
            meal(NutritionStrategy::FoodMatch, Some(0.25)),
            meal(NutritionStrategy::IngredientLevel, Some(0.5)),
        ]);
        assert!(validator.validate(&accepted).is_ok());

        let violations = validator.violations(&plan(vec![meal(NutritionStrategy::FoodMatch, Some(0.249))]));
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_counts_must_match_meals() {
        let mut plan = plan(vec![meal(NutritionStrategy::IngredientLevel, None)]);
        plan.verified_meals = 0;
        let error = SchemaValidator::new(GuardConfig::default()).validate(&plan);
        assert!(matches!(error, Err(PipelineError::SchemaValidation { violations }) if violations.len() == 1));
    }
}
