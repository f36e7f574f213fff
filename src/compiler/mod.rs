// ABOUTME: Nutrition compiler turning a drafted plan into verified or tagged-estimate meals
// ABOUTME: Runs days concurrently, meals through a bounded pool and each meal through the strategy chain
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Meal plan compilation
//!
//! Every meal walks the strategy chain in order until one succeeds:
//!
//! 1. Ingredient level: price drafted lines against resolved foods
//! 2. Recipe match: legacy drafts only, scaled within the scale guard
//! 3. Food match: the meal name as a single food, scaled within the scale guard
//! 4. AI estimate: the drafted numbers, tagged `ai_estimated`
//!
//! Strategy failures route to the next strategy and never fail the compile.
//! The only fatal error is schema validation of the finished plan.

/// Day and plan aggregation
pub mod aggregate;
/// Estimate fallback strategy
pub mod estimate;
/// Single-food strategy
pub mod food_match;
/// Ingredient-level strategy and recalibration
pub mod ingredient;
/// Progress notifications
pub mod progress;
/// Recipe strategy
pub mod recipe;
/// Strategy trait
pub mod strategy;

pub use estimate::AiEstimateStrategy;
pub use food_match::FoodMatchStrategy;
pub use ingredient::{IngredientLevelStrategy, Recalibration};
pub use progress::{CompileProgress, ProgressSender, ProgressTracker};
pub use recipe::RecipeMatchStrategy;
pub use strategy::{Attempt, MealStrategy};

use std::sync::Arc;

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{CompiledDay, CompiledMeal, CompiledPlan, DraftDay, DraftMeal, MealPlanDraft};
use nutrition_sources::RecipeSource;
use tracing::{debug, info, warn};

use crate::config::{ConcurrencyConfig, GuardConfig};
use crate::resolver::IngredientResolver;
use crate::schema::SchemaValidator;

/// Compiles drafted plans
pub struct NutritionCompiler {
    strategies: Vec<Box<dyn MealStrategy>>,
    validator: SchemaValidator,
    meal_limit: usize,
    progress_interval: usize,
}

impl NutritionCompiler {
    /// Create a compiler with the standard strategy chain
    #[must_use]
    pub fn new(
        resolver: Arc<IngredientResolver>,
        recipes: Option<Arc<dyn RecipeSource>>,
        guards: GuardConfig,
        concurrency: &ConcurrencyConfig,
    ) -> Self {
        let strategies: Vec<Box<dyn MealStrategy>> = vec![
            Box::new(IngredientLevelStrategy::new(Arc::clone(&resolver), guards)),
            Box::new(RecipeMatchStrategy::new(
                recipes,
                guards.scale_guard(),
                concurrency.search_page_size,
            )),
            Box::new(FoodMatchStrategy::new(resolver, guards.scale_guard())),
            Box::new(AiEstimateStrategy),
        ];
        Self::with_strategies(strategies, guards, concurrency)
    }

    /// Create a compiler with a custom strategy chain
    ///
    /// The estimate fallback always runs after the chain, so it need not be included.
    #[must_use]
    pub fn with_strategies(
        strategies: Vec<Box<dyn MealStrategy>>,
        guards: GuardConfig,
        concurrency: &ConcurrencyConfig,
    ) -> Self {
        Self {
            strategies,
            validator: SchemaValidator::new(guards),
            meal_limit: concurrency.meal_limit.max(1),
            progress_interval: concurrency.progress_interval,
        }
    }

    /// Compile a drafted plan
    ///
    /// Days run concurrently; meals within a day run through a bounded pool and
    /// keep their drafted order.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SchemaValidation` when the compiled plan breaks
    /// its output contract. No other failure aborts a compile.
    pub async fn compile(
        &self,
        draft: &MealPlanDraft,
        progress: Option<ProgressSender>,
    ) -> Result<CompiledPlan, PipelineError> {
        let total = draft.meal_count();
        info!(days = draft.days.len(), meals = total, "compiling meal plan");
        let tracker = ProgressTracker::new(total, self.progress_interval, progress);

        let days: Vec<CompiledDay> =
            join_all(draft.days.iter().map(|day| self.compile_day(day, &tracker))).await;
        let plan = aggregate::summarize_plan(draft.title.clone(), days);

        self.validator.validate(&plan)?;
        info!(
            meals = plan.total_meals,
            verified = plan.verified_meals,
            "meal plan compiled"
        );
        Ok(plan)
    }

    async fn compile_day(&self, day: &DraftDay, tracker: &ProgressTracker) -> CompiledDay {
        let meals: Vec<CompiledMeal> = stream::iter(&day.meals)
            .map(|meal| async move {
                let compiled = self.compile_meal(meal).await;
                tracker.meal_completed();
                compiled
            })
            .buffered(self.meal_limit)
            .collect()
            .await;
        aggregate::summarize_day(day, meals)
    }

    /// Compile one meal through the strategy chain
    ///
    /// Ingredient lines with blank names are dropped before any strategy runs.
    pub async fn compile_meal(&self, meal: &DraftMeal) -> CompiledMeal {
        let cleaned;
        let meal = match meal.blank_ingredient_count() {
            0 => meal,
            blank => {
                warn!(meal = %meal.name, blank, "dropping ingredient lines with blank names");
                cleaned = meal.without_blank_ingredients();
                &cleaned
            }
        };
        for strategy in &self.strategies {
            let attempt = strategy.attempt(meal).await;
            for note in &attempt.diagnostics {
                debug!(meal = %meal.name, strategy = strategy.kind().as_str(), note = %note, "strategy diagnostic");
            }
            match attempt.result {
                Ok(compiled) => {
                    debug!(
                        meal = %meal.name,
                        strategy = compiled.strategy.as_str(),
                        confidence = %compiled.confidence_level,
                        "meal compiled"
                    );
                    return compiled;
                }
                Err(e) => log_routing(meal, strategy.as_ref(), &e),
            }
        }
        estimate::estimate_meal(meal)
    }
}

fn log_routing(meal: &DraftMeal, strategy: &dyn MealStrategy, error: &PipelineError) {
    match error {
        PipelineError::NoMatch { .. } | PipelineError::InsufficientCoverage { .. } => {
            debug!(meal = %meal.name, strategy = strategy.kind().as_str(), reason = %error, "strategy did not apply");
        }
        _ => {
            warn!(meal = %meal.name, strategy = strategy.kind().as_str(), error = %error, "strategy failed, trying next");
        }
    }
}
