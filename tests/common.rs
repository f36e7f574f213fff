// ABOUTME: Shared test utilities for resolver, compiler and pipeline integration tests
// ABOUTME: Provides quiet logging, counting mock sources and draft builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `nutrition_compiler`

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use nutrition_compiler::config::PipelineConfig;
use nutrition_compiler::resolver::{IngredientResolver, ResolverSettings};
use nutrition_core::errors::SourceError;
use nutrition_core::models::{
    normalize_name, DraftDay, DraftIngredient, DraftMeal, FoodRecord, FoodSearchHit, MatchSource,
    MealPlanDraft, MealSlot, NutritionFacts, RecipeHit, RecipeRecord, ResolvedMatch, Serving, Unit,
};
use nutrition_sources::{FoodAliasCache, FoodDataSource, RecipeSource};
use tokio::time::sleep;
use tracing::Level;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => Level::TRACE,
            Ok("DEBUG") => Level::DEBUG,
            Ok("INFO") => Level::INFO,
            _ => Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// In-memory food source that counts calls
pub struct MockFoodSource {
    kind: MatchSource,
    foods: Vec<(FoodRecord, Option<String>)>,
    failing: bool,
    delay: Option<Duration>,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl MockFoodSource {
    pub fn new(kind: MatchSource) -> Self {
        Self {
            kind,
            foods: Vec::new(),
            failing: false,
            delay: None,
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
        }
    }

    /// Add a generic food
    pub fn with_food(mut self, food: FoodRecord) -> Self {
        self.foods.push((food, None));
        self
    }

    /// Add a branded food
    pub fn with_branded_food(mut self, food: FoodRecord, brand: &str) -> Self {
        self.foods.push((food, Some(brand.to_owned())));
        self
    }

    /// Every call fails with a timeout
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Every call sleeps first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.search_calls() + self.detail_calls()
    }

    async fn pause_or_fail(&self) -> Result<(), SourceError> {
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        if self.failing {
            return Err(SourceError::Timeout {
                source_name: self.kind.as_str().to_owned(),
                timeout_ms: 8000,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FoodDataSource for MockFoodSource {
    fn kind(&self) -> MatchSource {
        self.kind
    }

    async fn search_foods(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_or_fail().await?;
        let query = normalize_name(query);
        Ok(self
            .foods
            .iter()
            .filter(|(food, _)| {
                let name = normalize_name(&food.name);
                name.contains(&query) || query.contains(&name)
            })
            .take(max_results)
            .map(|(food, brand)| FoodSearchHit {
                id: food.id.clone(),
                description: food.name.clone(),
                source: self.kind,
                data_type: None,
                brand: brand.clone(),
                score: None,
            })
            .collect())
    }

    async fn get_food(&self, id: &str) -> Result<FoodRecord, SourceError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.pause_or_fail().await?;
        self.foods
            .iter()
            .find(|(food, _)| food.id == id)
            .map(|(food, _)| food.clone())
            .ok_or_else(|| SourceError::not_found(self.kind.as_str(), id))
    }
}

/// In-memory recipe source that counts calls
pub struct MockRecipeSource {
    recipes: Vec<RecipeRecord>,
    calls: AtomicUsize,
}

impl MockRecipeSource {
    pub fn new(recipes: Vec<RecipeRecord>) -> Self {
        Self {
            recipes,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeSource for MockRecipeSource {
    fn name(&self) -> &'static str {
        "mock-recipes"
    }

    async fn search_recipes(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RecipeHit>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = normalize_name(query);
        Ok(self
            .recipes
            .iter()
            .filter(|recipe| normalize_name(&recipe.name).contains(&query))
            .take(max_results)
            .map(|recipe| RecipeHit {
                id: recipe.id.clone(),
                name: recipe.name.clone(),
                description: None,
            })
            .collect())
    }

    async fn get_recipe(&self, id: &str) -> Result<RecipeRecord, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.recipes
            .iter()
            .find(|recipe| recipe.id == id)
            .cloned()
            .ok_or_else(|| SourceError::not_found("mock-recipes", id))
    }
}

/// Food with a single 100 g serving
pub fn food_per_100g(id: &str, name: &str, kcal: f64, protein: f64, carbs: f64, fat: f64) -> FoodRecord {
    FoodRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        source: MatchSource::Usda,
        data_type: None,
        brand: None,
        servings: vec![Serving::grams("100 g", 100.0, NutritionFacts::new(kcal, protein, carbs, fat))],
    }
}

/// Food with one described serving and no metric weight
pub fn food_per_serving(id: &str, name: &str, kcal: f64) -> FoodRecord {
    FoodRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        source: MatchSource::FatSecret,
        data_type: None,
        brand: None,
        servings: vec![Serving::described(
            "1 serving",
            NutritionFacts::new(kcal, kcal * 0.05, kcal * 0.1, kcal * 0.04),
        )],
    }
}

/// Alias entry resolving to a per-100 g snapshot
pub fn alias_match(id: &str, description: &str, kcal: f64) -> ResolvedMatch {
    ResolvedMatch {
        id: id.to_owned(),
        description: description.to_owned(),
        source: MatchSource::Local,
        per_100g: NutritionFacts::new(kcal, 10.0, 10.0, 5.0),
        data_type: None,
    }
}

/// Meal with gram-weighted ingredient lines and an explicit kcal target
pub fn ingredient_meal(name: &str, target_kcal: f64, ingredients: &[(&str, f64)]) -> DraftMeal {
    let mut meal = DraftMeal::new(
        MealSlot::Dinner,
        name,
        NutritionFacts::new(target_kcal, 30.0, 50.0, 20.0),
    );
    meal.target_nutrition = Some(NutritionFacts::new(target_kcal, 30.0, 50.0, 20.0));
    meal.draft_ingredients = ingredients
        .iter()
        .map(|(name, grams)| DraftIngredient::new(*name, *grams, Unit::Grams))
        .collect();
    meal
}

/// Meal with no ingredient lines
pub fn legacy_meal(name: &str, target_kcal: f64) -> DraftMeal {
    let mut meal = DraftMeal::new(
        MealSlot::Lunch,
        name,
        NutritionFacts::new(target_kcal, 30.0, 60.0, 20.0),
    );
    meal.target_nutrition = Some(NutritionFacts::new(target_kcal, 30.0, 60.0, 20.0));
    meal
}

/// Plan with every meal on day one
pub fn single_day_plan(meals: Vec<DraftMeal>) -> MealPlanDraft {
    MealPlanDraft {
        title: Some("test plan".to_owned()),
        preferences: Default::default(),
        days: vec![DraftDay {
            day: 1,
            date: None,
            target_nutrition: None,
            meals,
        }],
    }
}

/// Resolver over the given tiers with default limits
pub fn resolver(
    aliases: FoodAliasCache,
    local: Option<Arc<dyn FoodDataSource>>,
    remotes: Vec<Arc<dyn FoodDataSource>>,
) -> IngredientResolver {
    IngredientResolver::new(
        Arc::new(aliases),
        local,
        remotes,
        ResolverSettings::from(&PipelineConfig::default().concurrency),
    )
}
