// ABOUTME: End-to-end pipeline tests over a seeded SQLite food database
// ABOUTME: Covers alias and local resolution, keto correction, compliance audit and fallback drafts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;

use common::{ingredient_meal, legacy_meal, single_day_plan};
use nutrition_compiler::config::PipelineConfig;
use nutrition_compiler::pipeline::{pin_targets, NutritionPipeline, PipelineBuilder};
use nutrition_core::models::{
    Allergen, ConfidenceLevel, DietaryPreferences, DietaryStyle, DraftMeal, MatchSource,
    NutritionFacts, NutritionStrategy,
};
use nutrition_intelligence::ViolationCategory;
use nutrition_sources::{FoodAliasCache, LocalFoodSearch, NewFood};
use tempfile::TempDir;

async fn seed(local: &LocalFoodSearch) {
    let chicken = local
        .insert_food(&NewFood::generic(
            "Chicken breast, roasted",
            NutritionFacts::new(165.0, 31.0, 0.0, 3.6),
        ))
        .await
        .unwrap();
    let rice = local
        .insert_food(&NewFood::generic(
            "Rice, white, cooked",
            NutritionFacts::new(130.0, 2.7, 28.0, 0.3),
        ))
        .await
        .unwrap();
    local
        .insert_food(&NewFood::generic(
            "Olive oil",
            NutritionFacts::new(884.0, 0.0, 0.0, 100.0),
        ))
        .await
        .unwrap();
    local.insert_alias("chicken breast", chicken).await.unwrap();
    local.insert_alias("rice", rice).await.unwrap();
}

/// Drafted numbers agree with the ingredient lines, so correction leaves it alone
fn chicken_rice_bowl() -> DraftMeal {
    let mut meal = ingredient_meal(
        "Chicken Rice Bowl",
        596.0,
        &[("chicken breast", 150.0), ("rice", 200.0), ("olive oil", 10.0)],
    );
    let drafted = NutritionFacts::new(596.0, 51.9, 56.0, 16.0);
    meal.estimated_nutrition = drafted;
    meal.target_nutrition = Some(drafted);
    meal
}

async fn local_pipeline() -> NutritionPipeline {
    let local = LocalFoodSearch::connect("sqlite::memory:").await.unwrap();
    seed(&local).await;
    let aliases = FoodAliasCache::new();
    assert_eq!(aliases.load_from_pool(local.pool()).await.unwrap(), 2);

    PipelineBuilder::new()
        .with_alias_cache(Arc::new(aliases))
        .with_local_source(Arc::new(local))
        .build()
}

#[tokio::test]
async fn test_local_database_verifies_ingredient_meal() {
    common::init_test_logging();
    let pipeline = local_pipeline().await;
    let draft = single_day_plan(vec![chicken_rice_bowl()]);

    let output = pipeline.run(&draft, false, None).await.unwrap();

    assert!(output.corrections.meals.is_empty());
    let meal = &output.plan.days[0].meals[0];
    assert_eq!(meal.strategy, NutritionStrategy::IngredientLevel);
    assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
    assert!((meal.nutrition.calories - 596.0).abs() < 1.0);

    let sources: Vec<_> = meal
        .ingredients
        .iter()
        .map(|ingredient| ingredient.matched_food.as_ref().unwrap().source)
        .collect();
    assert_eq!(sources, [MatchSource::Alias, MatchSource::Alias, MatchSource::Local]);
    assert_eq!(output.plan.verified_meals, 1);
    assert_eq!(output.plan.total_meals, 1);
}

#[tokio::test]
async fn test_from_config_opens_and_loads_local_database() {
    common::init_test_logging();
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("foods.db").display());
    {
        let local = LocalFoodSearch::connect(&url).await.unwrap();
        seed(&local).await;
        local.pool().close().await;
    }

    let mut config = PipelineConfig::default();
    config.sources.local_database_url = Some(url);
    let pipeline = NutritionPipeline::from_config(config).await.unwrap();

    let hits = pipeline.search("rice").await;
    assert_eq!(hits[0].source, MatchSource::Alias);
    assert!(hits.iter().any(|hit| hit.source == MatchSource::Local));

    let health = pipeline.source_health().await;
    assert_eq!(health.len(), 1);
}

#[tokio::test]
async fn test_no_sources_tags_every_meal_estimated() {
    common::init_test_logging();
    let pipeline = NutritionPipeline::from_config(PipelineConfig::default())
        .await
        .unwrap();
    let draft = single_day_plan(vec![chicken_rice_bowl(), legacy_meal("Pho", 550.0)]);

    let output = pipeline.run(&draft, false, None).await.unwrap();

    assert_eq!(output.plan.verified_meals, 0);
    assert_eq!(output.plan.total_meals, 2);
    let day = &output.plan.days[0];
    assert!(day
        .meals
        .iter()
        .all(|meal| meal.strategy == NutritionStrategy::AiEstimate));
    assert!((day.totals.calories - 1146.0).abs() < 1e-9);
    assert!(pipeline.source_health().await.is_empty());
}

#[tokio::test]
async fn test_keto_flag_swaps_high_carb_staples() {
    common::init_test_logging();
    let pipeline = PipelineBuilder::new().build();
    let draft = single_day_plan(vec![chicken_rice_bowl()]);
    assert_eq!(draft.preferences.style, DietaryStyle::Standard);

    let output = pipeline.run(&draft, true, None).await.unwrap();

    assert!(output.corrections.swap_count() >= 1);
    let names: Vec<_> = output.plan.days[0].meals[0]
        .ingredients
        .iter()
        .map(|ingredient| ingredient.name.as_str())
        .collect();
    assert!(names.contains(&"cauliflower rice"));
    assert!(!names.contains(&"rice"));
}

#[tokio::test]
async fn test_compiled_plan_is_audited_for_allergens() {
    common::init_test_logging();
    let pipeline = PipelineBuilder::new().build();
    let mut draft = single_day_plan(vec![ingredient_meal(
        "Cheese Omelette",
        450.0,
        &[("eggs", 120.0), ("cheddar cheese", 40.0)],
    )]);
    draft.preferences = DietaryPreferences {
        style: DietaryStyle::Standard,
        allergens: vec![Allergen::Dairy],
        preferred_cuisines: Vec::new(),
    };

    let output = pipeline.run(&draft, false, None).await.unwrap();

    assert_eq!(output.compliance.scanned_meals, 1);
    assert!(output
        .compliance
        .violations
        .iter()
        .any(|violation| violation.category == ViolationCategory::Allergen(Allergen::Dairy)));
}

#[tokio::test]
async fn test_blank_ingredient_lines_do_not_fail_compile() {
    common::init_test_logging();
    let pipeline = PipelineBuilder::new().build();
    let draft = single_day_plan(vec![ingredient_meal(
        "Chicken Bowl",
        500.0,
        &[("chicken breast", 150.0), ("  ", 10.0), ("", 5.0)],
    )]);

    let output = pipeline.run(&draft, false, None).await.unwrap();

    let meal = &output.plan.days[0].meals[0];
    assert_eq!(meal.ingredients.len(), 1);
    assert_eq!(meal.ingredients[0].name, "chicken breast");
}

#[test]
fn test_pin_targets_keeps_explicit_targets() {
    let mut explicit = legacy_meal("Pho", 550.0);
    explicit.target_nutrition = Some(NutritionFacts::new(500.0, 30.0, 60.0, 15.0));
    let mut implicit = legacy_meal("Ramen", 650.0);
    implicit.target_nutrition = None;

    let pinned = pin_targets(&single_day_plan(vec![explicit, implicit]));

    let targets: Vec<_> = pinned.days[0]
        .meals
        .iter()
        .map(|meal| meal.target_nutrition.unwrap().calories)
        .collect();
    assert_eq!(targets, [500.0, 650.0]);
}

#[test]
fn test_fallback_draft_is_compilable_shape() {
    let pipeline = PipelineBuilder::new().build();
    let draft = pipeline.fallback_draft(DietaryPreferences::default(), 3, Some(2000.0));

    assert_eq!(draft.days.len(), 3);
    assert!(draft.days.iter().all(|day| day.meals.len() == 4));
    assert!(draft
        .days
        .iter()
        .flat_map(|day| &day.meals)
        .all(|meal| !meal.is_legacy() && meal.target_nutrition.is_some()));
}
