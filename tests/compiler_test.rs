// ABOUTME: Integration tests for the meal strategy chain and plan compilation
// ABOUTME: Covers match-ratio confidence, recalibration, scale guards, fallbacks and progress
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::sync::Arc;

use common::{
    alias_match, food_per_serving, ingredient_meal, legacy_meal, resolver, single_day_plan,
    MockFoodSource, MockRecipeSource,
};
use nutrition_compiler::compiler::NutritionCompiler;
use nutrition_compiler::config::{ConcurrencyConfig, GuardConfig};
use nutrition_core::models::{
    ConfidenceLevel, MatchSource, NutritionFacts, NutritionStrategy, RecipeRecord, Unit,
};
use nutrition_sources::{FoodAliasCache, FoodDataSource, RecipeSource};
use tokio::sync::mpsc;

fn compiler_over(
    aliases: FoodAliasCache,
    remotes: Vec<Arc<dyn FoodDataSource>>,
    recipes: Option<Arc<dyn RecipeSource>>,
) -> NutritionCompiler {
    NutritionCompiler::new(
        Arc::new(resolver(aliases, None, remotes)),
        recipes,
        GuardConfig::default(),
        &ConcurrencyConfig::default(),
    )
}

fn aliases_at(kcal_per_100g: f64, names: &[&str]) -> FoodAliasCache {
    FoodAliasCache::from_entries(
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, alias_match(&i.to_string(), name, kcal_per_100g))),
    )
}

const SEVEN_LINES: [(&str, f64); 7] = [
    ("lentils", 100.0),
    ("spinach", 100.0),
    ("quinoa", 100.0),
    ("tofu", 100.0),
    ("kale", 100.0),
    ("sumac", 100.0),
    ("saffron", 100.0),
];

#[tokio::test]
async fn test_five_of_seven_matched_is_verified() {
    common::init_test_logging();
    let compiler = compiler_over(
        aliases_at(100.0, &["lentils", "spinach", "quinoa", "tofu", "kale"]),
        Vec::new(),
        None,
    );

    let meal = compiler
        .compile_meal(&ingredient_meal("Grain Bowl", 500.0, &SEVEN_LINES))
        .await;

    assert_eq!(meal.strategy, NutritionStrategy::IngredientLevel);
    assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
    assert!((meal.nutrition.calories - 500.0).abs() < 1e-9);
    assert_eq!(meal.ingredients.len(), 7);
    assert_eq!(
        meal.ingredients
            .iter()
            .filter(|ingredient| ingredient.matched_food.is_some())
            .count(),
        5
    );
}

#[tokio::test]
async fn test_four_of_seven_matched_is_estimated() {
    common::init_test_logging();
    let compiler = compiler_over(
        aliases_at(100.0, &["lentils", "spinach", "quinoa", "tofu"]),
        Vec::new(),
        None,
    );

    let meal = compiler
        .compile_meal(&ingredient_meal("Grain Bowl", 400.0, &SEVEN_LINES))
        .await;

    assert_eq!(meal.strategy, NutritionStrategy::IngredientLevel);
    assert_eq!(meal.confidence_level, ConfidenceLevel::AiEstimated);
}

#[tokio::test]
async fn test_recalibration_lands_on_target() {
    common::init_test_logging();
    let compiler = compiler_over(aliases_at(300.0, &["lentils", "quinoa"]), Vec::new(), None);

    let meal = compiler
        .compile_meal(&ingredient_meal(
            "Lentil Quinoa Bowl",
            1000.0,
            &[("lentils", 100.0), ("quinoa", 100.0)],
        ))
        .await;

    assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
    assert!((meal.nutrition.calories - 1000.0).abs() < 1.0);
    let factor = meal.scale_factor.unwrap();
    assert!((factor - 1.667).abs() < 1e-9);
    assert!((meal.ingredients[0].quantity - 166.67).abs() < 1e-9);
    assert_eq!(meal.ingredients[0].unit, Unit::Grams);
}

#[tokio::test]
async fn test_recalibration_outside_bounds_downgrades() {
    common::init_test_logging();
    let compiler = compiler_over(aliases_at(300.0, &["lentils", "quinoa"]), Vec::new(), None);

    let meal = compiler
        .compile_meal(&ingredient_meal(
            "Lentil Quinoa Bowl",
            2000.0,
            &[("lentils", 100.0), ("quinoa", 100.0)],
        ))
        .await;

    assert_eq!(meal.strategy, NutritionStrategy::IngredientLevel);
    assert_eq!(meal.confidence_level, ConfidenceLevel::AiEstimated);
    assert!(meal.scale_factor.is_none());
    assert!((meal.nutrition.calories - 600.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_food_match_half_serving_is_verified() {
    common::init_test_logging();
    let source = Arc::new(
        MockFoodSource::new(MatchSource::FatSecret).with_food(food_per_serving("f1", "Lasagna", 1200.0)),
    );
    let compiler = compiler_over(
        FoodAliasCache::new(),
        vec![Arc::clone(&source) as Arc<dyn FoodDataSource>],
        None,
    );

    let meal = compiler.compile_meal(&legacy_meal("Lasagna", 600.0)).await;

    assert_eq!(meal.strategy, NutritionStrategy::FoodMatch);
    assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
    assert_eq!(meal.scale_factor, Some(0.5));
    assert!((meal.nutrition.calories - 600.0).abs() < 1e-9);
    assert_eq!(meal.ingredients.len(), 1);
    assert_eq!(meal.ingredients[0].unit, Unit::Other("serving".to_owned()));
    assert!(source.search_calls() >= 1);
}

#[tokio::test]
async fn test_food_match_outside_scale_guard_falls_back_to_estimate() {
    common::init_test_logging();
    let source = Arc::new(
        MockFoodSource::new(MatchSource::FatSecret).with_food(food_per_serving("f1", "Lasagna", 50.0)),
    );
    let compiler = compiler_over(FoodAliasCache::new(), vec![source], None);

    let meal = compiler.compile_meal(&legacy_meal("Lasagna", 600.0)).await;

    assert_eq!(meal.strategy, NutritionStrategy::AiEstimate);
    assert_eq!(meal.confidence_level, ConfidenceLevel::AiEstimated);
    assert!((meal.nutrition.calories - 600.0).abs() < 1e-9);
    assert!(meal.scale_factor.is_none());
}

#[tokio::test]
async fn test_recipe_match_scales_portion() {
    common::init_test_logging();
    let recipes = Arc::new(MockRecipeSource::new(vec![RecipeRecord {
        id: "r1".to_owned(),
        name: "Chicken Curry".to_owned(),
        servings: 4.0,
        nutrition_per_serving: NutritionFacts::new(400.0, 30.0, 40.0, 12.0),
        ingredients: vec!["2 cups rice".to_owned(), "500g chicken".to_owned()],
        instructions: vec!["Simmer everything.".to_owned()],
    }]));
    let compiler = compiler_over(
        FoodAliasCache::new(),
        Vec::new(),
        Some(Arc::clone(&recipes) as Arc<dyn RecipeSource>),
    );

    let meal = compiler.compile_meal(&legacy_meal("Chicken Curry", 600.0)).await;

    assert_eq!(meal.strategy, NutritionStrategy::RecipeMatch);
    assert_eq!(meal.confidence_level, ConfidenceLevel::Verified);
    assert_eq!(meal.scale_factor, Some(1.5));
    assert!((meal.nutrition.calories - 600.0).abs() < 1e-9);
    assert_eq!(meal.instructions, ["Simmer everything."]);
    assert_eq!(meal.ingredients.len(), 2);
    assert_eq!(meal.ingredients[1].name, "chicken");
    assert!((meal.ingredients[1].quantity - 187.5).abs() < 1e-9);
    assert_eq!(recipes.calls(), 2);
}

#[tokio::test]
async fn test_recipes_are_not_consulted_for_ingredient_drafts() {
    common::init_test_logging();
    let recipes = Arc::new(MockRecipeSource::new(Vec::new()));
    let compiler = compiler_over(
        FoodAliasCache::new(),
        Vec::new(),
        Some(Arc::clone(&recipes) as Arc<dyn RecipeSource>),
    );

    let meal = compiler
        .compile_meal(&ingredient_meal("Odd Bowl", 500.0, &[("sumac", 10.0)]))
        .await;

    assert_eq!(meal.strategy, NutritionStrategy::AiEstimate);
    assert_eq!(recipes.calls(), 0);
}

#[tokio::test]
async fn test_failing_sources_never_fail_the_compile() {
    common::init_test_logging();
    let source = Arc::new(MockFoodSource::new(MatchSource::Usda).failing());
    let compiler = compiler_over(
        FoodAliasCache::new(),
        vec![Arc::clone(&source) as Arc<dyn FoodDataSource>],
        None,
    );
    let draft = single_day_plan(vec![
        ingredient_meal("Chicken Rice", 600.0, &[("chicken breast", 150.0), ("rice", 200.0)]),
        legacy_meal("Pad Thai", 700.0),
    ]);

    let plan = compiler.compile(&draft, None).await.unwrap();

    assert_eq!(plan.total_meals, 2);
    assert_eq!(plan.verified_meals, 0);
    assert!(plan.days[0]
        .meals
        .iter()
        .all(|meal| meal.confidence_level == ConfidenceLevel::AiEstimated));
    assert!(source.search_calls() > 0);
}

#[tokio::test]
async fn test_compile_reports_progress_and_keeps_meal_order() {
    common::init_test_logging();
    let compiler = compiler_over(FoodAliasCache::new(), Vec::new(), None);
    let meals = (0..12)
        .map(|i| legacy_meal(&format!("Meal {i}"), 400.0 + f64::from(i)))
        .collect();
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let plan = compiler
        .compile(&single_day_plan(meals), Some(sender))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(progress) = receiver.try_recv() {
        assert_eq!(progress.total, 12);
        seen.push(progress.completed);
    }
    assert_eq!(seen, [5, 10, 12]);

    let names: Vec<_> = plan.days[0].meals.iter().map(|meal| meal.name.clone()).collect();
    let expected: Vec<_> = (0..12).map(|i| format!("Meal {i}")).collect();
    assert_eq!(names, expected);
    assert!((plan.days[0].totals.calories - 4866.0).abs() < 1e-9);
}
