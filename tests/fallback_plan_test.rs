// ABOUTME: Tests for the deterministic fallback draft generator
// ABOUTME: Covers calorie fitting, protein rotation, cuisine preference and compliance filtering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use common::ingredient_meal;
use nutrition_compiler::fallback_plan::{FallbackPlanGenerator, DAILY_SLOTS};
use nutrition_core::models::{Allergen, DietaryPreferences, DietaryStyle, MealSlot};

#[test]
fn test_meals_are_fitted_to_slot_shares() {
    common::init_test_logging();
    let draft = FallbackPlanGenerator::new(DietaryPreferences::default()).generate(1, Some(2000.0));

    let day = &draft.days[0];
    let slots: Vec<_> = day.meals.iter().map(|meal| meal.slot).collect();
    assert_eq!(slots, DAILY_SLOTS);

    let calories: Vec<_> = day
        .meals
        .iter()
        .map(|meal| meal.target_nutrition.unwrap().calories)
        .collect();
    assert_eq!(calories, [500.0, 600.0, 700.0, 200.0]);
    assert!(day
        .meals
        .iter()
        .all(|meal| meal.target_nutrition == Some(meal.estimated_nutrition)));
    assert_eq!(draft.title.as_deref(), Some("1-day balanced plan"));
}

#[test]
fn test_protein_rotates_between_days() {
    common::init_test_logging();
    let draft = FallbackPlanGenerator::new(DietaryPreferences::default()).generate(7, None);

    assert_eq!(draft.days.len(), 7);
    for pair in draft.days.windows(2) {
        for (today, tomorrow) in pair[0].meals.iter().zip(&pair[1].meals) {
            assert_eq!(today.slot, tomorrow.slot);
            assert_ne!(
                today.primary_protein, tomorrow.primary_protein,
                "{:?} repeated its protein on day {}",
                today.slot, pair[1].day
            );
        }
    }
}

#[test]
fn test_preferred_cuisine_is_favored() {
    common::init_test_logging();
    let preferences = DietaryPreferences {
        preferred_cuisines: vec!["Mediterranean".to_owned()],
        ..DietaryPreferences::default()
    };
    let draft = FallbackPlanGenerator::new(preferences).generate(7, None);

    let mediterranean = draft
        .days
        .iter()
        .flat_map(|day| &day.meals)
        .filter(|meal| meal.cuisine.as_deref() == Some("mediterranean"))
        .count();
    assert!(mediterranean > 0);
}

#[test]
fn test_vegan_preferences_filter_templates() {
    common::init_test_logging();
    let preferences = DietaryPreferences {
        style: DietaryStyle::Vegan,
        ..DietaryPreferences::default()
    };
    let generator = FallbackPlanGenerator::new(preferences);
    let unfiltered = FallbackPlanGenerator::new(DietaryPreferences::default());

    assert!(generator.candidates().len() < unfiltered.candidates().len());
    let draft = generator.generate(3, Some(1800.0));
    assert!(draft.days.iter().all(|day| day.meals.len() == DAILY_SLOTS.len()));
}

#[test]
fn test_flagged_candidate_kept_when_slot_has_no_alternative() {
    common::init_test_logging();
    let preferences = DietaryPreferences {
        allergens: vec![Allergen::Dairy],
        ..DietaryPreferences::default()
    };
    let mut cheesy = ingredient_meal("Cheese Toastie", 400.0, &[("cheddar cheese", 40.0)]);
    cheesy.slot = MealSlot::Snack;
    let mut cheesy_lunch = ingredient_meal("Cheese Salad", 450.0, &[("feta", 60.0)]);
    cheesy_lunch.slot = MealSlot::Lunch;
    let mut plain_lunch = ingredient_meal("Lentil Salad", 450.0, &[("lentils", 150.0)]);
    plain_lunch.slot = MealSlot::Lunch;

    let generator =
        FallbackPlanGenerator::with_candidates(preferences, vec![cheesy, cheesy_lunch, plain_lunch]);

    let names: Vec<_> = generator
        .candidates()
        .iter()
        .map(|meal| meal.name.as_str())
        .collect();
    assert_eq!(names, ["Lentil Salad", "Cheese Toastie"]);
}
