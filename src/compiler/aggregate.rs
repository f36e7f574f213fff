// ABOUTME: Day totals, target variance and plan-wide averages for compiled meals
// ABOUTME: Totals are rounded like meals; variance percent is zero when the target is zero
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::models::{
    round1, CompiledDay, CompiledMeal, CompiledPlan, DailyVariance, DraftDay, NutritionFacts,
};

/// Sum compiled meals into a day with variance against its target
#[must_use]
pub fn summarize_day(day: &DraftDay, meals: Vec<CompiledMeal>) -> CompiledDay {
    let totals: NutritionFacts = meals.iter().map(|meal| meal.nutrition).sum();
    let totals = totals.rounded();
    let target = day.target().clamped().rounded();
    CompiledDay {
        day: day.day,
        date: day.date.clone(),
        variance: variance(&totals, &target),
        meals,
        totals,
        target,
    }
}

/// Actual minus target, with the kcal difference as a percentage of target
#[must_use]
pub fn variance(totals: &NutritionFacts, target: &NutritionFacts) -> DailyVariance {
    let diff = totals.minus(target);
    let calories_percent = if target.calories > 0.0 {
        round1(diff.calories / target.calories * 100.0)
    } else {
        0.0
    };
    DailyVariance {
        calories: diff.calories.round(),
        calories_percent,
        protein_g: round1(diff.protein_g),
        carbs_g: round1(diff.carbs_g),
        fat_g: round1(diff.fat_g),
    }
}

/// Assemble the plan with averages of daily totals and the verified count
#[must_use]
pub fn summarize_plan(title: Option<String>, days: Vec<CompiledDay>) -> CompiledPlan {
    let total_meals = days.iter().map(|day| day.meals.len()).sum();
    let verified_meals = days
        .iter()
        .flat_map(|day| &day.meals)
        .filter(|meal| meal.is_verified())
        .count();
    let weekly_averages = if days.is_empty() {
        NutritionFacts::default()
    } else {
        let sum: NutritionFacts = days.iter().map(|day| day.totals).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = days.len() as f64;
        sum.scaled(1.0 / count).rounded()
    };
    CompiledPlan {
        title,
        days,
        weekly_averages,
        verified_meals,
        total_meals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variance_against_zero_target() {
        let variance = variance(&NutritionFacts::new(500.0, 30.0, 50.0, 20.0), &NutritionFacts::default());
        assert!((variance.calories - 500.0).abs() < f64::EPSILON);
        assert!(variance.calories_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn test_variance_percent() {
        let variance = variance(
            &NutritionFacts::new(1800.0, 120.0, 200.0, 60.0),
            &NutritionFacts::new(2000.0, 150.0, 200.0, 70.0),
        );
        assert!((variance.calories + 200.0).abs() < f64::EPSILON);
        assert!((variance.calories_percent + 10.0).abs() < f64::EPSILON);
        assert!((variance.protein_g + 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_plan_has_zero_averages() {
        let plan = summarize_plan(None, Vec::new());
        assert_eq!(plan.total_meals, 0);
        assert_eq!(plan.weekly_averages, NutritionFacts::default());
    }
}
