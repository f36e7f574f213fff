// ABOUTME: Typed nutrient totals shared by drafts, food records and compiled meals
// ABOUTME: Provides scaling, summation, rounding and validity checks for macro values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Calories and macronutrients for a meal, serving or 100 g baseline
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    /// Energy in kilocalories
    #[serde(default, alias = "kcal")]
    pub calories: f64,
    /// Protein in grams
    #[serde(default, alias = "protein", alias = "proteinG")]
    pub protein_g: f64,
    /// Carbohydrates in grams
    #[serde(default, alias = "carbs", alias = "carbohydrates", alias = "carbsG")]
    pub carbs_g: f64,
    /// Fat in grams
    #[serde(default, alias = "fat", alias = "fatG")]
    pub fat_g: f64,
    /// Dietary fiber in grams
    #[serde(default, alias = "fiber", alias = "fiberG")]
    pub fiber_g: f64,
}

impl NutritionFacts {
    /// Create totals without fiber
    #[must_use]
    pub const fn new(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Self {
        Self {
            calories,
            protein_g,
            carbs_g,
            fat_g,
            fiber_g: 0.0,
        }
    }

    /// Set the fiber amount
    #[must_use]
    pub const fn with_fiber(mut self, fiber_g: f64) -> Self {
        self.fiber_g = fiber_g;
        self
    }

    /// Multiply every value by `factor`
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            calories: self.calories * factor,
            protein_g: self.protein_g * factor,
            carbs_g: self.carbs_g * factor,
            fat_g: self.fat_g * factor,
            fiber_g: self.fiber_g * factor,
        }
    }

    /// Round calories to whole kcal and macros to one decimal
    #[must_use]
    pub fn rounded(&self) -> Self {
        Self {
            calories: self.calories.round(),
            protein_g: round1(self.protein_g),
            carbs_g: round1(self.carbs_g),
            fat_g: round1(self.fat_g),
            fiber_g: round1(self.fiber_g),
        }
    }

    /// Replace negative or non-finite values with zero
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            calories: non_negative(self.calories),
            protein_g: non_negative(self.protein_g),
            carbs_g: non_negative(self.carbs_g),
            fat_g: non_negative(self.fat_g),
            fiber_g: non_negative(self.fiber_g),
        }
    }

    /// All values finite and non-negative
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [
            self.calories,
            self.protein_g,
            self.carbs_g,
            self.fat_g,
            self.fiber_g,
        ]
        .iter()
        .all(|value| value.is_finite() && *value >= 0.0)
    }

    /// No energy and no macros
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calories <= 0.0 && self.protein_g <= 0.0 && self.carbs_g <= 0.0 && self.fat_g <= 0.0
    }

    /// Energy implied by macros using 4/4/9 kcal per gram
    #[must_use]
    pub fn macro_calories(&self) -> f64 {
        self.carbs_g.mul_add(4.0, self.protein_g.mul_add(4.0, self.fat_g * 9.0))
    }

    /// Field-wise difference `self - other`, used for variance reporting
    #[must_use]
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            calories: self.calories - other.calories,
            protein_g: self.protein_g - other.protein_g,
            carbs_g: self.carbs_g - other.carbs_g,
            fat_g: self.fat_g - other.fat_g,
            fiber_g: self.fiber_g - other.fiber_g,
        }
    }
}

impl Add for NutritionFacts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            calories: self.calories + rhs.calories,
            protein_g: self.protein_g + rhs.protein_g,
            carbs_g: self.carbs_g + rhs.carbs_g,
            fat_g: self.fat_g + rhs.fat_g,
            fiber_g: self.fiber_g + rhs.fiber_g,
        }
    }
}

impl AddAssign for NutritionFacts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for NutritionFacts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a Self> for NutritionFacts {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Round to one decimal place
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding_rules() {
        let facts = NutritionFacts::new(612.46, 40.04, 55.56, 20.149).rounded();
        assert!((facts.calories - 612.0).abs() < f64::EPSILON);
        assert!((facts.protein_g - 40.0).abs() < f64::EPSILON);
        assert!((facts.carbs_g - 55.6).abs() < 1e-9);
        assert!((facts.fat_g - 20.1).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_removes_negatives() {
        let facts = NutritionFacts::new(-5.0, f64::NAN, 3.0, 1.0).clamped();
        assert!(facts.is_valid());
        assert!(facts.calories.abs() < f64::EPSILON);
        assert!(facts.protein_g.abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserializes_short_names() {
        let facts: NutritionFacts =
            serde_json::from_str(r#"{"calories": 500, "protein": 30, "carbs": 40, "fat": 20}"#)
                .unwrap();
        assert!((facts.protein_g - 30.0).abs() < f64::EPSILON);
        assert!(facts.fiber_g.abs() < f64::EPSILON);
    }
}
