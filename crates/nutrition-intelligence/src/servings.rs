// ABOUTME: Serving math: per-100g derivation, best-serving selection and scale guards
// ABOUTME: Scale factors outside guard bounds are rejected as routing signals, not faults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::constants::guards::{SCALE_FACTOR_MAX, SCALE_FACTOR_MIN};
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{NutritionFacts, Serving};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::units::ml_density_estimate;

/// Inclusive bounds a scale factor must fall within
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleGuard {
    /// Smallest accepted factor
    pub min: f64,
    /// Largest accepted factor
    pub max: f64,
}

impl Default for ScaleGuard {
    fn default() -> Self {
        Self {
            min: SCALE_FACTOR_MIN,
            max: SCALE_FACTOR_MAX,
        }
    }
}

impl ScaleGuard {
    /// Create a guard with explicit bounds
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `factor` is finite and within bounds
    #[must_use]
    pub fn contains(&self, factor: f64) -> bool {
        factor.is_finite() && factor >= self.min && factor <= self.max
    }

    /// Accept or reject a factor
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ScaleGuardRejection` when the factor is out of bounds.
    pub fn check(&self, factor: f64) -> Result<f64, PipelineError> {
        if self.contains(factor) {
            Ok(factor)
        } else {
            Err(PipelineError::ScaleGuardRejection {
                factor,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Ratio `target / base`, when both are positive
#[must_use]
pub fn scale_factor(target_kcal: f64, base_kcal: f64) -> Option<f64> {
    (target_kcal > 0.0 && base_kcal > 0.0 && target_kcal.is_finite() && base_kcal.is_finite())
        .then(|| target_kcal / base_kcal)
}

/// Scale `base` to `target_kcal`, enforcing the guard
///
/// # Errors
///
/// Returns `PipelineError::NoMatch` when either kcal value is not positive and
/// `PipelineError::ScaleGuardRejection` when the factor is out of bounds.
pub fn guarded_scale(
    label: &str,
    target_kcal: f64,
    base: &NutritionFacts,
    guard: &ScaleGuard,
) -> Result<(f64, NutritionFacts), PipelineError> {
    let factor = scale_factor(target_kcal, base.calories).ok_or_else(|| PipelineError::no_match(label))?;
    let factor = guard.check(factor)?;
    Ok((factor, base.scaled(factor)))
}

/// Serving chosen for a kcal target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServingChoice<'a> {
    /// Position in the input slice
    pub index: usize,
    /// Chosen serving
    pub serving: &'a Serving,
    /// `target / serving kcal`
    pub factor: f64,
}

/// Pick the serving whose kcal is closest to `target_kcal` on a log scale
///
/// Minimizes `|ln(target / kcal)|`, so 300 and 1200 are equally far from 600.
/// Servings with no energy are skipped; ties keep the earliest serving.
#[must_use]
pub fn best_serving(servings: &[Serving], target_kcal: f64) -> Option<ServingChoice<'_>> {
    let mut best: Option<(f64, ServingChoice<'_>)> = None;
    for (index, serving) in servings.iter().enumerate() {
        let Some(factor) = scale_factor(target_kcal, serving.nutrition.calories) else {
            continue;
        };
        let distance = factor.ln().abs();
        let closer = match &best {
            Some((current, _)) => distance < *current,
            None => true,
        };
        if closer {
            best = Some((
                distance,
                ServingChoice {
                    index,
                    serving,
                    factor,
                },
            ));
        }
    }
    best.map(|(_, choice)| choice)
}

/// Derive nutrition per 100 g from a food's servings
///
/// Waterfall: a gram-measured serving, then an ml-measured serving converted
/// with a name-keyed density, then a serving described as "100g", then the
/// first serving assumed to weigh about 100 g.
#[must_use]
pub fn nutrition_per_100g(food_name: &str, servings: &[Serving]) -> Option<NutritionFacts> {
    if let Some((serving, grams)) = servings
        .iter()
        .find_map(|serving| serving.gram_weight().map(|grams| (serving, grams)))
    {
        return Some(serving.nutrition.scaled(100.0 / grams).clamped());
    }

    if let Some((serving, ml)) = servings
        .iter()
        .find_map(|serving| serving.milliliters().map(|ml| (serving, ml)))
    {
        let grams = ml * ml_density_estimate(food_name);
        if grams > 0.0 {
            debug!(food = %food_name, ml, grams, "converted ml serving to grams");
            return Some(serving.nutrition.scaled(100.0 / grams).clamped());
        }
    }

    if let Some(serving) = servings.iter().find(|serving| is_100g_description(&serving.description)) {
        return Some(serving.nutrition.clamped());
    }

    let first = servings.first()?;
    debug!(food = %food_name, serving = %first.description, "assuming first serving is ~100g");
    Some(first.nutrition.clamped())
}

fn is_100g_description(description: &str) -> bool {
    let compact: String = description
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    compact.contains("100g") || compact.contains("100gram")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_serving_exact_target() {
        let servings = vec![
            Serving::described("small", NutritionFacts::new(200.0, 10.0, 20.0, 5.0)),
            Serving::described("regular", NutritionFacts::new(600.0, 30.0, 60.0, 15.0)),
            Serving::described("large", NutritionFacts::new(900.0, 45.0, 90.0, 22.0)),
        ];
        let choice = best_serving(&servings, 600.0).unwrap();
        assert_eq!(choice.index, 1);
        assert!((choice.factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_log_distance_is_symmetric() {
        let servings = vec![
            Serving::described("half", NutritionFacts::new(300.0, 0.0, 0.0, 0.0)),
            Serving::described("double", NutritionFacts::new(1200.0, 0.0, 0.0, 0.0)),
            Serving::described("empty", NutritionFacts::default()),
        ];
        let choice = best_serving(&servings, 600.0).unwrap();
        assert_eq!(choice.index, 0);
    }

    #[test]
    fn test_per_100g_prefers_gram_servings() {
        let servings = vec![
            Serving::described("1 cup", NutritionFacts::new(300.0, 6.0, 60.0, 1.0)),
            Serving::grams("1 cup cooked", 200.0, NutritionFacts::new(260.0, 5.4, 56.0, 0.6)),
        ];
        let per_100g = nutrition_per_100g("rice", &servings).unwrap();
        assert!((per_100g.calories - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_per_100g_description_fallback() {
        let servings = vec![
            Serving::described("1 bar", NutritionFacts::new(250.0, 20.0, 25.0, 8.0)),
            Serving::described("100 g", NutritionFacts::new(410.0, 33.0, 40.0, 13.0)),
        ];
        let per_100g = nutrition_per_100g("protein bar", &servings).unwrap();
        assert!((per_100g.calories - 410.0).abs() < f64::EPSILON);
        assert!(nutrition_per_100g("nothing", &[]).is_none());
    }

    #[test]
    fn test_guard_rejects_large_factor() {
        let guard = ScaleGuard::default();
        let base = NutritionFacts::new(50.0, 1.0, 10.0, 0.5);
        let error = guarded_scale("celery", 600.0, &base, &guard).unwrap_err();
        assert!(matches!(error, PipelineError::ScaleGuardRejection { .. }));

        let base = NutritionFacts::new(1200.0, 60.0, 100.0, 50.0);
        let (factor, scaled) = guarded_scale("lasagna", 600.0, &base, &guard).unwrap();
        assert!((factor - 0.5).abs() < 1e-12);
        assert!((scaled.calories - 600.0).abs() < 1e-9);
    }
}
