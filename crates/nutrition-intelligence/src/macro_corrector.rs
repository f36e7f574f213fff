// ABOUTME: Deterministic draft macro correction by rescaling ingredient classes toward targets
// ABOUTME: Includes the keto pass that swaps high-carb staples for low-carb alternatives
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Draft Macro Corrector
//!
//! Each draft ingredient is classified by its dominant macro (protein, carb, fat
//! or vegetable) through a keyword-indexed nutrient table. For every non-vegetable
//! class whose macro estimate deviates from the meal target by more than the
//! tolerance, that class's ingredient quantities are multiplied by
//! `target / estimate`, clamped to the correction bounds and rounded to one
//! decimal. Vegetables and unrecognized ingredients are never touched.
//!
//! Keto plans get a second pass that swaps known high-carb staples for
//! low-carb replacements and recomputes the meal estimate.

use nutrition_core::constants::guards::{CORRECTION_MAX, CORRECTION_MIN, CORRECTION_TOLERANCE};
use nutrition_core::models::{
    round1, DietaryStyle, DraftIngredient, DraftMeal, MealPlanDraft, NutritionFacts, Quantity,
    Unit,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::text::contains_phrase;
use crate::units::{estimate_grams, lookup_density, DEFAULT_SLICE_GRAMS};

/// Dominant macronutrient of an ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroClass {
    /// Protein-dominant (meat, fish, eggs, tofu)
    Protein,
    /// Carbohydrate-dominant (grains, starches, fruit)
    Carb,
    /// Fat-dominant (oils, butter, nuts, cheese)
    Fat,
    /// Vegetables; exempt from rescaling
    Vegetable,
}

impl MacroClass {
    /// Grams of this class's dominant macro in `facts`; zero for vegetables
    #[must_use]
    pub const fn macro_grams(self, facts: &NutritionFacts) -> f64 {
        match self {
            Self::Protein => facts.protein_g,
            Self::Carb => facts.carbs_g,
            Self::Fat => facts.fat_g,
            Self::Vegetable => 0.0,
        }
    }

    const RESCALABLE: [Self; 3] = [Self::Protein, Self::Carb, Self::Fat];
}

/// Nutrient profile for a family of ingredients
#[derive(Debug, Clone, Copy)]
pub struct MacroProfile {
    /// Keywords matched as whole words against ingredient names
    pub keywords: &'static [&'static str],
    /// Dominant macro class
    pub class: MacroClass,
    /// Approximate nutrition per 100 g
    pub per_100g: NutritionFacts,
}

const fn profile(
    keywords: &'static [&'static str],
    class: MacroClass,
    per_100g: (f64, f64, f64, f64),
) -> MacroProfile {
    MacroProfile {
        keywords,
        class,
        per_100g: NutritionFacts::new(per_100g.0, per_100g.1, per_100g.2, per_100g.3),
    }
}

/// Keyword-indexed nutrient table: (kcal, protein, carbs, fat) per 100 g
static MACRO_PROFILES: &[MacroProfile] = &[
    // Protein
    profile(&["chicken", "chicken breast", "turkey"], MacroClass::Protein, (165.0, 31.0, 0.0, 3.6)),
    profile(&["beef", "ground beef", "steak", "sirloin"], MacroClass::Protein, (250.0, 26.0, 0.0, 17.0)),
    profile(&["pork", "pork loin", "ham"], MacroClass::Protein, (242.0, 27.0, 0.0, 14.0)),
    profile(&["salmon", "trout"], MacroClass::Protein, (208.0, 20.0, 0.0, 13.0)),
    profile(&["tuna", "cod", "tilapia", "fish", "white fish"], MacroClass::Protein, (116.0, 24.0, 0.0, 1.5)),
    profile(&["shrimp", "prawns", "scallops"], MacroClass::Protein, (99.0, 24.0, 0.2, 0.3)),
    profile(&["egg", "eggs"], MacroClass::Protein, (143.0, 12.6, 0.7, 9.5)),
    profile(&["egg white", "egg whites"], MacroClass::Protein, (52.0, 11.0, 0.7, 0.2)),
    profile(&["tofu"], MacroClass::Protein, (76.0, 8.0, 1.9, 4.8)),
    profile(&["tempeh", "seitan"], MacroClass::Protein, (192.0, 20.0, 7.6, 11.0)),
    profile(&["greek yogurt", "yogurt"], MacroClass::Protein, (59.0, 10.0, 3.6, 0.4)),
    profile(&["cottage cheese"], MacroClass::Protein, (98.0, 11.0, 3.4, 4.3)),
    profile(&["whey", "protein powder", "whey protein"], MacroClass::Protein, (400.0, 80.0, 8.0, 6.0)),
    // Carb
    profile(&["rice", "white rice", "brown rice"], MacroClass::Carb, (130.0, 2.7, 28.0, 0.3)),
    profile(&["pasta", "spaghetti", "penne", "noodles"], MacroClass::Carb, (158.0, 5.8, 31.0, 0.9)),
    profile(&["potato", "potatoes"], MacroClass::Carb, (77.0, 2.0, 17.0, 0.1)),
    profile(&["sweet potato", "sweet potatoes"], MacroClass::Carb, (86.0, 1.6, 20.0, 0.1)),
    profile(&["bread", "toast", "bagel"], MacroClass::Carb, (265.0, 9.0, 49.0, 3.2)),
    profile(&["tortilla", "wrap"], MacroClass::Carb, (310.0, 8.0, 52.0, 8.0)),
    profile(&["low-carb tortilla", "low carb tortilla"], MacroClass::Carb, (200.0, 12.0, 36.0, 6.0)),
    profile(&["oats", "oatmeal", "rolled oats"], MacroClass::Carb, (389.0, 17.0, 66.0, 7.0)),
    profile(&["quinoa", "couscous", "bulgur"], MacroClass::Carb, (120.0, 4.4, 21.0, 1.9)),
    profile(&["corn", "sweet corn"], MacroClass::Carb, (86.0, 3.2, 19.0, 1.2)),
    profile(&["banana", "apple", "orange", "berries", "blueberries"], MacroClass::Carb, (70.0, 0.8, 18.0, 0.3)),
    profile(&["beans", "black beans", "chickpeas", "lentils"], MacroClass::Carb, (125.0, 8.5, 21.0, 0.5)),
    profile(&["honey", "maple syrup", "sugar"], MacroClass::Carb, (304.0, 0.3, 82.0, 0.0)),
    // Fat
    profile(&["oil", "olive oil", "coconut oil", "avocado oil"], MacroClass::Fat, (884.0, 0.0, 0.0, 100.0)),
    profile(&["butter", "ghee"], MacroClass::Fat, (717.0, 0.9, 0.1, 81.0)),
    profile(&["avocado"], MacroClass::Fat, (160.0, 2.0, 8.5, 14.7)),
    profile(&["almonds", "walnuts", "nuts", "cashews", "pecans"], MacroClass::Fat, (600.0, 18.0, 20.0, 52.0)),
    profile(&["peanut butter", "almond butter"], MacroClass::Fat, (588.0, 25.0, 20.0, 50.0)),
    profile(&["cheese", "cheddar", "mozzarella", "feta"], MacroClass::Fat, (380.0, 24.0, 2.0, 30.0)),
    profile(&["parmesan"], MacroClass::Fat, (431.0, 38.0, 4.0, 29.0)),
    profile(&["cream", "heavy cream", "sour cream"], MacroClass::Fat, (340.0, 2.8, 2.8, 36.0)),
    profile(&["chia seeds", "chia", "flax seeds"], MacroClass::Fat, (486.0, 17.0, 42.0, 31.0)),
    // Vegetable
    profile(&["broccoli", "kale", "green beans", "asparagus"], MacroClass::Vegetable, (34.0, 2.8, 7.0, 0.4)),
    profile(&["spinach", "lettuce", "lettuce wrap", "arugula", "greens"], MacroClass::Vegetable, (20.0, 2.0, 3.5, 0.3)),
    profile(&["cauliflower", "cauliflower rice"], MacroClass::Vegetable, (25.0, 1.9, 5.0, 0.3)),
    profile(&["zucchini", "zucchini noodles", "cucumber", "celery"], MacroClass::Vegetable, (17.0, 1.2, 3.1, 0.3)),
    profile(&["tomato", "tomatoes", "bell pepper", "pepper", "peppers"], MacroClass::Vegetable, (22.0, 1.0, 4.8, 0.2)),
    profile(&["onion", "carrot", "carrots", "garlic", "mushrooms", "mushroom"], MacroClass::Vegetable, (38.0, 1.5, 8.0, 0.2)),
    profile(&["broth", "stock", "chicken broth", "beef broth", "vegetable broth"], MacroClass::Vegetable, (5.0, 0.5, 0.3, 0.2)),
];

/// Classify an ingredient by the longest matching keyword
#[must_use]
pub fn classify(ingredient_name: &str) -> Option<&'static MacroProfile> {
    MACRO_PROFILES
        .iter()
        .flat_map(|profile| profile.keywords.iter().map(move |keyword| (*keyword, profile)))
        .filter(|(keyword, _)| contains_phrase(ingredient_name, keyword))
        .max_by_key(|(keyword, _)| keyword.len())
        .map(|(_, profile)| profile)
}

/// Estimated nutrition of one draft ingredient from the nutrient table
#[must_use]
pub fn ingredient_estimate(ingredient: &DraftIngredient) -> Option<NutritionFacts> {
    let profile = classify(&ingredient.name)?;
    let grams = estimate_grams(&ingredient.name, &ingredient.quantity);
    Some(profile.per_100g.scaled(grams / 100.0))
}

/// Tolerance and clamp bounds for draft correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectionBounds {
    /// Relative deviation that triggers correction
    pub tolerance: f64,
    /// Lower clamp for the factor
    pub min_factor: f64,
    /// Upper clamp for the factor
    pub max_factor: f64,
}

impl Default for CorrectionBounds {
    fn default() -> Self {
        Self {
            tolerance: CORRECTION_TOLERANCE,
            min_factor: CORRECTION_MIN,
            max_factor: CORRECTION_MAX,
        }
    }
}

/// One macro class rescaled in one meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAdjustment {
    /// Rescaled class
    pub class: MacroClass,
    /// Estimated grams of the class macro before correction
    pub estimated_g: f64,
    /// Target grams of the class macro
    pub target_g: f64,
    /// Applied factor after clamping
    pub factor: f64,
    /// Ingredients whose quantities changed
    pub ingredients: Vec<String>,
}

/// One keto substitution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientSwap {
    /// Original ingredient name
    pub original: String,
    /// Replacement ingredient name
    pub replacement: String,
    /// Original quantity
    pub original_quantity: Quantity,
    /// Replacement quantity
    pub replacement_quantity: Quantity,
}

/// Everything the corrector changed in one meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCorrection {
    /// Day number, when corrected as part of a plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    /// Meal name
    pub meal: String,
    /// Class rescaling steps
    pub adjustments: Vec<ClassAdjustment>,
    /// Keto substitutions
    pub swaps: Vec<IngredientSwap>,
    /// Estimated kcal before correction
    pub calories_before: f64,
    /// Estimated kcal after correction
    pub calories_after: f64,
}

impl MealCorrection {
    fn new(day: Option<u32>, meal: &DraftMeal) -> Self {
        Self {
            day,
            meal: meal.name.clone(),
            adjustments: Vec::new(),
            swaps: Vec::new(),
            calories_before: meal.estimated_nutrition.calories,
            calories_after: meal.estimated_nutrition.calories,
        }
    }

    /// Nothing was changed
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.adjustments.is_empty() && self.swaps.is_empty()
    }
}

/// Corrections applied across a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionReport {
    /// Meals that changed
    pub meals: Vec<MealCorrection>,
}

impl CorrectionReport {
    /// Total class adjustments
    #[must_use]
    pub fn adjustment_count(&self) -> usize {
        self.meals.iter().map(|meal| meal.adjustments.len()).sum()
    }

    /// Total keto swaps
    #[must_use]
    pub fn swap_count(&self) -> usize {
        self.meals.iter().map(|meal| meal.swaps.len()).sum()
    }
}

/// Keto replacement rule
struct KetoSwap {
    patterns: &'static [&'static str],
    replacement: &'static str,
    /// Names containing any of these are already keto-friendly
    skip_if: &'static [&'static str],
    /// Replacement is counted in pieces
    piece_based: bool,
    /// Multiplier applied to the original amount when the unit is kept
    quantity_ratio: f64,
}

static KETO_SWAPS: &[KetoSwap] = &[
    KetoSwap {
        patterns: &["rice"],
        replacement: "cauliflower rice",
        skip_if: &["cauliflower"],
        piece_based: false,
        quantity_ratio: 1.0,
    },
    KetoSwap {
        patterns: &["pasta", "spaghetti", "penne", "noodles"],
        replacement: "zucchini noodles",
        skip_if: &["zucchini", "shirataki"],
        piece_based: false,
        quantity_ratio: 1.0,
    },
    KetoSwap {
        patterns: &["potato", "potatoes"],
        replacement: "cauliflower",
        skip_if: &["cauliflower"],
        piece_based: false,
        quantity_ratio: 1.0,
    },
    KetoSwap {
        patterns: &["bread", "toast", "bagel"],
        replacement: "lettuce wrap",
        skip_if: &["lettuce", "keto", "cloud"],
        piece_based: true,
        quantity_ratio: 1.0,
    },
    KetoSwap {
        patterns: &["tortilla", "wrap"],
        replacement: "low-carb tortilla",
        skip_if: &["low-carb", "low carb", "lettuce", "keto"],
        piece_based: true,
        quantity_ratio: 1.0,
    },
    KetoSwap {
        patterns: &["oats", "oatmeal"],
        replacement: "chia seeds",
        skip_if: &["chia"],
        piece_based: false,
        quantity_ratio: 0.5,
    },
    KetoSwap {
        patterns: &["corn"],
        replacement: "zucchini",
        skip_if: &["zucchini"],
        piece_based: false,
        quantity_ratio: 1.0,
    },
];

impl KetoSwap {
    fn matches(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        if self.skip_if.iter().any(|marker| lowered.contains(marker)) {
            return false;
        }
        self.patterns.iter().any(|pattern| contains_phrase(name, pattern))
    }

    fn replacement_quantity(&self, original: &DraftIngredient) -> Quantity {
        let quantity = &original.quantity;
        if !self.piece_based {
            return Quantity::new(
                round1(quantity.value * self.quantity_ratio),
                quantity.unit.clone(),
            );
        }
        if quantity.unit.is_count() && quantity.unit != Unit::Pinch {
            return Quantity::new(quantity.value, Unit::Pieces);
        }
        let piece_grams = lookup_density(&original.name)
            .and_then(|density| density.grams_per_piece)
            .unwrap_or(DEFAULT_SLICE_GRAMS);
        let grams = estimate_grams(&original.name, quantity);
        Quantity::new((grams / piece_grams).round().max(1.0), Unit::Pieces)
    }
}

/// Deterministic draft macro corrector
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroCorrector {
    bounds: CorrectionBounds,
}

impl MacroCorrector {
    /// Create a corrector with explicit bounds
    #[must_use]
    pub const fn new(bounds: CorrectionBounds) -> Self {
        Self { bounds }
    }

    /// Bounds in use
    #[must_use]
    pub const fn bounds(&self) -> &CorrectionBounds {
        &self.bounds
    }

    /// Correct every meal of a plan, running the keto pass for keto plans
    ///
    /// Returns the corrected copy and a report listing only meals that changed.
    #[must_use]
    pub fn correct_plan(&self, draft: &MealPlanDraft) -> (MealPlanDraft, CorrectionReport) {
        let keto = draft.preferences.style == DietaryStyle::Keto;
        let mut corrected = draft.clone();
        let mut report = CorrectionReport::default();

        for day in &mut corrected.days {
            for meal in &mut day.meals {
                let (rescaled, mut correction) = self.correct_meal(meal);
                correction.day = Some(day.day);
                *meal = rescaled;
                if keto {
                    let (swapped, swaps) = apply_keto_swaps(meal);
                    *meal = swapped;
                    correction.swaps = swaps;
                    correction.calories_after = meal.estimated_nutrition.calories;
                }
                if !correction.is_noop() {
                    report.meals.push(correction);
                }
            }
        }

        info!(
            adjustments = report.adjustment_count(),
            swaps = report.swap_count(),
            keto,
            "draft macro correction complete"
        );
        (corrected, report)
    }

    /// Rescale macro classes of one meal toward its target
    #[must_use]
    pub fn correct_meal(&self, meal: &DraftMeal) -> (DraftMeal, MealCorrection) {
        let mut correction = MealCorrection::new(None, meal);
        if meal.is_legacy() {
            return (meal.clone(), correction);
        }

        let classified: Vec<Option<(&MacroProfile, NutritionFacts)>> = meal
            .draft_ingredients
            .iter()
            .map(|ingredient| {
                let profile = classify(&ingredient.name)?;
                let grams = estimate_grams(&ingredient.name, &ingredient.quantity);
                Some((profile, profile.per_100g.scaled(grams / 100.0)))
            })
            .collect();
        let estimate: NutritionFacts = classified.iter().flatten().map(|(_, facts)| *facts).sum();
        let target = meal.target();

        let mut factors: Vec<Option<f64>> = vec![None; meal.draft_ingredients.len()];
        for class in MacroClass::RESCALABLE {
            let Some(adjustment) = self.class_adjustment(class, &estimate, &target, meal, &classified)
            else {
                continue;
            };
            for (index, entry) in classified.iter().enumerate() {
                if entry.is_some_and(|(profile, _)| profile.class == class) {
                    factors[index] = Some(adjustment.factor);
                }
            }
            correction.adjustments.push(adjustment);
        }

        if correction.adjustments.is_empty() {
            return (meal.clone(), correction);
        }

        let mut corrected = meal.clone();
        let mut delta = NutritionFacts::default();
        for ((ingredient, factor), entry) in corrected
            .draft_ingredients
            .iter_mut()
            .zip(&factors)
            .zip(&classified)
        {
            let (Some(factor), Some((profile, before))) = (factor, entry) else {
                continue;
            };
            ingredient.quantity =
                Quantity::new(round1(ingredient.quantity.value * factor), ingredient.quantity.unit.clone());
            let grams = estimate_grams(&ingredient.name, &ingredient.quantity);
            let after = profile.per_100g.scaled(grams / 100.0);
            delta += after.minus(before);
        }
        corrected.estimated_nutrition = (meal.estimated_nutrition + delta).clamped();
        correction.calories_after = corrected.estimated_nutrition.calories;

        debug!(
            meal = %meal.name,
            before = correction.calories_before,
            after = correction.calories_after,
            "corrected draft meal"
        );
        (corrected, correction)
    }

    fn class_adjustment(
        &self,
        class: MacroClass,
        estimate: &NutritionFacts,
        target: &NutritionFacts,
        meal: &DraftMeal,
        classified: &[Option<(&MacroProfile, NutritionFacts)>],
    ) -> Option<ClassAdjustment> {
        let estimated_g = class.macro_grams(estimate);
        let target_g = class.macro_grams(target);
        if estimated_g <= 0.0 || target_g <= 0.0 {
            return None;
        }
        let deviation = (estimated_g - target_g).abs() / target_g;
        if deviation <= self.bounds.tolerance {
            return None;
        }

        let ingredients: Vec<String> = meal
            .draft_ingredients
            .iter()
            .zip(classified)
            .filter(|(ingredient, entry)| {
                ingredient.quantity.value > 0.0
                    && entry.is_some_and(|(profile, _)| profile.class == class)
            })
            .map(|(ingredient, _)| ingredient.name.clone())
            .collect();
        if ingredients.is_empty() {
            return None;
        }

        let factor = (target_g / estimated_g).clamp(self.bounds.min_factor, self.bounds.max_factor);
        debug!(
            meal = %meal.name,
            class = ?class,
            estimated_g,
            target_g,
            factor,
            "macro class outside tolerance"
        );
        Some(ClassAdjustment {
            class,
            estimated_g: round1(estimated_g),
            target_g: round1(target_g),
            factor,
            ingredients,
        })
    }
}

/// Swap high-carb staples for keto-friendly alternatives
///
/// Already-swapped ingredients are left alone, so the pass is idempotent.
#[must_use]
pub fn apply_keto_swaps(meal: &DraftMeal) -> (DraftMeal, Vec<IngredientSwap>) {
    let mut swapped = meal.clone();
    let mut swaps = Vec::new();
    let mut delta = NutritionFacts::default();

    for ingredient in &mut swapped.draft_ingredients {
        let Some(rule) = KETO_SWAPS.iter().find(|rule| rule.matches(&ingredient.name)) else {
            continue;
        };
        let replacement = DraftIngredient {
            name: rule.replacement.to_owned(),
            quantity: rule.replacement_quantity(ingredient),
        };
        let before = ingredient_estimate(ingredient).unwrap_or_default();
        let after = ingredient_estimate(&replacement).unwrap_or_default();
        delta += after.minus(&before);

        debug!(
            meal = %meal.name,
            original = %ingredient.name,
            replacement = %replacement.name,
            "keto swap"
        );
        swaps.push(IngredientSwap {
            original: ingredient.name.clone(),
            replacement: replacement.name.clone(),
            original_quantity: ingredient.quantity.clone(),
            replacement_quantity: replacement.quantity.clone(),
        });
        *ingredient = replacement;
    }

    if !swaps.is_empty() {
        swapped.estimated_nutrition = (meal.estimated_nutrition + delta).clamped();
    }
    (swapped, swaps)
}
