// ABOUTME: Compiled meal plan output models handed to persistence after schema validation
// ABOUTME: CompiledMeal, CompiledDay, CompiledPlan with confidence tags and daily variance
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{MatchSource, MealSlot, NutritionFacts, Unit};

/// How much a compiled meal's nutrition can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    /// Backed by food-composition data within guard bounds
    Verified,
    /// Model estimate used verbatim
    AiEstimated,
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verified => f.write_str("verified"),
            Self::AiEstimated => f.write_str("ai_estimated"),
        }
    }
}

/// Strategy that produced a compiled meal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutritionStrategy {
    /// Each drafted ingredient resolved and summed
    IngredientLevel,
    /// Whole recipe matched by meal name and scaled
    RecipeMatch,
    /// Single food matched by meal name and scaled
    FoodMatch,
    /// Upstream estimate used verbatim
    AiEstimate,
}

impl NutritionStrategy {
    /// Stable name used in logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IngredientLevel => "ingredient_level",
            Self::RecipeMatch => "recipe_match",
            Self::FoodMatch => "food_match",
            Self::AiEstimate => "ai_estimate",
        }
    }
}

/// Food a compiled ingredient was matched to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedFood {
    /// Source-specific identifier
    pub id: String,
    /// Food description
    pub description: String,
    /// Source of the match
    pub source: MatchSource,
}

/// Ingredient line of a compiled meal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledIngredient {
    /// Ingredient name
    pub name: String,
    /// Final amount after any rescaling
    pub quantity: f64,
    /// Unit of `quantity`
    pub unit: Unit,
    /// Gram weight used for nutrition, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grams: Option<f64>,
    /// Nutrition contributed by this ingredient
    pub nutrition: NutritionFacts,
    /// Matched food, absent for estimated lines
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_food: Option<MatchedFood>,
}

/// Meal after compilation; immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledMeal {
    /// Meal slot
    pub slot: MealSlot,
    /// Meal name
    pub name: String,
    /// Cuisine label carried from the draft
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    /// Main protein carried from the draft
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_protein: Option<String>,
    /// Compiled nutrition totals
    pub nutrition: NutritionFacts,
    /// Target the meal was compiled against
    pub target_nutrition: NutritionFacts,
    /// Trust level of `nutrition`
    pub confidence_level: ConfidenceLevel,
    /// Strategy that produced the meal
    pub strategy: NutritionStrategy,
    /// Scale or recalibration factor applied, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_factor: Option<f64>,
    /// Ingredient lines
    pub ingredients: Vec<CompiledIngredient>,
    /// Preparation steps
    pub instructions: Vec<String>,
    /// Tags carried from the draft
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CompiledMeal {
    /// Meal nutrition is backed by composition data
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.confidence_level == ConfidenceLevel::Verified
    }
}

/// Difference between actual and target daily totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyVariance {
    /// Actual minus target kcal
    pub calories: f64,
    /// Kcal variance as a percentage of target; zero when the target is zero
    pub calories_percent: f64,
    /// Actual minus target protein in grams
    pub protein_g: f64,
    /// Actual minus target carbohydrates in grams
    pub carbs_g: f64,
    /// Actual minus target fat in grams
    pub fat_g: f64,
}

/// Compiled day with rounded totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledDay {
    /// 1-based day number
    pub day: u32,
    /// Calendar date, if scheduled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Compiled meals in draft order
    pub meals: Vec<CompiledMeal>,
    /// Rounded daily totals
    pub totals: NutritionFacts,
    /// Daily target
    pub target: NutritionFacts,
    /// Totals minus target
    pub variance: DailyVariance,
}

/// Whole compiled plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledPlan {
    /// Plan title carried from the draft
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Compiled days in draft order
    pub days: Vec<CompiledDay>,
    /// Mean of daily totals
    pub weekly_averages: NutritionFacts,
    /// Meals tagged verified
    pub verified_meals: usize,
    /// All meals
    pub total_meals: usize,
}

/// Name used at the downstream boundary
pub type MealPlanCompiled = CompiledPlan;
