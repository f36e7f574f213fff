// ABOUTME: Food composition records unified across local and remote sources
// ABOUTME: FoodRecord, Serving, FoodSearchHit, ResolvedMatch and recipe records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NutritionFacts;

/// Where a food match came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Precomputed alias shortcut
    Alias,
    /// Local food database
    Local,
    /// USDA `FoodData` Central (remote source A)
    Usda,
    /// `FatSecret` Platform (remote source B)
    FatSecret,
}

impl MatchSource {
    /// Stable lowercase name used in logs and cache keys
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::Local => "local",
            Self::Usda => "usda",
            Self::FatSecret => "fatsecret",
        }
    }
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric unit of a serving's measured amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricUnit {
    /// Grams
    #[serde(rename = "g")]
    Grams,
    /// Milliliters
    #[serde(rename = "ml")]
    Milliliters,
}

impl MetricUnit {
    /// Parse a source-supplied metric unit string
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Some(Self::Grams),
            "ml" | "milliliter" | "milliliters" => Some(Self::Milliliters),
            _ => None,
        }
    }
}

/// One serving option of a food with its nutrition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Serving {
    /// Human-readable serving description ("1 cup", "100 g")
    pub description: String,
    /// Nutrition for exactly this serving
    pub nutrition: NutritionFacts,
    /// Measured amount of the serving in `metric_unit`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_amount: Option<f64>,
    /// Unit of `metric_amount`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_unit: Option<MetricUnit>,
}

impl Serving {
    /// Serving measured in grams
    #[must_use]
    pub fn grams(description: impl Into<String>, grams: f64, nutrition: NutritionFacts) -> Self {
        Self {
            description: description.into(),
            nutrition,
            metric_amount: Some(grams),
            metric_unit: Some(MetricUnit::Grams),
        }
    }

    /// Serving without metric data
    #[must_use]
    pub fn described(description: impl Into<String>, nutrition: NutritionFacts) -> Self {
        Self {
            description: description.into(),
            nutrition,
            metric_amount: None,
            metric_unit: None,
        }
    }

    /// Measured gram weight, when the serving is metric-weighted
    #[must_use]
    pub fn gram_weight(&self) -> Option<f64> {
        match (self.metric_amount, self.metric_unit) {
            (Some(amount), Some(MetricUnit::Grams)) if amount > 0.0 => Some(amount),
            _ => None,
        }
    }

    /// Measured volume, when the serving is metric-volumed
    #[must_use]
    pub fn milliliters(&self) -> Option<f64> {
        match (self.metric_amount, self.metric_unit) {
            (Some(amount), Some(MetricUnit::Milliliters)) if amount > 0.0 => Some(amount),
            _ => None,
        }
    }
}

/// Full food record with every known serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodRecord {
    /// Source-specific identifier
    pub id: String,
    /// Food name or description
    pub name: String,
    /// Source that produced this record
    pub source: MatchSource,
    /// Source data type ("Foundation", "SR Legacy", "Branded", "Generic")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Brand owner for branded foods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Available servings
    pub servings: Vec<Serving>,
}

/// Ranked search result, before detail lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSearchHit {
    /// Source-specific identifier
    pub id: String,
    /// Food description
    pub description: String,
    /// Source that produced the hit
    pub source: MatchSource,
    /// Source data type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Brand owner for branded foods
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Source relevance score; higher is better
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl FoodSearchHit {
    /// Branded commercial product rather than a generic food
    #[must_use]
    pub fn is_branded(&self) -> bool {
        self.brand.as_deref().is_some_and(|brand| !brand.trim().is_empty())
            || self
                .data_type
                .as_deref()
                .is_some_and(|data_type| data_type.eq_ignore_ascii_case("branded"))
    }
}

/// A resolved ingredient match with a per-100 g nutrition snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMatch {
    /// Source-specific identifier
    pub id: String,
    /// Food description
    pub description: String,
    /// Source that produced the match
    pub source: MatchSource,
    /// Nutrition per 100 g of the food
    pub per_100g: NutritionFacts,
    /// Source data type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Ranked recipe search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeHit {
    /// Source-specific identifier
    pub id: String,
    /// Recipe name
    pub name: String,
    /// Short description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Full recipe with per-serving nutrition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    /// Source-specific identifier
    pub id: String,
    /// Recipe name
    pub name: String,
    /// Number of servings the recipe yields
    pub servings: f64,
    /// Nutrition for one serving
    pub nutrition_per_serving: NutritionFacts,
    /// Ingredient lines as published
    pub ingredients: Vec<String>,
    /// Preparation steps
    pub instructions: Vec<String>,
}
