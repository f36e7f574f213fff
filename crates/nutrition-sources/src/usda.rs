// ABOUTME: USDA FoodData Central adapter implementing FoodDataSource
// ABOUTME: Normalizes per-100g nutrient arrays and food portions into typed servings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! USDA `FoodData` Central adapter
//!
//! Nutrients in `FoodData` Central are reported per 100 g (per 100 ml for some
//! branded beverages). The adapter synthesizes a 100-unit base serving plus
//! one serving per reported portion weight.
//!
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use std::time::Duration;

use async_trait::async_trait;
use nutrition_core::errors::SourceError;
use nutrition_core::models::{
    FoodRecord, FoodSearchHit, MatchSource, MetricUnit, NutritionFacts, Serving,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::cache::TtlCache;
use crate::http_client::decode_json;
use crate::source::{CacheConfig, FoodDataSource, ResilienceConfig, ResilientCaller, SourceHealth};

const SOURCE_NAME: &str = "usda";
/// Largest page the search endpoint accepts
const MAX_PAGE_SIZE: usize = 200;

/// Nutrient ids used by `FoodData` Central
mod nutrient_ids {
    pub const ENERGY_KCAL: u32 = 1008;
    pub const ENERGY_ATWATER_GENERAL: u32 = 2047;
    pub const ENERGY_ATWATER_SPECIFIC: u32 = 2048;
    pub const PROTEIN: u32 = 1003;
    pub const FAT: u32 = 1004;
    pub const CARBOHYDRATE: u32 = 1005;
    pub const FIBER: u32 = 1079;
}

/// USDA adapter configuration
#[derive(Debug, Clone)]
pub struct UsdaConfig {
    /// API key from <https://fdc.nal.usda.gov/api-key-signup.html>
    pub api_key: String,
    /// Base URL, without trailing slash
    pub base_url: String,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.nal.usda.gov/fdc/v1".to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: u64,
    description: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    brand_owner: Option<String>,
    #[serde(default)]
    brand_name: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodDetail {
    fdc_id: u64,
    description: String,
    #[serde(default)]
    data_type: Option<String>,
    #[serde(default)]
    brand_owner: Option<String>,
    #[serde(default)]
    food_nutrients: Vec<DetailNutrient>,
    #[serde(default)]
    food_portions: Vec<FoodPortion>,
    #[serde(default)]
    serving_size: Option<f64>,
    #[serde(default)]
    serving_size_unit: Option<String>,
    #[serde(default)]
    household_serving_full_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailNutrient {
    #[serde(default)]
    nutrient: Option<NutrientInfo>,
    #[serde(default)]
    amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NutrientInfo {
    id: u32,
    #[serde(default)]
    unit_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoodPortion {
    #[serde(default)]
    gram_weight: Option<f64>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    portion_description: Option<String>,
    #[serde(default)]
    measure_unit: Option<MeasureUnit>,
}

#[derive(Debug, Deserialize)]
struct MeasureUnit {
    #[serde(default)]
    name: Option<String>,
}

impl FoodPortion {
    fn description(&self) -> Option<String> {
        if let Some(text) = self
            .portion_description
            .as_deref()
            .filter(|text| !text.trim().is_empty() && !text.contains("Quantity not specified"))
        {
            return Some(text.trim().to_owned());
        }
        let unit = self
            .measure_unit
            .as_ref()
            .and_then(|unit| unit.name.as_deref())
            .filter(|name| *name != "undetermined");
        let parts: Vec<String> = [
            self.amount.map(|amount| format!("{amount}")),
            unit.map(str::to_owned),
            self.modifier.clone(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// Per-100-unit nutrition from a nutrient array
fn base_nutrition(nutrients: &[DetailNutrient]) -> NutritionFacts {
    let mut facts = NutritionFacts::default();
    let mut atwater_kcal = None;
    for entry in nutrients {
        let (Some(info), Some(amount)) = (&entry.nutrient, entry.amount) else {
            continue;
        };
        match info.id {
            nutrient_ids::ENERGY_KCAL if is_kcal(info.unit_name.as_deref()) => {
                facts.calories = amount;
            }
            nutrient_ids::ENERGY_ATWATER_GENERAL | nutrient_ids::ENERGY_ATWATER_SPECIFIC => {
                atwater_kcal = atwater_kcal.or(Some(amount));
            }
            nutrient_ids::PROTEIN => facts.protein_g = amount,
            nutrient_ids::FAT => facts.fat_g = amount,
            nutrient_ids::CARBOHYDRATE => facts.carbs_g = amount,
            nutrient_ids::FIBER => facts.fiber_g = amount,
            _ => {}
        }
    }
    if facts.calories <= 0.0 {
        if let Some(kcal) = atwater_kcal {
            facts.calories = kcal;
        }
    }
    facts.clamped()
}

/// Energy is reported in kcal and kJ under different ids; a missing unit is kcal
fn is_kcal(unit: Option<&str>) -> bool {
    match unit {
        Some(unit) => unit.eq_ignore_ascii_case("kcal"),
        None => true,
    }
}

fn into_record(detail: FoodDetail) -> FoodRecord {
    let per_100 = base_nutrition(&detail.food_nutrients);
    let base_unit = detail
        .serving_size_unit
        .as_deref()
        .and_then(MetricUnit::parse)
        .unwrap_or(MetricUnit::Grams);
    let base_label = match base_unit {
        MetricUnit::Grams => "100 g",
        MetricUnit::Milliliters => "100 ml",
    };
    let mut servings = vec![Serving {
        description: base_label.to_owned(),
        nutrition: per_100,
        metric_amount: Some(100.0),
        metric_unit: Some(base_unit),
    }];

    if let Some(size) = detail.serving_size.filter(|size| *size > 0.0) {
        let description = detail
            .household_serving_full_text
            .clone()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| format!("{size} {}", detail.serving_size_unit.as_deref().unwrap_or("g")));
        servings.push(Serving {
            description,
            nutrition: per_100.scaled(size / 100.0),
            metric_amount: Some(size),
            metric_unit: Some(base_unit),
        });
    }

    servings.extend(detail.food_portions.iter().filter_map(|portion| {
        let grams = portion.gram_weight.filter(|grams| *grams > 0.0)?;
        let description = portion
            .description()
            .unwrap_or_else(|| format!("{grams} g"));
        Some(Serving::grams(description, grams, per_100.scaled(grams / 100.0)))
    }));

    FoodRecord {
        id: detail.fdc_id.to_string(),
        name: detail.description,
        source: MatchSource::Usda,
        data_type: detail.data_type,
        brand: detail.brand_owner,
        servings,
    }
}

impl From<SearchFood> for FoodSearchHit {
    fn from(food: SearchFood) -> Self {
        Self {
            id: food.fdc_id.to_string(),
            description: food.description,
            source: MatchSource::Usda,
            data_type: food.data_type,
            brand: food.brand_owner.or(food.brand_name),
            score: food.score,
        }
    }
}

/// USDA `FoodData` Central client
pub struct UsdaFoodSource {
    config: UsdaConfig,
    http: Client,
    caller: ResilientCaller,
    attempt_timeout: Duration,
    search_cache: TtlCache<String, Vec<FoodSearchHit>>,
    detail_cache: TtlCache<String, FoodRecord>,
}

impl UsdaFoodSource {
    /// Create the adapter with an injected HTTP client
    #[must_use]
    pub fn new(
        config: UsdaConfig,
        http: Client,
        resilience: &ResilienceConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            config,
            http,
            caller: ResilientCaller::new(SOURCE_NAME, resilience),
            attempt_timeout: resilience.retry.attempt_timeout,
            search_cache: TtlCache::new(cache.capacity, cache.search_ttl),
            detail_cache: TtlCache::new(cache.capacity, cache.detail_ttl),
        }
    }

    async fn fetch_search(&self, query: &str, page_size: usize) -> Result<Vec<FoodSearchHit>, SourceError> {
        let url = format!("{}/foods/search", self.config.base_url);
        let page_size = page_size.to_string();
        let response = self
            .http
            .get(&url)
            .query(&[
                ("query", query),
                ("pageSize", page_size.as_str()),
                ("api_key", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|error| SourceError::from_reqwest(SOURCE_NAME, &error, self.attempt_timeout))?;
        let body: SearchResponse = decode_json(SOURCE_NAME, response).await?;
        Ok(body.foods.into_iter().map(FoodSearchHit::from).collect())
    }

    async fn fetch_detail(&self, id: &str) -> Result<FoodRecord, SourceError> {
        let url = format!("{}/food/{id}", self.config.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("api_key", self.config.api_key.as_str())])
            .send()
            .await
            .map_err(|error| SourceError::from_reqwest(SOURCE_NAME, &error, self.attempt_timeout))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::not_found(SOURCE_NAME, id));
        }
        let detail: FoodDetail = decode_json(SOURCE_NAME, response).await?;
        Ok(into_record(detail))
    }
}

#[async_trait]
impl FoodDataSource for UsdaFoodSource {
    fn kind(&self) -> MatchSource {
        MatchSource::Usda
    }

    async fn search_foods(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SourceError::InvalidInput("search query cannot be empty".to_owned()));
        }
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE);
        let cache_key = format!("{}:{page_size}", query.to_lowercase());
        if let Some(hits) = self.search_cache.get(&cache_key).await {
            debug!(source = SOURCE_NAME, query, "search cache hit");
            return Ok(hits);
        }

        let hits = self
            .caller
            .call(|| self.fetch_search(query, page_size))
            .await?;
        self.search_cache.insert(cache_key, hits.clone()).await;
        Ok(hits)
    }

    async fn get_food(&self, id: &str) -> Result<FoodRecord, SourceError> {
        if id.parse::<u64>().is_err() {
            return Err(SourceError::InvalidInput(format!("invalid FDC id '{id}'")));
        }
        if let Some(record) = self.detail_cache.get(&id.to_owned()).await {
            return Ok(record);
        }

        let record = self.caller.call(|| self.fetch_detail(id)).await?;
        self.detail_cache.insert(id.to_owned(), record.clone()).await;
        Ok(record)
    }

    async fn health(&self) -> SourceHealth {
        SourceHealth {
            name: SOURCE_NAME.to_owned(),
            breaker: Some(self.caller.breaker().snapshot()),
            search_cache: Some(self.search_cache.stats().await),
            detail_cache: Some(self.detail_cache.stats().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_JSON: &str = r#"{
        "fdcId": 171477,
        "description": "Chicken, breast, meat only, cooked, roasted",
        "dataType": "SR Legacy",
        "foodNutrients": [
            {"nutrient": {"id": 1003, "name": "Protein", "unitName": "g"}, "amount": 31.02},
            {"nutrient": {"id": 1004, "name": "Total lipid (fat)", "unitName": "g"}, "amount": 3.57},
            {"nutrient": {"id": 1005, "name": "Carbohydrate, by difference", "unitName": "g"}, "amount": 0.0},
            {"nutrient": {"id": 1008, "name": "Energy", "unitName": "kcal"}, "amount": 165.0},
            {"nutrient": {"id": 1062, "name": "Energy", "unitName": "kJ"}, "amount": 690.0}
        ],
        "foodPortions": [
            {"gramWeight": 140.0, "amount": 1.0, "modifier": "cup, chopped or diced"},
            {"gramWeight": 0.0, "portionDescription": "Quantity not specified"}
        ]
    }"#;

    #[test]
    fn test_detail_normalizes_to_servings() {
        let detail: FoodDetail = serde_json::from_str(DETAIL_JSON).unwrap();
        let record = into_record(detail);
        assert_eq!(record.id, "171477");
        assert_eq!(record.source, MatchSource::Usda);
        assert_eq!(record.servings.len(), 2);

        let base = &record.servings[0];
        assert_eq!(base.gram_weight(), Some(100.0));
        assert!((base.nutrition.calories - 165.0).abs() < f64::EPSILON);
        assert!((base.nutrition.protein_g - 31.02).abs() < f64::EPSILON);

        let cup = &record.servings[1];
        assert_eq!(cup.description, "1 cup, chopped or diced");
        assert!((cup.nutrition.calories - 231.0).abs() < 1e-9);
    }

    #[test]
    fn test_atwater_energy_fallback() {
        let nutrients: Vec<DetailNutrient> = serde_json::from_str(
            r#"[{"nutrient": {"id": 2047, "unitName": "kcal"}, "amount": 98.0},
                {"nutrient": {"id": 1003, "unitName": "g"}, "amount": 2.0}]"#,
        )
        .unwrap();
        let facts = base_nutrition(&nutrients);
        assert!((facts.calories - 98.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_search_hit_prefers_brand_owner() {
        let food: SearchFood = serde_json::from_str(
            r#"{"fdcId": 1, "description": "GREEK YOGURT", "dataType": "Branded", "brandName": "ACME"}"#,
        )
        .unwrap();
        let hit = FoodSearchHit::from(food);
        assert_eq!(hit.brand.as_deref(), Some("ACME"));
        assert!(hit.is_branded());
    }
}
