// ABOUTME: FatSecret Platform adapter implementing FoodDataSource and RecipeSource
// ABOUTME: OAuth2 client-credentials auth, lenient JSON decoding of string-typed numbers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! `FatSecret` Platform adapter
//!
//! The REST API returns numbers as strings, collapses single-element arrays
//! into bare objects, and reports application errors inside a 200 response.
//! All three quirks are absorbed here so callers only see typed records.

use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use nutrition_core::errors::SourceError;
use nutrition_core::models::{
    FoodRecord, FoodSearchHit, MatchSource, MetricUnit, NutritionFacts, RecipeHit, RecipeRecord,
    Serving,
};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::http_client::decode_json;
use crate::source::{
    CacheConfig, FoodDataSource, RecipeSource, ResilienceConfig, ResilientCaller, SourceHealth,
};

const SOURCE_NAME: &str = "fatsecret";
/// Largest page `foods.search` accepts
const MAX_RESULTS: usize = 50;
/// Refresh tokens this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// API error code for an unknown food or recipe id
const INVALID_ID_CODE: i64 = 106;

/// `FatSecret` adapter configuration
#[derive(Debug, Clone)]
pub struct FatSecretConfig {
    /// OAuth2 client id
    pub client_id: String,
    /// OAuth2 client secret
    pub client_secret: String,
    /// Method-style REST endpoint
    pub api_url: String,
    /// OAuth2 token endpoint
    pub token_url: String,
}

impl Default for FatSecretConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_url: "https://platform.fatsecret.com/rest/server.api".to_owned(),
            token_url: "https://oauth.fatsecret.com/connect/token".to_owned(),
        }
    }
}

/// A JSON field that holds either one object or an array of them
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

fn flatten<T>(items: Option<OneOrMany<T>>) -> Vec<T> {
    items.map(OneOrMany::into_vec).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Number(f64),
    Text(String),
}

/// Accept `"12.5"`, `12.5`, or null
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<LenientNumber>::deserialize(deserializer)? {
            Some(LenientNumber::Number(value)) => Some(value),
            Some(LenientNumber::Text(text)) => text.trim().parse::<f64>().ok(),
            None => None,
        }
        .filter(|value| value.is_finite()),
    )
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Failure { error: ApiError },
    Success(T),
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct FoodsSearchResponse {
    foods: FoodsPage,
}

#[derive(Debug, Deserialize)]
struct FoodsPage {
    #[serde(default)]
    food: Option<OneOrMany<SearchFood>>,
}

#[derive(Debug, Deserialize)]
struct SearchFood {
    food_id: String,
    food_name: String,
    #[serde(default)]
    food_type: Option<String>,
    #[serde(default)]
    brand_name: Option<String>,
    #[serde(default)]
    food_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoodGetResponse {
    food: FoodDetail,
}

#[derive(Debug, Deserialize)]
struct FoodDetail {
    food_id: String,
    food_name: String,
    #[serde(default)]
    food_type: Option<String>,
    #[serde(default)]
    brand_name: Option<String>,
    #[serde(default)]
    servings: Option<ServingList>,
}

#[derive(Debug, Deserialize)]
struct ServingList {
    #[serde(default)]
    serving: Option<OneOrMany<FatSecretServing>>,
}

#[derive(Debug, Default, Deserialize)]
struct NutrientFields {
    #[serde(default, deserialize_with = "lenient_f64")]
    calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    carbohydrate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    fat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    fiber: Option<f64>,
}

impl NutrientFields {
    fn facts(&self) -> NutritionFacts {
        NutritionFacts::new(
            self.calories.unwrap_or_default(),
            self.protein.unwrap_or_default(),
            self.carbohydrate.unwrap_or_default(),
            self.fat.unwrap_or_default(),
        )
        .with_fiber(self.fiber.unwrap_or_default())
        .clamped()
    }
}

#[derive(Debug, Deserialize)]
struct FatSecretServing {
    #[serde(default)]
    serving_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    metric_serving_amount: Option<f64>,
    #[serde(default)]
    metric_serving_unit: Option<String>,
    #[serde(flatten)]
    nutrients: NutrientFields,
}

impl From<FatSecretServing> for Serving {
    fn from(serving: FatSecretServing) -> Self {
        let metric_unit = serving.metric_serving_unit.as_deref().and_then(MetricUnit::parse);
        let metric_amount = serving.metric_serving_amount.filter(|_| metric_unit.is_some());
        Self {
            description: serving
                .serving_description
                .unwrap_or_else(|| "1 serving".to_owned()),
            nutrition: serving.nutrients.facts(),
            metric_amount,
            metric_unit,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecipesSearchResponse {
    recipes: RecipesPage,
}

#[derive(Debug, Deserialize)]
struct RecipesPage {
    #[serde(default)]
    recipe: Option<OneOrMany<SearchRecipe>>,
}

#[derive(Debug, Deserialize)]
struct SearchRecipe {
    recipe_id: String,
    recipe_name: String,
    #[serde(default)]
    recipe_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecipeGetResponse {
    recipe: RecipeDetail,
}

#[derive(Debug, Deserialize)]
struct RecipeDetail {
    recipe_id: String,
    recipe_name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    number_of_servings: Option<f64>,
    #[serde(default)]
    serving_sizes: Option<RecipeServings>,
    #[serde(default)]
    ingredients: Option<RecipeIngredients>,
    #[serde(default)]
    directions: Option<RecipeDirections>,
}

#[derive(Debug, Deserialize)]
struct RecipeServings {
    #[serde(default)]
    serving: Option<OneOrMany<NutrientFields>>,
}

#[derive(Debug, Deserialize)]
struct RecipeIngredients {
    #[serde(default)]
    ingredient: Option<OneOrMany<RecipeIngredient>>,
}

#[derive(Debug, Deserialize)]
struct RecipeIngredient {
    ingredient_description: String,
}

#[derive(Debug, Deserialize)]
struct RecipeDirections {
    #[serde(default)]
    direction: Option<OneOrMany<RecipeDirection>>,
}

#[derive(Debug, Deserialize)]
struct RecipeDirection {
    direction_description: String,
}

impl From<RecipeDetail> for RecipeRecord {
    fn from(detail: RecipeDetail) -> Self {
        let nutrition_per_serving = detail
            .serving_sizes
            .and_then(|sizes| flatten(sizes.serving).into_iter().next())
            .unwrap_or_default()
            .facts();
        Self {
            id: detail.recipe_id,
            name: detail.recipe_name,
            servings: detail.number_of_servings.filter(|n| *n > 0.0).unwrap_or(1.0),
            nutrition_per_serving,
            ingredients: detail
                .ingredients
                .map(|list| flatten(list.ingredient))
                .unwrap_or_default()
                .into_iter()
                .map(|ingredient| ingredient.ingredient_description)
                .collect(),
            instructions: detail
                .directions
                .map(|list| flatten(list.direction))
                .unwrap_or_default()
                .into_iter()
                .map(|direction| direction.direction_description)
                .collect(),
        }
    }
}

static DESCRIPTION_BASIS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)^per\s+(\d+(?:\.\d+)?)\s*(g|ml)\b").ok());

static DESCRIPTION_NUTRIENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(calories|fat|carbs|protein):\s*(\d+(?:\.\d+)?)").ok()
});

/// Parse a search summary such as
/// `"Per 100g - Calories: 165kcal | Fat: 3.57g | Carbs: 0.00g | Protein: 31.02g"`
///
/// Only metric bases are accepted so the result always carries a measured amount.
#[must_use]
pub fn parse_food_description(description: &str) -> Option<Serving> {
    let basis = DESCRIPTION_BASIS.as_ref()?.captures(description.trim())?;
    let amount: f64 = basis.get(1)?.as_str().parse().ok()?;
    let unit = MetricUnit::parse(basis.get(2)?.as_str())?;

    let mut facts = NutritionFacts::default();
    let mut found = false;
    for capture in DESCRIPTION_NUTRIENT.as_ref()?.captures_iter(description) {
        let (Some(name), Some(value)) = (capture.get(1), capture.get(2)) else {
            continue;
        };
        let Ok(value) = value.as_str().parse::<f64>() else {
            continue;
        };
        found = true;
        match name.as_str().to_lowercase().as_str() {
            "calories" => facts.calories = value,
            "fat" => facts.fat_g = value,
            "carbs" => facts.carbs_g = value,
            _ => facts.protein_g = value,
        }
    }
    found.then(|| Serving {
        description: format!("{amount} {}", basis.get(2).map_or("g", |m| m.as_str())),
        nutrition: facts.clamped(),
        metric_amount: Some(amount),
        metric_unit: Some(unit),
    })
}

/// `FatSecret` Platform client for foods and recipes
pub struct FatSecretSource {
    config: FatSecretConfig,
    http: Client,
    caller: ResilientCaller,
    attempt_timeout: Duration,
    token: RwLock<Option<AccessToken>>,
    summaries: TtlCache<String, Serving>,
    search_cache: TtlCache<String, Vec<FoodSearchHit>>,
    detail_cache: TtlCache<String, FoodRecord>,
    recipe_search_cache: TtlCache<String, Vec<RecipeHit>>,
    recipe_cache: TtlCache<String, RecipeRecord>,
}

impl FatSecretSource {
    /// Create the adapter with an injected HTTP client
    #[must_use]
    pub fn new(
        config: FatSecretConfig,
        http: Client,
        resilience: &ResilienceConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            config,
            http,
            caller: ResilientCaller::new(SOURCE_NAME, resilience),
            attempt_timeout: resilience.retry.attempt_timeout,
            token: RwLock::new(None),
            summaries: TtlCache::new(cache.capacity, cache.detail_ttl),
            search_cache: TtlCache::new(cache.capacity, cache.search_ttl),
            detail_cache: TtlCache::new(cache.capacity, cache.detail_ttl),
            recipe_search_cache: TtlCache::new(cache.capacity, cache.search_ttl),
            recipe_cache: TtlCache::new(cache.capacity, cache.detail_ttl),
        }
    }

    fn network_error(&self, error: &reqwest::Error) -> SourceError {
        SourceError::from_reqwest(SOURCE_NAME, error, self.attempt_timeout)
    }

    async fn access_token(&self) -> Result<String, SourceError> {
        if let Some(token) = self.token.read().await.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials&scope=basic")
            .send()
            .await
            .map_err(|error| self.network_error(&error))?;
        let token: TokenResponse = decode_json(SOURCE_NAME, response).await?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(86_400));
        info!(source = SOURCE_NAME, expires_in_secs = lifetime.as_secs(), "obtained access token");
        let value = token.access_token.clone();
        *slot = Some(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime,
        });
        drop(slot);
        Ok(value)
    }

    async fn api_call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
        id: Option<&str>,
    ) -> Result<T, SourceError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(&self.config.api_url)
            .bearer_auth(token)
            .query(&[("method", method), ("format", "json")])
            .query(params)
            .send()
            .await
            .map_err(|error| self.network_error(&error))?;
        match decode_json::<Envelope<T>>(SOURCE_NAME, response).await? {
            Envelope::Success(body) => Ok(body),
            Envelope::Failure { error } if error.code == INVALID_ID_CODE => {
                Err(SourceError::not_found(SOURCE_NAME, id.unwrap_or(method)))
            }
            Envelope::Failure { error } => Err(SourceError::Api {
                source_name: SOURCE_NAME.to_owned(),
                code: error.code,
                message: error.message,
            }),
        }
    }

    /// Convert search results, remembering each summary serving for detail lookups
    async fn search_hits(&self, foods: Vec<SearchFood>) -> Vec<FoodSearchHit> {
        let mut hits = Vec::with_capacity(foods.len());
        for food in foods {
            if let Some(summary) = food.food_description.as_deref().and_then(parse_food_description) {
                self.summaries.insert(food.food_id.clone(), summary).await;
            }
            hits.push(FoodSearchHit {
                id: food.food_id,
                description: food.food_name,
                source: MatchSource::FatSecret,
                data_type: food.food_type,
                brand: food.brand_name,
                score: None,
            });
        }
        hits
    }

    async fn into_record(&self, detail: FoodDetail) -> FoodRecord {
        let mut servings: Vec<Serving> = detail
            .servings
            .map(|list| flatten(list.serving))
            .unwrap_or_default()
            .into_iter()
            .map(Serving::from)
            .collect();
        if servings.is_empty() {
            if let Some(summary) = self.summaries.get(&detail.food_id).await {
                debug!(source = SOURCE_NAME, food = %detail.food_name, "using search summary serving");
                servings.push(summary);
            }
        }
        FoodRecord {
            id: detail.food_id,
            name: detail.food_name,
            source: MatchSource::FatSecret,
            data_type: detail.food_type,
            brand: detail.brand_name,
            servings,
        }
    }
}

fn validate_query(query: &str) -> Result<&str, SourceError> {
    let query = query.trim();
    if query.is_empty() {
        Err(SourceError::InvalidInput("search query cannot be empty".to_owned()))
    } else {
        Ok(query)
    }
}

#[async_trait]
impl FoodDataSource for FatSecretSource {
    fn kind(&self) -> MatchSource {
        MatchSource::FatSecret
    }

    async fn search_foods(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        let query = validate_query(query)?;
        let max_results = max_results.clamp(1, MAX_RESULTS);
        let cache_key = format!("{}:{max_results}", query.to_lowercase());
        if let Some(hits) = self.search_cache.get(&cache_key).await {
            return Ok(hits);
        }

        let limit = max_results.to_string();
        let params = [("search_expression", query), ("max_results", limit.as_str())];
        let response: FoodsSearchResponse = self
            .caller
            .call(|| self.api_call("foods.search", &params, None))
            .await?;
        let hits = self.search_hits(flatten(response.foods.food)).await;
        self.search_cache.insert(cache_key, hits.clone()).await;
        Ok(hits)
    }

    async fn get_food(&self, id: &str) -> Result<FoodRecord, SourceError> {
        if let Some(record) = self.detail_cache.get(&id.to_owned()).await {
            return Ok(record);
        }
        let params = [("food_id", id)];
        let response: FoodGetResponse = self
            .caller
            .call(|| self.api_call("food.get.v2", &params, Some(id)))
            .await?;
        let record = self.into_record(response.food).await;
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

#[async_trait]
impl RecipeSource for FatSecretSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn search_recipes(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<RecipeHit>, SourceError> {
        let query = validate_query(query)?;
        let max_results = max_results.clamp(1, MAX_RESULTS);
        let cache_key = format!("{}:{max_results}", query.to_lowercase());
        if let Some(hits) = self.recipe_search_cache.get(&cache_key).await {
            return Ok(hits);
        }

        let limit = max_results.to_string();
        let params = [("search_expression", query), ("max_results", limit.as_str())];
        let response: RecipesSearchResponse = self
            .caller
            .call(|| self.api_call("recipes.search", &params, None))
            .await?;
        let hits: Vec<RecipeHit> = flatten(response.recipes.recipe)
            .into_iter()
            .map(|recipe| RecipeHit {
                id: recipe.recipe_id,
                name: recipe.recipe_name,
                description: recipe.recipe_description,
            })
            .collect();
        self.recipe_search_cache.insert(cache_key, hits.clone()).await;
        Ok(hits)
    }

    async fn get_recipe(&self, id: &str) -> Result<RecipeRecord, SourceError> {
        if let Some(recipe) = self.recipe_cache.get(&id.to_owned()).await {
            return Ok(recipe);
        }
        let params = [("recipe_id", id)];
        let response: RecipeGetResponse = self
            .caller
            .call(|| self.api_call("recipe.get", &params, Some(id)))
            .await?;
        let recipe = RecipeRecord::from(response.recipe);
        self.recipe_cache.insert(id.to_owned(), recipe.clone()).await;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_food(id: &str, kcal: u32) -> SearchFood {
        serde_json::from_value(serde_json::json!({
            "food_id": id,
            "food_name": format!("food {id}"),
            "food_description": format!("Per 100g - Calories: {kcal}kcal | Fat: 1.00g | Carbs: 2.00g | Protein: 3.00g"),
        }))
        .unwrap()
    }

    fn bare_detail(id: &str) -> FoodDetail {
        serde_json::from_value(serde_json::json!({"food_id": id, "food_name": format!("food {id}")}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_search_summaries_are_bounded() {
        let cache = CacheConfig {
            capacity: 2,
            ..CacheConfig::default()
        };
        let source = FatSecretSource::new(
            FatSecretConfig::default(),
            Client::new(),
            &ResilienceConfig::default(),
            &cache,
        );

        let hits = source
            .search_hits(vec![search_food("1", 100), search_food("2", 200), search_food("3", 300)])
            .await;
        assert_eq!(hits.len(), 3);

        assert!(source.into_record(bare_detail("1")).await.servings.is_empty());
        let recent = source.into_record(bare_detail("3")).await;
        assert_eq!(recent.servings.len(), 1);
        assert!((recent.servings[0].nutrition.calories - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_food_description() {
        let serving = parse_food_description(
            "Per 100g - Calories: 165kcal | Fat: 3.57g | Carbs: 0.00g | Protein: 31.02g",
        )
        .unwrap();
        assert_eq!(serving.gram_weight(), Some(100.0));
        assert!((serving.nutrition.calories - 165.0).abs() < f64::EPSILON);
        assert!((serving.nutrition.protein_g - 31.02).abs() < f64::EPSILON);
        assert!(parse_food_description("Per 1 medium - Calories: 72kcal").is_none());
    }

    #[test]
    fn test_single_serving_object_and_string_numbers() {
        let body = r#"{"food": {
            "food_id": "33691",
            "food_name": "White Rice",
            "food_type": "Generic",
            "servings": {"serving": {
                "serving_description": "1 cup",
                "metric_serving_amount": "158.000",
                "metric_serving_unit": "g",
                "calories": "205",
                "protein": "4.25",
                "carbohydrate": "44.51",
                "fat": "0.44"
            }}
        }}"#;
        let response: Envelope<FoodGetResponse> = serde_json::from_str(body).unwrap();
        let Envelope::Success(response) = response else {
            unreachable!("success body parsed as failure");
        };
        let servings: Vec<Serving> = flatten(response.food.servings.unwrap().serving)
            .into_iter()
            .map(Serving::from)
            .collect();
        assert_eq!(servings.len(), 1);
        assert_eq!(servings[0].gram_weight(), Some(158.0));
        assert!((servings[0].nutrition.carbs_g - 44.51).abs() < f64::EPSILON);
    }

    #[test]
    fn test_error_envelope() {
        let body = r#"{"error": {"code": 106, "message": "Invalid ID"}}"#;
        let response: Envelope<FoodGetResponse> = serde_json::from_str(body).unwrap();
        assert!(matches!(response, Envelope::Failure { error } if error.code == 106));
    }

    #[test]
    fn test_empty_search_page() {
        let body = r#"{"foods": {"max_results": "10", "total_results": "0", "page_number": "0"}}"#;
        let response: FoodsSearchResponse = serde_json::from_str(body).unwrap();
        assert!(flatten(response.foods.food).is_empty());
    }

    #[test]
    fn test_recipe_detail_conversion() {
        let body = r#"{"recipe": {
            "recipe_id": "91",
            "recipe_name": "Chicken Stir Fry",
            "number_of_servings": "4",
            "serving_sizes": {"serving": {"calories": "420", "protein": "35", "carbohydrate": "30", "fat": "15"}},
            "ingredients": {"ingredient": [{"ingredient_description": "1 lb chicken breast"}]},
            "directions": {"direction": {"direction_number": "1", "direction_description": "Stir fry."}}
        }}"#;
        let response: RecipeGetResponse = serde_json::from_str(body).unwrap();
        let recipe = RecipeRecord::from(response.recipe);
        assert!((recipe.servings - 4.0).abs() < f64::EPSILON);
        assert!((recipe.nutrition_per_serving.calories - 420.0).abs() < f64::EPSILON);
        assert_eq!(recipe.ingredients, vec!["1 lb chicken breast".to_owned()]);
        assert_eq!(recipe.instructions, vec!["Stir fry.".to_owned()]);
    }
}
