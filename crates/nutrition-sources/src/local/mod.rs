// ABOUTME: Local SQLite food search with FTS5 ranking and a trigram similarity fallback
// ABOUTME: Synthesizes a 100 g base serving plus stored portion weights for each food
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Local food database
//!
//! Primary search is FTS5 ranked by `bm25`. Only when it returns no rows does
//! the search fall back to word-level trigram similarity over every
//! description, keeping matches above a floor and ordering by similarity
//! then by the shortest description.

/// Schema migration and seed helpers
pub mod schema;

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

use async_trait::async_trait;
use nutrition_core::errors::SourceError;
use nutrition_core::models::{FoodRecord, FoodSearchHit, MatchSource, NutritionFacts, Serving};
use nutrition_intelligence::text::word_similarity;
use regex::Regex;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::source::{FoodDataSource, SourceHealth};

pub use schema::{insert_alias, insert_food, insert_portion, migrate, NewFood};

/// Minimum word similarity for fallback matches
pub const DEFAULT_SIMILARITY_FLOOR: f64 = 0.3;
const POOL_MAX_CONNECTIONS: u32 = 5;

static FTS_UNSAFE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").ok());

/// Build an FTS5 expression: every word quoted and required
///
/// Returns `None` when nothing searchable remains.
#[must_use]
pub fn fts_query(query: &str) -> Option<String> {
    let cleaned = FTS_UNSAFE.as_ref().map_or_else(
        || query.to_owned(),
        |pattern| pattern.replace_all(query, " ").into_owned(),
    );
    let terms: Vec<String> = cleaned
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.to_lowercase()))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" "))
}

fn hit_from_row(row: &SqliteRow, score: Option<f64>) -> Result<FoodSearchHit, SourceError> {
    let id: i64 = row.try_get("id")?;
    Ok(FoodSearchHit {
        id: id.to_string(),
        description: row.try_get("description")?,
        source: MatchSource::Local,
        data_type: row.try_get("data_type")?,
        brand: row.try_get("brand")?,
        score,
    })
}

/// Local food search over a SQLite database
#[derive(Debug, Clone)]
pub struct LocalFoodSearch {
    pool: SqlitePool,
    similarity_floor: f64,
}

impl LocalFoodSearch {
    /// Wrap an existing pool
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            similarity_floor: DEFAULT_SIMILARITY_FLOOR,
        }
    }

    /// Open (creating if missing) the database at `database_url` and migrate it
    ///
    /// In-memory databases get a single connection so every query sees the
    /// same data.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Database`] if the URL is invalid, the database
    /// cannot be opened, or migration fails.
    pub async fn connect(database_url: &str) -> Result<Self, SourceError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            POOL_MAX_CONNECTIONS
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        let search = Self::new(pool);
        search.migrate().await?;
        Ok(search)
    }

    /// Override the fallback similarity floor
    #[must_use]
    pub fn with_similarity_floor(mut self, floor: f64) -> Self {
        self.similarity_floor = floor;
        self
    }

    /// Underlying pool, for seeding and alias loading
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Database`] if any statement fails.
    pub async fn migrate(&self) -> Result<(), SourceError> {
        migrate(&self.pool).await
    }

    /// Insert a food and return its id
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Database`] on constraint or I/O failure.
    pub async fn insert_food(&self, food: &NewFood) -> Result<i64, SourceError> {
        insert_food(&self.pool, food).await
    }

    /// Attach a portion weight to a food
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive weight or a database failure.
    pub async fn insert_portion(
        &self,
        food_id: i64,
        description: &str,
        gram_weight: f64,
    ) -> Result<(), SourceError> {
        insert_portion(&self.pool, food_id, description, gram_weight).await
    }

    /// Map an ingredient name straight to a food
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Database`] on constraint or I/O failure.
    pub async fn insert_alias(&self, alias: &str, food_id: i64) -> Result<(), SourceError> {
        insert_alias(&self.pool, alias, food_id).await
    }

    async fn full_text_search(
        &self,
        expression: &str,
        limit: i64,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        let rows = sqlx::query(
            r"
            SELECT f.id, f.description, f.data_type, f.brand, bm25(foods_fts) AS relevance
            FROM foods_fts
            JOIN foods f ON f.id = foods_fts.rowid
            WHERE foods_fts MATCH ?
            ORDER BY relevance, length(f.description)
            LIMIT ?
            ",
        )
        .bind(expression)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let relevance: f64 = row.try_get("relevance")?;
            hits.push(hit_from_row(row, Some(-relevance))?);
        }
        Ok(hits)
    }

    async fn similarity_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        let rows = sqlx::query("SELECT id, description, data_type, brand FROM foods")
            .fetch_all(&self.pool)
            .await?;

        let mut scored = Vec::new();
        for row in &rows {
            let description: String = row.try_get("description")?;
            let similarity = word_similarity(query, &description);
            if similarity >= self.similarity_floor {
                scored.push(hit_from_row(row, Some(similarity))?);
            }
        }
        scored.sort_by(|left, right| {
            let left_score = left.score.unwrap_or_default();
            let right_score = right.score.unwrap_or_default();
            right_score
                .partial_cmp(&left_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.description.len().cmp(&right.description.len()))
        });
        scored.truncate(max_results);
        Ok(scored)
    }

    async fn portions(&self, food_id: i64) -> Result<Vec<(String, f64)>, SourceError> {
        let rows = sqlx::query(
            "SELECT description, gram_weight FROM food_portions WHERE food_id = ? ORDER BY id",
        )
        .bind(food_id)
        .fetch_all(&self.pool)
        .await?;
        let mut portions = Vec::with_capacity(rows.len());
        for row in &rows {
            let description: String = row.try_get("description")?;
            let grams: f64 = row.try_get("gram_weight")?;
            portions.push((description, grams));
        }
        Ok(portions)
    }
}

#[async_trait]
impl FoodDataSource for LocalFoodSearch {
    fn kind(&self) -> MatchSource {
        MatchSource::Local
    }

    async fn search_foods(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<FoodSearchHit>, SourceError> {
        let Some(expression) = fts_query(query) else {
            return Ok(Vec::new());
        };
        let limit = i64::try_from(max_results.max(1)).unwrap_or(i64::MAX);
        let hits = self.full_text_search(&expression, limit).await?;
        if !hits.is_empty() {
            return Ok(hits);
        }
        debug!(source = "local", query, "full-text search empty, trying trigram similarity");
        self.similarity_search(query, max_results.max(1)).await
    }

    async fn get_food(&self, id: &str) -> Result<FoodRecord, SourceError> {
        let food_id: i64 = id
            .parse()
            .map_err(|_| SourceError::InvalidInput(format!("invalid local food id '{id}'")))?;
        let row = sqlx::query(
            r"
            SELECT id, description, data_type, brand, calories, protein_g, carbs_g, fat_g, fiber_g
            FROM foods WHERE id = ?
            ",
        )
        .bind(food_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| SourceError::not_found("local", id))?;

        let per_100g = NutritionFacts::new(
            row.try_get("calories")?,
            row.try_get("protein_g")?,
            row.try_get("carbs_g")?,
            row.try_get("fat_g")?,
        )
        .with_fiber(row.try_get("fiber_g")?);

        let mut servings = vec![Serving::grams("100 g", 100.0, per_100g)];
        servings.extend(
            self.portions(food_id)
                .await?
                .into_iter()
                .map(|(description, grams)| {
                    Serving::grams(description, grams, per_100g.scaled(grams / 100.0))
                }),
        );

        Ok(FoodRecord {
            id: food_id.to_string(),
            name: row.try_get("description")?,
            source: MatchSource::Local,
            data_type: row.try_get("data_type")?,
            brand: row.try_get("brand")?,
            servings,
        })
    }

    async fn health(&self) -> SourceHealth {
        SourceHealth::named("local")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fts_query_quotes_terms() {
        assert_eq!(
            fts_query("Chicken-breast, (raw)").as_deref(),
            Some("\"chicken\" \"breast\" \"raw\"")
        );
        assert_eq!(fts_query("  ***  "), None);
    }
}
