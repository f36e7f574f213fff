// ABOUTME: Local food database schema and seed helpers
// ABOUTME: Creates foods, portions, aliases and the FTS5 index kept in sync by triggers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use nutrition_core::errors::SourceError;
use nutrition_core::models::{normalize_name, NutritionFacts};
use sqlx::SqlitePool;
use tracing::info;

/// Statements run in order by [`migrate`]; trigger bodies contain `;` so
/// each entry is executed on its own.
const MIGRATIONS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS foods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        data_type TEXT,
        brand TEXT,
        calories REAL NOT NULL DEFAULT 0 CHECK (calories >= 0),
        protein_g REAL NOT NULL DEFAULT 0 CHECK (protein_g >= 0),
        carbs_g REAL NOT NULL DEFAULT 0 CHECK (carbs_g >= 0),
        fat_g REAL NOT NULL DEFAULT 0 CHECK (fat_g >= 0),
        fiber_g REAL NOT NULL DEFAULT 0 CHECK (fiber_g >= 0)
    )",
    r"
    CREATE TABLE IF NOT EXISTS food_portions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        food_id INTEGER NOT NULL REFERENCES foods(id) ON DELETE CASCADE,
        description TEXT NOT NULL,
        gram_weight REAL NOT NULL CHECK (gram_weight > 0)
    )",
    r"CREATE INDEX IF NOT EXISTS idx_food_portions_food ON food_portions(food_id)",
    r"
    CREATE TABLE IF NOT EXISTS food_aliases (
        alias TEXT PRIMARY KEY,
        food_id INTEGER NOT NULL REFERENCES foods(id) ON DELETE CASCADE
    )",
    r"
    CREATE VIRTUAL TABLE IF NOT EXISTS foods_fts USING fts5(
        description,
        content = 'foods',
        content_rowid = 'id'
    )",
    r"
    CREATE TRIGGER IF NOT EXISTS foods_fts_insert AFTER INSERT ON foods BEGIN
        INSERT INTO foods_fts(rowid, description) VALUES (new.id, new.description);
    END",
    r"
    CREATE TRIGGER IF NOT EXISTS foods_fts_delete AFTER DELETE ON foods BEGIN
        INSERT INTO foods_fts(foods_fts, rowid, description) VALUES ('delete', old.id, old.description);
    END",
    r"
    CREATE TRIGGER IF NOT EXISTS foods_fts_update AFTER UPDATE OF description ON foods BEGIN
        INSERT INTO foods_fts(foods_fts, rowid, description) VALUES ('delete', old.id, old.description);
        INSERT INTO foods_fts(rowid, description) VALUES (new.id, new.description);
    END",
];

/// A food row to insert, with nutrition per 100 g
#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    /// Searchable description
    pub description: String,
    /// Source data type tag
    pub data_type: Option<String>,
    /// Brand owner, for branded products
    pub brand: Option<String>,
    /// Nutrition per 100 g
    pub per_100g: NutritionFacts,
}

impl NewFood {
    /// Generic food with no brand
    #[must_use]
    pub fn generic(description: impl Into<String>, per_100g: NutritionFacts) -> Self {
        Self {
            description: description.into(),
            data_type: Some("generic".to_owned()),
            brand: None,
            per_100g,
        }
    }
}

/// Create tables, the FTS index and its sync triggers
///
/// # Errors
///
/// Returns [`SourceError::Database`] if any statement fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), SourceError> {
    for statement in MIGRATIONS {
        sqlx::query(*statement).execute(pool).await?;
    }
    info!("local food database schema ready");
    Ok(())
}

/// Insert a food and return its id
///
/// # Errors
///
/// Returns [`SourceError::Database`] on constraint or I/O failure.
pub async fn insert_food(pool: &SqlitePool, food: &NewFood) -> Result<i64, SourceError> {
    let facts = food.per_100g.clamped();
    let result = sqlx::query(
        r"
        INSERT INTO foods (description, data_type, brand, calories, protein_g, carbs_g, fat_g, fiber_g)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ",
    )
    .bind(&food.description)
    .bind(&food.data_type)
    .bind(&food.brand)
    .bind(facts.calories)
    .bind(facts.protein_g)
    .bind(facts.carbs_g)
    .bind(facts.fat_g)
    .bind(facts.fiber_g)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Attach a portion weight to a food
///
/// # Errors
///
/// Returns [`SourceError::InvalidInput`] for a non-positive weight and
/// [`SourceError::Database`] on constraint or I/O failure.
pub async fn insert_portion(
    pool: &SqlitePool,
    food_id: i64,
    description: &str,
    gram_weight: f64,
) -> Result<(), SourceError> {
    if gram_weight <= 0.0 || !gram_weight.is_finite() {
        return Err(SourceError::InvalidInput(format!(
            "portion weight must be positive, got {gram_weight}"
        )));
    }
    sqlx::query("INSERT INTO food_portions (food_id, description, gram_weight) VALUES (?, ?, ?)")
        .bind(food_id)
        .bind(description)
        .bind(gram_weight)
        .execute(pool)
        .await?;
    Ok(())
}

/// Map a normalized ingredient name straight to a food
///
/// # Errors
///
/// Returns [`SourceError::Database`] on constraint or I/O failure.
pub async fn insert_alias(pool: &SqlitePool, alias: &str, food_id: i64) -> Result<(), SourceError> {
    sqlx::query(
        "INSERT INTO food_aliases (alias, food_id) VALUES (?, ?)
         ON CONFLICT(alias) DO UPDATE SET food_id = excluded.food_id",
    )
    .bind(normalize_name(alias))
    .bind(food_id)
    .execute(pool)
    .await?;
    Ok(())
}
