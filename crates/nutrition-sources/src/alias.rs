// ABOUTME: Precomputed ingredient-name to canonical-food shortcut
// ABOUTME: Exact normalized-name hits bypass every search tier
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use dashmap::DashMap;
use nutrition_core::errors::SourceError;
use nutrition_core::models::{normalize_name, MatchSource, NutritionFacts, ResolvedMatch};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Concurrent alias map keyed by normalized ingredient name
#[derive(Debug, Default)]
pub struct FoodAliasCache {
    entries: DashMap<String, ResolvedMatch>,
}

impl FoodAliasCache {
    /// Empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache pre-filled from `(alias, match)` pairs
    #[must_use]
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ResolvedMatch)>,
        S: AsRef<str>,
    {
        let cache = Self::new();
        for (alias, resolved) in entries {
            cache.insert(alias.as_ref(), resolved);
        }
        cache
    }

    /// Add or replace an alias; the stored match is tagged as an alias hit
    pub fn insert(&self, alias: &str, resolved: ResolvedMatch) {
        let key = normalize_name(alias);
        if key.is_empty() {
            return;
        }
        self.entries.insert(
            key,
            ResolvedMatch {
                source: MatchSource::Alias,
                ..resolved
            },
        );
    }

    /// Exact lookup by ingredient name (case and whitespace insensitive)
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ResolvedMatch> {
        self.entries
            .get(&normalize_name(name))
            .map(|entry| entry.value().clone())
    }

    /// Number of aliases
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No aliases loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load every row of `food_aliases` joined to its food
    ///
    /// Returns the number of aliases loaded.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Database`] if the query fails.
    pub async fn load_from_pool(&self, pool: &SqlitePool) -> Result<usize, SourceError> {
        let rows = sqlx::query(
            r"
            SELECT a.alias, f.id, f.description, f.data_type,
                   f.calories, f.protein_g, f.carbs_g, f.fat_g, f.fiber_g
            FROM food_aliases a
            JOIN foods f ON f.id = a.food_id
            ",
        )
        .fetch_all(pool)
        .await?;

        for row in &rows {
            let alias: String = row.try_get("alias")?;
            let id: i64 = row.try_get("id")?;
            let per_100g = NutritionFacts::new(
                row.try_get("calories")?,
                row.try_get("protein_g")?,
                row.try_get("carbs_g")?,
                row.try_get("fat_g")?,
            )
            .with_fiber(row.try_get("fiber_g")?);
            self.insert(
                &alias,
                ResolvedMatch {
                    id: id.to_string(),
                    description: row.try_get("description")?,
                    source: MatchSource::Alias,
                    per_100g,
                    data_type: row.try_get("data_type")?,
                },
            );
        }
        info!(aliases = rows.len(), "loaded food aliases");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rice() -> ResolvedMatch {
        ResolvedMatch {
            id: "7".to_owned(),
            description: "Rice, white, cooked".to_owned(),
            source: MatchSource::Local,
            per_100g: NutritionFacts::new(130.0, 2.7, 28.0, 0.3),
            data_type: None,
        }
    }

    #[test]
    fn test_lookup_is_normalized_and_tagged() {
        let cache = FoodAliasCache::from_entries([("White  Rice", rice())]);
        let hit = cache.get("  white rice ").unwrap();
        assert_eq!(hit.source, MatchSource::Alias);
        assert_eq!(hit.id, "7");
        assert!(cache.get("brown rice").is_none());
        assert_eq!(cache.len(), 1);
    }
}
