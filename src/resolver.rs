// ABOUTME: Batch ingredient resolver walking the alias, local and remote source waterfall
// ABOUTME: Deduplicates names, bounds concurrency and enforces one wall-clock deadline per batch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Ingredient resolution
//!
//! Each unique ingredient name is looked up in tier order:
//!
//! 1. Alias cache (exact normalized name). A hit ends the lookup.
//! 2. Local food database, when configured. Remote tiers are skipped.
//! 3. Remote sources in order, until enough candidates are collected.
//!
//! Remote lookups stop once the batch deadline passes; names that were cut
//! short keep whatever candidates were already found and are reported in
//! [`BatchResolution::timed_out`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use nutrition_core::errors::PipelineError;
use nutrition_core::models::{
    normalize_name, FoodRecord, FoodSearchHit, MatchSource, ResolvedMatch, Serving,
};
use nutrition_intelligence::nutrition_per_100g;
use nutrition_sources::{FoodAliasCache, FoodDataSource, SourceHealth};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ConcurrencyConfig;

/// Resolver limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Unique names resolved per batch; the rest are dropped
    pub batch_cap: usize,
    /// Ingredients resolved at once
    pub concurrency: usize,
    /// Wall-clock budget for one batch
    pub deadline: Duration,
    /// Candidates collected per ingredient
    pub candidate_target: usize,
    /// Results requested per search
    pub page_size: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&ConcurrencyConfig::default())
    }
}

impl From<&ConcurrencyConfig> for ResolverSettings {
    fn from(config: &ConcurrencyConfig) -> Self {
        Self {
            batch_cap: config.batch_cap,
            concurrency: config.ingredient_limit,
            deadline: config.batch_deadline(),
            candidate_target: config.candidate_target,
            page_size: config.search_page_size,
        }
    }
}

/// Candidates found for one batch of ingredient names
#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    matches: HashMap<String, Vec<ResolvedMatch>>,
    /// Names beyond the batch cap, never looked up
    pub dropped: Vec<String>,
    /// Names whose remote lookups were cut short by the deadline
    pub timed_out: Vec<String>,
}

impl BatchResolution {
    /// Ranked candidates for an ingredient name, best first
    #[must_use]
    pub fn candidates(&self, name: &str) -> &[ResolvedMatch] {
        match self.matches.get(&normalize_name(name)) {
            Some(found) => found,
            None => &[],
        }
    }

    /// Best candidate for an ingredient name
    #[must_use]
    pub fn best(&self, name: &str) -> Option<&ResolvedMatch> {
        self.candidates(name).first()
    }

    /// Names with at least one candidate
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.matches.values().filter(|found| !found.is_empty()).count()
    }

    /// Unique names that were looked up
    #[must_use]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Nothing was looked up
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Deadline signal for callers that report partial resolution
    #[must_use]
    pub fn timeout(&self) -> Option<PipelineError> {
        (!self.timed_out.is_empty()).then(|| PipelineError::ResolutionTimeout {
            unresolved: self.timed_out.clone(),
        })
    }
}

#[derive(Debug, Default)]
struct Lookup {
    candidates: Vec<ResolvedMatch>,
    timed_out: bool,
}

/// Resolves ingredient names to per-100 g nutrition
pub struct IngredientResolver {
    aliases: Arc<FoodAliasCache>,
    local: Option<Arc<dyn FoodDataSource>>,
    remotes: Vec<Arc<dyn FoodDataSource>>,
    settings: ResolverSettings,
}

impl IngredientResolver {
    /// Create a resolver over the given tiers
    #[must_use]
    pub fn new(
        aliases: Arc<FoodAliasCache>,
        local: Option<Arc<dyn FoodDataSource>>,
        remotes: Vec<Arc<dyn FoodDataSource>>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            aliases,
            local,
            remotes,
            settings,
        }
    }

    /// Limits in use
    #[must_use]
    pub const fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// A local food database is configured
    #[must_use]
    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// Health of every configured food source, local first
    pub async fn source_health(&self) -> Vec<SourceHealth> {
        let mut health = Vec::with_capacity(self.remotes.len() + 1);
        for source in self.local.iter().chain(&self.remotes) {
            health.push(source.health().await);
        }
        health
    }

    /// Resolve a batch of ingredient names
    ///
    /// Names are deduplicated case-insensitively. Source failures degrade to
    /// "no match" for the affected tier and never fail the batch.
    pub async fn resolve_batch<S: AsRef<str>>(&self, names: &[S]) -> BatchResolution {
        let mut seen = HashSet::new();
        let mut unique: Vec<String> = names
            .iter()
            .map(|name| normalize_name(name.as_ref()))
            .filter(|key| !key.is_empty() && seen.insert(key.clone()))
            .collect();

        let dropped = if unique.len() > self.settings.batch_cap {
            let dropped = unique.split_off(self.settings.batch_cap);
            warn!(
                cap = self.settings.batch_cap,
                dropped = dropped.len(),
                "ingredient batch over cap, extra names left unresolved"
            );
            dropped
        } else {
            Vec::new()
        };

        let deadline = Instant::now() + self.settings.deadline;
        let lookups: Vec<(String, Lookup)> = stream::iter(unique)
            .map(|key| async move {
                let lookup = self.lookup(&key, deadline).await;
                (key, lookup)
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let mut resolution = BatchResolution {
            dropped,
            ..BatchResolution::default()
        };
        for (key, lookup) in lookups {
            if lookup.timed_out {
                resolution.timed_out.push(key.clone());
            }
            resolution.matches.insert(key, lookup.candidates);
        }
        resolution.timed_out.sort();

        info!(
            unique = resolution.len(),
            resolved = resolution.resolved_count(),
            timed_out = resolution.timed_out.len(),
            "ingredient batch resolved"
        );
        resolution
    }

    /// Ranked candidates for a single name with a fresh deadline
    pub async fn resolve(&self, name: &str) -> Vec<ResolvedMatch> {
        let key = normalize_name(name);
        if key.is_empty() {
            return Vec::new();
        }
        self.lookup(&key, Instant::now() + self.settings.deadline)
            .await
            .candidates
    }

    /// Best whole food record for a free-text query, used for single-food matching
    ///
    /// Alias hits become a record with one 100 g serving.
    pub async fn find_food(&self, query: &str) -> Option<FoodRecord> {
        if let Some(alias) = self.aliases.get(query) {
            return Some(alias_record(alias));
        }

        let deadline = Instant::now() + self.settings.deadline;
        for (source, bounded) in self.tiers() {
            if bounded && Instant::now() >= deadline {
                warn!(query, "deadline passed before single-food lookup finished");
                return None;
            }
            let hits = match source.search_foods(query, self.settings.page_size).await {
                Ok(hits) => hits,
                Err(e) => {
                    warn!(source = source.name(), query, error = %e, "food search failed, trying next source");
                    continue;
                }
            };
            let hits = if bounded { prefer_generic(hits) } else { hits };
            for hit in hits.iter().take(self.settings.candidate_target) {
                match source.get_food(&hit.id).await {
                    Ok(record) if has_calories(&record) => return Some(record),
                    Ok(record) => debug!(food = %record.name, "food has no calorie data, skipping"),
                    Err(e) => warn!(source = source.name(), id = %hit.id, error = %e, "food detail lookup failed"),
                }
            }
        }
        None
    }

    /// Search every tier without fetching details, for interactive lookup
    pub async fn search(&self, query: &str) -> Vec<FoodSearchHit> {
        let mut results = Vec::new();
        if let Some(alias) = self.aliases.get(query) {
            results.push(FoodSearchHit {
                id: alias.id,
                description: alias.description,
                source: MatchSource::Alias,
                data_type: alias.data_type,
                brand: None,
                score: None,
            });
        }
        for (source, _) in self.tiers() {
            match source.search_foods(query, self.settings.page_size).await {
                Ok(hits) => results.extend(hits),
                Err(e) => warn!(source = source.name(), query, error = %e, "food search failed"),
            }
        }
        results
    }

    /// Sources consulted after the alias tier, with whether the deadline applies
    fn tiers(&self) -> Vec<(&Arc<dyn FoodDataSource>, bool)> {
        match &self.local {
            Some(local) => vec![(local, false)],
            None => self.remotes.iter().map(|remote| (remote, true)).collect(),
        }
    }

    async fn lookup(&self, key: &str, deadline: Instant) -> Lookup {
        if let Some(alias) = self.aliases.get(key) {
            debug!(ingredient = key, food = %alias.description, "alias hit");
            return Lookup {
                candidates: vec![alias],
                timed_out: false,
            };
        }

        let mut lookup = Lookup::default();
        for (source, bounded) in self.tiers() {
            if lookup.candidates.len() >= self.settings.candidate_target || lookup.timed_out {
                break;
            }
            let deadline = bounded.then_some(deadline);
            self.collect(source.as_ref(), key, deadline, &mut lookup).await;
        }
        if lookup.candidates.is_empty() {
            debug!(ingredient = key, "no food match");
        }
        lookup
    }

    async fn collect(
        &self,
        source: &dyn FoodDataSource,
        key: &str,
        deadline: Option<Instant>,
        lookup: &mut Lookup,
    ) {
        if expired(deadline) {
            lookup.timed_out = true;
            return;
        }
        let hits = match source.search_foods(key, self.settings.page_size).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(source = source.name(), ingredient = key, error = %e, "food search failed, treating as no match");
                return;
            }
        };
        let hits = if deadline.is_some() {
            prefer_generic(hits)
        } else {
            hits
        };

        for hit in hits {
            if lookup.candidates.len() >= self.settings.candidate_target {
                break;
            }
            if lookup
                .candidates
                .iter()
                .any(|found| found.id == hit.id && found.source == hit.source)
            {
                continue;
            }
            if expired(deadline) {
                warn!(ingredient = key, source = source.name(), "batch deadline passed, keeping partial matches");
                lookup.timed_out = true;
                return;
            }
            match source.get_food(&hit.id).await {
                Ok(record) => {
                    if let Some(resolved) = to_resolved(&record) {
                        lookup.candidates.push(resolved);
                    }
                }
                Err(e) => {
                    warn!(source = source.name(), id = %hit.id, error = %e, "food detail lookup failed");
                }
            }
        }
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Generic foods first when any exist; branded foods keep their relative order
#[must_use]
pub fn prefer_generic(hits: Vec<FoodSearchHit>) -> Vec<FoodSearchHit> {
    let (branded, mut generic): (Vec<_>, Vec<_>) =
        hits.into_iter().partition(FoodSearchHit::is_branded);
    if generic.is_empty() {
        return branded;
    }
    generic.extend(branded);
    generic
}

fn to_resolved(record: &FoodRecord) -> Option<ResolvedMatch> {
    let per_100g = nutrition_per_100g(&record.name, &record.servings)?;
    Some(ResolvedMatch {
        id: record.id.clone(),
        description: record.name.clone(),
        source: record.source,
        per_100g,
        data_type: record.data_type.clone(),
    })
}

fn has_calories(record: &FoodRecord) -> bool {
    record
        .servings
        .iter()
        .any(|serving| serving.nutrition.calories > 0.0)
}

fn alias_record(alias: ResolvedMatch) -> FoodRecord {
    FoodRecord {
        id: alias.id,
        name: alias.description,
        source: MatchSource::Alias,
        data_type: alias.data_type,
        brand: None,
        servings: vec![Serving::grams("100 g", 100.0, alias.per_100g)],
    }
}
